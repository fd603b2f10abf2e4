//! Shared test doubles: in-memory gateways and wiremock helpers.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lpscout::discovery::DiscoverySettings;
use lpscout::error::GatewayError;
use lpscout::gateway::{CompletionGateway, PageAnalysis, PageGateway, SearchGateway, SearchHit};

pub fn hit(title: &str, url: &str, snippet: &str) -> SearchHit {
    SearchHit {
        title: title.to_string(),
        url: url.to_string(),
        snippet: snippet.to_string(),
    }
}

/// Discovery settings with pacing disabled so tests run instantly.
pub fn fast_settings() -> DiscoverySettings {
    DiscoverySettings {
        request_delay: Duration::ZERO,
        ..DiscoverySettings::default()
    }
}

/// Search gateway backed by an exact query -> hits map. Unknown queries
/// return no hits.
pub struct MapSearch {
    map: HashMap<String, Vec<SearchHit>>,
}

impl MapSearch {
    pub fn new() -> Self {
        Self { map: HashMap::new() }
    }

    pub fn with(mut self, query: &str, hits: Vec<SearchHit>) -> Self {
        self.map.insert(query.to_string(), hits);
        self
    }
}

#[async_trait]
impl SearchGateway for MapSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, GatewayError> {
        Ok(self.map.get(query).cloned().unwrap_or_default())
    }
}

/// Search gateway that always fails.
pub struct DownSearch;

#[async_trait]
impl SearchGateway for DownSearch {
    async fn search(&self, _query: &str) -> Result<Vec<SearchHit>, GatewayError> {
        Err(GatewayError::Unavailable {
            reason: "search backend down".to_string(),
        })
    }
}

/// Page gateway that synthesizes an analysis for any URL.
pub struct StaticPages;

#[async_trait]
impl PageGateway for StaticPages {
    async fn fetch_and_analyze(&self, url: &str) -> Result<PageAnalysis, GatewayError> {
        Ok(PageAnalysis {
            title: format!("Page at {}", url),
            meta_data: Default::default(),
            analysis_text: format!("Landing page content for {}", url),
        })
    }
}

/// Completion gateway replaying a fixed sequence of replies, repeating the
/// last one once exhausted.
pub struct ScriptedCompletion {
    replies: Vec<String>,
    cursor: Mutex<usize>,
}

impl ScriptedCompletion {
    pub fn new(replies: &[&str]) -> Self {
        Self {
            replies: replies.iter().map(|r| r.to_string()).collect(),
            cursor: Mutex::new(0),
        }
    }
}

#[async_trait]
impl CompletionGateway for ScriptedCompletion {
    async fn complete(&self, _prompt: &str) -> Result<String, GatewayError> {
        let mut cursor = self.cursor.lock().unwrap();
        let idx = (*cursor).min(self.replies.len().saturating_sub(1));
        *cursor += 1;
        Ok(self.replies[idx].clone())
    }
}

/// Serve an HTML body at `url_path` on a fresh mock server.
pub async fn mock_html_page(url_path: &str, html: &str) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(url_path))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html.to_string())
                .insert_header("content-type", "text/html; charset=utf-8"),
        )
        .mount(&server)
        .await;

    server
}

/// Serve responses only after a delay, to exercise client timeouts.
pub async fn mock_slow_server(delay_ms: u64) -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body>late</body></html>")
                .set_delay(Duration::from_millis(delay_ms)),
        )
        .mount(&server)
        .await;

    server
}
