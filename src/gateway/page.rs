//! Landing-page fetch and analysis over plain HTTP.
//!
//! Pulls the title, all meta name/property tags and the visible body text
//! (scripts and styles removed, blank lines collapsed) out of a page. The
//! short fixed timeout means one slow candidate degrades only itself.

use async_trait::async_trait;
use scraper::{Html, Selector};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

use super::{PageAnalysis, PageGateway};
use crate::error::GatewayError;

pub struct HttpPageGateway {
    client: reqwest::Client,
}

impl HttpPageGateway {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageGateway for HttpPageGateway {
    async fn fetch_and_analyze(&self, url: &str) -> Result<PageAnalysis, GatewayError> {
        let url = sanitize_url(url);
        debug!(%url, "fetching page");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| GatewayError::from_reqwest(e, &url))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%url, %status, "non-success status fetching page");
            return Err(GatewayError::Unavailable {
                reason: format!("status {} for {}", status, url),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::from_reqwest(e, &url))?;

        Ok(analyze_html(&body))
    }
}

/// Normalize a candidate URL before fetching: trim, drop stray markup
/// characters that ride along from chat text, default to https.
pub fn sanitize_url(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | '"' | '\'' | ')' | ']'))
        .collect();
    if cleaned.starts_with("http://") || cleaned.starts_with("https://") {
        cleaned
    } else {
        format!("https://{}", cleaned)
    }
}

/// Extract the structured analysis from raw HTML.
pub fn analyze_html(html: &str) -> PageAnalysis {
    let document = Html::parse_document(html);

    let title = Selector::parse("title")
        .ok()
        .and_then(|sel| {
            document
                .select(&sel)
                .next()
                .map(|el| el.text().collect::<String>().trim().to_string())
        })
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "untitled".to_string());

    let mut meta_data = BTreeMap::new();
    if let Ok(meta_sel) = Selector::parse("meta") {
        for element in document.select(&meta_sel) {
            let value = element.value();
            let name = value.attr("name").or_else(|| value.attr("property"));
            if let (Some(name), Some(content)) = (name, value.attr("content")) {
                meta_data.insert(name.to_string(), content.to_string());
            }
        }
    }

    let analysis_text = visible_text(&document);

    PageAnalysis {
        title,
        meta_data,
        analysis_text,
    }
}

/// Collect visible text from the body, skipping script/style subtrees, and
/// collapse runs of whitespace-only lines.
fn visible_text(document: &Html) -> String {
    let (Ok(body_sel), Ok(skip_sel)) = (
        Selector::parse("body"),
        Selector::parse("script, style, noscript"),
    ) else {
        return String::new();
    };

    let Some(body) = document.select(&body_sel).next() else {
        return String::new();
    };

    // scraper has no subtree-exclusion walk, so gather the text of the
    // skipped nodes and subtract their contribution line-wise.
    let mut skipped: Vec<String> = Vec::new();
    for el in body.select(&skip_sel) {
        skipped.push(el.text().collect::<String>());
    }

    let full: String = body.text().collect::<Vec<_>>().join("\n");
    let mut text = full;
    for chunk in &skipped {
        if !chunk.is_empty() {
            text = text.replace(chunk.as_str(), "");
        }
    }

    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
