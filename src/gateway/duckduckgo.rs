//! DuckDuckGo HTML search adapter.
//!
//! Uses the static HTML endpoint (`html.duckduckgo.com/html/`) which needs
//! no JavaScript, and parses the `.result` blocks. Result links are wrapped
//! in a `duckduckgo.com/l/?uddg=` redirect that gets unwrapped before the
//! hit is returned.

use async_trait::async_trait;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, warn};

use super::{SearchGateway, SearchHit};
use crate::error::GatewayError;

const MAX_HITS: usize = 10;

pub struct DuckDuckGoSearch {
    client: reqwest::Client,
    base_url: String,
}

impl DuckDuckGoSearch {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(Self {
            client,
            base_url: "https://html.duckduckgo.com/html/".to_string(),
        })
    }

    /// Point the adapter at a different endpoint (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl SearchGateway for DuckDuckGoSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, GatewayError> {
        debug!(query, "searching");

        let response = self
            .client
            .get(&self.base_url)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| GatewayError::from_reqwest(e, &self.base_url))?;

        let status = response.status();
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GatewayError::Unavailable {
                reason: format!("search returned status {}", status),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::from_reqwest(e, &self.base_url))?;

        let hits = parse_search_page(&body);
        if hits.is_empty() {
            // Not an error: a no-result page and a result-less query look
            // the same to the caller.
            warn!(query, "search returned no parseable results");
        }
        Ok(hits)
    }
}

/// Parse a DuckDuckGo HTML results page into hits, at most [`MAX_HITS`].
pub fn parse_search_page(html: &str) -> Vec<SearchHit> {
    let document = Html::parse_document(html);

    let (Ok(result_sel), Ok(title_sel), Ok(snippet_sel)) = (
        Selector::parse(".result"),
        Selector::parse(".result__a"),
        Selector::parse(".result__snippet"),
    ) else {
        return Vec::new();
    };

    let mut hits = Vec::new();
    for element in document.select(&result_sel).take(MAX_HITS) {
        let Some(title_link) = element.select(&title_sel).next() else {
            continue;
        };
        let title = title_link.text().collect::<String>().trim().to_string();
        let Some(href) = title_link.value().attr("href") else {
            continue;
        };
        let url = unwrap_redirect(href);
        if url.is_empty() {
            continue;
        }

        let snippet = element
            .select(&snippet_sel)
            .next()
            .map(|s| s.text().collect::<String>().trim().to_string())
            .unwrap_or_default();

        hits.push(SearchHit { title, url, snippet });
    }
    hits
}

/// Unwrap the `duckduckgo.com/l/?uddg=<encoded>` redirect link into the
/// actual target URL. Non-redirect links pass through; scheme-relative
/// links get https.
fn unwrap_redirect(href: &str) -> String {
    let absolute = match href.strip_prefix("//") {
        Some(rest) => format!("https://{}", rest),
        None => href.to_string(),
    };
    if absolute.contains("duckduckgo.com/l/") {
        if let Ok(parsed) = url::Url::parse(&absolute) {
            if let Some((_, target)) = parsed.query_pairs().find(|(key, _)| key == "uddg") {
                return target.into_owned();
            }
        }
    }
    absolute
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULTS_PAGE: &str = r#"
    <html><body><div id="links">
      <div class="result">
        <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com%2Flp&rut=abc">Example LP</a>
        <a class="result__snippet">The example landing page.</a>
      </div>
      <div class="result">
        <a class="result__a" href="https://direct.example.net/">Direct Result</a>
        <a class="result__snippet">No redirect wrapper here.</a>
      </div>
    </div></body></html>
    "#;

    #[test]
    fn test_parse_results_page() {
        let hits = parse_search_page(RESULTS_PAGE);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "Example LP");
        assert_eq!(hits[0].url, "https://example.com/lp");
        assert_eq!(hits[0].snippet, "The example landing page.");
        assert_eq!(hits[1].url, "https://direct.example.net/");
    }

    #[test]
    fn test_parse_empty_page() {
        assert!(parse_search_page("<html><body>No results.</body></html>").is_empty());
    }

    #[test]
    fn test_parse_caps_at_ten() {
        let mut html = String::from("<html><body>");
        for i in 0..15 {
            html.push_str(&format!(
                r#"<div class="result"><a class="result__a" href="https://site{}.com/">S{}</a></div>"#,
                i, i
            ));
        }
        html.push_str("</body></html>");
        assert_eq!(parse_search_page(&html).len(), 10);
    }

    #[test]
    fn test_unwrap_redirect() {
        assert_eq!(
            unwrap_redirect("//duckduckgo.com/l/?uddg=https%3A%2F%2Fa.com%2F&rut=x"),
            "https://a.com/"
        );
        assert_eq!(unwrap_redirect("https://plain.com/"), "https://plain.com/");
        assert_eq!(unwrap_redirect("//bare.example.org/x"), "https://bare.example.org/x");
    }
}
