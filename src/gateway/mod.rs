//! Abstract capabilities the discovery core consumes.
//!
//! Search, page fetch+analysis and text completion are external
//! collaborators with their own latency and failure modes. The core only
//! sees these traits; the concrete adapters live alongside them and the
//! tests substitute in-memory fakes.

pub mod completion;
pub mod duckduckgo;
pub mod page;

pub use completion::ChatCompletionGateway;
pub use duckduckgo::DuckDuckGoSearch;
pub use page::HttpPageGateway;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::GatewayError;

/// One web search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Structured output of fetching and analyzing one page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageAnalysis {
    pub title: String,
    /// meta name/property -> content
    pub meta_data: BTreeMap<String, String>,
    /// Visible page text with scripts/styles removed and blank lines collapsed
    pub analysis_text: String,
}

/// Web search capability. "No results" is an empty vec, never an error.
#[async_trait]
pub trait SearchGateway: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, GatewayError>;
}

/// Page fetch+analyze capability. Raises a typed error on network, timeout
/// or parse failure; callers degrade the single candidate, not the run.
#[async_trait]
pub trait PageGateway: Send + Sync {
    async fn fetch_and_analyze(&self, url: &str) -> Result<PageAnalysis, GatewayError>;
}

/// Free-form text completion capability. Output may or may not contain a
/// parseable array; callers must tolerate non-JSON replies.
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, GatewayError>;
}
