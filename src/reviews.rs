//! Third-party review lookup for the seed site.
//!
//! Searches review-flavored queries built from the seed domain and keeps
//! hits that plainly look like review coverage. First-party pages are
//! excluded since reviews hosted on the seller's own site carry little
//! signal. Everything here degrades to fewer (or zero) records; the run
//! never fails because review collection did.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::discovery::DiscoverySettings;
use crate::gateway::{PageGateway, SearchGateway};
use crate::identifier::normalize_identifier;

/// Review records collected per run.
const MAX_REVIEWS: usize = 5;
/// Fetched review content is capped at this many characters.
const MAX_CONTENT_CHARS: usize = 5_000;

/// Query suffixes appended to the seed domain.
const REVIEW_QUERY_SUFFIXES: &[&str] =
    &["reviews", "review", "testimonials", "complaints", "user experience"];

/// Title/snippet markers that make a hit count as review coverage.
const REVIEW_MARKERS: &[&str] = &["review", "testimonial", "rating", "complaint", "experience"];

/// One third-party page discussing the seed service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub url: String,
    pub title: String,
    pub snippet: String,
    /// Visible page text, capped at 5 000 characters
    pub content: String,
}

/// Collect up to five third-party review pages about the seed site.
pub async fn search_reviews(
    search: &dyn SearchGateway,
    page: &dyn PageGateway,
    seed_url: &str,
    settings: &DiscoverySettings,
) -> Vec<ReviewRecord> {
    let seed_domain = normalize_identifier(seed_url);
    if seed_domain.is_empty() {
        return Vec::new();
    }

    let mut records: Vec<ReviewRecord> = Vec::new();

    'queries: for suffix in REVIEW_QUERY_SUFFIXES {
        let query = format!("{} {}", seed_domain, suffix);
        let hits = match search.search(&query).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(query = %query, error = %e, "review search failed");
                continue;
            }
        };

        for hit in &hits {
            // First-party review pages are excluded
            if hit.url.to_lowercase().contains(&seed_domain) {
                continue;
            }
            if !looks_like_review(&hit.title, &hit.snippet) {
                continue;
            }

            match page.fetch_and_analyze(&hit.url).await {
                Ok(analysis) => {
                    let mut content = analysis.analysis_text;
                    if let Some((idx, _)) = content.char_indices().nth(MAX_CONTENT_CHARS) {
                        content.truncate(idx);
                    }
                    debug!(url = %hit.url, "review page collected");
                    records.push(ReviewRecord {
                        url: hit.url.clone(),
                        title: hit.title.clone(),
                        snippet: hit.snippet.clone(),
                        content,
                    });
                }
                Err(e) => {
                    warn!(url = %hit.url, error = %e, "review page fetch failed");
                    continue;
                }
            }

            if records.len() >= MAX_REVIEWS {
                break 'queries;
            }
        }

        tokio::time::sleep(settings.request_delay).await;
    }

    info!(count = records.len(), "review search complete");
    records
}

fn looks_like_review(title: &str, snippet: &str) -> bool {
    let title = title.to_lowercase();
    let snippet = snippet.to_lowercase();
    REVIEW_MARKERS
        .iter()
        .any(|marker| title.contains(marker) || snippet.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_marker_matching() {
        assert!(looks_like_review("Acme Backup Review 2025", ""));
        assert!(looks_like_review("", "Real user testimonials for Acme"));
        assert!(looks_like_review("Acme ratings compared", ""));
        assert!(!looks_like_review("Acme Backup pricing", "Plans start at $5"));
    }
}
