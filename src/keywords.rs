//! Search-keyword generation and tolerant parsing of model output.
//!
//! The completion gateway returns free text that usually, but not always,
//! contains a JSON string array. `parse_string_array` attempts a
//! regex-bounded capture of the first array and returns `None` instead of
//! erroring when the reply is not parseable; callers fall back to defaults.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::error::GatewayError;
use crate::gateway::{CompletionGateway, PageAnalysis};

/// Maximum keywords returned by generation.
const MAX_KEYWORDS: usize = 5;

/// First `[...]` block in the text, dot matching newlines, non-greedy.
static ARRAY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\[.*?\]").expect("array pattern"));

/// Extract the first JSON string array embedded in free text.
///
/// Returns `None` when no array is present or it does not parse; an
/// unparseable reply is an expected outcome, not an error.
pub fn parse_string_array(text: &str) -> Option<Vec<String>> {
    let captured = ARRAY_RE.find(text)?;
    serde_json::from_str::<Vec<String>>(captured.as_str()).ok()
}

/// Generate competitor-search keywords from the seed page analysis.
///
/// On an unparseable reply the keywords are derived from the seed title
/// instead; a gateway failure propagates so the caller can decide on its
/// own fallback (the deterministic strategy uses the seed domain).
pub async fn generate_search_keywords(
    completion: &dyn CompletionGateway,
    seed_analysis: &PageAnalysis,
) -> Result<Vec<String>, GatewayError> {
    let prompt = format!(
        "Based on the following landing-page analysis, propose the {max} best \
         search keywords for finding similar services. The keywords will be \
         used in a web search engine to find comparable businesses.\n\
         \n\
         Landing-page analysis:\n\
         Title: {title}\n\
         {analysis}\n\
         \n\
         Focus on the service category, the value proposition and the target \
         audience. Keywords should be neither too generic nor too specific.\n\
         \n\
         Important: avoid keywords that would surface comparison, ranking or \
         aggregator sites. The goal is to find direct competitor product and \
         service sites like the original page.\n\
         \n\
         Answer with a JSON array only, e.g.:\n\
         [\"keyword 1\", \"keyword 2\", \"keyword 3\", \"keyword 4\", \"keyword 5\"]",
        max = MAX_KEYWORDS,
        title = seed_analysis.title,
        analysis = truncate(&seed_analysis.analysis_text, 2000),
    );

    let reply = completion.complete(&prompt).await?;

    match parse_string_array(&reply) {
        Some(mut keywords) => {
            keywords.truncate(MAX_KEYWORDS);
            debug!(?keywords, "generated search keywords");
            Ok(keywords)
        }
        None => {
            warn!("keyword reply contained no parseable array, deriving defaults from title");
            Ok(default_keywords(&seed_analysis.title))
        }
    }
}

/// Fallback keywords derived from the seed page title: the title stem plus
/// service- and review-flavored variants.
pub fn default_keywords(title: &str) -> Vec<String> {
    let stem = title.split('|').next().unwrap_or(title).trim().to_string();
    if stem.is_empty() {
        return Vec::new();
    }
    vec![
        stem.clone(),
        format!("{} service", stem),
        format!("{} alternatives", stem),
    ]
}

/// Byte-safe prefix truncation for prompt assembly.
pub fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_parse_plain_array() {
        let parsed = parse_string_array(r#"["a", "b", "c"]"#).unwrap();
        assert_eq!(parsed, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_parse_array_embedded_in_prose() {
        let text = "Sure! Here are the keywords:\n[\"cloud backup\",\n \"backup service\"]\nHope that helps.";
        let parsed = parse_string_array(text).unwrap();
        assert_eq!(parsed, vec!["cloud backup", "backup service"]);
    }

    #[test]
    fn test_parse_rejects_non_array() {
        assert!(parse_string_array("no array here").is_none());
        assert!(parse_string_array("[1, 2, 3]").is_none());
        assert!(parse_string_array("[broken").is_none());
    }

    #[test]
    fn test_default_keywords_from_title() {
        let kws = default_keywords("Acme Backup | Cloud Backup Service");
        assert_eq!(kws[0], "Acme Backup");
        assert_eq!(kws.len(), 3);
        assert!(default_keywords("  ").is_empty());
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("日本語テキスト", 3), "日本語");
        assert_eq!(truncate("short", 100), "short");
    }

    struct CannedCompletion(String);

    #[async_trait::async_trait]
    impl CompletionGateway for CannedCompletion {
        async fn complete(&self, _prompt: &str) -> Result<String, GatewayError> {
            Ok(self.0.clone())
        }
    }

    fn seed() -> PageAnalysis {
        PageAnalysis {
            title: "Acme Backup | Cloud Backup".to_string(),
            meta_data: BTreeMap::new(),
            analysis_text: "Backs up your files.".to_string(),
        }
    }

    #[tokio::test]
    async fn test_generate_keywords_parses_reply() {
        let gw = CannedCompletion(r#"["online backup", "file sync service"]"#.to_string());
        let kws = generate_search_keywords(&gw, &seed()).await.unwrap();
        assert_eq!(kws, vec!["online backup", "file sync service"]);
    }

    #[tokio::test]
    async fn test_generate_keywords_falls_back_on_garbage() {
        let gw = CannedCompletion("I cannot answer that.".to_string());
        let kws = generate_search_keywords(&gw, &seed()).await.unwrap();
        assert_eq!(kws[0], "Acme Backup");
    }
}
