//! Share-table extraction from unstructured pasted text.
//!
//! Impression-share tables arrive as copy-pasted chat text with no reliable
//! schema: tab-, comma- or whitespace-delimited, single- or multi-line,
//! mixed languages, embedded timestamps and link markup. Extraction runs an
//! ordered cascade of pairing stages, each only when the previous one
//! produced nothing, preferring same-line association over positional
//! guessing. It never errors; an empty result means "no seed table".

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// One ranked competitor row from a share table.
///
/// Immutable after creation; consumed by the discovery orchestrator as seed
/// data within the same run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareRecord {
    /// Domain or own-row sentinel as it appeared in the table
    pub identifier: String,
    /// Parsed share percentage
    pub share_value: f64,
    /// The share text as pasted, e.g. "31.8%"
    pub raw_share_text: String,
}

/// Maximum records returned per extraction pass.
pub const MAX_RECORDS: usize = 7;

/// Domain-shaped token, or the own-row sentinel an ads platform prints for
/// the account's own domain.
static DOMAIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:[a-zA-Z0-9][-a-zA-Z0-9]*\.[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}|[a-zA-Z0-9][-a-zA-Z0-9]*\.[a-zA-Z]{2,}|自分|\bself\b)",
    )
    .expect("domain pattern")
});

/// Percentage-shaped token, including the censored "< 10 %" form.
static PERCENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:\d+\.?\d*\s*%|<\s*10\s*%)").expect("percent pattern"));

/// Domain followed within a short non-digit window by a bare number.
static LOOSE_PAIR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"((?:[a-zA-Z0-9][-a-zA-Z0-9]*\.[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}|[a-zA-Z0-9][-a-zA-Z0-9]*\.[a-zA-Z]{2,}|自分|\bself\b))[^0-9]*?(\d+\.?\d*)[\s%]*",
    )
    .expect("loose pair pattern")
});

/// Bare percentage for the positional last-resort stage.
static BARE_PERCENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+\.?\d*)\s*%").expect("bare percent pattern"));

static SLACK_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<http[^|]+\|([^>]+)>").expect("link wrapper pattern"));

static TIMESTAMP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}\.\d+ [A-Z]{3,4}").expect("timestamp pattern")
});

static BARE_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://[^\s<>]+").expect("url pattern"));

/// Extract ranked `(identifier, share)` records from arbitrary pasted text.
///
/// `floor` is the censoring threshold: shares below it are displayed as
/// "< N %" by the source platform and are unusable, never rounded up.
/// Returns at most [`MAX_RECORDS`] records sorted descending by share,
/// input order breaking ties. Total failure yields an empty vec.
pub fn extract_share_table(raw: &str, floor: f64) -> Vec<ShareRecord> {
    let text = pre_clean(raw);

    let mut pairs = pair_by_line(&text, floor);

    if pairs.is_empty() {
        debug!("line-scoped pairing found nothing, trying token-scoped pairing");
        pairs = pair_by_token(&text, floor);
    }

    if pairs.is_empty() {
        debug!("token-scoped pairing found nothing, trying loose pattern pairing");
        pairs = pair_by_loose_pattern(&text);
    }

    if pairs.is_empty() {
        debug!("loose pairing found nothing, trying positional pairing");
        pairs = pair_by_position(&text, floor);
    }

    // Defensive re-check of the floor, then rank and cap. sort_by is stable,
    // so equal shares keep their input order.
    let mut filtered: Vec<ShareRecord> = pairs
        .into_iter()
        .filter(|r| r.share_value >= floor && r.share_value <= 100.0)
        .collect();
    filtered.sort_by(|a, b| {
        b.share_value
            .partial_cmp(&a.share_value)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    filtered.truncate(MAX_RECORDS);

    if filtered.is_empty() {
        info!("no usable share-table rows found in input");
    } else {
        info!(records = filtered.len(), "extracted share table");
    }
    filtered
}

/// Stage 1: strip chat markup, timestamps, bare URLs and the command token
/// so the pairing stages see only table-like text.
fn pre_clean(raw: &str) -> String {
    let mut text = raw
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&");
    text = SLACK_LINK_RE.replace_all(&text, "$1").into_owned();
    text = TIMESTAMP_RE.replace_all(&text, "").into_owned();
    text = BARE_URL_RE.replace_all(&text, "").into_owned();
    text.replace("/data", "")
}

/// Whether a matched share token is the censored "< 10 %" form.
fn is_censored(share: &str) -> bool {
    share.contains("< 10") || share.contains("<10")
}

/// Parse the numeric part out of a share token like "31.8%" or "42.5 %".
fn parse_share_value(share: &str) -> Option<f64> {
    let digits: String = share
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    digits.parse::<f64>().ok()
}

fn already_captured(pairs: &[ShareRecord], identifier: &str) -> bool {
    pairs.iter().any(|p| p.identifier == identifier)
}

/// Stage 2: same-line association. For each identifier on a line, the first
/// percentage token in the remainder of that line is its share. The most
/// structurally confident signal, so it runs first.
fn pair_by_line(text: &str, floor: f64) -> Vec<ShareRecord> {
    let mut pairs: Vec<ShareRecord> = Vec::new();

    for line in text.lines() {
        for domain_match in DOMAIN_RE.find_iter(line) {
            let identifier = domain_match.as_str().to_string();
            let rest = &line[domain_match.end()..];

            for percent_match in PERCENT_RE.find_iter(rest) {
                let share = percent_match.as_str().trim().to_string();
                if is_censored(&share) {
                    continue;
                }
                if let Some(value) = parse_share_value(&share) {
                    if value >= floor && !already_captured(&pairs, &identifier) {
                        pairs.push(ShareRecord {
                            identifier: identifier.clone(),
                            share_value: value,
                            raw_share_text: share,
                        });
                        // One share per identifier; move to the next domain
                        break;
                    }
                }
            }
        }
    }

    pairs
}

/// Stage 3: whitespace tokens - an identifier immediately followed by a
/// percentage token is a pair.
fn pair_by_token(text: &str, floor: f64) -> Vec<ShareRecord> {
    let mut pairs: Vec<ShareRecord> = Vec::new();
    let words: Vec<&str> = text.split_whitespace().collect();

    for window in words.windows(2) {
        let (word, next) = (window[0], window[1]);
        let Some(domain_match) = DOMAIN_RE.find(word) else {
            continue;
        };
        if domain_match.start() != 0 {
            continue;
        }
        let identifier = domain_match.as_str().to_string();

        let Some(percent_match) = PERCENT_RE.find(next) else {
            continue;
        };
        if percent_match.start() != 0 {
            continue;
        }
        let share = percent_match.as_str().trim().to_string();
        if is_censored(&share) {
            continue;
        }
        if let Some(value) = parse_share_value(&share) {
            if value >= floor && !already_captured(&pairs, &identifier) {
                pairs.push(ShareRecord {
                    identifier,
                    share_value: value,
                    raw_share_text: share,
                });
            }
        }
    }

    pairs
}

/// Stage 4: one combined pattern over the whole text - an identifier
/// followed, within a short non-digit window, by a bare number treated as a
/// percentage.
fn pair_by_loose_pattern(text: &str) -> Vec<ShareRecord> {
    let mut pairs: Vec<ShareRecord> = Vec::new();

    for caps in LOOSE_PAIR_RE.captures_iter(text) {
        let identifier = caps[1].to_string();
        let value_text = caps[2].to_string();
        if let Ok(value) = value_text.parse::<f64>() {
            if !already_captured(&pairs, &identifier) {
                pairs.push(ShareRecord {
                    identifier,
                    share_value: value,
                    raw_share_text: format!("{}%", value_text),
                });
            }
        }
    }

    pairs
}

/// Stage 5, last resort: collect all identifiers and all usable percentages
/// independently and zip them positionally - percentages sorted descending,
/// identifiers in input order. Only attempted when the counts are close
/// (difference < 5), since a large mismatch means the text is not a table.
fn pair_by_position(text: &str, floor: f64) -> Vec<ShareRecord> {
    let identifiers: Vec<String> = DOMAIN_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect();

    let mut percents: Vec<(f64, String)> = BARE_PERCENT_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let value = caps[1].parse::<f64>().ok()?;
            (value >= floor).then(|| (value, format!("{}%", &caps[1])))
        })
        .collect();

    if identifiers.is_empty() || percents.is_empty() {
        return Vec::new();
    }
    if identifiers.len().abs_diff(percents.len()) >= 5 {
        return Vec::new();
    }

    percents.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    identifiers
        .into_iter()
        .zip(percents)
        .take(MAX_RECORDS)
        .map(|(identifier, (value, raw))| ShareRecord {
            identifier,
            share_value: value,
            raw_share_text: raw,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLOOR: f64 = 10.0;

    #[test]
    fn test_comma_separated_table() {
        let input = "yoursite.com,42.5%\ncompetitor1.com,31.8%\ncompetitor2.net,15.6%\ncompetitor3.jp,5.2%";
        let records = extract_share_table(input, FLOOR);

        let pairs: Vec<(&str, f64)> = records
            .iter()
            .map(|r| (r.identifier.as_str(), r.share_value))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("yoursite.com", 42.5),
                ("competitor1.com", 31.8),
                ("competitor2.net", 15.6),
            ]
        );
    }

    #[test]
    fn test_tab_separated_table_with_header() {
        let input = "表示 URL ドメイン\tインプレッション シェア\n自分\t42.1 %\nrival.co.jp\t33.0 %\nother.com\t12.4 %";
        let records = extract_share_table(input, FLOOR);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].identifier, "自分");
        assert_eq!(records[0].share_value, 42.1);
        assert_eq!(records[1].identifier, "rival.co.jp");
    }

    #[test]
    fn test_censored_rows_excluded_not_rounded_up() {
        let input = "big.com 55%\nsmall.com < 10 %\ntiny.net <10%";
        let records = extract_share_table(input, FLOOR);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].identifier, "big.com");
    }

    #[test]
    fn test_garbage_input_returns_empty() {
        assert!(extract_share_table("hello world", FLOOR).is_empty());
        assert!(extract_share_table("", FLOOR).is_empty());
    }

    #[test]
    fn test_slack_markup_and_urls_stripped() {
        let input = "&lt;https://a.example.com|a.example.com&gt; 44% /data\nhttps://noise.example.org/page b.net 21%";
        let records = extract_share_table(input, FLOOR);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].identifier, "a.example.com");
        assert_eq!(records[0].share_value, 44.0);
        assert_eq!(records[1].identifier, "b.net");
    }

    #[test]
    fn test_timestamps_do_not_pair_with_domains() {
        let input = "2025-04-10 13:03:26.020 JST\nmysite.jp 38%";
        let records = extract_share_table(input, FLOOR);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].identifier, "mysite.jp");
        assert_eq!(records[0].share_value, 38.0);
    }

    #[test]
    fn test_cap_at_seven_records() {
        let input = (1..=9)
            .map(|i| format!("site{}.com {}%", i, 90 - i))
            .collect::<Vec<_>>()
            .join("\n");
        let records = extract_share_table(&input, FLOOR);
        assert_eq!(records.len(), MAX_RECORDS);
        // Descending
        for pair in records.windows(2) {
            assert!(pair[0].share_value >= pair[1].share_value);
        }
    }

    #[test]
    fn test_reparse_of_canonical_output_is_idempotent() {
        let input = "a.com: 40%\nb.net: 25%\nc.org: 12%";
        let first = extract_share_table(input, FLOOR);
        let rendered = first
            .iter()
            .map(|r| format!("{}: {}", r.identifier, r.raw_share_text))
            .collect::<Vec<_>>()
            .join("\n");
        let second = extract_share_table(&rendered, FLOOR);
        assert_eq!(first, second);
    }

    #[test]
    fn test_duplicate_identifier_first_share_wins() {
        let input = "dup.com 50%\ndup.com 20%";
        let records = extract_share_table(input, FLOOR);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].share_value, 50.0);
    }

    #[test]
    fn test_loose_pattern_fallback() {
        // No percent signs anywhere, so the first three stages find nothing
        // and the loose stage pairs domain -> following bare number.
        let input = "alpha.com share 47.5 beta.net share 22";
        let records = extract_share_table(input, FLOOR);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].identifier, "alpha.com");
        assert_eq!(records[0].share_value, 47.5);
    }

    #[test]
    fn test_positional_fallback_zips_descending() {
        // Identifiers and percents on separate lines: line and token stages
        // cannot pair them, loose stage finds no number after the last
        // domain within its window... percents carry % so loose stage still
        // pairs across lines; craft input so domains come after the numbers.
        let input = "30 % 20 % 45 %\nfirst.com\nsecond.net\nthird.org";
        let records = extract_share_table(input, FLOOR);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].identifier, "first.com");
        assert_eq!(records[0].share_value, 45.0);
        assert_eq!(records[2].share_value, 20.0);
    }

    #[test]
    fn test_values_above_hundred_rejected() {
        let input = "weird.com 350%\nnormal.com 44%";
        let records = extract_share_table(input, FLOOR);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].identifier, "normal.com");
    }

    #[test]
    fn test_floor_is_configurable() {
        let input = "a.com 8%\nb.com 6%";
        assert!(extract_share_table(input, 10.0).is_empty());
        let lowered = extract_share_table(input, 5.0);
        assert_eq!(lowered.len(), 2);
    }
}
