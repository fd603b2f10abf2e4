//! Identifier normalization for duplicate detection.
//!
//! Competitor identifiers arrive as full URLs, bare hostnames, or free-text
//! service names. Both the extractor and the discovery orchestrator compare
//! identifiers through the normalized form produced here.

/// Sentinel tokens an ads platform uses for the account's own row in an
/// impression-share table. Own rows are never competitors.
const OWN_ROW_SENTINELS: [&str; 2] = ["自分", "self"];

/// Canonicalize a raw URL, domain or service name into a comparable key.
///
/// URL-like inputs are reduced to a bare lowercase host: scheme, leading
/// `www.`, port and everything after the host are stripped. Free-text
/// identifiers pass through trimmed and lowercased.
pub fn normalize_identifier(raw: &str) -> String {
    let trimmed = raw.trim();

    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);

    // Only URL-like inputs get host extraction; a service name with spaces
    // stays intact.
    let host_like = !without_scheme.contains(char::is_whitespace);
    let mut value = if host_like {
        let end = without_scheme
            .find(['/', '?', '#'])
            .unwrap_or(without_scheme.len());
        let host = &without_scheme[..end];
        // Drop a port if present
        host.split(':').next().unwrap_or(host).to_string()
    } else {
        without_scheme.to_string()
    };

    if let Some(stripped) = value.strip_prefix("www.") {
        value = stripped.to_string();
    }

    value.trim().to_lowercase()
}

/// Whether two identifiers refer to the same competitor.
///
/// Two identifiers match when their normalized forms are equal or one is a
/// substring of the other. The substring rule handles partial-domain matches
/// (a bare company name vs. its full hostname) but is deliberately loose:
/// it can falsely merge unrelated domains that share a substring, e.g.
/// `ab.com` vs `cab.com`. Known defect, kept for behavior compatibility
/// with the callers that rely on it.
pub fn is_same_identifier(a: &str, b: &str) -> bool {
    let na = normalize_identifier(a);
    let nb = normalize_identifier(b);
    if na.is_empty() || nb.is_empty() {
        return false;
    }
    na == nb || na.contains(&nb) || nb.contains(&na)
}

/// Whether a table identifier marks the account's own row.
pub fn is_own_row(identifier: &str) -> bool {
    let norm = identifier.trim();
    OWN_ROW_SENTINELS.iter().any(|s| norm == *s)
}
