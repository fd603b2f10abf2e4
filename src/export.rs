use crate::discovery::DiscoveryResult;
use anyhow::Result;
use csv::Writer;
use std::fs::File;
use std::io::Write;
use tracing::{debug, info};

pub fn export_csv(result: &DiscoveryResult, output_path: &str) -> Result<()> {
    debug!("Exporting {} competitors to CSV: {}", result.competitors.len(), output_path);

    let file = File::create(output_path)?;
    let mut wtr = Writer::from_writer(file);

    wtr.write_record([
        "Domain",
        "URL",
        "Title",
        "Share (%)",
        "Source",
        "Search Term",
    ])?;

    for competitor in &result.competitors {
        wtr.write_record([
            competitor.canonical_domain.as_str(),
            competitor.url.as_str(),
            competitor.title.as_str(),
            &competitor
                .share_value
                .map(|v| format!("{:.1}", v))
                .unwrap_or_default(),
            &competitor.source.to_string(),
            competitor.search_term.as_str(),
        ])?;
    }

    wtr.flush()?;
    info!(
        "Successfully exported {} competitors to CSV: {}",
        result.competitors.len(),
        output_path
    );

    Ok(())
}

pub fn export_json(result: &DiscoveryResult, output_path: &str) -> Result<()> {
    debug!("Exporting {} competitors to JSON: {}", result.competitors.len(), output_path);

    let json_output = JsonExport {
        summary: ExportSummary {
            total_competitors: result.competitors.len(),
            with_known_share: result
                .competitors
                .iter()
                .filter(|c| c.share_value.is_some())
                .count(),
            review_records: result.review_records.len(),
            seed_table_rows: result.seed_share_table.len(),
        },
        result,
    };

    let json_string = serde_json::to_string_pretty(&json_output)?;

    let mut file = File::create(output_path)?;
    file.write_all(json_string.as_bytes())?;

    info!(
        "Successfully exported {} competitors to JSON: {}",
        result.competitors.len(),
        output_path
    );

    Ok(())
}

#[derive(serde::Serialize)]
struct JsonExport<'a> {
    summary: ExportSummary,
    #[serde(flatten)]
    result: &'a DiscoveryResult,
}

#[derive(serde::Serialize)]
struct ExportSummary {
    total_competitors: usize,
    with_known_share: usize,
    review_records: usize,
    seed_table_rows: usize,
}

pub fn print_discovery_summary(result: &DiscoveryResult) {
    if result.competitors.is_empty() {
        println!("No competitors found.");
        return;
    }

    println!("\n=== Discovery Summary ===");
    println!("Competitors found: {}", result.competitors.len());
    println!("Seed table rows: {}", result.seed_share_table.len());
    println!("Review records: {}", result.review_records.len());
    println!();

    for competitor in &result.competitors {
        let share = competitor
            .share_value
            .map(|v| format!("{:.1}%", v))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<30} {:>7}  [{}] via \"{}\"",
            competitor.canonical_domain, share, competitor.source, competitor.search_term
        );
    }

    println!("=========================\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::{CandidateSource, CompetitorRecord};
    use std::collections::BTreeMap;

    fn sample_result() -> DiscoveryResult {
        DiscoveryResult {
            competitors: vec![CompetitorRecord {
                url: "https://rival.example.com/lp".to_string(),
                canonical_domain: "rival.example.com".to_string(),
                title: "Rival | Backup".to_string(),
                analysis_text: "Backs things up.".to_string(),
                meta_data: BTreeMap::new(),
                share_value: Some(30.0),
                source: CandidateSource::ImpressionShare,
                search_term: "rival.example.com".to_string(),
            }],
            review_records: Vec::new(),
            seed_share_table: Vec::new(),
        }
    }

    #[test]
    fn test_export_json_writes_summary_and_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        export_json(&sample_result(), path.to_str().unwrap()).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed["summary"]["total_competitors"], 1);
        assert_eq!(parsed["competitors"][0]["canonical_domain"], "rival.example.com");
        assert_eq!(parsed["competitors"][0]["source"], "impression-share");
    }

    #[test]
    fn test_export_csv_one_row_per_competitor() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        export_csv(&sample_result(), path.to_str().unwrap()).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let mut lines = written.lines();
        assert!(lines.next().unwrap().starts_with("Domain,URL,Title"));
        let row = lines.next().unwrap();
        assert!(row.contains("rival.example.com"));
        assert!(row.contains("30.0"));
        assert!(row.contains("impression-share"));
        assert!(lines.next().is_none());
    }
}
