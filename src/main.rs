use anyhow::{Context, Result};
use clap::Parser;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod discovery;
mod error;
mod event_cache;
mod export;
mod gateway;
mod identifier;
mod keywords;
mod reviews;
mod share_table;

use cli::{Cli, Commands};
use config::AppConfig;
use discovery::{discover_competitors, DiscoveryDeps};
use event_cache::EventCache;
use gateway::{
    ChatCompletionGateway, CompletionGateway, DuckDuckGoSearch, HttpPageGateway, PageGateway,
};
use identifier::normalize_identifier;
use share_table::extract_share_table;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    init_logging(args.verbose);

    // Handle --init flag first (before any other processing)
    if args.init {
        match AppConfig::create_default_config() {
            Ok(path) => {
                println!("Created default configuration file at: {}", path.display());
                println!("Edit this file to customize settings, then run lpscout again.");
                return Ok(());
            }
            Err(e) => {
                eprintln!("Failed to create configuration file: {}", e);
                std::process::exit(1);
            }
        }
    }

    if let Err(e) = args.validate() {
        eprintln!("Invalid arguments: {}", e);
        std::process::exit(1);
    }

    let app_config = match AppConfig::load() {
        Ok(cfg) => cfg,
        Err(config::ConfigError::FileNotFound(path)) => {
            // Config not found - prompt to create if interactive
            match AppConfig::prompt_create_config() {
                Ok(Some(created_path)) => {
                    println!("Created default configuration file at: {}", created_path.display());
                    println!("Edit this file to customize settings, then run lpscout again.");
                    return Ok(());
                }
                Ok(None) => {
                    eprintln!("Configuration file not found at: {}", path.display());
                    eprintln!("Run with --init to create a default configuration file.");
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("Failed to create configuration file: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    match args.command {
        Some(Commands::Extract { file }) => run_extract(&app_config, &file),
        Some(Commands::Analyze {
            url,
            table,
            format,
            output,
        }) => run_analyze(&app_config, &url, table.as_deref(), &format, output.as_deref()).await,
        None => unreachable!("validated above"),
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("lpscout={}", default_level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_extract(app_config: &AppConfig, file: &str) -> Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read table file: {}", file))?;

    let records = extract_share_table(&raw, app_config.extraction.share_floor_percent);
    println!("{}", serde_json::to_string_pretty(&records)?);

    Ok(())
}

async fn run_analyze(
    app_config: &AppConfig,
    url: &str,
    table: Option<&str>,
    format: &str,
    output: Option<&str>,
) -> Result<()> {
    // Inbound request dedup lives at this layer only; the discovery core
    // never sees it.
    let mut events = EventCache::new(
        Duration::from_secs(app_config.events.cache_ttl_secs),
        app_config.events.cache_max_entries,
    );
    let event_id = normalize_identifier(url);
    if !events.insert_if_absent(&event_id) {
        warn!(seed = %event_id, "duplicate analyze request, skipping");
        return Ok(());
    }

    let seed_share_table = match table {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read table file: {}", path))?;
            extract_share_table(&raw, app_config.extraction.share_floor_percent)
        }
        None => Vec::new(),
    };
    if !seed_share_table.is_empty() {
        info!(rows = seed_share_table.len(), "parsed impression-share table");
    }

    let search = DuckDuckGoSearch::new(
        &app_config.http.user_agent,
        Duration::from_secs(app_config.http.search_timeout_secs),
    )?;
    let page = HttpPageGateway::new(
        &app_config.http.user_agent,
        Duration::from_secs(app_config.http.page_timeout_secs),
    )?;

    let completion: Option<ChatCompletionGateway> = match &app_config.completion {
        Some(cfg) => match cfg.api_key() {
            Some(key) => Some(ChatCompletionGateway::new(
                cfg.endpoint.clone(),
                key,
                cfg.model.clone(),
                Duration::from_secs(cfg.timeout_secs),
            )?),
            None => {
                warn!(
                    env = %cfg.api_key_env,
                    "completion API key not set, AI-filtered discovery disabled"
                );
                None
            }
        },
        None => None,
    };

    let deps = DiscoveryDeps {
        search: &search,
        page: &page,
        completion: completion.as_ref().map(|c| c as &dyn CompletionGateway),
    };

    info!(seed = %url, "fetching seed landing page");
    let seed_analysis = page.fetch_and_analyze(url).await?;

    let settings = app_config.discovery.to_settings();
    let result = discover_competitors(
        &deps,
        url,
        &seed_analysis,
        &seed_share_table,
        &[],
        &settings,
    )
    .await;

    export::print_discovery_summary(&result);

    if let Some(path) = output {
        match format {
            "csv" => export::export_csv(&result, path)?,
            _ => export::export_json(&result, path)?,
        }
        println!("Results saved to: {}", path);
    }

    Ok(())
}
