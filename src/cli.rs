use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "lpscout")]
#[command(about = "Discovers competitor landing pages for a seed page via search and share-table analysis")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Create default configuration file at ./config/lpscout.toml
    #[arg(long, global = true)]
    pub init: bool,

    /// Verbose logging (use -v for INFO, -vv for DEBUG)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a full competitor discovery for a seed landing page
    Analyze {
        /// Seed landing-page URL
        #[arg(short, long)]
        url: String,

        /// Path to a pasted impression-share table (raw text)
        #[arg(short, long, value_name = "FILE")]
        table: Option<String>,

        /// Output format: 'json' (default) or 'csv'
        #[arg(short, long, default_value = "json")]
        format: String,

        /// Output file path (omit to print a summary only)
        #[arg(short, long, value_name = "PATH")]
        output: Option<String>,
    },

    /// Extract share records from a raw impression-share table and print JSON
    Extract {
        /// Path to the raw table text
        #[arg(short, long, value_name = "FILE")]
        file: String,
    },
}

impl Cli {
    pub fn validate(&self) -> Result<(), String> {
        match &self.command {
            Some(Commands::Analyze { url, format, .. }) => {
                if url.trim().is_empty() {
                    return Err("Seed URL cannot be empty".to_string());
                }
                if !["json", "csv"].contains(&format.as_str()) {
                    return Err("Output format must be 'json' or 'csv'".to_string());
                }
                Ok(())
            }
            Some(Commands::Extract { file }) => {
                if file.trim().is_empty() {
                    return Err("Table file path cannot be empty".to_string());
                }
                Ok(())
            }
            None => {
                if self.init {
                    Ok(())
                } else {
                    Err("A subcommand is required (use 'analyze' or 'extract', or --init)".to_string())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_args_parse() {
        let cli = Cli::parse_from([
            "lpscout", "analyze", "--url", "https://example.com", "--format", "csv", "-vv",
        ]);
        assert!(cli.validate().is_ok());
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Some(Commands::Analyze { url, format, table, output }) => {
                assert_eq!(url, "https://example.com");
                assert_eq!(format, "csv");
                assert!(table.is_none());
                assert!(output.is_none());
            }
            _ => panic!("expected analyze subcommand"),
        }
    }

    #[test]
    fn test_bad_format_rejected() {
        let cli = Cli::parse_from(["lpscout", "analyze", "--url", "https://example.com", "--format", "xml"]);
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_init_without_subcommand() {
        let cli = Cli::parse_from(["lpscout", "--init"]);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_no_subcommand_rejected() {
        let cli = Cli::parse_from(["lpscout"]);
        assert!(cli.validate().is_err());
    }
}
