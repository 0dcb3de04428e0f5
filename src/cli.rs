use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "watchlist")]
#[command(author, version, about = "Personal movie watchlist with OMDb plot enrichment")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API server
    Start {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Import movies from a CSV export into the database
    ImportCsv {
        /// CSV file to import
        #[arg(required = true)]
        file: PathBuf,
    },

    /// Run one plot enrichment pass and print the report
    Enrich,

    /// Validate configuration file
    Validate,

    /// Display version information
    Version,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_start_overrides() {
        let cli = Cli::try_parse_from(["watchlist", "-v", "start", "--port", "9000"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Start { host, port } => {
                assert_eq!(host, None);
                assert_eq!(port, Some(9000));
            }
            _ => panic!("expected start"),
        }
    }

    #[test]
    fn parses_import_csv() {
        let cli =
            Cli::try_parse_from(["watchlist", "--config", "wl.json", "import-csv", "list.csv"])
                .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("wl.json")));
        assert!(matches!(cli.command, Commands::ImportCsv { ref file } if file == &PathBuf::from("list.csv")));
    }

    #[test]
    fn import_csv_requires_file() {
        assert!(Cli::try_parse_from(["watchlist", "import-csv"]).is_err());
    }
}
