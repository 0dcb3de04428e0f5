mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;

use wl_core::config::Config;

fn load_config(path: Option<&Path>) -> Config {
    let mut config = Config::load_or_default(path);
    config.apply_env();
    config
}

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = load_config(config_path);

    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting watchlist server");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    wl_server::start(config).await?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise pick defaults from the verbose flag.
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "watchlist=trace,wl_server=trace,wl_db=debug,wl_core=debug,tower_http=debug".to_string()
        } else {
            "watchlist=info,wl_server=info,wl_db=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt().with_env_filter(&env_filter).init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::ImportCsv { file } => import_csv(&file, cli.config.as_deref()),
        Commands::Enrich => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(enrich(cli.config.as_deref()))
        }
        Commands::Validate => validate_config(cli.config.as_deref()),
        Commands::Version => {
            println!("watchlist {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn import_csv(file: &Path, config_path: Option<&Path>) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("CSV file does not exist: {:?}", file);
    }

    let config = load_config(config_path);
    let count = wl_server::import_csv(&config, file)
        .with_context(|| format!("importing {}", file.display()))?;

    println!(
        "Imported {} movies into {}",
        count,
        config.server.db_path.display()
    );
    Ok(())
}

async fn enrich(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path);
    let report = wl_server::enrich_once(config).await?;

    println!(
        "Enriched {}/{} movies ({} failed{})",
        report.updated,
        report.total,
        report.failed,
        if report.cancelled { ", cancelled" } else { "" }
    );
    for failure in &report.failures {
        println!("  {}: {}", failure.id, failure.error);
    }
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let contents = std::fs::read_to_string(p)
                .with_context(|| format!("reading {}", p.display()))?;
            let mut config = Config::from_json(&contents)?;
            config.apply_env();
            config
        }
        None => {
            println!("No config file specified, using defaults");
            load_config(None)
        }
    };

    config.validate_strict()?;

    println!("✓ Configuration is valid");
    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Database: {}", config.server.db_path.display());
    println!(
        "  OMDb key: {}",
        if config.metadata.omdb_api_key.is_some() { "set" } else { "missing" }
    );
    println!("  Workers: {}", config.enrichment.workers);
    println!(
        "  Seed CSV: {} (enabled: {})",
        config.import.csv_path.display(),
        config.import.enabled
    );

    for warning in config.validate() {
        println!("  warning: {warning}");
    }

    Ok(())
}
