//! Binary entry point for newsroom.
//!
//! Runs the HTTP API or answers one-shot queries from the command line.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// CLI output goes to stdout/stderr
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::multiple_crate_versions)]

use anyhow::Context;
use clap::{Parser, Subcommand};
use newsroom::config::NewsroomConfig;
use newsroom::observability::{self, InitOptions};
use newsroom::services::{SearchFilters, ServiceContainer};
use newsroom::{SaveRequest, UserId};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Newsroom - cache-backed news aggregation and recommendations.
#[derive(Parser)]
#[command(name = "newsroom")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "NEWSROOM_CONFIG_PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API.
    Serve {
        /// Listen port (overrides configuration).
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Latest articles in a language.
    Latest {
        /// Language code; defaults to the configured language.
        #[arg(short, long)]
        language: Option<String>,
    },

    /// Latest articles from a publisher domain.
    Domain {
        /// Publisher domain, e.g. `bbc`.
        domain: String,

        /// Continue from a provider page token.
        #[arg(short, long)]
        page: Option<String>,
    },

    /// Search article titles.
    Search {
        /// Search term.
        term: String,

        /// Language filter.
        #[arg(short, long)]
        language: Option<String>,

        /// Category filter.
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Sources publishing in a language.
    Sources {
        /// Language code; defaults to the configured language.
        #[arg(short, long)]
        language: Option<String>,
    },

    /// Show a user's saved history.
    History {
        /// User id.
        user: String,
    },

    /// Save articles and sources for a user.
    Save {
        /// User id.
        user: String,

        /// JSON file with `{"articles": [...], "sources": [...]}`.
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Recommend sources and articles for a user.
    Recommend {
        /// User id.
        user: String,
    },
}

/// Main entry point.
#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e:#}");
            return ExitCode::FAILURE;
        },
    };

    let expose_metrics = matches!(cli.command, Commands::Serve { .. });
    let _observability = match observability::init_from_config(
        &config,
        InitOptions {
            verbose: cli.verbose,
            metrics_expose: expose_metrics,
        },
    ) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Failed to initialize observability: {e}");
            return ExitCode::FAILURE;
        },
    };

    match run_command(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

/// Loads configuration from an explicit path or the default locations.
fn load_config(path: Option<&Path>) -> anyhow::Result<NewsroomConfig> {
    let config = match path {
        Some(path) => NewsroomConfig::load_from_file(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => NewsroomConfig::load_default(),
    };
    config.validate()?;
    Ok(config)
}

/// Runs the selected command.
async fn run_command(command: Commands, mut config: NewsroomConfig) -> anyhow::Result<()> {
    if let Commands::Serve { port: Some(port) } = command {
        config.server.port = port;
    }
    let services = ServiceContainer::from_config(&config).await?;
    let aggregation = services.aggregation();

    match command {
        Commands::Serve { .. } => cmd_serve(&config, services.clone()).await,
        Commands::Latest { language } => {
            let language = language.unwrap_or_else(|| aggregation.default_language().to_string());
            print_json(&aggregation.latest_by_language(&language).await?)
        },
        Commands::Domain { domain, page } => match page {
            Some(page) => print_json(&aggregation.domain_page(&domain, &page).await?),
            None => print_json(&aggregation.latest_by_domain(&domain).await?),
        },
        Commands::Search {
            term,
            language,
            category,
        } => {
            let filters = SearchFilters { language, category };
            print_json(&aggregation.search(&term, filters).await?)
        },
        Commands::Sources { language } => {
            let language = language.unwrap_or_else(|| aggregation.default_language().to_string());
            print_json(&aggregation.sources(&language).await?)
        },
        Commands::History { user } => {
            let user = UserId::parse(&user)?;
            print_json(&services.history().fetch_history(&user).await?)
        },
        Commands::Save { user, file } => {
            let user = UserId::parse(&user)?;
            let contents = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let request: SaveRequest = serde_json::from_str(&contents)
                .with_context(|| format!("parsing {}", file.display()))?;
            print_json(&services.history().save_news(&user, request).await?)
        },
        Commands::Recommend { user } => {
            let user = UserId::parse(&user)?;
            print_json(&services.recommender().recommend(&user).await?)
        },
    }
}

#[cfg(feature = "http")]
async fn cmd_serve(config: &NewsroomConfig, services: ServiceContainer) -> anyhow::Result<()> {
    newsroom::http::serve(config, services).await?;
    Ok(())
}

#[cfg(not(feature = "http"))]
async fn cmd_serve(_config: &NewsroomConfig, _services: ServiceContainer) -> anyhow::Result<()> {
    Err(newsroom::Error::FeatureNotEnabled("http".to_string()).into())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
