//! Command-line interface.

use crate::build::{self, read_index};
use crate::config::{Config, expand_path};
use crate::error::Result;
use crate::format::{format_inspection, format_search_response};
use crate::jsdump::IndexFormat;
use crate::search::{Language, Searcher};
use crate::server::{IndexServer, ServerContext};
use crate::worker::{IndexState, spawn_background_worker};
use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use rmcp::{ServiceExt, transport::stdio};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::Level;

#[derive(Debug, Parser)]
#[command(name = "docsearch", version)]
#[command(about = "Build and query static documentation search indices", long_about = None)]
pub struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build or update the search index from documentation sources
    Build {
        /// Configuration file (default: ./docsearch.toml if present)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Source directory, overriding the configuration
        #[arg(long)]
        source: Option<PathBuf>,
        /// Output directory, overriding the configuration
        #[arg(long)]
        output: Option<PathBuf>,
        /// Index format: js or json
        #[arg(long)]
        format: Option<IndexFormat>,
        /// Ignore the previous index and rebuild everything
        #[arg(long)]
        fresh: bool,
    },
    /// Query an index
    Search {
        /// Query text; quote it and prefix words with '-' to exclude them
        #[arg(allow_hyphen_values = true)]
        query: String,
        #[arg(short, long)]
        index: Option<PathBuf>,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print index statistics and check its invariants
    Inspect {
        #[arg(short, long)]
        index: Option<PathBuf>,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Serve the index over MCP on stdio
    Serve {
        #[arg(short, long)]
        index: Option<PathBuf>,
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Rebuild in the background whenever sources change
        #[arg(long)]
        watch: bool,
        /// Seconds between background rebuilds
        #[arg(long, default_value = "5")]
        interval: u64,
    },
}

impl Cli {
    /// Log level selected by `-v` flags.
    pub fn log_level(&self) -> Level {
        match self.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }

    /// Runs the selected command. Returns the process exit code.
    pub async fn run(self) -> Result<i32> {
        match self.command {
            Commands::Build {
                config,
                source,
                output,
                format,
                fresh,
            } => {
                let mut config = Config::discover(config.as_deref())?;
                if let Some(source) = source {
                    config.project.source_dir = expand_path(&source);
                }
                if let Some(output) = output {
                    config.project.output_dir = expand_path(&output);
                }
                if let Some(format) = format {
                    config.project.format = format;
                }
                let report = build::build(&config, fresh).await?;
                println!("{}", report);
                Ok(0)
            }
            Commands::Search {
                query,
                index,
                config,
                limit,
                json,
            } => {
                let config = Config::discover(config.as_deref())?;
                let path = index.map_or_else(|| config.index_path(), |p| expand_path(&p));
                let index = read_index(&path).await?;
                let language =
                    Language::new(&config.search.language, &config.search.extra_stopwords)?;
                let response = Searcher::new(&index, &language, &config.scorer).search(&query, limit);
                if json {
                    let text = serde_json::to_string_pretty(&response)
                        .context("Failed to serialize results")?;
                    println!("{}", text);
                } else {
                    print!("{}", format_search_response(&response));
                }
                Ok(0)
            }
            Commands::Inspect { index, config } => {
                let config = Config::discover(config.as_deref())?;
                let path = index.map_or_else(|| config.index_path(), |p| expand_path(&p));
                let index = read_index(&path).await?;
                let problems = index.validate();
                println!("Index:         {}", path.display());
                print!("{}", format_inspection(&index, &problems));
                Ok(if problems.is_empty() { 0 } else { 1 })
            }
            Commands::Serve {
                index,
                config,
                watch,
                interval,
            } => {
                let config = Config::discover(config.as_deref())?;
                serve(config, index.map(|p| expand_path(&p)), watch, Duration::from_secs(interval))
                    .await?;
                Ok(0)
            }
        }
    }
}

async fn serve(config: Config, index: Option<PathBuf>, watch: bool, period: Duration) -> Result<()> {
    let state = Arc::new(IndexState::new());
    let context = Arc::new(ServerContext::new(config.clone(), index, state.clone())?);
    tracing::info!("Serving {} over MCP", context.index_path().display());

    let cancel = CancellationToken::new();
    let worker = watch.then(|| spawn_background_worker(config, state, period, cancel.clone()));

    let service = IndexServer::new(context)
        .serve(stdio())
        .await
        .inspect_err(|e| tracing::error!("Error serving MCP server: {:?}", e))?;
    service.waiting().await?;

    cancel.cancel();
    if let Some(worker) = worker {
        let _ = worker.await;
    }
    Ok(())
}
