mod repl;
mod server;

use anyhow::{Context, Result};
use blueprint_pipeline::Studio;
use blueprint_services::{HttpBlueprintService, ServiceConfig};
use blueprint_store::PageStore;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "blueprint-studio", version, about = "Turn UI sketches into editable blueprints and code")]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive session over stdin
    Session {
        #[command(flatten)]
        studio: StudioArgs,
    },
    /// Expose the studio as a JSON API
    Serve {
        #[command(flatten)]
        studio: StudioArgs,

        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Print the configured page identifiers
    Pages {
        #[command(flatten)]
        studio: StudioArgs,
    },
}

#[derive(Args, Clone)]
struct StudioArgs {
    /// Page slots, comma separated, fixed for the lifetime of the process
    #[arg(long, value_delimiter = ',', default_value = "home")]
    pages: Vec<String>,

    /// Backend base URL (defaults to BLUEPRINT_API_URL, then http://localhost:5000)
    #[arg(long)]
    api_url: Option<String>,

    /// Request timeout in seconds (defaults to BLUEPRINT_API_TIMEOUT_SECS, then 60)
    #[arg(long)]
    timeout_secs: Option<u64>,
}

impl StudioArgs {
    fn build(&self) -> Result<Studio> {
        let mut config = ServiceConfig::from_env()?;
        if let Some(url) = &self.api_url {
            config = config.with_base_url(url.clone());
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        info!("Using blueprint backend at {}", config.base_url);

        let store = Arc::new(PageStore::new(self.pages.iter().cloned())?);
        let service = Arc::new(HttpBlueprintService::new(config)?);
        Ok(Studio::new(store, service))
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Session { studio } => {
            let studio = studio.build()?;
            repl::run(&studio).await?;
        }
        Commands::Serve { studio, port } => {
            let studio = Arc::new(studio.build()?);
            let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
                .await
                .with_context(|| format!("failed to bind port {}", port))?;
            println!("{} listening on {}", "blueprint-studio".bold(), listener.local_addr()?);
            axum::serve(listener, server::router(studio)).await?;
        }
        Commands::Pages { studio } => {
            let store = PageStore::new(studio.pages.iter().cloned())?;
            for id in store.page_ids() {
                println!("{}", id);
            }
        }
    }

    Ok(())
}
