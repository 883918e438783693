use std::path::PathBuf;

use boutique_assistant::Result;
use boutique_assistant::commands::{load_catalog, run_search, serve, show_status};
use boutique_assistant::config::{Config, default_base_dir};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "boutique-assistant")]
#[command(about = "Retrieval-augmented shopping assistant with catalog vector search")]
#[command(version)]
struct Cli {
    /// Override the configuration/data directory
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Populate the catalog store from the canonical product list
    Load {
        /// Path to the products JSON file
        #[arg(long)]
        products: Option<PathBuf>,
    },
    /// Start the HTTP recommendation service
    Serve {
        /// Port to listen on (overrides configuration)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run a similarity search against the catalog
    Search {
        /// Free-text query
        query: String,
        /// Number of results to return
        #[arg(long, default_value_t = 4)]
        k: i64,
    },
    /// Show catalog population status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => default_base_dir().map_err(|e| boutique_assistant::AssistantError::Config(e.to_string()))?,
    };
    let config = Config::load(&config_dir)?;

    match cli.command {
        Commands::Load { products } => {
            load_catalog(&config, products).await?;
        }
        Commands::Serve { port } => {
            serve(&config, port).await?;
        }
        Commands::Search { query, k } => {
            run_search(&config, &query, k).await?;
        }
        Commands::Status => {
            show_status(&config).await?;
        }
    }

    Ok(())
}
