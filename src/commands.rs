use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::assistant::RecommendationAssistant;
use crate::catalog::{self, CatalogStore};
use crate::config::Config;
use crate::gemini::GeminiClient;
use crate::loader::CatalogLoader;
use crate::search::SearchEngine;
use crate::server::{self, AppState};
use crate::{Result, secrets};

/// Build the Gemini client, resolving the API key secret once at startup.
/// A missing secret is fatal.
fn build_gemini_client(config: &Config) -> Result<GeminiClient> {
    let api_key = secrets::get_secret(
        &config.gemini.api_key_secret,
        &config.secrets_dir_path(),
    )?;
    Ok(GeminiClient::new(&config.gemini, api_key)
        .context("Failed to initialize Gemini client")?)
}

async fn build_store(config: &Config) -> Result<CatalogStore> {
    CatalogStore::new(&config.catalog_db_path(), &config.store).await
}

/// Populate the catalog store from the canonical product list
pub async fn load_catalog(config: &Config, products_file: Option<PathBuf>) -> Result<()> {
    let products_file = products_file.unwrap_or_else(|| config.loader.products_file.clone());
    info!("Loading catalog from {}", products_file.display());

    let store = build_store(config).await?;
    let client = Arc::new(build_gemini_client(config)?);
    let loader = CatalogLoader::new(store, client, &config.loader);

    let report = loader.load_from_file(&products_file).await?;

    println!("Catalog load finished");
    println!("  Items attempted: {}", report.attempted);
    println!("  Items stored:    {}", report.stored);
    for failure in &report.failures {
        println!("  Failed: {} ({})", failure.id, failure.reason);
    }

    // Under-population is incomplete initialization, not success
    report.into_result()?;
    Ok(())
}

/// Run a similarity search from the command line and print the ranked results
pub async fn run_search(config: &Config, query: &str, k: i64) -> Result<()> {
    let store = build_store(config).await?;
    let client = Arc::new(build_gemini_client(config)?);
    let engine = SearchEngine::new(store, client);

    let results = engine.search(query, k).await?;

    if results.is_empty() {
        println!("No catalog items found");
        return Ok(());
    }

    println!("Top {} results for \"{}\":", results.len(), query);
    for result in &results {
        println!(
            "  {}  {}  (distance {:.4}, categories: {})",
            result.id,
            result.name,
            result.distance,
            result.categories.join(", ")
        );
    }

    Ok(())
}

/// Start the HTTP recommendation service
pub async fn serve(config: &Config, port: Option<u16>) -> Result<()> {
    let store = build_store(config).await?;
    let client = Arc::new(build_gemini_client(config)?);

    let stored = store.count().await?;
    if stored == 0 {
        tracing::warn!("Catalog is empty; searches will return no results. Run `load` first.");
    }

    let engine = SearchEngine::new(store, client.clone());
    let assistant = RecommendationAssistant::new(engine, client);
    let state = Arc::new(AppState { assistant });

    let port = port.unwrap_or(config.server.port);
    server::serve(state, &config.server.host, port).await
}

/// Report how many items are stored versus expected from the product list
pub async fn show_status(config: &Config) -> Result<()> {
    let store = build_store(config).await?;
    let stored = store.count().await?;

    println!("Catalog store: {}", config.catalog_db_path().display());
    println!("  Items stored: {}", stored);

    if config.loader.products_file.exists() {
        let expected = catalog::load_products(&config.loader.products_file)?.len();
        println!("  Items expected: {}", expected);
        if (stored as usize) < expected {
            println!("  Status: INCOMPLETE (run `load` to repopulate)");
        } else {
            println!("  Status: ready");
        }
    } else {
        println!(
            "  Products file not found: {}",
            config.loader.products_file.display()
        );
    }

    Ok(())
}
