// Catalog loader
// Clear-and-reload bulk population of the catalog store from the canonical
// product list, one embedding per item.

#[cfg(test)]
mod tests;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::catalog::{self, CatalogItem, CatalogStore, Product};
use crate::config::LoaderConfig;
use crate::embeddings::EmbeddingProvider;
use crate::{AssistantError, Result};

/// Bulk loader that projects canonical product records into stored catalog
/// items. Re-running it with the same input yields the same stored state.
pub struct CatalogLoader {
    store: CatalogStore,
    provider: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
    batch_delay: Duration,
}

/// Outcome of a load run. `attempted` counts every product in the input;
/// `stored` counts the items that made it into the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub attempted: usize,
    pub stored: usize,
    pub failures: Vec<LoadFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadFailure {
    pub id: String,
    pub reason: String,
}

impl LoadReport {
    pub fn is_complete(&self) -> bool {
        self.stored == self.attempted
    }

    /// Turn an under-populated run into the error the caller must see
    pub fn into_result(self) -> Result<Self> {
        if self.is_complete() {
            Ok(self)
        } else {
            Err(AssistantError::IncompletePopulation {
                attempted: self.attempted,
                stored: self.stored,
            })
        }
    }
}

impl CatalogLoader {
    pub fn new(
        store: CatalogStore,
        provider: Arc<dyn EmbeddingProvider>,
        config: &LoaderConfig,
    ) -> Self {
        Self {
            store,
            provider,
            batch_size: config.batch_size as usize,
            batch_delay: Duration::from_millis(config.batch_delay_ms),
        }
    }

    /// Load the product list at `path` into the store
    pub async fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<LoadReport> {
        let products = catalog::load_products(path)?;
        self.load(products).await
    }

    /// Clear the store and repopulate it from `products`.
    ///
    /// A single item's embedding failure does not abort the run; the item is
    /// skipped and recorded in the report. Store errors propagate.
    pub async fn load(&self, products: Vec<Product>) -> Result<LoadReport> {
        let attempted = products.len();
        info!("Loading {} products into catalog", attempted);

        self.store.clear().await?;

        let mut stored = 0;
        let mut failures = Vec::new();
        let batch_count = products.len().div_ceil(self.batch_size.max(1));

        for (batch_index, batch) in products.chunks(self.batch_size.max(1)).enumerate() {
            debug!(
                "Embedding batch {}/{} ({} products)",
                batch_index + 1,
                batch_count,
                batch.len()
            );

            let items = self.embed_batch_items(batch, &mut failures).await;

            if !items.is_empty() {
                let count = items.len();
                self.store.upsert_batch(items).await?;
                stored += count;
            }

            // Backpressure against provider rate limits
            if batch_index + 1 < batch_count {
                sleep(self.batch_delay).await;
            }
        }

        if let Err(e) = self.store.create_vector_index().await {
            warn!("Failed to create vector index after load: {}", e);
        }

        let report = LoadReport {
            attempted,
            stored,
            failures,
        };

        if report.is_complete() {
            info!("Catalog load complete: {} items stored", report.stored);
        } else {
            warn!(
                "Catalog load incomplete: {} of {} items stored ({} failures)",
                report.stored,
                report.attempted,
                report.failures.len()
            );
        }

        Ok(report)
    }

    /// Embed one batch of products, falling back to per-item embedding when
    /// the batch call fails so a single bad item cannot sink its neighbors.
    /// Provider calls are blocking and run on the blocking pool.
    async fn embed_batch_items(
        &self,
        batch: &[Product],
        failures: &mut Vec<LoadFailure>,
    ) -> Vec<CatalogItem> {
        let texts: Vec<String> = batch.iter().map(Product::embedding_text).collect();

        let provider = Arc::clone(&self.provider);
        match crate::run_blocking(move || provider.embed_batch(&texts)).await {
            Ok(embeddings) => batch
                .iter()
                .zip(embeddings)
                .map(|(product, embedding)| product.clone().into_item(embedding))
                .collect(),
            Err(batch_error) => {
                debug!(
                    "Batch embedding failed ({}), retrying items individually",
                    batch_error
                );

                let mut items = Vec::with_capacity(batch.len());
                for product in batch {
                    let provider = Arc::clone(&self.provider);
                    let text = product.embedding_text();
                    match crate::run_blocking(move || provider.embed(&text)).await {
                        Ok(embedding) => items.push(product.clone().into_item(embedding)),
                        Err(e) => {
                            error!("Failed to embed product {}: {}", product.id, e);
                            failures.push(LoadFailure {
                                id: product.id.clone(),
                                reason: e.to_string(),
                            });
                        }
                    }
                }
                items
            }
        }
    }
}
