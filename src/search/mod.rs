// Similarity search engine
// Answers "what are the k catalog items most relevant to this text?" as a
// single embed-then-retrieve operation.

#[cfg(test)]
mod tests;

use std::sync::Arc;

use tracing::debug;

use crate::catalog::{CatalogStore, SearchResult};
use crate::embeddings::EmbeddingProvider;
use crate::{AssistantError, Result};

/// Default result count. Results feed a bounded natural-language prompt, so
/// k stays small.
pub const DEFAULT_TOP_K: i64 = 4;

pub struct SearchEngine {
    store: CatalogStore,
    provider: Arc<dyn EmbeddingProvider>,
}

impl SearchEngine {
    pub fn new(store: CatalogStore, provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { store, provider }
    }

    /// Return the `k` catalog items nearest to `query_text`, ordered by
    /// ascending cosine distance.
    ///
    /// An empty catalog yields an empty list. Empty query text is embedded
    /// as-is; what it means is the provider's business. `k <= 0` is a caller
    /// bug and fails with `InvalidArgument`.
    pub async fn search(&self, query_text: &str, k: i64) -> Result<Vec<SearchResult>> {
        if k <= 0 {
            return Err(AssistantError::InvalidArgument(format!(
                "k must be positive, got {}",
                k
            )));
        }

        debug!("Similarity search (k = {}, query length: {})", k, query_text.len());

        let provider = Arc::clone(&self.provider);
        let text = query_text.to_string();
        let query_vector = crate::run_blocking(move || provider.embed(&text)).await?;
        let results = self.store.get_nearest(&query_vector, k as usize).await?;

        debug!("Similarity search returned {} results", results.len());
        Ok(results)
    }
}
