// Embedding provider seam
// Turns text into fixed-length vectors; the Gemini client is the canonical
// implementation, test doubles stand in behind this trait.

use crate::Result;

/// A provider that turns text into a fixed-length numeric vector.
///
/// Every embedding for a given deployment must come from the same provider
/// and model; mixing embedding sources across one catalog table produces
/// meaningless distances. Provider failures surface as
/// `EmbeddingUnavailable` with no local fallback.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts. Each item's embedding is independent and
    /// order-insensitive; the default implementation embeds one at a time.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.embed(text)).collect()
    }
}
