use super::*;
use crate::catalog::CatalogItem;
use crate::config::StoreConfig;
use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;
use tempfile::TempDir;

const TEST_DIMENSION: usize = 16;

fn token_embedding(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; TEST_DIMENSION];
    for token in text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        let mut hasher = DefaultHasher::new();
        hasher.write(token.as_bytes());
        let bucket = (hasher.finish() % TEST_DIMENSION as u64) as usize;
        vector[bucket] += 1.0;
    }
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut vector {
            *v /= norm;
        }
    } else {
        // Tokenless input still embeds to a valid (if uninformative) vector
        vector[0] = 1.0;
    }
    vector
}

struct TokenEmbedder;

impl EmbeddingProvider for TokenEmbedder {
    fn embed(&self, text: &str) -> crate::Result<Vec<f32>> {
        Ok(token_embedding(text))
    }
}

/// Embedder that parks its OS thread, then reports whether the async runtime
/// kept making progress in the meantime.
struct ParkingEmbedder {
    runtime_progressed: Arc<std::sync::atomic::AtomicBool>,
}

impl EmbeddingProvider for ParkingEmbedder {
    fn embed(&self, text: &str) -> crate::Result<Vec<f32>> {
        std::thread::sleep(std::time::Duration::from_millis(200));
        if self
            .runtime_progressed
            .load(std::sync::atomic::Ordering::SeqCst)
        {
            Ok(token_embedding(text))
        } else {
            Err(AssistantError::EmbeddingUnavailable(
                "runtime stalled behind embedding call".to_string(),
            ))
        }
    }
}

struct BrokenEmbedder;

impl EmbeddingProvider for BrokenEmbedder {
    fn embed(&self, _text: &str) -> crate::Result<Vec<f32>> {
        Err(AssistantError::EmbeddingUnavailable(
            "provider offline".to_string(),
        ))
    }
}

fn item(id: &str, name: &str, description: &str, categories: &[&str]) -> CatalogItem {
    let text = format!(
        "{}. {} Categories: {}.",
        name,
        description,
        categories.join(", ")
    );
    CatalogItem {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        categories: categories.iter().map(|c| c.to_string()).collect(),
        price: 10.0,
        picture: String::new(),
        embedding: token_embedding(&text),
    }
}

async fn create_engine_with_items(items: Vec<CatalogItem>) -> (SearchEngine, TempDir) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = StoreConfig {
        embedding_dimension: TEST_DIMENSION as u32,
        ..StoreConfig::default()
    };
    let store = CatalogStore::new(temp_dir.path(), &config)
        .await
        .expect("should create catalog store");
    store
        .upsert_batch(items)
        .await
        .expect("should upsert items");

    (SearchEngine::new(store, Arc::new(TokenEmbedder)), temp_dir)
}

fn sample_items() -> Vec<CatalogItem> {
    vec![
        item(
            "OLJCESPC7Z",
            "Sunglasses",
            "Sleek aviator sunglasses for stylish outfits.",
            &["accessories"],
        ),
        item(
            "L9ECAV7KIM",
            "Loafers",
            "A neat addition to your summer wardrobe.",
            &["footwear"],
        ),
        item(
            "LS4PSXUNUM",
            "Salt & Pepper Shakers",
            "Add some flavor to your kitchen.",
            &["kitchen", "home"],
        ),
    ]
}

#[tokio::test]
async fn search_ranks_by_token_overlap() {
    let (engine, _temp_dir) = create_engine_with_items(sample_items()).await;

    let results = engine
        .search("stylish accessories sunglasses", 3)
        .await
        .expect("search should succeed");

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].id, "OLJCESPC7Z");
    for pair in results.windows(2) {
        assert!(pair[0].distance <= pair[1].distance);
    }
}

#[tokio::test]
async fn search_respects_k_bound() {
    let (engine, _temp_dir) = create_engine_with_items(sample_items()).await;

    let capped = engine
        .search("kitchen", 2)
        .await
        .expect("search should succeed");
    assert_eq!(capped.len(), 2);

    let all = engine
        .search("kitchen", 10)
        .await
        .expect("search should succeed");
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn search_on_empty_catalog_returns_empty_list() {
    let (engine, _temp_dir) = create_engine_with_items(vec![]).await;

    let results = engine
        .search("stylish accessories", DEFAULT_TOP_K)
        .await
        .expect("search should succeed");

    assert!(results.is_empty());
}

#[tokio::test]
async fn zero_and_negative_k_are_invalid() {
    let (engine, _temp_dir) = create_engine_with_items(sample_items()).await;

    assert!(matches!(
        engine.search("anything", 0).await,
        Err(AssistantError::InvalidArgument(_))
    ));
    assert!(matches!(
        engine.search("anything", -1).await,
        Err(AssistantError::InvalidArgument(_))
    ));
}

#[tokio::test]
async fn empty_query_text_is_still_embedded() {
    let (engine, _temp_dir) = create_engine_with_items(sample_items()).await;

    // An all-zero query vector still produces an answer; distances are just
    // uninformative. The kernel does not special-case empty queries.
    let results = engine.search("", 3).await.expect("search should succeed");
    assert_eq!(results.len(), 3);
}

// Single-threaded runtime on purpose: if the embedding call ran inline on
// the runtime thread, the timer task below could not fire while it blocks.
#[tokio::test]
async fn embedding_call_does_not_stall_the_runtime() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = StoreConfig {
        embedding_dimension: TEST_DIMENSION as u32,
        ..StoreConfig::default()
    };
    let store = CatalogStore::new(temp_dir.path(), &config)
        .await
        .expect("should create catalog store");
    store
        .upsert_batch(sample_items())
        .await
        .expect("should upsert items");

    let runtime_progressed = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let flag = Arc::clone(&runtime_progressed);
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        flag.store(true, std::sync::atomic::Ordering::SeqCst);
    });

    let engine = SearchEngine::new(store, Arc::new(ParkingEmbedder { runtime_progressed }));
    let results = engine
        .search("kitchen", 1)
        .await
        .expect("search should succeed while other tasks keep running");
    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn provider_failure_surfaces_without_fallback() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = StoreConfig {
        embedding_dimension: TEST_DIMENSION as u32,
        ..StoreConfig::default()
    };
    let store = CatalogStore::new(temp_dir.path(), &config)
        .await
        .expect("should create catalog store");
    let engine = SearchEngine::new(store, Arc::new(BrokenEmbedder));

    assert!(matches!(
        engine.search("anything", 4).await,
        Err(AssistantError::EmbeddingUnavailable(_))
    ));
}
