use super::*;
use crate::config::StoreConfig;
use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;
use tempfile::TempDir;

const TEST_DIMENSION: usize = 16;

/// Deterministic bag-of-tokens embedding: shared tokens produce nearby
/// vectors, which is all the loader tests need from a provider.
fn token_embedding(text: &str, dimension: usize) -> Vec<f32> {
    let mut vector = vec![0.0f32; dimension];
    for token in text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        let mut hasher = DefaultHasher::new();
        hasher.write(token.as_bytes());
        let bucket = (hasher.finish() % dimension as u64) as usize;
        vector[bucket] += 1.0;
    }
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut vector {
            *v /= norm;
        }
    }
    vector
}

/// Test double that fails for any text containing one of the markers
struct FlakyEmbedder {
    fail_markers: Vec<String>,
}

impl FlakyEmbedder {
    fn reliable() -> Self {
        Self {
            fail_markers: Vec::new(),
        }
    }
}

impl EmbeddingProvider for FlakyEmbedder {
    fn embed(&self, text: &str) -> crate::Result<Vec<f32>> {
        if self.fail_markers.iter().any(|m| text.contains(m)) {
            return Err(AssistantError::EmbeddingUnavailable(
                "simulated provider failure".to_string(),
            ));
        }
        Ok(token_embedding(text, TEST_DIMENSION))
    }
}

async fn create_test_store() -> (CatalogStore, TempDir) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = StoreConfig {
        embedding_dimension: TEST_DIMENSION as u32,
        ..StoreConfig::default()
    };
    let store = CatalogStore::new(temp_dir.path(), &config)
        .await
        .expect("should create catalog store");
    (store, temp_dir)
}

fn fast_loader_config() -> LoaderConfig {
    LoaderConfig {
        batch_size: 5,
        batch_delay_ms: 0,
        ..LoaderConfig::default()
    }
}

fn canonical_products() -> Vec<Product> {
    catalog::load_products("products.json").expect("should load canonical products")
}

#[tokio::test]
async fn loads_full_canonical_catalog() {
    let (store, _temp_dir) = create_test_store().await;
    let loader = CatalogLoader::new(
        store.clone(),
        Arc::new(FlakyEmbedder::reliable()),
        &fast_loader_config(),
    );

    let report = loader
        .load(canonical_products())
        .await
        .expect("load should succeed");

    assert_eq!(report.attempted, 9);
    assert_eq!(report.stored, 9);
    assert!(report.is_complete());
    assert!(report.failures.is_empty());
    assert_eq!(store.count().await.expect("should count rows"), 9);
}

#[tokio::test]
async fn partial_embedding_failure_skips_items_and_reports() {
    let (store, _temp_dir) = create_test_store().await;
    let provider = FlakyEmbedder {
        fail_markers: vec!["Sunglasses".to_string(), "Typewriter".to_string()],
    };
    let loader = CatalogLoader::new(store.clone(), Arc::new(provider), &fast_loader_config());

    let report = loader
        .load(canonical_products())
        .await
        .expect("load should not abort on per-item failures");

    assert_eq!(report.attempted, 9);
    assert_eq!(report.stored, 7);
    assert_eq!(report.failures.len(), 2);
    assert!(!report.is_complete());
    assert_eq!(store.count().await.expect("should count rows"), 7);

    let failed_ids: Vec<&str> = report.failures.iter().map(|f| f.id.as_str()).collect();
    assert!(failed_ids.contains(&"OLJCESPC7Z"));
    assert!(failed_ids.contains(&"9SIQT8TOJO"));
}

#[tokio::test]
async fn incomplete_report_converts_to_error() {
    let report = LoadReport {
        attempted: 9,
        stored: 7,
        failures: vec![],
    };

    assert!(matches!(
        report.into_result(),
        Err(AssistantError::IncompletePopulation {
            attempted: 9,
            stored: 7
        })
    ));

    let complete = LoadReport {
        attempted: 9,
        stored: 9,
        failures: vec![],
    };
    assert!(complete.into_result().is_ok());
}

#[tokio::test]
async fn reloading_is_idempotent() {
    let (store, _temp_dir) = create_test_store().await;
    let loader = CatalogLoader::new(
        store.clone(),
        Arc::new(FlakyEmbedder::reliable()),
        &fast_loader_config(),
    );

    loader
        .load(canonical_products())
        .await
        .expect("first load should succeed");
    let first_nearest = store
        .get_nearest(&token_embedding("stylish accessories", TEST_DIMENSION), 4)
        .await
        .expect("search should succeed");

    loader
        .load(canonical_products())
        .await
        .expect("second load should succeed");
    let second_nearest = store
        .get_nearest(&token_embedding("stylish accessories", TEST_DIMENSION), 4)
        .await
        .expect("search should succeed");

    assert_eq!(store.count().await.expect("should count rows"), 9);
    assert_eq!(first_nearest, second_nearest);
}

#[tokio::test]
async fn load_clears_previous_contents() {
    let (store, _temp_dir) = create_test_store().await;
    let loader = CatalogLoader::new(
        store.clone(),
        Arc::new(FlakyEmbedder::reliable()),
        &fast_loader_config(),
    );

    loader
        .load(canonical_products())
        .await
        .expect("first load should succeed");

    let subset: Vec<Product> = canonical_products().into_iter().take(2).collect();
    let report = loader
        .load(subset)
        .await
        .expect("second load should succeed");

    assert_eq!(report.stored, 2);
    assert_eq!(store.count().await.expect("should count rows"), 2);
}

#[tokio::test]
async fn load_from_file_reads_canonical_list() {
    let (store, _temp_dir) = create_test_store().await;
    let loader = CatalogLoader::new(
        store.clone(),
        Arc::new(FlakyEmbedder::reliable()),
        &fast_loader_config(),
    );

    let report = loader
        .load_from_file("products.json")
        .await
        .expect("load should succeed");

    assert_eq!(report.attempted, 9);
    assert!(report.is_complete());
}
