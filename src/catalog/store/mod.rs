
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use arrow::array::{Array, FixedSizeListArray, Float32Array, Float64Array, RecordBatchIterator, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::{
    Connection, DistanceType,
    query::{ExecutableQuery, QueryBase},
};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::{CatalogItem, SearchResult};
use crate::config::StoreConfig;
use crate::{AssistantError, Result};

const CONNECT_BACKOFF_BASE: u64 = 2;

/// Durable keyed storage of catalog items with a nearest-neighbor-capable
/// index on the embedding column, backed by LanceDB.
#[derive(Clone)]
pub struct CatalogStore {
    connection: Connection,
    table_name: String,
    dimension: usize,
}

impl CatalogStore {
    /// Open (or create) the catalog table at `db_path`.
    ///
    /// Connection attempts are retried with exponential backoff up to the
    /// configured budget; exhausting it fails with `StoreUnavailable`.
    pub async fn new(db_path: &Path, config: &StoreConfig) -> Result<Self> {
        debug!("Initializing catalog store at path: {:?}", db_path);

        std::fs::create_dir_all(db_path).map_err(|e| {
            AssistantError::Store(format!("Failed to create catalog directory: {}", e))
        })?;

        let uri = format!("file://{}", db_path.display());
        let connection = Self::connect_with_retry(&uri, config.connect_retry_attempts).await?;

        let store = Self {
            connection,
            table_name: config.table_name.clone(),
            dimension: config.embedding_dimension as usize,
        };

        store.initialize_table().await?;

        info!(
            "Catalog store initialized (table: {}, dimension: {})",
            store.table_name, store.dimension
        );
        Ok(store)
    }

    async fn connect_with_retry(uri: &str, attempts: u32) -> Result<Connection> {
        let mut last_error = None;

        for attempt in 1..=attempts {
            debug!("Catalog store connection attempt {}/{}", attempt, attempts);

            match lancedb::connect(uri).execute().await {
                Ok(connection) => return Ok(connection),
                Err(e) => {
                    warn!(
                        "Catalog store connection failed (attempt {}/{}): {}",
                        attempt, attempts, e
                    );
                    last_error = Some(e);

                    if attempt < attempts {
                        let delay = Duration::from_millis(
                            CONNECT_BACKOFF_BASE.pow(attempt - 1) * 1000,
                        );
                        sleep(delay).await;
                    }
                }
            }
        }

        Err(AssistantError::StoreUnavailable(
            last_error.map_or_else(
                || "connection failed after retries".to_string(),
                |e| e.to_string(),
            ),
        ))
    }

    async fn initialize_table(&self) -> Result<()> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| AssistantError::Store(format!("Failed to list tables: {}", e)))?;

        if table_names.contains(&self.table_name) {
            debug!("Catalog table already exists");
            return Ok(());
        }

        info!("Creating catalog table: {}", self.table_name);

        let schema = self.create_schema();
        self.connection
            .create_empty_table(&self.table_name, schema)
            .execute()
            .await
            .map_err(|e| AssistantError::Store(format!("Failed to create table: {}", e)))?;

        Ok(())
    }

    fn create_schema(&self) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("name", DataType::Utf8, false),
            Field::new("description", DataType::Utf8, false),
            Field::new("categories", DataType::Utf8, false),
            Field::new("price", DataType::Float64, false),
            Field::new("picture", DataType::Utf8, false),
            Field::new(
                "embedding",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, false)),
                    self.dimension as i32,
                ),
                false,
            ),
        ]))
    }

    /// Insert or fully replace a single item keyed by its id
    pub async fn upsert(&self, item: CatalogItem) -> Result<()> {
        self.upsert_batch(vec![item]).await
    }

    /// Insert or fully replace a batch of items keyed by their ids.
    ///
    /// Each row is written as a complete record, so a reader never observes a
    /// row mixing old and new columns. Writes with an embedding of the wrong
    /// dimension fail with `SchemaInvalid` before anything is touched.
    ///
    /// Categories are stored comma-joined in a single column, so a category
    /// name containing a comma cannot round-trip; such items are rejected
    /// with `InvalidArgument` before anything is written.
    pub async fn upsert_batch(&self, items: Vec<CatalogItem>) -> Result<()> {
        if items.is_empty() {
            debug!("No items to upsert");
            return Ok(());
        }

        for item in &items {
            if item.embedding.len() != self.dimension {
                return Err(AssistantError::SchemaInvalid {
                    expected: self.dimension,
                    actual: item.embedding.len(),
                });
            }
            if let Some(category) = item.categories.iter().find(|c| c.contains(',')) {
                return Err(AssistantError::InvalidArgument(format!(
                    "Category name '{}' for item {} must not contain a comma",
                    category, item.id
                )));
            }
        }

        debug!("Upserting batch of {} catalog items", items.len());

        let record_batch = self.create_record_batch(&items)?;
        let table = self.open_table().await?;

        // Replace-by-id: remove any existing rows for these ids, then insert
        // the fresh rows as one batch.
        let id_list = items
            .iter()
            .map(|item| format!("'{}'", item.id.replace('\'', "''")))
            .collect::<Vec<_>>()
            .join(", ");
        table
            .delete(&format!("id IN ({})", id_list))
            .await
            .map_err(|e| AssistantError::Store(format!("Failed to delete existing rows: {}", e)))?;

        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| AssistantError::Store(format!("Failed to insert catalog items: {}", e)))?;

        info!("Upserted {} catalog items", items.len());
        Ok(())
    }

    fn create_record_batch(&self, items: &[CatalogItem]) -> Result<RecordBatch> {
        let len = items.len();

        let mut ids = Vec::with_capacity(len);
        let mut names = Vec::with_capacity(len);
        let mut descriptions = Vec::with_capacity(len);
        let mut categories = Vec::with_capacity(len);
        let mut prices = Vec::with_capacity(len);
        let mut pictures = Vec::with_capacity(len);

        for item in items {
            ids.push(item.id.as_str());
            names.push(item.name.as_str());
            descriptions.push(item.description.as_str());
            categories.push(item.categories.join(","));
            prices.push(item.price);
            pictures.push(item.picture.as_str());
        }

        let mut flat_values = Vec::with_capacity(len * self.dimension);
        for item in items {
            flat_values.extend_from_slice(&item.embedding);
        }
        let values_array = Float32Array::from(flat_values);
        let field = Arc::new(Field::new("item", DataType::Float32, false));
        let embedding_array = FixedSizeListArray::try_new(
            field,
            self.dimension as i32,
            Arc::new(values_array),
            None,
        )
        .map_err(|e| AssistantError::Store(format!("Failed to create embedding array: {}", e)))?;

        let arrays: Vec<Arc<dyn Array>> = vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(StringArray::from(names)),
            Arc::new(StringArray::from(descriptions)),
            Arc::new(StringArray::from(categories)),
            Arc::new(Float64Array::from(prices)),
            Arc::new(StringArray::from(pictures)),
            Arc::new(embedding_array),
        ];

        RecordBatch::try_new(self.create_schema(), arrays)
            .map_err(|e| AssistantError::Store(format!("Failed to create record batch: {}", e)))
    }

    /// Return up to `k` rows ordered by ascending cosine distance from the
    /// query vector. Fewer than `k` stored rows means all rows are returned.
    /// Ties are broken in an unspecified but stable order.
    pub async fn get_nearest(&self, query_vector: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        debug!("Searching catalog for {} nearest items", k);

        let table = self.open_table().await?;

        let results = table
            .vector_search(query_vector)
            .map_err(|e| AssistantError::Store(format!("Failed to create vector search: {}", e)))?
            .column("embedding")
            .distance_type(DistanceType::Cosine)
            .limit(k)
            .execute()
            .await
            .map_err(|e| AssistantError::Store(format!("Failed to execute search: {}", e)))?;

        let batches: Vec<RecordBatch> = results
            .try_collect()
            .await
            .map_err(|e| AssistantError::Store(format!("Failed to read result stream: {}", e)))?;

        let mut search_results = Vec::new();
        for batch in &batches {
            search_results.extend(Self::parse_search_batch(batch)?);
        }

        debug!("Found {} nearest catalog items", search_results.len());
        Ok(search_results)
    }

    fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<SearchResult>> {
        let ids = string_column(batch, "id")?;
        let names = string_column(batch, "name")?;
        let descriptions = string_column(batch, "description")?;
        let categories = string_column(batch, "categories")?;

        // A result batch without distances means the store broke its ranking
        // contract; refusing is better than reporting a fake perfect match.
        let distances = batch
            .column_by_name("_distance")
            .ok_or_else(|| {
                AssistantError::Store("Missing _distance column in search results".to_string())
            })?
            .as_any()
            .downcast_ref::<Float32Array>()
            .ok_or_else(|| {
                AssistantError::Store("Invalid _distance column type".to_string())
            })?;

        let mut search_results = Vec::with_capacity(batch.num_rows());
        for row in 0..batch.num_rows() {
            if distances.is_null(row) {
                return Err(AssistantError::Store(format!(
                    "Null distance for result row {}",
                    ids.value(row)
                )));
            }
            let distance = distances.value(row);

            let category_list = categories.value(row);
            let category_list = if category_list.is_empty() {
                Vec::new()
            } else {
                category_list.split(',').map(str::to_string).collect()
            };

            search_results.push(SearchResult {
                id: ids.value(row).to_string(),
                name: names.value(row).to_string(),
                description: descriptions.value(row).to_string(),
                categories: category_list,
                distance,
            });
        }

        Ok(search_results)
    }

    /// Total number of stored catalog items
    pub async fn count(&self) -> Result<u64> {
        let table = self.open_table().await?;

        let count = table
            .count_rows(None)
            .await
            .map_err(|e| AssistantError::Store(format!("Failed to count rows: {}", e)))?;

        Ok(count as u64)
    }

    /// Remove every stored row. Used by the loader before a full reload.
    pub async fn clear(&self) -> Result<()> {
        let table = self.open_table().await?;

        table
            .delete("true")
            .await
            .map_err(|e| AssistantError::Store(format!("Failed to clear catalog: {}", e)))?;

        info!("Cleared catalog table");
        Ok(())
    }

    /// Build (or rebuild) the ANN index on the embedding column.
    ///
    /// Search falls back to exact scanning while no index exists, so this is
    /// a performance concern, not a correctness one.
    pub async fn create_vector_index(&self) -> Result<()> {
        debug!("Creating vector index on embedding column");

        let table = self.open_table().await?;

        table
            .create_index(&["embedding"], lancedb::index::Index::Auto)
            .execute()
            .await
            .map_err(|e| AssistantError::Store(format!("Failed to create vector index: {}", e)))?;

        info!("Vector index created");
        Ok(())
    }

    async fn open_table(&self) -> Result<lancedb::Table> {
        self.connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| AssistantError::Store(format!("Failed to open table: {}", e)))
    }
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .ok_or_else(|| AssistantError::Store(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| AssistantError::Store(format!("Invalid {} column type", name)))
}
