// Catalog data model
// Canonical product records, stored catalog items, and search results


pub mod store;

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::{AssistantError, Result};

pub use store::CatalogStore;

/// A product record from the canonical catalog list (`products.json`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub picture: String,
    pub price_usd: PriceUsd,
    #[serde(default)]
    pub categories: Vec<String>,
}

/// Nested price representation: integer major units plus billionths
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PriceUsd {
    #[serde(default)]
    pub currency_code: String,
    #[serde(default)]
    pub units: i64,
    #[serde(default)]
    pub nanos: i64,
}

#[derive(Debug, Deserialize)]
struct ProductList {
    products: Vec<Product>,
}

/// A catalog row as stored, embedding included.
///
/// Rows are all-or-nothing: an item either has every field including an
/// embedding of the configured dimension, or it is not stored at all.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogItem {
    pub id: String,
    pub name: String,
    pub description: String,
    pub categories: Vec<String>,
    pub price: f64,
    pub picture: String,
    pub embedding: Vec<f32>,
}

/// A ranked row returned from nearest-neighbor search
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SearchResult {
    pub id: String,
    pub name: String,
    pub description: String,
    pub categories: Vec<String>,
    /// Cosine distance from the query vector; smaller means more similar.
    pub distance: f32,
}

impl Product {
    /// Build the deterministic text projection used as the embedding source:
    /// name and description, followed by a normalized category phrase.
    pub fn embedding_text(&self) -> String {
        let mut text = format!("{}. {}", self.name, self.description);
        if !self.categories.is_empty() {
            text.push_str(&format!(" Categories: {}.", self.categories.join(", ")));
        }
        text
    }

    /// Collapse the nested units/nanos price into a decimal rounded to 2 places
    pub fn price_decimal(&self) -> f64 {
        let price = self.price_usd.units as f64 + self.price_usd.nanos as f64 / 1_000_000_000.0;
        (price * 100.0).round() / 100.0
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(AssistantError::InvalidArgument(
                "Product id cannot be empty".to_string(),
            ));
        }
        if self.name.trim().is_empty() || self.description.trim().is_empty() {
            return Err(AssistantError::InvalidArgument(format!(
                "Product {} is missing a name or description",
                self.id
            )));
        }
        if self.price_decimal() < 0.0 {
            return Err(AssistantError::InvalidArgument(format!(
                "Product {} has a negative price",
                self.id
            )));
        }
        Ok(())
    }

    /// Attach an embedding, producing the storable item
    pub fn into_item(self, embedding: Vec<f32>) -> CatalogItem {
        let price = self.price_decimal();
        CatalogItem {
            id: self.id,
            name: self.name,
            description: self.description,
            categories: self.categories,
            price,
            picture: self.picture,
            embedding,
        }
    }
}

/// Load the canonical product list from a JSON file
pub fn load_products<P: AsRef<Path>>(path: P) -> Result<Vec<Product>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read products file: {}", path.display()))?;

    let list: ProductList = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse products file: {}", path.display()))?;

    for product in &list.products {
        product.validate()?;
    }

    Ok(list.products)
}
