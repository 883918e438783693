// Shared test doubles for integration tests

use std::sync::Mutex;

use boutique_assistant::embeddings::EmbeddingProvider;
use boutique_assistant::genai::{GenerativeModel, ImageSource};

/// Embedding dimension used across integration tests
pub const TEST_DIMENSION: usize = 8;

const FEATURES: [&str; TEST_DIMENSION] = [
    "accessor", "cloth", "foot", "hair", "home", "vintage", "photo", "kitchen",
];

/// Deterministic feature-bucket embedding: each dimension counts occurrences
/// of one keyword family, so texts sharing vocabulary land close together
/// under cosine distance. This is a test double, not a provider.
pub fn feature_embedding(text: &str) -> Vec<f32> {
    let lowered = text.to_lowercase();
    let mut vector: Vec<f32> = FEATURES
        .iter()
        .map(|feature| lowered.matches(feature).count() as f32)
        .collect();

    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut vector {
            *v /= norm;
        }
    } else {
        vector[0] = 1.0;
    }
    vector
}

pub struct FeatureEmbedder;

impl EmbeddingProvider for FeatureEmbedder {
    fn embed(&self, text: &str) -> boutique_assistant::Result<Vec<f32>> {
        Ok(feature_embedding(text))
    }
}

/// Generation double returning canned text for both steps
pub struct ScriptedModel {
    pub description: String,
    pub response: String,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(description: &str, response: &str) -> Self {
        Self {
            description: description.to_string(),
            response: response.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

impl GenerativeModel for ScriptedModel {
    fn generate(&self, prompt: &str) -> boutique_assistant::Result<String> {
        self.prompts
            .lock()
            .expect("prompt log lock")
            .push(prompt.to_string());
        Ok(self.response.clone())
    }

    fn describe_image(
        &self,
        _prompt: &str,
        _image: &ImageSource,
    ) -> boutique_assistant::Result<String> {
        Ok(self.description.clone())
    }
}
