// Recommendation orchestrator
// Chains the room-description call, the similarity search, and the final
// recommendation call into one sequential request.


use std::sync::Arc;
use std::sync::LazyLock;

use anyhow::Context;
use fancy_regex::Regex;
use tracing::{debug, info, warn};

use crate::Result;
use crate::catalog::SearchResult;
use crate::genai::{GenerativeModel, ImageSource};
use crate::search::{DEFAULT_TOP_K, SearchEngine};

/// The generation step is instructed to reference at most this many product
/// IDs, all drawn from the supplied results.
pub const MAX_REFERENCED_IDS: usize = 3;

const ROOM_DESCRIPTION_PROMPT: &str = "You are a professional interior designer, give me a \
     detailed description of the style of the room in this image";

static ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([A-Z0-9]+)\]").expect("ID pattern is a valid regex")
});

pub struct RecommendationAssistant {
    search: SearchEngine,
    model: Arc<dyn GenerativeModel>,
}

/// The assistant's answer: the generated text plus the product IDs it
/// referenced, already checked against the retrieved candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recommendation {
    pub content: String,
    pub referenced_ids: Vec<String>,
}

impl RecommendationAssistant {
    pub fn new(search: SearchEngine, model: Arc<dyn GenerativeModel>) -> Self {
        Self { search, model }
    }

    /// Run the full chain: describe the room, search the catalog with a
    /// composite query, and generate the recommendation.
    pub async fn recommend(&self, user_message: &str, image: &ImageSource) -> Result<Recommendation> {
        info!("Beginning recommendation chain");

        let model = Arc::clone(&self.model);
        let image = image.clone();
        let room_description =
            crate::run_blocking(move || model.describe_image(ROOM_DESCRIPTION_PROMPT, &image))
                .await?;
        debug!("Room description: {}", room_description);

        let query = build_query(user_message, &room_description);
        let docs = self.search.search(&query, DEFAULT_TOP_K).await?;
        info!("Retrieved {} candidate products", docs.len());

        let prompt = build_recommendation_prompt(user_message, &room_description, &docs)?;
        let model = Arc::clone(&self.model);
        let content = crate::run_blocking(move || model.generate(&prompt)).await?;

        let referenced_ids = referenced_ids(&content, &docs);
        info!(
            "Recommendation references {} products",
            referenced_ids.len()
        );

        Ok(Recommendation {
            content,
            referenced_ids,
        })
    }
}

/// Deterministic composite query combining the user's request with the
/// room-style description.
pub fn build_query(user_message: &str, room_description: &str) -> String {
    format!(
        "This is the user's request: {} Find the most relevant items for that prompt, \
         while matching style of the room described here: {}",
        user_message, room_description
    )
}

/// Assemble the final generation prompt: room description, candidate product
/// documents, and the user's request, with instructions to pick at most
/// three IDs from the candidates only and emit them in `[ID]` format.
pub fn build_recommendation_prompt(
    user_message: &str,
    room_description: &str,
    docs: &[SearchResult],
) -> Result<String> {
    let mut relevant_docs = String::new();
    for doc in docs {
        let details =
            serde_json::to_string(doc).context("Failed to serialize search result for prompt")?;
        debug!("Adding relevant document to prompt context: {}", details);
        relevant_docs.push_str(&details);
        relevant_docs.push_str(", ");
    }

    Ok(format!(
        "You are an interior designer that works for Online Boutique. You are tasked with \
         providing recommendations to a customer on what they should add to a given room from \
         our catalog. This is the description of the room: \n{room_description} \
         Here are a list of products that are relevant to it: {relevant_docs} \
         Specifically, this is what the customer has asked for, see if you can accommodate it: \
         {user_message} Start by repeating a brief description of the room's design to the \
         customer, then provide your recommendations. Do your best to pick the most relevant \
         item out of the list of products provided, but if none of them seem relevant, then say \
         that instead of inventing a new product. At the end of the response, add a list of the \
         IDs of the relevant products in the following format for the top 3 results: \
         [<first product ID>], [<second product ID>], [<third product ID>]"
    ))
}

/// Extract the product IDs referenced in generated text as `[ID]` tokens,
/// keeping only IDs present in the supplied candidates, deduplicated, capped
/// at `MAX_REFERENCED_IDS`. Invented IDs are dropped with a warning.
pub fn referenced_ids(content: &str, candidates: &[SearchResult]) -> Vec<String> {
    let mut ids = Vec::new();

    for capture in ID_PATTERN.captures_iter(content) {
        let Ok(capture) = capture else { continue };
        let Some(id) = capture.get(1).map(|m| m.as_str()) else {
            continue;
        };

        if !candidates.iter().any(|doc| doc.id == id) {
            warn!("Generated response references unknown product ID: {}", id);
            continue;
        }

        if !ids.iter().any(|existing| existing == id) {
            ids.push(id.to_string());
        }

        if ids.len() == MAX_REFERENCED_IDS {
            break;
        }
    }

    ids
}
