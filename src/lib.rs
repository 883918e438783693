use thiserror::Error;

pub type Result<T> = std::result::Result<T, AssistantError>;

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Catalog store error: {0}")]
    Store(String),

    #[error("Catalog store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Schema invalid: embedding dimension {actual} does not match configured dimension {expected}")]
    SchemaInvalid { expected: usize, actual: usize },

    #[error("Embedding provider unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Generation model unavailable: {0}")]
    GenerationUnavailable(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Catalog incompletely populated: {stored} of {attempted} items stored")]
    IncompletePopulation { attempted: usize, stored: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

/// Run a blocking collaborator call on the runtime's blocking pool so async
/// request handling is not stalled behind it.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AssistantError::Other(anyhow::Error::from(e)))?
}

pub mod assistant;
pub mod catalog;
pub mod commands;
pub mod config;
pub mod embeddings;
pub mod genai;
pub mod gemini;
pub mod loader;
pub mod search;
pub mod secrets;
pub mod server;
