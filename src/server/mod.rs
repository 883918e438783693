// HTTP surface
// Single POST / endpoint taking {message, image} and returning {content}.
// Kernel errors become non-200 JSON responses; no partial content is ever
// returned.


use std::sync::Arc;

use anyhow::Context;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::assistant::RecommendationAssistant;
use crate::genai::ImageSource;
use crate::{AssistantError, Result};

pub struct AppState {
    pub assistant: RecommendationAssistant,
}

#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    pub message: String,
    /// Room photo: an http(s) URL or a base64 data URI
    pub image: String,
}

#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

pub struct ApiError(AssistantError);

impl From<AssistantError> for ApiError {
    fn from(error: AssistantError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AssistantError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            AssistantError::EmbeddingUnavailable(_)
            | AssistantError::GenerationUnavailable(_)
            | AssistantError::StoreUnavailable(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        error!("Request failed with {}: {}", status, self.0);

        let body = ErrorBody {
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", post(recommend))
        .route("/healthz", get(health))
        .with_state(state)
}

/// Bind and serve until the process is stopped
pub async fn serve(state: Arc<AppState>, host: &str, port: u16) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", host, port))?;

    info!("Shopping assistant listening on {}:{}", host, port);

    axum::serve(listener, router(state))
        .await
        .context("HTTP server terminated unexpectedly")?;

    Ok(())
}

async fn recommend(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RecommendRequest>,
) -> std::result::Result<Json<RecommendResponse>, ApiError> {
    let image = ImageSource::parse(&request.image)?;

    let recommendation = state
        .assistant
        .recommend(&request.message, &image)
        .await?;

    Ok(Json(RecommendResponse {
        content: recommendation.content,
    }))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
