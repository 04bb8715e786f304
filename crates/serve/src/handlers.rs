//! HTTP handlers for the PaperSearch server

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use papersearch_core::ai::{GeneratedSection, OllamaClient, PaperSection, SectionGenerator};
use papersearch_core::{PaperSearchError, SearchRequest, SearchResponse, SearchService};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub search: Arc<SearchService>,
    /// `None` when section generation is disabled
    pub generator: Option<Arc<SectionGenerator>>,
    /// Used by `/health` to check Ollama; `None` skips the check
    pub ollama: Option<OllamaClient>,
    /// Related papers fetched for `/generate` when the request does not say
    pub default_related_count: usize,
}

impl AppState {
    pub fn new(search: Arc<SearchService>) -> Self {
        Self {
            search,
            generator: None,
            ollama: None,
            default_related_count: 5,
        }
    }

    pub fn with_generator(mut self, generator: Arc<SectionGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_ollama(mut self, client: OllamaClient) -> Self {
        self.ollama = Some(client);
        self
    }

    pub fn with_default_related_count(mut self, count: usize) -> Self {
        self.default_related_count = count;
        self
    }
}

/// Error body returned by every endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Maps core errors onto HTTP statuses
#[derive(Debug)]
pub struct ApiError(pub PaperSearchError);

impl From<PaperSearchError> for ApiError {
    fn from(error: PaperSearchError) -> Self {
        Self(error)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(PaperSearchError::invalid_request(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error = self.0;
        let (status, message) = match &error {
            PaperSearchError::InvalidRequest { message } => {
                (StatusCode::BAD_REQUEST, message.clone())
            }
            PaperSearchError::Provider { .. }
            | PaperSearchError::Network { .. }
            | PaperSearchError::Http(_) => {
                warn!("Embedding provider unavailable: {}", error);
                (StatusCode::SERVICE_UNAVAILABLE, error.to_string())
            }
            PaperSearchError::Generation { .. } => {
                warn!("Section generation failed: {}", error);
                (StatusCode::SERVICE_UNAVAILABLE, error.to_string())
            }
            PaperSearchError::Timeout { .. } => {
                warn!("Request timed out: {}", error);
                (StatusCode::GATEWAY_TIMEOUT, error.to_string())
            }
            _ => {
                error!(category = %error.category(), "Internal error: {}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// `POST /search`
pub async fn handle_search(
    State(state): State<AppState>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Json(request) = payload?;
    let response = state.search.search(&request).await?;
    Ok(Json(response))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub topic: String,
    pub section: String,
    #[serde(default)]
    pub related_count: Option<usize>,
}

/// `POST /generate`
///
/// Retrieves related papers for the topic, then drafts the section from them.
pub async fn handle_generate(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GeneratedSection>, ApiError> {
    let Json(request) = payload?;

    let generator = state.generator.as_ref().ok_or_else(|| {
        PaperSearchError::generation("Text generation is not configured on this server")
    })?;

    let section: PaperSection = request.section.parse()?;
    if request.topic.trim().is_empty() {
        return Err(PaperSearchError::invalid_request("Topic is required").into());
    }

    let related_count = request
        .related_count
        .unwrap_or(state.default_related_count);
    let related = if related_count == 0 {
        Vec::new()
    } else {
        state
            .search
            .search(&SearchRequest::new(request.topic.clone()).with_top_k(related_count))
            .await?
            .results
    };

    info!(
        "Generating {} for '{}' from {} related papers",
        section,
        request.topic.trim(),
        related.len()
    );

    let generated = generator
        .generate_section(&request.topic, section, &related)
        .await?;
    Ok(Json(generated))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub corpus_size: usize,
    pub embedding_model: String,
    pub generation_model: Option<String>,
    pub services: ServiceStatus,
}

/// Ollama check results; every field is `None` when no client is configured
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub ollama: Option<bool>,
    /// Whether the embedding model is pulled on the Ollama server
    pub embedding_model_available: Option<bool>,
    /// Whether the generation model is pulled; `None` also when generation is off
    pub generation_model_available: Option<bool>,
}

/// `GET /health`
///
/// Degraded when Ollama is unreachable or a configured model is missing.
pub async fn handle_health_check(State(state): State<AppState>) -> impl IntoResponse {
    let embedding_model = state.search.model_name().to_string();
    let generation_model = state
        .generator
        .as_ref()
        .map(|g| g.model_name().to_string());

    let mut services = ServiceStatus::default();
    if let Some(client) = &state.ollama {
        match client.list_models().await {
            Ok(models) => {
                let listed = |name: &str| models.iter().any(|m| m.matches(name));
                services.ollama = Some(true);
                services.embedding_model_available = Some(listed(&embedding_model));
                services.generation_model_available =
                    generation_model.as_deref().map(listed);
            }
            Err(e) => {
                warn!("Ollama health check failed: {}", e);
                services.ollama = Some(false);
            }
        }
    }

    let degraded = services.ollama == Some(false)
        || services.embedding_model_available == Some(false)
        || services.generation_model_available == Some(false);

    Json(HealthResponse {
        status: if degraded { "degraded" } else { "healthy" }.to_string(),
        version: crate::VERSION.to_string(),
        timestamp: chrono::Utc::now(),
        corpus_size: state.search.corpus_size(),
        embedding_model,
        generation_model,
        services,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn status_of(error: PaperSearchError) -> (StatusCode, String) {
        let response = ApiError(error).into_response();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let parsed: ErrorResponse = serde_json::from_slice(&body).unwrap();
        (status, parsed.error)
    }

    #[tokio::test]
    async fn test_error_status_mapping() {
        let (status, message) = status_of(PaperSearchError::invalid_request("Query is required")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message, "Query is required");

        let (status, _) = status_of(PaperSearchError::provider("quota")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (status, _) = status_of(PaperSearchError::network("refused")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (status, _) = status_of(PaperSearchError::timeout("embed")).await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);

        let (status, message) = status_of(PaperSearchError::generation("model offline")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(message.contains("model offline"));
    }

    #[tokio::test]
    async fn test_internal_errors_are_not_leaked() {
        let (status, message) =
            status_of(PaperSearchError::dimension_mismatch(768, 384)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, "Internal server error");

        let (status, message) = status_of(PaperSearchError::data_unavailable(
            "sqlite://secret/path.db missing",
        ))
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!message.contains("secret"));
    }
}
