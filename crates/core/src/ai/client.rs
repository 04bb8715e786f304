//! Ollama client implementation for embedding and generation calls

use crate::error::{PaperSearchError, Result};
use reqwest::{Client, ClientBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Ollama client for interacting with the Ollama API
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    /// Create a new Ollama client with a 300 second request timeout
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(300))
    }

    /// Create a client with custom timeout
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(timeout)
            .build()
            .map_err(|e| PaperSearchError::network(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    /// Get the base URL of the Ollama server
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// List available models
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = format!("{}/api/tags", self.base_url);

        debug!("Fetching models from: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PaperSearchError::network(format!("Failed to fetch models: {}", e)))?;

        if !response.status().is_success() {
            return Err(PaperSearchError::provider(format!(
                "Failed to list models: HTTP {}",
                response.status()
            )));
        }

        let models_response: ModelsResponse = response.json().await.map_err(|e| {
            PaperSearchError::provider(format!("Failed to parse models response: {}", e))
        })?;

        Ok(models_response.models)
    }

    /// Generate text using a model
    pub async fn generate(&self, request: GenerateRequest) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);

        debug!("Generating with model: {}", request.model);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                PaperSearchError::generation(format!("Failed to send generate request: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(PaperSearchError::generation(format!(
                "Generate request failed: HTTP {}",
                response.status()
            )));
        }

        // Streaming responses arrive as JSONL; non-streaming as a single line
        let response_text = response
            .text()
            .await
            .map_err(|e| PaperSearchError::generation(format!("Failed to read response: {}", e)))?;

        let mut generated_text = String::new();
        for line in response_text.lines() {
            if line.trim().is_empty() {
                continue;
            }

            let generate_response: GenerateResponse = serde_json::from_str(line).map_err(|e| {
                PaperSearchError::generation(format!("Failed to parse response line: {}", e))
            })?;

            generated_text.push_str(&generate_response.response);

            if generate_response.done {
                break;
            }
        }

        if generated_text.is_empty() {
            return Err(PaperSearchError::generation("No response generated"));
        }

        info!("Generated {} characters of text", generated_text.len());
        Ok(generated_text)
    }

    /// Generate an embedding for a single prompt
    pub async fn embed(&self, request: EmbedRequest) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);

        debug!("Generating embedding with model: {}", request.model);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                PaperSearchError::provider(format!("Failed to send embed request: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(PaperSearchError::provider(format!(
                "Embed request failed: HTTP {}",
                response.status()
            )));
        }

        let embed_response: EmbedResponse = response.json().await.map_err(|e| {
            PaperSearchError::provider(format!("Failed to parse embed response: {}", e))
        })?;

        Ok(embed_response.embedding)
    }

    /// Generate embeddings for several inputs in one request
    ///
    /// Uses the `/api/embed` endpoint, which accepts a list of inputs and
    /// returns one vector per input in the same order.
    pub async fn embed_batch(&self, request: EmbedBatchRequest) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/api/embed", self.base_url);

        debug!(
            "Generating {} embeddings with model: {}",
            request.input.len(),
            request.model
        );

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                PaperSearchError::provider(format!("Failed to send embed request: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(PaperSearchError::provider(format!(
                "Batch embed request failed: HTTP {}",
                response.status()
            )));
        }

        let embed_response: EmbedBatchResponse = response.json().await.map_err(|e| {
            PaperSearchError::provider(format!("Failed to parse batch embed response: {}", e))
        })?;

        if embed_response.embeddings.len() != request.input.len() {
            return Err(PaperSearchError::provider(format!(
                "Requested {} embeddings but received {}",
                request.input.len(),
                embed_response.embeddings.len()
            )));
        }

        Ok(embed_response.embeddings)
    }
}

/// Information about an available model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub digest: String,
    #[serde(default)]
    pub modified_at: String,
}

impl ModelInfo {
    /// Whether this entry is `name`, with or without a `:tag` suffix
    pub fn matches(&self, name: &str) -> bool {
        self.name == name || self.name.split(':').next() == Some(name)
    }
}

/// Response from the models list endpoint
#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

/// Request for text generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    #[serde(default)]
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<GenerateOptions>,
}

/// Generation options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            temperature: Some(0.7),
            num_predict: Some(1024),
            top_p: None,
        }
    }
}

/// Response from text generation
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
    done: bool,
}

/// Request for a single embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedRequest {
    pub model: String,
    pub prompt: String,
}

/// Response from the single embedding endpoint
#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

/// Request for a batch of embeddings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedBatchRequest {
    pub model: String,
    pub input: Vec<String>,
}

/// Response from the batch embedding endpoint
#[derive(Debug, Deserialize)]
struct EmbedBatchResponse {
    embeddings: Vec<Vec<f32>>,
}
