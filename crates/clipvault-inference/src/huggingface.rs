//! Hosted Inference API embedding backend.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use clipvault_core::{defaults, l2_normalize, logging, mean_pool, EmbeddingBackend, Error, Result};

/// Default hosted inference endpoint.
pub const DEFAULT_BASE_URL: &str = defaults::INFERENCE_BASE_URL;

/// Default embedding model.
pub const DEFAULT_MODEL: &str = defaults::EMBED_MODEL;

/// Default embedding dimension.
pub const DEFAULT_DIMENSION: usize = defaults::EMBED_DIMENSION;

/// Default request timeout (seconds).
pub const DEFAULT_TIMEOUT_SECS: u64 = defaults::EMBED_TIMEOUT_SECS;

/// Configuration for the hosted inference backend.
#[derive(Debug, Clone)]
pub struct HuggingFaceConfig {
    /// Base URL of the inference API.
    pub base_url: String,
    /// Bearer token.
    pub api_key: String,
    /// Model identifier, e.g. `BAAI/bge-large-en-v1.5`.
    pub model: String,
    /// Expected embedding dimension. Mismatches are logged, not fatal.
    pub dimension: usize,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for HuggingFaceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            dimension: DEFAULT_DIMENSION,
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Hosted Inference API embedding backend.
pub struct HuggingFaceBackend {
    client: Client,
    config: HuggingFaceConfig,
}

impl HuggingFaceBackend {
    /// Create a new backend with the given configuration.
    pub fn new(config: HuggingFaceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Request(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            "Initializing hosted inference backend: url={}, model={}",
            config.base_url, config.model
        );

        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        let config = HuggingFaceConfig {
            base_url: std::env::var("CLIPVAULT_HF_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            api_key: std::env::var("CLIPVAULT_HF_API_KEY").unwrap_or_default(),
            model: std::env::var("CLIPVAULT_EMBED_MODEL")
                .unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            dimension: std::env::var("CLIPVAULT_EMBED_DIM")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_DIMENSION),
            timeout_seconds: std::env::var("CLIPVAULT_EMBED_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        };
        Self::new(config)
    }

    /// Get the current configuration.
    pub fn config(&self) -> &HuggingFaceConfig {
        &self.config
    }

    fn model_url(&self) -> String {
        format!(
            "{}/models/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

/// Request payload for the inference endpoint.
#[derive(Serialize)]
struct EmbedRequest<'a> {
    inputs: &'a str,
    options: EmbedOptions,
}

#[derive(Serialize)]
struct EmbedOptions {
    wait_for_model: bool,
}

/// The inference endpoint answers in one of several shapes depending on
/// the model and pipeline. Each accepted shape is tried as a tagged-union
/// parse; anything else is an unexpected-format error.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawEmbedding {
    /// A flat sentence-level vector.
    Flat(Vec<f32>),
    /// Token-level vectors requiring mean pooling.
    TokenLevel(Vec<Vec<f32>>),
    /// An object exposing an `embedding` field.
    Wrapped { embedding: Vec<f32> },
    /// A list of such objects (first one wins).
    WrappedList(Vec<WrappedEmbedding>),
}

#[derive(Deserialize)]
struct WrappedEmbedding {
    embedding: Vec<f32>,
}

/// Decode a raw response body into an unpooled embedding vector.
///
/// Token-level responses are mean-pooled here; normalization is the
/// caller's step.
fn decode_embedding(body: &str) -> Result<Vec<f32>> {
    let raw: RawEmbedding = serde_json::from_str(body).map_err(|_| {
        Error::UnexpectedFormat(format!("unrecognized response shape: {}", preview(body)))
    })?;

    let vector = match raw {
        RawEmbedding::Flat(v) => v,
        RawEmbedding::TokenLevel(tokens) => mean_pool(&tokens),
        RawEmbedding::Wrapped { embedding } => embedding,
        RawEmbedding::WrappedList(list) => match list.into_iter().next() {
            Some(w) => w.embedding,
            None => Vec::new(),
        },
    };

    if vector.is_empty() {
        return Err(Error::UnexpectedFormat("empty embedding".to_string()));
    }
    Ok(vector)
}

fn preview(body: &str) -> String {
    body.chars().take(120).collect()
}

#[async_trait]
impl EmbeddingBackend for HuggingFaceBackend {
    #[instrument(skip(self, text), fields(subsystem = "inference", component = "huggingface", op = "embed", model = %self.config.model, input_len = text.len()))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();

        let request = EmbedRequest {
            inputs: text,
            options: EmbedOptions {
                wait_for_model: true,
            },
        };

        let response = self
            .client
            .post(self.model_url())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Request(format!("Embedding request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::remote(status, body));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::Request(format!("Failed to read response: {}", e)))?;

        let vector = l2_normalize(decode_embedding(&body)?);

        if vector.len() != self.config.dimension {
            warn!(
                got = vector.len(),
                expected = self.config.dimension,
                "embedding dimension mismatch"
            );
        }

        let elapsed = start.elapsed().as_millis() as u64;
        debug!(duration_ms = elapsed, dim = vector.len(), "Embedding complete");
        if elapsed > logging::SLOW_EMBED_MS {
            warn!(duration_ms = elapsed, slow = true, "Slow embedding operation");
        }

        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
