//! Inference gateway — client for the external IRC prediction service
//!
//! Provides an `InferenceBackend` trait with implementations for:
//! - **HTTP** — single-attempt `POST {base_url}/predict` against the FastAPI service
//! - **HTTP-with-fallback** — same call, but any failure is replaced by the demo
//!   fallback estimate (see [`crate::fallback`])

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::config::{InferenceConfig, InferenceMode};
use crate::fallback;
use crate::mapper::{UpstreamPredictionRequest, UpstreamPredictionResponse};
use crate::models::{Prediction, PredictionInput, PredictionResponse};

// ============================================================================
// InferenceBackend trait
// ============================================================================

/// Abstraction over prediction providers.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Predict the IRC stage for a validated input.
    async fn predict(&self, input: &PredictionInput) -> Result<Prediction, InferenceError>;

    /// Check that the inference service answers its health endpoint.
    async fn health(&self) -> Result<(), InferenceError>;

    /// Base URL of the inference service.
    fn base_url(&self) -> &str;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

// ============================================================================
// Error types
// ============================================================================

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Inference service unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),

    #[error("Inference service error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Malformed inference response: {0}")]
    Malformed(String),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

impl InferenceError {
    /// Short machine-readable kind, used in logs and error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            InferenceError::Unreachable(_) => "unreachable",
            InferenceError::Api { .. } => "api",
            InferenceError::Malformed(_) => "malformed",
            InferenceError::Client(_) => "client",
        }
    }
}

/// FastAPI error body: `{"detail": "..."}`.
#[derive(Debug, Deserialize)]
struct FastApiErrorResponse {
    detail: serde_json::Value,
}

/// Create the backend selected by `inference.mode`.
pub fn create_backend(
    config: &InferenceConfig,
) -> Result<Box<dyn InferenceBackend>, InferenceError> {
    let client = HttpInferenceClient::new(config)?;
    match config.mode {
        InferenceMode::Strict => Ok(Box::new(client)),
        InferenceMode::Demo => Ok(Box::new(FallbackInferenceClient::new(client))),
    }
}

// ============================================================================
// HttpInferenceClient
// ============================================================================

/// Calls the inference service once per prediction. No retries.
#[derive(Debug, Clone)]
pub struct HttpInferenceClient {
    client: Client,
    base_url: String,
}

impl HttpInferenceClient {
    pub fn new(config: &InferenceConfig) -> Result<Self, InferenceError> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a client with a custom base URL and no timeout (for testing)
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, InferenceError> {
        let config = InferenceConfig {
            base_url: base_url.into(),
            ..InferenceConfig::default()
        };
        Self::new(&config)
    }

    /// Call the service and map its body to the client response shape.
    pub async fn predict_raw(
        &self,
        input: &PredictionInput,
    ) -> Result<PredictionResponse, InferenceError> {
        let url = format!("{}/predict", self.base_url);
        let request = UpstreamPredictionRequest::from(input);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(InferenceError::Unreachable)?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<FastApiErrorResponse>(&error_body)
                .ok()
                .map(|e| match e.detail {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                })
                .unwrap_or(error_body);

            tracing::error!(code = status.as_u16(), message = %message, "Inference service error");

            return Err(InferenceError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let bytes = response.bytes().await.map_err(InferenceError::Unreachable)?;
        let body: serde_json::Value = serde_json::from_slice(&bytes)
            .map_err(|e| InferenceError::Malformed(format!("invalid JSON: {}", e)))?;

        if !body.is_object() {
            return Err(InferenceError::Malformed(
                "response is not a JSON object".to_string(),
            ));
        }

        let upstream: UpstreamPredictionResponse = serde_json::from_value(body)
            .map_err(|e| InferenceError::Malformed(e.to_string()))?;

        upstream.into_response().map_err(InferenceError::Malformed)
    }
}

#[async_trait]
impl InferenceBackend for HttpInferenceClient {
    async fn predict(&self, input: &PredictionInput) -> Result<Prediction, InferenceError> {
        self.predict_raw(input).await.map(Prediction::upstream)
    }

    async fn health(&self) -> Result<(), InferenceError> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(InferenceError::Unreachable)?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(InferenceError::Api {
                code: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            })
        }
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn name(&self) -> &str {
        "http"
    }
}

// ============================================================================
// FallbackInferenceClient
// ============================================================================

/// Wraps `HttpInferenceClient`. On any error, logs a warning and returns the
/// demo fallback estimate instead. Never use in production: the numbers are
/// fabricated.
pub struct FallbackInferenceClient {
    inner: HttpInferenceClient,
}

impl FallbackInferenceClient {
    pub fn new(inner: HttpInferenceClient) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl InferenceBackend for FallbackInferenceClient {
    async fn predict(&self, input: &PredictionInput) -> Result<Prediction, InferenceError> {
        match self.inner.predict_raw(input).await {
            Ok(response) => Ok(Prediction::upstream(response)),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    kind = e.kind(),
                    "Inference service failed — returning fabricated demo estimate"
                );
                let response = fallback::estimate(input, &mut rand::thread_rng());
                Ok(Prediction::fallback(response))
            }
        }
    }

    async fn health(&self) -> Result<(), InferenceError> {
        self.inner.health().await
    }

    fn base_url(&self) -> &str {
        self.inner.base_url()
    }

    fn name(&self) -> &str {
        "http-with-demo-fallback"
    }
}

// ============================================================================
// TESTS
// ============================================================================
