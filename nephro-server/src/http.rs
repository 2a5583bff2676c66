//! NéphroPredict HTTP REST API
//!
//! Axum-based HTTP server for the prediction and contact forms.
//!
//! Architecture: each endpoint has a thin axum handler that delegates to a pure
//! inner function. The inner functions are directly testable without axum dispatch
//! machinery.
//!
//! Endpoints:
//! - GET  /health       — inference service and storage status
//! - GET  /version      — server version info
//! - GET  /api/stages   — IRC stage catalogue
//! - POST /api/predict  — validate and predict an IRC stage
//! - POST /api/contact  — validate and log a contact form submission

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Request, State};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use nephro_core::stages::{StageDescription, STAGES};
use nephro_core::{
    create_backend, validate_contact, InferenceBackend, NephroConfig,
    NephroError, PgPredictionStore, PredictionSource, PredictionStore,
};
use futures::FutureExt;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::predict::{run_prediction, PredictError};

/// Response header telling clients whether the numbers came from the model.
pub const PREDICTION_SOURCE_HEADER: &str = "x-prediction-source";

/// Shared state for all HTTP handlers
#[derive(Clone)]
pub struct HttpState {
    pub config: NephroConfig,
    pub backend: Arc<dyn InferenceBackend>,
    pub store: Option<Arc<dyn PredictionStore>>,
}

impl HttpState {
    /// Build the inference backend and, if enabled, connect the prediction store.
    pub async fn from_config(config: NephroConfig) -> Result<Self, NephroError> {
        let backend: Arc<dyn InferenceBackend> = Arc::from(create_backend(&config.inference)?);

        let store: Option<Arc<dyn PredictionStore>> = if config.storage.enabled {
            let store = PgPredictionStore::connect(&config.storage).await?;
            tracing::info!("Prediction storage connected");
            Some(Arc::new(store))
        } else {
            None
        };

        Ok(Self {
            config,
            backend,
            store,
        })
    }
}

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<HttpState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .route("/api/stages", get(stages_handler))
        .route("/api/predict", post(predict_handler))
        .route("/api/contact", post(contact_handler))
        .layer(middleware::from_fn(catch_panic))
        .with_state(state)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}

/// Answer a panicking handler with the 500 envelope instead of dropping the connection.
pub async fn catch_panic(req: Request, next: Next) -> Response {
    let message = if req.uri().path() == "/api/predict" {
        "An error occurred during prediction"
    } else {
        "An error occurred while processing your request"
    };
    match AssertUnwindSafe(next.run(req)).catch_unwind().await {
        Ok(response) => response,
        Err(payload) => {
            let error = panic_message(payload.as_ref());
            tracing::error!(error = %error, "Request handler panicked");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(message_error(message, error)),
            )
                .into_response()
        }
    }
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    state: HttpState,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = format!("{}:{}", state.config.http.host, state.config.http.port);

    let app = build_router(Arc::new(state));
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("NéphroPredict HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Inner (directly testable) business logic functions
// ============================================================================

fn message_error(message: &str, error: impl ToString) -> Value {
    json!({
        "message": message,
        "error": error.to_string(),
    })
}

/// Inner predict — returns (status, prediction source if any, json body).
pub async fn predict_inner(
    state: &HttpState,
    body: Value,
) -> (StatusCode, Option<PredictionSource>, Value) {
    let result = run_prediction(&body, state.backend.as_ref(), state.store.as_deref()).await;

    match result {
        Ok(prediction) => match serde_json::to_value(&prediction.response) {
            Ok(data) => (StatusCode::OK, Some(prediction.source), data),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize prediction");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    None,
                    message_error("An error occurred during prediction", e),
                )
            }
        },
        Err(PredictError::Invalid(errors)) => (
            StatusCode::BAD_REQUEST,
            None,
            json!({
                "message": "Invalid input data",
                "errors": errors,
            }),
        ),
        Err(PredictError::Upstream(e)) => {
            tracing::error!(error = %e, kind = e.kind(), "Prediction failed upstream");
            (
                StatusCode::BAD_GATEWAY,
                None,
                message_error("The prediction service is unavailable", e),
            )
        }
    }
}

/// Inner contact — validates and logs the submission. Nothing is sent or stored.
pub fn contact_inner(body: &Value) -> (StatusCode, Value) {
    match validate_contact(body) {
        Ok(form) => {
            tracing::info!(
                name = %form.name,
                email = %form.email,
                subject = %form.subject,
                message_chars = form.message.chars().count(),
                "Contact form submission"
            );
            (
                StatusCode::OK,
                json!({ "message": "Contact form submitted successfully" }),
            )
        }
        Err(errors) => (
            StatusCode::BAD_REQUEST,
            json!({
                "message": "Invalid form data",
                "errors": errors,
            }),
        ),
    }
}

/// Inner health check — probes the inference service and the store.
pub async fn health_inner(state: &HttpState) -> (StatusCode, Value) {
    let (reachable, inference_error) = match state.backend.health().await {
        Ok(()) => (true, None),
        Err(e) => (false, Some(e.to_string())),
    };

    let storage = match &state.store {
        None => json!({ "enabled": false }),
        Some(store) => match store.health_check().await {
            Ok(version) => json!({ "enabled": true, "connected": true, "version": version }),
            Err(e) => json!({ "enabled": true, "connected": false, "error": e.to_string() }),
        },
    };
    let storage_ok = storage["enabled"] == false || storage["connected"] == true;

    (
        StatusCode::OK,
        json!({
            "status": if reachable && storage_ok { "ok" } else { "degraded" },
            "version": env!("CARGO_PKG_VERSION"),
            "inference": {
                "base_url": state.backend.base_url(),
                "mode": state.config.inference.mode.as_str(),
                "reachable": reachable,
                "error": inference_error,
            },
            "storage": storage,
        }),
    )
}

/// Inner version — returns version info (pure, no IO).
pub fn version_inner() -> Value {
    json!({
        "version": env!("CARGO_PKG_VERSION"),
        "protocol": "nephro/1",
    })
}

pub fn stages_inner() -> &'static [StageDescription] {
    &STAGES
}

/// Body for requests whose JSON could not be parsed.
fn rejection_body(message: &str, rejection: &JsonRejection) -> Value {
    json!({
        "message": message,
        "errors": { "_errors": [rejection.body_text()] },
    })
}

// ============================================================================
// Axum handler wrappers (thin — delegate to inner functions)
// ============================================================================

pub async fn health_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = health_inner(&state).await;
    (status, Json(body))
}

pub async fn version_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(version_inner()))
}

pub async fn stages_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(stages_inner()))
}

pub async fn predict_handler(
    State(state): State<Arc<HttpState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let Json(body) = match payload {
        Ok(body) => body,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(rejection_body("Invalid input data", &rejection)),
            )
                .into_response();
        }
    };

    let (status, source, body) = predict_inner(&state, body).await;
    let mut response = (status, Json(body)).into_response();
    if let Some(source) = source {
        response.headers_mut().insert(
            PREDICTION_SOURCE_HEADER,
            HeaderValue::from_static(source.as_str()),
        );
    }
    response
}

pub async fn contact_handler(payload: Result<Json<Value>, JsonRejection>) -> impl IntoResponse {
    match payload {
        Ok(Json(body)) => {
            let (status, body) = contact_inner(&body);
            (status, Json(body))
        }
        Err(rejection) => (
            StatusCode::BAD_REQUEST,
            Json(rejection_body("Invalid form data", &rejection)),
        ),
    }
}

// ============================================================================
// Unit Tests — call inner functions directly
// ============================================================================
