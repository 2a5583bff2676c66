//! Prediction pipeline: validate → infer → record.
//!
//! The HTTP layer turns the outcome into a status code; this module only
//! decides what happened.

use nephro_core::{
    validate_prediction, InferenceBackend, InferenceError, Prediction, PredictionRecord,
    PredictionStore, ValidationErrors,
};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PredictError {
    #[error("invalid input: {0}")]
    Invalid(ValidationErrors),

    #[error(transparent)]
    Upstream(#[from] InferenceError),
}

/// Run one prediction request end to end.
///
/// A failing store never fails the request: the prediction has already been
/// computed, so the write error is logged and dropped.
pub async fn run_prediction(
    body: &Value,
    backend: &dyn InferenceBackend,
    store: Option<&dyn PredictionStore>,
) -> Result<Prediction, PredictError> {
    let input = validate_prediction(body).map_err(PredictError::Invalid)?;

    let prediction = backend.predict(&input).await?;

    tracing::info!(
        stage = prediction.response.predicted_stage,
        confidence = prediction.response.confidence,
        source = prediction.source.as_str(),
        backend = backend.name(),
        "Prediction computed"
    );

    if let Some(store) = store {
        let record = PredictionRecord::new(input, &prediction);
        if let Err(e) = store.record(&record).await {
            tracing::error!(error = %e, store = store.name(), "Failed to record prediction");
        }
    }

    Ok(prediction)
}
