pub mod config;
pub mod error;
pub mod fallback;
pub mod inference;
pub mod mapper;
pub mod models;
pub mod stages;
pub mod store;
pub mod validation;

pub use config::{InferenceMode, NephroConfig};
pub use error::NephroError;
pub use inference::{
    create_backend, FallbackInferenceClient, HttpInferenceClient, InferenceBackend,
    InferenceError,
};
pub use models::{
    ContactFormData, Prediction, PredictionInput, PredictionRecord, PredictionResponse,
    PredictionSource,
};
pub use stages::StageDescription;
pub use store::{PgPredictionStore, PredictionStore, StoreError};
pub use validation::{validate_contact, validate_prediction, ValidationErrors};
