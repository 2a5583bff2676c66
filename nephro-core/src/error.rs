use thiserror::Error;

use crate::inference::InferenceError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum NephroError {
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}
