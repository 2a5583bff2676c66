pub mod contact;
pub mod prediction;

pub use contact::ContactFormData;
pub use prediction::{
    FeatureImportance, Prediction, PredictionInput, PredictionRecord, PredictionResponse,
    PredictionSource, StageProbability, MAX_STAGE,
};
