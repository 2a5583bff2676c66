use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Highest IRC stage the model can predict.
pub const MAX_STAGE: u8 = 5;

/// Validated clinical inputs for one prediction request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionInput {
    pub creatinine: f64,
    pub urea: f64,
    pub age: u32,
    pub sodium: f64,
    pub bp_systolic: f64,
    pub shock: u8,
    pub sex: u8,
    pub anemia: u8,
    pub glasgow: f64,
    pub tobacco: u8,
    pub alcohol: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageProbability {
    pub stage: u8,
    pub probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResponse {
    pub predicted_stage: u8,
    pub confidence: f64,
    pub all_stages_probabilities: Vec<StageProbability>,
    pub feature_importance: Vec<FeatureImportance>,
}

/// Where a prediction's numbers came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionSource {
    /// Returned by the inference service.
    Upstream,
    /// Fabricated locally by the demo fallback estimator.
    Fallback,
}

impl PredictionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PredictionSource::Upstream => "upstream",
            PredictionSource::Fallback => "fallback",
        }
    }
}

/// A prediction response tagged with its provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub response: PredictionResponse,
    pub source: PredictionSource,
}

impl Prediction {
    pub fn upstream(response: PredictionResponse) -> Self {
        Self {
            response,
            source: PredictionSource::Upstream,
        }
    }

    pub fn fallback(response: PredictionResponse) -> Self {
        Self {
            response,
            source: PredictionSource::Fallback,
        }
    }
}

/// Row written to the `predictions` table.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRecord {
    pub created_at: DateTime<Utc>,
    pub input: PredictionInput,
    pub predicted_stage: u8,
    pub confidence: f64,
    pub source: PredictionSource,
}

impl PredictionRecord {
    pub fn new(input: PredictionInput, prediction: &Prediction) -> Self {
        Self {
            created_at: Utc::now(),
            input,
            predicted_stage: prediction.response.predicted_stage,
            confidence: prediction.response.confidence,
            source: prediction.source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_uses_camel_case_keys() {
        let input: PredictionInput = serde_json::from_value(serde_json::json!({
            "creatinine": 42.0, "urea": 1.14, "age": 68, "sodium": 142.0,
            "bpSystolic": 130.0, "shock": 0, "sex": 1, "anemia": 1,
            "glasgow": 15.0, "tobacco": 0, "alcohol": 1
        }))
        .unwrap();
        assert_eq!(input.bp_systolic, 130.0);
        assert_eq!(input.age, 68);
    }

    #[test]
    fn test_response_serializes_client_shape() {
        let response = PredictionResponse {
            predicted_stage: 3,
            confidence: 0.9,
            all_stages_probabilities: vec![StageProbability {
                stage: 3,
                probability: 0.9,
            }],
            feature_importance: vec![FeatureImportance {
                feature: "Urée".to_string(),
                importance: 0.5,
            }],
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["predictedStage"], 3);
        assert_eq!(json["allStagesProbabilities"][0]["stage"], 3);
        assert_eq!(json["featureImportance"][0]["feature"], "Urée");
        assert!(json.get("predicted_stage").is_none());
    }

    #[test]
    fn test_record_copies_prediction_fields() {
        let input = PredictionInput {
            creatinine: 60.0,
            urea: 1.0,
            age: 50,
            sodium: 140.0,
            bp_systolic: 120.0,
            shock: 0,
            sex: 0,
            anemia: 0,
            glasgow: 15.0,
            tobacco: 0,
            alcohol: 0,
        };
        let prediction = Prediction::fallback(PredictionResponse {
            predicted_stage: 3,
            confidence: 0.88,
            all_stages_probabilities: vec![],
            feature_importance: vec![],
        });
        let record = PredictionRecord::new(input, &prediction);
        assert_eq!(record.predicted_stage, 3);
        assert_eq!(record.confidence, 0.88);
        assert_eq!(record.source, PredictionSource::Fallback);
        assert_eq!(record.source.as_str(), "fallback");
    }
}
