//! Key translation between the public API and the inference service schema.
//!
//! The inference service was trained on spreadsheet column names, so its
//! request keys are French labels with units. Values pass through untouched.

use serde::{Deserialize, Serialize};

use crate::models::{
    FeatureImportance, PredictionInput, PredictionResponse, StageProbability, MAX_STAGE,
};

/// `(api field, inference service key)` for every prediction input.
pub const FIELD_RENAMES: [(&str, &str); 11] = [
    ("creatinine", "Créatinine (mg/L)"),
    ("urea", "Urée (g/L)"),
    ("age", "Age"),
    ("sodium", "Na^+ (meq/L)"),
    ("bpSystolic", "TA (mmHg)/Systole"),
    ("shock", "Choc de Pointe/Perçu"),
    ("sex", "Sexe_M"),
    ("anemia", "Anémie_True"),
    ("glasgow", "Score de Glasgow (/15)"),
    ("tobacco", "Enquête Sociale/Tabac_True"),
    ("alcohol", "Enquête Sociale/Alcool_True"),
];

/// Body of `POST {base_url}/predict`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UpstreamPredictionRequest {
    #[serde(rename = "Créatinine (mg/L)")]
    pub creatinine: f64,
    #[serde(rename = "Urée (g/L)")]
    pub urea: f64,
    #[serde(rename = "Age")]
    pub age: u32,
    #[serde(rename = "Na^+ (meq/L)")]
    pub sodium: f64,
    #[serde(rename = "TA (mmHg)/Systole")]
    pub bp_systolic: f64,
    #[serde(rename = "Choc de Pointe/Perçu")]
    pub shock: u8,
    #[serde(rename = "Sexe_M")]
    pub sex: u8,
    #[serde(rename = "Anémie_True")]
    pub anemia: u8,
    #[serde(rename = "Score de Glasgow (/15)")]
    pub glasgow: f64,
    #[serde(rename = "Enquête Sociale/Tabac_True")]
    pub tobacco: u8,
    #[serde(rename = "Enquête Sociale/Alcool_True")]
    pub alcohol: u8,
}

impl From<&PredictionInput> for UpstreamPredictionRequest {
    fn from(input: &PredictionInput) -> Self {
        Self {
            creatinine: input.creatinine,
            urea: input.urea,
            age: input.age,
            sodium: input.sodium,
            bp_systolic: input.bp_systolic,
            shock: input.shock,
            sex: input.sex,
            anemia: input.anemia,
            glasgow: input.glasgow,
            tobacco: input.tobacco,
            alcohol: input.alcohol,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpstreamStageProbability {
    pub stage: u8,
    pub probability: f64,
}

#[derive(Debug, Deserialize)]
pub struct UpstreamFeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Body returned by the inference service.
#[derive(Debug, Deserialize)]
pub struct UpstreamPredictionResponse {
    pub predicted_stage: u8,
    pub confidence: f64,
    pub stage_probabilities: Vec<UpstreamStageProbability>,
    pub feature_importance: Vec<UpstreamFeatureImportance>,
}

fn is_probability(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

/// Require exactly one entry per stage `0..=MAX_STAGE`; returns them in stage order.
fn cover_every_stage(
    mut probabilities: Vec<StageProbability>,
) -> Result<Vec<StageProbability>, String> {
    probabilities.sort_by_key(|p| p.stage);
    let stages: Vec<u8> = probabilities.iter().map(|p| p.stage).collect();
    let expected: Vec<u8> = (0..=MAX_STAGE).collect();
    if stages != expected {
        return Err(format!(
            "stage_probabilities must list each stage 0..={} exactly once, got {:?}",
            MAX_STAGE, stages
        ));
    }
    Ok(probabilities)
}

impl UpstreamPredictionResponse {
    /// Convert to the client shape, rejecting values outside the stage and
    /// probability ranges and stage lists that miss or repeat a stage.
    pub fn into_response(self) -> Result<PredictionResponse, String> {
        if self.predicted_stage > MAX_STAGE {
            return Err(format!(
                "predicted_stage {} is outside 0..={}",
                self.predicted_stage, MAX_STAGE
            ));
        }
        if !is_probability(self.confidence) {
            return Err(format!("confidence {} is outside [0, 1]", self.confidence));
        }

        let all_stages_probabilities = self
            .stage_probabilities
            .into_iter()
            .map(|p| {
                if p.stage > MAX_STAGE || !is_probability(p.probability) {
                    Err(format!(
                        "stage probability {{stage: {}, probability: {}}} is out of range",
                        p.stage, p.probability
                    ))
                } else {
                    Ok(StageProbability {
                        stage: p.stage,
                        probability: p.probability,
                    })
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        let all_stages_probabilities = cover_every_stage(all_stages_probabilities)?;

        let feature_importance = self
            .feature_importance
            .into_iter()
            .map(|f| FeatureImportance {
                feature: f.feature,
                importance: f.importance,
            })
            .collect();

        Ok(PredictionResponse {
            predicted_stage: self.predicted_stage,
            confidence: self.confidence,
            all_stages_probabilities,
            feature_importance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn sample_input() -> PredictionInput {
        PredictionInput {
            creatinine: 42.5,
            urea: 1.14,
            age: 68,
            sodium: 142.0,
            bp_systolic: 130.0,
            shock: 0,
            sex: 1,
            anemia: 1,
            glasgow: 14.5,
            tobacco: 0,
            alcohol: 1,
        }
    }

    #[test]
    fn test_request_keys_match_rename_table() {
        let upstream = serde_json::to_value(UpstreamPredictionRequest::from(&sample_input())).unwrap();
        let object = upstream.as_object().unwrap();

        let mut produced: Vec<&str> = object.keys().map(String::as_str).collect();
        let mut expected: Vec<&str> = FIELD_RENAMES.iter().map(|(_, key)| *key).collect();
        produced.sort_unstable();
        expected.sort_unstable();
        assert_eq!(produced, expected);
    }

    #[test]
    fn test_request_values_pass_through_unchanged() {
        let input = sample_input();
        let api = serde_json::to_value(input).unwrap();
        let upstream = serde_json::to_value(UpstreamPredictionRequest::from(&input)).unwrap();

        for (field, key) in FIELD_RENAMES {
            assert_eq!(
                api[field].as_f64(),
                upstream[key].as_f64(),
                "{} -> {} changed value",
                field,
                key
            );
        }
        assert_eq!(upstream["Age"], json!(68));
        assert_eq!(upstream["Sexe_M"], json!(1));
        assert_eq!(upstream["Créatinine (mg/L)"], json!(42.5));
    }

    fn upstream_body() -> Value {
        json!({
            "predicted_stage": 2,
            "confidence": 0.81,
            "stage_probabilities": [
                {"stage": 0, "probability": 0.01},
                {"stage": 1, "probability": 0.05},
                {"stage": 2, "probability": 0.81},
                {"stage": 3, "probability": 0.1},
                {"stage": 4, "probability": 0.02},
                {"stage": 5, "probability": 0.01}
            ],
            "feature_importance": [
                {"feature": "Créatinine (mg/L)", "importance": 0.35},
                {"feature": "Age", "importance": 0.15}
            ]
        })
    }

    #[test]
    fn test_response_maps_to_client_shape() {
        let upstream: UpstreamPredictionResponse = serde_json::from_value(upstream_body()).unwrap();
        let response = upstream.into_response().unwrap();

        assert_eq!(response.predicted_stage, 2);
        assert_eq!(response.confidence, 0.81);
        assert_eq!(response.all_stages_probabilities.len(), 6);
        assert_eq!(response.all_stages_probabilities[2].probability, 0.81);
        assert_eq!(response.feature_importance[1].feature, "Age");
    }

    #[test]
    fn test_response_rejects_stage_out_of_range() {
        let mut body = upstream_body();
        body["predicted_stage"] = json!(6);
        let upstream: UpstreamPredictionResponse = serde_json::from_value(body).unwrap();
        assert!(upstream.into_response().is_err());
    }

    #[test]
    fn test_response_rejects_bad_probability() {
        let mut body = upstream_body();
        body["stage_probabilities"][0]["probability"] = json!(1.5);
        let upstream: UpstreamPredictionResponse = serde_json::from_value(body).unwrap();
        assert!(upstream.into_response().is_err());
    }

    #[test]
    fn test_response_rejects_empty_stage_list() {
        let mut body = upstream_body();
        body["stage_probabilities"] = json!([]);
        let upstream: UpstreamPredictionResponse = serde_json::from_value(body).unwrap();
        let err = upstream.into_response().unwrap_err();
        assert!(err.contains("exactly once"), "unexpected error: {}", err);
    }

    #[test]
    fn test_response_rejects_duplicate_stage() {
        let mut body = upstream_body();
        body["stage_probabilities"][5]["stage"] = json!(4);
        let upstream: UpstreamPredictionResponse = serde_json::from_value(body).unwrap();
        assert!(upstream.into_response().is_err());
    }

    #[test]
    fn test_response_rejects_missing_stage() {
        let mut body = upstream_body();
        body["stage_probabilities"].as_array_mut().unwrap().remove(3);
        let upstream: UpstreamPredictionResponse = serde_json::from_value(body).unwrap();
        assert!(upstream.into_response().is_err());
    }

    #[test]
    fn test_response_orders_stages() {
        let mut body = upstream_body();
        body["stage_probabilities"].as_array_mut().unwrap().reverse();
        let upstream: UpstreamPredictionResponse = serde_json::from_value(body).unwrap();
        let response = upstream.into_response().unwrap();
        let stages: Vec<u8> = response.all_stages_probabilities.iter().map(|p| p.stage).collect();
        assert_eq!(stages, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_response_missing_field_fails_to_parse() {
        let mut body = upstream_body();
        body.as_object_mut().unwrap().remove("feature_importance");
        assert!(serde_json::from_value::<UpstreamPredictionResponse>(body).is_err());
    }
}
