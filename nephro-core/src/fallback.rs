//! Demo fallback estimator.
//!
//! Produces a plausible-looking prediction when the inference service cannot
//! be reached. The stage comes from a creatinine threshold ladder; confidence
//! is random and feature importances are constants that ignore the input.
//! Nothing here is a clinical model. It only runs when `inference.mode = "demo"`.

use rand::Rng;

use crate::models::{FeatureImportance, PredictionInput, PredictionResponse, StageProbability, MAX_STAGE};

/// `(creatinine strictly above, stage)`, checked from the top down.
pub const CREATININE_THRESHOLDS: [(f64, u8); 5] =
    [(200.0, 5), (100.0, 4), (50.0, 3), (20.0, 2), (15.0, 1)];

pub const MIN_CONFIDENCE: f64 = 0.87;
pub const CONFIDENCE_SPREAD: f64 = 0.1;

pub const FEATURE_IMPORTANCE: [(&str, f64); 6] = [
    ("Créatinine", 0.72),
    ("Urée", 0.61),
    ("Âge", 0.45),
    ("Pression artérielle", 0.38),
    ("Score de Glasgow", 0.31),
    ("Autres facteurs", 0.24),
];

pub fn stage_for_creatinine(creatinine: f64) -> u8 {
    CREATININE_THRESHOLDS
        .iter()
        .find(|(threshold, _)| creatinine > *threshold)
        .map(|(_, stage)| *stage)
        .unwrap_or(0)
}

/// Draw a confidence in `[0.87, 0.97)`.
pub fn draw_confidence<R: Rng>(rng: &mut R) -> f64 {
    let upper = MIN_CONFIDENCE + CONFIDENCE_SPREAD;
    let confidence = MIN_CONFIDENCE + rng.gen_range(0.0..CONFIDENCE_SPREAD);
    // the sum can round up onto the open bound
    if confidence >= upper {
        upper - f64::EPSILON
    } else {
        confidence
    }
}

/// Build the fabricated response for a given confidence.
pub fn estimate_with_confidence(input: &PredictionInput, confidence: f64) -> PredictionResponse {
    let predicted_stage = stage_for_creatinine(input.creatinine);
    let others = (1.0 - confidence) / f64::from(MAX_STAGE);

    let all_stages_probabilities = (0..=MAX_STAGE)
        .map(|stage| StageProbability {
            stage,
            probability: if stage == predicted_stage {
                confidence
            } else {
                others
            },
        })
        .collect();

    let feature_importance = FEATURE_IMPORTANCE
        .iter()
        .map(|(feature, importance)| FeatureImportance {
            feature: feature.to_string(),
            importance: *importance,
        })
        .collect();

    PredictionResponse {
        predicted_stage,
        confidence,
        all_stages_probabilities,
        feature_importance,
    }
}

pub fn estimate<R: Rng>(input: &PredictionInput, rng: &mut R) -> PredictionResponse {
    let confidence = draw_confidence(rng);
    estimate_with_confidence(input, confidence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn input_with_creatinine(creatinine: f64) -> PredictionInput {
        PredictionInput {
            creatinine,
            urea: 1.0,
            age: 60,
            sodium: 140.0,
            bp_systolic: 130.0,
            shock: 0,
            sex: 1,
            anemia: 0,
            glasgow: 15.0,
            tobacco: 0,
            alcohol: 0,
        }
    }

    #[test]
    fn test_low_creatinine_is_stage_zero() {
        for creatinine in [0.1, 5.0, 14.99, 15.0] {
            assert_eq!(stage_for_creatinine(creatinine), 0, "creatinine={}", creatinine);
        }
    }

    #[test]
    fn test_thresholds_are_right_exclusive() {
        assert_eq!(stage_for_creatinine(15.0), 0);
        assert_eq!(stage_for_creatinine(20.0), 1);
        assert_eq!(stage_for_creatinine(50.0), 2);
        assert_eq!(stage_for_creatinine(100.0), 3);
        assert_eq!(stage_for_creatinine(200.0), 4);
    }

    #[test]
    fn test_values_above_each_threshold() {
        assert_eq!(stage_for_creatinine(15.01), 1);
        assert_eq!(stage_for_creatinine(20.5), 2);
        assert_eq!(stage_for_creatinine(50.5), 3);
        assert_eq!(stage_for_creatinine(100.5), 4);
        assert_eq!(stage_for_creatinine(200.5), 5);
        assert_eq!(stage_for_creatinine(1_000.0), 5);
    }

    #[test]
    fn test_confidence_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10_000 {
            let confidence = draw_confidence(&mut rng);
            assert!(
                (MIN_CONFIDENCE..MIN_CONFIDENCE + CONFIDENCE_SPREAD).contains(&confidence),
                "confidence {} out of range",
                confidence
            );
        }
    }

    #[test]
    fn test_probabilities_sum_to_one_and_peak_at_stage() {
        let mut rng = StdRng::seed_from_u64(42);
        for creatinine in [10.0, 18.0, 30.0, 75.0, 150.0, 250.0] {
            let input = input_with_creatinine(creatinine);
            let response = estimate(&input, &mut rng);

            assert_eq!(response.all_stages_probabilities.len(), 6);
            let sum: f64 = response
                .all_stages_probabilities
                .iter()
                .map(|p| p.probability)
                .sum();
            assert!((sum - 1.0).abs() < 1e-9, "sum was {}", sum);

            let peak = &response.all_stages_probabilities[response.predicted_stage as usize];
            assert_eq!(peak.stage, response.predicted_stage);
            assert_eq!(peak.probability, response.confidence);
        }
    }

    #[test]
    fn test_stages_are_listed_in_order() {
        let response = estimate_with_confidence(&input_with_creatinine(60.0), 0.9);
        let stages: Vec<u8> = response
            .all_stages_probabilities
            .iter()
            .map(|p| p.stage)
            .collect();
        assert_eq!(stages, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(response.predicted_stage, 3);
        assert!((response.all_stages_probabilities[0].probability - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_feature_importance_is_constant() {
        let a = estimate_with_confidence(&input_with_creatinine(10.0), 0.9);
        let b = estimate_with_confidence(&input_with_creatinine(300.0), 0.95);
        assert_eq!(a.feature_importance, b.feature_importance);
        assert_eq!(a.feature_importance.len(), 6);
        assert_eq!(a.feature_importance[0].feature, "Créatinine");
        assert_eq!(a.feature_importance[0].importance, 0.72);
        assert_eq!(a.feature_importance[5].feature, "Autres facteurs");
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        let input = input_with_creatinine(250.0);
        let a = estimate(&input, &mut StdRng::seed_from_u64(1));
        let b = estimate(&input, &mut StdRng::seed_from_u64(1));
        assert_eq!(a, b);
        assert_eq!(a.predicted_stage, 5);
    }
}
