//! Display model for the persisted result returned by a submission.
//!
//! Every input produces a result that can be shown: failures and missing
//! data become explicit statuses rather than errors.

use phytoscan_ai::advice;
use phytoscan_ai::policy::format_confidence;
use phytoscan_ai::{ConfidencePolicy, ConfidenceTier, ResultNormalizer};
use phytoscan_core::config::UNKNOWN_DISEASE;
use phytoscan_core::{NormalizedPrediction, PredictionSet};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::submission::VerifiedSubmission;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResultStatus {
    Detected,
    PredictionFailed { error: String },
    NoDetectionData,
}

/// One row of the top-three table. `label` is thresholded, `actual` is not.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedLabel {
    pub rank: u32,
    pub label: String,
    pub actual: String,
    pub confidence: f64,
    pub confidence_formatted: String,
    pub synthetic: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalResult {
    #[serde(flatten)]
    pub status: ResultStatus,
    pub main_disease: String,
    pub actual_disease: Option<String>,
    pub confidence: f64,
    pub tier: Option<ConfidenceTier>,
    pub top: Vec<RankedLabel>,
    pub disease_info: String,
    pub treatment: String,
    pub saved_image_id: Option<u64>,
}

impl FinalResult {
    pub fn no_detection_data() -> Self {
        Self {
            status: ResultStatus::NoDetectionData,
            main_disease: "No Detection Data".into(),
            actual_disease: None,
            confidence: 0.0,
            tier: None,
            top: Vec::new(),
            disease_info: "Unable to load detection results. Please try analyzing again.".into(),
            treatment: "Please retake the photo and try again.".into(),
            saved_image_id: None,
        }
    }

    pub fn prediction_failed(error: impl Into<String>) -> Self {
        Self {
            status: ResultStatus::PredictionFailed {
                error: error.into(),
            },
            main_disease: "Prediction Failed".into(),
            disease_info: "Unable to analyze the image. Please try again.".into(),
            ..Self::no_detection_data()
        }
    }

    /// Build from a raw submission (or classification) response.
    pub fn from_response(
        raw: &Value,
        normalizer: &ResultNormalizer,
        policy: &ConfidencePolicy,
    ) -> Self {
        if raw.get("success").and_then(Value::as_bool) == Some(false) {
            let error = ["error", "message"]
                .iter()
                .find_map(|k| raw.get(*k).and_then(Value::as_str))
                .unwrap_or("Unknown error");
            warn!(error, "prediction reported failure");
            return Self::prediction_failed(error);
        }

        let normalized = match normalizer.normalize(raw) {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "response has no detection data");
                return Self::no_detection_data();
            }
        };

        let mut result =
            Self::from_prediction(&normalized.primary, &normalized.candidates, policy);

        let body = raw.get("data").unwrap_or(raw);
        if let Some(treatment) = body
            .pointer("/primary_prediction/treatment")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty() && result.main_disease != UNKNOWN_DISEASE)
        {
            result.treatment = treatment.to_string();
        }
        result.saved_image_id = body
            .get("saved_image_id")
            .or_else(|| raw.get("saved_image_id"))
            .and_then(Value::as_u64)
            .filter(|id| *id > 0);
        result
    }

    /// Build from an already-normalized prediction.
    pub fn from_prediction(
        primary: &NormalizedPrediction,
        candidates: &PredictionSet,
        policy: &ConfidencePolicy,
    ) -> Self {
        let display = policy.apply_threshold(&primary.disease, primary.confidence_score);
        let top = candidates
            .entries()
            .iter()
            .map(|p| RankedLabel {
                rank: p.rank,
                label: policy
                    .apply_threshold(&p.disease, p.confidence_score)
                    .to_string(),
                actual: p.disease.clone(),
                confidence: p.confidence_score,
                confidence_formatted: format_confidence(p.confidence_score),
                synthetic: p.is_synthetic(),
            })
            .collect();

        Self {
            status: ResultStatus::Detected,
            main_disease: display.to_string(),
            actual_disease: Some(primary.disease.clone()),
            confidence: primary.confidence_score,
            tier: Some(policy.tier(primary.confidence_score)),
            top,
            disease_info: advice::disease_info(display.as_str()),
            treatment: advice::treatment(display.as_str()).to_string(),
            saved_image_id: None,
        }
    }

    /// Build from the submission itself when the response carried no
    /// usable detection.
    pub fn from_submission(submission: &VerifiedSubmission, policy: &ConfidencePolicy) -> Self {
        let confidence = f64::from(submission.confidence);
        Self {
            status: ResultStatus::Detected,
            main_disease: submission.detected_disease.clone(),
            actual_disease: None,
            confidence,
            tier: Some(policy.tier(confidence)),
            top: Vec::new(),
            disease_info: advice::disease_info(&submission.detected_disease),
            treatment: advice::treatment(&submission.detected_disease).to_string(),
            saved_image_id: None,
        }
    }

    pub fn is_detected(&self) -> bool {
        self.status == ResultStatus::Detected
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn low_confidence_main_label_is_unknown_but_actual_kept() {
        let raw = json!({
            "success": true,
            "data": {
                "primary_prediction": { "disease": "Gall Midge", "confidence_score": 41.0, "treatment": "Spray" },
                "top_3_predictions": [
                    { "disease": "Gall Midge", "confidence": 41.0, "rank": 1 },
                    { "disease": "Healthy", "confidence": 35.0, "rank": 2 },
                    { "disease": "Die Back", "confidence": 24.0, "rank": 3 }
                ],
                "saved_image_id": 17
            }
        });
        let policy = ConfidencePolicy {
            unknown_threshold: 50.0,
            ..ConfidencePolicy::default()
        };
        let result = FinalResult::from_response(&raw, &ResultNormalizer::default(), &policy);
        assert!(result.is_detected());
        assert_eq!(result.main_disease, "Unknown");
        assert_eq!(result.actual_disease.as_deref(), Some("Gall Midge"));
        assert_eq!(result.tier, Some(ConfidenceTier::Low));
        assert_eq!(result.top.len(), 3);
        assert!(result.top.iter().all(|r| r.label == "Unknown"));
        assert_eq!(result.top[1].actual, "Healthy");
        // Unknown uses its own advice, not the server's disease-specific text.
        assert_eq!(result.treatment, advice::treatment("Unknown"));
        assert_eq!(result.saved_image_id, Some(17));
    }

    #[test]
    fn confident_result_uses_server_treatment() {
        let raw = json!({
            "success": true,
            "data": {
                "primary_prediction": { "disease": "Anthracnose", "confidence_score": 85.3, "treatment": "Copper spray" },
                "predictions": [
                    { "disease": "Anthracnose", "confidence": 85.3, "rank": 1 }
                ]
            }
        });
        let result = FinalResult::from_response(
            &raw,
            &ResultNormalizer::default(),
            &ConfidencePolicy::default(),
        );
        assert_eq!(result.main_disease, "Anthracnose");
        assert_eq!(result.tier, Some(ConfidenceTier::High));
        assert_eq!(result.treatment, "Copper spray");
        assert_eq!(result.top[0].confidence_formatted, "85.3%");
        assert!(result.saved_image_id.is_none());
    }

    #[test]
    fn failure_flag_yields_prediction_failed() {
        let raw = json!({ "success": false, "error": "model offline" });
        let result = FinalResult::from_response(
            &raw,
            &ResultNormalizer::default(),
            &ConfidencePolicy::default(),
        );
        assert_eq!(
            result.status,
            ResultStatus::PredictionFailed {
                error: "model offline".into()
            }
        );
    }

    #[test]
    fn unrecognized_shape_yields_no_detection_data() {
        let raw = json!({ "success": true, "data": { "status": "queued" } });
        let result = FinalResult::from_response(
            &raw,
            &ResultNormalizer::default(),
            &ConfidencePolicy::default(),
        );
        assert_eq!(result.status, ResultStatus::NoDetectionData);
        assert_eq!(result.main_disease, "No Detection Data");
    }

    #[test]
    fn status_serializes_as_tag() {
        let json = serde_json::to_value(FinalResult::no_detection_data()).unwrap();
        assert_eq!(json["status"], "no_detection_data");
        let json = serde_json::to_value(FinalResult::prediction_failed("x")).unwrap();
        assert_eq!(json["status"], "prediction_failed");
        assert_eq!(json["error"], "x");
    }
}
