//! Builds the verified-submission payload from session state.

use phytoscan_ai::{DisplayDisease, SymptomSet};
use phytoscan_core::{DetectionType, LocationData, NormalizedPrediction, PredictionSet};
use phytoscan_sync::SubmissionRequest;
use serde::Serialize;

use crate::error::WorkflowError;
use crate::verdict::WorkflowState;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopDisease {
    pub disease: String,
    pub confidence: f64,
    pub rank: u32,
    pub synthetic: bool,
}

impl From<&NormalizedPrediction> for TopDisease {
    fn from(p: &NormalizedPrediction) -> Self {
        Self {
            disease: p.disease.clone(),
            confidence: p.confidence_score,
            rank: p.rank,
            synthetic: p.is_synthetic(),
        }
    }
}

/// Counts for audit logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionSummary {
    pub total_available: usize,
    pub total_selected: usize,
    pub primary_selected: usize,
    pub alternative_selected: usize,
}

/// Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedSubmission {
    pub detected_disease: String,
    /// Whole percent.
    pub confidence: u32,
    pub all_selected_symptoms: Vec<String>,
    pub primary_selected_symptoms: Vec<String>,
    pub alternative_selected_symptoms: Vec<String>,
    pub primary_symptoms: Vec<String>,
    pub alternative_symptoms: Vec<String>,
    pub is_detection_correct: bool,
    pub user_feedback: String,
    pub top_diseases: Vec<TopDisease>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_data: Option<LocationData>,
    pub location_accuracy_confirmed: bool,
    pub summary: SubmissionSummary,
}

/// Inputs borrowed from a session at confirmation time.
pub struct SubmissionInput<'a> {
    pub state: &'a WorkflowState,
    pub symptoms: &'a SymptomSet,
    pub candidates: &'a PredictionSet,
    pub detected: &'a DisplayDisease,
    pub confidence: f64,
    pub location: Option<LocationData>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SubmissionAssembler {
    /// Whether the workflow includes a location-confirmation step.
    pub requires_location_confirmation: bool,
}

impl SubmissionAssembler {
    pub fn new(requires_location_confirmation: bool) -> Self {
        Self {
            requires_location_confirmation,
        }
    }

    pub fn assemble(&self, input: SubmissionInput<'_>) -> Result<VerifiedSubmission, WorkflowError> {
        let is_detection_correct =
            input
                .state
                .is_detection_correct
                .ok_or(WorkflowError::IncompleteSubmission {
                    field: "isDetectionCorrect",
                })?;
        let location_accuracy_confirmed = match input.state.location_accuracy_confirmed {
            Some(answer) => answer,
            None if self.requires_location_confirmation => {
                return Err(WorkflowError::IncompleteSubmission {
                    field: "locationAccuracyConfirmed",
                });
            }
            None => false,
        };

        let primary_selected: Vec<String> =
            input.symptoms.primary.selected().map(str::to_string).collect();
        let alternative_selected: Vec<String> = input
            .symptoms
            .alternative
            .selected()
            .map(str::to_string)
            .collect();
        let summary = SubmissionSummary {
            total_available: input.symptoms.len(),
            total_selected: primary_selected.len() + alternative_selected.len(),
            primary_selected: primary_selected.len(),
            alternative_selected: alternative_selected.len(),
        };

        Ok(VerifiedSubmission {
            detected_disease: input.detected.as_str().to_string(),
            confidence: input.confidence.round().clamp(0.0, 100.0) as u32,
            all_selected_symptoms: input.symptoms.all_selected(),
            primary_selected_symptoms: primary_selected,
            alternative_selected_symptoms: alternative_selected,
            primary_symptoms: input.symptoms.primary.symptoms().to_vec(),
            alternative_symptoms: input.symptoms.alternative.symptoms().to_vec(),
            is_detection_correct,
            user_feedback: input.state.feedback_text.trim().to_string(),
            top_diseases: input.candidates.entries().iter().map(TopDisease::from).collect(),
            location_data: input.location,
            location_accuracy_confirmed,
            summary,
        })
    }
}

impl VerifiedSubmission {
    pub fn to_request(&self, image: Vec<u8>, detection_type: DetectionType) -> SubmissionRequest {
        SubmissionRequest {
            image,
            file_name: "image.jpg".into(),
            detection_type,
            is_detection_correct: self.is_detection_correct,
            user_feedback: Some(self.user_feedback.clone()).filter(|f| !f.is_empty()),
            selected_symptoms: Some(self.all_selected_symptoms.clone()),
            primary_symptoms: Some(self.primary_selected_symptoms.clone()),
            alternative_symptoms: Some(self.alternative_selected_symptoms.clone()),
            detected_disease: Some(self.detected_disease.clone()),
            top_diseases: serde_json::to_value(&self.top_diseases).ok(),
            symptoms_data: serde_json::to_value(self).ok(),
            location: self.location_data.clone(),
            location_accuracy_confirmed: self.location_accuracy_confirmed,
        }
    }
}
