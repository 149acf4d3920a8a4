//! Step kinds that make up a verification workflow.
//!
//! A workflow is an ordered list of these; the gating predicate for each
//! kind lives with the state machine in `phytoscan-workflow`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Waiting on the classifier. Passes once the detection has settled.
    Analysis,
    /// Yes/no on detection correctness only.
    Verify,
    /// Yes/no on correctness plus at least one symptom when answered "yes".
    VerifySymptoms,
    /// Optional symptom checklist.
    Symptoms,
    /// Location accuracy confirmation.
    Location,
    /// Optional free-text feedback.
    Comments,
    /// Review and submit.
    Confirm,
}

impl StepKind {
    pub fn title(&self) -> &'static str {
        match self {
            Self::Analysis => "Image Analysis",
            Self::Verify => "Verify Detection",
            Self::VerifySymptoms => "Symptom Detection",
            Self::Symptoms => "Select Symptoms",
            Self::Location => "Location Information",
            Self::Comments => "Additional Comments",
            Self::Confirm => "Confirm & Analyze",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Analysis => "AI analyzing your image...",
            Self::Verify => "Please verify the AI detection result",
            Self::VerifySymptoms => "Confirm the detection and check the symptoms you observe",
            Self::Symptoms => "Check symptoms that match your observation",
            Self::Location => "Confirm the detected location is accurate",
            Self::Comments => "Add any notes for the reviewer (optional)",
            Self::Confirm => "Review your answers and save the analysis",
        }
    }

    /// Whether this step asks the user to confirm location accuracy.
    pub fn confirms_location(&self) -> bool {
        matches!(self, Self::Location)
    }
}
