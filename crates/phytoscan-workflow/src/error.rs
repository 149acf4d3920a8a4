use phytoscan_ai::NormalizeError;
use phytoscan_core::StepKind;
use phytoscan_sync::ClientError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error(transparent)]
    Malformed(#[from] NormalizeError),
    #[error("network error: {0}")]
    Network(#[from] ClientError),
    #[error("submission incomplete: {field} has not been answered")]
    IncompleteSubmission { field: &'static str },
    #[error("cannot leave {step:?}: {reason}")]
    StepBlocked { step: StepKind, reason: String },
    #[error("submission is only possible from the final step")]
    NotAtFinalStep,
    #[error("no detection is available to submit")]
    DetectionUnavailable,
    #[error("a submission is already in flight")]
    AlreadyInFlight,
    #[error("this session has already been submitted")]
    AlreadySubmitted,
    #[error("no symptom at index {0}")]
    NoSuchSymptom(usize),
}

impl WorkflowError {
    /// Whether the user can retry the same action.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}
