//! Verification workflow engine: one [`WorkflowSession`] per photo, driving
//! gated steps from detection through to the persisted result.

pub mod detection;
pub mod error;
pub mod location;
pub mod result;
pub mod session;
pub mod steps;
pub mod submission;
pub mod verdict;

pub use detection::{DetectionOutcome, DetectionTask};
pub use error::WorkflowError;
pub use location::LocationTask;
pub use result::{FinalResult, RankedLabel, ResultStatus};
pub use session::{AuditRecord, Detection, DetectionStatus, SubmissionPhase, WorkflowSession};
pub use steps::{GateContext, StepInfo, StepMachine};
pub use submission::{
    SubmissionAssembler, SubmissionInput, SubmissionSummary, TopDisease, VerifiedSubmission,
};
pub use verdict::{VerificationEvent, WorkflowState};
