pub mod config;
pub mod error;
pub mod location;
pub mod prediction;
pub mod step;

pub use config::WorkflowConfig;
pub use error::{ConfigError, ParseDetectionTypeError};
pub use location::{LocationData, LocationSource};
pub use prediction::{
    CandidateSource, DetectionType, NormalizedPrediction, PredictionOrigin, PredictionSet,
};
pub use step::StepKind;
