//! Named workflow constants and the per-session configuration built from them.
//!
//! Two workflow variants exist with different unknown-thresholds (30 and 50).
//! They are kept as separate presets; a session always uses exactly one value.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::step::StepKind;

/// Minimum confidence (percent) to reveal the disease name instead of `Unknown`.
pub const UNKNOWN_CONFIDENCE_THRESHOLD: f64 = 30.0;

/// Unknown-threshold used by the staged (results-first) workflow variant.
pub const STAGED_UNKNOWN_CONFIDENCE_THRESHOLD: f64 = 50.0;

/// Lower bound (inclusive) of the High confidence tier.
pub const HIGH_CONFIDENCE_TIER: f64 = 80.0;

/// Lower bound (inclusive) of the Medium confidence tier.
pub const MEDIUM_CONFIDENCE_TIER: f64 = 50.0;

/// How long a session waits on the classifier before failing open.
pub const FAIL_OPEN_TIMEOUT: Duration = Duration::from_secs(3);

/// Disease names used to pad a candidate list the classifier did not send.
pub const FALLBACK_DISEASE_POOL: &[&str] = &[
    "Anthracnose",
    "Bacterial Canker",
    "Powdery Mildew",
    "Die Back",
    "Sooty Mould",
];

/// Maximum number of ranked candidates kept per prediction.
pub const MAX_CANDIDATES: usize = 3;

/// Lowest confidence a synthesized filler candidate may carry.
pub const SYNTHETIC_CONFIDENCE_FLOOR: f64 = 10.0;

/// Base confidence for filler candidates when the primary reported none.
pub const SYNTHETIC_CONFIDENCE_BASE: f64 = 50.0;

/// Label shown when confidence is below the unknown-threshold.
pub const UNKNOWN_DISEASE: &str = "Unknown";

/// Per-session workflow configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub unknown_threshold: f64,
    pub high_tier: f64,
    pub medium_tier: f64,
    pub fail_open_timeout_ms: u64,
    pub fallback_pool: Vec<String>,
    pub steps: Vec<StepKind>,
}

impl Default for WorkflowConfig {
    /// Combined verify-and-symptoms flow: verify, location, comments, confirm.
    fn default() -> Self {
        Self {
            unknown_threshold: UNKNOWN_CONFIDENCE_THRESHOLD,
            high_tier: HIGH_CONFIDENCE_TIER,
            medium_tier: MEDIUM_CONFIDENCE_TIER,
            fail_open_timeout_ms: FAIL_OPEN_TIMEOUT.as_millis() as u64,
            fallback_pool: FALLBACK_DISEASE_POOL.iter().map(|s| s.to_string()).collect(),
            steps: vec![
                StepKind::VerifySymptoms,
                StepKind::Location,
                StepKind::Comments,
                StepKind::Confirm,
            ],
        }
    }
}

impl WorkflowConfig {
    /// Staged flow: analysis, verify, symptoms, then location-and-save.
    pub fn staged() -> Self {
        Self {
            unknown_threshold: STAGED_UNKNOWN_CONFIDENCE_THRESHOLD,
            steps: vec![
                StepKind::Analysis,
                StepKind::Verify,
                StepKind::Symptoms,
                StepKind::Location,
            ],
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = %path.display(), "loading workflow config");
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn fail_open_timeout(&self) -> Duration {
        Duration::from_millis(self.fail_open_timeout_ms)
    }

    /// Whether any step asks for a location-accuracy answer.
    pub fn requires_location_confirmation(&self) -> bool {
        self.steps.iter().any(|s| s.confirms_location())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("unknown_threshold", self.unknown_threshold),
            ("high_tier", self.high_tier),
            ("medium_tier", self.medium_tier),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("{value} is outside 0..=100"),
                });
            }
        }
        if self.medium_tier > self.high_tier {
            return Err(ConfigError::Invalid {
                field: "medium_tier",
                reason: format!(
                    "medium tier {} is above high tier {}",
                    self.medium_tier, self.high_tier
                ),
            });
        }
        if self.steps.is_empty() {
            return Err(ConfigError::Invalid {
                field: "steps",
                reason: "at least one step is required".into(),
            });
        }
        if self.fallback_pool.iter().any(|d| d.trim().is_empty()) {
            return Err(ConfigError::Invalid {
                field: "fallback_pool",
                reason: "disease names must not be blank".into(),
            });
        }
        Ok(())
    }
}
