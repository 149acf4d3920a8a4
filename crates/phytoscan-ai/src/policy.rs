//! Confidence policy: the unknown-threshold and the coarse confidence tier.
//!
//! The two cut sets are independent. A 45% prediction can be revealed
//! (threshold 30) and still sit in the Low tier (medium starts at 50).

use std::fmt;

use phytoscan_core::WorkflowConfig;
use phytoscan_core::config::{
    HIGH_CONFIDENCE_TIER, MEDIUM_CONFIDENCE_TIER, UNKNOWN_CONFIDENCE_THRESHOLD, UNKNOWN_DISEASE,
};
use serde::Serialize;

/// The label actually shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum DisplayDisease {
    Known(String),
    Unknown,
}

impl DisplayDisease {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Known(name) => name,
            Self::Unknown => UNKNOWN_DISEASE,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }
}

impl fmt::Display for DisplayDisease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<DisplayDisease> for String {
    fn from(value: DisplayDisease) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

impl ConfidenceTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

impl fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidencePolicy {
    pub unknown_threshold: f64,
    pub high_tier: f64,
    pub medium_tier: f64,
}

impl Default for ConfidencePolicy {
    fn default() -> Self {
        Self {
            unknown_threshold: UNKNOWN_CONFIDENCE_THRESHOLD,
            high_tier: HIGH_CONFIDENCE_TIER,
            medium_tier: MEDIUM_CONFIDENCE_TIER,
        }
    }
}

impl ConfidencePolicy {
    pub fn from_config(config: &WorkflowConfig) -> Self {
        Self {
            unknown_threshold: config.unknown_threshold,
            high_tier: config.high_tier,
            medium_tier: config.medium_tier,
        }
    }

    /// `Unknown` below the threshold or for a blank name, otherwise the name.
    ///
    /// Compares the whole-percent value so `29.6` and `30` agree.
    pub fn apply_threshold(&self, disease: &str, confidence: f64) -> DisplayDisease {
        if confidence.round() < self.unknown_threshold || disease.trim().is_empty() {
            DisplayDisease::Unknown
        } else {
            DisplayDisease::Known(disease.to_string())
        }
    }

    pub fn tier(&self, confidence: f64) -> ConfidenceTier {
        let confidence = confidence.round();
        if confidence >= self.high_tier {
            ConfidenceTier::High
        } else if confidence >= self.medium_tier {
            ConfidenceTier::Medium
        } else {
            ConfidenceTier::Low
        }
    }
}

/// `85.3%`: one decimal, for re-displaying an unrounded score.
pub fn format_confidence(confidence: f64) -> String {
    format!("{confidence:.1}%")
}

/// `85%`: whole percent, matching the value used for threshold checks.
pub fn format_rounded_confidence(confidence: f64) -> String {
    format!("{}%", confidence.round())
}
