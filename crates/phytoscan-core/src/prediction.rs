//! Canonical prediction types shared by the normalizer, the workflow engine,
//! and the submission payload.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseDetectionTypeError;

/// Which plant part was photographed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionType {
    Fruit,
    #[default]
    Leaf,
}

impl DetectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fruit => "fruit",
            Self::Leaf => "leaf",
        }
    }
}

impl fmt::Display for DetectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DetectionType {
    type Err = ParseDetectionTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fruit" => Ok(Self::Fruit),
            "leaf" => Ok(Self::Leaf),
            _ => Err(ParseDetectionTypeError(s.to_string())),
        }
    }
}

/// Where a candidate entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionOrigin {
    /// Reported by the classifier.
    Classifier,
    /// Filler drawn from the fallback pool. Never a real alternative prediction.
    Synthetic,
}

/// A single disease candidate with its confidence on the 0–100 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPrediction {
    pub disease: String,
    /// Unrounded percentage in `0.0..=100.0`.
    pub confidence_score: f64,
    /// 1-based rank within its [`PredictionSet`].
    pub rank: u32,
    pub origin: PredictionOrigin,
}

impl NormalizedPrediction {
    pub fn new(disease: impl Into<String>, confidence_score: f64, rank: u32) -> Self {
        Self {
            disease: disease.into(),
            confidence_score,
            rank,
            origin: PredictionOrigin::Classifier,
        }
    }

    pub fn synthetic(disease: impl Into<String>, confidence_score: f64, rank: u32) -> Self {
        Self {
            origin: PredictionOrigin::Synthetic,
            ..Self::new(disease, confidence_score, rank)
        }
    }

    /// Confidence rounded to the nearest whole percent.
    ///
    /// Used for threshold comparisons and tiering so that `29.6` and `30`
    /// land on the same side of a cut point.
    pub fn rounded_confidence(&self) -> u32 {
        self.confidence_score.round().clamp(0.0, 100.0) as u32
    }

    pub fn is_synthetic(&self) -> bool {
        self.origin == PredictionOrigin::Synthetic
    }
}

/// How the candidate list of a [`PredictionSet`] was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    /// Read from a ranked list in the response; names the extraction strategy.
    Reported(&'static str),
    /// The response carried no ranked list; entries after the first are filler.
    Synthesized,
}

/// Up to three candidates ordered by rank (1 = primary).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionSet {
    entries: Vec<NormalizedPrediction>,
    source: CandidateSource,
}

impl PredictionSet {
    /// Build a set from entries already ordered best-first.
    ///
    /// Ranks are reassigned `1..=n` so that position and rank always agree.
    pub fn new(mut entries: Vec<NormalizedPrediction>, source: CandidateSource) -> Self {
        for (i, entry) in entries.iter_mut().enumerate() {
            entry.rank = i as u32 + 1;
        }
        Self { entries, source }
    }

    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            source: CandidateSource::Synthesized,
        }
    }

    pub fn entries(&self) -> &[NormalizedPrediction] {
        &self.entries
    }

    pub fn source(&self) -> CandidateSource {
        self.source
    }

    pub fn is_synthetic(&self) -> bool {
        self.source == CandidateSource::Synthesized
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at a 1-based rank.
    pub fn at_rank(&self, rank: u32) -> Option<&NormalizedPrediction> {
        self.entries.iter().find(|e| e.rank == rank)
    }

    /// Entries ranked below the primary (rank 2 and 3).
    pub fn alternatives(&self) -> impl Iterator<Item = &NormalizedPrediction> {
        self.entries.iter().filter(|e| e.rank >= 2)
    }
}
