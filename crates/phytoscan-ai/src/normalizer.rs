//! Prediction response normalization.
//!
//! The classifier has answered in several JSON shapes over time: the primary
//! prediction nested under `data.primary_prediction`, a bare
//! `primary_prediction`, or flat `predicted_disease`/`disease` + `confidence`
//! fields. Confidence arrives as a 0–1 fraction, a 0–100 number, or a
//! `"45.58%"` string. Everything downstream of [`ResultNormalizer`] sees one
//! shape: a [`NormalizedPrediction`] on the 0–100 scale.
//!
//! Shape probing is an ordered list of named strategies. Each one either
//! produces a value or steps aside; the first hit wins.

use phytoscan_core::config::{
    FALLBACK_DISEASE_POOL, MAX_CANDIDATES, SYNTHETIC_CONFIDENCE_BASE, SYNTHETIC_CONFIDENCE_FLOOR,
};
use phytoscan_core::{CandidateSource, NormalizedPrediction, PredictionSet, WorkflowConfig};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error, PartialEq)]
pub enum NormalizeError {
    #[error("no primary disease found in prediction response (tried: {tried})")]
    MalformedResponse { tried: String },
}

/// A named probe for the primary prediction: `(disease, raw confidence)`.
pub struct PrimaryStrategy {
    pub name: &'static str,
    pub extract: fn(&Value) -> Option<(String, f64)>,
}

/// A named probe for the ranked candidate list.
pub struct CandidateStrategy {
    pub name: &'static str,
    pub extract: fn(&Value) -> Option<Vec<NormalizedPrediction>>,
}

/// Primary-prediction probes, in priority order.
pub const PRIMARY_STRATEGIES: &[PrimaryStrategy] = &[
    PrimaryStrategy {
        name: "data.primary_prediction",
        extract: nested_primary,
    },
    PrimaryStrategy {
        name: "primary_prediction",
        extract: top_level_primary,
    },
    PrimaryStrategy {
        name: "flat_fields",
        extract: flat_fields,
    },
    PrimaryStrategy {
        name: "ranked_list_head",
        extract: ranked_list_head,
    },
];

/// Candidate-list probes, in priority order.
pub const CANDIDATE_STRATEGIES: &[CandidateStrategy] = &[
    CandidateStrategy {
        name: "data.predictions",
        extract: nested_predictions,
    },
    CandidateStrategy {
        name: "predictions",
        extract: top_level_predictions,
    },
    CandidateStrategy {
        name: "data.top_3_predictions",
        extract: nested_top_three,
    },
];

/// Output of [`ResultNormalizer::normalize`].
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedResponse {
    /// Primary prediction, always rank 1.
    pub primary: NormalizedPrediction,
    /// Up to [`MAX_CANDIDATES`] ranked candidates, primary first.
    pub candidates: PredictionSet,
    /// Name of the strategy that located the primary prediction.
    pub primary_strategy: &'static str,
}

/// Converts raw classifier responses into canonical predictions.
#[derive(Debug, Clone)]
pub struct ResultNormalizer {
    fallback_pool: Vec<String>,
    max_candidates: usize,
}

impl Default for ResultNormalizer {
    fn default() -> Self {
        Self {
            fallback_pool: FALLBACK_DISEASE_POOL.iter().map(|s| s.to_string()).collect(),
            max_candidates: MAX_CANDIDATES,
        }
    }
}

impl ResultNormalizer {
    pub fn from_config(config: &WorkflowConfig) -> Self {
        Self {
            fallback_pool: config.fallback_pool.clone(),
            max_candidates: MAX_CANDIDATES,
        }
    }

    /// Normalize a raw response.
    ///
    /// Fails only when no strategy can locate a primary disease name.
    pub fn normalize(&self, raw: &Value) -> Result<NormalizedResponse, NormalizeError> {
        let (primary_strategy, disease, confidence) = PRIMARY_STRATEGIES
            .iter()
            .find_map(|s| (s.extract)(raw).map(|(d, c)| (s.name, d, c)))
            .ok_or_else(|| NormalizeError::MalformedResponse {
                tried: PRIMARY_STRATEGIES
                    .iter()
                    .map(|s| s.name)
                    .collect::<Vec<_>>()
                    .join(", "),
            })?;

        debug!(strategy = primary_strategy, disease = %disease, confidence, "located primary prediction");
        let primary = NormalizedPrediction::new(disease, confidence, 1);

        let reported = CANDIDATE_STRATEGIES
            .iter()
            .find_map(|s| (s.extract)(raw).map(|list| (s.name, list)));

        let candidates = match reported {
            Some((name, mut list)) => {
                debug!(strategy = name, count = list.len(), "located candidate list");
                list.truncate(self.max_candidates);
                PredictionSet::new(list, CandidateSource::Reported(name))
            }
            None => self.synthesize(&primary),
        };

        Ok(NormalizedResponse {
            primary,
            candidates,
            primary_strategy,
        })
    }

    /// Pad a lone primary prediction with filler from the fallback pool.
    ///
    /// Filler `i` (0-based) gets `max(floor, base - 20 - 10 * i)` where base is
    /// the primary confidence, or [`SYNTHETIC_CONFIDENCE_BASE`] when that is 0.
    fn synthesize(&self, primary: &NormalizedPrediction) -> PredictionSet {
        let base = if primary.confidence_score > 0.0 {
            primary.confidence_score
        } else {
            SYNTHETIC_CONFIDENCE_BASE
        };

        let fillers = self
            .fallback_pool
            .iter()
            .filter(|d| **d != primary.disease)
            .take(self.max_candidates.saturating_sub(1))
            .enumerate()
            .map(|(i, disease)| {
                let confidence = (base - 20.0 - 10.0 * i as f64).max(SYNTHETIC_CONFIDENCE_FLOOR);
                NormalizedPrediction::synthetic(disease.clone(), confidence, i as u32 + 2)
            });

        let mut entries = vec![primary.clone()];
        entries.extend(fillers);
        warn!(
            primary = %primary.disease,
            fillers = entries.len() - 1,
            "response carried no candidate list; synthesized filler alternatives"
        );
        PredictionSet::new(entries, CandidateSource::Synthesized)
    }
}

/// Convert any supported confidence encoding to a 0–100 percentage.
///
/// - `"45.58%"` is parsed as a percentage.
/// - Numbers (and numeric strings) `<= 1` are fractions and scaled by 100.
/// - Larger numbers are already percentages.
///
/// Missing or unparseable values yield `None`.
pub fn normalize_confidence(raw: &Value) -> Option<f64> {
    let value = match raw {
        Value::String(s) if s.contains('%') => {
            return s
                .replace('%', "")
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(|v| v.clamp(0.0, 100.0));
        }
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Number(n) => n.as_f64()?,
        _ => return None,
    };
    if !value.is_finite() {
        return None;
    }
    let percent = if value <= 1.0 { value * 100.0 } else { value };
    Some(percent.clamp(0.0, 100.0))
}

// ── Primary strategies ──

fn nested_primary(raw: &Value) -> Option<(String, f64)> {
    primary_object(raw.get("data")?.get("primary_prediction")?)
}

fn top_level_primary(raw: &Value) -> Option<(String, f64)> {
    primary_object(raw.get("primary_prediction")?)
}

fn primary_object(obj: &Value) -> Option<(String, f64)> {
    let disease = non_empty_str(obj.get("disease"))?;
    let confidence = obj
        .get("confidence_score")
        .or_else(|| obj.get("confidence"))
        .and_then(normalize_confidence)
        .unwrap_or(0.0);
    Some((disease, confidence))
}

fn flat_fields(raw: &Value) -> Option<(String, f64)> {
    let disease =
        non_empty_str(raw.get("predicted_disease")).or_else(|| non_empty_str(raw.get("disease")))?;
    let confidence = raw
        .get("confidence")
        .and_then(normalize_confidence)
        .unwrap_or(0.0);
    Some((disease, confidence))
}

fn ranked_list_head(raw: &Value) -> Option<(String, f64)> {
    let list = CANDIDATE_STRATEGIES.iter().find_map(|s| (s.extract)(raw))?;
    let head = list.into_iter().next()?;
    Some((head.disease, head.confidence_score))
}

// ── Candidate strategies ──

fn nested_predictions(raw: &Value) -> Option<Vec<NormalizedPrediction>> {
    candidate_list(raw.get("data")?.get("predictions")?)
}

fn top_level_predictions(raw: &Value) -> Option<Vec<NormalizedPrediction>> {
    candidate_list(raw.get("predictions")?)
}

fn nested_top_three(raw: &Value) -> Option<Vec<NormalizedPrediction>> {
    candidate_list(raw.get("data")?.get("top_3_predictions")?)
}

/// Parse a candidate array and order it best-first.
///
/// Source ranks are honoured when every usable entry carries one; otherwise
/// entries are ordered by confidence, descending. A list with no usable
/// entries counts as absent so the next strategy (or synthesis) runs.
fn candidate_list(list: &Value) -> Option<Vec<NormalizedPrediction>> {
    let items = list.as_array()?;
    let mut parsed: Vec<(Option<u64>, NormalizedPrediction)> = items
        .iter()
        .filter_map(|item| {
            let disease = non_empty_str(item.get("disease"))
                .or_else(|| non_empty_str(item.get("predicted_disease")))?;
            let confidence = item
                .get("confidence")
                .or_else(|| item.get("confidence_score"))
                .and_then(normalize_confidence)
                .unwrap_or(0.0);
            let rank = item.get("rank").and_then(Value::as_u64);
            Some((rank, NormalizedPrediction::new(disease, confidence, 0)))
        })
        .collect();

    if parsed.is_empty() {
        return None;
    }

    if parsed.iter().all(|(rank, _)| rank.is_some()) {
        parsed.sort_by_key(|(rank, _)| rank.unwrap_or(u64::MAX));
    } else {
        parsed.sort_by(|a, b| {
            b.1.confidence_score
                .partial_cmp(&a.1.confidence_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    Some(parsed.into_iter().map(|(_, p)| p).collect())
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use phytoscan_core::PredictionOrigin;
    use serde_json::json;

    fn normalize(raw: Value) -> NormalizedResponse {
        ResultNormalizer::default().normalize(&raw).unwrap()
    }

    #[test]
    fn confidence_encodings_agree() {
        let fraction = normalize_confidence(&json!(0.4558)).unwrap();
        let percent = normalize_confidence(&json!(45.58)).unwrap();
        let string = normalize_confidence(&json!("45.58%")).unwrap();

        assert!((fraction - 45.58).abs() < 1e-9);
        assert!((percent - 45.58).abs() < 1e-9);
        assert!((string - 45.58).abs() < 1e-9);

        for raw in [json!(0.4558), json!(45.58), json!("45.58%")] {
            let r = normalize(json!({ "predicted_disease": "Anthracnose", "confidence": raw }));
            assert_eq!(r.primary.rounded_confidence(), 46);
        }
    }

    #[test]
    fn confidence_rejects_garbage() {
        assert_eq!(normalize_confidence(&json!("high")), None);
        assert_eq!(normalize_confidence(&json!(null)), None);
        assert_eq!(normalize_confidence(&json!([1, 2])), None);
    }

    #[test]
    fn confidence_clamps_to_percent_range() {
        assert_eq!(normalize_confidence(&json!(250)), Some(100.0));
        assert_eq!(normalize_confidence(&json!(-0.5)), Some(0.0));
        assert_eq!(normalize_confidence(&json!("120%")), Some(100.0));
    }

    #[test]
    fn nested_shape_with_ranked_list() {
        let r = normalize(json!({
            "data": {
                "primary_prediction": { "disease": "Anthracnose", "confidence_score": 85.3 },
                "predictions": [
                    { "disease": "Anthracnose", "confidence": 85.3, "rank": 1 },
                    { "disease": "Die Back", "confidence": 10, "rank": 2 },
                    { "disease": "Healthy", "confidence": 4.7, "rank": 3 }
                ]
            }
        }));

        assert_eq!(r.primary_strategy, "data.primary_prediction");
        assert_eq!(r.primary.disease, "Anthracnose");
        assert!((r.primary.confidence_score - 85.3).abs() < 1e-9);
        assert_eq!(r.candidates.source(), CandidateSource::Reported("data.predictions"));
        let names: Vec<_> = r.candidates.entries().iter().map(|e| e.disease.as_str()).collect();
        assert_eq!(names, ["Anthracnose", "Die Back", "Healthy"]);
    }

    #[test]
    fn source_rank_order_is_preserved() {
        let r = normalize(json!({
            "predicted_disease": "Gall Midge",
            "confidence": 0.5,
            "predictions": [
                { "disease": "Healthy", "confidence": 40, "rank": 3 },
                { "disease": "Gall Midge", "confidence": 50, "rank": 1 },
                { "disease": "Die Back", "confidence": 45, "rank": 2 }
            ]
        }));
        let names: Vec<_> = r.candidates.entries().iter().map(|e| e.disease.as_str()).collect();
        assert_eq!(names, ["Gall Midge", "Die Back", "Healthy"]);
    }

    #[test]
    fn missing_ranks_order_by_confidence() {
        let r = normalize(json!({
            "disease": "Sooty Mould",
            "confidence": "61%",
            "predictions": [
                { "predicted_disease": "Healthy", "confidence": 0.1 },
                { "predicted_disease": "Sooty Mould", "confidence": 0.61 },
                { "predicted_disease": "Die Back", "confidence": 0.2 },
                { "predicted_disease": "Gall Midge", "confidence": 0.05 }
            ]
        }));
        let entries = r.candidates.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].disease, "Sooty Mould");
        assert_eq!(entries[1].disease, "Die Back");
        assert_eq!(entries[2].disease, "Healthy");
        assert_eq!(entries[2].rank, 3);
    }

    #[test]
    fn top_three_predictions_are_read() {
        let r = normalize(json!({
            "success": true,
            "data": {
                "primary_prediction": { "disease": "Stem end Rot", "confidence_score": 72.0 },
                "top_3_predictions": [
                    { "disease": "Stem end Rot", "confidence": 72.0, "rank": 1 },
                    { "disease": "Black Mold Rot", "confidence": 20.0, "rank": 2 }
                ]
            }
        }));
        assert_eq!(
            r.candidates.source(),
            CandidateSource::Reported("data.top_3_predictions")
        );
        assert_eq!(r.candidates.len(), 2);
    }

    #[test]
    fn synthesizes_two_fillers_excluding_primary() {
        let r = normalize(json!({ "predicted_disease": "Powdery Mildew", "confidence": 60 }));

        assert!(r.candidates.is_synthetic());
        let entries = r.candidates.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].origin, PredictionOrigin::Classifier);

        let fillers: Vec<_> = r.candidates.alternatives().collect();
        assert_eq!(fillers.len(), 2);
        assert!(fillers.iter().all(|f| f.is_synthetic()));
        assert!(fillers.iter().all(|f| f.disease != "Powdery Mildew"));
        assert_eq!(fillers[0].disease, "Anthracnose");
        assert_eq!(fillers[1].disease, "Bacterial Canker");
        assert_eq!(fillers[0].confidence_score, 40.0);
        assert_eq!(fillers[1].confidence_score, 30.0);
    }

    #[test]
    fn filler_confidence_has_a_floor() {
        let r = normalize(json!({ "predicted_disease": "Anthracnose", "confidence": 25 }));
        let fillers: Vec<_> = r.candidates.alternatives().collect();
        assert_eq!(fillers[0].disease, "Bacterial Canker");
        assert_eq!(fillers[0].confidence_score, 10.0);
        assert_eq!(fillers[1].confidence_score, 10.0);
    }

    #[test]
    fn zero_primary_confidence_uses_synthesis_base() {
        let r = normalize(json!({ "disease": "Healthy" }));
        assert_eq!(r.primary.confidence_score, 0.0);
        let fillers: Vec<_> = r.candidates.alternatives().collect();
        assert_eq!(fillers[0].confidence_score, 30.0);
        assert_eq!(fillers[1].confidence_score, 20.0);
    }

    #[test]
    fn empty_nested_disease_falls_through_to_flat_fields() {
        let r = normalize(json!({
            "data": { "primary_prediction": { "disease": "", "confidence_score": 90 } },
            "predicted_disease": "Die Back",
            "confidence": 0.7
        }));
        assert_eq!(r.primary_strategy, "flat_fields");
        assert_eq!(r.primary.disease, "Die Back");
        assert_eq!(r.primary.rounded_confidence(), 70);
    }

    #[test]
    fn top_level_primary_prediction_is_accepted() {
        let r = normalize(json!({
            "primary_prediction": { "disease": "Gall Midge", "confidence_score": 0.83 }
        }));
        assert_eq!(r.primary_strategy, "primary_prediction");
        assert_eq!(r.primary.rounded_confidence(), 83);
    }

    #[test]
    fn ranked_list_alone_supplies_primary() {
        let r = normalize(json!({
            "predictions": [
                { "disease": "Die Back", "confidence": 35 },
                { "disease": "Cutting Weevil", "confidence": 55 }
            ]
        }));
        assert_eq!(r.primary_strategy, "ranked_list_head");
        assert_eq!(r.primary.disease, "Cutting Weevil");
    }

    #[test]
    fn empty_candidate_list_triggers_synthesis() {
        let r = normalize(json!({
            "predicted_disease": "Die Back",
            "confidence": 55,
            "predictions": []
        }));
        assert!(r.candidates.is_synthetic());
        assert_eq!(r.candidates.len(), 3);
    }

    #[test]
    fn no_disease_anywhere_is_malformed() {
        let err = ResultNormalizer::default()
            .normalize(&json!({ "data": { "confidence": 0.9 } }))
            .unwrap_err();
        let NormalizeError::MalformedResponse { tried } = err;
        assert!(tried.contains("flat_fields"));
    }

    #[test]
    fn strategies_are_individually_testable() {
        let raw = json!({ "disease": "Healthy", "confidence": 0.5 });
        let flat = PRIMARY_STRATEGIES
            .iter()
            .find(|s| s.name == "flat_fields")
            .unwrap();
        assert_eq!((flat.extract)(&raw), Some(("Healthy".to_string(), 50.0)));
        assert_eq!((PRIMARY_STRATEGIES[0].extract)(&raw), None);
    }
}
