//! Detection-result interpretation: response normalization, confidence
//! policy, symptom catalogs, and disease advice.

pub mod advice;
pub mod catalog;
pub mod normalizer;
pub mod policy;
pub mod symptoms;

pub use catalog::SymptomCatalog;
pub use normalizer::{NormalizeError, NormalizedResponse, ResultNormalizer, normalize_confidence};
pub use policy::{ConfidencePolicy, ConfidenceTier, DisplayDisease};
pub use symptoms::{SymptomList, SymptomSet, SymptomSetBuilder, SymptomSlot};
