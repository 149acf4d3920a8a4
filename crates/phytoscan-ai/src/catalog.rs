//! Static symptom catalog: disease name (+ optional plant part) → ordered
//! symptom statements.
//!
//! Lookup is exact-match and pure. The same input always yields the same
//! ordered output, so selection indices stay stable across re-renders.

use std::collections::HashMap;

use phytoscan_core::DetectionType;

use crate::symptoms::SymptomList;

/// Symptoms keyed by disease name alone.
const DISEASE_SYMPTOMS: &[(&str, &[&str])] = &[
    (
        "Anthracnose",
        &[
            "Dark, sunken spots on fruits",
            "Black or brown lesions on leaves",
            "Spots may have pink or orange spore masses in humid conditions",
            "Premature fruit drop",
        ],
    ),
    (
        "Bacterial Canker",
        &[
            "Wounds or sores on branches or stems",
            "Leaves wilting or drying up",
            "Small branches dying from the tip",
        ],
    ),
    (
        "Cutting Weevil",
        &[
            "Small holes in young shoots and leaves",
            "Wilting of terminal shoots",
            "Presence of small weevil insects",
            "Damage typically at growing tips",
        ],
    ),
    (
        "Die Back",
        &[
            "Progressive death of branches from tips downward",
            "Browning and drying of leaves",
            "Bark cracking or splitting",
            "Reduced fruit production",
        ],
    ),
    (
        "Gall Midge",
        &[
            "Small bumps or galls on leaves",
            "Distorted leaf growth",
            "Presence of tiny flies around the plant",
            "Stunted shoot development",
        ],
    ),
    (
        "Healthy",
        &[
            "Vibrant green leaves",
            "Normal fruit development",
            "No visible spots or lesions",
            "Strong, healthy growth",
        ],
    ),
    (
        "Powdery Mildew",
        &[
            "White, powdery coating on leaves",
            "Yellowing of affected leaves",
            "Distorted or stunted growth",
            "Premature leaf drop",
        ],
    ),
    (
        "Sooty Mould",
        &[
            "Black, sooty coating on leaves and fruits",
            "Reduced photosynthesis",
            "Often associated with insect infestations",
            "Sticky honeydew substance present",
        ],
    ),
];

/// Entries that only apply to one plant part. Checked before the disease table.
const PART_SYMPTOMS: &[(DetectionType, &str, &[&str])] = &[
    (
        DetectionType::Fruit,
        "Anthracnose",
        &[
            "Dark, sunken spots on the fruit skin",
            "Soft, rotten areas on the fruit",
            "Pink or orange spore masses on lesions in humid conditions",
        ],
    ),
    (
        DetectionType::Fruit,
        "Black Mold Rot",
        &[
            "Black mold growing on the fruits",
            "Fruits soft and spoiling quickly",
            "Black, rotten spots on the fruit",
        ],
    ),
    (
        DetectionType::Fruit,
        "Stem end Rot",
        &[
            "Soft or rotten area where the fruit joins the stem",
            "Water-soaked or dark spots at the stem end",
            "Fruits spoiling from the stem side",
        ],
    ),
];

/// Returned for any disease the catalog does not know, including `Unknown`.
pub const GENERIC_SYMPTOMS: &[&str] = &[
    "Look for any unusual discoloration or spots",
    "Check for changes in texture or firmness",
    "Notice any abnormal growth patterns",
    "Consider environmental factors affecting the plant",
];

pub struct SymptomCatalog {
    by_disease: HashMap<&'static str, &'static [&'static str]>,
    by_part: HashMap<(DetectionType, &'static str), &'static [&'static str]>,
}

impl Default for SymptomCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl SymptomCatalog {
    pub fn builtin() -> Self {
        let by_disease = DISEASE_SYMPTOMS.iter().copied().collect();
        let by_part = PART_SYMPTOMS
            .iter()
            .map(|&(part, disease, symptoms)| ((part, disease), symptoms))
            .collect();
        Self {
            by_disease,
            by_part,
        }
    }

    /// Raw statements for a disease. Part-specific entries win; misses fall
    /// back to [`GENERIC_SYMPTOMS`].
    pub fn statements(&self, disease: &str, part: Option<DetectionType>) -> &'static [&'static str] {
        if let Some(part) = part
            && let Some(symptoms) = self.by_part.get(&(part, disease))
        {
            return symptoms;
        }
        self.by_disease
            .get(disease)
            .copied()
            .unwrap_or(GENERIC_SYMPTOMS)
    }

    /// Fresh, all-unselected list for a disease.
    pub fn lookup(&self, disease: &str, part: Option<DetectionType>) -> SymptomList {
        SymptomList::new(
            self.statements(disease, part)
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
    }

    /// Whether the disease has a dedicated entry (for the given part or in general).
    pub fn contains(&self, disease: &str, part: Option<DetectionType>) -> bool {
        part.is_some_and(|p| self.by_part.contains_key(&(p, disease)))
            || self.by_disease.contains_key(disease)
    }

    pub fn diseases(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self
            .by_disease
            .keys()
            .chain(self.by_part.keys().map(|(_, d)| d))
            .copied()
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}
