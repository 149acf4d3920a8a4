//! Symptom checklists with parallel selection state.
//!
//! A session shows two lists: primary symptoms (from the displayed disease)
//! and alternative symptoms (from the rank-2 and rank-3 candidates). The UI
//! tracks both as one unified array, primary first. Alternative index `k`
//! is unified index `primary.len() + k`; every translation between the two
//! goes through [`SymptomSet::locate`] and [`SymptomSet::unified_index`].

use phytoscan_core::{DetectionType, PredictionSet};
use serde::Serialize;

use crate::catalog::SymptomCatalog;
use crate::policy::DisplayDisease;

/// Ordered symptom statements with one selection flag per statement.
///
/// `selections.len() == symptoms.len()` always holds; both are only
/// resized together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SymptomList {
    symptoms: Vec<String>,
    selections: Vec<bool>,
}

impl SymptomList {
    /// All statements start unselected.
    pub fn new(symptoms: Vec<String>) -> Self {
        let selections = vec![false; symptoms.len()];
        Self {
            symptoms,
            selections,
        }
    }

    pub fn len(&self) -> usize {
        self.symptoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symptoms.is_empty()
    }

    pub fn symptoms(&self) -> &[String] {
        &self.symptoms
    }

    pub fn selections(&self) -> &[bool] {
        &self.selections
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selections.get(index).copied().unwrap_or(false)
    }

    /// Returns `false` when the index is out of range.
    pub fn set(&mut self, index: usize, checked: bool) -> bool {
        match self.selections.get_mut(index) {
            Some(slot) => {
                *slot = checked;
                true
            }
            None => false,
        }
    }

    pub fn toggle(&mut self, index: usize) -> Option<bool> {
        let slot = self.selections.get_mut(index)?;
        *slot = !*slot;
        Some(*slot)
    }

    pub fn clear(&mut self) {
        self.selections.iter_mut().for_each(|s| *s = false);
    }

    /// Append another list, keeping its selection state.
    pub fn append(&mut self, other: SymptomList) {
        self.symptoms.extend(other.symptoms);
        self.selections.extend(other.selections);
    }

    pub fn selected(&self) -> impl Iterator<Item = &str> {
        self.symptoms
            .iter()
            .zip(&self.selections)
            .filter(|(_, selected)| **selected)
            .map(|(s, _)| s.as_str())
    }

    pub fn selected_count(&self) -> usize {
        self.selections.iter().filter(|s| **s).count()
    }

    pub fn any_selected(&self) -> bool {
        self.selections.iter().any(|s| *s)
    }
}

/// Position of a symptom within one of the two lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymptomSlot {
    Primary(usize),
    Alternative(usize),
}

/// Primary and alternative lists for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SymptomSet {
    pub primary: SymptomList,
    pub alternative: SymptomList,
}

impl SymptomSet {
    pub fn new(primary: SymptomList, alternative: SymptomList) -> Self {
        Self {
            primary,
            alternative,
        }
    }

    /// Length of the unified array.
    pub fn len(&self) -> usize {
        self.primary.len() + self.alternative.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Map a unified index onto the list that owns it.
    pub fn locate(&self, unified: usize) -> Option<SymptomSlot> {
        let offset = self.primary.len();
        if unified < offset {
            Some(SymptomSlot::Primary(unified))
        } else if unified - offset < self.alternative.len() {
            Some(SymptomSlot::Alternative(unified - offset))
        } else {
            None
        }
    }

    /// Inverse of [`locate`](Self::locate).
    pub fn unified_index(&self, slot: SymptomSlot) -> Option<usize> {
        match slot {
            SymptomSlot::Primary(i) if i < self.primary.len() => Some(i),
            SymptomSlot::Alternative(k) if k < self.alternative.len() => {
                Some(self.primary.len() + k)
            }
            _ => None,
        }
    }

    /// Concatenated statements and selections, primary first.
    pub fn unify(&self) -> (Vec<String>, Vec<bool>) {
        let symptoms = self
            .primary
            .symptoms()
            .iter()
            .chain(self.alternative.symptoms())
            .cloned()
            .collect();
        let selections = self
            .primary
            .selections()
            .iter()
            .chain(self.alternative.selections())
            .copied()
            .collect();
        (symptoms, selections)
    }

    pub fn is_selected(&self, slot: SymptomSlot) -> bool {
        match slot {
            SymptomSlot::Primary(i) => self.primary.is_selected(i),
            SymptomSlot::Alternative(k) => self.alternative.is_selected(k),
        }
    }

    /// Returns `false` when the slot does not exist.
    pub fn set(&mut self, slot: SymptomSlot, checked: bool) -> bool {
        match slot {
            SymptomSlot::Primary(i) => self.primary.set(i, checked),
            SymptomSlot::Alternative(k) => self.alternative.set(k, checked),
        }
    }

    pub fn set_unified(&mut self, unified: usize, checked: bool) -> bool {
        match self.locate(unified) {
            Some(slot) => self.set(slot, checked),
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.primary.clear();
        self.alternative.clear();
    }

    pub fn any_selected(&self) -> bool {
        self.primary.any_selected() || self.alternative.any_selected()
    }

    pub fn total_selected(&self) -> usize {
        self.primary.selected_count() + self.alternative.selected_count()
    }

    /// Selected statements in unified order.
    pub fn all_selected(&self) -> Vec<String> {
        self.primary
            .selected()
            .chain(self.alternative.selected())
            .map(str::to_string)
            .collect()
    }
}

/// Derives symptom lists for a session from the catalog.
pub struct SymptomSetBuilder<'a> {
    catalog: &'a SymptomCatalog,
    part: Option<DetectionType>,
}

impl<'a> SymptomSetBuilder<'a> {
    pub fn new(catalog: &'a SymptomCatalog, part: Option<DetectionType>) -> Self {
        Self { catalog, part }
    }

    /// Looks up the displayed label, so `Unknown` yields the generic checklist.
    pub fn build_primary(&self, display: &DisplayDisease) -> SymptomList {
        self.catalog.lookup(display.as_str(), self.part)
    }

    /// Rank 2 then rank 3, concatenated.
    ///
    /// Statements repeated from the primary list are kept as separate
    /// entries with their own selection state.
    pub fn build_alternatives(&self, candidates: &PredictionSet) -> SymptomList {
        let mut list = SymptomList::default();
        for rank in [2, 3] {
            if let Some(entry) = candidates.at_rank(rank) {
                list.append(self.catalog.lookup(&entry.disease, self.part));
            }
        }
        list
    }

    pub fn build(&self, display: &DisplayDisease, candidates: &PredictionSet) -> SymptomSet {
        SymptomSet::new(
            self.build_primary(display),
            self.build_alternatives(candidates),
        )
    }

    /// Generic checklist with no alternatives, used when no detection is available.
    pub fn fallback(&self) -> SymptomSet {
        SymptomSet::new(self.build_primary(&DisplayDisease::Unknown), SymptomList::default())
    }
}
