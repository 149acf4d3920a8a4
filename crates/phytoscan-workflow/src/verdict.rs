//! User answers and the two transitions that keep them consistent.
//!
//! Invariant at rest: `is_detection_correct == Some(false)` and "some
//! symptom is selected" are never both true. `MarkIncorrect` clears every
//! selection; checking a symptom while the answer is `Some(false)` flips it
//! to `Some(true)`.

use phytoscan_ai::{SymptomSet, SymptomSlot};
use serde::Serialize;

use crate::error::WorkflowError;

/// Answers collected during one verification session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowState {
    pub is_detection_correct: Option<bool>,
    pub location_accuracy_confirmed: Option<bool>,
    pub feedback_text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationEvent {
    MarkCorrect,
    MarkIncorrect,
    SetSymptom { slot: SymptomSlot, checked: bool },
}

impl WorkflowState {
    pub fn apply(
        &mut self,
        symptoms: &mut SymptomSet,
        event: VerificationEvent,
    ) -> Result<(), WorkflowError> {
        match event {
            VerificationEvent::MarkCorrect => self.mark_correct(),
            VerificationEvent::MarkIncorrect => self.mark_incorrect(symptoms),
            VerificationEvent::SetSymptom { slot, checked } => {
                if !symptoms.set(slot, checked) {
                    let unified = match slot {
                        SymptomSlot::Primary(i) => i,
                        SymptomSlot::Alternative(k) => symptoms.primary.len() + k,
                    };
                    return Err(WorkflowError::NoSuchSymptom(unified));
                }
                if checked && self.is_detection_correct == Some(false) {
                    self.is_detection_correct = Some(true);
                }
            }
        }
        Ok(())
    }

    pub fn mark_correct(&mut self) {
        self.is_detection_correct = Some(true);
    }

    /// Answer "incorrect" and clear every selection in both lists.
    pub fn mark_incorrect(&mut self, symptoms: &mut SymptomSet) {
        self.is_detection_correct = Some(false);
        symptoms.clear();
    }

    /// `true` when the mutual-exclusion invariant holds.
    pub fn is_consistent(&self, symptoms: &SymptomSet) -> bool {
        !(self.is_detection_correct == Some(false) && symptoms.any_selected())
    }
}

#[cfg(test)]
mod tests {
    use phytoscan_ai::SymptomList;

    use super::*;

    fn symptoms() -> SymptomSet {
        SymptomSet::new(
            SymptomList::new(vec!["p0".into(), "p1".into()]),
            SymptomList::new(vec!["a0".into(), "a1".into(), "a2".into()]),
        )
    }

    #[test]
    fn checking_symptom_retracts_incorrect_answer() {
        let mut state = WorkflowState::default();
        let mut set = symptoms();
        state.apply(&mut set, VerificationEvent::MarkIncorrect).unwrap();
        state
            .apply(
                &mut set,
                VerificationEvent::SetSymptom {
                    slot: SymptomSlot::Alternative(1),
                    checked: true,
                },
            )
            .unwrap();
        assert_eq!(state.is_detection_correct, Some(true));
        assert!(set.alternative.is_selected(1));
    }

    #[test]
    fn marking_incorrect_clears_both_lists() {
        let mut state = WorkflowState::default();
        let mut set = symptoms();
        set.set(SymptomSlot::Primary(0), true);
        set.set(SymptomSlot::Alternative(2), true);
        state.apply(&mut set, VerificationEvent::MarkIncorrect).unwrap();
        assert_eq!(state.is_detection_correct, Some(false));
        assert!(!set.any_selected());
    }

    #[test]
    fn unchecking_does_not_touch_the_answer() {
        let mut state = WorkflowState::default();
        let mut set = symptoms();
        state
            .apply(
                &mut set,
                VerificationEvent::SetSymptom {
                    slot: SymptomSlot::Primary(0),
                    checked: false,
                },
            )
            .unwrap();
        assert_eq!(state.is_detection_correct, None);
    }

    #[test]
    fn checking_symptom_with_no_answer_leaves_it_unanswered() {
        let mut state = WorkflowState::default();
        let mut set = symptoms();
        state
            .apply(
                &mut set,
                VerificationEvent::SetSymptom {
                    slot: SymptomSlot::Primary(1),
                    checked: true,
                },
            )
            .unwrap();
        assert_eq!(state.is_detection_correct, None);
    }

    #[test]
    fn out_of_range_slot_is_rejected() {
        let mut state = WorkflowState::default();
        let mut set = symptoms();
        let err = state
            .apply(
                &mut set,
                VerificationEvent::SetSymptom {
                    slot: SymptomSlot::Alternative(3),
                    checked: true,
                },
            )
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NoSuchSymptom(5)));
    }

    #[test]
    fn invariant_holds_after_any_event_sequence() {
        let slots = [
            SymptomSlot::Primary(0),
            SymptomSlot::Primary(1),
            SymptomSlot::Alternative(0),
            SymptomSlot::Alternative(2),
        ];
        let mut events = vec![VerificationEvent::MarkCorrect, VerificationEvent::MarkIncorrect];
        for slot in slots {
            for checked in [true, false] {
                events.push(VerificationEvent::SetSymptom { slot, checked });
            }
        }

        // Every ordered triple of events.
        for a in &events {
            for b in &events {
                for c in &events {
                    let mut state = WorkflowState::default();
                    let mut set = symptoms();
                    for event in [a, b, c] {
                        state.apply(&mut set, *event).unwrap();
                        assert!(state.is_consistent(&set), "violated after {a:?}, {b:?}, {c:?}");
                    }
                }
            }
        }
    }
}
