//! Ordered, gated step sequence.
//!
//! Steps are 1-based. `next()` advances only when the current step's gate
//! passes; `previous()` is always allowed above step 1. The final step never
//! advances: leaving it means submitting.

use phytoscan_ai::SymptomSet;
use phytoscan_core::StepKind;
use serde::Serialize;
use tracing::debug;

use crate::error::WorkflowError;
use crate::verdict::WorkflowState;

/// Everything a gate may look at.
#[derive(Clone, Copy)]
pub struct GateContext<'a> {
    pub state: &'a WorkflowState,
    pub symptoms: &'a SymptomSet,
    /// The classification call has produced a result, failed, or timed out.
    pub detection_settled: bool,
}

/// Why `kind` cannot be left yet, or `None` if it can.
pub fn blocker(kind: StepKind, ctx: &GateContext<'_>) -> Option<&'static str> {
    match kind {
        StepKind::Analysis if !ctx.detection_settled => Some("Waiting for the image analysis"),
        StepKind::Verify | StepKind::VerifySymptoms if ctx.state.is_detection_correct.is_none() => {
            Some("Please verify if the detection result is correct")
        }
        StepKind::VerifySymptoms
            if ctx.state.is_detection_correct == Some(true) && !ctx.symptoms.any_selected() =>
        {
            Some("Please select at least one symptom you observe")
        }
        StepKind::Location if ctx.state.location_accuracy_confirmed.is_none() => {
            Some("Please confirm the location accuracy")
        }
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepInfo {
    pub step_number: usize,
    pub kind: StepKind,
    pub title: &'static str,
    pub description: &'static str,
    pub is_complete: bool,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepMachine {
    steps: Vec<StepKind>,
    current: usize,
}

impl StepMachine {
    /// An empty list is replaced by a single confirm step.
    pub fn new(steps: Vec<StepKind>) -> Self {
        let steps = if steps.is_empty() {
            vec![StepKind::Confirm]
        } else {
            steps
        };
        Self { steps, current: 1 }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn current_kind(&self) -> StepKind {
        self.steps[self.current - 1]
    }

    pub fn steps(&self) -> &[StepKind] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn is_final(&self) -> bool {
        self.current == self.steps.len()
    }

    pub fn can_proceed(&self, ctx: &GateContext<'_>) -> bool {
        blocker(self.current_kind(), ctx).is_none()
    }

    /// Blocker messages for the current step.
    pub fn blockers(&self, ctx: &GateContext<'_>) -> Vec<&'static str> {
        blocker(self.current_kind(), ctx).into_iter().collect()
    }

    /// Advance one step if the gate passes. On the final step this only
    /// checks the gate.
    pub fn next(&mut self, ctx: &GateContext<'_>) -> Result<StepKind, WorkflowError> {
        let kind = self.current_kind();
        if let Some(reason) = blocker(kind, ctx) {
            return Err(WorkflowError::StepBlocked {
                step: kind,
                reason: reason.to_string(),
            });
        }
        if !self.is_final() {
            self.current += 1;
            debug!(from = ?kind, to = ?self.current_kind(), step = self.current, "step advanced");
        }
        Ok(self.current_kind())
    }

    /// Step back; returns `false` on the first step.
    pub fn previous(&mut self) -> bool {
        if self.current > 1 {
            self.current -= 1;
            debug!(to = ?self.current_kind(), step = self.current, "step back");
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.current = 1;
    }

    pub fn overview(&self) -> Vec<StepInfo> {
        self.steps
            .iter()
            .enumerate()
            .map(|(i, kind)| {
                let step_number = i + 1;
                StepInfo {
                    step_number,
                    kind: *kind,
                    title: kind.title(),
                    description: kind.description(),
                    is_complete: self.current > step_number,
                    is_active: self.current == step_number,
                }
            })
            .collect()
    }

    pub fn progress_percentage(&self) -> u32 {
        ((self.current as f64 / self.steps.len() as f64) * 100.0).round() as u32
    }
}

#[cfg(test)]
mod tests {
    use phytoscan_ai::{SymptomList, SymptomSlot};

    use super::*;

    fn symptoms() -> SymptomSet {
        SymptomSet::new(
            SymptomList::new(vec!["p0".into()]),
            SymptomList::new(vec!["a0".into()]),
        )
    }

    fn ctx<'a>(state: &'a WorkflowState, symptoms: &'a SymptomSet) -> GateContext<'a> {
        GateContext {
            state,
            symptoms,
            detection_settled: true,
        }
    }

    fn default_steps() -> StepMachine {
        StepMachine::new(vec![
            StepKind::VerifySymptoms,
            StepKind::Location,
            StepKind::Comments,
            StepKind::Confirm,
        ])
    }

    #[test]
    fn verify_blocks_when_correct_without_symptoms() {
        let mut machine = default_steps();
        let state = WorkflowState {
            is_detection_correct: Some(true),
            ..Default::default()
        };
        let set = symptoms();
        let err = machine.next(&ctx(&state, &set)).unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::StepBlocked {
                step: StepKind::VerifySymptoms,
                ..
            }
        ));
        assert_eq!(machine.current(), 1);
    }

    #[test]
    fn verify_passes_with_alternative_symptom_only() {
        let mut machine = default_steps();
        let state = WorkflowState {
            is_detection_correct: Some(true),
            ..Default::default()
        };
        let mut set = symptoms();
        set.set(SymptomSlot::Alternative(0), true);
        assert_eq!(machine.next(&ctx(&state, &set)).unwrap(), StepKind::Location);
    }

    #[test]
    fn verify_passes_when_incorrect_regardless_of_symptoms() {
        let mut machine = default_steps();
        let state = WorkflowState {
            is_detection_correct: Some(false),
            ..Default::default()
        };
        let set = symptoms();
        assert!(machine.next(&ctx(&state, &set)).is_ok());
    }

    #[test]
    fn unanswered_verify_blocks() {
        let machine = default_steps();
        let state = WorkflowState::default();
        let set = symptoms();
        assert_eq!(
            machine.blockers(&ctx(&state, &set)),
            vec!["Please verify if the detection result is correct"]
        );
    }

    #[test]
    fn location_needs_an_answer() {
        let mut machine = default_steps();
        let mut state = WorkflowState {
            is_detection_correct: Some(false),
            ..Default::default()
        };
        let set = symptoms();
        machine.next(&ctx(&state, &set)).unwrap();
        assert!(!machine.can_proceed(&ctx(&state, &set)));

        state.location_accuracy_confirmed = Some(false);
        assert_eq!(machine.next(&ctx(&state, &set)).unwrap(), StepKind::Comments);
        assert_eq!(machine.next(&ctx(&state, &set)).unwrap(), StepKind::Confirm);
        assert!(machine.is_final());
        // Final step stays put.
        assert_eq!(machine.next(&ctx(&state, &set)).unwrap(), StepKind::Confirm);
        assert_eq!(machine.current(), 4);
    }

    #[test]
    fn plain_verify_needs_no_symptoms() {
        let mut machine = StepMachine::new(vec![StepKind::Verify, StepKind::Symptoms]);
        let state = WorkflowState {
            is_detection_correct: Some(true),
            ..Default::default()
        };
        let set = symptoms();
        assert!(machine.next(&ctx(&state, &set)).is_ok());
    }

    #[test]
    fn analysis_waits_for_detection() {
        let mut machine = StepMachine::new(vec![StepKind::Analysis, StepKind::Verify]);
        let state = WorkflowState::default();
        let set = symptoms();
        let pending = GateContext {
            detection_settled: false,
            ..ctx(&state, &set)
        };
        assert!(machine.next(&pending).is_err());
        assert!(machine.next(&ctx(&state, &set)).is_ok());
    }

    #[test]
    fn previous_stops_at_first_step() {
        let mut machine = default_steps();
        assert!(!machine.previous());
        let state = WorkflowState {
            is_detection_correct: Some(false),
            ..Default::default()
        };
        let set = symptoms();
        machine.next(&ctx(&state, &set)).unwrap();
        assert!(machine.previous());
        assert_eq!(machine.current(), 1);
    }

    #[test]
    fn overview_and_progress_track_current_step() {
        let mut machine = default_steps();
        assert_eq!(machine.progress_percentage(), 25);
        let state = WorkflowState {
            is_detection_correct: Some(false),
            ..Default::default()
        };
        let set = symptoms();
        machine.next(&ctx(&state, &set)).unwrap();
        let overview = machine.overview();
        assert!(overview[0].is_complete);
        assert!(overview[1].is_active);
        assert!(!overview[2].is_complete && !overview[2].is_active);
        assert_eq!(machine.progress_percentage(), 50);
    }

    #[test]
    fn step_count_is_not_fixed() {
        let machine = StepMachine::new(vec![StepKind::Verify, StepKind::Confirm]);
        assert_eq!(machine.len(), 2);
        assert_eq!(StepMachine::new(vec![]).current_kind(), StepKind::Confirm);
    }
}
