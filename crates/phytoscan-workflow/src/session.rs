//! One verification session: detection, answers, symptom lists, step
//! position, best-effort location, and the submission guard.
//!
//! A session owns all of its state exclusively. Every user action goes
//! through `&mut self`, so at most one classification and one submission
//! can be outstanding.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use phytoscan_ai::{
    ConfidencePolicy, ConfidenceTier, DisplayDisease, NormalizedResponse, ResultNormalizer,
    SymptomCatalog, SymptomSet, SymptomSetBuilder, SymptomSlot,
};
use phytoscan_core::{
    DetectionType, LocationData, NormalizedPrediction, PredictionSet, StepKind, WorkflowConfig,
};
use phytoscan_sync::{ClassificationRequest, Classifier, ClientError, LocationProvider};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::detection::{DetectionOutcome, DetectionTask};
use crate::error::WorkflowError;
use crate::location::LocationTask;
use crate::result::{FinalResult, ResultStatus};
use crate::steps::{GateContext, StepInfo, StepMachine};
use crate::submission::{SubmissionAssembler, SubmissionInput, VerifiedSubmission};
use crate::verdict::{VerificationEvent, WorkflowState};

/// Where the classification call stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectionStatus {
    Pending,
    Ready,
    /// The call failed; the user may retry.
    Failed { message: String },
    /// The response carried no primary disease.
    NoDetectionData,
    /// No response within the fail-open timeout. The call keeps running
    /// and a late result replaces this status.
    TimedOut,
}

impl DetectionStatus {
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// A normalized detection with its policy decisions applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub primary: NormalizedPrediction,
    pub candidates: PredictionSet,
    pub display: DisplayDisease,
    pub tier: ConfidenceTier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionPhase {
    Idle,
    InFlight,
    Done,
}

/// Session-side audit entry with timestamp.
#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub event: &'static str,
    pub detail: String,
    pub timestamp: DateTime<Utc>,
}

pub struct WorkflowSession {
    config: WorkflowConfig,
    detection_type: DetectionType,
    normalizer: ResultNormalizer,
    policy: ConfidencePolicy,
    catalog: SymptomCatalog,
    image: Vec<u8>,
    status: DetectionStatus,
    detection: Option<Detection>,
    symptoms: SymptomSet,
    state: WorkflowState,
    steps: StepMachine,
    pending: Option<DetectionTask>,
    location: Option<LocationTask>,
    phase: SubmissionPhase,
    final_result: Option<FinalResult>,
    audit: Vec<AuditRecord>,
}

impl WorkflowSession {
    pub fn new(config: WorkflowConfig, detection_type: DetectionType) -> Self {
        let steps = StepMachine::new(config.steps.clone());
        Self {
            normalizer: ResultNormalizer::from_config(&config),
            policy: ConfidencePolicy::from_config(&config),
            catalog: SymptomCatalog::builtin(),
            config,
            detection_type,
            image: Vec::new(),
            status: DetectionStatus::Pending,
            detection: None,
            symptoms: SymptomSet::default(),
            state: WorkflowState::default(),
            steps,
            pending: None,
            location: None,
            phase: SubmissionPhase::Idle,
            final_result: None,
            audit: Vec::new(),
        }
    }

    fn record(&mut self, event: &'static str, detail: impl Into<String>) {
        self.audit.push(AuditRecord {
            event,
            detail: detail.into(),
            timestamp: Utc::now(),
        });
    }

    fn builder(&self) -> SymptomSetBuilder<'_> {
        SymptomSetBuilder::new(&self.catalog, Some(self.detection_type))
    }

    // ── Detection ──

    /// Run the preview classification, failing open after the configured
    /// timeout. Never returns an error; failures become a status with the
    /// generic symptom checklist.
    ///
    /// A call that misses the deadline keeps running. Its result is merged
    /// by [`refresh_detection`](Self::refresh_detection) or before a
    /// submission is assembled.
    pub async fn load_detection(
        &mut self,
        classifier: Arc<dyn Classifier>,
        image: Vec<u8>,
    ) -> &DetectionStatus {
        self.pending = None;
        self.image = image;
        let request = ClassificationRequest::preview(self.image.clone(), self.detection_type);
        let timeout = self.config.fail_open_timeout();

        let mut task = DetectionTask::spawn(classifier, request);
        match task.wait(timeout).await {
            Some(outcome) => self.settle(outcome),
            None => {
                warn!(timeout_ms = timeout.as_millis() as u64, "classification timed out; failing open");
                self.settle_without_detection(DetectionStatus::TimedOut);
                self.pending = Some(task);
            }
        }
        &self.status
    }

    /// Merge a classification that finished after the fail-open deadline.
    /// Never waits. Late results are ignored once a submission has started.
    pub fn refresh_detection(&mut self) -> &DetectionStatus {
        if self.phase != SubmissionPhase::Idle {
            return &self.status;
        }
        if let Some(outcome) = self.pending.as_mut().and_then(DetectionTask::poll_ready) {
            self.pending = None;
            info!("merging classification that arrived after the deadline");
            self.record("detection", "late result");
            self.settle(outcome);
        }
        &self.status
    }

    /// Wait up to `limit` for a classification still running past the
    /// fail-open deadline.
    pub async fn await_detection(&mut self, limit: Duration) -> &DetectionStatus {
        if self.phase != SubmissionPhase::Idle {
            return &self.status;
        }
        let outcome = match self.pending.as_mut() {
            Some(task) => task.wait(limit).await,
            None => None,
        };
        if let Some(outcome) = outcome {
            self.pending = None;
            self.record("detection", "late result");
            self.settle(outcome);
        }
        &self.status
    }

    /// Whether a classification is still running past the deadline.
    pub fn detection_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(DetectionTask::is_pending)
    }

    fn settle(&mut self, outcome: DetectionOutcome) {
        match outcome {
            DetectionOutcome::Response(raw) => {
                self.ingest_response(&raw);
            }
            DetectionOutcome::Failed(e) => {
                warn!(error = %e, "classification failed");
                self.settle_without_detection(DetectionStatus::Failed {
                    message: e.user_message(),
                });
            }
            DetectionOutcome::Lost(_) => {
                self.settle_without_detection(DetectionStatus::Failed {
                    message: "Unable to analyze the image. Please try again.".into(),
                });
            }
        }
    }

    /// Apply a raw classification response.
    pub fn ingest_response(&mut self, raw: &Value) -> &DetectionStatus {
        match self.normalizer.normalize(raw) {
            Ok(normalized) => self.accept(normalized),
            Err(e) => {
                warn!(error = %e, "no primary prediction in response");
                self.settle_without_detection(DetectionStatus::NoDetectionData);
            }
        }
        &self.status
    }

    fn accept(&mut self, normalized: NormalizedResponse) {
        let NormalizedResponse {
            primary,
            candidates,
            ..
        } = normalized;
        let shown = self
            .policy
            .apply_threshold(&primary.disease, primary.confidence_score);
        let tier = self.policy.tier(primary.confidence_score);
        self.symptoms = self.builder().build(&shown, &candidates);

        info!(
            disease = %primary.disease,
            shown = %shown,
            confidence = primary.confidence_score,
            tier = %tier,
            candidates = candidates.len(),
            synthetic = candidates.is_synthetic(),
            "detection ready"
        );
        self.record(
            "detection",
            format!("{} ({:.1}%) shown as {shown}", primary.disease, primary.confidence_score),
        );
        self.detection = Some(Detection {
            primary,
            candidates,
            display: shown,
            tier,
        });
        self.status = DetectionStatus::Ready;
    }

    fn settle_without_detection(&mut self, status: DetectionStatus) {
        self.detection = None;
        self.symptoms = self.builder().fallback();
        self.record("detection", format!("{status:?}"));
        self.status = status;
    }

    pub fn status(&self) -> &DetectionStatus {
        &self.status
    }

    pub fn detection(&self) -> Option<&Detection> {
        self.detection.as_ref()
    }

    pub fn display_disease(&self) -> DisplayDisease {
        self.detection
            .as_ref()
            .map_or(DisplayDisease::Unknown, |d| d.display.clone())
    }

    pub fn confidence(&self) -> f64 {
        self.detection
            .as_ref()
            .map_or(0.0, |d| d.primary.confidence_score)
    }

    pub fn detection_type(&self) -> DetectionType {
        self.detection_type
    }

    pub fn policy(&self) -> &ConfidencePolicy {
        &self.policy
    }

    // ── Answers ──

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn symptoms(&self) -> &SymptomSet {
        &self.symptoms
    }

    pub fn apply(&mut self, event: VerificationEvent) -> Result<(), WorkflowError> {
        self.state.apply(&mut self.symptoms, event)?;
        debug!(?event, answer = ?self.state.is_detection_correct, selected = self.symptoms.total_selected(), "verification event");
        Ok(())
    }

    pub fn mark_correct(&mut self) {
        self.state.mark_correct();
        debug!("detection marked correct");
    }

    pub fn mark_incorrect(&mut self) {
        self.state.mark_incorrect(&mut self.symptoms);
        debug!("detection marked incorrect; selections cleared");
    }

    pub fn set_symptom(&mut self, slot: SymptomSlot, checked: bool) -> Result<(), WorkflowError> {
        self.apply(VerificationEvent::SetSymptom { slot, checked })
    }

    /// Set a symptom by its index in the unified (primary then alternative) array.
    pub fn set_unified_symptom(&mut self, unified: usize, checked: bool) -> Result<(), WorkflowError> {
        let slot = self
            .symptoms
            .locate(unified)
            .ok_or(WorkflowError::NoSuchSymptom(unified))?;
        self.set_symptom(slot, checked)
    }

    pub fn set_location_confirmed(&mut self, confirmed: bool) {
        self.state.location_accuracy_confirmed = Some(confirmed);
    }

    pub fn set_feedback(&mut self, text: impl Into<String>) {
        self.state.feedback_text = text.into();
    }

    // ── Steps ──

    fn gate(&self) -> GateContext<'_> {
        GateContext {
            state: &self.state,
            symptoms: &self.symptoms,
            detection_settled: self.status.is_settled(),
        }
    }

    pub fn current_step(&self) -> usize {
        self.steps.current()
    }

    pub fn current_step_kind(&self) -> StepKind {
        self.steps.current_kind()
    }

    pub fn is_final_step(&self) -> bool {
        self.steps.is_final()
    }

    pub fn can_proceed(&self) -> bool {
        self.steps.can_proceed(&self.gate())
    }

    pub fn blockers(&self) -> Vec<&'static str> {
        self.steps.blockers(&self.gate())
    }

    pub fn next(&mut self) -> Result<StepKind, WorkflowError> {
        let gate = GateContext {
            state: &self.state,
            symptoms: &self.symptoms,
            detection_settled: self.status.is_settled(),
        };
        self.steps.next(&gate)
    }

    pub fn previous(&mut self) -> bool {
        self.steps.previous()
    }

    pub fn overview(&self) -> Vec<StepInfo> {
        self.steps.overview()
    }

    pub fn progress_percentage(&self) -> u32 {
        self.steps.progress_percentage()
    }

    // ── Location ──

    /// Start a background lookup. Replaces (and aborts) any earlier one.
    pub fn start_location(&mut self, provider: Arc<dyn LocationProvider>) {
        self.location = Some(LocationTask::spawn(provider));
    }

    /// The location if it has already resolved. Never waits.
    pub fn location(&mut self) -> Option<LocationData> {
        self.location
            .as_mut()
            .and_then(|task| task.poll_ready().cloned())
    }

    // ── Submission ──

    pub fn phase(&self) -> SubmissionPhase {
        self.phase
    }

    /// Build the payload and mark the submission in flight.
    ///
    /// A second call while in flight fails with `AlreadyInFlight` and
    /// changes nothing.
    pub fn begin_submission(&mut self) -> Result<VerifiedSubmission, WorkflowError> {
        match self.phase {
            SubmissionPhase::InFlight => return Err(WorkflowError::AlreadyInFlight),
            SubmissionPhase::Done => return Err(WorkflowError::AlreadySubmitted),
            SubmissionPhase::Idle => {}
        }
        self.refresh_detection();
        if !self.status.is_settled() {
            return Err(WorkflowError::DetectionUnavailable);
        }
        if !self.steps.is_final() {
            return Err(WorkflowError::NotAtFinalStep);
        }
        let kind = self.steps.current_kind();
        if let Some(reason) = crate::steps::blocker(kind, &self.gate()) {
            return Err(WorkflowError::StepBlocked {
                step: kind,
                reason: reason.to_string(),
            });
        }

        let location = self.location();
        let display = self.display_disease();
        let empty = PredictionSet::empty();
        let candidates = self.detection.as_ref().map_or(&empty, |d| &d.candidates);
        let submission = SubmissionAssembler::new(self.config.requires_location_confirmation())
            .assemble(SubmissionInput {
                state: &self.state,
                symptoms: &self.symptoms,
                candidates,
                detected: &display,
                confidence: self.confidence(),
                location,
            })?;

        info!(
            disease = %submission.detected_disease,
            correct = submission.is_detection_correct,
            total_available = submission.summary.total_available,
            total_selected = submission.summary.total_selected,
            primary_selected = submission.summary.primary_selected,
            alternative_selected = submission.summary.alternative_selected,
            with_location = submission.location_data.is_some(),
            "submission assembled"
        );
        self.phase = SubmissionPhase::InFlight;
        self.record("submission", "in flight");
        Ok(submission)
    }

    /// Settle an in-flight submission. Failures return the session to idle
    /// so the user can retry.
    pub fn finish_submission(
        &mut self,
        submission: &VerifiedSubmission,
        outcome: Result<Value, ClientError>,
    ) -> Result<&FinalResult, WorkflowError> {
        match outcome {
            Ok(raw) => {
                let mut result = FinalResult::from_response(&raw, &self.normalizer, &self.policy);
                if result.status == ResultStatus::NoDetectionData {
                    result = FinalResult::from_submission(submission, &self.policy);
                }
                self.phase = SubmissionPhase::Done;
                self.record("submission", format!("done: {}", result.main_disease));
                Ok(self.final_result.insert(result))
            }
            Err(e) => {
                warn!(error = %e, "submission failed");
                self.phase = SubmissionPhase::Idle;
                self.record("submission", format!("failed: {e}"));
                Err(WorkflowError::Network(e))
            }
        }
    }

    /// Assemble, send, and settle the submission.
    pub async fn confirm(&mut self, classifier: &dyn Classifier) -> Result<&FinalResult, WorkflowError> {
        let submission = self.begin_submission()?;
        let request = submission.to_request(self.image.clone(), self.detection_type);
        let outcome = classifier.submit(&request).await;
        self.finish_submission(&submission, outcome)
    }

    pub fn final_result(&self) -> Option<&FinalResult> {
        self.final_result.as_ref()
    }

    /// The result to show right now: the persisted one if submitted,
    /// otherwise one derived from the current detection.
    pub fn shown_result(&self) -> FinalResult {
        if let Some(result) = &self.final_result {
            return result.clone();
        }
        match (&self.status, &self.detection) {
            (DetectionStatus::Ready, Some(d)) => {
                FinalResult::from_prediction(&d.primary, &d.candidates, &self.policy)
            }
            (DetectionStatus::Failed { message }, _) => FinalResult::prediction_failed(message.clone()),
            _ => FinalResult::no_detection_data(),
        }
    }

    // ── Lifecycle ──

    pub fn audit(&self) -> &[AuditRecord] {
        &self.audit
    }

    /// Clear answers, selections, step position, and any result. The
    /// detection and symptom lists are kept. Refused while a submission is
    /// in flight.
    pub fn reset(&mut self) -> Result<(), WorkflowError> {
        if self.phase == SubmissionPhase::InFlight {
            return Err(WorkflowError::AlreadyInFlight);
        }
        self.state = WorkflowState::default();
        self.symptoms.clear();
        self.steps.reset();
        self.phase = SubmissionPhase::Idle;
        self.final_result = None;
        self.record("session", "reset");
        debug!("session reset");
        Ok(())
    }

    /// Discard the session. Any running location lookup is aborted and
    /// nothing is persisted.
    pub fn abandon(mut self) {
        if let Some(task) = self.location.as_mut() {
            task.abort();
        }
        if let Some(task) = self.pending.as_mut() {
            task.abort();
        }
        info!(step = self.steps.current(), "session abandoned");
    }
}
