//! Vertical card display for detections, symptom checklists, and results.

use phytoscan_ai::policy::{format_confidence, format_rounded_confidence};
use phytoscan_ai::{SymptomList, SymptomSet};
use phytoscan_core::CandidateSource;
use phytoscan_workflow::{DetectionStatus, FinalResult, ResultStatus, StepInfo, WorkflowSession};

const MAX_LIST_ITEMS: usize = 10;

// ── Public API ──

/// Print the detection a session is verifying, with its symptom checklist.
pub fn print_detection_card(session: &WorkflowSession) {
    let display = session.display_disease();
    println!("=== {} ===", display);
    println!();

    println!("Detection");
    print_field("plant part", session.detection_type());
    print_field("status", status_label(session.status()));
    if let Some(detection) = session.detection() {
        print_field("actual", &detection.primary.disease);
        print_field("confidence", confidence_label(detection.primary.confidence_score));
        print_field("tier", detection.tier);
        let source = match detection.candidates.source() {
            CandidateSource::Reported(strategy) => format!("reported ({strategy})"),
            CandidateSource::Synthesized => "synthesized".into(),
        };
        print_field("candidates", source);
        for p in detection.candidates.entries() {
            let marker = if p.is_synthetic() { " (filler)" } else { "" };
            println!(
                "    #{} {} {:.1}%{}",
                p.rank, p.disease, p.confidence_score, marker
            );
        }
    }
    println!();

    print_symptoms(session.symptoms());
}

/// Print both symptom lists with their unified indices.
pub fn print_symptoms(set: &SymptomSet) {
    print_symptom_list("Primary symptoms", &set.primary, 0);
    print_symptom_list("Alternative symptoms", &set.alternative, set.primary.len());
}

pub fn print_steps(steps: &[StepInfo], progress: u32) {
    println!("Steps ({progress}%)");
    for line in step_lines(steps) {
        println!("  {line}");
    }
    println!();
}

/// Print a persisted (or locally shown) result as a card.
pub fn print_result_card(result: &FinalResult) {
    println!("=== {} ===", result.main_disease);
    println!();

    println!("Result");
    print_field("status", result_status_label(&result.status));
    if let ResultStatus::PredictionFailed { error } = &result.status {
        print_field("error", error);
    }
    if let Some(actual) = result
        .actual_disease
        .as_deref()
        .filter(|a| *a != result.main_disease)
    {
        print_field("model label", actual);
    }
    if result.is_detected() {
        print_field("confidence", format!("{:.1}%", result.confidence));
    }
    if let Some(tier) = result.tier {
        print_field("tier", tier);
    }
    if let Some(id) = result.saved_image_id {
        print_field("saved image", id);
    }
    println!();

    if !result.top.is_empty() {
        println!("Top predictions");
        for row in &result.top {
            let label = if row.label == row.actual {
                row.label.clone()
            } else {
                format!("{} ({})", row.label, row.actual)
            };
            println!("  #{} {:<30} {}", row.rank, label, row.confidence_formatted);
        }
        println!();
    }

    println!("About");
    print_wrapped(&result.disease_info);
    println!();
    println!("Treatment");
    print_wrapped(&result.treatment);
}

// ── Rendering helpers ──

fn print_field(label: &str, value: impl std::fmt::Display) {
    println!("  {:<26} {}", label, value);
}

fn print_symptom_list(header: &str, list: &SymptomList, offset: usize) {
    if list.is_empty() {
        return;
    }
    println!("{header}");
    for line in symptom_lines(list, offset) {
        println!("  {line}");
    }
    println!();
}

fn print_wrapped(text: &str) {
    for line in text.lines() {
        println!("  {}", line.trim());
    }
}

fn symptom_lines(list: &SymptomList, offset: usize) -> Vec<String> {
    let mut lines: Vec<String> = list
        .symptoms()
        .iter()
        .zip(list.selections())
        .enumerate()
        .take(MAX_LIST_ITEMS)
        .map(|(i, (text, selected))| {
            let mark = if *selected { "x" } else { " " };
            format!("[{mark}] {:>2}. {text}", offset + i)
        })
        .collect();
    if list.len() > MAX_LIST_ITEMS {
        lines.push(format!("... and {} more", list.len() - MAX_LIST_ITEMS));
    }
    lines
}

fn step_lines(steps: &[StepInfo]) -> Vec<String> {
    steps
        .iter()
        .map(|s| {
            let mark = if s.is_active {
                ">"
            } else if s.is_complete {
                "✓"
            } else {
                " "
            };
            format!("{mark} {}. {:<22} {}", s.step_number, s.title, s.description)
        })
        .collect()
}

/// One-decimal value with the whole percent the threshold is checked against.
fn confidence_label(confidence: f64) -> String {
    format!(
        "{} (threshold value {})",
        format_confidence(confidence),
        format_rounded_confidence(confidence)
    )
}

fn status_label(status: &DetectionStatus) -> String {
    match status {
        DetectionStatus::Pending => "pending".into(),
        DetectionStatus::Ready => "ready".into(),
        DetectionStatus::Failed { message } => format!("failed: {message}"),
        DetectionStatus::NoDetectionData => "no detection data".into(),
        DetectionStatus::TimedOut => "timed out (continuing without results until it arrives)".into(),
    }
}

fn result_status_label(status: &ResultStatus) -> &'static str {
    match status {
        ResultStatus::Detected => "detected",
        ResultStatus::PredictionFailed { .. } => "prediction failed",
        ResultStatus::NoDetectionData => "no detection data",
    }
}
