//! CLI presentation: text and json formatters per command.

use crate::analysis::{AnalysisMap, ConclusionReport, FrameAnalysis};
use crate::error::ApiError;
use crate::frame::FrameSample;
use crate::session::RemovalReport;
use serde::Serialize;
use std::fmt::Write;

/// What one extraction run produced
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractionOutcome {
    pub interval: u64,
    pub frames: Vec<FrameSample>,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

/// Analysis results plus the optional conclusion
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub analysis: AnalysisMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<ConclusionReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_error: Option<String>,
}

/// Full `run` result. `analysis` is absent when extraction failed before
/// producing any frame.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub extraction: ExtractionOutcome,
    #[serde(flatten)]
    pub analysis: Option<AnalysisOutcome>,
}

pub fn to_json<T: Serialize>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ApiError::ConfigError(format!("Failed to serialize output: {}", e)))
}

pub fn format_extraction_text(outcome: &ExtractionOutcome) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Extracted {} frame(s) (interval {})",
        outcome.frames.len(),
        outcome.interval
    );
    for frame in &outcome.frames {
        let _ = writeln!(out, "  {}", frame.file_path.display());
    }
    for warning in &outcome.warnings {
        let _ = writeln!(out, "warning: {}", warning);
    }
    if let Some(failure) = &outcome.failure {
        let _ = writeln!(out, "extraction stopped: {}", failure);
    }
    out.trim_end().to_string()
}

pub fn format_frames_text(frames: &[FrameSample]) -> String {
    if frames.is_empty() {
        return "No frames.".to_string();
    }
    frames
        .iter()
        .map(|frame| frame.file_name())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_analysis_text(outcome: &AnalysisOutcome) -> String {
    let mut out = String::new();
    let stats = outcome.analysis.stats();
    let _ = writeln!(
        out,
        "Analysed {} frame(s): {} relevant, {} irrelevant, {} failed",
        stats.frames, stats.relevant, stats.irrelevant, stats.failed
    );

    for entry in outcome.analysis.iter() {
        let _ = writeln!(out);
        match &entry.analysis {
            FrameAnalysis::Irrelevant => {
                let _ = writeln!(out, "{}: not a mining site", entry.frame.file_name());
            }
            FrameAnalysis::Failed { error } => {
                let _ = writeln!(out, "{}: failed ({})", entry.frame.file_name(), error);
            }
            FrameAnalysis::Relevant { categories } => {
                let _ = writeln!(out, "{}:", entry.frame.file_name());
                for (category, observation) in categories {
                    let _ = writeln!(out, "  [{}] {}", category, observation);
                }
            }
        }
    }

    if let Some(report) = &outcome.summary {
        let _ = writeln!(out);
        let _ = writeln!(out, "Conclusion ({}):", report.model);
        let _ = writeln!(out, "{}", report.narrative);
    }
    if let Some(error) = &outcome.summary_error {
        let _ = writeln!(out);
        let _ = writeln!(out, "No conclusion: {}", error);
    }
    out.trim_end().to_string()
}

pub fn format_run_text(outcome: &RunOutcome) -> String {
    match &outcome.analysis {
        Some(analysis) => format!(
            "{}\n\n{}",
            format_extraction_text(&outcome.extraction),
            format_analysis_text(analysis)
        ),
        None => format_extraction_text(&outcome.extraction),
    }
}

pub fn format_removal_text(report: &RemovalReport) -> String {
    let mut out = String::new();
    if !report.removed.is_empty() {
        let _ = writeln!(out, "Removed: {}", report.removed.join(", "));
    }
    if !report.not_found.is_empty() {
        let _ = writeln!(out, "Not found: {}", report.not_found.join(", "));
    }
    for failure in &report.failed {
        let _ = writeln!(out, "Failed: {} ({})", failure.frame, failure.reason);
    }
    if out.is_empty() {
        return "Nothing removed.".to_string();
    }
    out.trim_end().to_string()
}
