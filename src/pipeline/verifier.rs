//! Content verification
//!
//! Gates the pipeline on structural correctness of the full document and
//! summarises the per-page render checks. Only missing pages or missing boxes
//! are fatal; invisible boxes are surfaced as warnings.

use super::error::{PipelineError, Result};
use super::types::{DocumentInspection, PageGeometry, RenderCheck};

/// Outcome of the full-document check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    pub page_count: usize,
    pub box_count: usize,
    /// Boxes with non-zero rendered width and height
    pub rendered_box_count: usize,
}

impl VerificationReport {
    /// No box occupies any area; suspicious but not fatal
    pub fn nothing_rendered(&self) -> bool {
        self.rendered_box_count == 0
    }
}

/// Check the full document before any per-page work starts
pub fn verify_document(inspection: &DocumentInspection) -> Result<VerificationReport> {
    if inspection.pages.is_empty() {
        return Err(PipelineError::NoPagesFound);
    }
    if inspection.pages.iter().all(|p| p.box_count == 0) {
        return Err(PipelineError::NoBoxesFound);
    }

    let report = VerificationReport {
        page_count: inspection.pages.len(),
        box_count: inspection.total_boxes(),
        rendered_box_count: inspection.rendered_boxes().count(),
    };

    if report.nothing_rendered() {
        tracing::warn!(
            "All {} boxes have zero width or height; continuing anyway",
            report.box_count
        );
        if let Some(first) = inspection.pages.first().and_then(|p| p.boxes.first()) {
            tracing::debug!("First box: {:?}", first);
        }
    } else {
        tracing::info!(
            "{} of {} boxes rendered across {} pages",
            report.rendered_box_count,
            report.box_count,
            report.page_count
        );
    }

    Ok(report)
}

/// Summary of one isolated page's render check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderAssessment {
    pub box_count: usize,
    pub sampled: usize,
    pub rendered: usize,
    pub outside_page: usize,
}

impl RenderAssessment {
    pub fn looks_empty(&self) -> bool {
        self.box_count == 0 || (self.sampled > 0 && self.rendered == 0)
    }
}

/// Evaluate a per-page render check; diagnostic only
pub fn assess_render_check(check: &RenderCheck, geometry: &PageGeometry) -> RenderAssessment {
    RenderAssessment {
        box_count: check.box_count,
        sampled: check.samples.len(),
        rendered: check.samples.iter().filter(|b| b.is_rendered()).count(),
        outside_page: check
            .samples
            .iter()
            .filter(|b| !b.in_viewport || !geometry.contains(b.geometry.x, b.geometry.y))
            .count(),
    }
}

/// Log a per-page assessment at the appropriate level
pub fn report_render_check(index: usize, assessment: &RenderAssessment) {
    if assessment.looks_empty() {
        tracing::warn!(
            "Page {}: render check found {} boxes, {} of {} sampled rendered",
            index + 1,
            assessment.box_count,
            assessment.rendered,
            assessment.sampled
        );
    } else {
        tracing::debug!(
            "Page {}: {} boxes, {}/{} sampled rendered, {} outside page bounds",
            index + 1,
            assessment.box_count,
            assessment.rendered,
            assessment.sampled,
            assessment.outside_page
        );
    }
}
