//! Bounding-box cache: measures rendered content and publishes the extents.
//!
//! DESIGN
//! ======
//! After parts are appended, one deferred pass is scheduled so the host has
//! time to mount and parse the content. A pass snapshots the unmeasured parts
//! under the scene lock, measures them lock-free, then patches the results
//! back. Passes repeat on a fixed delay until every part has a box or the
//! retry limit runs out.
//!
//! ERROR HANDLING
//! ==============
//! A part that fails to measure keeps its current box and the pass moves on;
//! one bad payload never blocks the rest. Failures are logged, not surfaced.
//! A box identical to the stored one is not re-patched, so observers only
//! hear about real changes.

#[cfg(test)]
#[path = "bbox_test.rs"]
mod bbox_test;

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::engine::Scene;
use crate::error::ErrorCode;
use crate::store::{BoundingBox, Content, PartId, PartPatch, PartStore};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum MeasureError {
    #[error("content could not be parsed: {0}")]
    Parse(String),
    #[error("content has no measurable geometry")]
    Empty,
}

impl ErrorCode for MeasureError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Parse(_) => "E_MEASURE_PARSE",
            Self::Empty => "E_MEASURE_EMPTY",
        }
    }
}

/// Measures the local-space extents of rendered content.
///
/// Implemented by the rendering host; [`SvgMeasurer`] covers plain SVG markup.
pub trait ContentMeasurer: Send + Sync {
    /// Measure `content`.
    ///
    /// # Errors
    ///
    /// Returns a [`MeasureError`] when the content is unparseable or has no extents yet.
    fn measure(&self, content: &Content) -> Result<BoundingBox, MeasureError>;
}

/// Measures SVG markup by parsing it with `usvg`.
///
/// The result is the root group's object bounding box (fill geometry, no
/// stroke) in the document's user space.
#[derive(Debug, Clone, Copy, Default)]
pub struct SvgMeasurer;

impl ContentMeasurer for SvgMeasurer {
    fn measure(&self, content: &Content) -> Result<BoundingBox, MeasureError> {
        let opts = usvg::Options::default();
        let tree = usvg::Tree::from_str(&content.svg, &opts).map_err(|e| MeasureError::Parse(e.to_string()))?;
        let root = tree.root();
        if !root.has_children() {
            return Err(MeasureError::Empty);
        }
        let rect = root.bounding_box();
        let bbox = BoundingBox {
            x: f64::from(rect.x()),
            y: f64::from(rect.y()),
            width: f64::from(rect.width()),
            height: f64::from(rect.height()),
        };
        if !bbox.is_finite() || bbox.width < 0.0 || bbox.height < 0.0 {
            return Err(MeasureError::Empty);
        }
        Ok(bbox)
    }
}

/// Outcome of one measurement pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeasureReport {
    /// Parts whose box was patched with a new measurement.
    pub measured: usize,
    /// Parts that measured to the box they already had.
    pub unchanged: usize,
    /// Parts whose measurement failed.
    pub failed: usize,
    /// Parts still unmeasured after the pass.
    pub pending: usize,
}

impl MeasureReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.pending == 0
    }
}

// =============================================================================
// PASS
// =============================================================================

/// Parts whose box is still the unmeasured placeholder, with their content.
#[must_use]
pub fn unmeasured(store: &PartStore) -> Vec<(PartId, Content)> {
    store
        .parts()
        .iter()
        .filter(|p| p.bounding_box.is_unmeasured())
        .map(|p| (p.id, p.content.clone()))
        .collect()
}

/// Measure every pending part. Runs without touching the store.
#[must_use]
pub fn measure_all(
    measurer: &dyn ContentMeasurer,
    pending: &[(PartId, Content)],
) -> Vec<(PartId, Result<BoundingBox, MeasureError>)> {
    pending
        .iter()
        .map(|(id, content)| (*id, measurer.measure(content)))
        .collect()
}

/// Patch measured boxes into the store and summarize the pass.
pub fn apply(store: &mut PartStore, results: Vec<(PartId, Result<BoundingBox, MeasureError>)>) -> MeasureReport {
    let mut report = MeasureReport::default();
    for (id, result) in results {
        match result {
            Ok(bbox) => {
                // EDGE: the part may have been replaced by a keyframe load mid-pass.
                let Some(part) = store.get(&id) else {
                    continue;
                };
                if part.bounding_box == bbox {
                    report.unchanged += 1;
                } else if store.patch(&id, &PartPatch::bounding_box(bbox)) {
                    report.measured += 1;
                }
            }
            Err(e) => {
                warn!(part_id = %id, error = %e, code = e.error_code(), "part measurement failed");
                report.failed += 1;
            }
        }
    }
    report.pending = store.parts().iter().filter(|p| p.bounding_box.is_unmeasured()).count();
    report
}

// =============================================================================
// SCHEDULING
// =============================================================================

/// Deferred measurement loop for `scene`, meant to be spawned.
///
/// Sleeps `delay` before each pass and stops once nothing is pending or after
/// `retries` passes. Resolves to the last pass's report, which still counts
/// parts that failed or stayed pending.
pub async fn measure_passes(scene: Scene, delay: Duration, retries: usize) -> MeasureReport {
    let passes = retries.max(1);
    let mut report = MeasureReport::default();
    for attempt in 1..=passes {
        tokio::time::sleep(delay).await;
        report = scene.measure_now();
        if report.is_complete() {
            debug!(attempt, measured = report.measured, "measurement complete");
            return report;
        }
        debug!(attempt, pending = report.pending, failed = report.failed, "measurement incomplete");
    }
    info!(passes, pending = report.pending, "measurement retries exhausted; leaving parts unmeasured");
    report
}
