//! Diagnostics sink for recoverable problems.
//!
//! Per-detection problems never fail a request. They are reported to a sink
//! passed in by the caller, which decides whether to log, collect or ignore
//! them.

use std::fmt;
use std::sync::Mutex;

use crate::error::MalformedDetection;

/// A recoverable problem absorbed during a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// A raw detection failed normalization and was dropped.
    Rejected {
        index: usize,
        reason: MalformedDetection,
    },

    /// An engine record had the wrong shape and was skipped.
    SkippedRecord { index: usize, detail: String },

    /// Green threshold was below yellow and got clamped down to it.
    ThresholdsClamped { green: f32, yellow: f32 },

    /// No font could be loaded, labels are not drawn.
    FontUnavailable,

    /// A detection could not be drawn on the overlay.
    OverlaySkipped { index: usize, detail: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::Rejected { index, reason } => {
                write!(f, "dropped detection {}: {}", index, reason)
            }
            Warning::SkippedRecord { index, detail } => {
                write!(f, "skipped engine record {}: {}", index, detail)
            }
            Warning::ThresholdsClamped { green, yellow } => write!(
                f,
                "green threshold {:.2} below yellow {:.2}, clamped to {:.2}",
                green, yellow, yellow
            ),
            Warning::FontUnavailable => write!(f, "no font available, labels skipped"),
            Warning::OverlaySkipped { index, detail } => {
                write!(f, "overlay skipped detection {}: {}", index, detail)
            }
        }
    }
}

/// Receives warnings from the pipeline.
pub trait Diagnostics: Send + Sync {
    /// Report a recoverable problem.
    fn warn(&self, warning: Warning);
}

/// Forwards warnings to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn warn(&self, warning: Warning) {
        tracing::warn!("{}", warning);
    }
}

/// Discards all warnings.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDiagnostics;

impl Diagnostics for NullDiagnostics {
    fn warn(&self, _warning: Warning) {}
}

/// Records warnings in memory.
#[derive(Debug, Default)]
pub struct CollectingDiagnostics {
    warnings: Mutex<Vec<Warning>>,
}

impl CollectingDiagnostics {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the warnings recorded so far.
    pub fn warnings(&self) -> Vec<Warning> {
        match self.warnings.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Number of detections dropped during normalization.
    pub fn rejected_count(&self) -> usize {
        self.warnings()
            .iter()
            .filter(|w| matches!(w, Warning::Rejected { .. } | Warning::SkippedRecord { .. }))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings().is_empty()
    }
}

impl Diagnostics for CollectingDiagnostics {
    fn warn(&self, warning: Warning) {
        match self.warnings.lock() {
            Ok(mut guard) => guard.push(warning),
            Err(poisoned) => poisoned.into_inner().push(warning),
        }
    }
}
