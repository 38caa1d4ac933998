//! Non-fatal compatibility advisories.
//!
//! A device that cannot honour part of a register description falls back to
//! a defined behaviour instead of failing. Each fallback is logged once via
//! `tracing` and kept on the compiled artifact so callers can inspect it.

use std::fmt;

use qlower_ir::GridType;
use serde::Serialize;
use tracing::warn;

/// A device-compatibility advisory.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CompatibilityWarning {
    /// The requested grid type is unavailable; the device default was used.
    UnsupportedGridType {
        /// Device name.
        device: String,
        /// Grid type in the model.
        requested: GridType,
        /// Grid type actually used.
        fallback: GridType,
    },

    /// The grid scale lies outside the device range and was clamped.
    GridScaleOutOfRange {
        /// Device name.
        device: String,
        /// Scale in the model.
        requested: f64,
        /// Scale actually used.
        applied: f64,
        /// Accepted `(min, max)` range.
        range: (f64, f64),
    },

    /// A directive the device does not support.
    UnsupportedDirective {
        /// Device name.
        device: String,
        /// Directive name.
        directive: String,
        /// Expected behaviour on this device.
        consequence: String,
    },
}

impl CompatibilityWarning {
    /// Log the warning and append it to `sink`.
    pub fn emit(self, sink: &mut Vec<CompatibilityWarning>) {
        warn!("{}", self);
        sink.push(self);
    }
}

impl fmt::Display for CompatibilityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompatibilityWarning::UnsupportedGridType {
                device,
                requested,
                fallback,
            } => write!(
                f,
                "{device} does not support the '{requested}' grid type; using '{fallback}'"
            ),
            CompatibilityWarning::GridScaleOutOfRange {
                device,
                requested,
                applied,
                range,
            } => write!(
                f,
                "{device} accepts grid scales in [{}, {}]; scale {requested} was clamped to {applied}",
                range.0, range.1
            ),
            CompatibilityWarning::UnsupportedDirective {
                device,
                directive,
                consequence,
            } => write!(
                f,
                "{device} does not support the '{directive}' directive: {consequence}"
            ),
        }
    }
}
