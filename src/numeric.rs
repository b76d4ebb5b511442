//! Numeric sanitization.
//!
//! Values that leave the encoder or evaluator are always finite and inside
//! their documented range. A non-finite intermediate is replaced by the
//! range's neutral value and recorded as a [`Diagnostic`]; it never becomes
//! an error and never reaches a caller as NaN or infinity.

use serde::Serialize;
use tracing::warn;

/// Record of one sanitized value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    /// Name of the field or factor that produced the value.
    pub field: &'static str,
    /// Value that was substituted.
    pub replacement: f64,
}

/// Clamps `value` into `[lo, hi]`, substituting `neutral` for a non-finite
/// value and appending a diagnostic.
pub fn sanitize(
    value: f64,
    lo: f64,
    hi: f64,
    neutral: f64,
    field: &'static str,
    diagnostics: &mut Vec<Diagnostic>,
) -> f64 {
    if value.is_finite() {
        return value.clamp(lo, hi);
    }
    warn!(field, replacement = neutral, "non-finite value sanitized");
    diagnostics.push(Diagnostic {
        field,
        replacement: neutral,
    });
    neutral
}

/// `num / den` clamped to [0, 1]; a zero denominator yields `neutral`.
pub fn unit_ratio(
    num: f64,
    den: f64,
    neutral: f64,
    field: &'static str,
    diagnostics: &mut Vec<Diagnostic>,
) -> f64 {
    sanitize(num / den, 0.0, 1.0, neutral, field, diagnostics)
}

/// Share of `a` in `a + b`, or 0.5 when both are zero.
///
/// An empty total is an ordinary even position, not a degenerate value, so
/// it does not produce a diagnostic.
pub fn share(a: f64, b: f64, field: &'static str, diagnostics: &mut Vec<Diagnostic>) -> f64 {
    if a == 0.0 && b == 0.0 {
        return 0.5;
    }
    sanitize(a / (a + b), 0.0, 1.0, 0.5, field, diagnostics)
}
