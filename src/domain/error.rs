// ============================================================
// Layer 3 — Grounding Error Taxonomy
// ============================================================
// Five failure classes cover loading and the forward pipeline:
//
//   EmptySequence      — a stored sample has no clips or no tokens
//   InvalidLength      — a valid length is 0 or exceeds the padded size
//   UnknownStrategy    — a tail / pooling / head name is not registered
//   ShapeMismatch      — a tensor width disagrees with the model config
//   NumericInstability — a loss or target would poison aggregation
//
// Construction-time errors (UnknownStrategy, ShapeMismatch during init)
// abort model building. Per-call errors reject the batch before any
// tensor work starts.

use std::fmt::Debug;

use thiserror::Error;

/// Error type for the grounding pipeline
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GroundingError {
    /// A sample whose video or query holds no vectors at all
    #[error("sample '{sample}' has no {sequence}")]
    EmptySequence {
        /// Identifier of the offending sample
        sample: String,
        /// Which sequence was empty ("video clips" or "query tokens")
        sequence: &'static str,
    },

    /// A sequence length outside `1..=max_len`
    #[error("invalid length {length} for sequence {index} (padded length {max_len})")]
    InvalidLength {
        /// Example index inside the batch
        index: usize,
        /// Offending valid length
        length: usize,
        /// Padded dimension the length was checked against
        max_len: usize,
    },

    /// A strategy name that no registry knows
    #[error("unknown {registry} strategy '{name}'")]
    UnknownStrategy {
        /// Which registry was searched ("tail", "pooling", "head")
        registry: &'static str,
        /// The name that was requested
        name: String,
    },

    /// Tensor or config dimensions that cannot be combined
    #[error("shape mismatch for {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// What was being checked
        what: &'static str,
        /// Expected shape or width
        expected: String,
        /// Observed shape or width
        actual: String,
    },

    /// A value that would turn a loss into NaN or Inf
    #[error("numeric instability in {what}: {detail}")]
    NumericInstability {
        /// Where the problem was detected
        what: &'static str,
        /// Diagnostic detail
        detail: String,
    },
}

impl GroundingError {
    /// Build a `ShapeMismatch` from any two debug-printable shapes
    pub fn shape(what: &'static str, expected: impl Debug, actual: impl Debug) -> Self {
        Self::ShapeMismatch {
            what,
            expected: format!("{expected:?}"),
            actual:   format!("{actual:?}"),
        }
    }

    /// Build a `NumericInstability` diagnostic
    pub fn numeric(what: &'static str, detail: impl Into<String>) -> Self {
        Self::NumericInstability { what, detail: detail.into() }
    }
}

/// Result alias used by the domain, data and ml layers
pub type GroundingResult<T> = Result<T, GroundingError>;

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_helper_formats_both_sides() {
        let err = GroundingError::shape("video features", [2, 4, 8], [2, 4, 7]);
        assert_eq!(
            err.to_string(),
            "shape mismatch for video features: expected [2, 4, 8], got [2, 4, 7]"
        );
    }

    #[test]
    fn test_empty_sequence_names_sample_and_sequence() {
        let err = GroundingError::EmptySequence { sample: "v7#2".into(), sequence: "query tokens" };
        assert_eq!(err.to_string(), "sample 'v7#2' has no query tokens");
    }

    #[test]
    fn test_unknown_strategy_message() {
        let err = GroundingError::UnknownStrategy { registry: "pooling", name: "median".into() };
        assert_eq!(err.to_string(), "unknown pooling strategy 'median'");
    }
}
