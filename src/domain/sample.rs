// ============================================================
// Layer 3 — GroundingSample Domain Type
// ============================================================
// One annotated example for temporal grounding:
//   - a video, already reduced to one feature vector per clip
//   - a query, already embedded to one vector per token
//   - soft start/end target distributions over the clips
//   - a binary localization mask marking the in-span clips
//
// Feature extraction and token embedding happen upstream; a sample
// only carries fixed-width vectors in temporal / token order.

use serde::{Deserialize, Serialize};

use crate::domain::error::{GroundingError, GroundingResult};
use crate::domain::moment::Moment;

/// A labelled (video, query) pair with distributional boundary targets.
///
/// `start_target`, `end_target` and `localization` have exactly one
/// entry per clip in `video_features`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundingSample {
    /// Identifier kept for traceability in metrics and dumps
    pub id: String,

    /// Per-clip feature vectors, shape [clips][video_dim]
    pub video_features: Vec<Vec<f32>>,

    /// Per-token embedding vectors, shape [tokens][query_dim]
    pub query_tokens: Vec<Vec<f32>>,

    /// Probability that the moment starts at each clip (sums to 1)
    pub start_target: Vec<f32>,

    /// Probability that the moment ends at each clip (sums to 1)
    pub end_target: Vec<f32>,

    /// 1.0 for clips inside the annotated moment, 0.0 elsewhere
    pub localization: Vec<f32>,
}

impl GroundingSample {
    /// Number of valid clips
    pub fn clip_count(&self) -> usize {
        self.video_features.len()
    }

    /// Number of valid query tokens
    pub fn token_count(&self) -> usize {
        self.query_tokens.len()
    }

    /// The annotated moment, if the localization mask marks any clip
    pub fn ground_truth(&self) -> Option<Moment> {
        Moment::from_indicator(&self.localization)
    }

    /// Check the sample against the feature widths a model expects.
    pub fn validate(&self, video_dim: usize, query_dim: usize) -> GroundingResult<()> {
        for (sequence, empty) in [
            ("video clips", self.video_features.is_empty()),
            ("query tokens", self.query_tokens.is_empty()),
        ] {
            if empty {
                return Err(GroundingError::EmptySequence { sample: self.id.clone(), sequence });
            }
        }
        if let Some(row) = self.video_features.iter().find(|r| r.len() != video_dim) {
            return Err(GroundingError::shape("clip feature width", video_dim, row.len()));
        }
        if let Some(row) = self.query_tokens.iter().find(|r| r.len() != query_dim) {
            return Err(GroundingError::shape("token embedding width", query_dim, row.len()));
        }

        let clips = self.clip_count();
        for (what, values) in [
            ("start target", &self.start_target),
            ("end target", &self.end_target),
            ("localization mask", &self.localization),
        ] {
            if values.len() != clips {
                return Err(GroundingError::shape(what, clips, values.len()));
            }
        }

        for (what, values) in [("start target", &self.start_target), ("end target", &self.end_target)] {
            if let Some(v) = values.iter().find(|v| !v.is_finite() || **v < 0.0) {
                return Err(GroundingError::numeric(
                    what,
                    format!("sample '{}' has target value {v}", self.id),
                ));
            }
        }
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> GroundingSample {
        GroundingSample {
            id:             "v1#0".into(),
            video_features: vec![vec![0.1, 0.2]; 4],
            query_tokens:   vec![vec![1.0, 0.0, 0.5]; 3],
            start_target:   vec![0.7, 0.3, 0.0, 0.0],
            end_target:     vec![0.0, 0.0, 0.4, 0.6],
            localization:   vec![1.0, 1.0, 1.0, 0.0],
        }
    }

    #[test]
    fn test_valid_sample_passes() {
        assert!(sample().validate(2, 3).is_ok());
        assert_eq!(sample().ground_truth(), Some(Moment::new(0, 2)));
    }

    #[test]
    fn test_wrong_feature_width_is_shape_mismatch() {
        assert!(matches!(
            sample().validate(5, 3),
            Err(GroundingError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_empty_video_names_the_clips() {
        let mut s = sample();
        s.video_features.clear();
        assert_eq!(
            s.validate(2, 3),
            Err(GroundingError::EmptySequence { sample: "v1#0".into(), sequence: "video clips" })
        );
    }

    #[test]
    fn test_empty_query_names_the_tokens() {
        let mut s = sample();
        s.query_tokens.clear();
        assert_eq!(
            s.validate(2, 3),
            Err(GroundingError::EmptySequence { sample: "v1#0".into(), sequence: "query tokens" })
        );
    }

    #[test]
    fn test_negative_target_is_numeric_instability() {
        let mut s = sample();
        s.end_target[0] = -0.1;
        assert!(matches!(
            s.validate(2, 3),
            Err(GroundingError::NumericInstability { .. })
        ));
    }

    #[test]
    fn test_short_target_is_shape_mismatch() {
        let mut s = sample();
        s.start_target.pop();
        assert!(matches!(s.validate(2, 3), Err(GroundingError::ShapeMismatch { .. })));
    }
}
