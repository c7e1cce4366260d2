// ============================================================
// Layer 5 — Moment Decoder
// ============================================================
// The boundary predictor emits independent start and end
// distributions. Turning them into one moment means searching
// for the pair (s, e) with s ≤ e that maximises
// start[s] · end[e], bounded by a maximum span width.

use burn::prelude::*;

use crate::domain::error::{GroundingError, GroundingResult};
use crate::domain::moment::Moment;

/// Default upper bound on the decoded span width, in clips
pub const DEFAULT_MAX_SPAN: usize = 64;

/// Best moment for one example and its joint boundary score.
///
/// Only the first `length` clips are considered. Returns None when
/// `length` or `max_span` is zero.
pub fn decode_moment(start: &[f32], end: &[f32], length: usize, max_span: usize) -> Option<(Moment, f32)> {
    let length = length.min(start.len()).min(end.len());
    if length == 0 || max_span == 0 {
        return None;
    }

    let mut best_score = f32::NEG_INFINITY;
    let mut best_start = 0;
    let mut best_end   = 0;

    for s in 0..length {
        for e in s..s.saturating_add(max_span).min(length) {
            let score = start[s] * end[e];
            if score > best_score {
                best_score = score;
                best_start = s;
                best_end   = e;
            }
        }
    }

    Some((Moment::new(best_start, best_end), best_score))
}

/// Decode every example in a batch of [batch, clips] distributions.
pub fn decode_batch<B: Backend>(
    pred_start: Tensor<B, 2>,
    pred_end:   Tensor<B, 2>,
    lengths:    &[usize],
    max_span:   usize,
) -> GroundingResult<Vec<Option<(Moment, f32)>>> {
    let [batch, clips] = pred_start.dims();
    if pred_end.dims() != [batch, clips] {
        return Err(GroundingError::shape("end distribution", [batch, clips], pred_end.dims()));
    }
    if lengths.len() != batch {
        return Err(GroundingError::shape("video lengths", batch, lengths.len()));
    }

    let start = to_host(pred_start, "start distribution")?;
    let end   = to_host(pred_end, "end distribution")?;

    Ok(lengths
        .iter()
        .enumerate()
        .map(|(b, &len)| {
            let row = b * clips..(b + 1) * clips;
            decode_moment(&start[row.clone()], &end[row], len, max_span)
        })
        .collect())
}

fn to_host<B: Backend>(tensor: Tensor<B, 2>, what: &'static str) -> GroundingResult<Vec<f32>> {
    tensor
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| GroundingError::numeric(what, format!("{e:?}")))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::TensorData;

    type TestBackend = NdArray;

    #[test]
    fn test_picks_highest_joint_score() {
        let start = [0.1, 0.6, 0.2, 0.1];
        let end   = [0.1, 0.1, 0.2, 0.6];
        let (moment, score) = decode_moment(&start, &end, 4, 10).unwrap();
        assert_eq!(moment, Moment::new(1, 3));
        assert!((score - 0.36).abs() < 1e-6);
    }

    #[test]
    fn test_end_never_precedes_start() {
        // the largest end mass sits before the largest start mass
        let start = [0.05, 0.05, 0.1, 0.8];
        let end   = [0.7, 0.1, 0.1, 0.1];
        let (moment, _) = decode_moment(&start, &end, 4, 10).unwrap();
        assert!(moment.start <= moment.end);
        assert_eq!(moment, Moment::new(3, 3));
    }

    #[test]
    fn test_max_span_limits_width() {
        let start = [0.9, 0.02, 0.02, 0.02, 0.04];
        let end   = [0.02, 0.02, 0.02, 0.04, 0.9];
        let (moment, _) = decode_moment(&start, &end, 5, 2).unwrap();
        assert!(moment.len() <= 2);
    }

    #[test]
    fn test_unbounded_max_span_covers_whole_sequence() {
        let start = [0.9, 0.02, 0.02, 0.02, 0.04];
        let end   = [0.02, 0.02, 0.02, 0.04, 0.9];
        let (moment, _) = decode_moment(&start, &end, 5, usize::MAX).unwrap();
        assert_eq!(moment, Moment::new(0, 4));
    }

    #[test]
    fn test_padding_is_ignored() {
        let start = [0.5, 0.5, 0.0, 0.0, 9.0];
        let end   = [0.5, 0.5, 0.0, 0.0, 9.0];
        let (moment, _) = decode_moment(&start, &end, 2, 10).unwrap();
        assert!(moment.end < 2);
    }

    #[test]
    fn test_empty_inputs_decode_to_none() {
        assert!(decode_moment(&[0.5, 0.5], &[0.5, 0.5], 0, 10).is_none());
        assert!(decode_moment(&[0.5, 0.5], &[0.5, 0.5], 2, 0).is_none());
    }

    #[test]
    fn test_decode_batch_respects_lengths() {
        let device = Default::default();
        let start  = Tensor::<TestBackend, 2>::from_data(
            TensorData::new(vec![0.7f32, 0.3, 0.0, 0.1, 0.1, 0.8], [2, 3]),
            &device,
        );
        let end = Tensor::<TestBackend, 2>::from_data(
            TensorData::new(vec![0.2f32, 0.8, 0.0, 0.1, 0.1, 0.8], [2, 3]),
            &device,
        );
        let decoded = decode_batch(start, end, &[2, 3], 10).unwrap();
        assert_eq!(decoded[0].map(|(m, _)| m), Some(Moment::new(0, 1)));
        assert_eq!(decoded[1].map(|(m, _)| m), Some(Moment::new(2, 2)));
    }

    #[test]
    fn test_decode_batch_length_count_mismatch() {
        let device = Default::default();
        let start  = Tensor::<TestBackend, 2>::ones([2, 3], &device);
        let end    = Tensor::<TestBackend, 2>::ones([2, 3], &device);
        assert!(matches!(
            decode_batch(start, end, &[3], 10),
            Err(GroundingError::ShapeMismatch { .. })
        ));
    }
}
