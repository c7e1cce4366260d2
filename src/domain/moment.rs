// ============================================================
// Layer 3 — Moment Domain Type
// ============================================================
// A moment is an inclusive clip-index interval [start, end] inside
// one video. Both the ground truth (derived from the localization
// mask) and the decoded prediction are expressed as moments, so
// evaluation reduces to comparing two of them.
//
// Example:
//   Query:  "the person opens the fridge"
//   Video:  16 clips
//   Moment: clips 5 to 8 → Moment { start: 5, end: 8 }

use serde::{Deserialize, Serialize};

/// An inclusive clip interval inside a video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Moment {
    /// Index of the first clip in the moment
    pub start: usize,

    /// Index of the last clip in the moment (inclusive)
    pub end: usize,
}

impl Moment {
    /// Create a moment; the bounds are swapped if given out of order.
    pub fn new(start: usize, end: usize) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self { start: end, end: start }
        }
    }

    /// Number of clips covered by the moment
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// Temporal intersection-over-union with another moment, in [0, 1].
    pub fn iou(&self, other: &Moment) -> f64 {
        let inter_start = self.start.max(other.start);
        let inter_end   = self.end.min(other.end);
        if inter_start > inter_end {
            return 0.0;
        }
        let inter = (inter_end - inter_start + 1) as f64;
        let union = (self.len() + other.len()) as f64 - inter;
        inter / union
    }

    /// Recover the annotated moment from a localization indicator.
    ///
    /// Clips with value > 0.5 are in-span; the moment runs from the first
    /// to the last of them. Returns None when no clip is in-span.
    pub fn from_indicator(indicator: &[f32]) -> Option<Self> {
        let start = indicator.iter().position(|&v| v > 0.5)?;
        let end   = indicator.iter().rposition(|&v| v > 0.5)?;
        Some(Self { start, end })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_moments_have_full_iou() {
        let m = Moment::new(3, 7);
        assert!((m.iou(&m) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_disjoint_moments_have_zero_iou() {
        assert_eq!(Moment::new(0, 2).iou(&Moment::new(3, 5)), 0.0);
    }

    #[test]
    fn test_partial_overlap() {
        // [2,5] ∩ [4,7] = [4,5] → 2 clips; union = 4 + 4 - 2 = 6
        let iou = Moment::new(2, 5).iou(&Moment::new(4, 7));
        assert!((iou - 2.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_new_orders_bounds() {
        assert_eq!(Moment::new(6, 2), Moment { start: 2, end: 6 });
    }

    #[test]
    fn test_from_indicator() {
        let mask = [0.0, 0.0, 1.0, 1.0, 1.0, 0.0];
        assert_eq!(Moment::from_indicator(&mask), Some(Moment::new(2, 4)));
        assert_eq!(Moment::from_indicator(&[0.0, 0.0]), None);
    }
}
