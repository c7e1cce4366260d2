// ============================================================
// Layer 5 — Masked Normalizer
// ============================================================
// Softmax restricted to valid positions. Used for the attention
// distribution and for both boundary distributions.
//
// Two masking strategies are kept because they round differently
// near the mask boundary:
//
//   Multiply — softmax((x - max_valid) · m) · m, renormalised by (Σ + 1e-13)
//   Fill     — softmax(x with invalid positions set to -1e32)
//
// Multiply shifts each row by its largest valid score first, so the
// zeroed padding never dominates rows whose valid scores are all very
// negative. The shift leaves the softmax over the valid set unchanged.
//
// Either way, 1e-13 is added to EVERY output afterwards, including
// invalid positions, so a later log() never sees an exact zero.
// Valid positions therefore sum to 1 + N·1e-13 (up to rounding).

use burn::prelude::*;
use burn::tensor::activation::softmax;

/// Floor added to every normalised probability
pub const PROBABILITY_FLOOR: f32 = 1e-13;

/// Epsilon added to the renormalising denominator
pub const DENOMINATOR_EPSILON: f32 = 1e-13;

/// Score written into invalid positions by the `Fill` strategy
pub const MASK_FILL_VALUE: f32 = -1e32;

/// How invalid positions are removed before normalisation.
#[derive(Config, Debug, Copy, PartialEq, Eq)]
pub enum MaskingStrategy {
    /// Zero the scores, softmax, zero again, renormalise.
    Multiply,
    /// Replace invalid scores with a large negative value, then softmax.
    Fill,
}

/// Softmax over one axis that ignores masked-out positions.
#[derive(Debug, Clone, Copy)]
pub struct MaskedNormalizer {
    strategy: MaskingStrategy,
}

impl MaskedNormalizer {
    pub fn new(strategy: MaskingStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> MaskingStrategy {
        self.strategy
    }

    /// Normalise `scores` along `dim`.
    ///
    /// `mask` holds 1.0 for valid and 0.0 for invalid positions and has the
    /// same shape as `scores`. Without a mask this is a plain softmax plus
    /// the floor.
    pub fn normalize<B: Backend, const D: usize>(
        &self,
        scores: Tensor<B, D>,
        mask:   Option<Tensor<B, D>>,
        dim:    usize,
    ) -> Tensor<B, D> {
        let result = match mask {
            None => softmax(scores, dim),
            Some(mask) => match self.strategy {
                MaskingStrategy::Multiply => {
                    // -1e32 on padding so the row max only sees valid scores
                    let penalty = mask.clone().sub_scalar(1.0).mul_scalar(-MASK_FILL_VALUE);
                    let shift   = (scores.clone() + penalty).max_dim(dim);
                    let scores  = scores - shift;
                    let result  = softmax(scores * mask.clone(), dim) * mask;
                    let total   = result.clone().sum_dim(dim).add_scalar(DENOMINATOR_EPSILON);
                    result / total
                }
                MaskingStrategy::Fill => {
                    let invalid = mask.equal_elem(0.0);
                    softmax(scores.mask_fill(invalid, MASK_FILL_VALUE), dim)
                }
            },
        };
        result.add_scalar(PROBABILITY_FLOOR)
    }
}

impl Default for MaskedNormalizer {
    fn default() -> Self {
        Self::new(MaskingStrategy::Multiply)
    }
}
