// ============================================================
// Layer 5 — Encoder Capabilities
// ============================================================
// The pluggable pieces of the query distiller (and the context
// encoder) share three capabilities:
//
//   SequenceEncoder  — [B, L, D] → [B, L, H]   (tail encoders, RNNs)
//   SequenceReducer  — [B, L, H] → [B, H]      (pooling reductions)
//   VectorTransform  — [B, H]    → [B, F]      (head transforms)
//
// Every implementation is resolved once at construction; nothing
// dispatches on a strategy name during a forward pass.

use burn::prelude::*;

use crate::domain::error::GroundingResult;

/// Sequence-to-sequence encoder that respects a validity mask.
pub trait SequenceEncoder<B: Backend> {
    /// Encode `sequence` [batch, steps, d_in]; `mask` is [batch, steps].
    fn encode(&self, sequence: Tensor<B, 3>, mask: Tensor<B, 2>) -> Tensor<B, 3>;

    /// Width of each encoded step
    fn encoded_size(&self) -> usize;
}

/// Sequence-to-vector reduction over valid positions only.
pub trait SequenceReducer<B: Backend> {
    fn reduce(
        &self,
        sequence: Tensor<B, 3>,
        mask:     Tensor<B, 2>,
        lengths:  &[usize],
    ) -> GroundingResult<Tensor<B, 2>>;
}

/// Vector-to-vector transform applied to a pooled representation.
pub trait VectorTransform<B: Backend> {
    fn transform(&self, vector: Tensor<B, 2>) -> Tensor<B, 2>;

    /// Width of the transformed vector
    fn transformed_size(&self) -> usize;
}
