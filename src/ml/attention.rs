// ============================================================
// Layer 5 — Query-Conditioned Clip Attention
// ============================================================
// Scores every clip against the distilled query filter:
//
//   score[b, t] = ⟨clip[b, t, :], filter[b, :]⟩ / √query_len[b]
//   attention   = masked_softmax(score, video_mask)
//
// The dot product is a batched matrix-vector product
// ([B, T, D] × [B, D, 1] → [B, T, 1]); there is no T × T matrix.

use burn::prelude::*;
use burn::tensor::TensorData;

use crate::domain::error::{GroundingError, GroundingResult};
use crate::ml::mask::validate_lengths;
use crate::ml::normalizer::MaskedNormalizer;

#[derive(Debug, Clone, Copy, Default)]
pub struct AttentionScorer {
    normalizer: MaskedNormalizer,
}

impl AttentionScorer {
    pub fn new(normalizer: MaskedNormalizer) -> Self {
        Self { normalizer }
    }

    /// Raw clip-vs-filter relevance, scaled by 1/√query_len. [batch, clips]
    pub fn raw_scores<B: Backend>(
        &self,
        clips:         Tensor<B, 3>,
        filter:        Tensor<B, 2>,
        query_lengths: &[usize],
    ) -> GroundingResult<Tensor<B, 2>> {
        let [batch, steps, width] = clips.dims();
        let [filter_batch, filter_width] = filter.dims();
        if filter_batch != batch || filter_width != width {
            return Err(GroundingError::shape("query filter", [batch, width], [filter_batch, filter_width]));
        }
        if query_lengths.len() != batch {
            return Err(GroundingError::shape("query lengths", batch, query_lengths.len()));
        }
        validate_lengths(query_lengths, usize::MAX)?;

        let device = clips.device();
        let scores = clips.matmul(filter.unsqueeze_dim::<3>(2)).reshape([batch, steps]);

        let scale: Vec<f32> = query_lengths.iter().map(|&len| 1.0 / (len as f32).sqrt()).collect();
        let scale = Tensor::<B, 2>::from_data(TensorData::new(scale, [batch, 1]), &device);

        Ok(scores * scale)
    }

    /// Attention distribution over clips. [batch, clips]
    pub fn attend<B: Backend>(
        &self,
        clips:         Tensor<B, 3>,
        filter:        Tensor<B, 2>,
        video_mask:    Tensor<B, 2>,
        query_lengths: &[usize],
    ) -> GroundingResult<Tensor<B, 2>> {
        let scores = self.raw_scores(clips, filter, query_lengths)?;
        if scores.dims() != video_mask.dims() {
            return Err(GroundingError::shape("video mask", scores.dims(), video_mask.dims()));
        }
        Ok(self.normalizer.normalize(scores, Some(video_mask), 1))
    }
}
