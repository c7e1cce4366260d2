// ============================================================
// Layer 4 — Grounding Batcher
// ============================================================
// Implements Burn's Batcher trait with dynamic padding:
// videos and queries differ in length, so every sequence in a
// mini-batch is right-padded with zeros to the longest one in
// that batch, and the true lengths are recorded alongside.
//
//   Input:  N samples, clips T_i, tokens L_i
//   Output: video [N, max T_i, D_in]   + video_lengths  = [T_i]
//           query [N, max L_i, D_tok]  + query_lengths  = [L_i]
//           targets [N, max T_i] (zero past T_i)
//
// Samples are expected to have passed GroundingSample::validate.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
    tensor::TensorData,
};

use crate::domain::moment::Moment;
use crate::domain::sample::GroundingSample;
use crate::ml::loss::GroundingTargets;
use crate::ml::model::GroundingInput;

// ─── GroundingBatch ───────────────────────────────────────────────────────────
/// A padded mini-batch plus the bookkeeping evaluation needs.
#[derive(Debug, Clone)]
pub struct GroundingBatch<B: Backend> {
    /// Sample ids in batch order
    pub ids: Vec<String>,

    /// Annotated moment per example (None if the mask marks no clip)
    pub ground_truth: Vec<Option<Moment>>,

    /// [batch, max_clips, video_dim]
    pub video_features: Tensor<B, 3>,
    pub video_lengths:  Vec<usize>,

    /// [batch, max_tokens, query_dim]
    pub query_tokens:  Tensor<B, 3>,
    pub query_lengths: Vec<usize>,

    /// Soft boundary targets and in-span indicator, each [batch, max_clips]
    pub start_target: Tensor<B, 2>,
    pub end_target:   Tensor<B, 2>,
    pub localization: Tensor<B, 2>,
}

impl<B: Backend> GroundingBatch<B> {
    /// Split into the model input and the loss targets.
    pub fn into_parts(self) -> (GroundingInput<B>, GroundingTargets<B>) {
        (
            GroundingInput {
                video_features: self.video_features,
                video_lengths:  self.video_lengths,
                query_tokens:   self.query_tokens,
                query_lengths:  self.query_lengths,
            },
            GroundingTargets {
                start:        self.start_target,
                end:          self.end_target,
                localization: self.localization,
            },
        )
    }
}

// ─── GroundingBatcher ─────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct GroundingBatcher<B: Backend> {
    pub device:    B::Device,
    pub video_dim: usize,
    pub query_dim: usize,
}

impl<B: Backend> GroundingBatcher<B> {
    pub fn new(device: B::Device, video_dim: usize, query_dim: usize) -> Self {
        Self { device, video_dim, query_dim }
    }

    fn sequence_tensor(&self, rows: Vec<&[Vec<f32>]>, width: usize) -> Tensor<B, 3> {
        let batch = rows.len();
        let steps = rows.iter().map(|r| r.len()).max().unwrap_or(0);

        let mut flat = vec![0.0f32; batch * steps * width];
        for (b, sequence) in rows.iter().enumerate() {
            for (t, vector) in sequence.iter().enumerate() {
                let offset = (b * steps + t) * width;
                let n = vector.len().min(width);
                flat[offset..offset + n].copy_from_slice(&vector[..n]);
            }
        }
        Tensor::from_data(TensorData::new(flat, [batch, steps, width]), &self.device)
    }

    fn target_tensor(&self, rows: Vec<&[f32]>, steps: usize) -> Tensor<B, 2> {
        let batch = rows.len();
        let mut flat = vec![0.0f32; batch * steps];
        for (b, row) in rows.iter().enumerate() {
            let n = row.len().min(steps);
            flat[b * steps..b * steps + n].copy_from_slice(&row[..n]);
        }
        Tensor::from_data(TensorData::new(flat, [batch, steps]), &self.device)
    }
}

// ─── Burn Batcher Trait Implementation ────────────────────────────────────────
impl<B: Backend> Batcher<GroundingSample, GroundingBatch<B>> for GroundingBatcher<B> {
    fn batch(&self, items: Vec<GroundingSample>) -> GroundingBatch<B> {
        let video_lengths: Vec<usize> = items.iter().map(GroundingSample::clip_count).collect();
        let query_lengths: Vec<usize> = items.iter().map(GroundingSample::token_count).collect();
        let max_clips = video_lengths.iter().copied().max().unwrap_or(0);

        let video_features = self.sequence_tensor(
            items.iter().map(|s| s.video_features.as_slice()).collect(),
            self.video_dim,
        );
        let query_tokens = self.sequence_tensor(
            items.iter().map(|s| s.query_tokens.as_slice()).collect(),
            self.query_dim,
        );

        let start_target = self.target_tensor(items.iter().map(|s| s.start_target.as_slice()).collect(), max_clips);
        let end_target   = self.target_tensor(items.iter().map(|s| s.end_target.as_slice()).collect(), max_clips);
        let localization = self.target_tensor(items.iter().map(|s| s.localization.as_slice()).collect(), max_clips);

        tracing::debug!(
            "Batched {} samples: max_clips={} max_tokens={}",
            items.len(),
            max_clips,
            query_lengths.iter().copied().max().unwrap_or(0),
        );

        GroundingBatch {
            ids:          items.iter().map(|s| s.id.clone()).collect(),
            ground_truth: items.iter().map(GroundingSample::ground_truth).collect(),
            video_features,
            video_lengths,
            query_tokens,
            query_lengths,
            start_target,
            end_target,
            localization,
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn sample(id: &str, clips: usize, tokens: usize) -> GroundingSample {
        let mut start = vec![0.0; clips];
        start[0] = 1.0;
        GroundingSample {
            id:             id.into(),
            video_features: (0..clips).map(|t| vec![t as f32 + 1.0; 2]).collect(),
            query_tokens:   vec![vec![1.0; 3]; tokens],
            start_target:   start.clone(),
            end_target:     start,
            localization:   vec![1.0; clips],
        }
    }

    #[test]
    fn test_pads_to_batch_maximum() {
        let batcher = GroundingBatcher::<TestBackend>::new(Default::default(), 2, 3);
        let batch   = batcher.batch(vec![sample("a", 2, 4), sample("b", 5, 1)]);

        assert_eq!(batch.video_features.dims(), [2, 5, 2]);
        assert_eq!(batch.query_tokens.dims(), [2, 4, 3]);
        assert_eq!(batch.start_target.dims(), [2, 5]);
        assert_eq!(batch.video_lengths, vec![2, 5]);
        assert_eq!(batch.query_lengths, vec![4, 1]);
        assert_eq!(batch.ids, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_padding_is_zero() {
        let batcher = GroundingBatcher::<TestBackend>::new(Default::default(), 2, 3);
        let batch   = batcher.batch(vec![sample("a", 2, 1), sample("b", 3, 1)]);

        let video = batch.video_features.into_data().to_vec::<f32>().unwrap();
        // example 0, clip 1 is real; clip 2 is padding
        assert_eq!(&video[2..4], &[2.0, 2.0]);
        assert_eq!(&video[4..6], &[0.0, 0.0]);

        let loc = batch.localization.into_data().to_vec::<f32>().unwrap();
        assert_eq!(loc, vec![1.0, 1.0, 0.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_into_parts_keeps_lengths() {
        let batcher = GroundingBatcher::<TestBackend>::new(Default::default(), 2, 3);
        let (input, targets) = batcher.batch(vec![sample("a", 3, 2)]).into_parts();
        assert_eq!(input.video_lengths, vec![3]);
        assert_eq!(input.query_lengths, vec![2]);
        assert_eq!(targets.end.dims(), [1, 3]);
    }
}
