// ============================================================
// Layer 4 — Grounding Dataset
// ============================================================
// Wraps validated samples in Burn's Dataset trait so the
// DataLoader can index and batch them.

use burn::data::dataset::Dataset;

use crate::domain::error::GroundingResult;
use crate::domain::sample::GroundingSample;

pub struct GroundingDataset {
    samples: Vec<GroundingSample>,
}

impl GroundingDataset {
    pub fn new(samples: Vec<GroundingSample>) -> Self { Self { samples } }

    /// Build a dataset, rejecting the first sample that does not fit
    /// the given feature widths.
    pub fn validated(
        samples:   Vec<GroundingSample>,
        video_dim: usize,
        query_dim: usize,
    ) -> GroundingResult<Self> {
        for sample in &samples {
            sample.validate(video_dim, query_dim).inspect_err(|e| {
                tracing::warn!("Sample '{}' rejected: {}", sample.id, e);
            })?;
        }
        Ok(Self::new(samples))
    }

    pub fn sample_count(&self) -> usize { self.samples.len() }

    /// Longest video in the dataset, in clips
    pub fn max_clips(&self) -> usize {
        self.samples.iter().map(GroundingSample::clip_count).max().unwrap_or(0)
    }
}

impl Dataset<GroundingSample> for GroundingDataset {
    fn get(&self, index: usize) -> Option<GroundingSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
