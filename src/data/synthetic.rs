// ============================================================
// Layer 4 — Synthetic Sample Source
// ============================================================
// Generates seeded random samples for smoke-testing the full
// pipeline without a feature extractor:
//
//   1. pick a video length T and a query length L
//   2. fill clip features and token embeddings uniformly in [-1, 1]
//   3. pick an annotated moment [s, e] inside the video
//   4. start/end targets: Gaussians centred on s and e,
//      normalised over the T clips
//   5. localization: 1.0 on clips s..=e, 0.0 elsewhere
//
// The same seed always yields the same samples.

use anyhow::{ensure, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::domain::sample::GroundingSample;
use crate::domain::traits::SampleSource;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticConfig {
    pub count:      usize,
    pub video_dim:  usize,
    pub query_dim:  usize,
    pub min_clips:  usize,
    pub max_clips:  usize,
    pub min_tokens: usize,
    pub max_tokens: usize,
    /// Standard deviation of the boundary Gaussians, in clips
    pub sigma: f32,
    pub seed:  u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            count:      32,
            video_dim:  64,
            query_dim:  32,
            min_clips:  8,
            max_clips:  32,
            min_tokens: 3,
            max_tokens: 12,
            sigma:      1.0,
            seed:       42,
        }
    }
}

pub struct SyntheticSource {
    config: SyntheticConfig,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig) -> Self {
        Self { config }
    }

    fn generate(&self, rng: &mut StdRng, index: usize) -> GroundingSample {
        let cfg    = &self.config;
        let clips  = rng.gen_range(cfg.min_clips..=cfg.max_clips);
        let tokens = rng.gen_range(cfg.min_tokens..=cfg.max_tokens);

        let video_features = random_rows(rng, clips, cfg.video_dim);
        let query_tokens   = random_rows(rng, tokens, cfg.query_dim);

        let start = rng.gen_range(0..clips);
        let end   = rng.gen_range(start..clips);

        let localization = (0..clips)
            .map(|t| if (start..=end).contains(&t) { 1.0 } else { 0.0 })
            .collect();

        GroundingSample {
            id:           format!("synthetic-{index:05}"),
            video_features,
            query_tokens,
            start_target: gaussian_target(clips, start, cfg.sigma),
            end_target:   gaussian_target(clips, end, cfg.sigma),
            localization,
        }
    }
}

impl SampleSource for SyntheticSource {
    fn load_all(&self) -> Result<Vec<GroundingSample>> {
        let cfg = &self.config;
        ensure!(cfg.min_clips >= 1 && cfg.min_clips <= cfg.max_clips, "invalid clip range {}..={}", cfg.min_clips, cfg.max_clips);
        ensure!(cfg.min_tokens >= 1 && cfg.min_tokens <= cfg.max_tokens, "invalid token range {}..={}", cfg.min_tokens, cfg.max_tokens);
        ensure!(cfg.video_dim > 0 && cfg.query_dim > 0, "feature widths must be non-zero");
        ensure!(cfg.sigma > 0.0 && cfg.sigma.is_finite(), "sigma must be positive, got {}", cfg.sigma);

        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let samples: Vec<_> = (0..cfg.count).map(|i| self.generate(&mut rng, i)).collect();

        tracing::info!("Generated {} synthetic samples (seed {})", samples.len(), cfg.seed);
        Ok(samples)
    }
}

fn random_rows(rng: &mut StdRng, rows: usize, width: usize) -> Vec<Vec<f32>> {
    (0..rows)
        .map(|_| (0..width).map(|_| rng.gen_range(-1.0f32..1.0)).collect())
        .collect()
}

/// Discretised Gaussian over `clips` positions centred on `centre`, summing to 1.
pub fn gaussian_target(clips: usize, centre: usize, sigma: f32) -> Vec<f32> {
    let weights: Vec<f32> = (0..clips)
        .map(|t| {
            let d = t as f32 - centre as f32;
            (-d * d / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let total: f32 = weights.iter().sum();
    weights.into_iter().map(|w| w / total).collect()
}
