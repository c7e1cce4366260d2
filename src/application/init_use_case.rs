// ============================================================
// Layer 2 — InitUseCase
// ============================================================
// Builds a fresh grounding model and writes it as a checkpoint:
//
//   Step 1: Seed the backend RNG       (reproducible weights)
//   Step 2: Build the model            (Layer 5 - ml)
//   Step 3: Save config + weights      (Layer 6 - infra)
//
// Training happens outside this crate; the saved checkpoint is
// what `evaluate` loads.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use burn::prelude::*;

use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::GroundingModelConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitConfig {
    pub checkpoint_dir: PathBuf,
    pub model:          GroundingModelConfig,
    /// Backend RNG seed for parameter initialisation
    pub seed:           Option<u64>,
}

pub struct InitUseCase {
    config: InitConfig,
}

impl InitUseCase {
    pub fn new(config: InitConfig) -> Self {
        Self { config }
    }

    pub fn execute<B: Backend>(&self, device: &B::Device) -> Result<()> {
        let cfg = &self.config;

        // ── Step 1: Seed ──────────────────────────────────────────────────────
        if let Some(seed) = cfg.seed {
            B::seed(seed);
        }

        // ── Step 2: Build the model ───────────────────────────────────────────
        // Strategy names and widths are checked here; a bad config fails
        // before anything is written.
        let model = cfg.model.init::<B>(device)?;
        tracing::info!(
            "Model ready: tail={} pooling={} head={} D_f={} hidden={}x{}",
            cfg.model.tail_model,
            cfg.model.pooling,
            cfg.model.head_model,
            cfg.model.filter_size,
            cfg.model.num_layers,
            cfg.model.hidden_size,
        );

        // ── Step 3: Persist ───────────────────────────────────────────────────
        let ckpt = CheckpointManager::new(&cfg.checkpoint_dir)?;
        ckpt.save_config(&cfg.model)?;
        ckpt.save_model(&model)?;
        tracing::info!("Checkpoint written to '{}'", cfg.checkpoint_dir.display());

        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    #[test]
    fn test_writes_config_and_weights() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = InitConfig {
            checkpoint_dir: dir.path().join("ckpt"),
            model: GroundingModelConfig::new(4, 3).with_filter_size(4).with_hidden_size(2),
            seed: Some(7),
        };
        InitUseCase::new(cfg.clone()).execute::<NdArray>(&Default::default()).unwrap();

        let ckpt = CheckpointManager::new(&cfg.checkpoint_dir).unwrap();
        assert_eq!(ckpt.load_config().unwrap().filter_size, 4);
        assert!(ckpt.restore::<NdArray>(&Default::default()).is_ok());
    }

    #[test]
    fn test_unknown_strategy_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = InitConfig {
            checkpoint_dir: dir.path().join("ckpt"),
            model: GroundingModelConfig::new(4, 3).with_pooling("median".into()),
            seed: None,
        };
        let err = InitUseCase::new(cfg.clone()).execute::<NdArray>(&Default::default()).unwrap_err();
        assert!(err.to_string().contains("median"));
        assert!(!cfg.checkpoint_dir.exists());
    }
}
