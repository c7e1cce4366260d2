// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores a grounding model using Burn's CompactRecorder.
//
// What gets saved per checkpoint:
//   1. Model weights (model.mpk) — all learned parameters
//   2. model_config.json         — architecture + strategy names
//
// The config is needed first: the model has to be rebuilt with
// the same widths and strategies before weights can be loaded
// into it.
//
// Layout:
//   checkpoints/
//     model.mpk            ← weights
//     model_config.json    ← GroundingModelConfig
//     metrics.csv          ← written by MetricsLogger
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};

use crate::ml::model::{GroundingModel, GroundingModelConfig};

const WEIGHTS_FILE: &str = "model";
const CONFIG_FILE:  &str = "model_config.json";

/// Manages saving and loading of model checkpoints.
/// All files are stored in the configured directory.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create a manager rooted at `dir`, creating it if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    /// Save model weights to {dir}/model.mpk.
    pub fn save_model<B: Backend>(&self, model: &GroundingModel<B>) -> Result<()> {
        let path = self.dir.join(WEIGHTS_FILE);

        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        tracing::debug!("Saved model weights to '{}'", path.display());
        Ok(())
    }

    /// Load saved weights into a model of the same architecture.
    pub fn load_model<B: Backend>(
        &self,
        model:  GroundingModel<B>,
        device: &B::Device,
    ) -> Result<GroundingModel<B>> {
        let path = self.dir.join(WEIGHTS_FILE);

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}'. Have you run 'init' first?", path.display())
            })?;

        Ok(model.load_record(record))
    }

    pub fn save_config(&self, cfg: &GroundingModelConfig) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)?;

        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved model config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<GroundingModelConfig> {
        let path = self.dir.join(CONFIG_FILE);

        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. Make sure you have run 'init' first.",
                path.display()
            )
        })?;

        serde_json::from_str(&json)
            .with_context(|| format!("Cannot parse model config '{}'", path.display()))
    }

    /// Rebuild the model from the saved config and restore its weights.
    pub fn restore<B: Backend>(&self, device: &B::Device) -> Result<(GroundingModelConfig, GroundingModel<B>)> {
        let cfg   = self.load_config()?;
        let model = cfg.init::<B>(device)?;
        let model = self.load_model(model, device)?;
        tracing::info!(
            "Model restored from '{}' (D_in={}, D_tok={}, D_f={})",
            self.dir.display(),
            cfg.video_input_size,
            cfg.query_input_size,
            cfg.filter_size,
        );
        Ok((cfg, model))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::TensorData;

    use crate::ml::model::GroundingInput;
    use crate::ml::normalizer::MaskingStrategy;

    type TestBackend = NdArray;

    fn config() -> GroundingModelConfig {
        GroundingModelConfig::new(4, 3)
            .with_filter_size(4)
            .with_hidden_size(3)
            .with_tail_model("gru".into())
            .with_tail_hidden_size(2)
            .with_pooling("max".into())
            .with_head_hidden_size(5)
            .with_masking(MaskingStrategy::Fill)
    }

    fn input() -> GroundingInput<TestBackend> {
        let device = Default::default();
        let video: Vec<f32> = (0..2 * 5 * 4).map(|i| (i as f32 * 0.3).cos()).collect();
        let query: Vec<f32> = (0..2 * 2 * 3).map(|i| (i as f32 * 0.7).sin()).collect();
        GroundingInput {
            video_features: Tensor::from_data(TensorData::new(video, [2, 5, 4]), &device),
            video_lengths:  vec![5, 3],
            query_tokens:   Tensor::from_data(TensorData::new(query, [2, 2, 3]), &device),
            query_lengths:  vec![2, 1],
        }
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = CheckpointManager::new(dir.path()).unwrap();
        mgr.save_config(&config()).unwrap();

        let loaded = mgr.load_config().unwrap();
        assert_eq!(loaded.tail_model, "gru");
        assert_eq!(loaded.pooling, "max");
        assert_eq!(loaded.masking, MaskingStrategy::Fill);
        assert_eq!(loaded.head_hidden_size, 5);
    }

    #[test]
    fn test_restored_model_reproduces_predictions() {
        let dir    = tempfile::tempdir().unwrap();
        let mgr    = CheckpointManager::new(dir.path().join("ckpt")).unwrap();
        let device = Default::default();

        let model = config().init::<TestBackend>(&device).unwrap();
        mgr.save_config(&config()).unwrap();
        mgr.save_model(&model).unwrap();
        assert!(dir.path().join("ckpt").join(CONFIG_FILE).is_file());

        let (_, restored) = mgr.restore::<TestBackend>(&device).unwrap();

        let a = model.forward(input()).unwrap().pred_start.into_data().to_vec::<f32>().unwrap();
        let b = restored.forward(input()).unwrap().pred_start.into_data().to_vec::<f32>().unwrap();
        for (x, y) in a.iter().zip(&b) {
            // CompactRecorder stores half precision
            assert!((x - y).abs() < 1e-2, "{x} vs {y}");
        }
    }

    #[test]
    fn test_missing_checkpoint_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = CheckpointManager::new(dir.path()).unwrap();
        let err = mgr.load_config().unwrap_err();
        assert!(err.to_string().contains("run 'init' first"));
    }
}
