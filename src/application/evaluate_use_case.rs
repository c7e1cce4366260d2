// ============================================================
// Layer 2 — EvaluateUseCase
// ============================================================
// Runs a saved model over a labelled sample file:
//
//   Step 1: Restore config + weights      (Layer 6 - infra)
//   Step 2: Load and validate samples     (Layer 4 - data)
//   Step 3: Batch with dynamic padding    (Layer 4 - data)
//   Step 4: Forward + losses per batch    (Layer 5 - ml)
//   Step 5: Decode one moment per example (Layer 5 - ml)
//   Step 6: Log rows, dump, summarise     (Layer 6 - infra)
//
// Evaluation runs on a plain (non-autodiff) backend, so dropout
// is inactive and results are deterministic.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use burn::{
    data::dataloader::DataLoaderBuilder,
    prelude::*,
};

use crate::data::{
    batcher::GroundingBatcher,
    dataset::GroundingDataset,
    loader::JsonSampleLoader,
};
use crate::domain::moment::Moment;
use crate::domain::traits::SampleSource;
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EvalSummary, ExampleMetrics, MetricsLogger},
};
use crate::ml::decoder::{decode_batch, DEFAULT_MAX_SPAN};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateConfig {
    pub checkpoint_dir: PathBuf,
    pub samples_path:   PathBuf,
    pub batch_size:     usize,
    /// Widest moment the decoder may return, in clips
    pub max_span:       usize,
    /// Where to write per-example distributions, if anywhere
    pub dump_path:      Option<PathBuf>,
}

impl Default for EvaluateConfig {
    fn default() -> Self {
        Self {
            checkpoint_dir: PathBuf::from("checkpoints"),
            samples_path:   PathBuf::from("data/samples.json"),
            batch_size:     8,
            max_span:       DEFAULT_MAX_SPAN,
            dump_path:      None,
        }
    }
}

/// Diagnostic distributions for one example, trimmed to its valid clips
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExampleDump {
    pub id:           String,
    pub predicted:    Option<Moment>,
    pub ground_truth: Option<Moment>,
    pub pred_start:   Vec<f32>,
    pub pred_end:     Vec<f32>,
    pub attention:    Vec<f32>,
}

pub struct EvaluateUseCase {
    config: EvaluateConfig,
}

impl EvaluateUseCase {
    pub fn new(config: EvaluateConfig) -> Self {
        Self { config }
    }

    pub fn execute<B: Backend>(&self, device: &B::Device) -> Result<EvalSummary> {
        let cfg = &self.config;

        // ── Step 1: Restore the model ─────────────────────────────────────────
        let ckpt = CheckpointManager::new(&cfg.checkpoint_dir)?;
        let (model_cfg, model) = ckpt.restore::<B>(device)?;

        // ── Step 2: Load samples ──────────────────────────────────────────────
        let samples = JsonSampleLoader::new(&cfg.samples_path).load_all()?;
        let dataset = GroundingDataset::validated(
            samples,
            model_cfg.video_input_size,
            model_cfg.query_input_size,
        )?;
        tracing::info!(
            "Evaluating {} samples (longest video {} clips)",
            dataset.sample_count(),
            dataset.max_clips(),
        );

        // ── Step 3: Data loader ───────────────────────────────────────────────
        let batcher = GroundingBatcher::<B>::new(
            device.clone(),
            model_cfg.video_input_size,
            model_cfg.query_input_size,
        );
        let loader = DataLoaderBuilder::new(batcher)
            .batch_size(cfg.batch_size.max(1))
            .num_workers(1)
            .build(dataset);

        let logger = MetricsLogger::new(&cfg.checkpoint_dir)?;
        let mut rows:  Vec<ExampleMetrics> = Vec::new();
        let mut dumps: Vec<ExampleDump>    = Vec::new();

        for (step, batch) in loader.iter().enumerate() {
            let ids           = batch.ids.clone();
            let ground_truth  = batch.ground_truth.clone();
            let video_lengths = batch.video_lengths.clone();
            let [_, clips]    = batch.start_target.dims();

            // ── Step 4: Forward + losses ──────────────────────────────────────
            let (input, targets) = batch.into_parts();
            let bundle = model.forward_loss(input, targets)?;

            let individual: Vec<f32> = bundle
                .individual_loss
                .into_data()
                .to_vec::<f32>()
                .map_err(|e| anyhow::anyhow!("Cannot read losses: {e:?}"))?;
            tracing::debug!(
                "Batch {}: total_loss={:.4}",
                step,
                bundle.total_loss.into_scalar().elem::<f64>(),
            );

            // ── Step 5: Decode ────────────────────────────────────────────────
            let decoded = decode_batch(
                bundle.pred_start.clone(),
                bundle.pred_end.clone(),
                &video_lengths,
                cfg.max_span,
            )?;

            let batch_rows: Vec<ExampleMetrics> = ids
                .iter()
                .zip(&decoded)
                .zip(&ground_truth)
                .zip(&individual)
                .map(|(((id, decoded), gt), loss)| ExampleMetrics {
                    id:              id.clone(),
                    individual_loss: *loss as f64,
                    predicted:       decoded.map(|(m, _)| m),
                    ground_truth:    *gt,
                    score:           decoded.map(|(_, s)| s as f64).unwrap_or(0.0),
                })
                .collect();

            if cfg.dump_path.is_some() {
                let host = |t: Tensor<B, 2>| {
                    t.into_data()
                        .to_vec::<f32>()
                        .map_err(|e| anyhow::anyhow!("Cannot read distribution: {e:?}"))
                };
                let start     = host(bundle.pred_start)?;
                let end       = host(bundle.pred_end)?;
                let attention = host(bundle.attention)?;

                for (b, row) in batch_rows.iter().enumerate() {
                    let valid = b * clips..b * clips + video_lengths[b];
                    dumps.push(ExampleDump {
                        id:           row.id.clone(),
                        predicted:    row.predicted,
                        ground_truth: row.ground_truth,
                        pred_start:   start[valid.clone()].to_vec(),
                        pred_end:     end[valid.clone()].to_vec(),
                        attention:    attention[valid].to_vec(),
                    });
                }
            }

            logger.log(&batch_rows)?;
            rows.extend(batch_rows);
        }

        // ── Step 6: Summary + optional dump ───────────────────────────────────
        if let Some(path) = &cfg.dump_path {
            let json = serde_json::to_string_pretty(&dumps)?;
            fs::write(path, json)
                .with_context(|| format!("Cannot write dump to '{}'", path.display()))?;
            tracing::info!("Wrote {} example dumps to {}", dumps.len(), path.display());
        }

        let summary = EvalSummary::from_examples(&rows);
        tracing::info!(
            "Evaluated {} examples: loss={:.4} mIoU={:.4}",
            summary.examples,
            summary.mean_loss,
            summary.mean_iou,
        );
        Ok(summary)
    }
}
