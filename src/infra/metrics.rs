// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records per-example evaluation results to a CSV file and
// folds them into a summary.
//
// Metrics recorded per example:
//   - id:              sample identifier
//   - individual_loss: start KL + end KL for that example
//   - pred_start/end:  decoded moment (clip indices, inclusive)
//   - gt_start/end:    annotated moment from the localization mask
//   - score:           start[s] · end[e] of the decoded moment
//   - iou:             temporal IoU of predicted vs annotated moment
//
// Output file: checkpoints/metrics.csv
//
// Example CSV output:
//   id,individual_loss,pred_start,pred_end,gt_start,gt_end,score,iou
//   synthetic-00000,1.204300,3,7,4,7,0.081200,0.800000
//
// Summary:
//   mIoU   = mean IoU over all examples
//   R@1 τ  = fraction of examples whose top-1 moment has IoU ≥ τ,
//            for τ ∈ {0.3, 0.5, 0.7}
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

use crate::domain::moment::Moment;

/// IoU thresholds reported as R@1
pub const RECALL_THRESHOLDS: [f64; 3] = [0.3, 0.5, 0.7];

/// Evaluation result for one example
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExampleMetrics {
    pub id: String,

    /// Start KL + end KL for this example
    pub individual_loss: f64,

    /// Decoded moment; None for an empty prediction
    pub predicted: Option<Moment>,

    /// Annotated moment; None when the mask marks no clip
    pub ground_truth: Option<Moment>,

    /// Joint boundary probability of the decoded moment
    pub score: f64,
}

impl ExampleMetrics {
    /// IoU of prediction vs annotation; 0 when either is missing
    pub fn iou(&self) -> f64 {
        match (self.predicted, self.ground_truth) {
            (Some(p), Some(g)) => p.iou(&g),
            _ => 0.0,
        }
    }
}

/// Aggregate metrics over an evaluation run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvalSummary {
    pub examples:  usize,
    pub mean_loss: f64,
    pub mean_iou:  f64,
    /// R@1 at each of RECALL_THRESHOLDS, same order
    pub recall_at_1: Vec<f64>,
}

impl EvalSummary {
    pub fn from_examples(rows: &[ExampleMetrics]) -> Self {
        if rows.is_empty() {
            return Self { recall_at_1: vec![0.0; RECALL_THRESHOLDS.len()], ..Self::default() };
        }
        let n    = rows.len() as f64;
        let ious: Vec<f64> = rows.iter().map(ExampleMetrics::iou).collect();

        Self {
            examples:  rows.len(),
            mean_loss: rows.iter().map(|r| r.individual_loss).sum::<f64>() / n,
            mean_iou:  ious.iter().sum::<f64>() / n,
            recall_at_1: RECALL_THRESHOLDS
                .iter()
                .map(|&tau| ious.iter().filter(|&&iou| iou >= tau).count() as f64 / n)
                .collect(),
        }
    }
}

/// Appends per-example rows to a CSV file.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create a logger writing {dir}/metrics.csv.
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create metrics directory '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");

        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "id,individual_loss,pred_start,pred_end,gt_start,gt_end,score,iou")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one row per example.
    pub fn log(&self, rows: &[ExampleMetrics]) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        for m in rows {
            let (ps, pe) = bounds(m.predicted);
            let (gs, ge) = bounds(m.ground_truth);
            writeln!(
                f,
                "{},{:.6},{},{},{},{},{:.6},{:.6}",
                m.id, m.individual_loss, ps, pe, gs, ge, m.score, m.iou(),
            )?;
        }

        tracing::debug!("Logged {} example rows", rows.len());
        Ok(())
    }

    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}

fn bounds(moment: Option<Moment>) -> (String, String) {
    match moment {
        Some(m) => (m.start.to_string(), m.end.to_string()),
        None    => (String::new(), String::new()),
    }
}
