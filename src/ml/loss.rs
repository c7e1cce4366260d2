// ============================================================
// Layer 5 — Loss Accumulator
// ============================================================
// Three terms are combined into the training objective:
//
//   start_loss = mean_b  KL(start_target_b ‖ pred_start_b)
//   end_loss   = mean_b  KL(end_target_b   ‖ pred_end_b)
//   atten_loss = mean_b  Σ_t −(1 − loc_bt) · log(1 − att_bt + 1e-12)
//
//   total_loss = start_loss + end_loss (+ atten_loss when enabled)
//
// KL is evaluated on valid clips only:
//   KL_b = −Σ_{t < len_b} target · log(pred / target)
// with the convention 0 · log(·/0) = 0, so exact zeros in a target
// (one-hot boundaries) contribute nothing instead of NaN. Predictions
// are strictly positive thanks to the normaliser floor.
//
// Precondition: targets are finite and non-negative on valid clips
// (GroundingSample::validate enforces this). If a loss still comes
// out non-finite, NumericInstability is returned instead of a NaN.

use burn::prelude::*;

use crate::domain::error::{GroundingError, GroundingResult};

/// Added inside the attention-regularisation log
pub const ATTENTION_LOG_EPSILON: f32 = 1e-12;

/// Ground truth for one batch, each [batch, clips]
#[derive(Debug, Clone)]
pub struct GroundingTargets<B: Backend> {
    pub start:        Tensor<B, 2>,
    pub end:          Tensor<B, 2>,
    pub localization: Tensor<B, 2>,
}

/// Losses plus the distributions they were computed from.
#[derive(Debug, Clone)]
pub struct LossBundle<B: Backend> {
    /// start_loss + end_loss (+ attention_loss), shape [1]
    pub total_loss: Tensor<B, 1>,
    /// Per-example start KL + end KL, shape [batch]
    pub individual_loss: Tensor<B, 1>,
    /// Batch-mean start KL, shape [1]
    pub start_loss: Tensor<B, 1>,
    /// Batch-mean end KL, shape [1]
    pub end_loss: Tensor<B, 1>,
    /// Attention regularisation, shape [1]
    pub attention_loss: Tensor<B, 1>,
    pub pred_start: Tensor<B, 2>,
    pub pred_end:   Tensor<B, 2>,
    pub attention:  Tensor<B, 2>,
}

/// Per-example KL divergence of `pred` from `target` over valid clips.
///
/// Returns (batch mean [1], per-example [batch]).
pub fn kl_div<B: Backend>(
    pred:   Tensor<B, 2>,
    target: Tensor<B, 2>,
    mask:   Tensor<B, 2>,
) -> (Tensor<B, 1>, Tensor<B, 1>) {
    let [batch, _] = pred.dims();

    let empty   = target.clone().equal_elem(0.0);
    let safe    = target.clone().mask_fill(empty, 1.0);
    let invalid = mask.equal_elem(0.0);

    let terms = (target * (pred / safe).log()).mask_fill(invalid, 0.0);
    let individual = terms.sum_dim(1).neg().reshape([batch]);
    (individual.clone().mean(), individual)
}

/// Penalty on attention mass placed outside the annotated span.
pub fn attention_regularization<B: Backend>(
    attention:    Tensor<B, 2>,
    localization: Tensor<B, 2>,
) -> Tensor<B, 1> {
    let outside   = localization.neg().add_scalar(1.0);
    let remaining = attention.neg().add_scalar(1.0).clamp_min(0.0).add_scalar(ATTENTION_LOG_EPSILON);
    (outside * remaining.log()).neg().sum_dim(1).mean()
}

/// Combines the boundary and attention losses.
#[derive(Debug, Clone, Copy)]
pub struct LossAccumulator {
    include_attention: bool,
}

impl LossAccumulator {
    pub fn new(include_attention: bool) -> Self {
        Self { include_attention }
    }

    pub fn accumulate<B: Backend>(
        &self,
        pred_start: Tensor<B, 2>,
        pred_end:   Tensor<B, 2>,
        attention:  Tensor<B, 2>,
        video_mask: Tensor<B, 2>,
        targets:    GroundingTargets<B>,
    ) -> GroundingResult<LossBundle<B>> {
        let dims = pred_start.dims();
        for (what, actual) in [
            ("start target", targets.start.dims()),
            ("end target", targets.end.dims()),
            ("localization mask", targets.localization.dims()),
        ] {
            if actual != dims {
                return Err(GroundingError::shape(what, dims, actual));
            }
        }

        let (start_loss, individual_start) = kl_div(pred_start.clone(), targets.start, video_mask.clone());
        let (end_loss, individual_end)     = kl_div(pred_end.clone(), targets.end, video_mask);
        let attention_loss = attention_regularization(attention.clone(), targets.localization);

        let boundary_loss = start_loss.clone() + end_loss.clone();
        let total_loss = if self.include_attention {
            boundary_loss + attention_loss.clone()
        } else {
            boundary_loss
        };

        let bundle = LossBundle {
            total_loss,
            individual_loss: individual_start + individual_end,
            start_loss,
            end_loss,
            attention_loss,
            pred_start,
            pred_end,
            attention,
        };
        ensure_finite(&bundle)?;
        Ok(bundle)
    }
}

impl Default for LossAccumulator {
    fn default() -> Self {
        Self::new(true)
    }
}

fn ensure_finite<B: Backend>(bundle: &LossBundle<B>) -> GroundingResult<()> {
    for (what, loss) in [
        ("start loss", &bundle.start_loss),
        ("end loss", &bundle.end_loss),
        ("attention loss", &bundle.attention_loss),
    ] {
        let value = loss.clone().into_scalar().elem::<f32>();
        if !value.is_finite() {
            return Err(GroundingError::numeric(what, format!("loss evaluated to {value}")));
        }
    }
    Ok(())
}
