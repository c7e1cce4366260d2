// ============================================================
// Layer 5 — Grounding Model
// ============================================================
// Query distiller → clip reduction → attention → weighted context
// encoder → start/end boundary predictor. Every stage receives the
// video mask, so padded clips never influence valid outputs.

use burn::{
    module::Ignored,
    nn::{Linear, LinearConfig},
    prelude::*,
};

use crate::domain::error::{GroundingError, GroundingResult};
use crate::ml::attention::AttentionScorer;
use crate::ml::boundary::{BoundaryDistributions, BoundaryPredictor, BoundaryPredictorConfig};
use crate::ml::context::{ContextEncoder, ContextEncoderConfig};
use crate::ml::distiller::{QueryDistiller, QueryDistillerConfig};
use crate::ml::loss::{GroundingTargets, LossAccumulator, LossBundle};
use crate::ml::mask::{sequence_mask, validate_lengths};
use crate::ml::normalizer::{MaskedNormalizer, MaskingStrategy};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally, so do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct GroundingModelConfig {
    /// Width of each incoming clip feature (D_in)
    pub video_input_size: usize,
    /// Width of each incoming query token embedding (D_tok)
    pub query_input_size: usize,
    /// Width of the reduced clip features and the query filter (D_f)
    #[config(default = 512)]
    pub filter_size: usize,
    /// Per-direction hidden width of the context encoder
    #[config(default = 256)]
    pub hidden_size: usize,
    #[config(default = 2)]
    pub num_layers: usize,
    /// Bias terms inside the recurrent context encoder
    #[config(default = false)]
    pub bias: bool,
    #[config(default = 0.5)]
    pub dropout: f64,
    #[config(default = true)]
    pub bidirectional: bool,
    #[config(default = "String::from(\"lstm\")")]
    pub tail_model: String,
    #[config(default = 256)]
    pub tail_hidden_size: usize,
    #[config(default = 1)]
    pub tail_layers: usize,
    #[config(default = "String::from(\"mean\")")]
    pub pooling: String,
    #[config(default = "String::from(\"mlp\")")]
    pub head_model: String,
    #[config(default = 512)]
    pub head_hidden_size: usize,
    #[config(default = "MaskingStrategy::Multiply")]
    pub masking: MaskingStrategy,
    /// Add the attention-regularisation term to total_loss
    #[config(default = true)]
    pub attention_loss: bool,
}

impl GroundingModelConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> GroundingResult<GroundingModel<B>> {
        if self.video_input_size == 0 || self.query_input_size == 0 || self.filter_size == 0 {
            return Err(GroundingError::shape(
                "model widths",
                "non-zero (video_input_size, query_input_size, filter_size)",
                (self.video_input_size, self.query_input_size, self.filter_size),
            ));
        }

        let distiller = QueryDistillerConfig::new(self.query_input_size, self.filter_size)
            .with_tail_model(self.tail_model.clone())
            .with_tail_hidden_size(self.tail_hidden_size)
            .with_tail_layers(self.tail_layers)
            .with_bidirectional(self.bidirectional)
            .with_pooling(self.pooling.clone())
            .with_head_model(self.head_model.clone())
            .with_head_hidden_size(self.head_hidden_size)
            .init(device)?;

        let reduction = LinearConfig::new(self.video_input_size, self.filter_size).init(device);

        let context = ContextEncoderConfig::new(self.filter_size)
            .with_hidden_size(self.hidden_size)
            .with_num_layers(self.num_layers)
            .with_bias(self.bias)
            .with_dropout(self.dropout)
            .with_bidirectional(self.bidirectional)
            .init(device)?;

        let boundary = BoundaryPredictorConfig::new(context.output_size()).init(device);

        Ok(GroundingModel {
            distiller,
            reduction,
            context,
            boundary,
            masking:          Ignored(self.masking),
            attention_loss:   Ignored(self.attention_loss),
            video_input_size: self.video_input_size,
            query_input_size: self.query_input_size,
        })
    }
}

#[derive(Module, Debug)]
pub struct GroundingModel<B: Backend> {
    pub distiller:        QueryDistiller<B>,
    pub reduction:        Linear<B>,
    pub context:          ContextEncoder<B>,
    pub boundary:         BoundaryPredictor<B>,
    pub masking:          Ignored<MaskingStrategy>,
    pub attention_loss:   Ignored<bool>,
    pub video_input_size: usize,
    pub query_input_size: usize,
}

/// One right-padded batch of videos and queries.
#[derive(Debug, Clone)]
pub struct GroundingInput<B: Backend> {
    /// [batch, max_clips, video_input_size]
    pub video_features: Tensor<B, 3>,
    /// Valid clips per example
    pub video_lengths: Vec<usize>,
    /// [batch, max_tokens, query_input_size]
    pub query_tokens: Tensor<B, 3>,
    /// Valid tokens per example
    pub query_lengths: Vec<usize>,
}

/// Predicted distributions, each [batch, max_clips]
pub struct GroundingOutput<B: Backend> {
    pub pred_start: Tensor<B, 2>,
    pub pred_end:   Tensor<B, 2>,
    pub attention:  Tensor<B, 2>,
    pub video_mask: Tensor<B, 2>,
}

impl<B: Backend> GroundingModel<B> {
    fn normalizer(&self) -> MaskedNormalizer {
        MaskedNormalizer::new(self.masking.0)
    }

    /// Reject a batch whose shapes or lengths cannot be processed.
    pub fn validate(&self, input: &GroundingInput<B>) -> GroundingResult<()> {
        let [batch, clips, width] = input.video_features.dims();
        if width != self.video_input_size {
            return Err(GroundingError::shape("clip feature width", self.video_input_size, width));
        }
        let [query_batch, tokens, query_width] = input.query_tokens.dims();
        if query_batch != batch {
            return Err(GroundingError::shape("query batch", batch, query_batch));
        }
        if query_width != self.query_input_size {
            return Err(GroundingError::shape("query token width", self.query_input_size, query_width));
        }
        if input.video_lengths.len() != batch {
            return Err(GroundingError::shape("video lengths", batch, input.video_lengths.len()));
        }
        if input.query_lengths.len() != batch {
            return Err(GroundingError::shape("query lengths", batch, input.query_lengths.len()));
        }
        validate_lengths(&input.video_lengths, clips)?;
        validate_lengths(&input.query_lengths, tokens)
    }

    /// Predict start, end and attention distributions for a batch.
    pub fn forward(&self, input: GroundingInput<B>) -> GroundingResult<GroundingOutput<B>> {
        self.validate(&input)?;
        let [batch, clips, _] = input.video_features.dims();
        let device     = input.video_features.device();
        let normalizer = self.normalizer();

        let video_mask = sequence_mask::<B>(&input.video_lengths, clips, &device)?;

        // ── Query → filter vector ────────────────────────────────────────────
        let (filter, query_lengths) = self.distiller.distill(input.query_tokens, &input.query_lengths)?;

        // ── Clip attention ───────────────────────────────────────────────────
        let reduced   = self.reduction.forward(input.video_features);
        let attention = AttentionScorer::new(normalizer)
            .attend(reduced.clone(), filter, video_mask.clone(), query_lengths)?;

        // ── Attention-weighted context ───────────────────────────────────────
        let weighted = reduced * attention.clone().unsqueeze_dim::<3>(2);
        let states   = self.context.forward(weighted, video_mask.clone())?;

        let BoundaryDistributions { pred_start, pred_end } =
            self.boundary.forward(states, video_mask.clone(), &normalizer);

        tracing::debug!("Forward pass: batch={} clips={} strategy={:?}", batch, clips, self.masking.0);

        Ok(GroundingOutput { pred_start, pred_end, attention, video_mask })
    }

    /// Forward pass plus the KL boundary losses and attention regulariser.
    pub fn forward_loss(
        &self,
        input:   GroundingInput<B>,
        targets: GroundingTargets<B>,
    ) -> GroundingResult<LossBundle<B>> {
        let output = self.forward(input)?;
        LossAccumulator::new(self.attention_loss.0).accumulate(
            output.pred_start,
            output.pred_end,
            output.attention,
            output.video_mask,
            targets,
        )
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::TensorData;

    type TestBackend = NdArray;
    type Device = <TestBackend as Backend>::Device;

    fn small_config() -> GroundingModelConfig {
        GroundingModelConfig::new(5, 3)
            .with_filter_size(4)
            .with_hidden_size(3)
            .with_tail_hidden_size(2)
            .with_head_hidden_size(4)
    }

    fn wave(shape: [usize; 3], phase: f32, device: &Device) -> Tensor<TestBackend, 3> {
        let n: usize = shape.iter().product();
        let values: Vec<f32> = (0..n).map(|i| (i as f32 * 0.61 + phase).sin()).collect();
        Tensor::from_data(TensorData::new(values, shape), device)
    }

    fn input(video: Tensor<TestBackend, 3>, device: &Device) -> GroundingInput<TestBackend> {
        GroundingInput {
            video_features: video,
            video_lengths:  vec![4, 6],
            query_tokens:   wave([2, 3, 3], 1.3, device),
            query_lengths:  vec![2, 3],
        }
    }

    fn uniform_targets(device: &Device) -> GroundingTargets<TestBackend> {
        let start = vec![0.25f32, 0.25, 0.25, 0.25, 0.0, 0.0, 0.0, 0.0, 0.5, 0.5, 0.0, 0.0];
        let loc   = vec![0.0f32, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 0.0];
        GroundingTargets {
            start:        Tensor::from_data(TensorData::new(start.clone(), [2, 6]), device),
            end:          Tensor::from_data(TensorData::new(start, [2, 6]), device),
            localization: Tensor::from_data(TensorData::new(loc, [2, 6]), device),
        }
    }

    fn rows(t: Tensor<TestBackend, 2>) -> Vec<f32> {
        t.into_data().to_vec::<f32>().unwrap()
    }

    #[test]
    fn test_forward_shapes_and_distributions() {
        let device = Default::default();
        let model  = small_config().init::<TestBackend>(&device).unwrap();
        let out    = model.forward(input(wave([2, 6, 5], 0.0, &device), &device)).unwrap();

        for dist in [out.pred_start, out.pred_end, out.attention] {
            assert_eq!(dist.dims(), [2, 6]);
            let v = rows(dist);
            assert!(v.iter().all(|p| p.is_finite() && *p > 0.0));
            let row0: f32 = v[..4].iter().sum();
            let row1: f32 = v[6..].iter().sum();
            assert!((row0 - 1.0).abs() < 1e-5);
            assert!((row1 - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_padded_clip_features_never_affect_outputs() {
        let device = Default::default();
        for masking in [MaskingStrategy::Multiply, MaskingStrategy::Fill] {
            let model = small_config().with_masking(masking).init::<TestBackend>(&device).unwrap();

            let clean = wave([2, 6, 5], 0.0, &device);
            let noisy = clean.clone().slice_assign(
                [0..1, 4..6, 0..5],
                Tensor::full([1, 2, 5], 37.0, &device),
            );

            let a = model.forward(input(clean, &device)).unwrap();
            let b = model.forward(input(noisy, &device)).unwrap();

            for (x, y) in [(a.attention, b.attention), (a.pred_start, b.pred_start), (a.pred_end, b.pred_end)] {
                let (x, y) = (rows(x), rows(y));
                for t in 0..6 {
                    assert!((x[t] - y[t]).abs() < 1e-6, "{masking:?} clip {t}: {} vs {}", x[t], y[t]);
                }
            }
        }
    }

    #[test]
    fn test_forward_loss_is_finite_and_consistent() {
        let device = Default::default();
        let model  = small_config().init::<TestBackend>(&device).unwrap();
        let bundle = model
            .forward_loss(input(wave([2, 6, 5], 0.0, &device), &device), uniform_targets(&device))
            .unwrap();

        let total = bundle.total_loss.into_scalar().elem::<f32>();
        let start = bundle.start_loss.into_scalar().elem::<f32>();
        let end   = bundle.end_loss.into_scalar().elem::<f32>();
        let att   = bundle.attention_loss.into_scalar().elem::<f32>();
        assert!(total.is_finite());
        assert!((total - (start + end + att)).abs() < 1e-4);

        let individual = bundle.individual_loss.into_data().to_vec::<f32>().unwrap();
        assert_eq!(individual.len(), 2);
        let mean = (individual[0] + individual[1]) / 2.0;
        assert!((mean - (start + end)).abs() < 1e-4);
    }

    #[test]
    fn test_attention_term_can_be_disabled() {
        let device = Default::default();
        let model  = small_config().with_attention_loss(false).init::<TestBackend>(&device).unwrap();
        let bundle = model
            .forward_loss(input(wave([2, 6, 5], 0.0, &device), &device), uniform_targets(&device))
            .unwrap();

        let total = bundle.total_loss.into_scalar().elem::<f32>();
        let start = bundle.start_loss.into_scalar().elem::<f32>();
        let end   = bundle.end_loss.into_scalar().elem::<f32>();
        assert!((total - (start + end)).abs() < 1e-5);
    }

    #[test]
    fn test_wrong_clip_width_is_rejected() {
        let device = Default::default();
        let model  = small_config().init::<TestBackend>(&device).unwrap();
        let result = model.forward(input(wave([2, 6, 7], 0.0, &device), &device));
        assert!(matches!(result, Err(GroundingError::ShapeMismatch { what: "clip feature width", .. })));
    }

    #[test]
    fn test_video_length_beyond_padding_is_rejected() {
        let device = Default::default();
        let model  = small_config().init::<TestBackend>(&device).unwrap();
        let mut batch = input(wave([2, 6, 5], 0.0, &device), &device);
        batch.video_lengths = vec![4, 7];
        assert!(matches!(
            model.forward(batch),
            Err(GroundingError::InvalidLength { index: 1, length: 7, max_len: 6 })
        ));
    }

    #[test]
    fn test_unknown_head_fails_at_init() {
        let device = Default::default();
        let result = small_config().with_head_model("attention".into()).init::<TestBackend>(&device);
        assert!(matches!(result, Err(GroundingError::UnknownStrategy { registry: "head", .. })));
    }
}
