// ============================================================
// Layer 5 — Boundary Predictor
// ============================================================
// Two independent per-clip linear heads map each contextual state
// to a start logit and an end logit; each row is then normalised
// over the valid clips.
//
// No start ≤ end constraint is applied here. Picking a consistent
// span is the decoder's job (see ml::decoder).

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
};

use crate::ml::normalizer::MaskedNormalizer;

#[derive(Config, Debug)]
pub struct BoundaryPredictorConfig {
    /// Width of each contextual clip state
    pub d_input: usize,
}

impl BoundaryPredictorConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> BoundaryPredictor<B> {
        BoundaryPredictor {
            starting: LinearConfig::new(self.d_input, 1).init(device),
            ending:   LinearConfig::new(self.d_input, 1).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct BoundaryPredictor<B: Backend> {
    starting: Linear<B>,
    ending:   Linear<B>,
}

/// Start and end distributions over clips, each [batch, clips]
pub struct BoundaryDistributions<B: Backend> {
    pub pred_start: Tensor<B, 2>,
    pub pred_end:   Tensor<B, 2>,
}

impl<B: Backend> BoundaryPredictor<B> {
    /// Unnormalised (start, end) logits, each [batch, clips]
    pub fn logits(&self, states: Tensor<B, 3>) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let [batch, steps, _] = states.dims();
        let start = self.starting.forward(states.clone()).reshape([batch, steps]);
        let end   = self.ending.forward(states).reshape([batch, steps]);
        (start, end)
    }

    pub fn forward(
        &self,
        states:     Tensor<B, 3>,
        mask:       Tensor<B, 2>,
        normalizer: &MaskedNormalizer,
    ) -> BoundaryDistributions<B> {
        let (start, end) = self.logits(states);
        BoundaryDistributions {
            pred_start: normalizer.normalize(start, Some(mask.clone()), 1),
            pred_end:   normalizer.normalize(end, Some(mask), 1),
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::TensorData;

    use crate::ml::mask::sequence_mask;

    type TestBackend = NdArray;

    #[test]
    fn test_distributions_sum_to_one_over_valid_clips() {
        let device    = Default::default();
        let predictor = BoundaryPredictorConfig::new(4).init::<TestBackend>(&device);
        let values: Vec<f32> = (0..2 * 5 * 4).map(|i| (i as f32 * 0.37).sin()).collect();
        let states    = Tensor::<TestBackend, 3>::from_data(TensorData::new(values, [2, 5, 4]), &device);
        let mask      = sequence_mask::<TestBackend>(&[3, 5], 5, &device).unwrap();

        let out = predictor.forward(states, mask, &MaskedNormalizer::default());
        for dist in [out.pred_start, out.pred_end] {
            let v = dist.into_data().to_vec::<f32>().unwrap();
            let row0: f32 = v[..3].iter().sum();
            let row1: f32 = v[5..].iter().sum();
            assert!((row0 - 1.0).abs() < 1e-5);
            assert!((row1 - 1.0).abs() < 1e-5);
            assert!(v[3] < 1e-12 && v[4] < 1e-12);
        }
    }
}
