// ============================================================
// Layer 5 — Context Encoder
// ============================================================
// Bidirectional multi-layer GRU over the attention-weighted clip
// features. Output width is 2 × hidden_size when bidirectional.
// Padded clips come out as zeros and never influence valid clips.

use burn::prelude::*;

use crate::domain::error::{GroundingError, GroundingResult};
use crate::ml::recurrent::{CellKind, RecurrentEncoder, RecurrentEncoderConfig};
use crate::ml::traits::SequenceEncoder;

#[derive(Config, Debug)]
pub struct ContextEncoderConfig {
    pub d_input: usize,
    #[config(default = 256)]
    pub hidden_size: usize,
    #[config(default = 2)]
    pub num_layers: usize,
    #[config(default = false)]
    pub bias: bool,
    #[config(default = 0.5)]
    pub dropout: f64,
    #[config(default = true)]
    pub bidirectional: bool,
}

impl ContextEncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> GroundingResult<ContextEncoder<B>> {
        let rnn = RecurrentEncoderConfig::new(self.d_input, self.hidden_size)
            .with_cell(CellKind::Gru)
            .with_num_layers(self.num_layers)
            .with_bidirectional(self.bidirectional)
            .with_bias(self.bias)
            .with_dropout(self.dropout)
            .init(device)?;
        Ok(ContextEncoder { rnn })
    }
}

#[derive(Module, Debug)]
pub struct ContextEncoder<B: Backend> {
    rnn: RecurrentEncoder<B>,
}

impl<B: Backend> ContextEncoder<B> {
    /// weighted: [batch, clips, d_input], mask: [batch, clips]
    /// → [batch, clips, output_size]
    pub fn forward(&self, weighted: Tensor<B, 3>, mask: Tensor<B, 2>) -> GroundingResult<Tensor<B, 3>> {
        let [batch, steps, _] = weighted.dims();
        if mask.dims() != [batch, steps] {
            return Err(GroundingError::shape("video mask", [batch, steps], mask.dims()));
        }
        Ok(self.rnn.encode(weighted, mask))
    }

    pub fn output_size(&self) -> usize {
        self.rnn.encoded_size()
    }
}
