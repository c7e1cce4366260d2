// ============================================================
// Layer 5 — Length-Aware Recurrent Encoder
// ============================================================
// A stack of (optionally bidirectional) GRU or LSTM layers over a
// right-padded batch.
//
// Padding is handled per timestep instead of by packing:
//
//   state_t = keep_t · cell(x_t, state_{t-1}) + (1 − keep_t) · state_{t-1}
//   out_t   = keep_t · hidden_t
//
// keep_t is the validity mask column for step t. A padded step
// carries the state through unchanged and emits zeros. Because the
// backward direction walks T−1 → 0 starting from a zero state, its
// state is still zero when it reaches each example's last valid clip,
// so padded clips never leak into valid outputs in either direction.
//
// Gate layout follows the usual convention:
//   GRU  — [r | z | n],      n = tanh(x_n + r · h_n)
//   LSTM — [i | f | g | o],  c' = f·c + i·g, h' = o·tanh(c')
//
// Dropout is applied between stacked layers, never after the last.

use burn::{
    module::Ignored,
    nn::{Dropout, DropoutConfig, Linear, LinearConfig},
    prelude::*,
    tensor::activation::{sigmoid, tanh},
};

use crate::domain::error::{GroundingError, GroundingResult};
use crate::ml::traits::SequenceEncoder;

/// Recurrent cell flavour.
#[derive(Config, Debug, Copy, PartialEq, Eq)]
pub enum CellKind {
    Gru,
    Lstm,
}

impl CellKind {
    fn gate_count(self) -> usize {
        match self {
            CellKind::Gru  => 3,
            CellKind::Lstm => 4,
        }
    }
}

#[derive(Config, Debug)]
pub struct RecurrentEncoderConfig {
    /// Width of each input step
    pub d_input: usize,
    /// Hidden width per direction
    pub d_hidden: usize,
    #[config(default = "CellKind::Gru")]
    pub cell: CellKind,
    #[config(default = 1)]
    pub num_layers: usize,
    #[config(default = true)]
    pub bidirectional: bool,
    #[config(default = true)]
    pub bias: bool,
    /// Dropout between stacked layers
    #[config(default = 0.0)]
    pub dropout: f64,
}

impl RecurrentEncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> GroundingResult<RecurrentEncoder<B>> {
        if self.num_layers == 0 {
            return Err(GroundingError::shape("recurrent layer count", ">= 1", self.num_layers));
        }
        if self.d_input == 0 || self.d_hidden == 0 {
            return Err(GroundingError::shape(
                "recurrent widths",
                "non-zero (d_input, d_hidden)",
                (self.d_input, self.d_hidden),
            ));
        }

        let directions = if self.bidirectional { 2 } else { 1 };
        let layers = (0..self.num_layers)
            .map(|i| {
                let d_input = if i == 0 { self.d_input } else { self.d_hidden * directions };
                RecurrentLayer {
                    forward_cell:  self.init_cell(d_input, device),
                    backward_cell: self.bidirectional.then(|| self.init_cell(d_input, device)),
                }
            })
            .collect();

        Ok(RecurrentEncoder {
            layers,
            dropout: DropoutConfig::new(self.dropout).init(),
            d_hidden: self.d_hidden,
            directions,
        })
    }

    fn init_cell<B: Backend>(&self, d_input: usize, device: &B::Device) -> RecurrentCell<B> {
        let gates = self.cell.gate_count() * self.d_hidden;
        RecurrentCell {
            input_gates:  LinearConfig::new(d_input, gates).with_bias(self.bias).init(device),
            hidden_gates: LinearConfig::new(self.d_hidden, gates).with_bias(self.bias).init(device),
            kind:         Ignored(self.cell),
            d_hidden:     self.d_hidden,
        }
    }
}

// ─── RecurrentCell ────────────────────────────────────────────────────────────
/// One direction of one layer.
#[derive(Module, Debug)]
pub struct RecurrentCell<B: Backend> {
    input_gates:  Linear<B>,
    hidden_gates: Linear<B>,
    kind:         Ignored<CellKind>,
    d_hidden:     usize,
}

struct CellState<B: Backend> {
    hidden: Tensor<B, 2>,
    memory: Option<Tensor<B, 2>>,
}

impl<B: Backend> RecurrentCell<B> {
    fn zero_state(&self, batch: usize, device: &B::Device) -> CellState<B> {
        let hidden = Tensor::zeros([batch, self.d_hidden], device);
        let memory = match self.kind.0 {
            CellKind::Gru  => None,
            CellKind::Lstm => Some(Tensor::zeros([batch, self.d_hidden], device)),
        };
        CellState { hidden, memory }
    }

    fn gate(gates: &Tensor<B, 2>, index: usize, width: usize) -> Tensor<B, 2> {
        let [batch, _] = gates.dims();
        gates.clone().slice([0..batch, index * width..(index + 1) * width])
    }

    /// Advance one step. `keep` is [batch, 1]; rows with 0 keep their state.
    fn step(&self, gates_x: Tensor<B, 2>, state: CellState<B>, keep: Tensor<B, 2>) -> CellState<B> {
        let h       = self.d_hidden;
        let gates_h = self.hidden_gates.forward(state.hidden.clone());
        let hold    = keep.clone().neg().add_scalar(1.0);

        let (hidden, memory) = match (self.kind.0, state.memory.clone()) {
            (CellKind::Lstm, Some(memory)) => {
                let i = sigmoid(Self::gate(&gates_x, 0, h) + Self::gate(&gates_h, 0, h));
                let f = sigmoid(Self::gate(&gates_x, 1, h) + Self::gate(&gates_h, 1, h));
                let g = tanh(Self::gate(&gates_x, 2, h) + Self::gate(&gates_h, 2, h));
                let o = sigmoid(Self::gate(&gates_x, 3, h) + Self::gate(&gates_h, 3, h));
                let memory = f * memory + i * g;
                (o * tanh(memory.clone()), Some(memory))
            }
            _ => {
                let r = sigmoid(Self::gate(&gates_x, 0, h) + Self::gate(&gates_h, 0, h));
                let z = sigmoid(Self::gate(&gates_x, 1, h) + Self::gate(&gates_h, 1, h));
                let n = tanh(Self::gate(&gates_x, 2, h) + r * Self::gate(&gates_h, 2, h));
                (n.clone() + z * (state.hidden.clone() - n), None)
            }
        };

        CellState {
            hidden: hidden * keep.clone() + state.hidden * hold.clone(),
            memory: match (memory, state.memory) {
                (Some(new), Some(old)) => Some(new * keep + old * hold),
                _ => None,
            },
        }
    }

    /// Run the cell over every step, left-to-right or right-to-left.
    fn run(&self, input: Tensor<B, 3>, mask: Tensor<B, 2>, reverse: bool) -> Tensor<B, 3> {
        let [batch, steps, _] = input.dims();
        let device  = input.device();
        let gates_x = self.input_gates.forward(input);
        let width   = gates_x.dims()[2];

        let order: Vec<usize> = if reverse {
            (0..steps).rev().collect()
        } else {
            (0..steps).collect()
        };

        let mut state   = self.zero_state(batch, &device);
        let mut outputs: Vec<Option<Tensor<B, 2>>> = vec![None; steps];
        for t in order {
            let gx   = gates_x.clone().slice([0..batch, t..t + 1, 0..width]).reshape([batch, width]);
            let keep = mask.clone().slice([0..batch, t..t + 1]);
            state = self.step(gx, state, keep.clone());
            outputs[t] = Some(state.hidden.clone() * keep);
        }

        Tensor::<B, 2>::stack::<3>(outputs.into_iter().flatten().collect(), 1)
    }
}

// ─── RecurrentLayer ───────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct RecurrentLayer<B: Backend> {
    forward_cell:  RecurrentCell<B>,
    backward_cell: Option<RecurrentCell<B>>,
}

impl<B: Backend> RecurrentLayer<B> {
    fn forward(&self, input: Tensor<B, 3>, mask: Tensor<B, 2>) -> Tensor<B, 3> {
        let ahead = self.forward_cell.run(input.clone(), mask.clone(), false);
        match &self.backward_cell {
            Some(cell) => Tensor::cat(vec![ahead, cell.run(input, mask, true)], 2),
            None => ahead,
        }
    }
}

// ─── RecurrentEncoder ─────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct RecurrentEncoder<B: Backend> {
    layers:     Vec<RecurrentLayer<B>>,
    dropout:    Dropout,
    d_hidden:   usize,
    directions: usize,
}

impl<B: Backend> RecurrentEncoder<B> {
    /// input: [batch, steps, d_input], mask: [batch, steps]
    /// → [batch, steps, d_hidden · directions], zero at padded steps
    pub fn forward(&self, input: Tensor<B, 3>, mask: Tensor<B, 2>) -> Tensor<B, 3> {
        let last  = self.layers.len().saturating_sub(1);
        let mut x = input;
        for (i, layer) in self.layers.iter().enumerate() {
            x = layer.forward(x, mask.clone());
            if i < last {
                x = self.dropout.forward(x);
            }
        }
        x
    }

    pub fn output_size(&self) -> usize {
        self.d_hidden * self.directions
    }
}

impl<B: Backend> SequenceEncoder<B> for RecurrentEncoder<B> {
    fn encode(&self, sequence: Tensor<B, 3>, mask: Tensor<B, 2>) -> Tensor<B, 3> {
        self.forward(sequence, mask)
    }

    fn encoded_size(&self) -> usize {
        self.output_size()
    }
}
