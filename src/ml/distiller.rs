// ============================================================
// Layer 5 — Query Distiller ("Dynamic Filter")
// ============================================================
// Turns a padded sequence of query token embeddings into ONE filter
// vector per example:
//
//   tokens [B, L, D_tok]
//       │  tail encoder      (lstm | gru | identity)
//       ▼
//   per-token states [B, L, H]
//       │  pooling reduction (mean | max | last), valid tokens only
//       ▼
//   pooled [B, H]
//       │  head transform    (mlp | linear | identity)
//       ▼
//   filter [B, D_f]
//
// Strategy names are resolved into closed enums when the config is
// initialised. An unknown name fails there with UnknownStrategy.

use std::fmt;
use std::str::FromStr;

use burn::{
    module::Ignored,
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation::relu,
};

use crate::domain::error::{GroundingError, GroundingResult};
use crate::ml::mask::{last_step_selector, length_column, sequence_mask};
use crate::ml::normalizer::MASK_FILL_VALUE;
use crate::ml::recurrent::{CellKind, RecurrentEncoder, RecurrentEncoderConfig};
use crate::ml::traits::{SequenceEncoder, SequenceReducer, VectorTransform};

// ─── Strategy registries ──────────────────────────────────────────────────────

/// Tail encoder registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailKind {
    Lstm,
    Gru,
    Identity,
}

/// Pooling reduction registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolingKind {
    Mean,
    Max,
    Last,
}

/// Head transform registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadKind {
    Mlp,
    Linear,
    Identity,
}

impl FromStr for TailKind {
    type Err = GroundingError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.to_ascii_lowercase().as_str() {
            "lstm" => Ok(Self::Lstm),
            "gru" => Ok(Self::Gru),
            "identity" | "none" => Ok(Self::Identity),
            _ => Err(GroundingError::UnknownStrategy { registry: "tail", name: name.to_string() }),
        }
    }
}

impl FromStr for PoolingKind {
    type Err = GroundingError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.to_ascii_lowercase().as_str() {
            "mean" | "meanpoolinglayer" => Ok(Self::Mean),
            "max" | "maxpoolinglayer" => Ok(Self::Max),
            "last" | "lastpoolinglayer" => Ok(Self::Last),
            _ => Err(GroundingError::UnknownStrategy { registry: "pooling", name: name.to_string() }),
        }
    }
}

impl FromStr for HeadKind {
    type Err = GroundingError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.to_ascii_lowercase().as_str() {
            "mlp" => Ok(Self::Mlp),
            "linear" => Ok(Self::Linear),
            "identity" | "none" => Ok(Self::Identity),
            _ => Err(GroundingError::UnknownStrategy { registry: "head", name: name.to_string() }),
        }
    }
}

impl fmt::Display for TailKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Lstm     => "lstm",
            Self::Gru      => "gru",
            Self::Identity => "identity",
        })
    }
}

impl fmt::Display for PoolingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Mean => "mean",
            Self::Max  => "max",
            Self::Last => "last",
        })
    }
}

impl fmt::Display for HeadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Mlp      => "mlp",
            Self::Linear   => "linear",
            Self::Identity => "identity",
        })
    }
}

// ─── Configuration ────────────────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct QueryDistillerConfig {
    /// Width of each query token embedding (D_tok)
    pub d_input: usize,
    /// Width of the produced filter vector (D_f)
    pub d_filter: usize,
    #[config(default = "String::from(\"lstm\")")]
    pub tail_model: String,
    #[config(default = 256)]
    pub tail_hidden_size: usize,
    #[config(default = 1)]
    pub tail_layers: usize,
    #[config(default = true)]
    pub bidirectional: bool,
    #[config(default = "String::from(\"mean\")")]
    pub pooling: String,
    #[config(default = "String::from(\"mlp\")")]
    pub head_model: String,
    #[config(default = 512)]
    pub head_hidden_size: usize,
}

impl QueryDistillerConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> GroundingResult<QueryDistiller<B>> {
        let tail_kind: TailKind       = self.tail_model.parse()?;
        let pooling_kind: PoolingKind = self.pooling.parse()?;
        let head_kind: HeadKind       = self.head_model.parse()?;

        let tail = self.init_tail(tail_kind, device)?;
        let head = self.init_head(head_kind, tail.encoded_size(), device)?;

        tracing::debug!(
            "Query distiller: tail={} pooling={} head={} ({} → {})",
            tail_kind, pooling_kind, head_kind, self.d_input, self.d_filter,
        );

        Ok(QueryDistiller {
            tail,
            pooling: Ignored(pooling_kind),
            head,
            d_input: self.d_input,
        })
    }

    fn init_tail<B: Backend>(&self, kind: TailKind, device: &B::Device) -> GroundingResult<TailEncoder<B>> {
        let cell = match kind {
            TailKind::Lstm => CellKind::Lstm,
            TailKind::Gru  => CellKind::Gru,
            TailKind::Identity => {
                return Ok(TailEncoder { kind: Ignored(kind), recurrent: None, d_output: self.d_input });
            }
        };
        let recurrent = RecurrentEncoderConfig::new(self.d_input, self.tail_hidden_size)
            .with_cell(cell)
            .with_num_layers(self.tail_layers)
            .with_bidirectional(self.bidirectional)
            .init(device)?;
        let d_output = recurrent.output_size();
        Ok(TailEncoder { kind: Ignored(kind), recurrent: Some(recurrent), d_output })
    }

    fn init_head<B: Backend>(
        &self,
        kind:     HeadKind,
        d_pooled: usize,
        device:   &B::Device,
    ) -> GroundingResult<HeadTransform<B>> {
        let (hidden, output) = match kind {
            HeadKind::Mlp => (
                Some(LinearConfig::new(d_pooled, self.head_hidden_size).init(device)),
                Some(LinearConfig::new(self.head_hidden_size, self.d_filter).init(device)),
            ),
            HeadKind::Linear => (None, Some(LinearConfig::new(d_pooled, self.d_filter).init(device))),
            HeadKind::Identity => {
                if d_pooled != self.d_filter {
                    return Err(GroundingError::shape("identity head width", self.d_filter, d_pooled));
                }
                (None, None)
            }
        };
        Ok(HeadTransform { kind: Ignored(kind), hidden, output, d_output: self.d_filter })
    }
}

// ─── TailEncoder ──────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct TailEncoder<B: Backend> {
    kind:      Ignored<TailKind>,
    recurrent: Option<RecurrentEncoder<B>>,
    d_output:  usize,
}

impl<B: Backend> TailEncoder<B> {
    pub fn kind(&self) -> TailKind {
        self.kind.0
    }
}

impl<B: Backend> SequenceEncoder<B> for TailEncoder<B> {
    fn encode(&self, sequence: Tensor<B, 3>, mask: Tensor<B, 2>) -> Tensor<B, 3> {
        match &self.recurrent {
            Some(rnn) => rnn.forward(sequence, mask),
            None => sequence,
        }
    }

    fn encoded_size(&self) -> usize {
        self.d_output
    }
}

// ─── Pooling ──────────────────────────────────────────────────────────────────
impl<B: Backend> SequenceReducer<B> for PoolingKind {
    fn reduce(
        &self,
        sequence: Tensor<B, 3>,
        mask:     Tensor<B, 2>,
        lengths:  &[usize],
    ) -> GroundingResult<Tensor<B, 2>> {
        let [batch, steps, width] = sequence.dims();
        let device = sequence.device();

        let pooled = match self {
            PoolingKind::Mean => {
                let summed = (sequence * mask.unsqueeze_dim::<3>(2)).sum_dim(1).reshape([batch, width]);
                summed / length_column::<B>(lengths, &device)
            }
            PoolingKind::Max => {
                // invalid steps are pushed to MASK_FILL_VALUE before the max
                let penalty = mask.sub_scalar(1.0).mul_scalar(-MASK_FILL_VALUE);
                (sequence + penalty.unsqueeze_dim::<3>(2)).max_dim(1).reshape([batch, width])
            }
            PoolingKind::Last => {
                let selector = last_step_selector::<B>(lengths, steps, &device)?;
                (sequence * selector.unsqueeze_dim::<3>(2)).sum_dim(1).reshape([batch, width])
            }
        };
        Ok(pooled)
    }
}

// ─── HeadTransform ────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct HeadTransform<B: Backend> {
    kind:     Ignored<HeadKind>,
    hidden:   Option<Linear<B>>,
    output:   Option<Linear<B>>,
    d_output: usize,
}

impl<B: Backend> HeadTransform<B> {
    pub fn kind(&self) -> HeadKind {
        self.kind.0
    }
}

impl<B: Backend> VectorTransform<B> for HeadTransform<B> {
    fn transform(&self, vector: Tensor<B, 2>) -> Tensor<B, 2> {
        match (&self.hidden, &self.output) {
            (Some(hidden), Some(output)) => output.forward(relu(hidden.forward(vector))),
            (None, Some(output)) => output.forward(vector),
            _ => vector,
        }
    }

    fn transformed_size(&self) -> usize {
        self.d_output
    }
}

// ─── QueryDistiller ───────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct QueryDistiller<B: Backend> {
    tail:    TailEncoder<B>,
    pooling: Ignored<PoolingKind>,
    head:    HeadTransform<B>,
    d_input: usize,
}

impl<B: Backend> QueryDistiller<B> {
    /// tokens: [batch, max_tokens, d_input] → (filter [batch, d_filter], lengths)
    ///
    /// Lengths pass through unchanged; the attention scorer needs them
    /// for its 1/√length scaling.
    pub fn distill<'a>(
        &self,
        tokens:  Tensor<B, 3>,
        lengths: &'a [usize],
    ) -> GroundingResult<(Tensor<B, 2>, &'a [usize])> {
        let [batch, steps, width] = tokens.dims();
        if width != self.d_input {
            return Err(GroundingError::shape("query token width", self.d_input, width));
        }
        if lengths.len() != batch {
            return Err(GroundingError::shape("query lengths", batch, lengths.len()));
        }

        let mask    = sequence_mask::<B>(lengths, steps, &tokens.device())?;
        let encoded = self.tail.encode(tokens, mask.clone());
        let pooled  = self.pooling.0.reduce(encoded, mask, lengths)?;
        Ok((self.head.transform(pooled), lengths))
    }

    pub fn filter_size(&self) -> usize {
        self.head.transformed_size()
    }

    pub fn strategies(&self) -> (TailKind, PoolingKind, HeadKind) {
        (self.tail.kind(), self.pooling.0, self.head.kind())
    }
}
