// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All tensor code lives here. The domain layer above stays
// framework-free; the data layer only builds tensors for it.
//
// Pipeline for one batch:
//
//   query tokens ─► distiller ─► filter vector ──┐
//                                                ├─► attention ─┐
//   clip features ─► reduction (D_in → D_f) ─────┘              │
//                                                               ▼
//           boundary predictor ◄── context encoder ◄── weighted clips
//                   │
//                   ▼
//        pred_start / pred_end ─► loss accumulator ─► decoder
//
// Every stage takes the video mask: padded clips never change
// the outputs for valid clips.
//
// Reference: Burn Book §3 (Building Blocks)
//            Rodriguez-Opazo et al. (2020) Proposal-free Temporal Moment
//            Localization of a Natural-Language Query in Video

/// Sequence masks and length validation
pub mod mask;

/// Masked softmax with the two masking strategies
pub mod normalizer;

/// Encoder / reducer / transform seams
pub mod traits;

/// Masked GRU and LSTM stacks
pub mod recurrent;

/// Query tokens → one filter vector (tail, pooling, head)
pub mod distiller;

/// Query-conditioned attention over clips
pub mod attention;

/// Bidirectional GRU over the weighted clips
pub mod context;

/// Per-clip start / end distributions
pub mod boundary;

/// KL boundary losses plus attention regularisation
pub mod loss;

/// The assembled grounding model
pub mod model;

/// Best-span search over boundary distributions
pub mod decoder;
