// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by the application layer:
//
//   checkpoint.rs — Saving and loading model weights with Burn's
//                   CompactRecorder, plus the model config as
//                   JSON so the architecture can be rebuilt.
//
//   metrics.rs    — Per-example evaluation rows written to a
//                   CSV file, and the mIoU / R@1 summary.
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Evaluation metrics CSV logger and summary
pub mod metrics;
