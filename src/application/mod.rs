// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers to accomplish one workflow:
// building a checkpoint, generating samples, or evaluating.
//
// Rules for this layer:
//   - No tensor math or model code here
//   - No UI or printing here (that's Layer 1)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Fresh model → checkpoint
pub mod init_use_case;

// Seeded synthetic sample file
pub mod synth_use_case;

// Checkpoint + samples → metrics
pub mod evaluate_use_case;
