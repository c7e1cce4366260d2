// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer only sees `SampleSource`, so a JSON file
// on disk and the seeded synthetic generator are interchangeable.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;

use crate::domain::sample::GroundingSample;

// ─── SampleSource ─────────────────────────────────────────────────────────────
/// Any component that can produce grounding samples.
///
/// Implementations:
///   - JsonSampleLoader → reads samples from a JSON file
///   - SyntheticSource  → generates seeded random samples
pub trait SampleSource {
    /// Load all available samples from this source.
    fn load_all(&self) -> Result<Vec<GroundingSample>>;
}
