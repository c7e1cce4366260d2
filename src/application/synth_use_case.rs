// ============================================================
// Layer 2 — SynthUseCase
// ============================================================
// Generates a synthetic sample file for smoke-testing:
//
//   Step 1: Generate seeded samples    (Layer 4 - data)
//   Step 2: Validate them              (Layer 3 - domain)
//   Step 3: Write them as JSON         (Layer 4 - data)

use anyhow::Result;
use std::path::PathBuf;

use crate::data::loader::JsonSampleLoader;
use crate::data::synthetic::{SyntheticConfig, SyntheticSource};
use crate::domain::traits::SampleSource;

pub struct SynthUseCase {
    config: SyntheticConfig,
    output: PathBuf,
}

impl SynthUseCase {
    pub fn new(config: SyntheticConfig, output: impl Into<PathBuf>) -> Self {
        Self { config, output: output.into() }
    }

    /// Returns the number of samples written.
    pub fn execute(&self) -> Result<usize> {
        // ── Step 1: Generate ──────────────────────────────────────────────────
        let samples = SyntheticSource::new(self.config.clone()).load_all()?;

        // ── Step 2: Validate ──────────────────────────────────────────────────
        for sample in &samples {
            sample.validate(self.config.video_dim, self.config.query_dim)?;
        }

        // ── Step 3: Write ─────────────────────────────────────────────────────
        JsonSampleLoader::save(&self.output, &samples)?;
        Ok(samples.len())
    }
}
