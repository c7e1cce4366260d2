// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Takes samples from disk (or a generator) all the way to
// padded tensor batches:
//
//   JSON file / SyntheticSource   → Vec<GroundingSample>
//       │
//       ▼
//   GroundingDataset              → validated, implements Dataset
//       │
//       ▼
//   GroundingBatcher              → dynamic padding + lengths
//       │
//       ▼
//   DataLoader                    → feeds batches to evaluation
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads and writes samples as JSON
pub mod loader;

/// Seeded random samples for smoke tests
pub mod synthetic;

/// Implements Burn's Dataset trait for grounding samples
pub mod dataset;

/// Implements Burn's Batcher trait with dynamic padding
pub mod batcher;
