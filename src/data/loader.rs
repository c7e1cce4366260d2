// ============================================================
// Layer 4 — JSON Sample Loader
// ============================================================
// Reads and writes grounding samples as a JSON array of
// GroundingSample objects:
//
//   [
//     { "id": "v1#0",
//       "video_features": [[..D_in..], ...],
//       "query_tokens":   [[..D_tok..], ...],
//       "start_target":   [...], "end_target": [...],
//       "localization":   [...] },
//     ...
//   ]
//
// Reference: serde_json crate documentation
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use std::{fs, path::{Path, PathBuf}};

use crate::domain::sample::GroundingSample;
use crate::domain::traits::SampleSource;

/// Loads samples from one JSON file.
/// Implements the SampleSource trait from Layer 3.
pub struct JsonSampleLoader {
    path: PathBuf,
}

impl JsonSampleLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Write samples to `path` as pretty JSON, creating parent directories.
    pub fn save(path: impl AsRef<Path>, samples: &[GroundingSample]) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create directory '{}'", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(samples)?;
        fs::write(path, json)
            .with_context(|| format!("Cannot write samples to '{}'", path.display()))?;
        tracing::info!("Wrote {} samples to {}", samples.len(), path.display());
        Ok(())
    }
}

impl SampleSource for JsonSampleLoader {
    fn load_all(&self) -> Result<Vec<GroundingSample>> {
        let json = fs::read_to_string(&self.path)
            .with_context(|| format!("Cannot read samples from '{}'", self.path.display()))?;
        let samples: Vec<GroundingSample> = serde_json::from_str(&json)
            .with_context(|| format!("Cannot parse samples in '{}'", self.path.display()))?;

        if samples.is_empty() {
            tracing::warn!("Sample file '{}' is empty", self.path.display());
        }
        tracing::info!("Loaded {} samples from {}", samples.len(), self.path.display());
        Ok(samples)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> GroundingSample {
        GroundingSample {
            id:             "clip-7".into(),
            video_features: vec![vec![0.25, -1.0]; 3],
            query_tokens:   vec![vec![0.5]; 2],
            start_target:   vec![1.0, 0.0, 0.0],
            end_target:     vec![0.0, 0.0, 1.0],
            localization:   vec![1.0, 1.0, 1.0],
        }
    }

    #[test]
    fn test_saved_file_loads_back() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("samples.json");
        JsonSampleLoader::save(&path, &[sample()]).unwrap();

        let loaded = JsonSampleLoader::new(&path).load_all().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, "clip-7");
        assert_eq!(loaded[0].video_features, vec![vec![0.25, -1.0]; 3]);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = JsonSampleLoader::new(dir.path().join("absent.json")).load_all().unwrap_err();
        assert!(err.to_string().contains("Cannot read samples"));
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();
        let err = JsonSampleLoader::new(&path).load_all().unwrap_err();
        assert!(err.to_string().contains("Cannot parse samples"));
    }
}
