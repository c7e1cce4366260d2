// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands: `init`, `synth` and `evaluate`
// and all their configurable flags.
//
// Reference: Rust Book §12 (Building a CLI Program)

use anyhow::{Context, Result};
use clap::{Args, Subcommand, ValueEnum};
use std::{fs, path::PathBuf};

use crate::application::evaluate_use_case::EvaluateConfig;
use crate::application::init_use_case::InitConfig;
use crate::data::synthetic::SyntheticConfig;
use crate::ml::decoder::DEFAULT_MAX_SPAN;
use crate::ml::model::GroundingModelConfig;
use crate::ml::normalizer::MaskingStrategy;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a freshly initialised model and save it as a checkpoint
    Init(InitArgs),

    /// Generate a synthetic sample file for smoke tests
    Synth(SynthArgs),

    /// Evaluate a checkpoint on a sample file
    Evaluate(EvaluateArgs),
}

/// Compute device for tensor work
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceKind {
    /// NdArray backend
    Cpu,
    /// Wgpu backend
    Gpu,
}

/// How padded positions are excluded from the softmax
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum MaskingArg {
    Multiply,
    Fill,
}

impl From<MaskingArg> for MaskingStrategy {
    fn from(m: MaskingArg) -> Self {
        match m {
            MaskingArg::Multiply => MaskingStrategy::Multiply,
            MaskingArg::Fill     => MaskingStrategy::Fill,
        }
    }
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Directory to write model_config.json and weights to
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    /// Read the whole model config from this JSON file instead of flags
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Width of each clip feature vector (D_in)
    #[arg(long, required_unless_present = "config")]
    pub video_input_size: Option<usize>,

    /// Width of each query token embedding (D_tok)
    #[arg(long, required_unless_present = "config")]
    pub query_input_size: Option<usize>,

    /// Width of the query filter and the reduced clip features (D_f)
    #[arg(long, default_value_t = 512)]
    pub filter_size: usize,

    /// Per-direction hidden width of the context GRU
    #[arg(long, default_value_t = 256)]
    pub hidden_size: usize,

    #[arg(long, default_value_t = 2)]
    pub num_layers: usize,

    #[arg(long, default_value_t = 0.5)]
    pub dropout: f64,

    /// Query tail encoder: lstm, gru or identity
    #[arg(long, default_value = "lstm")]
    pub tail_model: String,

    #[arg(long, default_value_t = 256)]
    pub tail_hidden_size: usize,

    /// Query pooling: mean, max or last
    #[arg(long, default_value = "mean")]
    pub pooling: String,

    /// Query head: mlp, linear or identity
    #[arg(long, default_value = "mlp")]
    pub head_model: String,

    #[arg(long, default_value_t = 512)]
    pub head_hidden_size: usize,

    #[arg(long, value_enum, default_value_t = MaskingArg::Multiply)]
    pub masking: MaskingArg,

    /// Leave the attention regulariser out of total_loss
    #[arg(long)]
    pub no_attention_loss: bool,

    /// Seed for parameter initialisation
    #[arg(long)]
    pub seed: Option<u64>,

    #[arg(long, value_enum, default_value_t = DeviceKind::Cpu)]
    pub device: DeviceKind,
}

/// Convert CLI InitArgs into the application-layer InitConfig.
impl TryFrom<InitArgs> for InitConfig {
    type Error = anyhow::Error;

    fn try_from(a: InitArgs) -> Result<Self> {
        let model = match &a.config {
            Some(path) => {
                let json = fs::read_to_string(path)
                    .with_context(|| format!("Cannot read model config '{}'", path.display()))?;
                serde_json::from_str(&json)
                    .with_context(|| format!("Cannot parse model config '{}'", path.display()))?
            }
            None => {
                let video = a.video_input_size.context("--video-input-size is required")?;
                let query = a.query_input_size.context("--query-input-size is required")?;
                GroundingModelConfig::new(video, query)
                    .with_filter_size(a.filter_size)
                    .with_hidden_size(a.hidden_size)
                    .with_num_layers(a.num_layers)
                    .with_dropout(a.dropout)
                    .with_tail_model(a.tail_model)
                    .with_tail_hidden_size(a.tail_hidden_size)
                    .with_pooling(a.pooling)
                    .with_head_model(a.head_model)
                    .with_head_hidden_size(a.head_hidden_size)
                    .with_masking(a.masking.into())
                    .with_attention_loss(!a.no_attention_loss)
            }
        };
        Ok(InitConfig { checkpoint_dir: a.checkpoint_dir, model, seed: a.seed })
    }
}

#[derive(Args, Debug)]
pub struct SynthArgs {
    /// Output JSON file
    #[arg(long, default_value = "data/samples.json")]
    pub output: PathBuf,

    #[arg(long, default_value_t = 32)]
    pub count: usize,

    #[arg(long, default_value_t = 64)]
    pub video_dim: usize,

    #[arg(long, default_value_t = 32)]
    pub query_dim: usize,

    #[arg(long, default_value_t = 8)]
    pub min_clips: usize,

    #[arg(long, default_value_t = 32)]
    pub max_clips: usize,

    #[arg(long, default_value_t = 3)]
    pub min_tokens: usize,

    #[arg(long, default_value_t = 12)]
    pub max_tokens: usize,

    /// Standard deviation of the boundary targets, in clips
    #[arg(long, default_value_t = 1.0)]
    pub sigma: f32,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

impl From<&SynthArgs> for SyntheticConfig {
    fn from(a: &SynthArgs) -> Self {
        SyntheticConfig {
            count:      a.count,
            video_dim:  a.video_dim,
            query_dim:  a.query_dim,
            min_clips:  a.min_clips,
            max_clips:  a.max_clips,
            min_tokens: a.min_tokens,
            max_tokens: a.max_tokens,
            sigma:      a.sigma,
            seed:       a.seed,
        }
    }
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Directory written by `init`; metrics.csv is appended here
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    /// JSON sample file
    #[arg(long, default_value = "data/samples.json")]
    pub samples: PathBuf,

    #[arg(long, default_value_t = 8)]
    pub batch_size: usize,

    /// Widest moment the decoder may return, in clips
    #[arg(long, default_value_t = DEFAULT_MAX_SPAN)]
    pub max_span: usize,

    /// Write per-example distributions to this JSON file
    #[arg(long)]
    pub dump: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = DeviceKind::Cpu)]
    pub device: DeviceKind,
}

impl From<&EvaluateArgs> for EvaluateConfig {
    fn from(a: &EvaluateArgs) -> Self {
        EvaluateConfig {
            checkpoint_dir: a.checkpoint_dir.clone(),
            samples_path:   a.samples.clone(),
            batch_size:     a.batch_size,
            max_span:       a.max_span,
            dump_path:      a.dump.clone(),
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_init_flags_build_model_config() {
        let cli = Cli::try_parse_from([
            "moment-grounding", "init",
            "--video-input-size", "500",
            "--query-input-size", "300",
            "--pooling", "max",
            "--masking", "fill",
            "--no-attention-loss",
        ])
        .unwrap();
        let Commands::Init(args) = cli.command else { panic!("expected init") };
        let cfg = InitConfig::try_from(args).unwrap();
        assert_eq!(cfg.model.video_input_size, 500);
        assert_eq!(cfg.model.pooling, "max");
        assert_eq!(cfg.model.masking, MaskingStrategy::Fill);
        assert!(!cfg.model.attention_loss);
        assert_eq!(cfg.model.filter_size, 512);
    }

    #[test]
    fn test_init_requires_sizes_without_config() {
        assert!(Cli::try_parse_from(["moment-grounding", "init"]).is_err());
    }

    #[test]
    fn test_init_reads_config_file() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let cfg  = GroundingModelConfig::new(10, 20).with_head_model("linear".into());
        fs::write(&path, serde_json::to_string(&cfg).unwrap()).unwrap();

        let cli = Cli::try_parse_from([
            "moment-grounding", "init", "--config", path.to_str().unwrap(),
        ])
        .unwrap();
        let Commands::Init(args) = cli.command else { panic!("expected init") };
        let loaded = InitConfig::try_from(args).unwrap();
        assert_eq!(loaded.model.query_input_size, 20);
        assert_eq!(loaded.model.head_model, "linear");
    }

    #[test]
    fn test_evaluate_device_flag() {
        let cli = Cli::try_parse_from(["moment-grounding", "evaluate", "--device", "gpu"]).unwrap();
        let Commands::Evaluate(args) = cli.command else { panic!("expected evaluate") };
        assert_eq!(args.device, DeviceKind::Gpu);
        assert_eq!(EvaluateConfig::from(&args).max_span, DEFAULT_MAX_SPAN);
    }
}
