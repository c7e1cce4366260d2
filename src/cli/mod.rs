// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with `clap`.
// All workflow logic is delegated to Layer 2 (application).
//
// Three commands are supported:
//   1. `init`     — build a model and save it as a checkpoint
//   2. `synth`    — write a synthetic sample file
//   3. `evaluate` — run a checkpoint over a sample file
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use burn::backend::{
    ndarray::NdArrayDevice,
    wgpu::WgpuDevice,
    NdArray, Wgpu,
};
use commands::{Commands, DeviceKind, EvaluateArgs, InitArgs, SynthArgs};

#[derive(Parser, Debug)]
#[command(
    name = "moment-grounding",
    version = "0.1.0",
    about = "Localise the video moment described by a natural-language query."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Init(args)     => run_init(args),
            Commands::Synth(args)    => run_synth(args),
            Commands::Evaluate(args) => run_evaluate(args),
        }
    }
}

fn run_init(args: InitArgs) -> Result<()> {
    use crate::application::init_use_case::InitUseCase;

    let device   = args.device;
    let use_case = InitUseCase::new(args.try_into()?);
    match device {
        DeviceKind::Cpu => use_case.execute::<NdArray>(&NdArrayDevice::Cpu)?,
        DeviceKind::Gpu => use_case.execute::<Wgpu>(&WgpuDevice::default())?,
    }

    println!("Checkpoint initialised.");
    Ok(())
}

fn run_synth(args: SynthArgs) -> Result<()> {
    use crate::application::synth_use_case::SynthUseCase;

    let written = SynthUseCase::new((&args).into(), &args.output).execute()?;
    println!("Wrote {} samples to {}", written, args.output.display());
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;
    use crate::infra::metrics::RECALL_THRESHOLDS;

    tracing::info!("Evaluating '{}' on {:?}", args.samples.display(), args.device);

    let use_case = EvaluateUseCase::new((&args).into());
    let summary  = match args.device {
        DeviceKind::Cpu => use_case.execute::<NdArray>(&NdArrayDevice::Cpu)?,
        DeviceKind::Gpu => use_case.execute::<Wgpu>(&WgpuDevice::default())?,
    };

    println!("\nExamples:  {}", summary.examples);
    println!("Mean loss: {:.4}", summary.mean_loss);
    println!("mIoU:      {:.4}", summary.mean_iou);
    for (tau, recall) in RECALL_THRESHOLDS.iter().zip(&summary.recall_at_1) {
        println!("R@1 IoU≥{tau:.1}: {:.4}", recall);
    }
    Ok(())
}
