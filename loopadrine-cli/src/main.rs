//! loopadrine - music loop pipeline
//!
//! Downloads the song list, finds loop points, converts every track into a
//! looping streamed-audio file and files the results under the workspace
//! directories. `--redo` re-loops converted files staged in the redo folder;
//! `--skip` bypasses loop point generation.

use anyhow::{Context, Result};
use clap::Parser;
use loopadrine::collaborators::{LoopingAudioConverter, PyMusicLooper, YtDlp};
use loopadrine::{logging, ConsolePrompt, Operator, Pipeline, PipelineOutcome, RunOptions, Tools};
use loopadrine_common::config::{ConfigSource, TomlConfig};
use loopadrine_common::RealFs;
use tracing::info;

/// Command-line arguments for loopadrine
#[derive(Parser, Debug)]
#[command(name = "loopadrine")]
#[command(about = "Download, loop and convert music into looping streamed audio")]
#[command(version)]
struct Args {
    /// Redo song loops
    #[arg(short, long)]
    redo: bool,

    /// Skip generating loop file
    #[arg(short, long)]
    skip: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let (config, source) = TomlConfig::resolve().context("Failed to load configuration")?;
    logging::init_tracing(&config.logging)?;

    info!(
        "Starting loopadrine v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &source {
        ConfigSource::LocalFile(path) | ConfigSource::UserFile(path) => {
            info!("Configuration: {}", path.display())
        }
        ConfigSource::Defaults => info!("No configuration file found, using defaults"),
    }

    let workspace = &config.workspace;
    let downloader = YtDlp::from_config(workspace);
    let loop_finder = PyMusicLooper::from_config(workspace);
    let converter = LoopingAudioConverter::from_config(workspace);
    let operator = ConsolePrompt::stdio();

    let tools = Tools {
        downloader: &downloader,
        loop_finder: &loop_finder,
        converter: &converter,
        operator: &operator,
    };

    let mut pipeline = Pipeline::new(workspace, &RealFs, tools);
    let outcome = pipeline
        .run(RunOptions {
            redo: args.redo,
            skip_loops: args.skip,
        })
        .context("Pipeline failed")?;

    match outcome {
        PipelineOutcome::NothingToProcess => operator.announce("There are no files to process!")?,
        PipelineOutcome::Completed { tracks } => {
            info!("{} looping file(s) in {}", tracks.len(), workspace.output_dir.display())
        }
    }

    Ok(())
}
