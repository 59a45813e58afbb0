//! loopadrine library - download, loop and convert pipeline
//!
//! The binary wires the real tools into [`pipeline::Pipeline`]; tests wire in
//! fakes and an in-memory filesystem.

pub mod collaborators;
pub mod logging;
pub mod operator;
pub mod pipeline;
pub mod workdir;

pub use collaborators::{Converter, Downloader, LoopFinder, LoopMode};
pub use operator::{ConsolePrompt, Operator};
pub use pipeline::{Pipeline, PipelineOutcome, PipelineState, RunOptions, Tools};
