//! # Loopadrine Common Library
//!
//! Workspace state machine shared by the Loopadrine tools:
//! - Configuration loading (directory layout, tool paths, logging)
//! - Error types
//! - Filesystem seam (real filesystem + in-memory fake)
//! - Filename sanitizer
//! - File mover and workspace cleaner
//! - Track stages and their directory transitions

pub mod cleaner;
pub mod config;
pub mod error;
pub mod fs_ops;
pub mod mover;
pub mod sanitizer;
pub mod track;

pub use cleaner::{ClearOptions, ClearReport, WorkspaceCleaner};
pub use config::{LoggingConfig, TomlConfig, ToolPaths, WorkspaceConfig};
pub use error::{Error, Result};
pub use fs_ops::{FileOps, MemoryFs, RealFs};
pub use track::{Track, TrackStage};
