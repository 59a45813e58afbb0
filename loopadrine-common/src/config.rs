//! Configuration loading and workspace layout
//!
//! The directory layout and tool locations used to be fixed constants; they are
//! now an immutable [`WorkspaceConfig`] handed to every component. A TOML
//! bootstrap file may override any field. Resolution priority:
//! 1. `loopadrine.toml` in the current directory (highest priority)
//! 2. `<user config dir>/loopadrine/config.toml`
//! 3. Compiled defaults (fallback)
//!
//! A missing file is never fatal. A file that exists but cannot be read or
//! parsed is a configuration error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::fs_ops::FileOps;
use crate::{Error, Result};

/// File name looked up in the current directory
pub const LOCAL_CONFIG_FILE: &str = "loopadrine.toml";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Directory layout, file extensions and tool locations
    pub workspace: WorkspaceConfig,

    /// Logging configuration (optional)
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Directory layout and file conventions for one workspace
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Raw audio that already went through loop detection
    pub processed_dir: PathBuf,
    /// Raw audio waiting for loop detection
    pub downloads_dir: PathBuf,
    /// Finished streamed-audio files
    pub output_dir: PathBuf,
    /// Converted files the operator wants re-looped
    pub redo_dir: PathBuf,
    /// Where the loop finder writes its annotation file
    pub loop_output_dir: PathBuf,
    /// Name of the shared loop annotation file
    pub loop_filename: String,
    /// Line-oriented list of download sources
    pub song_list: PathBuf,
    /// Raw audio extension, including the leading dot
    pub raw_ext: String,
    /// Streamed audio extension, including the leading dot
    pub output_ext: String,
    /// External tool locations
    pub tools: ToolPaths,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        let downloads_dir = PathBuf::from("./~downloads/");
        Self {
            processed_dir: PathBuf::from("./~processed/"),
            loop_output_dir: downloads_dir.join("LooperOutput"),
            downloads_dir,
            output_dir: PathBuf::from("./~output/"),
            redo_dir: PathBuf::from("./~redo/"),
            loop_filename: "loop.txt".to_string(),
            song_list: PathBuf::from("songs.txt"),
            raw_ext: ".wav".to_string(),
            output_ext: ".brstm".to_string(),
            tools: ToolPaths::default(),
        }
    }
}

/// Locations of the three external collaborators
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    /// Downloader executable
    pub downloader: PathBuf,
    /// Loop finder program followed by its leading arguments
    pub looper: Vec<String>,
    /// Converter installation directory; the converter runs from here
    pub converter_dir: PathBuf,
    /// Converter executable name, resolved inside `converter_dir` first
    pub converter: String,
    /// Subdirectory of `converter_dir` the converter writes into
    pub converter_output_subdir: String,
    /// Upper bound for a single tool invocation (unbounded when absent)
    pub timeout_secs: Option<u64>,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            downloader: PathBuf::from("Tools/yt-dlp/yt-dlp"),
            looper: vec![
                "python".to_string(),
                "-m".to_string(),
                "pymusiclooper".to_string(),
            ],
            converter_dir: PathBuf::from("Tools/LoopingAudioConverter/"),
            converter: "LoopingAudioConverter".to_string(),
            converter_output_subdir: "output".to_string(),
            timeout_secs: None,
        }
    }
}

impl ToolPaths {
    /// Invocation timeout, `None` means wait indefinitely
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl WorkspaceConfig {
    /// The four stage directories that must exist before a run
    pub fn stage_dirs(&self) -> [&Path; 4] {
        [
            &self.processed_dir,
            &self.downloads_dir,
            &self.output_dir,
            &self.redo_dir,
        ]
    }

    /// Loop annotation file where the loop finder leaves it
    pub fn loop_file_at_finder(&self) -> PathBuf {
        self.loop_output_dir.join(&self.loop_filename)
    }

    /// Loop annotation file where the converter expects it
    pub fn loop_file_at_converter(&self) -> PathBuf {
        self.tools.converter_dir.join(&self.loop_filename)
    }

    /// Directory the converter deposits streamed-audio files into
    pub fn converter_output_dir(&self) -> PathBuf {
        self.tools.converter_dir.join(&self.tools.converter_output_subdir)
    }

    /// Create any missing stage directory
    pub fn ensure_directories(&self, fs: &impl FileOps) -> Result<()> {
        for dir in self.stage_dirs() {
            if !fs.exists(dir) {
                tracing::info!(dir = %dir.display(), "Creating workspace directory");
                fs.create_dir_all(dir)?;
            }
        }
        Ok(())
    }

    /// Reject layouts the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        for (key, ext) in [("raw_ext", &self.raw_ext), ("output_ext", &self.output_ext)] {
            if ext.len() < 2 || !ext.starts_with('.') {
                return Err(Error::Config(format!(
                    "{} must be a dot-prefixed extension, got {:?}",
                    key, ext
                )));
            }
        }
        if self.raw_ext.eq_ignore_ascii_case(&self.output_ext) {
            return Err(Error::Config(
                "raw_ext and output_ext must differ".to_string(),
            ));
        }
        if self.loop_filename.trim().is_empty() {
            return Err(Error::Config("loop_filename must not be empty".to_string()));
        }
        if self.tools.looper.is_empty() {
            return Err(Error::Config(
                "tools.looper must name at least the program".to_string(),
            ));
        }
        Ok(())
    }
}

/// Where the active configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// `loopadrine.toml` next to the workspace
    LocalFile(PathBuf),
    /// Per-user configuration file
    UserFile(PathBuf),
    /// No file found, compiled defaults in use
    Defaults,
}

impl TomlConfig {
    /// Parse and validate a configuration file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        let config: TomlConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
        config.workspace.validate()?;
        Ok(config)
    }

    /// Resolve configuration for the current process
    pub fn resolve() -> Result<(Self, ConfigSource)> {
        let user_config_dir = dirs::config_dir().map(|d| d.join("loopadrine"));
        Self::resolve_from(Path::new("."), user_config_dir.as_deref())
    }

    /// Resolve configuration from explicit search locations
    pub fn resolve_from(
        local_dir: &Path,
        user_config_dir: Option<&Path>,
    ) -> Result<(Self, ConfigSource)> {
        // Priority 1: file next to the workspace
        let local = local_dir.join(LOCAL_CONFIG_FILE);
        if local.is_file() {
            return Ok((Self::load_from(&local)?, ConfigSource::LocalFile(local)));
        }

        // Priority 2: per-user config
        if let Some(dir) = user_config_dir {
            let user = dir.join("config.toml");
            if user.is_file() {
                return Ok((Self::load_from(&user)?, ConfigSource::UserFile(user)));
            }
        }

        // Priority 3: compiled defaults
        Ok((Self::default(), ConfigSource::Defaults))
    }
}
