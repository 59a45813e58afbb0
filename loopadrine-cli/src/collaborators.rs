//! External tool adapters
//!
//! The pipeline drives three command-line tools:
//! - yt-dlp downloads the song list as raw audio
//! - pymusiclooper finds loop points and appends them to the shared loop file
//! - LoopingAudioConverter turns raw audio plus loop points into streamed audio
//!
//! Each call blocks until the tool exits. Every call takes an optional timeout;
//! `None` waits indefinitely. A tool that cannot be started, exits
//! unsuccessfully or overruns its timeout is reported as an error.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus};
use std::time::{Duration, Instant};

use loopadrine_common::{Error, Result, WorkspaceConfig};
use tracing::{debug, warn};

/// How often a bounded invocation checks whether the tool has exited
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Loop point search mode, chosen once per batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopMode {
    /// Operator picks among candidate loop points
    Interactive,
    /// Best candidate is exported without asking
    Automatic,
}

/// Fills the downloads directory from a song list
pub trait Downloader {
    fn download(&self, song_list: &Path, dest_dir: &Path, timeout: Option<Duration>) -> Result<()>;
}

/// Appends loop points for one file to the shared loop annotation file
pub trait LoopFinder {
    fn find_loops(&self, file: &Path, mode: LoopMode, timeout: Option<Duration>) -> Result<()>;
}

/// Converts one raw-audio file into a streamed-audio file
pub trait Converter {
    /// Directory the converter must be run from, if any
    fn working_dir(&self) -> Option<&Path>;

    fn convert(&self, file: &Path, timeout: Option<Duration>) -> Result<()>;
}

/// Run a tool to completion, optionally bounded by `timeout`
pub fn run_tool(tool: &str, command: &mut Command, timeout: Option<Duration>) -> Result<()> {
    debug!(tool, command = ?command, "Spawning external tool");

    let mut child = command.spawn().map_err(|e| Error::Collaborator {
        tool: tool.to_string(),
        message: format!("could not start: {}", e),
    })?;

    let status = match timeout {
        None => child.wait()?,
        Some(limit) => wait_with_timeout(tool, &mut child, limit)?,
    };

    if status.success() {
        Ok(())
    } else {
        Err(Error::Collaborator {
            tool: tool.to_string(),
            message: format!("exited with {}", status),
        })
    }
}

fn wait_with_timeout(tool: &str, child: &mut Child, limit: Duration) -> Result<ExitStatus> {
    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }

        let elapsed = started.elapsed();
        if elapsed >= limit {
            warn!(tool, ?limit, "External tool timed out, killing it");
            // Already-exited children make kill fail; the wait reaps either way
            let _ = child.kill();
            let _ = child.wait();
            return Err(Error::Timeout {
                tool: tool.to_string(),
                after: limit,
            });
        }

        std::thread::sleep(POLL_INTERVAL.min(limit - elapsed));
    }
}

/// yt-dlp downloader
#[derive(Debug, Clone)]
pub struct YtDlp {
    program: PathBuf,
    audio_format: String,
}

impl YtDlp {
    pub fn new(program: PathBuf, audio_format: impl Into<String>) -> Self {
        Self {
            program,
            audio_format: audio_format.into(),
        }
    }

    /// Downloader extracting audio in the workspace's raw format
    pub fn from_config(config: &WorkspaceConfig) -> Self {
        Self::new(
            config.tools.downloader.clone(),
            config.raw_ext.trim_start_matches('.'),
        )
    }
}

impl Downloader for YtDlp {
    fn download(&self, song_list: &Path, dest_dir: &Path, timeout: Option<Duration>) -> Result<()> {
        if !song_list.is_file() {
            return Err(Error::InvalidInput(format!(
                "song list not found: {}",
                song_list.display()
            )));
        }

        // Name files by title only so redo matching works on the base name
        let mut command = Command::new(&self.program);
        command
            .arg("--extract-audio")
            .args(["--audio-format", self.audio_format.as_str()])
            .arg("--paths")
            .arg(dest_dir)
            .arg("--batch-file")
            .arg(song_list)
            .args(["-o", "%(title)s"]);

        run_tool("yt-dlp", &mut command, timeout)
    }
}

/// pymusiclooper loop finder
#[derive(Debug, Clone)]
pub struct PyMusicLooper {
    /// Program followed by its leading arguments, e.g. `python -m pymusiclooper`
    command: Vec<String>,
}

impl PyMusicLooper {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }

    pub fn from_config(config: &WorkspaceConfig) -> Self {
        Self::new(config.tools.looper.clone())
    }

    /// Arguments following the program for one file
    pub fn arguments(&self, file: &Path, mode: LoopMode) -> Vec<String> {
        let mut args: Vec<String> = self.command.iter().skip(1).cloned().collect();
        if mode == LoopMode::Interactive {
            args.push("-i".to_string());
        }
        args.extend([
            "export-points".to_string(),
            "--path".to_string(),
            file.to_string_lossy().into_owned(),
            "--export-to".to_string(),
            "txt".to_string(),
        ]);
        args
    }
}

impl LoopFinder for PyMusicLooper {
    fn find_loops(&self, file: &Path, mode: LoopMode, timeout: Option<Duration>) -> Result<()> {
        let program = self.command.first().ok_or_else(|| {
            Error::Config("loop finder command is empty".to_string())
        })?;

        let mut command = Command::new(program);
        command.args(self.arguments(file, mode));

        // Own console so Ctrl+C in the interactive picker stays with the picker
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            const CREATE_NEW_CONSOLE: u32 = 0x0000_0010;
            command.creation_flags(CREATE_NEW_CONSOLE);
        }

        run_tool("pymusiclooper", &mut command, timeout)
    }
}

/// LoopingAudioConverter, run from its installation directory
#[derive(Debug, Clone)]
pub struct LoopingAudioConverter {
    install_dir: PathBuf,
    program: PathBuf,
}

impl LoopingAudioConverter {
    /// Resolve `program` inside `install_dir` when it lives there
    ///
    /// The resolved path is absolute so it stays valid after the working
    /// directory switches to `install_dir`. Otherwise the bare name is left
    /// for `PATH` lookup.
    pub fn new(install_dir: PathBuf, program: &str) -> Self {
        let candidates = [
            install_dir.join(program),
            install_dir.join(format!("{}{}", program, std::env::consts::EXE_SUFFIX)),
        ];
        let program = candidates
            .iter()
            .find(|candidate| candidate.is_file())
            .and_then(|candidate| std::path::absolute(candidate).ok())
            .unwrap_or_else(|| PathBuf::from(program));

        Self {
            install_dir,
            program,
        }
    }

    pub fn from_config(config: &WorkspaceConfig) -> Self {
        Self::new(config.tools.converter_dir.clone(), &config.tools.converter)
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Converter for LoopingAudioConverter {
    fn working_dir(&self) -> Option<&Path> {
        Some(self.install_dir.as_path())
    }

    fn convert(&self, file: &Path, timeout: Option<Duration>) -> Result<()> {
        let mut command = Command::new(&self.program);
        command.arg("--auto").arg(file);
        run_tool("LoopingAudioConverter", &mut command, timeout)
    }
}
