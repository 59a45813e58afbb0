//! Pipeline controller
//!
//! # State Progression
//! ```text
//! INIT → FRESH ─┐
//!               ├→ SANITIZED → LOOP_ANNOTATED ─┐
//! INIT → REDO ──┘              SKIPPED_LOOP ───┴→ CONVERTED → DONE
//! ```
//!
//! - **FRESH**: clear the whole workspace, then download the song list
//! - **REDO**: move the raw source of every staged redo file back to downloads
//! - **SANITIZED**: downloads renamed to portable names; an empty batch ends here
//! - **LOOP_ANNOTATED / SKIPPED_LOOP**: raw files moved to processed, with or
//!   without a loop finder pass
//! - **CONVERTED**: loop file staged for the converter, every processed file
//!   converted inside the converter's working directory
//! - **DONE**: converted files collected into the output directory
//!
//! Every filesystem step is fail-fast. A failed run leaves files wherever the
//! last move put them, and rerunning picks them up again.

use std::path::PathBuf;

use loopadrine_common::mover::{has_extension, move_by_extension};
use loopadrine_common::sanitizer::sanitize_paths;
use loopadrine_common::{
    ClearOptions, Error, FileOps, Result, Track, TrackStage, WorkspaceCleaner, WorkspaceConfig,
};
use tracing::{debug, info, warn};

use crate::collaborators::{Converter, Downloader, LoopFinder, LoopMode};
use crate::operator::Operator;
use crate::workdir;

/// Flags for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Re-loop the converted files staged in the redo directory
    pub redo: bool,
    /// Do not generate loop points
    pub skip_loops: bool,
}

/// Controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Init,
    Fresh,
    Redo,
    Sanitized,
    LoopAnnotated,
    SkippedLoop,
    Converted,
    Done,
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Downloads directory held no raw audio after sanitizing
    NothingToProcess,
    /// Tracks whose converted file reached the output directory
    Completed { tracks: Vec<Track> },
}

/// External collaborators a run calls into
#[derive(Clone, Copy)]
pub struct Tools<'a> {
    pub downloader: &'a dyn Downloader,
    pub loop_finder: &'a dyn LoopFinder,
    pub converter: &'a dyn Converter,
    pub operator: &'a dyn Operator,
}

/// Sequences one run over the workspace directories
pub struct Pipeline<'a, F: FileOps> {
    config: &'a WorkspaceConfig,
    fs: &'a F,
    tools: Tools<'a>,
    history: Vec<PipelineState>,
}

impl<'a, F: FileOps> Pipeline<'a, F> {
    pub fn new(config: &'a WorkspaceConfig, fs: &'a F, tools: Tools<'a>) -> Self {
        Self {
            config,
            fs,
            tools,
            history: vec![PipelineState::Init],
        }
    }

    /// Current state
    pub fn state(&self) -> PipelineState {
        self.history.last().copied().unwrap_or(PipelineState::Init)
    }

    /// Every state entered so far, starting with `Init`
    pub fn history(&self) -> &[PipelineState] {
        &self.history
    }

    fn transition_to(&mut self, next: PipelineState) {
        debug!(from = ?self.state(), to = ?next, "Pipeline state transition");
        self.history.push(next);
    }

    /// Execute a complete run
    pub fn run(&mut self, options: RunOptions) -> Result<PipelineOutcome> {
        self.config.ensure_directories(self.fs)?;

        if options.redo {
            self.transition_to(PipelineState::Redo);
            self.restage_redo_requests(options.skip_loops)?;
        } else {
            self.transition_to(PipelineState::Fresh);
            self.start_fresh()?;
        }

        let downloaded = self.sanitize_downloads()?;
        self.transition_to(PipelineState::Sanitized);
        if downloaded.is_empty() {
            debug!("No raw audio in downloads, stopping early");
            self.transition_to(PipelineState::Done);
            return Ok(PipelineOutcome::NothingToProcess);
        }

        let processed = if options.skip_loops {
            let processed = self.skip_loops(&downloaded)?;
            self.transition_to(PipelineState::SkippedLoop);
            processed
        } else {
            let mode = self.tools.operator.choose_loop_mode()?;
            let annotated = self.annotate_loops(&downloaded, mode)?;
            self.transition_to(PipelineState::LoopAnnotated);
            annotated
        };

        let sources = self.absolute_paths(&processed)?;
        self.stage_loop_file()?;
        self.convert(&sources)?;
        self.transition_to(PipelineState::Converted);

        let tracks = self.collect_output(&processed)?;
        self.transition_to(PipelineState::Done);
        info!(converted = tracks.len(), "Pipeline finished");
        Ok(PipelineOutcome::Completed { tracks })
    }

    /// Fresh entry: wipe leftovers and download the song list
    fn start_fresh(&self) -> Result<()> {
        WorkspaceCleaner::new(self.config, self.fs).clear(ClearOptions::all())?;

        info!(song_list = %self.config.song_list.display(), "Downloading songs");
        self.tools.downloader.download(
            &self.config.song_list,
            &self.config.downloads_dir,
            self.config.tools.timeout(),
        )
    }

    /// Redo entry: send raw sources of staged redo files back to downloads
    ///
    /// Redo files without a processed source are skipped silently.
    fn restage_redo_requests(&self, skip_loops: bool) -> Result<()> {
        self.tools.operator.confirm_redo(self.config)?;

        let mut restaged = 0;
        for request in self.fs.list_files(&self.config.redo_dir)? {
            if !has_extension(&request, &self.config.output_ext) {
                continue;
            }
            let track = Track::from_path(&request, TrackStage::PendingRedo, self.config)?;
            if self.fs.exists(&track.raw_path(self.config, TrackStage::Processed)) {
                track.transition(self.fs, self.config, TrackStage::Downloaded)?;
                restaged += 1;
            }
        }
        info!(count = restaged, "Re-staged tracks for looping");

        let clear = if skip_loops {
            ClearOptions::none()
        } else {
            ClearOptions::loop_file_only()
        };
        WorkspaceCleaner::new(self.config, self.fs).clear(clear)?;
        Ok(())
    }

    /// Sanitize every raw file in downloads and return them as tracks
    fn sanitize_downloads(&self) -> Result<Vec<Track>> {
        let raw: Vec<PathBuf> = self
            .fs
            .list_files(&self.config.downloads_dir)?
            .into_iter()
            .filter(|path| has_extension(path, &self.config.raw_ext))
            .collect();

        sanitize_paths(self.fs, &raw)?
            .iter()
            .map(|path| Track::from_path(path, TrackStage::Downloaded, self.config))
            .collect()
    }

    /// Run the loop finder once per track, moving each into processed after
    fn annotate_loops(&self, tracks: &[Track], mode: LoopMode) -> Result<Vec<Track>> {
        let timeout = self.config.tools.timeout();
        let mut annotated = Vec::with_capacity(tracks.len());

        for track in tracks {
            self.tools
                .loop_finder
                .find_loops(&track.path(self.config), mode, timeout)?;
            info!(track = %track.name(), "Loop points generated");
            self.tools
                .operator
                .announce(&format!("Generated loop point pair for {}.", track.name()))?;
            annotated.push(track.transition(self.fs, self.config, TrackStage::LoopAnnotated)?);
        }
        Ok(annotated)
    }

    /// Bulk-move raw files to processed without looking for loops
    fn skip_loops(&self, tracks: &[Track]) -> Result<Vec<Track>> {
        move_by_extension(
            self.fs,
            &self.config.raw_ext,
            &self.config.downloads_dir,
            &self.config.processed_dir,
        )?;
        Ok(tracks
            .iter()
            .map(|track| Track::new(track.name(), TrackStage::Processed))
            .collect())
    }

    /// Absolute raw paths, still valid after the working directory changes
    fn absolute_paths(&self, tracks: &[Track]) -> Result<Vec<PathBuf>> {
        tracks
            .iter()
            .map(|track| {
                let path = track.path(self.config);
                std::path::absolute(&path).map_err(Error::fs("resolve", &path))
            })
            .collect()
    }

    /// Hand the loop finder's output to the converter, if there is one
    fn stage_loop_file(&self) -> Result<()> {
        let from = self.config.loop_file_at_finder();
        if self.fs.exists(&from) {
            let to = self.config.loop_file_at_converter();
            self.fs.rename(&from, &to)?;
            info!(to = %to.display(), "Loop file staged for conversion");
        }
        Ok(())
    }

    /// Convert every source inside the converter's working directory
    fn convert(&self, sources: &[PathBuf]) -> Result<()> {
        let converter = self.tools.converter;
        let operator = self.tools.operator;
        let timeout = self.config.tools.timeout();

        let batch = || -> Result<()> {
            for source in sources {
                converter.convert(source, timeout)?;
                let name = source
                    .file_name()
                    .map(|n| n.to_string_lossy())
                    .unwrap_or_default();
                info!(file = %name, "Looping audio generated");
                operator.announce(&format!("Generated looping audio file from {}", name))?;
            }
            Ok(())
        };

        match converter.working_dir() {
            Some(dir) => workdir::in_dir(dir, batch),
            None => batch(),
        }
    }

    /// Move converted files into the output directory
    ///
    /// Tracks of this run move one by one; anything else the converter left
    /// behind with the streamed-audio extension is swept along.
    fn collect_output(&self, processed: &[Track]) -> Result<Vec<Track>> {
        let converter_output = self.config.converter_output_dir();
        if !self.fs.exists(&converter_output) {
            warn!(
                dir = %converter_output.display(),
                "Converter output directory missing, nothing to collect"
            );
            return Ok(Vec::new());
        }

        let mut collected = Vec::new();
        for track in processed {
            let produced = converter_output.join(format!("{}{}", track.name(), self.config.output_ext));
            if self.fs.exists(&produced) {
                collected.push(track.transition(self.fs, self.config, TrackStage::Output)?);
            } else {
                warn!(track = %track.name(), "No converted file found");
            }
        }

        move_by_extension(
            self.fs,
            &self.config.output_ext,
            &converter_output,
            &self.config.output_dir,
        )?;
        Ok(collected)
    }
}
