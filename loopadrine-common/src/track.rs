//! Track stages and transitions
//!
//! A track's stage is encoded by which directory holds its file. This module
//! makes that explicit: [`TrackStage::location`] maps a stage to a directory and
//! extension, and [`Track::transition`] is the only way to change stage. Each
//! legal transition is exactly one file move:
//!
//! ```text
//! Downloaded    -> LoopAnnotated  downloads/N.raw        -> processed/N.raw
//! Downloaded    -> Processed      downloads/N.raw        -> processed/N.raw
//! PendingRedo   -> Downloaded     processed/N.raw        -> downloads/N.raw
//! Processed     -> Output         converter-output/N.out -> output/N.out
//! LoopAnnotated -> Output         converter-output/N.out -> output/N.out
//! ```

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::WorkspaceConfig;
use crate::fs_ops::FileOps;
use crate::{Error, Result};

/// Where a track is in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackStage {
    /// Raw audio waiting in the downloads directory
    Downloaded,
    /// Raw audio moved to processed without loop detection
    Processed,
    /// Raw audio moved to processed after loop detection
    LoopAnnotated,
    /// Converted file collected into the output directory
    Output,
    /// Converted file staged in the redo directory
    PendingRedo,
}

/// Directory and extension that hold a track at a given stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageLocation {
    pub dir: PathBuf,
    pub extension: String,
}

impl TrackStage {
    /// Location of the track's file at this stage
    pub fn location(self, config: &WorkspaceConfig) -> StageLocation {
        let (dir, extension) = match self {
            TrackStage::Downloaded => (&config.downloads_dir, &config.raw_ext),
            TrackStage::Processed | TrackStage::LoopAnnotated => {
                (&config.processed_dir, &config.raw_ext)
            }
            TrackStage::Output => (&config.output_dir, &config.output_ext),
            TrackStage::PendingRedo => (&config.redo_dir, &config.output_ext),
        };
        StageLocation {
            dir: dir.clone(),
            extension: extension.clone(),
        }
    }

    /// Source and destination of the move that performs `self -> to`
    ///
    /// `None` when the pair is not a legal transition.
    fn move_for(
        self,
        to: TrackStage,
        config: &WorkspaceConfig,
    ) -> Option<(StageLocation, StageLocation)> {
        use TrackStage::*;
        match (self, to) {
            (Downloaded, LoopAnnotated) | (Downloaded, Processed) => {
                Some((self.location(config), to.location(config)))
            }
            // The redo artifact only names the track; the raw file travels
            // back from processed.
            (PendingRedo, Downloaded) => {
                Some((Processed.location(config), Downloaded.location(config)))
            }
            (Processed, Output) | (LoopAnnotated, Output) => Some((
                StageLocation {
                    dir: config.converter_output_dir(),
                    extension: config.output_ext.clone(),
                },
                Output.location(config),
            )),
            _ => None,
        }
    }

    /// True when `self -> to` is a legal transition
    pub fn can_transition_to(self, to: TrackStage) -> bool {
        self.move_for(to, &WorkspaceConfig::default()).is_some()
    }
}

/// One song moving through the pipeline, keyed by its base name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    name: String,
    stage: TrackStage,
}

impl Track {
    /// Track with an explicit base name and stage
    pub fn new(name: impl Into<String>, stage: TrackStage) -> Self {
        Self {
            name: name.into(),
            stage,
        }
    }

    /// Track for a file found at `stage`
    ///
    /// The name is the file name minus the stage's extension, so that
    /// [`Track::path`] rebuilds exactly `path`. Files that do not carry the
    /// extension, or would leave an empty name, are rejected.
    pub fn from_path(path: &Path, stage: TrackStage, config: &WorkspaceConfig) -> Result<Self> {
        let location = stage.location(config);
        let file_name = path
            .file_name()
            .ok_or_else(|| Error::InvalidInput(format!("not a file path: {}", path.display())))?
            .to_string_lossy();
        match file_name.strip_suffix(location.extension.as_str()) {
            Some(name) if !name.is_empty() => Ok(Self::new(name, stage)),
            _ => Err(Error::InvalidInput(format!(
                "{} is not a {} file",
                path.display(),
                location.extension
            ))),
        }
    }

    /// Base name (extension stripped)
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stage(&self) -> TrackStage {
        self.stage
    }

    /// Path of the file that represents this track at its current stage
    pub fn path(&self, config: &WorkspaceConfig) -> PathBuf {
        self.path_in(&self.stage.location(config))
    }

    /// Path of the raw-audio form of this track at `stage`
    pub fn raw_path(&self, config: &WorkspaceConfig, stage: TrackStage) -> PathBuf {
        let dir = stage.location(config).dir;
        dir.join(format!("{}{}", self.name, config.raw_ext))
    }

    fn path_in(&self, location: &StageLocation) -> PathBuf {
        location
            .dir
            .join(format!("{}{}", self.name, location.extension))
    }

    /// Move the track's file so that it sits at stage `to`
    pub fn transition(
        &self,
        fs: &impl FileOps,
        config: &WorkspaceConfig,
        to: TrackStage,
    ) -> Result<Track> {
        let (from_location, to_location) =
            self.stage
                .move_for(to, config)
                .ok_or_else(|| Error::InvalidTransition {
                    track: self.name.clone(),
                    from: self.stage,
                    to,
                })?;

        let source = self.path_in(&from_location);
        let dest = self.path_in(&to_location);
        fs.rename(&source, &dest)?;

        debug!(track = %self.name, from = ?self.stage, to = ?to, "Track transitioned");
        Ok(Track::new(self.name.clone(), to))
    }
}
