//! Workspace cleaner
//!
//! Removes leftovers of a previous run. This is the one place where a failed
//! operation is tolerated: a file that cannot be deleted is logged and skipped,
//! and the remaining files are still attempted. Failing to list a directory is
//! still fatal.

use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::config::WorkspaceConfig;
use crate::fs_ops::FileOps;
use crate::mover::has_extension;
use crate::Result;

/// Categories to clear
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearOptions {
    /// Raw audio in the processed directory
    pub processed: bool,
    /// Raw audio in the downloads directory
    pub downloaded: bool,
    /// Loop annotation file at both of its locations
    pub loop_file: bool,
}

impl ClearOptions {
    /// Clear everything (fresh run)
    pub fn all() -> Self {
        Self {
            processed: true,
            downloaded: true,
            loop_file: true,
        }
    }

    /// Clear only the loop annotation file (redo run)
    pub fn loop_file_only() -> Self {
        Self {
            processed: false,
            downloaded: false,
            loop_file: true,
        }
    }

    /// Clear nothing
    pub fn none() -> Self {
        Self {
            processed: false,
            downloaded: false,
            loop_file: false,
        }
    }
}

/// Outcome of a clear pass
#[derive(Debug, Default)]
pub struct ClearReport {
    /// Files removed
    pub deleted: Vec<PathBuf>,
    /// Files that could not be removed, with the error message
    pub failed: Vec<(PathBuf, String)>,
}

/// Deletes stale intermediate files from the workspace
pub struct WorkspaceCleaner<'a, F: FileOps> {
    config: &'a WorkspaceConfig,
    fs: &'a F,
}

impl<'a, F: FileOps> WorkspaceCleaner<'a, F> {
    pub fn new(config: &'a WorkspaceConfig, fs: &'a F) -> Self {
        Self { config, fs }
    }

    /// Clear the selected categories
    pub fn clear(&self, options: ClearOptions) -> Result<ClearReport> {
        let mut report = ClearReport::default();

        if options.processed {
            self.delete_with_extension(&self.config.processed_dir, &mut report)?;
        }
        if options.downloaded {
            self.delete_with_extension(&self.config.downloads_dir, &mut report)?;
        }
        if options.loop_file {
            for loop_file in [
                self.config.loop_file_at_finder(),
                self.config.loop_file_at_converter(),
            ] {
                if self.fs.exists(&loop_file) {
                    self.delete_one(&loop_file, &mut report);
                }
            }
        }

        info!(
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            "Workspace cleared"
        );
        Ok(report)
    }

    fn delete_with_extension(&self, dir: &Path, report: &mut ClearReport) -> Result<()> {
        for file in self.fs.list_files(dir)? {
            if has_extension(&file, &self.config.raw_ext) {
                self.delete_one(&file, report);
            }
        }
        Ok(())
    }

    fn delete_one(&self, file: &Path, report: &mut ClearReport) {
        match self.fs.remove_file(file) {
            Ok(()) => {
                debug!(file = %file.display(), "Deleted");
                report.deleted.push(file.to_path_buf());
            }
            Err(e) => {
                error!(file = %file.display(), error = %e, "Error deleting file");
                report.failed.push((file.to_path_buf(), e.to_string()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs_ops::MemoryFs;

    fn populated() -> (WorkspaceConfig, MemoryFs) {
        let config = WorkspaceConfig::default();
        let fs = MemoryFs::new();
        fs.add_file("~processed/p1.wav", "p1");
        fs.add_file("~processed/p2.wav", "p2");
        fs.add_file("~processed/keep.txt", "k");
        fs.add_file("~downloads/d1.wav", "d1");
        fs.add_file("~downloads/LooperOutput/loop.txt", "loops");
        fs.add_file("Tools/LoopingAudioConverter/loop.txt", "old loops");
        (config, fs)
    }

    #[test]
    fn test_no_flags_deletes_nothing() {
        let (config, fs) = populated();
        let before = fs.all_files();

        let report = WorkspaceCleaner::new(&config, &fs)
            .clear(ClearOptions::none())
            .unwrap();

        assert!(report.deleted.is_empty());
        assert_eq!(fs.all_files(), before);
    }

    #[test]
    fn test_all_flags_clear_every_category() {
        let (config, fs) = populated();

        let report = WorkspaceCleaner::new(&config, &fs)
            .clear(ClearOptions::all())
            .unwrap();

        assert_eq!(report.deleted.len(), 5);
        assert!(report.failed.is_empty());
        assert_eq!(fs.all_files(), vec![PathBuf::from("~processed/keep.txt")]);
    }

    #[test]
    fn test_loop_only_preserves_audio() {
        let (config, fs) = populated();

        WorkspaceCleaner::new(&config, &fs)
            .clear(ClearOptions::loop_file_only())
            .unwrap();

        assert!(!fs.exists(&config.loop_file_at_finder()));
        assert!(!fs.exists(&config.loop_file_at_converter()));
        assert!(fs.exists(Path::new("~processed/p1.wav")));
        assert!(fs.exists(Path::new("~downloads/d1.wav")));
    }

    #[test]
    fn test_missing_loop_file_is_not_an_error() {
        let config = WorkspaceConfig::default();
        let fs = MemoryFs::new();

        let report = WorkspaceCleaner::new(&config, &fs)
            .clear(ClearOptions::loop_file_only())
            .unwrap();

        assert!(report.deleted.is_empty());
        assert!(report.failed.is_empty());
    }

    #[test]
    fn test_single_failure_does_not_stop_the_rest() {
        let (config, fs) = populated();
        fs.fail_removal_of("~processed/p1.wav");

        let report = WorkspaceCleaner::new(&config, &fs)
            .clear(ClearOptions {
                processed: true,
                downloaded: true,
                loop_file: false,
            })
            .unwrap();

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, PathBuf::from("~processed/p1.wav"));
        assert!(fs.exists(Path::new("~processed/p1.wav")));
        assert!(!fs.exists(Path::new("~processed/p2.wav")));
        assert!(!fs.exists(Path::new("~downloads/d1.wav")));
    }

    #[test]
    fn test_missing_directory_is_fatal() {
        let config = WorkspaceConfig::default();
        let fs = MemoryFs::new();

        let result = WorkspaceCleaner::new(&config, &fs).clear(ClearOptions {
            processed: true,
            downloaded: false,
            loop_file: false,
        });
        assert!(result.is_err());
    }
}
