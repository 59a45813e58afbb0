//! Scoped working-directory switch
//!
//! The converter only works when started from its installation directory.
//! The process working directory is global state, so the switch is held by a
//! guard that puts the previous directory back when the scope ends, including
//! on error and on unwind.

use std::path::{Path, PathBuf};

use loopadrine_common::{Error, Result};
use tracing::{debug, error};

/// Restores the previous working directory when dropped
#[derive(Debug)]
pub struct WorkingDirGuard {
    previous: Option<PathBuf>,
}

impl WorkingDirGuard {
    /// Switch into `dir`, remembering the current directory
    pub fn enter(dir: &Path) -> Result<Self> {
        let previous = std::env::current_dir()
            .map_err(Error::fs("read current directory", Path::new(".")))?;
        std::env::set_current_dir(dir).map_err(Error::fs("enter", dir))?;
        debug!(dir = %dir.display(), previous = %previous.display(), "Entered working directory");

        Ok(Self {
            previous: Some(previous),
        })
    }

    /// Directory that will be restored
    pub fn previous(&self) -> Option<&Path> {
        self.previous.as_deref()
    }

    /// Switch back now and report failure instead of logging it
    pub fn restore(mut self) -> Result<()> {
        match self.previous.take() {
            Some(previous) => {
                std::env::set_current_dir(&previous).map_err(Error::fs("return to", &previous))
            }
            None => Ok(()),
        }
    }
}

impl Drop for WorkingDirGuard {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            if let Err(e) = std::env::set_current_dir(&previous) {
                error!(dir = %previous.display(), error = %e, "Failed to restore working directory");
            }
        }
    }
}

/// Run `f` with the working directory set to `dir`
///
/// The previous directory is restored whether `f` succeeds or fails. If both
/// `f` and the restore fail, the error from `f` is returned.
pub fn in_dir<T>(dir: &Path, f: impl FnOnce() -> Result<T>) -> Result<T> {
    let guard = WorkingDirGuard::enter(dir)?;
    let result = f();
    let restored = guard.restore();
    let value = result?;
    restored?;
    Ok(value)
}
