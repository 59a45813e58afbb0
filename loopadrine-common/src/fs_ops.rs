//! Filesystem seam
//!
//! Every state transition in the workspace is a file move, so the pipeline only
//! touches the disk through [`FileOps`]. [`RealFs`] delegates to `std::fs`;
//! [`MemoryFs`] keeps a flat file table in memory and can be told to fail
//! specific removals.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::{Error, Result};

/// Capability set the workspace state machine needs
pub trait FileOps {
    /// Immediate children of `dir` that are regular files, sorted by path
    fn list_files(&self, dir: &Path) -> Result<Vec<PathBuf>>;

    /// Move `from` to `to`, replacing any file already at `to`
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Delete a single file
    fn remove_file(&self, path: &Path) -> Result<()>;

    /// True when `path` names an existing file or directory
    fn exists(&self, path: &Path) -> bool;

    /// Create `dir` and any missing parents
    fn create_dir_all(&self, dir: &Path) -> Result<()>;
}

/// [`FileOps`] backed by the real filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct RealFs;

impl FileOps for RealFs {
    fn list_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(Error::fs("list", dir))? {
            let entry = entry.map_err(Error::fs("list", dir))?;
            let file_type = entry.file_type().map_err(Error::fs("inspect", &entry.path()))?;
            if file_type.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        std::fs::rename(from, to).map_err(Error::fs("move", from))
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        std::fs::remove_file(path).map_err(Error::fs("delete", path))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir).map_err(Error::fs("create", dir))
    }
}

/// In-memory [`FileOps`] for state-machine tests
///
/// Paths are normalized lexically (`.` components dropped) so `./a/b` and
/// `a/b` name the same entry. File contents are kept so tests can tell which
/// file survived an overwrite.
#[derive(Debug, Default)]
pub struct MemoryFs {
    files: RefCell<BTreeMap<PathBuf, Vec<u8>>>,
    dirs: RefCell<BTreeSet<PathBuf>>,
    failing_removals: RefCell<BTreeSet<PathBuf>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or overwrite) a file, creating its parent directories
    pub fn add_file(&self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) {
        let path = normalize(path.as_ref());
        if let Some(parent) = path.parent() {
            self.add_dir(parent);
        }
        self.files.borrow_mut().insert(path, contents.into());
    }

    /// Add a directory and its parents
    pub fn add_dir(&self, dir: impl AsRef<Path>) {
        let mut dirs = self.dirs.borrow_mut();
        for ancestor in normalize(dir.as_ref()).ancestors() {
            if !ancestor.as_os_str().is_empty() {
                dirs.insert(ancestor.to_path_buf());
            }
        }
    }

    /// Make every later `remove_file` on `path` fail with a permission error
    pub fn fail_removal_of(&self, path: impl AsRef<Path>) {
        self.failing_removals
            .borrow_mut()
            .insert(normalize(path.as_ref()));
    }

    /// Contents of a file, if present
    pub fn read(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.files.borrow().get(&normalize(path.as_ref())).cloned()
    }

    /// All file paths currently stored
    pub fn all_files(&self) -> Vec<PathBuf> {
        self.files.borrow().keys().cloned().collect()
    }

    fn dir_exists(&self, dir: &Path) -> bool {
        dir.as_os_str().is_empty() || self.dirs.borrow().contains(dir)
    }
}

impl FileOps for MemoryFs {
    fn list_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let dir = normalize(dir);
        if !self.dir_exists(&dir) {
            return Err(Error::fs("list", &dir)(not_found()));
        }
        Ok(self
            .files
            .borrow()
            .keys()
            .filter(|path| path.parent() == Some(dir.as_path()))
            .cloned()
            .collect())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let from = normalize(from);
        let to = normalize(to);
        if let Some(parent) = to.parent() {
            if !self.dir_exists(parent) {
                return Err(Error::fs("move", &from)(not_found()));
            }
        }
        let mut files = self.files.borrow_mut();
        let contents = files
            .remove(&from)
            .ok_or_else(|| Error::fs("move", &from)(not_found()))?;
        files.insert(to, contents);
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        let path = normalize(path);
        if self.failing_removals.borrow().contains(&path) {
            return Err(Error::fs("delete", &path)(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "removal blocked by test",
            )));
        }
        self.files
            .borrow_mut()
            .remove(&path)
            .map(|_| ())
            .ok_or_else(|| Error::fs("delete", &path)(not_found()))
    }

    fn exists(&self, path: &Path) -> bool {
        let path = normalize(path);
        self.files.borrow().contains_key(&path) || self.dirs.borrow().contains(&path)
    }

    fn create_dir_all(&self, dir: &Path) -> Result<()> {
        self.add_dir(dir);
        Ok(())
    }
}

fn not_found() -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, "no such file or directory")
}

fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_fs_normalizes_current_dir() {
        let fs = MemoryFs::new();
        fs.add_file("./~downloads/a.wav", "a");

        assert!(fs.exists(Path::new("~downloads/a.wav")));
        assert_eq!(
            fs.list_files(Path::new("./~downloads/")).unwrap(),
            vec![PathBuf::from("~downloads/a.wav")]
        );
    }

    #[test]
    fn test_memory_fs_list_is_not_recursive() {
        let fs = MemoryFs::new();
        fs.add_file("dl/a.wav", "a");
        fs.add_file("dl/LooperOutput/loop.txt", "loops");

        let listed = fs.list_files(Path::new("dl")).unwrap();
        assert_eq!(listed, vec![PathBuf::from("dl/a.wav")]);
    }

    #[test]
    fn test_memory_fs_rename_replaces_target() {
        let fs = MemoryFs::new();
        fs.add_file("a/x.wav", "new");
        fs.add_file("b/x.wav", "old");

        fs.rename(Path::new("a/x.wav"), Path::new("b/x.wav")).unwrap();

        assert!(!fs.exists(Path::new("a/x.wav")));
        assert_eq!(fs.read("b/x.wav").unwrap(), b"new");
    }

    #[test]
    fn test_memory_fs_rename_into_missing_dir_fails() {
        let fs = MemoryFs::new();
        fs.add_file("a/x.wav", "x");

        let err = fs
            .rename(Path::new("a/x.wav"), Path::new("nowhere/x.wav"))
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(fs.exists(Path::new("a/x.wav")));
    }

    #[test]
    fn test_memory_fs_blocked_removal() {
        let fs = MemoryFs::new();
        fs.add_file("p/x.wav", "x");
        fs.fail_removal_of("p/x.wav");

        assert!(fs.remove_file(Path::new("p/x.wav")).is_err());
        assert!(fs.exists(Path::new("p/x.wav")));
    }

    #[test]
    fn test_real_fs_lists_only_files() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("b.wav"), b"b").unwrap();
        std::fs::write(temp_dir.path().join("a.wav"), b"a").unwrap();
        std::fs::create_dir(temp_dir.path().join("nested.wav")).unwrap();

        let listed = RealFs.list_files(temp_dir.path()).unwrap();
        assert_eq!(
            listed,
            vec![temp_dir.path().join("a.wav"), temp_dir.path().join("b.wav")]
        );
    }

    #[test]
    fn test_real_fs_errors_carry_path() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.wav");

        match RealFs.remove_file(&missing).unwrap_err() {
            Error::Filesystem { operation, path, .. } => {
                assert_eq!(operation, "delete");
                assert_eq!(path, missing);
            }
            other => panic!("Expected Filesystem error, got {:?}", other),
        }
    }
}
