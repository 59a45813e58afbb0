//! File mover
//!
//! Moves are the only way a file changes stage. Both helpers replace an
//! existing file at the destination and stop at the first failure.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::fs_ops::FileOps;
use crate::{Error, Result};

/// Move `file` into `dest_dir`, keeping its basename
pub fn move_into(fs: &impl FileOps, file: &Path, dest_dir: &Path) -> Result<PathBuf> {
    let name = file
        .file_name()
        .ok_or_else(|| Error::InvalidInput(format!("not a file path: {}", file.display())))?;
    let dest = dest_dir.join(name);
    fs.rename(file, &dest)?;
    debug!(from = %file.display(), to = %dest.display(), "Moved file");
    Ok(dest)
}

/// Move every immediate child of `source_dir` ending in `extension` into `dest_dir`
pub fn move_by_extension(
    fs: &impl FileOps,
    extension: &str,
    source_dir: &Path,
    dest_dir: &Path,
) -> Result<()> {
    let matching: Vec<PathBuf> = fs
        .list_files(source_dir)?
        .into_iter()
        .filter(|path| has_extension(path, extension))
        .collect();

    for file in &matching {
        move_into(fs, file, dest_dir)?;
    }

    debug!(
        count = matching.len(),
        extension,
        from = %source_dir.display(),
        to = %dest_dir.display(),
        "Moved files by extension"
    );
    Ok(())
}

/// True when the file name matches the glob `*<extension>`
///
/// Hidden files never match, so a stray `.wav` is not a track named `.wav`.
pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.file_name()
        .map(|name| {
            let name = name.to_string_lossy();
            !name.starts_with('.') && name.ends_with(extension)
        })
        .unwrap_or(false)
}
