//! Filename sanitizer
//!
//! Downstream tools choke on non-ASCII filenames, so every raw download is
//! renamed to the 7-bit subset of its basename before anything else touches it.

use std::path::PathBuf;

use tracing::{debug, warn};

use crate::fs_ops::FileOps;
use crate::{Error, Result};

/// Strip every character outside the 7-bit ASCII range
pub fn sanitize_file_name(name: &str) -> String {
    name.chars().filter(char::is_ascii).collect()
}

/// Rename each file to its sanitized basename and return the new paths
///
/// Input order is preserved. Names that are already portable are not renamed.
/// When two inputs collapse to the same name the last rename wins (the earlier
/// file is replaced) and the shared path is returned only once. A name whose
/// stem would become empty keeps its original name.
pub fn sanitize_paths(fs: &impl FileOps, files: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut sanitized: Vec<PathBuf> = Vec::with_capacity(files.len());

    for file in files {
        let name = file
            .file_name()
            .ok_or_else(|| Error::InvalidInput(format!("not a file path: {}", file.display())))?
            .to_string_lossy();
        let clean = sanitize_file_name(&name);

        let target = if clean == name {
            file.clone()
        } else if clean.is_empty() || clean.starts_with('.') {
            warn!(
                file = %file.display(),
                "Name has no portable characters left, keeping original"
            );
            file.clone()
        } else {
            let target = file.with_file_name(&clean);
            if fs.exists(&target) {
                warn!(
                    from = %file.display(),
                    to = %target.display(),
                    "Sanitized name collides with an existing file, replacing it"
                );
            }
            fs.rename(file, &target)?;
            debug!(from = %file.display(), to = %target.display(), "Sanitized filename");
            target
        };

        if !sanitized.contains(&target) {
            sanitized.push(target);
        }
    }

    Ok(sanitized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs_ops::{MemoryFs, RealFs};
    use std::path::Path;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_file_name_strips_non_ascii() {
        assert_eq!(sanitize_file_name("Café del Mar.wav"), "Caf del Mar.wav");
        assert_eq!(sanitize_file_name("東方 - Bad Apple!!.wav"), " - Bad Apple!!.wav");
        assert_eq!(sanitize_file_name("plain (remix).wav"), "plain (remix).wav");
    }

    #[test]
    fn test_portable_names_are_untouched() {
        let fs = MemoryFs::new();
        fs.add_file("dl/Song A.wav", "a");

        let input = vec![PathBuf::from("dl/Song A.wav")];
        let out = sanitize_paths(&fs, &input).unwrap();

        assert_eq!(out, input);
        assert_eq!(fs.all_files(), vec![PathBuf::from("dl/Song A.wav")]);
    }

    #[test]
    fn test_non_portable_names_are_renamed_on_disk() {
        let temp_dir = TempDir::new().unwrap();
        let original = temp_dir.path().join("Pokémon Theme.wav");
        std::fs::write(&original, b"pcm").unwrap();

        let out = sanitize_paths(&RealFs, &[original.clone()]).unwrap();

        let expected = temp_dir.path().join("Pokmon Theme.wav");
        assert_eq!(out, vec![expected.clone()]);
        assert!(expected.exists());
        assert!(!original.exists());
    }

    #[test]
    fn test_collision_last_rename_wins() {
        let fs = MemoryFs::new();
        fs.add_file("dl/Ré.wav", "first");
        fs.add_file("dl/Rë.wav", "second");

        let out = sanitize_paths(
            &fs,
            &[PathBuf::from("dl/Ré.wav"), PathBuf::from("dl/Rë.wav")],
        )
        .unwrap();

        assert_eq!(out, vec![PathBuf::from("dl/R.wav")]);
        assert_eq!(fs.read("dl/R.wav").unwrap(), b"second");
        assert_eq!(fs.all_files().len(), 1);
    }

    #[test]
    fn test_fully_non_portable_stem_keeps_name() {
        let fs = MemoryFs::new();
        fs.add_file("dl/東方.wav", "x");

        let out = sanitize_paths(&fs, &[PathBuf::from("dl/東方.wav")]).unwrap();

        assert_eq!(out, vec![PathBuf::from("dl/東方.wav")]);
        assert!(fs.exists(Path::new("dl/東方.wav")));
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let fs = MemoryFs::new();
        fs.add_dir("dl");

        let result = sanitize_paths(&fs, &[PathBuf::from("dl/Ünknown.wav")]);
        assert!(result.unwrap_err().is_not_found());
    }
}
