//! Request-scoped scratch directories.
//!
//! A [`ScratchDir`] is a uniquely named temporary directory owned by a single
//! encode call. It is removed when dropped, which covers success, encoder
//! failure, panics, and a cancelled request future alike.

use std::path::{Path, PathBuf};

use bf_core::{Error, Result};
use tempfile::TempDir;

/// Isolated temporary directory for intermediate encode files.
#[derive(Debug)]
pub struct ScratchDir {
    temp_dir: TempDir,
}

impl ScratchDir {
    /// Create a new scratch directory under the system temp location.
    pub fn new(label: &str) -> Result<Self> {
        let temp_dir = tempfile::Builder::new()
            .prefix(&format!("boothforge-{label}-"))
            .tempdir()
            .map_err(|e| Error::encoding(label, format!("failed to create scratch dir: {e}")))?;
        Ok(Self { temp_dir })
    }

    /// Create a new scratch directory inside `root`.
    pub fn new_in(root: &Path, label: &str) -> Result<Self> {
        let temp_dir = tempfile::Builder::new()
            .prefix(&format!("boothforge-{label}-"))
            .tempdir_in(root)
            .map_err(|e| Error::encoding(label, format!("failed to create scratch dir: {e}")))?;
        Ok(Self { temp_dir })
    }

    /// Path to the directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Path for a named file inside the directory.
    pub fn file(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Path of the numbered frame image (`frame_001.png`, 1-based).
    pub fn frame_path(&self, number: usize) -> PathBuf {
        self.file(&format!("frame_{number:03}.png"))
    }

    /// ffmpeg input pattern matching [`ScratchDir::frame_path`].
    pub fn frame_pattern(&self) -> PathBuf {
        self.file("frame_%03d.png")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removed_on_drop() {
        let scratch = ScratchDir::new("test").unwrap();
        let path = scratch.path().to_path_buf();
        std::fs::write(scratch.frame_path(1), b"png").unwrap();
        assert!(path.exists());

        drop(scratch);
        assert!(!path.exists());
    }

    #[test]
    fn unique_per_call() {
        let a = ScratchDir::new("seq").unwrap();
        let b = ScratchDir::new("seq").unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn new_in_uses_root() {
        let root = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::new_in(root.path(), "gif").unwrap();
        assert_eq!(scratch.path().parent(), Some(root.path()));
    }

    #[test]
    fn frame_names_are_zero_padded() {
        let scratch = ScratchDir::new("seq").unwrap();
        assert!(scratch.frame_path(7).ends_with("frame_007.png"));
        assert!(scratch.frame_pattern().ends_with("frame_%03d.png"));
    }
}
