//! `Drop`-based guard for partial output files.
//!
//! Removes the output path on drop unless [`OutputGuard::keep`] was called,
//! so an early `?` return during compress/decompress never leaves a
//! half-written file behind.

use std::path::{Path, PathBuf};

pub struct OutputGuard {
    path: PathBuf,
    keep: bool,
}

impl OutputGuard {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf(), keep: false }
    }

    /// Call once the output file is known to be complete and valid.
    pub fn keep(&mut self) {
        self.keep = true;
    }
}

impl Drop for OutputGuard {
    fn drop(&mut self) {
        if !self.keep {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
