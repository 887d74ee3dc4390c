//! Scoped extraction directory
//!
//! Every decode call owns one [`WorkingArea`]. It is either a fresh
//! temporary directory or a caller-supplied directory that is emptied before
//! use. Its contents are removed when the area is dropped, on success and on
//! every error path.

use crate::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;
use tracing::{debug, warn};

/// Directory that holds extracted archive members for one decode
#[derive(Debug)]
pub struct WorkingArea {
    root: PathBuf,
    // Held for its Drop; removes the directory itself after `clear`.
    _temp: Option<TempDir>,
    retry_pause: Duration,
}

impl WorkingArea {
    /// Create a unique temporary working area
    pub fn temporary(retry_pause: Duration) -> Result<Self> {
        let temp = tempfile::Builder::new()
            .prefix("ndax-")
            .tempdir()
            .map_err(|e| Error::io("Failed to create temporary working area", e))?;
        debug!("Created working area {}", temp.path().display());
        Ok(Self {
            root: temp.path().to_path_buf(),
            _temp: Some(temp),
            retry_pause,
        })
    }

    /// Use a caller-supplied directory, creating it if needed and clearing any stale contents
    pub fn at(dir: impl Into<PathBuf>, retry_pause: Duration) -> Result<Self> {
        let root = dir.into();
        fs::create_dir_all(&root).map_err(|e| {
            Error::io(
                format!("Failed to create working area {}", root.display()),
                e,
            )
        })?;
        let area = Self {
            root,
            _temp: None,
            retry_pause,
        };
        let stale = area.clear();
        if stale > 0 {
            warn!(
                "{} stale entries could not be removed from {}",
                stale,
                area.root.display()
            );
        }
        Ok(area)
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Remove every entry in the area, retrying each failure once
    ///
    /// Returns the number of entries that could not be removed. Never fails.
    pub fn clear(&self) -> usize {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Working area {} not readable: {}", self.root.display(), e);
                return 0;
            }
        };

        let mut failures = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if remove_entry(&path).is_ok() {
                continue;
            }
            thread::sleep(self.retry_pause);
            if let Err(e) = remove_entry(&path) {
                warn!("Failed to remove {}: {}", path.display(), e);
                failures += 1;
            }
        }
        failures
    }
}

impl Drop for WorkingArea {
    fn drop(&mut self) {
        let failures = self.clear();
        if failures == 0 {
            debug!("Cleaned working area {}", self.root.display());
        }
    }
}

fn remove_entry(path: &Path) -> std::io::Result<()> {
    if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}
