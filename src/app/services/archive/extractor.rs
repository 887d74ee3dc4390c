//! ZIP extraction and format-variant detection

use super::working_area::WorkingArea;
use crate::config::ArchiveConfig;
use crate::constants::members;
use crate::{Error, Result};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zip::ZipArchive;

/// Binary layout family of an archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatVariant {
    /// One `data.ndc` stream holding complete records
    SingleStream,
    /// Telemetry, run-info and step-identity split over three streams
    SplitStream,
}

impl FormatVariant {
    /// Choose the variant from the extracted member names
    pub fn detect(member_names: &[String]) -> Result<Self> {
        let has = |name: &str| {
            member_names
                .iter()
                .any(|member| file_name_of(member) == Some(name))
        };

        if has(members::RUN_INFO) && has(members::STEP) {
            if !has(members::DATA) {
                return Err(Error::missing_member(members::DATA));
            }
            Ok(Self::SplitStream)
        } else if has(members::DATA) {
            Ok(Self::SingleStream)
        } else {
            Err(Error::missing_member(members::DATA))
        }
    }
}

impl std::fmt::Display for FormatVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SingleStream => f.write_str("single-stream"),
            Self::SplitStream => f.write_str("split-stream"),
        }
    }
}

/// An opened NDAX archive whose members live in a scoped working area
///
/// Dropping the archive removes the extracted files.
#[derive(Debug)]
pub struct NdaxArchive {
    source: PathBuf,
    area: WorkingArea,
    members: Vec<String>,
    format: Option<FormatVariant>,
}

impl NdaxArchive {
    /// Extract `path` and detect its format variant
    ///
    /// # Arguments
    ///
    /// * `path` - Location of the `.ndax` file
    /// * `config` - Working-area settings
    ///
    /// # Returns
    ///
    /// The opened archive, or `Error::Archive` for an unreadable container and
    /// `Error::MissingMember` when no telemetry stream is present.
    pub fn open(path: &Path, config: &ArchiveConfig) -> Result<Self> {
        let mut archive = Self::extract(path, config)?;
        let format = FormatVariant::detect(&archive.members)?;
        archive.format = Some(format);

        info!(
            "Opened {} ({} members extracted, {} format)",
            path.display(),
            archive.members.len(),
            format
        );
        Ok(archive)
    }

    /// Extract `path` for metadata lookups only
    ///
    /// No telemetry stream is required, so [`format`](Self::format) is `None`.
    pub fn open_metadata(path: &Path, config: &ArchiveConfig) -> Result<Self> {
        let archive = Self::extract(path, config)?;
        debug!(
            "Opened {} for metadata ({} members extracted)",
            path.display(),
            archive.members.len()
        );
        Ok(archive)
    }

    fn extract(path: &Path, config: &ArchiveConfig) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| Error::io(format!("Failed to open archive {}", path.display()), e))?;
        let mut zip = ZipArchive::new(file).map_err(|e| {
            Error::archive(
                path.display().to_string(),
                "not a readable ZIP container",
                Some(e),
            )
        })?;

        let retry_pause = Duration::from_millis(config.cleanup_retry_pause_ms);
        let area = match &config.work_dir {
            Some(dir) => WorkingArea::at(dir, retry_pause)?,
            None => WorkingArea::temporary(retry_pause)?,
        };

        extract_members(&mut zip, area.path(), path)?;
        let members = list_members(area.path())?;

        Ok(Self {
            source: path.to_path_buf(),
            area,
            members,
            format: None,
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Detected layout family; `None` for a metadata-only open
    pub fn format(&self) -> Option<FormatVariant> {
        self.format
    }

    /// Extracted member names, relative to the working area
    pub fn member_names(&self) -> &[String] {
        &self.members
    }

    pub fn work_dir(&self) -> &Path {
        self.area.path()
    }

    /// Path of the first member with the given file name
    pub fn find_member(&self, name: &str) -> Option<PathBuf> {
        self.members
            .iter()
            .find(|member| file_name_of(member) == Some(name))
            .map(|member| self.area.path().join(member))
    }

    /// Path of a member that must exist
    pub fn require_member(&self, name: &str) -> Result<PathBuf> {
        self.find_member(name)
            .ok_or_else(|| Error::missing_member(name))
    }

    /// Paths of all members with the given extension, in name order
    pub fn members_with_extension(&self, extension: &str) -> Vec<PathBuf> {
        self.members
            .iter()
            .filter(|member| {
                Path::new(member)
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
            })
            .map(|member| self.area.path().join(member))
            .collect()
    }

    /// Remove the extracted members now instead of at drop
    pub fn close(self) {
        drop(self);
    }
}

fn file_name_of(member: &str) -> Option<&str> {
    Path::new(member).file_name().and_then(|name| name.to_str())
}

/// Extract every safely-named member under `root`
fn extract_members(zip: &mut ZipArchive<File>, root: &Path, archive: &Path) -> Result<usize> {
    let mut extracted = 0;
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).map_err(|e| {
            Error::archive(
                archive.display().to_string(),
                format!("member {} unreadable", i),
                Some(e),
            )
        })?;

        let Some(relative) = entry.enclosed_name() else {
            warn!("Skipping archive member with unsafe path: {}", entry.name());
            continue;
        };
        let target = root.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&target)
                .map_err(|e| Error::io(format!("Failed to create {}", target.display()), e))?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::io(format!("Failed to create {}", parent.display()), e))?;
        }
        let mut out = File::create(&target)
            .map_err(|e| Error::io(format!("Failed to create {}", target.display()), e))?;
        io::copy(&mut entry, &mut out)
            .map_err(|e| Error::io(format!("Failed to extract {}", entry.name()), e))?;
        debug!("Extracted {} ({} bytes)", entry.name(), entry.size());
        extracted += 1;
    }
    Ok(extracted)
}

/// List extracted files relative to `root`, sorted
fn list_members(root: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in WalkDir::new(root).min_depth(1) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(root) {
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}
