//! Tests for extraction, format detection and working-area cleanup

use super::*;
use crate::Error;
use crate::app::services::archive::{FormatVariant, NdaxArchive, WorkingArea};
use crate::config::ArchiveConfig;
use std::time::Duration;

#[test]
fn test_single_stream_detected() {
    let archive = create_test_archive(&[("data.ndc", b"\x00\x01"), ("TestInfo.xml", b"<a/>")]);
    let opened = NdaxArchive::open(archive.path(), &ArchiveConfig::default()).unwrap();

    assert_eq!(opened.format(), Some(FormatVariant::SingleStream));
    assert_eq!(opened.member_names(), &["TestInfo.xml", "data.ndc"]);
    assert!(opened.require_member("data.ndc").unwrap().exists());
}

#[test]
fn test_split_stream_detected() {
    let archive = create_test_archive(&[
        ("data.ndc", b"\x00"),
        ("data_runInfo.ndc", b"\x00"),
        ("data_step.ndc", b"\x00"),
    ]);
    let opened = NdaxArchive::open(archive.path(), &ArchiveConfig::default()).unwrap();
    assert_eq!(opened.format(), Some(FormatVariant::SplitStream));
}

#[test]
fn test_missing_data_stream_is_fatal() {
    let archive = create_test_archive(&[("TestInfo.xml", b"<a/>")]);
    let result = NdaxArchive::open(archive.path(), &ArchiveConfig::default());
    assert!(matches!(result, Err(Error::MissingMember { member }) if member == "data.ndc"));
}

#[test]
fn test_metadata_open_needs_no_data_stream() {
    let archive = create_test_archive(&[("TestInfo.xml", b"<a/>")]);
    let opened = NdaxArchive::open_metadata(archive.path(), &ArchiveConfig::default()).unwrap();
    assert_eq!(opened.format(), None);
    assert!(opened.find_member("TestInfo.xml").is_some());
}

#[test]
fn test_corrupt_container_is_archive_error() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"this is not a zip file at all").unwrap();
    let result = NdaxArchive::open(file.path(), &ArchiveConfig::default());
    assert!(matches!(result, Err(Error::Archive { .. })));
}

#[test]
fn test_nested_members_found_by_file_name() {
    let archive = create_test_archive(&[("channel/data.ndc", b"\x00"), ("channel/Step.xml", b"<a/>")]);
    let opened = NdaxArchive::open(archive.path(), &ArchiveConfig::default()).unwrap();
    assert_eq!(opened.format(), Some(FormatVariant::SingleStream));
    assert!(opened.find_member("Step.xml").is_some());
    assert_eq!(opened.members_with_extension("xml").len(), 1);
}

#[test]
fn test_caller_work_dir_is_cleared_before_and_after() {
    let work = tempfile::tempdir().unwrap();
    std::fs::write(work.path().join("stale.ndc"), b"old").unwrap();

    let archive = create_test_archive(&[("data.ndc", b"\x00")]);
    let config = ArchiveConfig {
        work_dir: Some(work.path().to_path_buf()),
        ..ArchiveConfig::default()
    };
    let opened = NdaxArchive::open(archive.path(), &config).unwrap();
    assert!(!work.path().join("stale.ndc").exists());
    assert!(work.path().join("data.ndc").exists());

    opened.close();
    assert_eq!(std::fs::read_dir(work.path()).unwrap().count(), 0);
}

#[test]
fn test_work_dir_cleared_when_detection_fails() {
    let work = tempfile::tempdir().unwrap();
    let archive = create_test_archive(&[("Step.xml", b"<a/>")]);
    let config = ArchiveConfig {
        work_dir: Some(work.path().to_path_buf()),
        ..ArchiveConfig::default()
    };

    assert!(NdaxArchive::open(archive.path(), &config).is_err());
    assert_eq!(std::fs::read_dir(work.path()).unwrap().count(), 0);
}

#[test]
fn test_clear_on_vanished_directory_does_not_fail() {
    let work = tempfile::tempdir().unwrap();
    let target = work.path().join("area");
    let area = WorkingArea::at(&target, Duration::from_millis(1)).unwrap();
    std::fs::remove_dir_all(&target).unwrap();

    assert_eq!(area.clear(), 0);
    drop(area);
}

#[test]
fn test_temporary_areas_are_distinct() {
    let a = WorkingArea::temporary(Duration::from_millis(1)).unwrap();
    let b = WorkingArea::temporary(Duration::from_millis(1)).unwrap();
    assert_ne!(a.path(), b.path());
}
