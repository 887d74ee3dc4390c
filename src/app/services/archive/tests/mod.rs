//! Tests for archive extraction and metadata lookup
//!
//! Archives are built on the fly with `zip::ZipWriter` into temporary files.

pub mod extractor_tests;

use std::io::Write;
use tempfile::NamedTempFile;
use zip::write::SimpleFileOptions;

/// Write a ZIP archive with the given members
pub fn create_test_archive(members: &[(&str, &[u8])]) -> NamedTempFile {
    let file = tempfile::Builder::new()
        .suffix(".ndax")
        .tempfile()
        .unwrap();
    let mut writer = zip::ZipWriter::new(file.reopen().unwrap());
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (name, bytes) in members {
        writer.start_file(*name, options).unwrap();
        writer.write_all(bytes).unwrap();
    }
    writer.finish().unwrap();
    file
}

/// Encode text as GBK, the way the instrument writes its XML
pub fn gbk(text: &str) -> Vec<u8> {
    let (bytes, _, had_errors) = encoding_rs::GBK.encode(text);
    assert!(!had_errors);
    bytes.into_owned()
}

pub fn test_info_xml(barcode: &str, step_name: &str, start_time: &str) -> Vec<u8> {
    gbk(&format!(
        "<?xml version=\"1.0\" encoding=\"GB2312\"?>\n\
         <root><config><TestInfo Barcode=\"{}\" StepName=\"{}\" StartTime=\"{}\"/></config></root>",
        barcode, step_name, start_time
    ))
}

pub fn step_xml(remark: &str) -> Vec<u8> {
    gbk(&format!(
        "<?xml version=\"1.0\" encoding=\"GB2312\"?>\n\
         <root><config><Head_Info><Remark Value=\"{}\"/><StartTime Value=\"2024-03-01 08:00:00\"/></Head_Info>\
         <Step_Info Num=\"1\"/></config></root>",
        remark
    ))
}
