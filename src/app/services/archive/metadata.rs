//! XML metadata lookups
//!
//! The instrument writes its XML members in GB2312/GBK unless the XML
//! declaration says otherwise. Each lookup reads a primary member first and
//! falls back to scanning the other XML members; absent fields resolve to
//! `None`, which the public accessors turn into sentinel strings.

use super::extractor::NdaxArchive;
use crate::app::models::TestMetadata;
use crate::constants::members;
use crate::{Error, Result};
use encoding_rs::{Encoding, GBK};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

/// An attribute on the first element whose ancestry ends with `path`
#[derive(Debug, Clone, Copy)]
pub struct AttributeQuery<'a> {
    pub path: &'a [&'a str],
    pub attribute: &'a str,
}

const TEST_INFO_BARCODE: AttributeQuery = AttributeQuery {
    path: &["TestInfo"],
    attribute: "Barcode",
};
const TEST_INFO_STEP_NAME: AttributeQuery = AttributeQuery {
    path: &["TestInfo"],
    attribute: "StepName",
};
const TEST_INFO_START_TIME: AttributeQuery = AttributeQuery {
    path: &["TestInfo"],
    attribute: "StartTime",
};
const HEAD_BARCODE: AttributeQuery = AttributeQuery {
    path: &["Head_Info", "Barcode"],
    attribute: "Value",
};
const HEAD_STEP_NAME: AttributeQuery = AttributeQuery {
    path: &["Head_Info", "StepName"],
    attribute: "Value",
};
const HEAD_REMARK: AttributeQuery = AttributeQuery {
    path: &["Head_Info", "Remark"],
    attribute: "Value",
};
const HEAD_START_TIME: AttributeQuery = AttributeQuery {
    path: &["Head_Info", "StartTime"],
    attribute: "Value",
};

/// Reads test metadata from an opened archive
pub struct MetadataReader<'a> {
    archive: &'a NdaxArchive,
}

impl<'a> MetadataReader<'a> {
    pub fn new(archive: &'a NdaxArchive) -> Self {
        Self { archive }
    }

    /// Cell barcode: `TestInfo@Barcode`, else `Head_Info/Barcode@Value` in any XML member
    pub fn barcode(&self) -> Result<Option<String>> {
        if let Some(value) = self.lookup_in(members::TEST_INFO, TEST_INFO_BARCODE)? {
            return Ok(Some(value));
        }
        self.lookup_in_others(members::TEST_INFO, HEAD_BARCODE)
    }

    /// Step program name with any `.xml` suffix removed
    pub fn process_name(&self) -> Result<Option<String>> {
        let value = match self.lookup_in(members::TEST_INFO, TEST_INFO_STEP_NAME)? {
            Some(value) => Some(value),
            None => self.lookup_in_others(members::TEST_INFO, HEAD_STEP_NAME)?,
        };
        Ok(value.map(|name| strip_xml_suffix(&name).to_string()))
    }

    /// Free-text remark: `Step.xml` first, then the remaining XML members
    pub fn remark(&self) -> Result<Option<String>> {
        if let Some(value) = self.lookup_in(members::STEP_XML, HEAD_REMARK)? {
            return Ok(Some(value));
        }
        self.lookup_in_others(members::STEP_XML, HEAD_REMARK)
    }

    pub fn start_time(&self) -> Result<Option<String>> {
        if let Some(value) = self.lookup_in(members::TEST_INFO, TEST_INFO_START_TIME)? {
            return Ok(Some(value));
        }
        self.lookup_in(members::STEP_XML, HEAD_START_TIME)
    }

    /// All four fields
    pub fn read_all(&self) -> Result<TestMetadata> {
        Ok(TestMetadata {
            barcode: self.barcode()?,
            process_name: self.process_name()?,
            remark: self.remark()?,
            start_time: self.start_time()?,
        })
    }

    fn lookup_in(&self, member: &str, query: AttributeQuery) -> Result<Option<String>> {
        match self.archive.find_member(member) {
            Some(path) => lookup_attribute(&path, query),
            None => {
                debug!("{} not present in archive", member);
                Ok(None)
            }
        }
    }

    fn lookup_in_others(&self, primary: &str, query: AttributeQuery) -> Result<Option<String>> {
        for path in self.archive.members_with_extension(members::XML_EXTENSION) {
            if path.file_name().and_then(|n| n.to_str()) == Some(primary) {
                continue;
            }
            if let Some(value) = lookup_attribute(&path, query)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }
}

/// Read an XML member and look up one attribute
pub fn lookup_attribute(path: &Path, query: AttributeQuery) -> Result<Option<String>> {
    let member = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let bytes =
        fs::read(path).map_err(|e| Error::io(format!("Failed to read {}", path.display()), e))?;
    let text = decode_xml_text(&bytes);
    find_attribute(&text, query).map_err(|message| Error::xml(member, message))
}

/// Decode XML bytes using the declared encoding, defaulting to GBK
///
/// A byte-order mark overrides both.
pub fn decode_xml_text(bytes: &[u8]) -> String {
    let encoding = declared_encoding(bytes).unwrap_or(GBK);
    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        debug!("XML text contained bytes invalid in {}", used.name());
    }
    text.into_owned()
}

fn declared_encoding(bytes: &[u8]) -> Option<&'static Encoding> {
    static DECLARATION: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = DECLARATION
        .get_or_init(|| Regex::new(r#"<\?xml[^>]*encoding\s*=\s*["']([A-Za-z0-9._\-]+)["']"#).ok())
        .as_ref()?;

    let head = &bytes[..bytes.len().min(256)];
    let head = String::from_utf8_lossy(head);
    let label = pattern.captures(&head)?.get(1)?.as_str().to_string();
    Encoding::for_label(label.as_bytes())
}

/// Find the first element (document order) whose ancestry ends with `query.path`
/// and return its `query.attribute`
pub fn find_attribute(xml: &str, query: AttributeQuery) -> std::result::Result<Option<String>, String> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) => {
                stack.push(element_name(&element));
                if let Some(value) = matching_attribute(&stack, &element, query)? {
                    return Ok(Some(value));
                }
            }
            Ok(Event::Empty(element)) => {
                stack.push(element_name(&element));
                if let Some(value) = matching_attribute(&stack, &element, query)? {
                    return Ok(Some(value));
                }
                stack.pop();
            }
            Ok(Event::End(_)) => {
                stack.pop();
            }
            Ok(Event::Eof) => return Ok(None),
            Ok(_) => {}
            Err(e) => {
                return Err(format!(
                    "malformed XML at byte {}: {}",
                    reader.buffer_position(),
                    e
                ));
            }
        }
    }
}

fn element_name(element: &BytesStart) -> String {
    String::from_utf8_lossy(element.name().as_ref()).into_owned()
}

fn matching_attribute(
    stack: &[String],
    element: &BytesStart,
    query: AttributeQuery,
) -> std::result::Result<Option<String>, String> {
    if stack.len() < query.path.len() {
        return Ok(None);
    }
    let tail = &stack[stack.len() - query.path.len()..];
    if tail.iter().zip(query.path).any(|(have, want)| have != want) {
        return Ok(None);
    }

    let attribute = element
        .try_get_attribute(query.attribute)
        .map_err(|e| format!("bad attribute on <{}>: {}", query.path.join("/"), e))?;
    match attribute {
        Some(attribute) => {
            let value = attribute
                .unescape_value()
                .map_err(|e| format!("bad attribute value: {}", e))?;
            Ok(Some(value.into_owned()))
        }
        // Element without the attribute: keep scanning.
        None => Ok(None),
    }
}

fn strip_xml_suffix(name: &str) -> &str {
    name.strip_suffix(".xml")
        .or_else(|| name.strip_suffix(".XML"))
        .unwrap_or(name)
}

/// Substitute the sentinel string for an absent field
pub fn or_sentinel(value: Option<String>, sentinel: &str) -> String {
    value.unwrap_or_else(|| sentinel.to_string())
}
