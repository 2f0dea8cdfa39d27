//! DICOM metadata extraction.
//!
//! Binary parsing sits behind [`MetadataParser`]; the built-in
//! [`Part10Parser`] understands DICOM Part 10 files in explicit or implicit
//! VR little endian and reads only as far as the patient module (group 0010).

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::{invalid, Args, ParamDef, Tool, ToolArgs, ToolSpec};
use crate::envelope::Envelope;
use crate::types::{Error, Result};

pub const PATIENT_NAME: u32 = 0x0010_0010;
pub const PATIENT_ID: u32 = 0x0010_0020;
pub const STUDY_DESCRIPTION: u32 = 0x0008_1030;
pub const SERIES_DESCRIPTION: u32 = 0x0008_103E;

/// Output field name for each extracted tag, in output order.
const FIELDS: [(&str, u32); 4] = [
    ("patientName", PATIENT_NAME),
    ("patientId", PATIENT_ID),
    ("studyDescription", STUDY_DESCRIPTION),
    ("seriesDescription", SERIES_DESCRIPTION),
];

// =============================================================================
// Parser seam
// =============================================================================

/// Flat tag → text record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DicomRecord {
    elements: BTreeMap<u32, String>,
}

impl DicomRecord {
    pub fn insert(&mut self, tag: u32, value: impl Into<String>) {
        self.elements.insert(tag, value.into());
    }

    pub fn string(&self, tag: u32) -> Option<&str> {
        self.elements.get(&tag).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// Turns raw file bytes into a [`DicomRecord`].
pub trait MetadataParser: Send + Sync + fmt::Debug {
    fn parse(&self, bytes: &[u8]) -> Result<DicomRecord>;
}

// =============================================================================
// Part 10 reader
// =============================================================================

const PREAMBLE_LEN: usize = 128;
const MAGIC: &[u8; 4] = b"DICM";
const UNDEFINED_LENGTH: u32 = 0xFFFF_FFFF;
const LAST_GROUP: u16 = 0x0010;
const MAX_NESTING: usize = 32;
const MAX_TEXT_LEN: usize = 1024;

const IMPLICIT_VR_LE: &str = "1.2.840.10008.1.2";
const EXPLICIT_VR_BE: &str = "1.2.840.10008.1.2.2";
const DEFLATED_EXPLICIT_VR_LE: &str = "1.2.840.10008.1.2.1.99";

/// VRs with a 2-byte reserved field and 4-byte length in explicit encoding.
const LONG_VRS: [&[u8; 2]; 13] = [
    b"OB", b"OD", b"OF", b"OL", b"OV", b"OW", b"SQ", b"SV", b"UC", b"UN", b"UR", b"UT", b"UV",
];

const TEXT_VRS: [&[u8; 2]; 17] = [
    b"AE", b"AS", b"CS", b"DA", b"DS", b"DT", b"IS", b"LO", b"LT", b"PN", b"SH", b"ST", b"TM",
    b"UC", b"UI", b"UR", b"UT",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    ExplicitLittle,
    ImplicitLittle,
}

/// Built-in DICOM Part 10 reader.
#[derive(Debug, Default, Clone, Copy)]
pub struct Part10Parser;

impl MetadataParser for Part10Parser {
    fn parse(&self, bytes: &[u8]) -> Result<DicomRecord> {
        if bytes.len() < PREAMBLE_LEN + MAGIC.len() || &bytes[PREAMBLE_LEN..PREAMBLE_LEN + 4] != MAGIC {
            return Err(Error::parse(
                "DICM prefix not found at offset 128; not a DICOM Part 10 file",
            ));
        }
        let mut reader = Reader::new(bytes, PREAMBLE_LEN + MAGIC.len());

        // File meta group is always explicit VR little endian.
        let mut transfer_syntax = String::new();
        while reader.remaining() >= 4 && reader.peek_u16(0)? == 0x0002 {
            let element = read_element(&mut reader, Encoding::ExplicitLittle, 0)?;
            if element.tag == 0x0002_0010 {
                if let Some(value) = element.value {
                    transfer_syntax = decode_text(value);
                }
            }
        }

        let encoding = match transfer_syntax.as_str() {
            IMPLICIT_VR_LE => Encoding::ImplicitLittle,
            EXPLICIT_VR_BE => return Err(Error::parse("big endian transfer syntax is not supported")),
            DEFLATED_EXPLICIT_VR_LE => return Err(Error::parse("deflated transfer syntax is not supported")),
            _ => Encoding::ExplicitLittle,
        };

        let mut record = DicomRecord::default();
        while reader.remaining() >= 4 {
            if reader.peek_u16(0)? > LAST_GROUP {
                break;
            }
            let element = read_element(&mut reader, encoding, 0)?;
            let Some(value) = element.value else {
                continue;
            };
            let textual = match element.vr {
                Some(vr) => TEXT_VRS.contains(&&vr),
                None => value.len() <= MAX_TEXT_LEN,
            };
            if textual {
                record.insert(element.tag, decode_text(value));
            }
        }
        Ok(record)
    }
}

struct Element<'a> {
    tag: u32,
    vr: Option<[u8; 2]>,
    /// `None` for sequences.
    value: Option<&'a [u8]>,
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(Error::parse(format!(
                "unexpected end of data at offset {} (need {n} bytes)",
                self.pos
            )));
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn peek_u16(&self, offset: usize) -> Result<u16> {
        let at = self.pos + offset;
        self.data
            .get(at..at + 2)
            .map(|b| u16::from_le_bytes([b[0], b[1]]))
            .ok_or_else(|| Error::parse(format!("unexpected end of data at offset {at}")))
    }

    fn u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }
}

fn read_element<'a>(reader: &mut Reader<'a>, encoding: Encoding, depth: usize) -> Result<Element<'a>> {
    if depth > MAX_NESTING {
        return Err(Error::parse("sequence nesting too deep"));
    }
    let group = reader.u16()?;
    let element = reader.u16()?;
    let tag = (u32::from(group) << 16) | u32::from(element);

    let (vr, length) = match encoding {
        Encoding::ExplicitLittle => {
            let raw = reader.take(2)?;
            let vr = [raw[0], raw[1]];
            if LONG_VRS.contains(&&vr) {
                reader.take(2)?;
                (Some(vr), reader.u32()?)
            } else {
                (Some(vr), u32::from(reader.u16()?))
            }
        }
        Encoding::ImplicitLittle => (None, reader.u32()?),
    };

    if length == UNDEFINED_LENGTH {
        // UN with undefined length is encoded as implicit VR.
        let inner = if vr == Some(*b"UN") {
            Encoding::ImplicitLittle
        } else {
            encoding
        };
        skip_sequence(reader, inner, depth + 1)?;
        return Ok(Element { tag, vr, value: None });
    }

    let value = reader.take(length as usize)?;
    if vr == Some(*b"SQ") {
        return Ok(Element { tag, vr, value: None });
    }
    Ok(Element {
        tag,
        vr,
        value: Some(value),
    })
}

/// Skip items up to and including the sequence delimiter.
fn skip_sequence(reader: &mut Reader<'_>, encoding: Encoding, depth: usize) -> Result<()> {
    loop {
        let group = reader.u16()?;
        let element = reader.u16()?;
        let length = reader.u32()?;
        match (group, element) {
            (0xFFFE, 0xE0DD) => return Ok(()),
            (0xFFFE, 0xE000) if length == UNDEFINED_LENGTH => skip_item(reader, encoding, depth)?,
            (0xFFFE, 0xE000) => {
                reader.take(length as usize)?;
            }
            _ => {
                return Err(Error::parse(format!(
                    "unexpected tag ({group:04X},{element:04X}) inside sequence"
                )))
            }
        }
    }
}

/// Skip nested elements up to and including the item delimiter.
fn skip_item(reader: &mut Reader<'_>, encoding: Encoding, depth: usize) -> Result<()> {
    loop {
        if reader.peek_u16(0)? == 0xFFFE && reader.peek_u16(2)? == 0xE00D {
            reader.take(8)?;
            return Ok(());
        }
        read_element(reader, encoding, depth)?;
    }
}

fn decode_text(value: &[u8]) -> String {
    String::from_utf8_lossy(value)
        .trim_matches(|c: char| c == ' ' || c == '\0')
        .to_string()
}

// =============================================================================
// Tool
// =============================================================================

pub struct DicomMetadata {
    spec: ToolSpec,
    parser: Arc<dyn MetadataParser>,
}

impl fmt::Debug for DicomMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DicomMetadata")
            .field("parser", &self.parser)
            .finish_non_exhaustive()
    }
}

impl Default for DicomMetadata {
    fn default() -> Self {
        Self::new()
    }
}

impl DicomMetadata {
    pub fn new() -> Self {
        Self::with_parser(Arc::new(Part10Parser))
    }

    pub fn with_parser(parser: Arc<dyn MetadataParser>) -> Self {
        let spec = ToolSpec::new("extract_dicom_metadata", "Extract metadata from a DICOM file")
            .param(ParamDef::string("file_path", "Path to the DICOM file").required());
        Self { spec, parser }
    }

    /// Read `file_path` and pull the patient and study description fields.
    /// Fields missing from the file are omitted.
    pub async fn extract(&self, file_path: &str) -> Envelope {
        match self.read(file_path).await {
            Ok(envelope) => envelope,
            Err(err) => {
                tracing::warn!(file_path, error = %err, "dicom_parse_failed");
                Envelope::error(format!("Error parsing DICOM file: {err}"))
            }
        }
    }

    async fn read(&self, file_path: &str) -> Result<Envelope> {
        let bytes = tokio::fs::read(file_path).await?;
        let record = self.parser.parse(&bytes)?;

        let mut fields = Map::new();
        for (name, tag) in FIELDS {
            if let Some(value) = record.string(tag) {
                fields.insert(name.to_string(), Value::from(value));
            }
        }
        Envelope::success(Value::Object(fields))
    }
}

#[async_trait]
impl Tool for DicomMetadata {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn call(&self, args: &ToolArgs) -> Arc<Envelope> {
        let Some(file_path) = Args::new(args).text("file_path") else {
            return invalid("File path is required");
        };
        Arc::new(self.extract(&file_path).await)
    }
}
