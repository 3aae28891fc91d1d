//! OAI-PMH response parsing using quick-xml
//!
//! Streaming event parser for `ListRecords`, `ListMetadataFormats` and
//! `ListSets` responses. Matching is on local names so namespace prefixes
//! never matter, and unknown elements are skipped rather than rejected,
//! since repositories disagree wildly about optional structure.
//!
//! Raw `<record>` and inner `<metadata>` payloads are captured as verbatim
//! byte spans of the response text, so record output round-trips the
//! server's serialization instead of a re-rendered approximation.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::QName;

use crate::error::HarvestError;
use crate::token::ResumptionToken;

/// Dublin Core fields extracted for the metadata table.
///
/// Entries keep listing order; an empty element becomes `None` so the row
/// builder can drop it without disturbing the order of its neighbors.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DcFields {
    pub identifiers: Vec<Option<String>>,
    pub creators: Vec<Option<String>>,
    pub titles: Vec<Option<String>>,
    pub subjects: Vec<Option<String>>,
}

#[derive(Clone, Copy)]
enum DcKind {
    Identifier,
    Creator,
    Title,
    Subject,
}

impl DcFields {
    fn push(&mut self, kind: DcKind, value: Option<String>) {
        match kind {
            DcKind::Identifier => self.identifiers.push(value),
            DcKind::Creator => self.creators.push(value),
            DcKind::Title => self.titles.push(value),
            DcKind::Subject => self.subjects.push(value),
        }
    }
}

/// One record from a `ListRecords` page.
#[derive(Debug, Default, Clone)]
pub struct OaiRecord {
    /// OAI identifier from the record header
    pub identifier: String,
    /// Datestamp from the record header, kept verbatim
    pub datestamp: String,
    /// Header carried `status="deleted"`; no metadata payload exists
    pub deleted: bool,
    /// Verbatim `<record>...</record>` element
    pub raw: String,
    /// Verbatim first child of `<metadata>`, when present
    pub metadata: Option<String>,
    /// Extracted Dublin Core fields
    pub fields: DcFields,
}

/// One page of a `ListRecords` response.
#[derive(Debug, Default)]
pub struct RecordPage {
    pub records: Vec<OaiRecord>,
    /// Continuation state; `None` once the listing is exhausted
    pub token: Option<ResumptionToken>,
}

/// One entry of a `ListSets` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetInfo {
    pub spec: String,
    pub name: Option<String>,
}

fn local<'a>(name: QName<'a>) -> &'a [u8] {
    name.local_name().into_inner()
}

fn pos(reader: &Reader<&[u8]>) -> usize {
    reader.buffer_position() as usize
}

fn unescape_text(t: &quick_xml::events::BytesText) -> Result<String, HarvestError> {
    t.unescape()
        .map(|s| s.into_owned())
        .map_err(|e| HarvestError::Protocol(format!("malformed XML text: {e}")))
}

/// Parse a `ListRecords` response into a page.
///
/// A `noRecordsMatch` error element yields an empty completed page; any
/// other OAI error code is a protocol failure.
pub fn parse_list_records(xml: &str) -> Result<RecordPage, HarvestError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut page = RecordPage::default();
    loop {
        let ev_start = pos(&reader);
        match reader.read_event()? {
            Event::Eof => break,
            Event::Start(e) => match local(e.name()) {
                b"record" => {
                    let record = parse_record(xml, &mut reader, ev_start)?;
                    page.records.push(record);
                }
                b"resumptionToken" => {
                    page.token = parse_token(&mut reader, &e)?;
                }
                b"error" => {
                    oai_error(&mut reader, &e)?;
                    // noRecordsMatch: empty, completed listing
                    return Ok(RecordPage::default());
                }
                _ => {}
            },
            Event::Empty(e) => match local(e.name()) {
                // Attribute-only token on the final page: no continuation
                b"resumptionToken" => page.token = None,
                b"error" => {
                    empty_oai_error(&e)?;
                    return Ok(RecordPage::default());
                }
                _ => {}
            },
            _ => {}
        }
    }
    Ok(page)
}

/// Parse a `ListMetadataFormats` response into the prefixes it advertises.
pub fn parse_metadata_formats(xml: &str) -> Result<Vec<String>, HarvestError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut formats = Vec::new();
    let mut capturing = false;
    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Start(e) => match local(e.name()) {
                b"metadataPrefix" => capturing = true,
                b"error" => {
                    oai_error(&mut reader, &e)?;
                    return Ok(Vec::new());
                }
                _ => {}
            },
            Event::Text(t) if capturing => {
                formats.push(unescape_text(&t)?);
                capturing = false;
            }
            Event::End(_) => capturing = false,
            _ => {}
        }
    }
    Ok(formats)
}

/// Parse one `ListSets` page: the sets plus the continuation token text,
/// since set listings paginate like record listings do.
pub fn parse_sets(xml: &str) -> Result<(Vec<SetInfo>, Option<String>), HarvestError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut sets = Vec::new();
    let mut token = None;
    let mut spec: Option<String> = None;
    let mut name: Option<String> = None;
    let mut capture: Option<&'static str> = None;
    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Start(e) => match local(e.name()) {
                b"set" => {
                    spec = None;
                    name = None;
                }
                b"setSpec" => capture = Some("spec"),
                b"setName" => capture = Some("name"),
                b"resumptionToken" => {
                    token = parse_token(&mut reader, &e)?.and_then(|t| t.token);
                }
                b"error" => {
                    oai_error(&mut reader, &e)?;
                    return Ok((Vec::new(), None));
                }
                _ => {}
            },
            Event::Text(t) => {
                match capture {
                    Some("spec") => spec = Some(unescape_text(&t)?),
                    Some("name") => name = Some(unescape_text(&t)?),
                    _ => {}
                }
                capture = None;
            }
            Event::End(e) => {
                capture = None;
                if local(e.name()) == b"set" {
                    if let Some(spec) = spec.take() {
                        sets.push(SetInfo {
                            spec,
                            name: name.take(),
                        });
                    }
                }
            }
            _ => {}
        }
    }
    Ok((sets, token))
}

enum Capture {
    Identifier,
    Datestamp,
}

/// Parse one `<record>` element; the opening tag was just read and
/// `record_start` is its byte offset in `xml`.
fn parse_record(
    xml: &str,
    reader: &mut Reader<&[u8]>,
    record_start: usize,
) -> Result<OaiRecord, HarvestError> {
    let mut rec = OaiRecord::default();
    let mut depth = 1usize;
    let mut in_header = false;
    let mut in_metadata = false;
    let mut capture: Option<Capture> = None;
    // Fragment = first child element of <metadata>
    let mut frag_start: Option<usize> = None;
    let mut frag_end: Option<usize> = None;
    let mut frag_depth = 0usize;
    // Dublin Core element currently open: kind, its depth, collected text
    let mut dc: Option<(DcKind, usize)> = None;
    let mut dc_text: Option<String> = None;

    loop {
        let ev_start = pos(reader);
        match reader.read_event()? {
            Event::Start(e) => {
                depth += 1;
                if in_metadata && frag_start.is_none() {
                    frag_start = Some(ev_start);
                    frag_depth = depth;
                }
                match local(e.name()) {
                    b"header" if depth == 2 => {
                        in_header = true;
                        rec.deleted = header_deleted(&e);
                    }
                    b"metadata" if depth == 2 => in_metadata = true,
                    b"identifier" if in_header => capture = Some(Capture::Identifier),
                    b"datestamp" if in_header => capture = Some(Capture::Datestamp),
                    other if in_metadata && dc.is_none() => {
                        if let Some(kind) = dc_kind(other) {
                            dc = Some((kind, depth));
                            dc_text = None;
                        }
                    }
                    _ => {}
                }
            }
            Event::Empty(e) => {
                if in_metadata {
                    if frag_start.is_none() {
                        frag_start = Some(ev_start);
                        frag_end = Some(pos(reader));
                    }
                    if dc.is_none() {
                        if let Some(kind) = dc_kind(local(e.name())) {
                            rec.fields.push(kind, None);
                        }
                    }
                } else if local(e.name()) == b"header" && depth == 1 {
                    rec.deleted = header_deleted(&e);
                }
            }
            Event::Text(t) => {
                let text = unescape_text(&t)?;
                if dc.is_some() {
                    if dc_text.is_none() {
                        dc_text = Some(text);
                    }
                } else {
                    match capture {
                        Some(Capture::Identifier) => rec.identifier = text,
                        Some(Capture::Datestamp) => rec.datestamp = text,
                        None => {}
                    }
                }
            }
            Event::CData(t) => {
                if dc.is_some() && dc_text.is_none() {
                    dc_text = Some(String::from_utf8_lossy(&t).into_owned());
                }
            }
            Event::End(e) => {
                if frag_start.is_some() && frag_end.is_none() && depth == frag_depth {
                    frag_end = Some(pos(reader));
                }
                if let Some((kind, dc_depth)) = dc {
                    if depth == dc_depth {
                        let value = dc_text.take().filter(|s| !s.is_empty());
                        rec.fields.push(kind, value);
                        dc = None;
                    }
                }
                match local(e.name()) {
                    b"header" => in_header = false,
                    b"metadata" => in_metadata = false,
                    _ => {}
                }
                capture = None;
                depth -= 1;
                if depth == 0 {
                    rec.raw = xml[record_start..pos(reader)].trim_start().to_string();
                    break;
                }
            }
            Event::Eof => {
                return Err(HarvestError::Protocol(
                    "unexpected end of response inside <record>".to_string(),
                ));
            }
            _ => {}
        }
    }

    if let (Some(start), Some(end)) = (frag_start, frag_end) {
        rec.metadata = Some(xml[start..end].trim_start().to_string());
    }
    Ok(rec)
}

fn dc_kind(name: &[u8]) -> Option<DcKind> {
    match name {
        b"identifier" => Some(DcKind::Identifier),
        b"creator" => Some(DcKind::Creator),
        b"title" => Some(DcKind::Title),
        b"subject" => Some(DcKind::Subject),
        _ => None,
    }
}

fn header_deleted(e: &BytesStart) -> bool {
    e.attributes()
        .filter_map(Result::ok)
        .any(|a| local(a.key) == b"status" && a.value.as_ref() == b"deleted")
}

/// Parse a `<resumptionToken>` element: attributes plus token text.
/// Returns `None` when the text is empty, meaning the listing is complete.
fn parse_token(
    reader: &mut Reader<&[u8]>,
    e: &BytesStart,
) -> Result<Option<ResumptionToken>, HarvestError> {
    let mut tok = ResumptionToken::default();
    for a in e.attributes().filter_map(Result::ok) {
        let value = a
            .unescape_value()
            .map_err(|e| HarvestError::Protocol(format!("malformed attribute: {e}")))?;
        match local(a.key) {
            b"cursor" => tok.cursor = value.parse().ok(),
            b"completeListSize" => tok.complete_list_size = value.parse().ok(),
            b"expirationDate" => tok.expiration = Some(value.into_owned()),
            _ => {}
        }
    }
    loop {
        match reader.read_event()? {
            Event::Text(t) => {
                let text = unescape_text(&t)?;
                if !text.is_empty() {
                    tok.token = Some(text);
                }
            }
            Event::End(end) if local(end.name()) == b"resumptionToken" => break,
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(if tok.token.is_some() { Some(tok) } else { None })
}

/// Consume an `<error>` element; `noRecordsMatch` is not an error for us.
fn oai_error(reader: &mut Reader<&[u8]>, e: &BytesStart) -> Result<(), HarvestError> {
    let code = error_code(e);
    let mut message = String::new();
    loop {
        match reader.read_event()? {
            Event::Text(t) => message = unescape_text(&t)?,
            Event::End(end) if local(end.name()) == b"error" => break,
            Event::Eof => break,
            _ => {}
        }
    }
    if code == "noRecordsMatch" {
        log::info!("repository reports no records match the request");
        Ok(())
    } else {
        Err(HarvestError::Protocol(format!("{code}: {message}")))
    }
}

fn empty_oai_error(e: &BytesStart) -> Result<(), HarvestError> {
    let code = error_code(e);
    if code == "noRecordsMatch" {
        log::info!("repository reports no records match the request");
        Ok(())
    } else {
        Err(HarvestError::Protocol(code))
    }
}

fn error_code(e: &BytesStart) -> String {
    e.attributes()
        .filter_map(Result::ok)
        .find(|a| local(a.key) == b"code")
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
        .unwrap_or_else(|| "unknown".to_string())
}
