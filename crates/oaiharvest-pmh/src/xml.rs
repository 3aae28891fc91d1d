//! Namespace stripping for record output.
//!
//! Rewrites a serialized element, dropping namespace prefixes from tag and
//! attribute names and removing `xmlns`/`xmlns:*` declarations. The element
//! structure, text and escaping are otherwise preserved.

use std::str;

use quick_xml::Reader;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::Writer;

use crate::error::HarvestError;

fn utf8(bytes: &[u8]) -> Result<&str, HarvestError> {
    str::from_utf8(bytes).map_err(|e| HarvestError::Protocol(format!("non-UTF8 XML name: {e}")))
}

fn local_str(name: &[u8]) -> Result<&str, HarvestError> {
    let local = match name.iter().position(|&b| b == b':') {
        Some(idx) => &name[idx + 1..],
        None => name,
    };
    utf8(local)
}

fn is_xmlns(key: &[u8]) -> bool {
    key == b"xmlns" || key.starts_with(b"xmlns:")
}

/// Strip all namespaces from a serialized XML element.
pub fn strip_namespaces(xml: &str) -> Result<String, HarvestError> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::new());

    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Start(e) => {
                writer
                    .write_event(Event::Start(stripped_start(&e)?))
                    .map_err(write_err)?;
            }
            Event::Empty(e) => {
                writer
                    .write_event(Event::Empty(stripped_start(&e)?))
                    .map_err(write_err)?;
            }
            Event::End(e) => {
                let name = local_str(e.name().as_ref())?.to_string();
                writer
                    .write_event(Event::End(BytesEnd::new(name)))
                    .map_err(write_err)?;
            }
            // Text, CDATA, comments and PIs pass through untouched
            ev => writer.write_event(ev).map_err(write_err)?,
        }
    }

    String::from_utf8(writer.into_inner())
        .map_err(|e| HarvestError::Protocol(format!("non-UTF8 XML output: {e}")))
}

fn write_err(e: impl std::fmt::Display) -> HarvestError {
    HarvestError::Protocol(format!("XML rewrite failed: {e}"))
}

fn stripped_start<'a>(e: &'a BytesStart<'a>) -> Result<BytesStart<'a>, HarvestError> {
    let name = local_str(e.name().as_ref())?.to_string();
    let mut out = BytesStart::new(name);
    for attr in e.attributes().filter_map(Result::ok) {
        let key = attr.key.as_ref();
        if is_xmlns(key) {
            continue;
        }
        let key = local_str(key)?.to_string();
        // push_attribute re-escapes, so the value must be unescaped first
        let value = attr.unescape_value().map_err(write_err)?;
        out.push_attribute((key.as_str(), value.as_ref()));
    }
    Ok(out)
}
