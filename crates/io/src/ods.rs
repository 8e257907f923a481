//! OpenDocument spreadsheet (`content.xml`) row extraction.
//!
//! Only the named table is read. Each `table:table-row` directly under
//! that table becomes one positional record holding, per `table:table-cell`, the text of the
//! cell's first `text:p`. Rows shorter than the configured minimum are
//! dropped. Rows wrapped in `table:table-header-rows` or
//! `table:table-row-group` are read only when `sheet.grouped_rows` is set.

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;
use tracing::debug;

use gridaudit_engine::config::SheetConfig;
use gridaudit_engine::{AuditError, RawRecord};

use crate::xml::{parse_err, resolve_entity, unescape_xml};

pub const TABLE_NS: &[u8] = b"urn:oasis:names:tc:opendocument:xmlns:table:1.0";
pub const TEXT_NS: &[u8] = b"urn:oasis:names:tc:opendocument:xmlns:text:1.0";

/// ODF elements the extractor cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OdfName {
    Table,
    Row,
    Cell,
    Paragraph,
    Space,
    Tab,
    LineBreak,
    Other,
}

fn classify(reader: &NsReader<&[u8]>, e: &BytesStart) -> OdfName {
    let (ns, local) = reader.resolve_element(e.name());
    let ResolveResult::Bound(Namespace(ns)) = ns else {
        return OdfName::Other;
    };
    match (ns, local.as_ref()) {
        (TABLE_NS, b"table") => OdfName::Table,
        (TABLE_NS, b"table-row") => OdfName::Row,
        (TABLE_NS, b"table-cell") => OdfName::Cell,
        (TEXT_NS, b"p") => OdfName::Paragraph,
        (TEXT_NS, b"s") => OdfName::Space,
        (TEXT_NS, b"tab") => OdfName::Tab,
        (TEXT_NS, b"line-break") => OdfName::LineBreak,
        _ => OdfName::Other,
    }
}

/// Value of a `table:`-namespaced attribute, unescaped.
fn table_attr(reader: &NsReader<&[u8]>, e: &BytesStart, name: &[u8]) -> Option<String> {
    e.attributes().flatten().find_map(|attr| {
        let (ns, local) = reader.resolve_attribute(attr.key);
        match ns {
            ResolveResult::Bound(Namespace(TABLE_NS)) if local.as_ref() == name => {
                Some(unescape_xml(&String::from_utf8_lossy(&attr.value)))
            }
            _ => None,
        }
    })
}

/// `text:c` on a `text:s` element; one space when absent.
fn space_count(reader: &NsReader<&[u8]>, e: &BytesStart) -> usize {
    e.attributes()
        .flatten()
        .find_map(|attr| {
            let (ns, local) = reader.resolve_attribute(attr.key);
            match ns {
                ResolveResult::Bound(Namespace(TEXT_NS)) if local.as_ref() == b"c" => {
                    std::str::from_utf8(&attr.value).ok().and_then(|s| s.parse().ok())
                }
                _ => None,
            }
        })
        .unwrap_or(1)
}

/// Text collection state for the cell being read.
#[derive(Debug, Default)]
struct CellState {
    depth: usize,
    /// Depth of the first `text:p`, while inside it.
    paragraph_depth: Option<usize>,
    /// Text of the first `text:p`; `None` until one is seen.
    text: Option<String>,
}

impl CellState {
    fn in_paragraph(&self) -> bool {
        self.paragraph_depth.is_some()
    }

    fn push(&mut self, s: &str) {
        if let Some(text) = self.text.as_mut() {
            text.push_str(s);
        }
    }
}

/// Extract the rows of the configured table, in document order.
///
/// Fails with [`AuditError::Schema`] when no table carries the configured
/// name, and with [`AuditError::Parse`] when the document is not well-formed.
pub fn extract_rows(xml: &str, config: &SheetConfig) -> Result<Vec<RawRecord>, AuditError> {
    let mut reader = NsReader::from_str(xml);

    let mut records = Vec::new();
    let mut depth = 0usize;
    let mut saw_root = false;
    let mut table_found = false;
    let mut table_depth: Option<usize> = None;
    let mut row: Option<(usize, Vec<String>)> = None;
    let mut cell: Option<CellState> = None;
    let mut dropped = 0usize;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| parse_err(reader.buffer_position(), e))?;
        match event {
            Event::Start(ref e) => {
                depth += 1;
                saw_root = true;
                let name = classify(&reader, e);

                if let Some(c) = cell.as_mut() {
                    match name {
                        OdfName::Paragraph if c.text.is_none() && depth == c.depth + 1 => {
                            c.paragraph_depth = Some(depth);
                            c.text = Some(String::new());
                        }
                        OdfName::Space if c.in_paragraph() => c.push(&" ".repeat(space_count(&reader, e))),
                        OdfName::Tab if c.in_paragraph() => c.push("\t"),
                        OdfName::LineBreak if c.in_paragraph() => c.push("\n"),
                        _ => {}
                    }
                    continue;
                }

                match name {
                    OdfName::Table if table_depth.is_none() && !table_found => {
                        if table_attr(&reader, e, b"name").as_deref() == Some(config.table.as_str()) {
                            table_found = true;
                            table_depth = Some(depth);
                        }
                    }
                    OdfName::Row if row.is_none() && row_in_table(table_depth, depth, config) => {
                        row = Some((depth, Vec::new()));
                    }
                    OdfName::Cell => {
                        if let Some((row_depth, _)) = row {
                            if depth == row_depth + 1 {
                                cell = Some(CellState {
                                    depth,
                                    ..CellState::default()
                                });
                            }
                        }
                    }
                    _ => {}
                }
            }
            Event::Empty(ref e) => {
                saw_root = true;
                let name = classify(&reader, e);

                if let Some(c) = cell.as_mut() {
                    match name {
                        OdfName::Paragraph if c.text.is_none() && depth == c.depth => {
                            c.text = Some(String::new());
                        }
                        OdfName::Space if c.in_paragraph() => c.push(&" ".repeat(space_count(&reader, e))),
                        OdfName::Tab if c.in_paragraph() => c.push("\t"),
                        OdfName::LineBreak if c.in_paragraph() => c.push("\n"),
                        _ => {}
                    }
                    continue;
                }

                match name {
                    OdfName::Table if table_depth.is_none() && !table_found => {
                        if table_attr(&reader, e, b"name").as_deref() == Some(config.table.as_str()) {
                            table_found = true;
                        }
                    }
                    OdfName::Row if row.is_none() && row_in_table(table_depth, depth + 1, config) => {
                        finish_row(Vec::new(), config, &mut records, &mut dropped);
                    }
                    OdfName::Cell => {
                        if let Some((row_depth, cells)) = row.as_mut() {
                            if depth == *row_depth {
                                cells.push(String::new());
                            }
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(ref t) => {
                if let Some(c) = cell.as_mut().filter(|c| c.in_paragraph()) {
                    c.push(&unescape_xml(&String::from_utf8_lossy(t)));
                }
            }
            Event::GeneralRef(ref r) => {
                if let Some(c) = cell.as_mut().filter(|c| c.in_paragraph()) {
                    c.push(&resolve_entity(&String::from_utf8_lossy(r)));
                }
            }
            Event::CData(ref t) => {
                if let Some(c) = cell.as_mut().filter(|c| c.in_paragraph()) {
                    c.push(&String::from_utf8_lossy(t));
                }
            }
            Event::End(_) => {
                if let Some(c) = cell.as_mut() {
                    if c.paragraph_depth == Some(depth) {
                        c.paragraph_depth = None;
                    }
                    if c.depth == depth {
                        let text = cell.take().and_then(|c| c.text).unwrap_or_default();
                        if let Some((_, cells)) = row.as_mut() {
                            cells.push(text);
                        }
                    }
                } else if row.as_ref().is_some_and(|(row_depth, _)| *row_depth == depth) {
                    if let Some((_, cells)) = row.take() {
                        finish_row(cells, config, &mut records, &mut dropped);
                    }
                } else if table_depth == Some(depth) {
                    table_depth = None;
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(AuditError::Parse("document has no root element".into()));
    }
    if depth != 0 {
        return Err(AuditError::Parse(format!(
            "unexpected end of document with {depth} unclosed element(s)"
        )));
    }
    if !table_found {
        return Err(AuditError::Schema(format!(
            "no table named '{}' found in the provided document",
            config.table
        )));
    }

    debug!(rows = records.len(), dropped, table = %config.table, "spreadsheet rows extracted");
    Ok(records)
}

/// Whether a row element at `row_depth` belongs to the data table.
fn row_in_table(table_depth: Option<usize>, row_depth: usize, config: &SheetConfig) -> bool {
    match table_depth {
        Some(t) if config.grouped_rows => row_depth > t,
        Some(t) => row_depth == t + 1,
        None => false,
    }
}

fn finish_row(cells: Vec<String>, config: &SheetConfig, records: &mut Vec<RawRecord>, dropped: &mut usize) {
    if cells.len() >= config.min_fields {
        records.push(RawRecord::Positional(cells));
    } else {
        *dropped += 1;
        debug!(cells = cells.len(), min = config.min_fields, "dropping short row");
    }
}
