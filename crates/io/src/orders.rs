//! Repeated-element extraction for order documents.
//!
//! Every element named by `orders.record_tag` is one record; its direct
//! children become `tag -> text` fields in document order. Text is kept
//! exactly as written, up to the child's first nested element.

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::debug;

use gridaudit_engine::config::OrderConfig;
use gridaudit_engine::model::FieldMap;
use gridaudit_engine::{AuditError, RawRecord};

use crate::xml::{parse_err, resolve_entity, unescape_xml};

/// Direct child of the current order, while it is open.
struct OpenField {
    name: String,
    depth: usize,
    text: String,
    /// Set once a nested element opens; later text is not the child's own.
    sealed: bool,
}

pub fn extract_orders(xml: &str, config: &OrderConfig) -> Result<Vec<RawRecord>, AuditError> {
    let mut reader = Reader::from_str(xml);
    let tag = config.record_tag.as_bytes();

    let mut records = Vec::new();
    let mut depth = 0usize;
    let mut saw_root = false;
    let mut order: Option<(usize, FieldMap)> = None;
    let mut field: Option<OpenField> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| parse_err(reader.buffer_position(), e))?;
        match event {
            Event::Start(ref e) => {
                depth += 1;
                saw_root = true;
                match order.as_ref().map(|(d, _)| *d) {
                    None if e.name().as_ref() == tag => order = Some((depth, FieldMap::new())),
                    Some(order_depth) if depth == order_depth + 1 => {
                        field = Some(OpenField {
                            name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
                            depth,
                            text: String::new(),
                            sealed: false,
                        });
                    }
                    _ => seal_field(&mut field, depth),
                }
            }
            Event::Empty(ref e) => {
                saw_root = true;
                seal_field(&mut field, depth + 1);
                match order.as_mut() {
                    None if e.name().as_ref() == tag => records.push(RawRecord::Tagged(FieldMap::new())),
                    Some((order_depth, fields)) if depth == *order_depth => {
                        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                        fields.insert(name, config.missing.clone());
                    }
                    _ => {}
                }
            }
            Event::Text(ref t) => {
                if let Some(open) = field.as_mut().filter(|f| f.depth == depth && !f.sealed) {
                    open.text.push_str(&unescape_xml(&String::from_utf8_lossy(t)));
                }
            }
            Event::GeneralRef(ref r) => {
                if let Some(open) = field.as_mut().filter(|f| f.depth == depth && !f.sealed) {
                    open.text.push_str(&resolve_entity(&String::from_utf8_lossy(r)));
                }
            }
            Event::CData(ref t) => {
                if let Some(open) = field.as_mut().filter(|f| f.depth == depth && !f.sealed) {
                    open.text.push_str(&String::from_utf8_lossy(t));
                }
            }
            Event::End(_) => {
                if field.as_ref().is_some_and(|f| f.depth == depth) {
                    if let (Some(open), Some((_, fields))) = (field.take(), order.as_mut()) {
                        finish_field(fields, open, &config.missing);
                    }
                } else if order.as_ref().is_some_and(|(d, _)| *d == depth) {
                    if let Some((_, fields)) = order.take() {
                        records.push(RawRecord::Tagged(fields));
                    }
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

    debug!(records = records.len(), tag = %config.record_tag, "order records extracted");
    Ok(records)
}

/// A nested element under the open child ends the child's own text.
fn seal_field(field: &mut Option<OpenField>, depth: usize) {
    if let Some(open) = field.as_mut().filter(|f| depth > f.depth) {
        open.sealed = true;
    }
}

/// Store a closed child's text unchanged; only a child with no text at all
/// gets the sentinel. A later duplicate tag overwrites it.
fn finish_field(fields: &mut FieldMap, open: OpenField, missing: &str) {
    let value = if open.text.is_empty() { missing.to_string() } else { open.text };
    fields.insert(open.name, value);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(record: &RawRecord) -> &FieldMap {
        match record {
            RawRecord::Tagged(fields) => fields,
            RawRecord::Positional(_) => panic!("expected tagged record"),
        }
    }

    fn extract(xml: &str) -> Vec<RawRecord> {
        extract_orders(xml, &OrderConfig::default()).unwrap()
    }

    #[test]
    fn children_become_fields_in_order() {
        let records = extract(
            "<orders>\
               <order><orderID>1</orderID><company>Acme</company><phone>555</phone></order>\
               <order><orderID>2</orderID><company>Globex</company></order>\
             </orders>",
        );
        assert_eq!(records.len(), 2);
        let first: Vec<_> = fields(&records[0]).keys().map(String::as_str).collect();
        assert_eq!(first, ["orderID", "company", "phone"]);
        assert_eq!(fields(&records[1])["company"], "Globex");
    }

    #[test]
    fn only_missing_text_becomes_sentinel() {
        let records = extract("<r><order><a/><b></b><c>   </c><d> x </d></order></r>");
        let f = fields(&records[0]);
        assert_eq!(f["a"], "N/A");
        assert_eq!(f["b"], "N/A");
        assert_eq!(f["c"], "   ");
        assert_eq!(f["d"], " x ");
    }

    #[test]
    fn surrounding_whitespace_is_preserved() {
        let records = extract("<r><order><note>ok\t</note><company>Acme </company></order></r>");
        let f = fields(&records[0]);
        assert_eq!(f["note"], "ok\t");
        assert_eq!(f["company"], "Acme ");
    }

    #[test]
    fn orders_at_any_depth() {
        let records = extract("<root><batch><order><id>1</id></order></batch><order><id>2</id></order></root>");
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn nested_order_is_not_a_record() {
        let records = extract("<r><order><id>1</id><order><id>2</id></order></order></r>");
        assert_eq!(records.len(), 1);
        assert_eq!(fields(&records[0])["id"], "1");
    }

    #[test]
    fn text_stops_at_first_grandchild() {
        let records = extract(
            "<r><order><addr>Main <b>ignored</b>St</addr><zip><i/>0150</zip><box><b>1</b></box></order></r>",
        );
        let f = fields(&records[0]);
        assert_eq!(f["addr"], "Main ");
        assert_eq!(f["zip"], "N/A");
        assert_eq!(f["box"], "N/A");
    }

    #[test]
    fn entities_are_resolved() {
        let records = extract("<r><order><note>a &amp; b &#233;</note></order></r>");
        assert_eq!(fields(&records[0])["note"], "a & b \u{e9}");
    }

    #[test]
    fn repeated_tag_keeps_last_value() {
        let records = extract("<r><order><phone>1</phone><phone>2</phone></order></r>");
        let f = fields(&records[0]);
        assert_eq!(f.len(), 1);
        assert_eq!(f["phone"], "2");
    }

    #[test]
    fn zero_orders_is_not_an_error() {
        assert!(extract("<orders/>").is_empty());
    }

    #[test]
    fn custom_record_tag_and_sentinel() {
        let config = OrderConfig {
            record_tag: "purchase".into(),
            missing: "-".into(),
            ..OrderConfig::default()
        };
        let records = extract_orders("<r><purchase><x/></purchase><order><y>1</y></order></r>", &config).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(fields(&records[0])["x"], "-");
    }

    #[test]
    fn malformed_xml_is_parse_error() {
        let err = extract_orders("<r><order><id>1</order></r>", &OrderConfig::default()).unwrap_err();
        assert!(matches!(err, AuditError::Parse(_)), "got {err:?}");
    }

    #[test]
    fn unclosed_root_is_parse_error() {
        let err = extract_orders("<r><order><id>1</id></order>", &OrderConfig::default()).unwrap_err();
        assert!(matches!(err, AuditError::Parse(_)), "got {err:?}");
    }
}
