//! Shared helpers for the event-driven readers.

use gridaudit_engine::AuditError;

/// Decode a raw text or attribute chunk, resolving the predefined and
/// numeric entity references.
pub(crate) fn unescape_xml(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp + 1..];
        match tail.find(';') {
            Some(semi) => {
                out.push_str(&resolve_entity(&tail[..semi]));
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Resolve the name of an entity reference (`amp`, `#233`, `#xE9`).
/// Unknown names are kept verbatim.
pub(crate) fn resolve_entity(name: &str) -> String {
    let resolved = match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => name.strip_prefix('#').and_then(|num| {
            let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => num.parse().ok(),
            };
            code.and_then(char::from_u32)
        }),
    };
    match resolved {
        Some(c) => c.to_string(),
        None => format!("&{name};"),
    }
}

pub(crate) fn parse_err(position: impl std::fmt::Display, err: impl std::fmt::Display) -> AuditError {
    AuditError::Parse(format!("malformed XML at byte {position}: {err}"))
}
