//! Source document loading: plain XML, or an `.ods` archive whose
//! `content.xml` is read.

use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::debug;

use gridaudit_engine::{AuditError, DocumentKind};

use crate::ods::TABLE_NS;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const ODS_CONTENT: &str = "content.xml";

/// A fully materialized source document.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub path: PathBuf,
    pub xml: String,
    /// `sha256:<hex>` of the file bytes as read from disk.
    pub sha256: String,
}

impl SourceDocument {
    /// Spreadsheet when the OpenDocument table namespace is declared,
    /// otherwise an order document.
    pub fn detect_kind(&self) -> DocumentKind {
        detect_kind(&self.xml)
    }
}

pub fn detect_kind(xml: &str) -> DocumentKind {
    match std::str::from_utf8(TABLE_NS) {
        Ok(ns) if xml.contains(ns) => DocumentKind::Agencies,
        _ => DocumentKind::Orders,
    }
}

pub fn read_source(path: &Path) -> Result<SourceDocument, AuditError> {
    let bytes = std::fs::read(path).map_err(|e| AuditError::io(path, e))?;
    let sha256 = fingerprint(&bytes);

    let xml = if bytes.starts_with(ZIP_MAGIC) {
        debug!(path = %path.display(), "reading content.xml from archive");
        read_archive_content(&bytes)?
    } else {
        String::from_utf8(bytes)
            .map_err(|e| AuditError::Parse(format!("{} is not valid UTF-8: {e}", path.display())))?
    };

    Ok(SourceDocument {
        path: path.to_path_buf(),
        xml,
        sha256,
    })
}

fn read_archive_content(bytes: &[u8]) -> Result<String, AuditError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| AuditError::Parse(format!("invalid archive: {e}")))?;
    let mut entry = archive
        .by_name(ODS_CONTENT)
        .map_err(|_| AuditError::Schema(format!("archive has no {ODS_CONTENT}")))?;
    let mut content = String::new();
    entry
        .read_to_string(&mut content)
        .map_err(|e| AuditError::Parse(format!("cannot read {ODS_CONTENT}: {e}")))?;
    Ok(content)
}

pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("sha256:{:x}", hasher.finalize())
}
