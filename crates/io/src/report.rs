//! XML report writing: the normalized document and the anomaly list.
//!
//! Both documents are rendered in memory first. [`write_outputs`] then
//! commits them together: each is written to a `.tmp` file, outputs from a
//! previous run are moved aside to `.bak`, and the temps are renamed into
//! place. Any failure puts the previous outputs back, so a failed run never
//! leaves one new report next to one old one.

use std::io;
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde::Serialize;
use tracing::{info, warn};

use gridaudit_engine::model::{Finding, NormalizedDocument};
use gridaudit_engine::{AuditError, AuditOutcome};

const ANOMALIES_ROOT: &str = "Anomalies";
const ANOMALY: &str = "Anomaly";

/// Where a run's two documents were written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputPaths {
    pub normalized: PathBuf,
    pub anomalies: PathBuf,
}

impl OutputPaths {
    /// `<dir>/<name>.xml` and `<dir>/<name>_anomalies.xml`.
    pub fn new(dir: &Path, name: &str) -> Self {
        Self {
            normalized: dir.join(format!("{name}.xml")),
            anomalies: dir.join(format!("{name}_anomalies.xml")),
        }
    }
}

fn new_writer() -> io::Result<Writer<Vec<u8>>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    Ok(writer)
}

fn finish(writer: Writer<Vec<u8>>) -> Vec<u8> {
    let mut out = writer.into_inner();
    out.push(b'\n');
    out
}

fn write_text_element(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> io::Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// One container per record, field values as child element text.
pub fn render_normalized(document: &NormalizedDocument) -> io::Result<Vec<u8>> {
    let mut writer = new_writer()?;
    let root = document.kind.root_element();
    let record = document.kind.record_element();

    writer.write_event(Event::Start(BytesStart::new(root)))?;
    for rec in &document.records {
        writer.write_event(Event::Start(BytesStart::new(record)))?;
        for (name, value) in rec.elements() {
            write_text_element(&mut writer, name, value)?;
        }
        writer.write_event(Event::End(BytesEnd::new(record)))?;
    }
    writer.write_event(Event::End(BytesEnd::new(root)))?;
    Ok(finish(writer))
}

/// One flat `Anomaly` element per finding, in detection order.
pub fn render_anomalies(findings: &[Finding]) -> io::Result<Vec<u8>> {
    let mut writer = new_writer()?;
    writer.write_event(Event::Start(BytesStart::new(ANOMALIES_ROOT)))?;
    for finding in findings {
        write_text_element(&mut writer, ANOMALY, &finding.message())?;
    }
    writer.write_event(Event::End(BytesEnd::new(ANOMALIES_ROOT)))?;
    Ok(finish(writer))
}

fn tmp_path(path: &Path) -> PathBuf {
    path.with_extension("xml.tmp")
}

fn backup_path(path: &Path) -> PathBuf {
    path.with_extension("xml.bak")
}

fn remove_quietly(path: &Path) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            warn!(path = %path.display(), error = %e, "failed to remove file");
        }
    }
}

/// Undo a partial commit: drop new outputs, restore backups, drop temps.
fn roll_back(staged: &[(PathBuf, &Path)], committed: &[&Path], backups: &[(&Path, PathBuf)]) {
    for target in committed {
        remove_quietly(target);
    }
    for (target, backup) in backups {
        if let Err(e) = std::fs::rename(backup, target) {
            warn!(path = %target.display(), backup = %backup.display(), error = %e, "failed to restore previous output");
        }
    }
    for (tmp, _) in staged {
        remove_quietly(tmp);
    }
}

/// Rename every `(tmp, target)` pair into place, or none of them.
fn commit(staged: &[(PathBuf, &Path)]) -> Result<(), AuditError> {
    let mut backups: Vec<(&Path, PathBuf)> = Vec::new();
    for (_, target) in staged {
        if !target.exists() {
            continue;
        }
        let backup = backup_path(target);
        if let Err(e) = std::fs::rename(target, &backup) {
            roll_back(staged, &[], &backups);
            return Err(AuditError::io(*target, e));
        }
        backups.push((*target, backup));
    }

    let mut committed: Vec<&Path> = Vec::new();
    for (tmp, target) in staged {
        if let Err(e) = std::fs::rename(tmp, target) {
            roll_back(staged, &committed, &backups);
            return Err(AuditError::io(*target, e));
        }
        committed.push(*target);
    }

    for (_, backup) in &backups {
        remove_quietly(backup);
    }
    Ok(())
}

/// Write each document to its temp file, then [`commit`] them together.
fn stage_and_commit(documents: &[(&Path, Vec<u8>)]) -> Result<(), AuditError> {
    let staged: Vec<(PathBuf, &Path)> = documents.iter().map(|(target, _)| (tmp_path(target), *target)).collect();
    for ((tmp, _), (_, bytes)) in staged.iter().zip(documents) {
        if let Err(e) = std::fs::write(tmp, bytes) {
            roll_back(&staged, &[], &[]);
            return Err(AuditError::io(tmp, e));
        }
    }
    commit(&staged)
}

/// Render and commit both documents. On error the target paths hold
/// whatever they held before the call, and no temp or backup file remains.
pub fn write_outputs(dir: &Path, name: &str, outcome: &AuditOutcome) -> Result<OutputPaths, AuditError> {
    let paths = OutputPaths::new(dir, name);

    for target in [&paths.normalized, &paths.anomalies] {
        if target.exists() && !target.is_file() {
            return Err(AuditError::Io {
                path: target.clone(),
                message: "exists and is not a regular file".into(),
            });
        }
    }

    let normalized =
        render_normalized(&outcome.document).map_err(|e| AuditError::io(&paths.normalized, e))?;
    let anomalies =
        render_anomalies(&outcome.findings).map_err(|e| AuditError::io(&paths.anomalies, e))?;

    stage_and_commit(&[(paths.normalized.as_path(), normalized), (paths.anomalies.as_path(), anomalies)])?;

    info!(
        normalized = %paths.normalized.display(),
        anomalies = %paths.anomalies.display(),
        findings = outcome.findings.len(),
        "reports written"
    );
    Ok(paths)
}
