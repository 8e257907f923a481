//! End-to-end audit run: load, extract, audit, report.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use gridaudit_engine::model::FieldBreakdown;
use gridaudit_engine::summary::{compute_summary, AuditSummary};
use gridaudit_engine::{run, AuditConfig, AuditError, Blocklist, DocumentKind, Finding, RawRecord};

use crate::blocklist::{load_blocklist, BlocklistPolicy, LoadedBlocklist};
use crate::ods::extract_rows;
use crate::orders::extract_orders;
use crate::report::{write_outputs, OutputPaths};
use crate::source::read_source;

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone)]
pub struct AuditRequest {
    pub source: PathBuf,
    /// Disposable-domain list. `None` runs without one.
    pub blocklist: Option<PathBuf>,
    pub blocklist_policy: BlocklistPolicy,
    pub out_dir: PathBuf,
    /// Base name of the two output files.
    pub name: String,
    /// Document family; detected from the source when `None`.
    pub kind: Option<DocumentKind>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub source: PathBuf,
    pub source_sha256: String,
    pub engine_version: String,
    pub blocklist_entries: usize,
    pub blocklist_degraded: bool,
    pub run_at: DateTime<Utc>,
}

/// What a finished run reports back to its caller.
#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub meta: RunMeta,
    pub summary: AuditSummary,
    /// Consistency analysis (order documents only).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub analysis: Vec<FieldBreakdown>,
    pub findings: Vec<Finding>,
    pub outputs: OutputPaths,
}

/// Extract the records of `xml` for the given document family.
pub fn extract(kind: DocumentKind, xml: &str, config: &AuditConfig) -> Result<Vec<RawRecord>, AuditError> {
    match kind {
        DocumentKind::Agencies => extract_rows(xml, &config.sheet),
        DocumentKind::Orders => extract_orders(xml, &config.orders),
    }
}

pub fn run_audit(request: &AuditRequest, config: &AuditConfig) -> Result<AuditReport, AuditError> {
    let source = read_source(&request.source)?;
    let kind = request.kind.unwrap_or_else(|| source.detect_kind());
    info!(source = %request.source.display(), kind = %kind, "audit started");

    let records = extract(kind, &source.xml, config)?;

    let loaded = match &request.blocklist {
        Some(path) => load_blocklist(path, request.blocklist_policy)?,
        None => LoadedBlocklist {
            blocklist: Blocklist::empty(),
            degraded: false,
        },
    };

    let outcome = run(kind, &records, &loaded.blocklist, config)?;
    let outputs = write_outputs(&request.out_dir, &request.name, &outcome)?;

    Ok(AuditReport {
        meta: RunMeta {
            source: source.path,
            source_sha256: source.sha256,
            engine_version: ENGINE_VERSION.to_string(),
            blocklist_entries: loaded.blocklist.len(),
            blocklist_degraded: loaded.degraded,
            run_at: Utc::now(),
        },
        summary: compute_summary(&outcome),
        analysis: outcome.analysis,
        findings: outcome.findings,
        outputs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_dispatches_on_kind() {
        let config = AuditConfig::default();
        let orders = extract(DocumentKind::Orders, "<r><order><id>1</id></order></r>", &config).unwrap();
        assert_eq!(orders.len(), 1);
        let err = extract(DocumentKind::Agencies, "<r><order><id>1</id></order></r>", &config).unwrap_err();
        assert!(matches!(err, AuditError::Schema(_)));
    }

    #[test]
    fn schema_error_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("sheet.xml");
        std::fs::write(&source, "<doc/>").unwrap();
        let out_dir = dir.path().join("out");
        std::fs::create_dir(&out_dir).unwrap();

        let request = AuditRequest {
            source,
            blocklist: None,
            blocklist_policy: BlocklistPolicy::Degrade,
            out_dir: out_dir.clone(),
            name: "agencies".into(),
            kind: Some(DocumentKind::Agencies),
        };
        let err = run_audit(&request, &AuditConfig::default()).unwrap_err();
        assert!(matches!(err, AuditError::Schema(_)));
        assert_eq!(std::fs::read_dir(&out_dir).unwrap().count(), 0);
    }
}
