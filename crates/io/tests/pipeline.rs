use std::path::{Path, PathBuf};

use gridaudit_engine::{AuditConfig, AuditError, DocumentKind, RuleKind};
use gridaudit_io::{run_audit, AuditReport, AuditRequest, BlocklistPolicy};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn request(source: &str, out_dir: &Path, name: &str) -> AuditRequest {
    AuditRequest {
        source: fixture(source),
        blocklist: Some(fixture("blocklist.txt")),
        blocklist_policy: BlocklistPolicy::Degrade,
        out_dir: out_dir.to_path_buf(),
        name: name.to_string(),
        kind: None,
    }
}

fn audit(req: &AuditRequest) -> AuditReport {
    run_audit(req, &AuditConfig::default()).unwrap()
}

fn anomaly_lines(path: &Path) -> Vec<String> {
    let xml = std::fs::read_to_string(path).unwrap();
    xml.lines()
        .filter_map(|l| {
            l.trim()
                .strip_prefix("<Anomaly>")
                .and_then(|l| l.strip_suffix("</Anomaly>"))
                .map(str::to_string)
        })
        .collect()
}

// -------------------------------------------------------------------------
// Spreadsheet pipeline
// -------------------------------------------------------------------------

#[test]
fn agencies_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let report = audit(&request("agencies_content.xml", dir.path(), "agencies"));

    assert_eq!(report.summary.kind, DocumentKind::Agencies);
    // The one-cell title row is dropped.
    assert_eq!(report.summary.records, 4);
    assert_eq!(report.summary.entities, 3);
    assert_eq!(report.meta.blocklist_entries, 2);
    assert!(!report.meta.blocklist_degraded);

    assert_eq!(
        anomaly_lines(&report.outputs.anomalies),
        [
            "Inconsistent address for Acme Travel: 9 Side Rd",
            "Suspicious characters in email for Acme Travel: bob_99@mailinator.com",
            "Suspicious email domain for Acme Travel: bob_99@mailinator.com (Disposable Domain)",
            "Inconsistent domain for Acme Travel: bob_99@mailinator.com",
            "Invalid email format for Globex: cy_at_globex",
        ]
    );

    let normalized = std::fs::read_to_string(&report.outputs.normalized).unwrap();
    assert!(normalized.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<Agencies>"));
    assert_eq!(normalized.matches("<Agency>").count(), 4);
    assert!(normalized.contains("<AgencyName>Smith &amp; Sons</AgencyName>"));
    assert!(normalized.contains("<Address>12  High St</Address>"));
    assert!(!normalized.contains("Agency contacts"));
}

#[test]
fn missing_table_writes_no_files() {
    let dir = tempfile::tempdir().unwrap();
    let err = run_audit(
        &request("no_data_table.xml", dir.path(), "agencies"),
        &AuditConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, AuditError::Schema(_)), "got {err:?}");
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn unreadable_blocklist_degrades() {
    let dir = tempfile::tempdir().unwrap();
    let mut req = request("agencies_content.xml", dir.path(), "agencies");
    req.blocklist = Some(dir.path().join("missing.txt"));
    let report = audit(&req);
    assert!(report.meta.blocklist_degraded);
    assert_eq!(report.meta.blocklist_entries, 0);
    assert_eq!(report.summary.count(RuleKind::DisposableDomain), 0);
    assert_eq!(report.summary.count(RuleKind::InconsistentDomain), 1);
}

#[test]
fn strict_blocklist_policy_aborts_before_writing() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    std::fs::create_dir(&out).unwrap();
    let mut req = request("agencies_content.xml", &out, "agencies");
    req.blocklist = Some(dir.path().join("missing.txt"));
    req.blocklist_policy = BlocklistPolicy::Fail;
    let err = run_audit(&req, &AuditConfig::default()).unwrap_err();
    assert!(matches!(err, AuditError::Io { .. }));
    assert_eq!(std::fs::read_dir(&out).unwrap().count(), 0);
}

#[test]
fn custom_table_name_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = AuditConfig::from_toml("[sheet]\ntable = \"Sheet1\"\n").unwrap();
    let mut req = request("no_data_table.xml", dir.path(), "agencies");
    req.kind = Some(DocumentKind::Agencies);
    let report = run_audit(&req, &config).unwrap();
    assert_eq!(report.summary.records, 4);
}

// -------------------------------------------------------------------------
// Order pipeline
// -------------------------------------------------------------------------

#[test]
fn orders_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let report = audit(&request("orders.xml", dir.path(), "orders"));

    assert_eq!(report.summary.kind, DocumentKind::Orders);
    assert_eq!(report.summary.records, 4);
    assert_eq!(report.summary.entities, 2);
    assert_eq!(
        anomaly_lines(&report.outputs.anomalies),
        [
            "phone: N/A (in Order ID: 2001)",
            "orderID: 1002 (in Order ID: 1002)",
            "orderID: 1003 (in Order ID: 1003)",
            "phone: 555-0199 (in Order ID: 1003)",
        ]
    );

    let phone = report
        .analysis
        .iter()
        .find(|b| b.entity == "Acme" && b.field == "phone")
        .unwrap();
    assert_eq!(phone.counts[0].value, "555-0100");
    assert_eq!(phone.counts[0].count, 2);
    assert!(report.analysis.iter().all(|b| b.entity != "Globex"));

    let normalized = std::fs::read_to_string(&report.outputs.normalized).unwrap();
    assert_eq!(normalized.matches("<order>").count(), 4);
    assert!(normalized.contains("<phone>N/A</phone>"));
}

#[test]
fn order_text_whitespace_reaches_the_rules() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("tabbed.xml");
    std::fs::write(
        &source,
        "<orders><order><orderID>1</orderID><company>Acme</company><note>ok\t</note></order></orders>",
    )
    .unwrap();
    let req = AuditRequest {
        source,
        blocklist: None,
        blocklist_policy: BlocklistPolicy::Degrade,
        out_dir: dir.path().to_path_buf(),
        name: "tabbed".to_string(),
        kind: Some(DocumentKind::Orders),
    };
    let report = audit(&req);

    assert_eq!(report.summary.findings, 1);
    assert_eq!(report.findings[0].rule, RuleKind::SuspiciousValue);
    assert_eq!(anomaly_lines(&report.outputs.anomalies), ["note: ok\t (in Order ID: 1)"]);
}

#[test]
fn explicit_kind_overrides_detection() {
    let dir = tempfile::tempdir().unwrap();
    let mut req = request("agencies_content.xml", dir.path(), "as_orders");
    req.kind = Some(DocumentKind::Orders);
    let report = audit(&req);
    assert_eq!(report.summary.kind, DocumentKind::Orders);
    assert_eq!(report.summary.records, 0);
    assert_eq!(report.summary.findings, 0);
}

// -------------------------------------------------------------------------
// Determinism
// -------------------------------------------------------------------------

#[test]
fn repeated_runs_are_byte_identical() {
    for source in ["agencies_content.xml", "orders.xml"] {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        let a = audit(&request(source, first.path(), "run"));
        let b = audit(&request(source, second.path(), "run"));

        assert_eq!(a.meta.source_sha256, b.meta.source_sha256);
        assert_eq!(
            std::fs::read(&a.outputs.normalized).unwrap(),
            std::fs::read(&b.outputs.normalized).unwrap()
        );
        assert_eq!(
            std::fs::read(&a.outputs.anomalies).unwrap(),
            std::fs::read(&b.outputs.anomalies).unwrap()
        );
    }
}

#[test]
fn rerun_overwrites_previous_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let first = audit(&request("orders.xml", dir.path(), "orders"));
    let before = std::fs::read(&first.outputs.anomalies).unwrap();
    let second = audit(&request("orders.xml", dir.path(), "orders"));
    assert_eq!(before, std::fs::read(&second.outputs.anomalies).unwrap());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
}
