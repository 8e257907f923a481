use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{AuditOutcome, DocumentKind, RuleKind};

#[derive(Debug, Clone, Serialize)]
pub struct AuditSummary {
    pub kind: DocumentKind,
    pub records: usize,
    pub entities: usize,
    pub findings: usize,
    /// Finding count per rule, keyed by the rule's snake_case name.
    pub rule_counts: BTreeMap<String, usize>,
}

/// Compute summary statistics from a finished run.
pub fn compute_summary(outcome: &AuditOutcome) -> AuditSummary {
    let mut rule_counts: BTreeMap<String, usize> = BTreeMap::new();
    for f in &outcome.findings {
        *rule_counts.entry(f.rule.to_string()).or_insert(0) += 1;
    }

    AuditSummary {
        kind: outcome.document.kind,
        records: outcome.document.records.len(),
        entities: outcome.entities,
        findings: outcome.findings.len(),
        rule_counts,
    }
}

impl AuditSummary {
    pub fn count(&self, rule: RuleKind) -> usize {
        self.rule_counts.get(&rule.to_string()).copied().unwrap_or(0)
    }
}
