use tracing::{debug, info};

use crate::blocklist::Blocklist;
use crate::canonical::canonicalize;
use crate::config::{AuditConfig, OrderConfig};
use crate::error::AuditError;
use crate::model::{
    AgencyRecord, AuditOutcome, CanonicalRecord, DocumentKind, Finding, NormalizedDocument,
    OrderRecord, RawRecord, RuleKind,
};
use crate::rules::{email_domain, RuleSet};
use crate::tracker::{ConsistencyTracker, Observation};

/// Normalize the extracted records and run every rule over them.
///
/// Records are consumed in extraction order; that order decides which value
/// is an entity's baseline.
pub fn run(
    kind: DocumentKind,
    records: &[RawRecord],
    blocklist: &Blocklist,
    config: &AuditConfig,
) -> Result<AuditOutcome, AuditError> {
    let rules = RuleSet::new(&config.rules)?;
    let canonical: Vec<CanonicalRecord> = records.iter().map(canonicalize).collect();

    let misshapen = canonical
        .iter()
        .filter(|r| {
            !matches!(
                (kind, r),
                (DocumentKind::Agencies, CanonicalRecord::Agency(_))
                    | (DocumentKind::Orders, CanonicalRecord::Order(_))
            )
        })
        .count();
    if misshapen > 0 {
        return Err(AuditError::Schema(format!(
            "{misshapen} record(s) do not fit the {kind} schema"
        )));
    }

    let mut tracker = ConsistencyTracker::new();
    let (findings, analysis) = match kind {
        DocumentKind::Agencies => {
            let agencies: Vec<&AgencyRecord> = canonical
                .iter()
                .filter_map(|r| match r {
                    CanonicalRecord::Agency(a) => Some(a),
                    CanonicalRecord::Order(_) => None,
                })
                .collect();
            (audit_agencies(&agencies, &rules, blocklist, &mut tracker), Vec::new())
        }
        DocumentKind::Orders => {
            let orders: Vec<&OrderRecord> = canonical
                .iter()
                .filter_map(|r| match r {
                    CanonicalRecord::Order(o) => Some(o),
                    CanonicalRecord::Agency(_) => None,
                })
                .collect();
            let findings = audit_orders(&orders, &rules, &config.orders, &mut tracker);
            (findings, tracker.breakdown())
        }
    };

    info!(
        kind = %kind,
        records = canonical.len(),
        entities = tracker.len(),
        findings = findings.len(),
        "audit complete"
    );

    Ok(AuditOutcome {
        document: NormalizedDocument {
            kind,
            records: canonical,
        },
        findings,
        analysis,
        entities: tracker.len(),
    })
}

/// Spreadsheet pipeline: address novelty, then per contact email the
/// format → characters → blocklist → domain novelty battery.
fn audit_agencies(
    records: &[&AgencyRecord],
    rules: &RuleSet,
    blocklist: &Blocklist,
    tracker: &mut ConsistencyTracker,
) -> Vec<Finding> {
    let mut findings = Vec::new();

    for rec in records {
        let entity = rec.agency_name.as_str();
        let record_id = (!rec.order_id.is_empty()).then(|| rec.order_id.clone());
        let finding = |rule: RuleKind, field: &str, value: &str| Finding {
            rule,
            entity: entity.to_string(),
            record_id: record_id.clone(),
            field: field.to_string(),
            value: value.to_string(),
        };
        let state = tracker.entity_mut(entity);

        if state.observe_address(&rec.address) == Observation::Novel {
            findings.push(finding(RuleKind::InconsistentAddress, "Address", &rec.address));
        }

        for (field, email) in rec.emails() {
            if email.is_empty() {
                continue;
            }
            if !rules.is_valid_email(email) {
                findings.push(finding(RuleKind::InvalidEmailFormat, field, email));
                continue;
            }
            if rules.has_suspicious_characters(email) {
                findings.push(finding(RuleKind::SuspiciousCharacters, field, email));
            }
            let Some(domain) = email_domain(email) else {
                continue;
            };
            if blocklist.contains(domain) {
                findings.push(finding(RuleKind::DisposableDomain, field, email));
            }
            if state.observe_domain(domain) == Observation::Novel {
                findings.push(finding(RuleKind::InconsistentDomain, field, email));
            }
        }
    }

    debug!(findings = findings.len(), "agency rules applied");
    findings
}

/// Order pipeline: the any-field value heuristic per record, then the
/// majority-deviation pass over every entity.
fn audit_orders(
    records: &[&OrderRecord],
    rules: &RuleSet,
    config: &OrderConfig,
    tracker: &mut ConsistencyTracker,
) -> Vec<Finding> {
    let mut findings = Vec::new();

    for rec in records {
        let entity = rec.get(&config.group_field).unwrap_or(config.unknown.as_str());
        let record_id = rec.get(&config.id_field).unwrap_or(config.unknown.as_str());

        for (field, value) in &rec.fields {
            if rules.is_suspicious_value(value) {
                findings.push(Finding {
                    rule: RuleKind::SuspiciousValue,
                    entity: entity.to_string(),
                    record_id: Some(record_id.to_string()),
                    field: field.clone(),
                    value: value.clone(),
                });
            }
        }

        tracker.entity_mut(entity).record_fields(record_id, &rec.fields);
    }

    let value_findings = findings.len();
    findings.extend(tracker.majority_deviations().into_iter().map(|d| Finding {
        rule: RuleKind::MajorityDeviation,
        entity: d.entity,
        record_id: Some(d.record_id),
        field: d.field,
        value: d.value,
    }));

    debug!(
        suspicious_values = value_findings,
        deviations = findings.len() - value_findings,
        "order rules applied"
    );
    findings
}
