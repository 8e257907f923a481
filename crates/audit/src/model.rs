use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Insertion-ordered field name → value map for tag-driven records.
pub type FieldMap = IndexMap<String, String>;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A single extracted record, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawRecord {
    /// One spreadsheet row: cell texts by column position.
    Positional(Vec<String>),
    /// One `<order>` element: child tag → child text.
    Tagged(FieldMap),
}

/// Which document family a run processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Office spreadsheet export with a fixed ten-column schema.
    Agencies,
    /// Free-form `<order>` document with a discovered schema.
    Orders,
}

impl DocumentKind {
    pub fn root_element(&self) -> &'static str {
        match self {
            Self::Agencies => "Agencies",
            Self::Orders => "Orders",
        }
    }

    pub fn record_element(&self) -> &'static str {
        match self {
            Self::Agencies => "Agency",
            Self::Orders => "order",
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Agencies => write!(f, "agencies"),
            Self::Orders => write!(f, "orders"),
        }
    }
}

// ---------------------------------------------------------------------------
// Canonical records
// ---------------------------------------------------------------------------

/// Fixed-schema record of the spreadsheet pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AgencyRecord {
    pub agency_name: String,
    pub address: String,
    pub contact_name1: String,
    pub phone1: String,
    pub email1: String,
    pub contact_name2: String,
    pub phone2: String,
    pub email2: String,
    pub order_id: String,
    pub date: String,
}

impl AgencyRecord {
    /// Output element names, in column order.
    pub const ELEMENTS: [&'static str; 10] = [
        "AgencyName",
        "Address",
        "Name1",
        "Phone1",
        "Email1",
        "Name2",
        "Phone2",
        "Email2",
        "OrderID",
        "Date",
    ];

    /// (element name, value) pairs in column order.
    pub fn elements(&self) -> [(&'static str, &str); 10] {
        let values = [
            &self.agency_name,
            &self.address,
            &self.contact_name1,
            &self.phone1,
            &self.email1,
            &self.contact_name2,
            &self.phone2,
            &self.email2,
            &self.order_id,
            &self.date,
        ];
        let mut out = [("", ""); 10];
        for (i, value) in values.into_iter().enumerate() {
            out[i] = (Self::ELEMENTS[i], value.as_str());
        }
        out
    }

    /// The two contact email columns, labelled by output element.
    pub fn emails(&self) -> [(&'static str, &str); 2] {
        [("Email1", &self.email1), ("Email2", &self.email2)]
    }
}

/// Discovered-schema record of the order pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OrderRecord {
    pub fields: FieldMap,
}

impl OrderRecord {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanonicalRecord {
    Agency(AgencyRecord),
    Order(OrderRecord),
}

impl CanonicalRecord {
    /// (element name, value) pairs in output order.
    pub fn elements(&self) -> Vec<(&str, &str)> {
        match self {
            Self::Agency(r) => r.elements().to_vec(),
            Self::Order(r) => r
                .fields
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect(),
        }
    }
}

/// The exportable normalized document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedDocument {
    pub kind: DocumentKind,
    pub records: Vec<CanonicalRecord>,
}

// ---------------------------------------------------------------------------
// Findings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    InvalidEmailFormat,
    SuspiciousCharacters,
    DisposableDomain,
    InconsistentAddress,
    InconsistentDomain,
    SuspiciousValue,
    MajorityDeviation,
}

impl std::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidEmailFormat => write!(f, "invalid_email_format"),
            Self::SuspiciousCharacters => write!(f, "suspicious_characters"),
            Self::DisposableDomain => write!(f, "disposable_domain"),
            Self::InconsistentAddress => write!(f, "inconsistent_address"),
            Self::InconsistentDomain => write!(f, "inconsistent_domain"),
            Self::SuspiciousValue => write!(f, "suspicious_value"),
            Self::MajorityDeviation => write!(f, "majority_deviation"),
        }
    }
}

/// One anomaly, with enough context to act on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub rule: RuleKind,
    /// Grouping key (agency or company name).
    pub entity: String,
    /// Order identifier of the offending record, when the record has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    pub field: String,
    pub value: String,
}

impl Finding {
    /// The free-text line written to the anomaly report.
    pub fn message(&self) -> String {
        let (entity, value) = (&self.entity, &self.value);
        match self.rule {
            RuleKind::InconsistentAddress => format!("Inconsistent address for {entity}: {value}"),
            RuleKind::InvalidEmailFormat => format!("Invalid email format for {entity}: {value}"),
            RuleKind::SuspiciousCharacters => {
                format!("Suspicious characters in email for {entity}: {value}")
            }
            RuleKind::DisposableDomain => {
                format!("Suspicious email domain for {entity}: {value} (Disposable Domain)")
            }
            RuleKind::InconsistentDomain => format!("Inconsistent domain for {entity}: {value}"),
            RuleKind::SuspiciousValue | RuleKind::MajorityDeviation => format!(
                "{}: {value} (in Order ID: {})",
                self.field,
                self.record_id.as_deref().unwrap_or("Unknown"),
            ),
        }
    }
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message())
    }
}

// ---------------------------------------------------------------------------
// Consistency analysis + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

/// Value distribution of one field that disagrees across an entity's records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldBreakdown {
    pub entity: String,
    pub field: String,
    /// Distinct values in first-appearance order.
    pub counts: Vec<ValueCount>,
}

/// Everything a run produces, handed explicitly to the reporter.
#[derive(Debug, Clone)]
pub struct AuditOutcome {
    pub document: NormalizedDocument,
    pub findings: Vec<Finding>,
    /// Per-entity disagreement breakdown (order pipeline only).
    pub analysis: Vec<FieldBreakdown>,
    pub entities: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(rule: RuleKind) -> Finding {
        Finding {
            rule,
            entity: "Acme".into(),
            record_id: None,
            field: "Email1".into(),
            value: "x@y.com".into(),
        }
    }

    #[test]
    fn agency_elements_follow_column_order() {
        let rec = AgencyRecord {
            agency_name: "Acme".into(),
            date: "2024-10-01".into(),
            ..Default::default()
        };
        let elements = rec.elements();
        assert_eq!(elements[0], ("AgencyName", "Acme"));
        assert_eq!(elements[8].0, "OrderID");
        assert_eq!(elements[9], ("Date", "2024-10-01"));
    }

    #[test]
    fn messages_per_rule() {
        assert_eq!(
            finding(RuleKind::InconsistentDomain).message(),
            "Inconsistent domain for Acme: x@y.com"
        );
        assert_eq!(
            finding(RuleKind::DisposableDomain).message(),
            "Suspicious email domain for Acme: x@y.com (Disposable Domain)"
        );
    }

    #[test]
    fn order_message_falls_back_to_unknown_id() {
        let mut f = finding(RuleKind::SuspiciousValue);
        f.field = "phone".into();
        f.value = "555_0000".into();
        assert_eq!(f.message(), "phone: 555_0000 (in Order ID: Unknown)");
        f.record_id = Some("A-7".into());
        assert_eq!(f.to_string(), "phone: 555_0000 (in Order ID: A-7)");
    }
}
