use serde::{Deserialize, Serialize};

use crate::error::AuditError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Run configuration. Every field has a default, so an empty TOML document
/// is a valid config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    #[serde(default)]
    pub sheet: SheetConfig,
    #[serde(default)]
    pub orders: OrderConfig,
    #[serde(default)]
    pub rules: RuleConfig,
}

// ---------------------------------------------------------------------------
// Spreadsheet pipeline
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SheetConfig {
    /// `table:name` of the table holding the records.
    #[serde(default = "default_table")]
    pub table: String,
    /// Rows with fewer cells are dropped.
    #[serde(default = "default_min_fields")]
    pub min_fields: usize,
    /// Also read rows nested in `table:table-header-rows` and
    /// `table:table-row-group`. Off: only direct children of the table.
    #[serde(default)]
    pub grouped_rows: bool,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            table: default_table(),
            min_fields: default_min_fields(),
            grouped_rows: false,
        }
    }
}

fn default_table() -> String {
    "data".into()
}

fn default_min_fields() -> usize {
    10
}

// ---------------------------------------------------------------------------
// Order pipeline
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderConfig {
    /// Element name of one record.
    #[serde(default = "default_record_tag")]
    pub record_tag: String,
    /// Field whose value groups records into entities.
    #[serde(default = "default_group_field")]
    pub group_field: String,
    /// Field used to identify a record in findings.
    #[serde(default = "default_id_field")]
    pub id_field: String,
    /// Sentinel written for a child element with no text.
    #[serde(default = "default_missing")]
    pub missing: String,
    /// Placeholder when the group or id field is absent.
    #[serde(default = "default_unknown")]
    pub unknown: String,
}

impl Default for OrderConfig {
    fn default() -> Self {
        Self {
            record_tag: default_record_tag(),
            group_field: default_group_field(),
            id_field: default_id_field(),
            missing: default_missing(),
            unknown: default_unknown(),
        }
    }
}

fn default_record_tag() -> String {
    "order".into()
}

fn default_group_field() -> String {
    "company".into()
}

fn default_id_field() -> String {
    "orderID".into()
}

fn default_missing() -> String {
    "N/A".into()
}

fn default_unknown() -> String {
    "Unknown".into()
}

// ---------------------------------------------------------------------------
// Rule thresholds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    /// Values longer than this (in characters) are suspicious.
    #[serde(default = "default_max_value_len")]
    pub max_value_len: usize,
    /// A run of this many digits in an email is suspicious.
    #[serde(default = "default_min_digit_run")]
    pub min_digit_run: usize,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            max_value_len: default_max_value_len(),
            min_digit_run: default_min_digit_run(),
        }
    }
}

fn default_max_value_len() -> usize {
    50
}

fn default_min_digit_run() -> usize {
    5
}

// ---------------------------------------------------------------------------
// Parsing + validation
// ---------------------------------------------------------------------------

impl AuditConfig {
    /// Parse and validate a TOML config.
    pub fn from_toml(input: &str) -> Result<Self, AuditError> {
        let config: AuditConfig =
            toml::from_str(input).map_err(|e| AuditError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AuditError> {
        if self.sheet.table.is_empty() {
            return Err(AuditError::Config("sheet.table must not be empty".into()));
        }
        if self.sheet.min_fields < 10 {
            return Err(AuditError::Config(format!(
                "sheet.min_fields must be at least 10 (the canonical schema has 10 columns), got {}",
                self.sheet.min_fields
            )));
        }
        for (key, value) in [
            ("orders.record_tag", &self.orders.record_tag),
            ("orders.group_field", &self.orders.group_field),
            ("orders.id_field", &self.orders.id_field),
        ] {
            if value.is_empty() {
                return Err(AuditError::Config(format!("{key} must not be empty")));
            }
        }
        if self.rules.max_value_len == 0 {
            return Err(AuditError::Config("rules.max_value_len must be at least 1".into()));
        }
        if self.rules.min_digit_run == 0 {
            return Err(AuditError::Config("rules.min_digit_run must be at least 1".into()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
