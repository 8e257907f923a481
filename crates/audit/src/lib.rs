//! `gridaudit-engine` - record normalization and anomaly detection.
//!
//! Pure engine crate: receives pre-extracted records, returns the normalized
//! document and the ordered list of findings. No XML or filesystem
//! dependencies.

pub mod blocklist;
pub mod canonical;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod rules;
pub mod summary;
pub mod tracker;

pub use blocklist::Blocklist;
pub use config::AuditConfig;
pub use engine::run;
pub use error::AuditError;
pub use model::{AuditOutcome, DocumentKind, Finding, RawRecord, RuleKind};
