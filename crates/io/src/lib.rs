//! File I/O for gridaudit: source loading, record extraction, reference
//! lists and XML report writing.

pub mod blocklist;
pub mod ods;
pub mod orders;
pub mod pipeline;
pub mod report;
pub mod source;
mod xml;

pub use blocklist::{load_blocklist, BlocklistPolicy, LoadedBlocklist};
pub use pipeline::{run_audit, AuditReport, AuditRequest, RunMeta};
pub use report::{write_outputs, OutputPaths};
pub use source::{read_source, SourceDocument};
