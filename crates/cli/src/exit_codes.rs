//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Scripts branch on these, so they are part of the shell contract.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success (findings do not change the exit code)       |
//! | 2    | Usage error (bad arguments)                          |
//! | 3    | I/O error (source, blocklist or output unusable)     |
//! | 4    | Parse error (source is not well-formed)              |
//! | 5    | Schema error (required table or archive entry absent)|
//! | 6    | Config error (TOML unreadable or invalid)            |

use gridaudit_engine::AuditError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Usage error - bad arguments, missing required options.
/// clap exits with this code on its own parse failures.
pub const EXIT_USAGE: u8 = 2;

/// Source, blocklist (under `--strict-blocklist`) or output path unusable.
pub const EXIT_IO: u8 = 3;

/// Source document is malformed.
pub const EXIT_PARSE: u8 = 4;

/// Required container is missing from the source.
pub const EXIT_SCHEMA: u8 = 5;

/// Configuration file unreadable or invalid.
pub const EXIT_CONFIG: u8 = 6;

/// Map a library error to its exit code.
pub fn audit_exit_code(err: &AuditError) -> u8 {
    match err {
        AuditError::Io { .. } => EXIT_IO,
        AuditError::Parse(_) => EXIT_PARSE,
        AuditError::Schema(_) => EXIT_SCHEMA,
        AuditError::Config(_) => EXIT_CONFIG,
    }
}
