use std::path::PathBuf;

/// The single error surface of an audit run.
///
/// Anything that is merely *wrong with the data* (bad email, missing field,
/// odd characters) is a [`Finding`](crate::model::Finding), never an error.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// The required container (e.g. the `data` table) is absent.
    #[error("schema error: {0}")]
    Schema(String),
    /// The source document is not well-formed XML.
    #[error("parse error: {0}")]
    Parse(String),
    /// A file could not be read or written.
    #[error("IO error: {}: {message}", .path.display())]
    Io { path: PathBuf, message: String },
    /// TOML parse / validation error.
    #[error("config error: {0}")]
    Config(String),
}

impl AuditError {
    pub fn io(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }
}
