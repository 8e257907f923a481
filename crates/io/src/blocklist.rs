//! Disposable-domain reference list loading.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use gridaudit_engine::{AuditError, Blocklist};

/// What to do when the reference list cannot be read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlocklistPolicy {
    /// Continue with an empty list and flag the run as degraded.
    #[default]
    Degrade,
    /// Abort the run with an IO error.
    Fail,
}

#[derive(Debug, Clone)]
pub struct LoadedBlocklist {
    pub blocklist: Blocklist,
    /// Set when the list was unreadable and the run continued without it.
    pub degraded: bool,
}

pub fn load_blocklist(path: &Path, policy: BlocklistPolicy) -> Result<LoadedBlocklist, AuditError> {
    match std::fs::read_to_string(path) {
        Ok(text) => {
            let blocklist = Blocklist::parse(&text);
            info!(path = %path.display(), domains = blocklist.len(), "blocklist loaded");
            Ok(LoadedBlocklist {
                blocklist,
                degraded: false,
            })
        }
        Err(err) => match policy {
            BlocklistPolicy::Fail => Err(AuditError::io(path, err)),
            BlocklistPolicy::Degrade => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "blocklist unreadable, continuing without disposable-domain checks"
                );
                Ok(LoadedBlocklist {
                    blocklist: Blocklist::empty(),
                    degraded: true,
                })
            }
        },
    }
}
