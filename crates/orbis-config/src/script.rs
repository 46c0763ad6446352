//! Script execution configuration.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ScriptConfig {
    /// Interpreter operation budget for general-purpose scripts.
    /// Zero leaves execution unbounded.
    #[serde(default)]
    pub max_operations: u64,
}

impl ScriptConfig {
    #[must_use]
    pub const fn operation_limit(&self) -> Option<u64> {
        if self.max_operations == 0 {
            None
        } else {
            Some(self.max_operations)
        }
    }
}
