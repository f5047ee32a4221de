//! Execution context capabilities

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where the registry runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionContext {
    /// Durable storage and messaging may be used
    #[default]
    Interactive,
    /// No storage, no messaging; records never leave `Hydrating`
    Headless,
}

impl ExecutionContext {
    pub fn is_interactive(&self) -> bool {
        matches!(self, ExecutionContext::Interactive)
    }
}

impl fmt::Display for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionContext::Interactive => write!(f, "interactive"),
            ExecutionContext::Headless => write!(f, "headless"),
        }
    }
}
