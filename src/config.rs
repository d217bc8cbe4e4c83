use crate::dialect::Dialect;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Connection settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// SQL dialect used for every generated statement
    pub dialect: Dialect,
    /// When set, writes fail with this reason
    pub read_only: Option<String>,
}

impl ConnectionConfig {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            read_only: None,
        }
    }

    pub fn read_only(mut self, reason: impl Into<String>) -> Self {
        self.read_only = Some(reason.into());
        self
    }

    /// Load from JSON text, e.g. `{"dialect": "postgres"}`
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
