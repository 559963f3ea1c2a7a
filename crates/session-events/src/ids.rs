//! Identifier Types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a part.
///
/// Serializes as a bare string so it can be used as a JSON map key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartId(pub String);

impl PartId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PartId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PartId {
    fn from(id: String) -> Self {
        Self(id)
    }
}
