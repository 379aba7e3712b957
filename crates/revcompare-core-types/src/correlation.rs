//! Correlation identifier for a single comparison request
//!
//! Every call into the comparison engine gets its own `ComparisonId`. It is
//! attached to the tracing span of the request so that log lines from the
//! resolver, reconciler and comparator can be grouped per request.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one comparison request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComparisonId(String);

impl ComparisonId {
    /// Generate a fresh id (UUIDv7, so ids sort by creation time)
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wrap an id supplied by the caller (e.g. an upstream request id)
    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Default for ComparisonId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ComparisonId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
