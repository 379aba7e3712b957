//! Comparison output types.
//!
//! All types implement `Debug, Clone, Serialize, Deserialize, PartialEq`.
//! Entries keep the field declaration order; relation buckets are sorted.

use serde::{Deserialize, Serialize};

use crate::compare::RelationChange;
use crate::model::VersionId;

/// Rendered diff of one changed field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum DiffPayload {
    /// HTML from the text diff renderer
    Text(String),
    /// A value appeared where there was none
    Added(String),
    /// An existing value was cleared
    Removed(String),
    /// Both raw values side by side (booleans, timestamps)
    Values { old: String, new: String },
    /// Classified buckets of a many-to-many or reverse relation
    Relation(RelationChange),
    /// Output of a caller supplied renderer
    Custom(String),
}

impl DiffPayload {
    /// The HTML text, for text-like payloads
    pub fn as_text(&self) -> Option<&str> {
        match self {
            DiffPayload::Text(s) | DiffPayload::Custom(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_relation(&self) -> Option<&RelationChange> {
        match self {
            DiffPayload::Relation(change) => Some(change),
            _ => None,
        }
    }
}

/// One changed field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiffEntry {
    pub field: String,
    pub internal_type: String,
    pub is_related: bool,
    pub is_reversed: bool,
    /// `None` for scalars, otherwise whether the relation is followed
    pub follow: Option<bool>,
    pub diff: DiffPayload,
}

/// Result of comparing one object between two snapshots
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompareResult {
    /// Older snapshot (after ordering correction)
    pub version1_id: VersionId,
    /// Newer snapshot
    pub version2_id: VersionId,
    /// Changed fields only, in field declaration order
    pub entries: Vec<DiffEntry>,
    /// Some compared relation is not followed, so related history may be
    /// incomplete
    pub has_unfollowed_fields: bool,
}

impl CompareResult {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, field: &str) -> Option<&DiffEntry> {
        self.entries.iter().find(|e| e.field == field)
    }

    pub fn changed_fields(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.field.as_str()).collect()
    }
}
