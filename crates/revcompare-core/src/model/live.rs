use serde::{Deserialize, Serialize};

use super::version::Version;

/// A row of the live data store, as currently resolvable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveObject {
    pub model: String,
    pub pk: String,
    /// String form of the object
    pub display: String,
}

impl LiveObject {
    pub fn new(model: impl Into<String>, pk: impl Into<String>, display: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            pk: pk.into(),
            display: display.into(),
        }
    }
}

impl std::fmt::Display for LiveObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display)
    }
}

/// One related object inside a reconciliation bucket
///
/// Related objects captured in the revision are `Snapshot`s. Objects whose
/// own history was not captured are represented by their current live row,
/// or, for reverse relations, by an older snapshot from their own history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", content = "item")]
pub enum RelatedItem {
    Snapshot(Version),
    Live(LiveObject),
}

impl RelatedItem {
    pub fn pk(&self) -> &str {
        match self {
            RelatedItem::Snapshot(v) => &v.object_id,
            RelatedItem::Live(o) => &o.pk,
        }
    }

    pub fn display(&self) -> &str {
        match self {
            RelatedItem::Snapshot(v) => &v.object_repr,
            RelatedItem::Live(o) => &o.display,
        }
    }
}

impl std::fmt::Display for RelatedItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}
