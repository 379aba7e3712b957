//! Version history listing and neighbour navigation
//!
//! Feeds a history view: the list of snapshots with the two entries to
//! preselect for comparison, and the "previous" / "next" comparison pairs
//! around the currently compared snapshots.

use serde::{Deserialize, Serialize};

use crate::errors::{CompareError, Result};
use crate::model::{ObjectRef, Revision, Version, VersionId};
use crate::store::VersionStore;

/// One snapshot of the history with its revision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionEntry {
    pub version: Version,
    pub revision: Revision,
    /// Preselected as the first compared snapshot
    pub first: bool,
    /// Preselected as the second compared snapshot
    pub second: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionList {
    pub entries: Vec<ActionEntry>,
    /// At least two snapshots exist
    pub comparable: bool,
}

/// List the history of `object`
///
/// With `latest_first` the newest snapshot comes first and is preselected as
/// `first`, the one after it as `second`. Otherwise the list is oldest first
/// and the preselection sits at the end.
///
/// # Errors
///
/// Returns `Persistence` if the store fails, or `Internal` if a snapshot
/// references an unknown revision.
pub fn action_list(store: &dyn VersionStore, object: &ObjectRef, latest_first: bool) -> Result<ActionList> {
    let mut versions = store.versions_for_object(object)?;
    versions.sort_by_key(|v| v.id);
    if latest_first {
        versions.reverse();
    }

    let mut entries = Vec::with_capacity(versions.len());
    for version in versions {
        let revision = store
            .revision(version.revision_id)?
            .ok_or_else(|| CompareError::Internal {
                message: format!("revision {} of version {} not found", version.revision_id, version.id),
            })?;
        entries.push(ActionEntry {
            version,
            revision,
            first: false,
            second: false,
        });
    }

    let comparable = entries.len() >= 2;
    if comparable {
        let n = entries.len();
        let (first, second) = if latest_first { (0, 1) } else { (n - 1, n - 2) };
        entries[first].first = true;
        entries[second].second = true;
    }

    Ok(ActionList {
        entries,
        comparable,
    })
}

/// Neighbouring comparison pairs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Navigation {
    /// `(snapshot before version1, version1)`
    pub prev: Option<(VersionId, VersionId)>,
    /// `(version2, snapshot after version2)`
    pub next: Option<(VersionId, VersionId)>,
}

/// Compute the previous / next comparison pairs around `(id1, id2)`
///
/// The ids may be given in either order.
///
/// # Errors
///
/// Returns `Persistence` if the store fails.
pub fn navigation(
    store: &dyn VersionStore,
    object: &ObjectRef,
    id1: VersionId,
    id2: VersionId,
) -> Result<Navigation> {
    let (id1, id2) = if id1 > id2 { (id2, id1) } else { (id1, id2) };
    let ids: Vec<VersionId> = store.versions_for_object(object)?.iter().map(|v| v.id).collect();
    let before = ids.iter().copied().filter(|id| *id < id1).max();
    let after = ids.iter().copied().filter(|id| *id > id2).min();
    Ok(Navigation {
        prev: before.map(|id| (id, id1)),
        next: after.map(|id| (id2, id)),
    })
}
