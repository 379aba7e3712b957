//! Read contracts against the snapshot store and the live data store
//!
//! The engine never writes. Both traits are object safe so callers can hand
//! the engine any backing implementation; [`MemoryStore`] implements both
//! over ordered maps.

pub mod memory;

pub use memory::MemoryStore;

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};

use crate::errors::{CompareError, Result};
use crate::model::{LiveObject, ObjectRef, Revision, RevisionId, Version, VersionId};

/// Query surface of the snapshot store
pub trait VersionStore {
    /// All snapshots of one object, oldest first
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the backing store fails.
    fn versions_for_object(&self, object: &ObjectRef) -> Result<Vec<Version>>;

    /// # Errors
    ///
    /// Returns `Persistence` if the backing store fails.
    fn version(&self, id: VersionId) -> Result<Option<Version>>;

    /// # Errors
    ///
    /// Returns `Persistence` if the backing store fails.
    fn revision(&self, id: RevisionId) -> Result<Option<Revision>>;

    /// Every snapshot saved in one revision, ordered by version id
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the backing store fails.
    fn revision_versions(&self, revision_id: RevisionId) -> Result<Vec<Version>>;
}

/// Query surface used to resolve relations
pub trait RelatedObjectStore {
    /// Snapshots of `model` inside one revision, keyed by object id
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the backing store fails.
    fn get_snapshots(
        &self,
        model: &str,
        revision_id: RevisionId,
        ids: &BTreeSet<String>,
    ) -> Result<BTreeMap<String, Version>>;

    /// Live rows of `model` by primary key; absent keys are simply missing
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the backing store fails.
    fn get_live(&self, model: &str, ids: &BTreeSet<String>) -> Result<BTreeMap<String, LiveObject>>;

    /// Target of a foreign key on the live row of `object`
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the backing store fails.
    fn follow_foreign_key(&self, object: &ObjectRef, field: &str) -> Result<Option<LiveObject>>;

    /// Ids of live rows pointing at `object` through the reverse accessor
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the backing store fails.
    fn reverse_ids(&self, object: &ObjectRef, accessor: &str) -> Result<BTreeSet<String>>;
}

/// Load a snapshot, constrained to the history of `object`
///
/// # Errors
///
/// Returns `VersionNotFound` for unknown ids and `VersionObjectMismatch`
/// when the snapshot belongs to another object.
pub fn get_version_for_object(
    store: &dyn VersionStore,
    object: &ObjectRef,
    id: VersionId,
) -> Result<Version> {
    let version = store.version(id)?.ok_or_else(|| CompareError::VersionNotFound {
        version_id: id.0,
        model: object.model.clone(),
        object_id: object.object_id.clone(),
    })?;
    if !version.describes(object) {
        return Err(CompareError::VersionObjectMismatch {
            version_id: id.0,
            expected: object.to_string(),
            actual: version.object_ref().to_string(),
        });
    }
    Ok(version)
}

/// Snapshots of `model` in a revision whose live row no longer exists
///
/// Ordered by object id.
///
/// # Errors
///
/// Returns `Persistence` if either store fails.
pub fn deleted_in_revision(
    versions: &dyn VersionStore,
    related: &dyn RelatedObjectStore,
    model: &str,
    revision_id: RevisionId,
) -> Result<Vec<Version>> {
    let captured: BTreeMap<String, Version> = versions
        .revision_versions(revision_id)?
        .into_iter()
        .filter(|v| v.model == model)
        .map(|v| (v.object_id.clone(), v))
        .collect();
    if captured.is_empty() {
        return Ok(Vec::new());
    }
    let ids: BTreeSet<String> = captured.keys().cloned().collect();
    let live = related.get_live(model, &ids)?;
    Ok(captured
        .into_iter()
        .filter(|(id, _)| !live.contains_key(id))
        .map(|(_, v)| v)
        .collect())
}

/// Newest snapshot of `object` saved in a revision created before `before`
///
/// # Errors
///
/// Returns `Persistence` if the backing store fails.
pub fn latest_version_before(
    store: &dyn VersionStore,
    object: &ObjectRef,
    before: DateTime<Utc>,
) -> Result<Option<Version>> {
    let mut latest = None;
    for version in store.versions_for_object(object)? {
        let created = store.revision(version.revision_id)?.map(|r| r.date_created);
        if created.is_some_and(|date| date < before) {
            latest = Some(version);
        }
    }
    Ok(latest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap()
    }

    fn store() -> (MemoryStore, ObjectRef, ObjectRef) {
        let mut store = MemoryStore::new();
        let pet = ObjectRef::new("zoo.Pet", "1");
        let gone = ObjectRef::new("zoo.Pet", "2");
        let r1 = store.create_revision(at(1), None, "first");
        store.save_live(&pet, "Rex");
        store.save_live(&gone, "Max");
        store
            .add_version(r1, &pet, "Rex", [("name".to_string(), json!("Rex"))].into())
            .unwrap();
        store
            .add_version(r1, &gone, "Max", [("name".to_string(), json!("Max"))].into())
            .unwrap();
        let r2 = store.create_revision(at(2), None, "second");
        store
            .add_version(r2, &pet, "Rexy", [("name".to_string(), json!("Rexy"))].into())
            .unwrap();
        store.delete_live(&gone);
        (store, pet, gone)
    }

    #[test]
    fn test_get_version_for_object_checks_owner() {
        let (store, pet, gone) = store();
        let v = get_version_for_object(&store, &pet, VersionId(1)).unwrap();
        assert_eq!(v.object_repr, "Rex");

        let err = get_version_for_object(&store, &gone, VersionId(1)).unwrap_err();
        assert!(matches!(err, CompareError::VersionObjectMismatch { version_id: 1, .. }));

        let err = get_version_for_object(&store, &pet, VersionId(99)).unwrap_err();
        assert!(matches!(err, CompareError::VersionNotFound { version_id: 99, .. }));
    }

    #[test]
    fn test_deleted_in_revision() {
        let (store, _, gone) = store();
        let deleted = deleted_in_revision(&store, &store, "zoo.Pet", RevisionId(1)).unwrap();
        assert_eq!(deleted.len(), 1);
        assert!(deleted[0].describes(&gone));
        assert!(deleted_in_revision(&store, &store, "zoo.Pet", RevisionId(2))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_latest_version_before() {
        let (store, pet, _) = store();
        let found = latest_version_before(&store, &pet, at(2)).unwrap().unwrap();
        assert_eq!(found.object_repr, "Rex");
        let newest = latest_version_before(&store, &pet, at(3)).unwrap().unwrap();
        assert_eq!(newest.object_repr, "Rexy");
        assert!(latest_version_before(&store, &pet, at(1)).unwrap().is_none());
    }
}
