use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use super::{RelatedObjectStore, VersionStore};
use crate::errors::Result;
use crate::model::{LiveObject, ObjectRef, Revision, RevisionId, Version, VersionId};

/// Foreign key link between two live rows
#[derive(Debug, Clone, PartialEq, Eq)]
struct Link {
    target: ObjectRef,
    related_name: Option<String>,
}

/// In-memory snapshot store and live data store
///
/// Ordered maps keep every query deterministic. Not thread-safe for writes
/// (`&mut self`); designed for fixtures and single-threaded embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    revisions: BTreeMap<RevisionId, Revision>,
    versions: BTreeMap<VersionId, Version>,
    live: BTreeMap<ObjectRef, String>,
    links: BTreeMap<(ObjectRef, String), Link>,
    next_revision: u64,
    next_version: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new revision; ids increase in creation order
    pub fn create_revision(
        &mut self,
        date_created: DateTime<Utc>,
        user: Option<&str>,
        comment: &str,
    ) -> RevisionId {
        self.next_revision += 1;
        let id = RevisionId(self.next_revision);
        self.revisions.insert(
            id,
            Revision {
                id,
                date_created,
                user: user.map(str::to_string),
                comment: comment.to_string(),
            },
        );
        id
    }

    /// Save a snapshot of `object` into `revision`
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if the field dict cannot be encoded.
    pub fn add_version(
        &mut self,
        revision: RevisionId,
        object: &ObjectRef,
        object_repr: &str,
        field_dict: BTreeMap<String, Value>,
    ) -> Result<VersionId> {
        self.next_version += 1;
        let id = VersionId(self.next_version);
        let version = Version::from_fields(id, revision, object, object_repr, field_dict)?;
        self.versions.insert(id, version);
        Ok(id)
    }

    /// Insert a stored snapshot as is (e.g. with a foreign serialization format)
    pub fn insert_version(&mut self, version: Version) {
        self.next_version = self.next_version.max(version.id.0);
        self.versions.insert(version.id, version);
    }

    /// Create or update the live row of `object`
    pub fn save_live(&mut self, object: &ObjectRef, display: &str) {
        self.live.insert(object.clone(), display.to_string());
    }

    /// Delete the live row of `object` and its outgoing links
    pub fn delete_live(&mut self, object: &ObjectRef) {
        self.live.remove(object);
        self.links.retain(|(source, _), _| source != object);
    }

    /// Point `source.field` at `target`, reachable back through `related_name`
    pub fn set_foreign_key(
        &mut self,
        source: &ObjectRef,
        field: &str,
        target: &ObjectRef,
        related_name: Option<&str>,
    ) {
        self.links.insert(
            (source.clone(), field.to_string()),
            Link {
                target: target.clone(),
                related_name: related_name.map(str::to_string),
            },
        );
    }

    pub fn clear_foreign_key(&mut self, source: &ObjectRef, field: &str) {
        self.links.remove(&(source.clone(), field.to_string()));
    }

    pub fn is_live(&self, object: &ObjectRef) -> bool {
        self.live.contains_key(object)
    }

    fn live_object(&self, object: &ObjectRef) -> Option<LiveObject> {
        self.live.get(object).map(|display| {
            LiveObject::new(object.model.clone(), object.object_id.clone(), display.clone())
        })
    }
}

impl VersionStore for MemoryStore {
    fn versions_for_object(&self, object: &ObjectRef) -> Result<Vec<Version>> {
        Ok(self
            .versions
            .values()
            .filter(|v| v.describes(object))
            .cloned()
            .collect())
    }

    fn version(&self, id: VersionId) -> Result<Option<Version>> {
        Ok(self.versions.get(&id).cloned())
    }

    fn revision(&self, id: RevisionId) -> Result<Option<Revision>> {
        Ok(self.revisions.get(&id).cloned())
    }

    fn revision_versions(&self, revision_id: RevisionId) -> Result<Vec<Version>> {
        Ok(self
            .versions
            .values()
            .filter(|v| v.revision_id == revision_id)
            .cloned()
            .collect())
    }
}

impl RelatedObjectStore for MemoryStore {
    fn get_snapshots(
        &self,
        model: &str,
        revision_id: RevisionId,
        ids: &BTreeSet<String>,
    ) -> Result<BTreeMap<String, Version>> {
        Ok(self
            .versions
            .values()
            .filter(|v| v.revision_id == revision_id && v.model == model && ids.contains(&v.object_id))
            .map(|v| (v.object_id.clone(), v.clone()))
            .collect())
    }

    fn get_live(&self, model: &str, ids: &BTreeSet<String>) -> Result<BTreeMap<String, LiveObject>> {
        Ok(ids
            .iter()
            .filter_map(|id| {
                self.live_object(&ObjectRef::new(model, id.clone()))
                    .map(|obj| (id.clone(), obj))
            })
            .collect())
    }

    fn follow_foreign_key(&self, object: &ObjectRef, field: &str) -> Result<Option<LiveObject>> {
        if !self.is_live(object) {
            return Ok(None);
        }
        Ok(self
            .links
            .get(&(object.clone(), field.to_string()))
            .and_then(|link| self.live_object(&link.target)))
    }

    fn reverse_ids(&self, object: &ObjectRef, accessor: &str) -> Result<BTreeSet<String>> {
        if !self.is_live(object) {
            return Ok(BTreeSet::new());
        }
        Ok(self
            .links
            .iter()
            .filter(|((source, _), link)| {
                &link.target == object
                    && link.related_name.as_deref() == Some(accessor)
                    && self.is_live(source)
            })
            .map(|((source, _), _)| source.object_id.clone())
            .collect())
    }
}
