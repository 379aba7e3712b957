//! Relation reconciliation
//!
//! Both many-to-many and reverse foreign-key relations look the same from
//! the referring object: a set of related ids per snapshot. [`collect_related`]
//! turns one side's ids into snapshots, missing objects and deleted
//! candidates; [`reconcile`] classifies both sides into disjoint buckets.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::CompareContext;
use crate::errors::{CompareError, Result};
use crate::model::{coerce_pk, FieldDescriptor, FieldKind, FieldValue, ObjectRef, RelatedItem, Version};
use crate::store::{deleted_in_revision, latest_version_before};

const OP_COLLECT: &str = "collect_related";

/// Related objects of one relational field on one snapshot side
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelatedSide {
    /// Related snapshots captured in the same revision, keyed by id
    pub found: BTreeMap<String, Version>,
    /// Related objects whose own history was not captured
    pub missing: BTreeMap<String, RelatedItem>,
    /// Captured related objects that no longer exist live
    pub deleted: BTreeMap<String, Version>,
}

impl RelatedSide {
    pub fn is_empty(&self) -> bool {
        self.found.is_empty() && self.missing.is_empty()
    }

    /// Display texts of every related object on this side, sorted
    pub fn displays(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .found
            .values()
            .map(|v| v.object_repr.clone())
            .chain(self.missing.values().map(|item| item.display().to_string()))
            .collect();
        out.sort();
        out
    }
}

/// Classified difference of one relational field between two snapshots
///
/// Every related id lands in exactly one bucket. Buckets are sorted by
/// display text, ties broken by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationChange {
    /// Present on both sides with different payloads, as `(old, new)`
    pub changed_items: Vec<(Version, Version)>,
    pub removed_items: Vec<Version>,
    pub added_items: Vec<Version>,
    pub same_items: Vec<Version>,
    pub same_missing_objects: Vec<RelatedItem>,
    pub removed_missing_objects: Vec<RelatedItem>,
    pub added_missing_objects: Vec<RelatedItem>,
    /// Present on the older side only, and no longer existing live
    pub deleted_items: Vec<Version>,
}

impl RelationChange {
    /// True if any bucket other than the two "same" buckets is non-empty
    pub fn is_changed(&self) -> bool {
        !(self.changed_items.is_empty()
            && self.removed_items.is_empty()
            && self.added_items.is_empty()
            && self.removed_missing_objects.is_empty()
            && self.added_missing_objects.is_empty()
            && self.deleted_items.is_empty())
    }

    /// Every id mentioned in any bucket, with its multiplicity
    pub fn bucket_ids(&self) -> Vec<String> {
        let versions = self
            .removed_items
            .iter()
            .chain(&self.added_items)
            .chain(&self.same_items)
            .chain(&self.deleted_items)
            .map(|v| v.object_id.clone());
        let changed = self.changed_items.iter().map(|(old, _)| old.object_id.clone());
        let missing = self
            .same_missing_objects
            .iter()
            .chain(&self.removed_missing_objects)
            .chain(&self.added_missing_objects)
            .map(|item| item.pk().to_string());
        versions.chain(changed).chain(missing).collect()
    }

    /// Display texts of the older side
    pub fn old_displays(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .same_items
            .iter()
            .chain(self.changed_items.iter().map(|(old, _)| old))
            .chain(&self.removed_items)
            .chain(&self.deleted_items)
            .map(|v| v.object_repr.clone())
            .chain(
                self.same_missing_objects
                    .iter()
                    .chain(&self.removed_missing_objects)
                    .map(|item| item.display().to_string()),
            )
            .collect();
        out.sort();
        out
    }

    /// Display texts of the newer side
    pub fn new_displays(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .same_items
            .iter()
            .chain(self.changed_items.iter().map(|(_, new)| new))
            .chain(&self.added_items)
            .map(|v| v.object_repr.clone())
            .chain(
                self.same_missing_objects
                    .iter()
                    .chain(&self.added_missing_objects)
                    .map(|item| item.display().to_string()),
            )
            .collect();
        out.sort();
        out
    }
}

/// Resolve one side's target ids into snapshots and missing objects
///
/// Snapshots are looked up in the revision of `version`. Ids without a
/// snapshot are missing objects; they are resolved only for relations that
/// are not followed, since a followed relation always captures its targets.
/// Reverse relations additionally represent each missing object by its
/// newest snapshot older than this revision and pull in captured objects
/// that have since been deleted.
///
/// # Errors
///
/// Returns `Persistence` if a store fails, or `Internal` if the revision of
/// `version` is unknown.
pub fn collect_related(
    ctx: &CompareContext<'_>,
    field: &FieldDescriptor,
    version: &Version,
    ids: &BTreeSet<String>,
    follow: bool,
    is_reverse: bool,
) -> Result<RelatedSide> {
    let Some(related_model) = field.related_model() else {
        return Ok(RelatedSide::default());
    };
    let mut side = RelatedSide {
        found: ctx.related.get_snapshots(related_model, version.revision_id, ids)?,
        ..RelatedSide::default()
    };

    let registered = ctx.registry.is_registered(related_model);
    let include_related = registered || !ctx.config.ignore_not_registered_relations;

    let mut gone: BTreeSet<String> = BTreeSet::new();
    if !follow {
        let missing_ids: BTreeSet<String> = ids
            .iter()
            .filter(|id| !side.found.contains_key(*id))
            .cloned()
            .collect();
        if !missing_ids.is_empty() && include_related {
            let live = ctx.related.get_live(related_model, &missing_ids)?;
            if !registered && !live.is_empty() {
                tracing::warn!(
                    component = module_path!(),
                    op = OP_COLLECT,
                    model = related_model,
                    field = field.name.as_str(),
                    count = live.len(),
                    "including related objects of a model not under version control"
                );
            }
            gone = missing_ids
                .iter()
                .filter(|id| !live.contains_key(*id))
                .cloned()
                .collect();
            side.missing = live
                .into_iter()
                .map(|(id, obj)| (id, RelatedItem::Live(obj)))
                .collect();
        }
    }

    if is_reverse {
        let revision = ctx
            .versions
            .revision(version.revision_id)?
            .ok_or_else(|| CompareError::Internal {
                message: format!("revision {} of version {} not found", version.revision_id, version.id),
            })?;

        // A missing reverse object counts only if it already existed before
        // this revision; the snapshot from that time stands in for it.
        let mut missing = BTreeMap::new();
        for id in side.missing.keys() {
            let object = ObjectRef::new(related_model, id.clone());
            if let Some(older) = latest_version_before(ctx.versions, &object, revision.date_created)? {
                missing.insert(id.clone(), RelatedItem::Snapshot(older));
            }
        }
        side.missing = missing;

        for id in &gone {
            let object = ObjectRef::new(related_model, id.clone());
            if let Some(older) = latest_version_before(ctx.versions, &object, revision.date_created)? {
                side.deleted.insert(id.clone(), older);
            }
        }

        if include_related {
            for deleted in deleted_in_revision(ctx.versions, ctx.related, related_model, revision.id)? {
                if points_at(ctx, field, &deleted, version) {
                    side.deleted.insert(deleted.object_id.clone(), deleted);
                }
            }
        }

        for (id, deleted) in &side.deleted {
            side.found.entry(id.clone()).or_insert_with(|| deleted.clone());
        }
        side.missing.retain(|id, _| !side.found.contains_key(id));
    }

    Ok(side)
}

/// Whether a related snapshot's foreign key points at the object of `owner`
///
/// Snapshots without the key cannot be ruled out and are kept.
fn points_at(ctx: &CompareContext<'_>, field: &FieldDescriptor, related: &Version, owner: &Version) -> bool {
    let FieldKind::ReverseForeignKey { remote_field, .. } = &field.kind else {
        return true;
    };
    let attname = format!("{}_id", remote_field);
    match FieldValue::lookup(&related.field_dict, remote_field, &attname) {
        FieldValue::Missing => true,
        FieldValue::Value(raw) => {
            let pk_type = ctx.registry.pk_type(&owner.model);
            coerce_pk(&raw, pk_type).is_some_and(|id| id == owner.object_id)
        }
    }
}

/// Classify two sides of one relation into buckets
pub fn reconcile(side1: &RelatedSide, side2: &RelatedSide) -> RelationChange {
    let mut same_missing: BTreeMap<String, RelatedItem> = BTreeMap::new();
    let mut removed_missing: BTreeMap<String, RelatedItem> = BTreeMap::new();
    let mut added_missing: BTreeMap<String, RelatedItem> = BTreeMap::new();

    for (id, item) in &side1.missing {
        if side2.missing.contains_key(id) {
            same_missing.insert(id.clone(), item.clone());
        } else {
            removed_missing.insert(id.clone(), item.clone());
        }
    }
    for (id, item) in &side2.missing {
        if !side1.missing.contains_key(id) {
            added_missing.insert(id.clone(), item.clone());
        }
    }

    let mut change = RelationChange::default();
    let ids: BTreeSet<&String> = side1.found.keys().chain(side2.found.keys()).collect();
    for id in ids {
        match (side1.found.get(id), side2.found.get(id)) {
            (Some(old), Some(new)) => {
                if old.same_payload(new) {
                    change.same_items.push(old.clone());
                } else {
                    change.changed_items.push((old.clone(), new.clone()));
                }
            }
            (Some(old), None) => {
                // Still related, just not captured this time
                if let Some(item) = added_missing.remove(id) {
                    same_missing.insert(id.clone(), item);
                } else if side1.deleted.contains_key(id) {
                    change.deleted_items.push(old.clone());
                } else {
                    change.removed_items.push(old.clone());
                }
            }
            (None, Some(new)) => {
                if let Some(item) = removed_missing.remove(id) {
                    same_missing.insert(id.clone(), item);
                } else {
                    change.added_items.push(new.clone());
                }
            }
            (None, None) => {}
        }
    }

    change.same_missing_objects = sorted_items(same_missing);
    change.removed_missing_objects = sorted_items(removed_missing);
    change.added_missing_objects = sorted_items(added_missing);
    sort_versions(&mut change.same_items);
    sort_versions(&mut change.removed_items);
    sort_versions(&mut change.added_items);
    sort_versions(&mut change.deleted_items);
    change
        .changed_items
        .sort_by(|(a, _), (b, _)| (&a.object_repr, &a.object_id).cmp(&(&b.object_repr, &b.object_id)));
    change
}

fn sort_versions(items: &mut [Version]) {
    items.sort_by(|a, b| (&a.object_repr, &a.object_id).cmp(&(&b.object_repr, &b.object_id)));
}

fn sorted_items(items: BTreeMap<String, RelatedItem>) -> Vec<RelatedItem> {
    let mut out: Vec<RelatedItem> = items.into_values().collect();
    out.sort_by(|a, b| (a.display(), a.pk()).cmp(&(b.display(), b.pk())));
    out
}
