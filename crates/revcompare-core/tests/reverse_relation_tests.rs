#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{obj, Fixture};
use revcompare_core::model::{internal_types, LiveObject, RelatedItem, RevisionId, VersionId};
use revcompare_core::compare::{reconcile, RelatedSide};
use revcompare_core::{CompareConfig, CompareContext, FieldComparison, ObjectRef, RelatedObjectStore, Version};
use serde_json::json;
use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet};

fn names(items: &[Version]) -> Vec<&str> {
    items.iter().map(|v| v.object_repr.as_str()).collect()
}

fn item_names(items: &[RelatedItem]) -> Vec<&str> {
    items.iter().map(RelatedItem::display).collect()
}

fn save_car(fixture: &mut Fixture, revision: RevisionId, car: &ObjectRef, name: &str, factory: &ObjectRef) {
    fixture.save(
        revision,
        car,
        name,
        json!({"name": name, "manufacturer": factory.object_id.parse::<u64>().unwrap()}),
    );
    fixture
        .store
        .set_foreign_key(car, "manufacturer", factory, Some("cars"));
}

/// Factory with three cars; then car one is renamed, car three deleted and
/// car four added
fn factory_with_cars(fixture: &mut Fixture) -> (ObjectRef, VersionId, VersionId) {
    let factory = obj("shop.Factory", "1");
    let cars: Vec<ObjectRef> = (1..=4).map(|i| obj("shop.Car", &i.to_string())).collect();

    let r1 = fixture.revision("create");
    let v1 = fixture.save(r1, &factory, "Factory", json!({"building_ptr": 1, "name": "Factory"}));
    save_car(fixture, r1, &cars[0], "Car One", &factory);
    save_car(fixture, r1, &cars[1], "Car Two", &factory);
    save_car(fixture, r1, &cars[2], "Car Three", &factory);

    fixture.store.delete_live(&cars[2]);
    let r2 = fixture.revision("change cars");
    let v2 = fixture.save(r2, &factory, "Factory", json!({"building_ptr": 1, "name": "Factory"}));
    save_car(fixture, r2, &cars[0], "Car One v2", &factory);
    save_car(fixture, r2, &cars[1], "Car Two", &factory);
    save_car(fixture, r2, &cars[3], "Car Four", &factory);

    (factory, v1, v2)
}

#[test]
fn test_reverse_relation_reports_deleted_items() {
    let mut fixture = Fixture::new();
    let (factory, v1, v2) = factory_with_cars(&mut fixture);

    let result = fixture
        .engine()
        .compare(&factory, &fixture.version(v1), &fixture.version(v2))
        .unwrap();

    assert_eq!(result.changed_fields(), vec!["cars"]);
    assert!(result.has_unfollowed_fields, "workers is not followed");
    let entry = result.entry("cars").unwrap();
    assert!(entry.is_reversed);
    assert_eq!(entry.internal_type, internal_types::MANY_TO_ONE_REL);
    assert_eq!(entry.follow, Some(true));

    let change = entry.diff.as_relation().unwrap();
    assert_eq!(names(&change.deleted_items), vec!["Car Three"]);
    assert!(change.removed_items.is_empty(), "deleted cars are not plain removals");
    assert_eq!(names(&change.added_items), vec!["Car Four"]);
    assert_eq!(names(&change.same_items), vec!["Car Two"]);
    assert_eq!(change.changed_items.len(), 1);
    assert_eq!(change.changed_items[0].1.object_repr, "Car One v2");
}

#[test]
fn test_deleted_car_of_other_factory_is_ignored() {
    let mut fixture = Fixture::new();
    let factory = obj("shop.Factory", "1");
    let other = obj("shop.Factory", "2");
    let mine = obj("shop.Car", "1");
    let theirs = obj("shop.Car", "2");

    let r1 = fixture.revision("create");
    let v1 = fixture.save(r1, &factory, "Factory", json!({"name": "Factory"}));
    fixture.save(r1, &other, "Other", json!({"name": "Other"}));
    save_car(&mut fixture, r1, &mine, "Mine", &factory);
    save_car(&mut fixture, r1, &theirs, "Theirs", &other);

    fixture.store.delete_live(&theirs);
    let r2 = fixture.revision("rename");
    let v2 = fixture.save(r2, &factory, "Factory", json!({"name": "Factory"}));
    save_car(&mut fixture, r2, &mine, "Mine v2", &factory);

    let change = fixture
        .engine()
        .relation_change(&factory, &fixture.version(v1), &fixture.version(v2), "cars")
        .unwrap();
    assert!(change.deleted_items.is_empty());
    assert_eq!(change.changed_items.len(), 1);
}

/// Factory 5 is a child table of building 5; workers point at the building
fn factory_with_workers(fixture: &mut Fixture, with_parent_snapshot: bool) -> (ObjectRef, VersionId, VersionId) {
    let building = obj("shop.Building", "5");
    let factory = obj("shop.Factory", "5");
    let ann = obj("shop.Worker", "1");
    let bob = obj("shop.Worker", "2");

    let r1 = fixture.revision("create");
    if with_parent_snapshot {
        fixture.save(r1, &building, "Building", json!({"address": "Main St"}));
    } else {
        fixture.store.save_live(&building, "Building");
    }
    let v1 = fixture.save(r1, &factory, "Factory", json!({"building_ptr": 5, "name": "Factory"}));
    fixture.save(r1, &ann, "Ann", json!({"name": "Ann", "workplace": 5}));
    fixture.store.set_foreign_key(&ann, "workplace", &building, Some("workers"));

    let r_hire = fixture.revision("hire");
    fixture.save(r_hire, &bob, "Bob", json!({"name": "Bob", "workplace": 5}));
    fixture.store.set_foreign_key(&bob, "workplace", &building, Some("workers"));

    let r2 = fixture.revision("touch");
    if with_parent_snapshot {
        fixture.save(r2, &building, "Building", json!({"address": "Main St"}));
    }
    let v2 = fixture.save(r2, &factory, "Factory", json!({"building_ptr": 5, "name": "Factory"}));

    (factory, v1, v2)
}

#[test]
fn test_reverse_relation_through_parent_table() {
    let mut fixture = Fixture::new();
    let (factory, v1, v2) = factory_with_workers(&mut fixture, true);

    let result = fixture
        .engine()
        .compare(&factory, &fixture.version(v1), &fixture.version(v2))
        .unwrap();

    let entry = result.entry("workers").expect("workers resolved through building");
    assert_eq!(entry.follow, Some(false));
    let change = entry.diff.as_relation().unwrap();
    assert_eq!(item_names(&change.same_missing_objects), vec!["Ann"]);
    assert_eq!(item_names(&change.added_missing_objects), vec!["Bob"]);
    assert!(change.removed_missing_objects.is_empty());
    // Missing reverse objects stand in with their own older snapshot
    assert!(matches!(change.added_missing_objects[0], RelatedItem::Snapshot(_)));
}

#[test]
fn test_parent_table_needs_sibling_snapshot() {
    let mut fixture = Fixture::new();
    let (factory, v1, v2) = factory_with_workers(&mut fixture, false);

    let result = fixture
        .engine()
        .compare(&factory, &fixture.version(v1), &fixture.version(v2))
        .unwrap();
    assert!(result.entry("workers").is_none());
}

/// Live store wrapper counting snapshot lookups
struct CountingStore<'a> {
    inner: &'a dyn RelatedObjectStore,
    snapshot_calls: Cell<usize>,
}

impl RelatedObjectStore for CountingStore<'_> {
    fn get_snapshots(
        &self,
        model: &str,
        revision_id: RevisionId,
        ids: &BTreeSet<String>,
    ) -> revcompare_core::Result<BTreeMap<String, Version>> {
        self.snapshot_calls.set(self.snapshot_calls.get() + 1);
        self.inner.get_snapshots(model, revision_id, ids)
    }

    fn get_live(&self, model: &str, ids: &BTreeSet<String>) -> revcompare_core::Result<BTreeMap<String, LiveObject>> {
        self.inner.get_live(model, ids)
    }

    fn follow_foreign_key(&self, object: &ObjectRef, field: &str) -> revcompare_core::Result<Option<LiveObject>> {
        self.inner.follow_foreign_key(object, field)
    }

    fn reverse_ids(&self, object: &ObjectRef, accessor: &str) -> revcompare_core::Result<BTreeSet<String>> {
        self.inner.reverse_ids(object, accessor)
    }
}

#[test]
fn test_relation_reconciliation_is_memoized() {
    let mut fixture = Fixture::new();
    let (factory, v1, v2) = factory_with_cars(&mut fixture);
    let (v1, v2) = (fixture.version(v1), fixture.version(v2));

    let counting = CountingStore {
        inner: &fixture.store,
        snapshot_calls: Cell::new(0),
    };
    let ctx = CompareContext::new(&fixture.registry, &fixture.store, &counting, CompareConfig::default());
    let fields = fixture.registry.comparable_fields("shop.Factory").unwrap();
    let cars = fields.iter().find(|f| f.name == "cars").unwrap();
    let comparison = FieldComparison::new(&ctx, cars, &factory, &v1, &v2);

    assert!(comparison.changed());
    let after_first = counting.snapshot_calls.get();
    assert_eq!(after_first, 2, "one lookup per side");

    assert!(comparison.changed());
    let change = comparison.relation_change();
    assert_eq!(change.deleted_items.len(), 1);
    let (old, new) = comparison.to_strings();
    assert_eq!(old, "Car One, Car Three, Car Two");
    assert_eq!(new, "Car Four, Car One v2, Car Two");
    assert_eq!(counting.snapshot_calls.get(), after_first);
}

/// Live store whose reverse index still lists rows that no longer exist
struct StaleIndexStore<'a> {
    inner: &'a dyn RelatedObjectStore,
    stale: BTreeSet<String>,
}

impl RelatedObjectStore for StaleIndexStore<'_> {
    fn get_snapshots(
        &self,
        model: &str,
        revision_id: RevisionId,
        ids: &BTreeSet<String>,
    ) -> revcompare_core::Result<BTreeMap<String, Version>> {
        self.inner.get_snapshots(model, revision_id, ids)
    }

    fn get_live(&self, model: &str, ids: &BTreeSet<String>) -> revcompare_core::Result<BTreeMap<String, LiveObject>> {
        self.inner.get_live(model, ids)
    }

    fn follow_foreign_key(&self, object: &ObjectRef, field: &str) -> revcompare_core::Result<Option<LiveObject>> {
        self.inner.follow_foreign_key(object, field)
    }

    fn reverse_ids(&self, object: &ObjectRef, accessor: &str) -> revcompare_core::Result<BTreeSet<String>> {
        let mut ids = self.inner.reverse_ids(object, accessor)?;
        ids.extend(self.stale.iter().cloned());
        Ok(ids)
    }
}

#[test]
fn test_gone_reverse_object_uses_its_own_history() {
    let mut fixture = Fixture::new();
    let building = obj("shop.Building", "3");
    let ann = obj("shop.Worker", "1");

    let r0 = fixture.revision("hire");
    fixture.save(r0, &ann, "Ann", json!({"name": "Ann", "workplace": 3}));
    let r1 = fixture.revision("create");
    let v1 = fixture.save(r1, &building, "Building", json!({"address": "Main St"}));
    fixture.store.delete_live(&ann);
    let r2 = fixture.revision("touch");
    let v2 = fixture.save(r2, &building, "Building", json!({"address": "Main St"}));
    let (v1, v2) = (fixture.version(v1), fixture.version(v2));

    // Worker 9 never had a snapshot
    let stale = StaleIndexStore {
        inner: &fixture.store,
        stale: BTreeSet::from(["1".to_string(), "9".to_string()]),
    };
    let ctx = CompareContext::new(&fixture.registry, &fixture.store, &stale, CompareConfig::default());
    let fields = fixture.registry.comparable_fields("shop.Building").unwrap();
    let workers = fields.iter().find(|f| f.name == "workers").unwrap();
    let comparison = FieldComparison::new(&ctx, workers, &building, &v1, &v2);

    let side = comparison.side1().related_side();
    assert_eq!(side.deleted.keys().collect::<Vec<_>>(), vec!["1"]);
    assert_eq!(side.deleted["1"].object_repr, "Ann");
    assert_eq!(side.found.keys().collect::<Vec<_>>(), vec!["1"]);
    assert!(side.missing.is_empty());
    assert!(!side.found.contains_key("9") && !side.deleted.contains_key("9"));

    let change = reconcile(&side, &RelatedSide::default());
    assert_eq!(names(&change.deleted_items), vec!["Ann"]);
    assert!(change.removed_items.is_empty());
}
