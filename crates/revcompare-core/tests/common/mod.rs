use chrono::{DateTime, Duration, TimeZone, Utc};
use revcompare_core::model::{internal_types, ModelMeta};
use revcompare_core::{
    CompareEngine, FieldDescriptor, MemoryStore, ModelRegistry, ObjectRef, RevisionId, Version, VersionId,
};
use serde_json::Value;
use std::collections::BTreeMap;

/// Models used across the integration tests
///
/// - `app.SimpleModel`: one text field
/// - `app.VariantModel`: one field per rendered internal type
/// - `zoo.Pet` / `zoo.Person`: person with a followed many-to-many to pets
/// - `shop.Building` / `shop.Factory`: multi-table inheritance
/// - `shop.Car`: foreign key to factory (reverse `cars`), unfollowed
///   many-to-many `supplier`
/// - `shop.Worker`: foreign key to building (reverse `workers`)
#[allow(dead_code)]
pub fn registry() -> ModelRegistry {
    let mut reg = ModelRegistry::new();
    reg.add_model(
        ModelMeta::new("app.SimpleModel").with_field(FieldDescriptor::scalar("text", internal_types::TEXT)),
    )
    .add_model(
        ModelMeta::new("app.VariantModel")
            .with_field(FieldDescriptor::scalar("boolean", internal_types::BOOLEAN))
            .with_field(FieldDescriptor::scalar("null_boolean", internal_types::NULL_BOOLEAN))
            .with_field(FieldDescriptor::scalar("datetime", internal_types::DATE_TIME))
            .with_field(FieldDescriptor::scalar("file_field", internal_types::FILE))
            .with_field(
                FieldDescriptor::scalar("status", internal_types::INTEGER)
                    .with_choices([(Value::from(1), "Draft"), (Value::from(2), "Published")]),
            ),
    )
    .add_model(ModelMeta::new("zoo.Pet").with_field(FieldDescriptor::scalar("name", internal_types::CHAR)))
    .add_model(
        ModelMeta::new("zoo.Person")
            .with_field(FieldDescriptor::scalar("name", internal_types::CHAR))
            .with_field(FieldDescriptor::many_to_many("pets", "zoo.Pet")),
    )
    .add_model(
        ModelMeta::new("shop.Building").with_field(FieldDescriptor::scalar("address", internal_types::CHAR)),
    )
    .add_model(
        ModelMeta::new("shop.Factory")
            .with_field(FieldDescriptor::parent_link("building_ptr", "shop.Building"))
            .with_field(FieldDescriptor::scalar("name", internal_types::CHAR)),
    )
    .add_model(
        ModelMeta::new("shop.Car")
            .with_field(FieldDescriptor::scalar("name", internal_types::CHAR))
            .with_field(FieldDescriptor::foreign_key("manufacturer", "shop.Factory").with_related_name("cars"))
            .with_field(FieldDescriptor::many_to_many("supplier", "shop.Factory")),
    )
    .add_model(
        ModelMeta::new("shop.Worker")
            .with_field(FieldDescriptor::scalar("name", internal_types::CHAR))
            .with_field(FieldDescriptor::foreign_key("workplace", "shop.Building").with_related_name("workers")),
    )
    .register("app.SimpleModel", &[])
    .register("app.VariantModel", &[])
    .register("zoo.Pet", &[])
    .register("zoo.Person", &["pets"])
    .register("shop.Building", &[])
    .register("shop.Factory", &["building_ptr", "cars"])
    .register("shop.Car", &[])
    .register("shop.Worker", &[]);
    reg
}

/// Registry plus store, with a clock that advances one minute per revision
pub struct Fixture {
    pub registry: ModelRegistry,
    pub store: MemoryStore,
    clock: DateTime<Utc>,
}

#[allow(dead_code)]
impl Fixture {
    pub fn new() -> Self {
        Self {
            registry: registry(),
            store: MemoryStore::new(),
            clock: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        }
    }

    pub fn revision(&mut self, comment: &str) -> RevisionId {
        self.clock += Duration::minutes(1);
        self.store.create_revision(self.clock, Some("admin"), comment)
    }

    /// Save the live row of `object` and a snapshot of it into `revision`
    ///
    /// `fields` must be a JSON object.
    pub fn save(&mut self, revision: RevisionId, object: &ObjectRef, repr: &str, fields: Value) -> VersionId {
        self.store.save_live(object, repr);
        self.snapshot(revision, object, repr, fields)
    }

    /// Snapshot only, without touching the live row
    pub fn snapshot(&mut self, revision: RevisionId, object: &ObjectRef, repr: &str, fields: Value) -> VersionId {
        let dict: BTreeMap<String, Value> = match fields {
            Value::Object(map) => map.into_iter().collect(),
            other => panic!("fields must be a JSON object, got {}", other),
        };
        self.store.add_version(revision, object, repr, dict).unwrap()
    }

    pub fn version(&self, id: VersionId) -> Version {
        use revcompare_core::VersionStore;
        self.store.version(id).unwrap().expect("version exists")
    }

    pub fn engine(&self) -> CompareEngine<'_> {
        CompareEngine::new(&self.registry, &self.store, &self.store)
    }
}

#[allow(dead_code)]
pub fn obj(model: &str, id: &str) -> ObjectRef {
    ObjectRef::new(model, id)
}
