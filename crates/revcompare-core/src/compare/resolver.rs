//! Snapshot value resolution
//!
//! Reads one field from one snapshot and resolves relational values against
//! the stores. Nothing here fails: unresolvable relations become `None` or an
//! empty set, and the reason is logged as a degraded event.

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use super::reconcile::{collect_related, RelatedSide};
use super::CompareContext;
use crate::errors::Result;
use crate::log_degraded;
use crate::model::{coerce_pk, FieldDescriptor, FieldKind, FieldValue, LiveObject, Version};

const OP_RELATED: &str = "resolve_related";
const OP_MANY_TO_MANY: &str = "resolve_many_to_many";
const OP_REVERSE: &str = "resolve_reverse";

/// One field of one snapshot
pub struct SnapshotValue<'a> {
    ctx: &'a CompareContext<'a>,
    field: &'a FieldDescriptor,
    version: &'a Version,
    follow: Option<bool>,
    value: FieldValue,
}

impl<'a> SnapshotValue<'a> {
    pub fn new(
        ctx: &'a CompareContext<'a>,
        field: &'a FieldDescriptor,
        version: &'a Version,
        follow: Option<bool>,
    ) -> Self {
        let dict = &version.field_dict;
        let value = if ctx.config.compare_foreign_objects_as_id {
            FieldValue::lookup(dict, &field.attname, &field.name)
        } else {
            FieldValue::lookup(dict, &field.name, &field.attname)
        };
        Self {
            ctx,
            field,
            version,
            follow,
            value,
        }
    }

    /// Stored value, `Missing` when the snapshot predates the field
    pub fn value(&self) -> &FieldValue {
        &self.value
    }

    pub fn version(&self) -> &'a Version {
        self.version
    }

    pub fn field_dict(&self) -> &'a BTreeMap<String, Value> {
        &self.version.field_dict
    }

    /// Live target of a foreign key
    ///
    /// The id stored in the snapshot is looked up in the live table. When the
    /// snapshot has no value for the field, the live row of the object is
    /// followed instead.
    pub fn related(&self) -> Option<LiveObject> {
        let FieldKind::ForeignKey { related_model, .. } = &self.field.kind else {
            return None;
        };
        let lookup = match &self.value {
            FieldValue::Value(Value::Null) => return None,
            FieldValue::Value(raw) => {
                let Some(id) = coerce_pk(raw, self.ctx.registry.pk_type(related_model)) else {
                    log_degraded!(
                        OP_RELATED,
                        self.field.name.as_str(),
                        "stored foreign key is not an identifier",
                        value = %raw
                    );
                    return None;
                };
                let ids = BTreeSet::from([id.clone()]);
                self.ctx
                    .related
                    .get_live(related_model, &ids)
                    .map(|mut found| found.remove(&id))
            }
            FieldValue::Missing => self
                .ctx
                .related
                .follow_foreign_key(&self.version.object_ref(), &self.field.name),
        };
        lookup.unwrap_or_else(|err| {
            log_degraded!(
                OP_RELATED,
                self.field.name.as_str(),
                "related lookup failed",
                error = %err
            );
            None
        })
    }

    /// Target ids of a many-to-many field, coerced to the related key type
    pub fn many_to_many_ids(&self) -> BTreeSet<String> {
        let FieldKind::ManyToMany { related_model } = &self.field.kind else {
            return BTreeSet::new();
        };
        let items = match &self.value {
            FieldValue::Missing | FieldValue::Value(Value::Null) => return BTreeSet::new(),
            FieldValue::Value(Value::Array(items)) => items,
            FieldValue::Value(other) => {
                log_degraded!(
                    OP_MANY_TO_MANY,
                    self.field.name.as_str(),
                    "many-to-many value is not a list",
                    value = %other
                );
                return BTreeSet::new();
            }
        };
        let pk_type = self.ctx.registry.pk_type(related_model);
        items
            .iter()
            .filter_map(|item| {
                let id = coerce_pk(item, pk_type);
                if id.is_none() {
                    log_degraded!(
                        OP_MANY_TO_MANY,
                        self.field.name.as_str(),
                        "many-to-many item is not an identifier",
                        value = %item
                    );
                }
                id
            })
            .collect()
    }

    /// Ids of live rows pointing at this object through a reverse accessor
    ///
    /// For a child model of a multi-table hierarchy the accessor may live on
    /// the parent row; when the child yields nothing, parent snapshots saved
    /// in the same revision are asked instead.
    pub fn reverse_ids(&self) -> BTreeSet<String> {
        let FieldKind::ReverseForeignKey { accessor, .. } = &self.field.kind else {
            return BTreeSet::new();
        };
        let object = self.version.object_ref();
        let ids = match self.ctx.related.reverse_ids(&object, accessor) {
            Ok(ids) => ids,
            Err(err) => {
                log_degraded!(OP_REVERSE, accessor.as_str(), "reverse lookup failed", error = %err);
                return BTreeSet::new();
            }
        };
        if !ids.is_empty() || !self.ctx.registry.is_multi_table(&object.model) {
            return ids;
        }
        self.parent_table_reverse_ids(accessor).unwrap_or_else(|err| {
            log_degraded!(
                OP_REVERSE,
                accessor.as_str(),
                "parent table reverse lookup failed",
                error = %err
            );
            BTreeSet::new()
        })
    }

    fn parent_table_reverse_ids(&self, accessor: &str) -> Result<BTreeSet<String>> {
        for sibling in self.ctx.versions.revision_versions(self.version.revision_id)? {
            if sibling.object_id != self.version.object_id || sibling.model == self.version.model {
                continue;
            }
            let exposes = self
                .ctx
                .registry
                .reverse_fields(&sibling.model)
                .iter()
                .any(|f| f.name == accessor);
            if !exposes {
                continue;
            }
            let ids = self.ctx.related.reverse_ids(&sibling.object_ref(), accessor)?;
            if !ids.is_empty() {
                return Ok(ids);
            }
        }
        Ok(BTreeSet::new())
    }

    /// Related snapshots, missing objects and deleted candidates of this side
    pub fn related_side(&self) -> RelatedSide {
        let (ids, is_reverse) = match &self.field.kind {
            FieldKind::ManyToMany { .. } => (self.many_to_many_ids(), false),
            FieldKind::ReverseForeignKey { .. } => (self.reverse_ids(), true),
            _ => return RelatedSide::default(),
        };
        let follow = self.follow == Some(true);
        collect_related(self.ctx, self.field, self.version, &ids, follow, is_reverse).unwrap_or_else(
            |err| {
                log_degraded!(
                    OP_RELATED,
                    self.field.name.as_str(),
                    "collecting related objects failed",
                    error = %err
                );
                RelatedSide::default()
            },
        )
    }

    /// Display text of the value
    pub fn to_display(&self) -> String {
        match &self.field.kind {
            FieldKind::ManyToMany { .. } | FieldKind::ReverseForeignKey { .. } => {
                self.related_side().displays().join(", ")
            }
            FieldKind::ForeignKey { .. } if !self.ctx.config.compare_foreign_objects_as_id => self
                .related()
                .map(|obj| obj.display)
                .unwrap_or_else(|| "None".to_string()),
            _ => self.scalar_display(),
        }
    }

    /// Display of the raw value, using the choice label when one matches
    pub fn scalar_display(&self) -> String {
        if let FieldValue::Value(raw) = &self.value {
            if let Some(label) = self.field.choice_label(raw) {
                return label.to_string();
            }
        }
        self.value.display()
    }

    /// Diagnostic dump of this side
    pub fn debug_lines(&self) -> Vec<String> {
        let dict = serde_json::to_string(&self.version.field_dict).unwrap_or_default();
        let mut lines = vec![
            format!("field..............: {}", self.field.name),
            format!("field internal type: {}", self.field.internal_type),
            format!("field_dict.........: {}", dict),
            format!(
                "version............: {} (revision {}, object {})",
                self.version.id,
                self.version.revision_id,
                self.version.object_ref()
            ),
            format!("value..............: {:?}", self.value),
            format!("to string..........: {}", self.to_display()),
        ];
        if matches!(self.field.kind, FieldKind::ForeignKey { .. }) {
            let related = self
                .related()
                .map(|obj| format!("{} ({}:{})", obj.display, obj.model, obj.pk))
                .unwrap_or_else(|| "None".to_string());
            lines.push(format!("related............: {}", related));
        }
        if self.field.is_many_to_many() || self.field.is_reverse() {
            let side = self.related_side();
            if side.is_empty() {
                lines.push("related objects....: (has no)".to_string());
            } else {
                let found: Vec<String> = side.found.values().map(|v| v.object_repr.clone()).collect();
                lines.push(format!("related objects....: {}", found.join(", ")));
                let missing: Vec<&str> = side.missing.values().map(|item| item.display()).collect();
                if missing.is_empty() {
                    lines.push("missing objects....: (has no)".to_string());
                } else {
                    lines.push(format!("missing objects....: {}", missing.join(", ")));
                }
            }
        }
        lines
    }
}
