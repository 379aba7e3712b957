//! Per-field comparison of two snapshots

use std::cell::OnceCell;

use super::reconcile::{reconcile, RelationChange};
use super::resolver::SnapshotValue;
use super::CompareContext;
use crate::model::{internal_types, FieldDescriptor, FieldKind, FieldValue, LiveObject, ObjectRef, Version};

/// One field of an object, compared between an older and a newer snapshot
///
/// The relation reconciliation is computed at most once per instance, however
/// often `changed()` and `relation_change()` are asked.
pub struct FieldComparison<'a> {
    ctx: &'a CompareContext<'a>,
    field: &'a FieldDescriptor,
    object: &'a ObjectRef,
    side1: SnapshotValue<'a>,
    side2: SnapshotValue<'a>,
    follow: Option<bool>,
    relation: OnceCell<RelationChange>,
}

impl<'a> FieldComparison<'a> {
    pub fn new(
        ctx: &'a CompareContext<'a>,
        field: &'a FieldDescriptor,
        object: &'a ObjectRef,
        version1: &'a Version,
        version2: &'a Version,
    ) -> Self {
        let follow = if field.is_relational() {
            Some(ctx.registry.follows(&object.model, &field.name))
        } else {
            None
        };
        Self {
            ctx,
            field,
            object,
            side1: SnapshotValue::new(ctx, field, version1, follow),
            side2: SnapshotValue::new(ctx, field, version2, follow),
            follow,
            relation: OnceCell::new(),
        }
    }

    pub fn field(&self) -> &'a FieldDescriptor {
        self.field
    }

    pub fn field_name(&self) -> &'a str {
        &self.field.name
    }

    pub fn object(&self) -> &'a ObjectRef {
        self.object
    }

    pub fn context(&self) -> &'a CompareContext<'a> {
        self.ctx
    }

    /// Foreign key, many-to-many or reverse relation
    pub fn is_related(&self) -> bool {
        self.field.is_relational()
    }

    pub fn is_reversed(&self) -> bool {
        self.field.is_reverse()
    }

    /// `None` for scalars, otherwise whether the relation is followed
    pub fn follow(&self) -> Option<bool> {
        self.follow
    }

    pub fn value1(&self) -> &FieldValue {
        self.side1.value()
    }

    pub fn value2(&self) -> &FieldValue {
        self.side2.value()
    }

    pub fn side1(&self) -> &SnapshotValue<'a> {
        &self.side1
    }

    pub fn side2(&self) -> &SnapshotValue<'a> {
        &self.side2
    }

    fn is_collection(&self) -> bool {
        matches!(
            self.field.kind,
            FieldKind::ManyToMany { .. } | FieldKind::ReverseForeignKey { .. }
        )
    }

    /// Reconciled buckets of a many-to-many or reverse relation
    ///
    /// Empty for other fields.
    pub fn relation_change(&self) -> &RelationChange {
        self.relation.get_or_init(|| {
            if !self.is_collection() {
                return RelationChange::default();
            }
            reconcile(&self.side1.related_side(), &self.side2.related_side())
        })
    }

    /// True if the field differs between the two snapshots
    pub fn changed(&self) -> bool {
        if self.is_collection() {
            return self.relation_change().is_changed();
        }
        if self.value1() != self.value2() {
            return true;
        }
        // Same stored id, but a followed relation may carry captured
        // content that differs between the two revisions.
        !self.ctx.config.compare_foreign_objects_as_id
            && self.field.internal_type == internal_types::FOREIGN_KEY
            && self.follow == Some(true)
            && self.side1.field_dict() != self.side2.field_dict()
    }

    /// Display texts of both sides
    pub fn to_strings(&self) -> (String, String) {
        if self.is_collection() {
            let change = self.relation_change();
            return (change.old_displays().join(", "), change.new_displays().join(", "));
        }
        (self.side1.to_display(), self.side2.to_display())
    }

    /// Live foreign key targets of both sides
    pub fn related(&self) -> (Option<LiveObject>, Option<LiveObject>) {
        (self.side1.related(), self.side2.related())
    }

    /// Diagnostic lines: shared lines first, then those unique to each side
    pub fn debug_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("object.............: {}", self.object),
            format!("changed............: {}", self.changed()),
            format!("follow.............: {:?}", self.follow),
        ];
        let debug1 = self.side1.debug_lines();
        let debug2 = self.side2.debug_lines();
        lines.push("same in both:".to_string());
        lines.extend(debug1.iter().filter(|l| debug2.contains(l)).cloned());
        lines.push("only in version 1:".to_string());
        lines.extend(debug1.iter().filter(|l| !debug2.contains(l)).cloned());
        lines.push("only in version 2:".to_string());
        lines.extend(debug2.iter().filter(|l| !debug1.contains(l)).cloned());
        lines
    }
}
