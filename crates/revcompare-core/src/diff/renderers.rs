//! Field renderer dispatch
//!
//! A changed field is rendered by the first renderer found in this order:
//!
//! 1. registered for the exact field name
//! 2. registered for the reverse relation marker (`ManyToOneRel`), for
//!    reverse relations only
//! 3. registered for the field's internal type tag
//! 4. the fallback (text diff of both display strings)

use chrono::DateTime;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::model::DiffPayload;
use super::text::TextDiffRenderer;
use crate::compare::FieldComparison;
use crate::log_degraded;
use crate::model::{display_value, internal_types, FieldValue, LiveObject};

const OP_RENDER: &str = "render_field";

/// Produces the diff payload of one changed field
pub trait FieldRenderer: Send + Sync {
    fn render(&self, comparison: &FieldComparison<'_>, text_diff: &dyn TextDiffRenderer) -> DiffPayload;
}

impl<F> FieldRenderer for F
where
    F: Fn(&FieldComparison<'_>, &dyn TextDiffRenderer) -> DiffPayload + Send + Sync,
{
    fn render(&self, comparison: &FieldComparison<'_>, text_diff: &dyn TextDiffRenderer) -> DiffPayload {
        self(comparison, text_diff)
    }
}

/// Priority-ordered override table
#[derive(Clone)]
pub struct RendererTable {
    by_name: BTreeMap<String, Arc<dyn FieldRenderer>>,
    by_type: BTreeMap<String, Arc<dyn FieldRenderer>>,
    fallback: Arc<dyn FieldRenderer>,
}

impl Default for RendererTable {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl RendererTable {
    /// Table with only the text diff fallback
    pub fn empty() -> Self {
        Self {
            by_name: BTreeMap::new(),
            by_type: BTreeMap::new(),
            fallback: Arc::new(fallback_compare),
        }
    }

    /// Table with the prepared renderers for relations, booleans,
    /// timestamps and files
    pub fn with_defaults() -> Self {
        Self::empty()
            .with_type(internal_types::FOREIGN_KEY, compare_foreign_key)
            .with_type(internal_types::MANY_TO_MANY, compare_relation)
            .with_type(internal_types::MANY_TO_ONE_REL, compare_relation)
            .with_type(internal_types::BOOLEAN, compare_boolean)
            .with_type(internal_types::NULL_BOOLEAN, compare_boolean)
            .with_type(internal_types::DATE_TIME, compare_date_time)
            .with_type(internal_types::FILE, compare_file)
    }

    pub fn with_field(mut self, name: impl Into<String>, renderer: impl FieldRenderer + 'static) -> Self {
        self.by_name.insert(name.into(), Arc::new(renderer));
        self
    }

    pub fn with_type(
        mut self,
        internal_type: impl Into<String>,
        renderer: impl FieldRenderer + 'static,
    ) -> Self {
        self.by_type.insert(internal_type.into(), Arc::new(renderer));
        self
    }

    pub fn with_fallback(mut self, renderer: impl FieldRenderer + 'static) -> Self {
        self.fallback = Arc::new(renderer);
        self
    }

    /// Renderer responsible for one field
    pub fn lookup(&self, comparison: &FieldComparison<'_>) -> &dyn FieldRenderer {
        if let Some(renderer) = self.by_name.get(comparison.field_name()) {
            return renderer.as_ref();
        }
        if comparison.is_reversed() {
            if let Some(renderer) = self.by_type.get(internal_types::MANY_TO_ONE_REL) {
                return renderer.as_ref();
            }
        }
        if let Some(renderer) = self.by_type.get(&comparison.field().internal_type) {
            return renderer.as_ref();
        }
        self.fallback.as_ref()
    }

    pub fn render(&self, comparison: &FieldComparison<'_>, text_diff: &dyn TextDiffRenderer) -> DiffPayload {
        self.lookup(comparison).render(comparison, text_diff)
    }
}

/// Text diff of both display strings
pub fn fallback_compare(comparison: &FieldComparison<'_>, text_diff: &dyn TextDiffRenderer) -> DiffPayload {
    let (old, new) = comparison.to_strings();
    DiffPayload::Text(text_diff.render(&old, &new))
}

/// Added / removed when one side is empty, text diff otherwise
pub fn generic_add_remove(
    present1: bool,
    present2: bool,
    value1: String,
    value2: String,
    text_diff: &dyn TextDiffRenderer,
) -> DiffPayload {
    match (present1, present2) {
        (false, true) => DiffPayload::Added(value2),
        (true, false) => DiffPayload::Removed(value1),
        _ => DiffPayload::Text(text_diff.render(&value1, &value2)),
    }
}

/// Foreign key: display of the related live objects, or of the stored ids
/// when relations are compared by id
pub fn compare_foreign_key(comparison: &FieldComparison<'_>, text_diff: &dyn TextDiffRenderer) -> DiffPayload {
    if comparison.context().config.compare_foreign_objects_as_id {
        return generic_add_remove(
            !comparison.value1().is_empty(),
            !comparison.value2().is_empty(),
            comparison.side1().scalar_display(),
            comparison.side2().scalar_display(),
            text_diff,
        );
    }
    let (related1, related2) = comparison.related();
    let display = |obj: &Option<LiveObject>| {
        obj.as_ref()
            .map(|o| o.display.clone())
            .unwrap_or_else(|| "None".to_string())
    };
    generic_add_remove(
        related1.is_some(),
        related2.is_some(),
        display(&related1),
        display(&related2),
        text_diff,
    )
}

/// Many-to-many and reverse relations: the classified buckets
pub fn compare_relation(comparison: &FieldComparison<'_>, _text_diff: &dyn TextDiffRenderer) -> DiffPayload {
    DiffPayload::Relation(comparison.relation_change().clone())
}

/// Many-to-many as a comma separated text diff
pub fn simple_many_to_many(comparison: &FieldComparison<'_>, text_diff: &dyn TextDiffRenderer) -> DiffPayload {
    let change = comparison.relation_change();
    let old = change.old_displays().join(", ");
    let new = change.new_displays().join(", ");
    DiffPayload::Text(text_diff.render(&old, &new))
}

/// File fields: stored path, empty values count as absent
pub fn compare_file(comparison: &FieldComparison<'_>, text_diff: &dyn TextDiffRenderer) -> DiffPayload {
    let path = |value: &FieldValue| match value.as_value() {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    };
    let (path1, path2) = (path(comparison.value1()), path(comparison.value2()));
    generic_add_remove(
        path1.is_some(),
        path2.is_some(),
        path1.unwrap_or_else(|| "None".to_string()),
        path2.unwrap_or_else(|| "None".to_string()),
        text_diff,
    )
}

/// Booleans side by side; other stored types fall back to a text diff
pub fn compare_boolean(comparison: &FieldComparison<'_>, text_diff: &dyn TextDiffRenderer) -> DiffPayload {
    typed_values(comparison, text_diff, "stored value is not a boolean", |raw| match raw {
        Value::Bool(_) | Value::Null => Some(display_value(raw)),
        _ => None,
    })
}

/// Timestamps side by side in ISO format; unparseable values fall back to a
/// text diff
pub fn compare_date_time(comparison: &FieldComparison<'_>, text_diff: &dyn TextDiffRenderer) -> DiffPayload {
    typed_values(comparison, text_diff, "stored value is not an ISO timestamp", |raw| match raw {
        Value::Null => Some(display_value(raw)),
        Value::String(s) => DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.to_rfc3339()),
        _ => None,
    })
}

fn typed_values<F>(
    comparison: &FieldComparison<'_>,
    text_diff: &dyn TextDiffRenderer,
    reason: &str,
    interpret: F,
) -> DiffPayload
where
    F: Fn(&Value) -> Option<String>,
{
    let side = |value: &FieldValue| match value {
        FieldValue::Missing => Some(value.display()),
        FieldValue::Value(raw) => interpret(raw),
    };
    match (side(comparison.value1()), side(comparison.value2())) {
        (Some(old), Some(new)) => DiffPayload::Values { old, new },
        _ => {
            log_degraded!(
                OP_RENDER,
                comparison.field_name(),
                reason,
                value1 = %comparison.value1().display(),
                value2 = %comparison.value2().display()
            );
            fallback_compare(comparison, text_diff)
        }
    }
}
