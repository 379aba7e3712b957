//! Human-readable summary of a comparison result.

use crate::compare::RelationChange;
use crate::diff::model::{CompareResult, DiffPayload};
use crate::model::{RelatedItem, Version};

/// Render a Markdown summary of a [`CompareResult`].
///
/// Informational only; the structured result is authoritative.
pub fn render_summary(result: &CompareResult) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "## Changes between version {} and version {}\n\n",
        result.version1_id, result.version2_id
    ));

    if result.entries.is_empty() {
        out.push_str("_There are no differences._\n");
    }

    for entry in &result.entries {
        out.push_str(&format!("### {}\n\n", entry.field));
        match &entry.diff {
            DiffPayload::Text(html) | DiffPayload::Custom(html) => {
                out.push_str(html);
                out.push_str("\n\n");
            }
            DiffPayload::Added(value) => out.push_str(&format!("- **Added**: {}\n\n", value)),
            DiffPayload::Removed(value) => out.push_str(&format!("- **Removed**: {}\n\n", value)),
            DiffPayload::Values { old, new } => {
                out.push_str(&format!("- `{}` → `{}`\n\n", old, new));
            }
            DiffPayload::Relation(change) => {
                relation_lines(&mut out, change);
                out.push('\n');
            }
        }
    }

    if result.has_unfollowed_fields {
        out.push_str(
            "_Note: related objects of some relations are not followed; \
             their own history may be incomplete._\n",
        );
    }

    out
}

fn relation_lines(out: &mut String, change: &RelationChange) {
    for (old, new) in &change.changed_items {
        out.push_str(&format!("- **Changed**: {} → {}\n", old.object_repr, new.object_repr));
    }
    push_versions(out, "Removed", &change.removed_items);
    push_versions(out, "Deleted", &change.deleted_items);
    push_versions(out, "Added", &change.added_items);
    push_versions(out, "Unchanged", &change.same_items);
    push_items(out, "Removed (no history)", &change.removed_missing_objects);
    push_items(out, "Added (no history)", &change.added_missing_objects);
    push_items(out, "Unchanged (no history)", &change.same_missing_objects);
}

fn push_versions(out: &mut String, label: &str, items: &[Version]) {
    if items.is_empty() {
        return;
    }
    let names: Vec<&str> = items.iter().map(|v| v.object_repr.as_str()).collect();
    out.push_str(&format!("- **{}**: {}\n", label, names.join(", ")));
}

fn push_items(out: &mut String, label: &str, items: &[RelatedItem]) {
    if items.is_empty() {
        return;
    }
    let names: Vec<&str> = items.iter().map(RelatedItem::display).collect();
    out.push_str(&format!("- **{}**: {}\n", label, names.join(", ")));
}
