//! Field metadata
//!
//! A [`FieldDescriptor`] is resolved once when a model is registered. The
//! comparison engine dispatches on [`FieldKind`] and never inspects field
//! shapes ad hoc.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Internal type tags used by the renderer dispatch table
pub mod internal_types {
    pub const CHAR: &str = "CharField";
    pub const TEXT: &str = "TextField";
    pub const INTEGER: &str = "IntegerField";
    pub const BOOLEAN: &str = "BooleanField";
    pub const NULL_BOOLEAN: &str = "NullBooleanField";
    pub const DATE_TIME: &str = "DateTimeField";
    pub const FILE: &str = "FileField";
    pub const FOREIGN_KEY: &str = "ForeignKey";
    pub const ONE_TO_ONE: &str = "OneToOneField";
    pub const MANY_TO_MANY: &str = "ManyToManyField";
    /// Marker of synthesized reverse foreign-key fields
    pub const MANY_TO_ONE_REL: &str = "ManyToOneRel";
    pub const ONE_TO_ONE_REL: &str = "OneToOneRel";
}

/// Kind of a field, with the relation details needed by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum FieldKind {
    Scalar,
    ForeignKey {
        related_model: String,
        /// Accessor name on the related model for the reverse direction
        related_name: Option<String>,
        one_to_one: bool,
        /// Multi-table inheritance pointer to the parent model's row
        parent_link: bool,
    },
    ManyToMany {
        related_model: String,
    },
    /// Synthesized from another model's foreign key pointing at this model
    ReverseForeignKey {
        /// Model that declares the foreign key
        related_model: String,
        /// Reverse accessor name (also the field name)
        accessor: String,
        /// Name of the foreign key field on `related_model`
        remote_field: String,
        one_to_one: bool,
    },
}

/// One entry of a field's choice table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub value: Value,
    pub label: String,
}

/// Metadata about one attribute of a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    /// Key under which the raw value is stored (`<name>_id` for foreign keys)
    pub attname: String,
    pub internal_type: String,
    pub kind: FieldKind,
    pub choices: Vec<Choice>,
}

impl FieldDescriptor {
    /// A plain value field
    pub fn scalar(name: impl Into<String>, internal_type: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            attname: name.clone(),
            name,
            internal_type: internal_type.into(),
            kind: FieldKind::Scalar,
            choices: Vec::new(),
        }
    }

    pub fn foreign_key(name: impl Into<String>, related_model: impl Into<String>) -> Self {
        Self::relation_key(name.into(), related_model.into(), false, false)
    }

    pub fn one_to_one(name: impl Into<String>, related_model: impl Into<String>) -> Self {
        Self::relation_key(name.into(), related_model.into(), true, false)
    }

    /// Multi-table inheritance pointer (e.g. `building_ptr` on a child model)
    pub fn parent_link(name: impl Into<String>, parent_model: impl Into<String>) -> Self {
        Self::relation_key(name.into(), parent_model.into(), true, true)
    }

    fn relation_key(name: String, related_model: String, one_to_one: bool, parent_link: bool) -> Self {
        Self {
            attname: format!("{}_id", name),
            name,
            internal_type: if one_to_one {
                internal_types::ONE_TO_ONE
            } else {
                internal_types::FOREIGN_KEY
            }
            .to_string(),
            kind: FieldKind::ForeignKey {
                related_model,
                related_name: None,
                one_to_one,
                parent_link,
            },
            choices: Vec::new(),
        }
    }

    pub fn many_to_many(name: impl Into<String>, related_model: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            attname: name.clone(),
            name,
            internal_type: internal_types::MANY_TO_MANY.to_string(),
            kind: FieldKind::ManyToMany {
                related_model: related_model.into(),
            },
            choices: Vec::new(),
        }
    }

    /// Pseudo field for the reverse side of `related_model.remote_field`
    pub fn reverse(
        accessor: impl Into<String>,
        related_model: impl Into<String>,
        remote_field: impl Into<String>,
        one_to_one: bool,
    ) -> Self {
        let accessor = accessor.into();
        Self {
            name: accessor.clone(),
            attname: accessor.clone(),
            internal_type: if one_to_one {
                internal_types::ONE_TO_ONE_REL
            } else {
                internal_types::MANY_TO_ONE_REL
            }
            .to_string(),
            kind: FieldKind::ReverseForeignKey {
                related_model: related_model.into(),
                accessor,
                remote_field: remote_field.into(),
                one_to_one,
            },
            choices: Vec::new(),
        }
    }

    /// Set the reverse accessor name of a foreign key
    pub fn with_related_name(mut self, name: impl Into<String>) -> Self {
        if let FieldKind::ForeignKey { related_name, .. } = &mut self.kind {
            *related_name = Some(name.into());
        }
        self
    }

    /// Attach a choice table (`(stored value, label)` pairs)
    pub fn with_choices<I, V, L>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = (V, L)>,
        V: Into<Value>,
        L: Into<String>,
    {
        self.choices = choices
            .into_iter()
            .map(|(value, label)| Choice {
                value: value.into(),
                label: label.into(),
            })
            .collect();
        self
    }

    /// True for foreign keys, many-to-many and reverse relations
    pub fn is_relational(&self) -> bool {
        !matches!(self.kind, FieldKind::Scalar)
    }

    pub fn is_reverse(&self) -> bool {
        matches!(self.kind, FieldKind::ReverseForeignKey { .. })
    }

    pub fn is_many_to_many(&self) -> bool {
        matches!(self.kind, FieldKind::ManyToMany { .. })
    }

    /// True for non-one-to-one foreign keys
    pub fn is_foreign_key(&self) -> bool {
        matches!(
            self.kind,
            FieldKind::ForeignKey {
                one_to_one: false,
                ..
            }
        )
    }

    pub fn is_parent_link(&self) -> bool {
        matches!(
            self.kind,
            FieldKind::ForeignKey {
                parent_link: true,
                ..
            }
        )
    }

    pub fn related_model(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::Scalar => None,
            FieldKind::ForeignKey { related_model, .. }
            | FieldKind::ManyToMany { related_model }
            | FieldKind::ReverseForeignKey { related_model, .. } => Some(related_model),
        }
    }

    /// Label of a stored value in the choice table
    pub fn choice_label(&self, value: &Value) -> Option<&str> {
        self.choices
            .iter()
            .find(|c| &c.value == value)
            .map(|c| c.label.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_foreign_key_attname() {
        let fk = FieldDescriptor::foreign_key("manufacturer", "shop.Factory").with_related_name("cars");
        assert_eq!(fk.attname, "manufacturer_id");
        assert_eq!(fk.internal_type, internal_types::FOREIGN_KEY);
        assert!(fk.is_relational());
        assert!(fk.is_foreign_key());
        assert_eq!(fk.related_model(), Some("shop.Factory"));
        assert!(matches!(
            fk.kind,
            FieldKind::ForeignKey { related_name: Some(ref n), .. } if n == "cars"
        ));
    }

    #[test]
    fn test_parent_link_is_one_to_one() {
        let ptr = FieldDescriptor::parent_link("building_ptr", "shop.Building");
        assert!(ptr.is_parent_link());
        assert!(!ptr.is_foreign_key());
        assert_eq!(ptr.internal_type, internal_types::ONE_TO_ONE);
    }

    #[test]
    fn test_reverse_descriptor() {
        let rev = FieldDescriptor::reverse("cars", "shop.Car", "manufacturer", false);
        assert!(rev.is_reverse());
        assert_eq!(rev.name, "cars");
        assert_eq!(rev.internal_type, internal_types::MANY_TO_ONE_REL);
        assert_eq!(rev.related_model(), Some("shop.Car"));
    }

    #[test]
    fn test_choice_label() {
        let f = FieldDescriptor::scalar("grade", internal_types::CHAR)
            .with_choices([("a", "alpha"), ("b", "bravo")]);
        assert_eq!(f.choice_label(&json!("a")), Some("alpha"));
        assert_eq!(f.choice_label(&json!("z")), None);
        assert!(!f.is_relational());
    }
}
