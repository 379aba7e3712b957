//! Model metadata and version-control registration

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::field::{FieldDescriptor, FieldKind};
use super::value::PkType;
use crate::errors::{CompareError, Result};

/// Declared fields of one model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMeta {
    pub name: String,
    pub pk_type: PkType,
    /// Direct fields (scalars and foreign keys), in declaration order
    pub fields: Vec<FieldDescriptor>,
    pub many_to_many: Vec<FieldDescriptor>,
}

impl ModelMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pk_type: PkType::Integer,
            fields: Vec::new(),
            many_to_many: Vec::new(),
        }
    }

    pub fn with_pk_type(mut self, pk_type: PkType) -> Self {
        self.pk_type = pk_type;
        self
    }

    /// Add a field; many-to-many fields go to their own list
    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        if field.is_many_to_many() {
            self.many_to_many.push(field);
        } else {
            self.fields.push(field);
        }
        self
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields
            .iter()
            .chain(self.many_to_many.iter())
            .find(|f| f.name == name)
    }

    /// The multi-table inheritance pointer, if this model has a parent table
    pub fn parent_link(&self) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.is_parent_link())
    }
}

/// Version-control registration of one model
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    /// Relation names whose targets are saved alongside this model
    pub follow: BTreeSet<String>,
}

/// Field metadata surface consumed by the engine
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: BTreeMap<String, ModelMeta>,
    registrations: BTreeMap<String, Registration>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_model(&mut self, meta: ModelMeta) -> &mut Self {
        self.models.insert(meta.name.clone(), meta);
        self
    }

    /// Put a model under version control, following the named relations
    pub fn register(&mut self, model: &str, follow: &[&str]) -> &mut Self {
        self.registrations.insert(
            model.to_string(),
            Registration {
                follow: follow.iter().map(|s| s.to_string()).collect(),
            },
        );
        self
    }

    pub fn unregister(&mut self, model: &str) -> &mut Self {
        self.registrations.remove(model);
        self
    }

    pub fn model(&self, name: &str) -> Option<&ModelMeta> {
        self.models.get(name)
    }

    /// Look up a model, failing for unknown names
    ///
    /// # Errors
    ///
    /// Returns `UnknownModel` if the model was never added.
    pub fn require_model(&self, name: &str) -> Result<&ModelMeta> {
        self.models.get(name).ok_or_else(|| CompareError::UnknownModel {
            model: name.to_string(),
        })
    }

    pub fn is_registered(&self, model: &str) -> bool {
        self.registrations.contains_key(model)
    }

    pub fn registration(&self, model: &str) -> Option<&Registration> {
        self.registrations.get(model)
    }

    /// Whether `field` of `model` is configured as followed
    pub fn follows(&self, model: &str, field: &str) -> bool {
        self.registrations
            .get(model)
            .is_some_and(|r| r.follow.contains(field))
    }

    pub fn pk_type(&self, model: &str) -> PkType {
        self.models
            .get(model)
            .map(|m| m.pk_type)
            .unwrap_or_default()
    }

    /// Parent models reached through multi-table inheritance pointers,
    /// nearest first
    pub fn ancestors(&self, model: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut current = model.to_string();
        while let Some(parent) = self
            .models
            .get(&current)
            .and_then(|m| m.parent_link())
            .and_then(|f| f.related_model())
        {
            if parent == model || out.iter().any(|p| p == parent) {
                break;
            }
            out.push(parent.to_string());
            current = parent.to_string();
        }
        out
    }

    pub fn is_multi_table(&self, model: &str) -> bool {
        self.models
            .get(model)
            .is_some_and(|m| m.parent_link().is_some())
    }

    /// Reverse foreign-key pseudo fields of `model`
    ///
    /// Scans every known model for foreign keys with a reverse accessor
    /// that point at `model` or one of its parent tables. Parent links are
    /// skipped: a child row pointing at its parent is not a relation of the
    /// parent. Ordered by accessor name.
    pub fn reverse_fields(&self, model: &str) -> Vec<FieldDescriptor> {
        let mut targets: BTreeSet<String> = self.ancestors(model).into_iter().collect();
        targets.insert(model.to_string());

        let mut found: BTreeMap<String, FieldDescriptor> = BTreeMap::new();
        for meta in self.models.values() {
            for field in &meta.fields {
                if let FieldKind::ForeignKey {
                    related_model,
                    related_name: Some(accessor),
                    one_to_one,
                    parent_link: false,
                } = &field.kind
                {
                    if targets.contains(related_model) && !found.contains_key(accessor) {
                        found.insert(
                            accessor.clone(),
                            FieldDescriptor::reverse(
                                accessor.clone(),
                                meta.name.clone(),
                                field.name.clone(),
                                *one_to_one,
                            ),
                        );
                    }
                }
            }
        }
        found.into_values().collect()
    }

    /// All fields compared for `model`: direct fields, then many-to-many,
    /// then reverse relations not already declared directly
    ///
    /// # Errors
    ///
    /// Returns `UnknownModel` if the model was never added.
    pub fn comparable_fields(&self, model: &str) -> Result<Vec<FieldDescriptor>> {
        let meta = self.require_model(model)?;
        let mut fields: Vec<FieldDescriptor> = meta
            .fields
            .iter()
            .chain(meta.many_to_many.iter())
            .cloned()
            .collect();
        for reverse in self.reverse_fields(model) {
            if !fields.iter().any(|f| f.name == reverse.name) {
                fields.push(reverse);
            }
        }
        Ok(fields)
    }
}
