//! Version comparison engine
//!
//! Leaf to root:
//!
//! - [`resolver`]: reads one field out of one snapshot and resolves relations
//! - [`reconcile`]: classifies related objects of two snapshots into buckets
//! - [`field`]: decides whether one field changed
//! - [`engine`]: walks every field of a model and assembles the result
//!
//! All of it is read-only against the stores. Per-field failures are
//! recovered locally and logged; only caller-contract violations (unknown
//! versions, versions of another object, unknown models) surface as errors.

pub mod engine;
pub mod field;
pub mod reconcile;
pub mod resolver;

pub use engine::CompareEngine;
pub use field::FieldComparison;
pub use reconcile::{reconcile, RelatedSide, RelationChange};
pub use resolver::SnapshotValue;

use crate::config::CompareConfig;
use crate::model::ModelRegistry;
use crate::store::{RelatedObjectStore, VersionStore};

/// Collaborators shared by every field of one comparison
#[derive(Clone, Copy)]
pub struct CompareContext<'a> {
    pub registry: &'a ModelRegistry,
    pub versions: &'a dyn VersionStore,
    pub related: &'a dyn RelatedObjectStore,
    pub config: CompareConfig,
}

impl<'a> CompareContext<'a> {
    pub fn new(
        registry: &'a ModelRegistry,
        versions: &'a dyn VersionStore,
        related: &'a dyn RelatedObjectStore,
        config: CompareConfig,
    ) -> Self {
        Self {
            registry,
            versions,
            related,
            config,
        }
    }
}
