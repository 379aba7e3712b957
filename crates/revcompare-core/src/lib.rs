//! RevCompare Core - field-level comparison of object snapshots
//!
//! Compares two stored snapshots of one object and reports, per field, what
//! changed. Relations are resolved against the snapshots stored in the same
//! revision, with a fallback to live data for related objects that were
//! never captured. This crate provides:
//! - Snapshot, revision and model metadata types
//! - Store traits plus an in-memory store
//! - The snapshot value resolver and the relation reconciler
//! - Field comparison and the object comparison orchestrator
//! - Pluggable field renderers and a line-level text diff
//! - History listing, neighbour navigation and raw payload inspection

pub mod compare;
pub mod config;
pub mod diff;
pub mod errors;
pub mod history;
pub mod logging_facility;
pub mod model;
pub mod raw;
pub mod store;

// Re-export commonly used types
pub use compare::{CompareContext, CompareEngine, FieldComparison, RelationChange};
pub use config::CompareConfig;
pub use diff::{CompareResult, DiffEntry, DiffPayload, LineDiffRenderer, RendererTable, TextDiffRenderer};
pub use errors::{CompareError, ExError, ExErrorKind, Result};
pub use model::{FieldDescriptor, ModelMeta, ModelRegistry, ObjectRef, Revision, RevisionId, Version, VersionId};
pub use store::{MemoryStore, RelatedObjectStore, VersionStore};
