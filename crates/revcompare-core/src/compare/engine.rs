//! Object comparison orchestrator
//!
//! ## Logging
//!
//! - `log_op_start!` at entry
//! - `log_op_end!` on success, with the number of changed fields
//! - `log_op_error!` on failure
//!
//! Every comparison runs inside a span carrying a fresh [`ComparisonId`].

use revcompare_core_types::ComparisonId;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use super::field::FieldComparison;
use super::reconcile::RelationChange;
use super::CompareContext;
use crate::config::CompareConfig;
use crate::diff::{CompareResult, DiffEntry, LineDiffRenderer, RendererTable, TextDiffRenderer};
use crate::errors::{CompareError, ExError, Result};
use crate::model::{ModelRegistry, ObjectRef, Version, VersionId};
use crate::store::{get_version_for_object, RelatedObjectStore, VersionStore};
use crate::{log_op_end, log_op_error, log_op_start};

const OP_COMPARE: &str = "compare";
const OP_COMPARE_IDS: &str = "compare_version_ids";

/// Compares two snapshots of one object field by field
pub struct CompareEngine<'a> {
    registry: &'a ModelRegistry,
    versions: &'a dyn VersionStore,
    related: &'a dyn RelatedObjectStore,
    config: CompareConfig,
    renderers: RendererTable,
    text_diff: Arc<dyn TextDiffRenderer>,
    compare_fields: Option<BTreeSet<String>>,
    compare_exclude: BTreeSet<String>,
}

impl<'a> CompareEngine<'a> {
    pub fn new(
        registry: &'a ModelRegistry,
        versions: &'a dyn VersionStore,
        related: &'a dyn RelatedObjectStore,
    ) -> Self {
        Self {
            registry,
            versions,
            related,
            config: CompareConfig::default(),
            renderers: RendererTable::with_defaults(),
            text_diff: Arc::new(LineDiffRenderer),
            compare_fields: None,
            compare_exclude: BTreeSet::new(),
        }
    }

    pub fn with_config(mut self, config: CompareConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_renderers(mut self, renderers: RendererTable) -> Self {
        self.renderers = renderers;
        self
    }

    pub fn with_text_diff(mut self, text_diff: Arc<dyn TextDiffRenderer>) -> Self {
        self.text_diff = text_diff;
        self
    }

    /// Only compare the named fields
    pub fn with_compare_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.compare_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Never compare the named fields
    pub fn with_compare_exclude<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.compare_exclude = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn config(&self) -> CompareConfig {
        self.config
    }

    pub fn context(&self) -> CompareContext<'a> {
        CompareContext::new(self.registry, self.versions, self.related, self.config)
    }

    fn selected(&self, field: &str) -> bool {
        let included = self
            .compare_fields
            .as_ref()
            .map_or(true, |fields| fields.contains(field));
        included && !self.compare_exclude.contains(field)
    }

    /// Compare `object` between two of its snapshots
    ///
    /// The snapshots may be given in either order; the one with the lower id
    /// is treated as the older. Only changed fields are returned.
    ///
    /// # Errors
    ///
    /// - `VersionObjectMismatch` if a snapshot belongs to another object
    /// - `UnknownModel` if the object's model is not in the registry
    pub fn compare(&self, object: &ObjectRef, version1: &Version, version2: &Version) -> Result<CompareResult> {
        let comparison_id = ComparisonId::new();
        let span = tracing::info_span!(
            "compare",
            comparison_id = %comparison_id,
            model = %object.model,
            object_id = %object.object_id
        );
        let _guard = span.enter();

        log_op_start!(OP_COMPARE, version1_id = version1.id.0, version2_id = version2.id.0);
        let start = Instant::now();

        let result = self.compare_impl(object, version1, version2).map_err(|e| {
            let ex_err = ExError::from(e.clone())
                .with_op(OP_COMPARE)
                .with_comparison_id(comparison_id.clone());
            log_op_error!(
                OP_COMPARE,
                ex_err,
                duration_ms = start.elapsed().as_millis() as u64
            );
            e
        })?;

        log_op_end!(
            OP_COMPARE,
            duration_ms = start.elapsed().as_millis() as u64,
            changed_fields = result.entries.len(),
            has_unfollowed_fields = result.has_unfollowed_fields
        );

        Ok(result)
    }

    fn compare_impl(&self, object: &ObjectRef, version1: &Version, version2: &Version) -> Result<CompareResult> {
        for version in [version1, version2] {
            if !version.describes(object) {
                return Err(CompareError::VersionObjectMismatch {
                    version_id: version.id.0,
                    expected: object.to_string(),
                    actual: version.object_ref().to_string(),
                });
            }
        }
        let (older, newer) = ordered(version1, version2);

        let ctx = self.context();
        let fields = self.registry.comparable_fields(&object.model)?;

        let mut entries = Vec::new();
        let mut has_unfollowed_fields = false;
        for field in fields.iter().filter(|f| self.selected(&f.name)) {
            let comparison = FieldComparison::new(&ctx, field, object, older, newer);
            if comparison.is_related() && comparison.follow() != Some(true) {
                has_unfollowed_fields = true;
            }
            if !comparison.changed() {
                continue;
            }
            if tracing::enabled!(tracing::Level::DEBUG) {
                for line in comparison.debug_lines() {
                    tracing::debug!(field = field.name.as_str(), "{}", line);
                }
            }
            let diff = self.renderers.render(&comparison, self.text_diff.as_ref());
            entries.push(DiffEntry {
                field: field.name.clone(),
                internal_type: field.internal_type.clone(),
                is_related: comparison.is_related(),
                is_reversed: comparison.is_reversed(),
                follow: comparison.follow(),
                diff,
            });
        }

        Ok(CompareResult {
            version1_id: older.id,
            version2_id: newer.id,
            entries,
            has_unfollowed_fields,
        })
    }

    /// Load two snapshots from the history of `object` and compare them
    ///
    /// # Errors
    ///
    /// - `VersionNotFound` if an id is unknown
    /// - `VersionObjectMismatch` if an id belongs to another object
    /// - `UnknownModel` if the object's model is not in the registry
    pub fn compare_version_ids(&self, object: &ObjectRef, id1: VersionId, id2: VersionId) -> Result<CompareResult> {
        let start = Instant::now();
        let loaded = get_version_for_object(self.versions, object, id1)
            .and_then(|v1| get_version_for_object(self.versions, object, id2).map(|v2| (v1, v2)));
        let (version1, version2) = loaded.map_err(|e| {
            log_op_error!(
                OP_COMPARE_IDS,
                ExError::from(e.clone()).with_op(OP_COMPARE_IDS),
                duration_ms = start.elapsed().as_millis() as u64,
                version1_id = id1.0,
                version2_id = id2.0
            );
            e
        })?;
        self.compare(object, &version1, &version2)
    }

    /// Reconciled buckets of one relation field, changed or not
    ///
    /// # Errors
    ///
    /// - `VersionObjectMismatch` if a snapshot belongs to another object
    /// - `UnknownModel` / `UnknownField` for unknown names
    pub fn relation_change(
        &self,
        object: &ObjectRef,
        version1: &Version,
        version2: &Version,
        field_name: &str,
    ) -> Result<RelationChange> {
        for version in [version1, version2] {
            if !version.describes(object) {
                return Err(CompareError::VersionObjectMismatch {
                    version_id: version.id.0,
                    expected: object.to_string(),
                    actual: version.object_ref().to_string(),
                });
            }
        }
        let (older, newer) = ordered(version1, version2);
        let fields = self.registry.comparable_fields(&object.model)?;
        let field = fields
            .iter()
            .find(|f| f.name == field_name)
            .ok_or_else(|| CompareError::UnknownField {
                model: object.model.clone(),
                field: field_name.to_string(),
            })?;
        let ctx = self.context();
        let comparison = FieldComparison::new(&ctx, field, object, older, newer);
        Ok(comparison.relation_change().clone())
    }
}

fn ordered<'v>(version1: &'v Version, version2: &'v Version) -> (&'v Version, &'v Version) {
    if version1.id > version2.id {
        (version2, version1)
    } else {
        (version1, version2)
    }
}
