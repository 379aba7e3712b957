use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

use super::value::FieldValue;
use crate::errors::Result;

/// Serialization format tag of snapshots written by `Version::from_fields`
pub const FORMAT_JSON: &str = "json";

/// Identifier of a stored snapshot
///
/// Strictly increasing in creation order, so comparing two ids tells which
/// snapshot is older.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VersionId(pub u64);

/// Identifier of a revision (a group of snapshots saved together)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RevisionId(pub u64);

impl std::fmt::Display for VersionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for RevisionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of one stored object: its model and its (string typed) id
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub model: String,
    pub object_id: String,
}

impl ObjectRef {
    pub fn new(model: impl Into<String>, object_id: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            object_id: object_id.into(),
        }
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.model, self.object_id)
    }
}

/// A group of snapshots created by one user action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    pub id: RevisionId,
    pub date_created: DateTime<Utc>,
    pub user: Option<String>,
    pub comment: String,
}

/// Immutable snapshot of one object at one point in its history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    pub id: VersionId,
    pub revision_id: RevisionId,
    pub model: String,
    pub object_id: String,
    pub format: String,
    /// Full serialized payload; two snapshots with byte-equal payloads are
    /// considered identical
    pub serialized_data: String,
    /// Display text of the object at snapshot time
    pub object_repr: String,
    pub field_dict: BTreeMap<String, Value>,
}

impl Version {
    /// Build a JSON-format snapshot from a field dict
    ///
    /// The payload is `[{"model": .., "pk": .., "fields": {..}}]` with keys in
    /// sorted order, so equal field dicts always serialize to equal bytes.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if the payload cannot be encoded.
    pub fn from_fields(
        id: VersionId,
        revision_id: RevisionId,
        object: &ObjectRef,
        object_repr: impl Into<String>,
        field_dict: BTreeMap<String, Value>,
    ) -> Result<Self> {
        let payload = json!([{
            "model": object.model,
            "pk": object.object_id,
            "fields": field_dict,
        }]);
        let serialized_data = serde_json::to_string(&payload)?;
        Ok(Self {
            id,
            revision_id,
            model: object.model.clone(),
            object_id: object.object_id.clone(),
            format: FORMAT_JSON.to_string(),
            serialized_data,
            object_repr: object_repr.into(),
            field_dict,
        })
    }

    pub fn object_ref(&self) -> ObjectRef {
        ObjectRef::new(self.model.clone(), self.object_id.clone())
    }

    /// True if this snapshot describes `object`
    pub fn describes(&self, object: &ObjectRef) -> bool {
        self.model == object.model && self.object_id == object.object_id
    }

    /// Stored value of a field, or `Missing`
    pub fn field(&self, key: &str) -> FieldValue {
        FieldValue::lookup(&self.field_dict, key, key)
    }

    /// Byte equality of the full serialized payloads
    pub fn same_payload(&self, other: &Version) -> bool {
        self.serialized_data.as_bytes() == other.serialized_data.as_bytes()
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.object_repr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(name: &str) -> BTreeMap<String, Value> {
        let mut dict = BTreeMap::new();
        dict.insert("name".to_string(), json!(name));
        dict.insert("age".to_string(), json!(3));
        dict
    }

    #[test]
    fn test_from_fields_is_deterministic() {
        let obj = ObjectRef::new("zoo.Pet", "1");
        let a = Version::from_fields(VersionId(1), RevisionId(1), &obj, "Rex", fields("Rex")).unwrap();
        let b = Version::from_fields(VersionId(2), RevisionId(2), &obj, "Rex", fields("Rex")).unwrap();
        assert!(a.same_payload(&b));
        assert_eq!(a.format, FORMAT_JSON);
        assert!(a.serialized_data.contains("\"fields\""));
    }

    #[test]
    fn test_payload_differs_when_fields_differ() {
        let obj = ObjectRef::new("zoo.Pet", "1");
        let a = Version::from_fields(VersionId(1), RevisionId(1), &obj, "Rex", fields("Rex")).unwrap();
        let b = Version::from_fields(VersionId(2), RevisionId(2), &obj, "Max", fields("Max")).unwrap();
        assert!(!a.same_payload(&b));
    }

    #[test]
    fn test_describes_and_display() {
        let obj = ObjectRef::new("zoo.Pet", "1");
        let v = Version::from_fields(VersionId(1), RevisionId(1), &obj, "Rex", fields("Rex")).unwrap();
        assert!(v.describes(&obj));
        assert!(!v.describes(&ObjectRef::new("zoo.Pet", "2")));
        assert_eq!(v.to_string(), "Rex");
        assert_eq!(obj.to_string(), "zoo.Pet:1");
        assert!(v.field("colour").is_missing());
    }
}
