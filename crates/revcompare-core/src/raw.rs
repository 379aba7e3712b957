//! Raw snapshot payload inspection
//!
//! Reads the stored field data straight from the serialized payload,
//! independent of the current model metadata. Useful when a field was
//! renamed or retyped and the structured comparison can no longer
//! interpret an old snapshot.

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};

use crate::diff::TextDiffRenderer;
use crate::errors::{CompareError, Result};
use crate::model::{Version, FORMAT_JSON};

/// Field data of a JSON-format snapshot
///
/// # Errors
///
/// - `UnsupportedFormat` for any format other than JSON
/// - `IncompatibleVersionData` if the payload is not a list of exactly one
///   object with a `fields` mapping
pub fn version_data(version: &Version) -> Result<Map<String, Value>> {
    if version.format != FORMAT_JSON {
        return Err(CompareError::UnsupportedFormat {
            version_id: version.id.0,
            format: version.format.clone(),
        });
    }
    let incompatible = |message: &str| CompareError::IncompatibleVersionData {
        version_id: version.id.0,
        message: message.to_string(),
    };

    let payload: Value = serde_json::from_str(&version.serialized_data)
        .map_err(|e| incompatible(&format!("payload is not valid JSON: {}", e)))?;
    let Value::Array(mut objects) = payload else {
        return Err(incompatible("payload is not a list"));
    };
    if objects.len() != 1 {
        return Err(incompatible(&format!(
            "expected exactly one serialized object, found {}",
            objects.len()
        )));
    }
    match objects.pop() {
        Some(Value::Object(mut object)) => match object.remove("fields") {
            Some(Value::Object(fields)) => Ok(fields),
            _ => Err(incompatible("serialized object has no fields mapping")),
        },
        _ => Err(incompatible("serialized entry is not an object")),
    }
}

/// Pretty print with four space indentation and sorted keys
pub fn pformat(value: &Value) -> String {
    let mut out = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"    "));
    match value.serialize(&mut serializer) {
        Ok(()) => String::from_utf8(out).unwrap_or_else(|_| value.to_string()),
        Err(_) => value.to_string(),
    }
}

/// Text diff of the pretty printed field data of two snapshots
///
/// # Errors
///
/// Same as [`version_data`], for either snapshot.
pub fn raw_diff(version1: &Version, version2: &Version, text_diff: &dyn TextDiffRenderer) -> Result<String> {
    let old = pformat(&Value::Object(version_data(version1)?));
    let new = pformat(&Value::Object(version_data(version2)?));
    Ok(text_diff.render(&old, &new))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::LineDiffRenderer;
    use crate::model::{ObjectRef, RevisionId, VersionId};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn version(id: u64, text: &str) -> Version {
        Version::from_fields(
            VersionId(id),
            RevisionId(id),
            &ObjectRef::new("app.Migration", "1"),
            "migration",
            BTreeMap::from([
                ("text".to_string(), json!(text)),
                ("number".to_string(), json!(111)),
            ]),
        )
        .unwrap()
    }

    #[test]
    fn test_version_data_returns_fields() {
        let fields = version_data(&version(1, "short")).unwrap();
        assert_eq!(fields.get("text"), Some(&json!("short")));
        assert_eq!(fields.get("number"), Some(&json!(111)));
    }

    #[test]
    fn test_rejects_other_formats() {
        let mut v = version(1, "short");
        v.format = "xml".to_string();
        assert!(matches!(
            version_data(&v).unwrap_err(),
            CompareError::UnsupportedFormat { version_id: 1, .. }
        ));
    }

    #[test]
    fn test_rejects_multiple_objects() {
        let mut v = version(1, "short");
        v.serialized_data = r#"[{"fields": {}}, {"fields": {}}]"#.to_string();
        assert!(matches!(
            version_data(&v).unwrap_err(),
            CompareError::IncompatibleVersionData { .. }
        ));

        v.serialized_data = "not json".to_string();
        assert!(matches!(
            version_data(&v).unwrap_err(),
            CompareError::IncompatibleVersionData { .. }
        ));
    }

    #[test]
    fn test_pformat_sorted_four_spaces() {
        let text = pformat(&json!({"b": 1, "a": [true]}));
        assert_eq!(text, "{\n    \"a\": [\n        true\n    ],\n    \"b\": 1\n}");
    }

    #[test]
    fn test_raw_diff() {
        let html = raw_diff(&version(1, "short"), &version(2, "long"), &LineDiffRenderer).unwrap();
        assert!(html.contains("<del>-     &quot;text&quot;: &quot;short&quot;</del>"));
        assert!(html.contains("<ins>+     &quot;text&quot;: &quot;long&quot;</ins>"));
        assert!(html.contains("      &quot;number&quot;: 111,"));
    }
}
