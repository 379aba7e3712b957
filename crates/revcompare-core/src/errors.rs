use revcompare_core_types::ComparisonId;
use thiserror::Error;

/// Result type alias using CompareError
pub type Result<T> = std::result::Result<T, CompareError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that the boundary layer can use to
/// translate engine failures (e.g. `ERR_VERSION_NOT_FOUND` into a 404).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Caller contract
    VersionNotFound,
    VersionObjectMismatch,
    UnknownModel,
    UnknownField,

    // Stored data
    /// A stored payload cannot be interpreted with the current field definition
    IncompatibleVersionData,
    /// The snapshot serialization format is not supported by the raw reader
    UnsupportedFormat,

    // Integration/IO
    Serialization,
    Config,
    Persistence,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::VersionNotFound => "ERR_VERSION_NOT_FOUND",
            ExErrorKind::VersionObjectMismatch => "ERR_VERSION_OBJECT_MISMATCH",
            ExErrorKind::UnknownModel => "ERR_UNKNOWN_MODEL",
            ExErrorKind::UnknownField => "ERR_UNKNOWN_FIELD",
            ExErrorKind::IncompatibleVersionData => "ERR_INCOMPATIBLE_VERSION_DATA",
            ExErrorKind::UnsupportedFormat => "ERR_UNSUPPORTED_FORMAT",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Config => "ERR_CONFIG",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }

    /// True for kinds that the boundary layer should report as "not found"
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ExErrorKind::VersionNotFound | ExErrorKind::VersionObjectMismatch
        )
    }
}

/// Canonical structured error type
///
/// Carries classification fields for programmatic handling plus the
/// model/object/version context needed to diagnose a failed comparison.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    model: Option<String>,
    object_id: Option<String>,
    version_id: Option<u64>,
    field: Option<String>,
    comparison_id: Option<ComparisonId>,
    message: String,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            model: None,
            object_id: None,
            version_id: None,
            field: None,
            comparison_id: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add model context
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Add object id context
    pub fn with_object_id(mut self, id: impl Into<String>) -> Self {
        self.object_id = Some(id.into());
        self
    }

    /// Add version id context
    pub fn with_version_id(mut self, id: u64) -> Self {
        self.version_id = Some(id);
        self
    }

    /// Add field name context
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Add comparison request context
    pub fn with_comparison_id(mut self, id: ComparisonId) -> Self {
        self.comparison_id = Some(id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the model context, if any
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    /// Get the object id context, if any
    pub fn object_id(&self) -> Option<&str> {
        self.object_id.as_deref()
    }

    /// Get the version id context, if any
    pub fn version_id(&self) -> Option<u64> {
        self.version_id
    }

    /// Get the field name context, if any
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// Get the comparison request id, if any
    pub fn comparison_id(&self) -> Option<&ComparisonId> {
        self.comparison_id.as_ref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let (Some(model), Some(object_id)) = (&self.model, &self.object_id) {
            write!(f, " (object: {}:{})", model, object_id)?;
        } else if let Some(model) = &self.model {
            write!(f, " (model: {})", model)?;
        }
        if let Some(version_id) = self.version_id {
            write!(f, " (version_id: {})", version_id)?;
        }
        if let Some(field) = &self.field {
            write!(f, " (field: {})", field)?;
        }
        if let Some(id) = &self.comparison_id {
            write!(f, " (comparison_id: {})", id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Errors that leave the comparison engine
///
/// Per-field resolution problems never show up here; they are logged and
/// degraded locally. What remains are caller-contract violations and
/// failures of the collaborators while loading the requested versions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompareError {
    /// Version id does not exist in the history of the object
    #[error("Version {version_id} not found for {model}:{object_id}")]
    VersionNotFound {
        version_id: u64,
        model: String,
        object_id: String,
    },

    /// Version exists but describes a different object
    #[error("Version {version_id} belongs to {actual}, not {expected}")]
    VersionObjectMismatch {
        version_id: u64,
        expected: String,
        actual: String,
    },

    /// Model is not known to the registry
    #[error("Unknown model: {model}")]
    UnknownModel { model: String },

    /// Field is not declared on the model
    #[error("Unknown field {field} on model {model}")]
    UnknownField { model: String, field: String },

    /// Stored payload does not match the expected shape
    #[error("Incompatible version data in version {version_id}: {message}")]
    IncompatibleVersionData { version_id: u64, message: String },

    /// Serialization format not supported by the raw reader
    #[error("Unsupported serialization format {format:?} in version {version_id}")]
    UnsupportedFormat { version_id: u64, format: String },

    /// JSON (de)serialization failure
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Invalid configuration document or value
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Backing store failure
    #[error("Store error: {message}")]
    Persistence { message: String },

    /// Generic internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl CompareError {
    /// Map onto the canonical error kind
    pub fn kind(&self) -> ExErrorKind {
        match self {
            CompareError::VersionNotFound { .. } => ExErrorKind::VersionNotFound,
            CompareError::VersionObjectMismatch { .. } => ExErrorKind::VersionObjectMismatch,
            CompareError::UnknownModel { .. } => ExErrorKind::UnknownModel,
            CompareError::UnknownField { .. } => ExErrorKind::UnknownField,
            CompareError::IncompatibleVersionData { .. } => ExErrorKind::IncompatibleVersionData,
            CompareError::UnsupportedFormat { .. } => ExErrorKind::UnsupportedFormat,
            CompareError::Serialization { .. } => ExErrorKind::Serialization,
            CompareError::Config { .. } => ExErrorKind::Config,
            CompareError::Persistence { .. } => ExErrorKind::Persistence,
            CompareError::Internal { .. } => ExErrorKind::Internal,
        }
    }
}

/// Conversion from CompareError to ExError
impl From<CompareError> for ExError {
    fn from(err: CompareError) -> Self {
        let kind = err.kind();
        match err {
            CompareError::VersionNotFound {
                version_id,
                model,
                object_id,
            } => ExError::new(kind)
                .with_model(model)
                .with_object_id(object_id)
                .with_version_id(version_id)
                .with_message("Version not found for this object"),

            CompareError::VersionObjectMismatch {
                version_id,
                expected,
                actual,
            } => ExError::new(kind)
                .with_version_id(version_id)
                .with_message(format!("Version belongs to {}, not {}", actual, expected)),

            CompareError::UnknownModel { model } => ExError::new(kind)
                .with_model(model)
                .with_message("Model is not registered"),

            CompareError::UnknownField { model, field } => ExError::new(kind)
                .with_model(model)
                .with_field(field)
                .with_message("Field is not declared on the model"),

            CompareError::IncompatibleVersionData {
                version_id,
                message,
            } => ExError::new(kind)
                .with_version_id(version_id)
                .with_message(message),

            CompareError::UnsupportedFormat { version_id, format } => ExError::new(kind)
                .with_version_id(version_id)
                .with_message(format!("Format {:?} is not supported", format)),

            CompareError::Serialization { message }
            | CompareError::Config { message }
            | CompareError::Persistence { message }
            | CompareError::Internal { message } => ExError::new(kind).with_message(message),
        }
    }
}

/// Conversion from serde_json::Error to CompareError
impl From<serde_json::Error> for CompareError {
    fn from(err: serde_json::Error) -> Self {
        CompareError::Serialization {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_codes() {
        let cases = [
            (ExErrorKind::VersionNotFound, "ERR_VERSION_NOT_FOUND"),
            (
                ExErrorKind::VersionObjectMismatch,
                "ERR_VERSION_OBJECT_MISMATCH",
            ),
            (ExErrorKind::UnknownModel, "ERR_UNKNOWN_MODEL"),
            (
                ExErrorKind::IncompatibleVersionData,
                "ERR_INCOMPATIBLE_VERSION_DATA",
            ),
            (ExErrorKind::Config, "ERR_CONFIG"),
        ];
        for (kind, expected_code) in cases {
            assert_eq!(kind.code(), expected_code, "Wrong code for {:?}", kind);
        }
    }

    #[test]
    fn test_version_not_found_maps_to_not_found_kind() {
        let err = CompareError::VersionNotFound {
            version_id: 7,
            model: "shop.Car".into(),
            object_id: "1".into(),
        };
        let ex: ExError = err.into();
        assert_eq!(ex.kind(), ExErrorKind::VersionNotFound);
        assert!(ex.kind().is_not_found());
        assert_eq!(ex.version_id(), Some(7));
        assert_eq!(ex.object_id(), Some("1"));
    }

    #[test]
    fn test_display_includes_context() {
        let ex = ExError::new(ExErrorKind::UnknownField)
            .with_op("compare")
            .with_model("shop.Car")
            .with_field("colour")
            .with_message("Field is not declared on the model");
        let rendered = ex.to_string();
        assert!(rendered.starts_with("[ERR_UNKNOWN_FIELD] in operation 'compare'"));
        assert!(rendered.contains("(model: shop.Car)"));
        assert!(rendered.contains("(field: colour)"));
    }

    #[test]
    fn test_comparison_id_in_display() {
        let id = ComparisonId::new();
        let ex = ExError::new(ExErrorKind::UnknownModel)
            .with_op("compare")
            .with_comparison_id(id.clone());
        assert_eq!(ex.op(), Some("compare"));
        assert_eq!(ex.comparison_id(), Some(&id));
        assert!(ex.to_string().ends_with(&format!("(comparison_id: {})", id)));
    }

    #[test]
    fn test_serde_json_error_converts() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: CompareError = err.into();
        assert_eq!(err.kind(), ExErrorKind::Serialization);
    }
}
