//! Canonical schema constants for structured logging
//!
//! These constants keep field names consistent between the engine, the
//! logging macros and the test capture layer.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_COMPARISON_ID: &str = "comparison_id";

// Entity identifiers
pub const FIELD_MODEL: &str = "model";
pub const FIELD_OBJECT_ID: &str = "object_id";
pub const FIELD_VERSION_ID: &str = "version_id";
pub const FIELD_FIELD_NAME: &str = "field";

// Collection sizes
pub const FIELD_CHANGED_FIELDS: &str = "changed_fields";
pub const FIELD_FIELD_COUNT: &str = "field_count";

// Error fields
pub const FIELD_ERR_KIND: &str = "err.kind";
pub const FIELD_ERR_CODE: &str = "err.code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
pub const EVENT_DEGRADED: &str = "degraded";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants_accessibility() {
        assert!(!FIELD_COMPONENT.is_empty());
        assert!(!FIELD_OP.is_empty());
        assert!(!FIELD_FIELD_NAME.is_empty());
        assert!(!EVENT_START.is_empty());
        assert!(!EVENT_DEGRADED.is_empty());
    }

    #[test]
    fn test_event_names_are_distinct() {
        let events = [EVENT_START, EVENT_END, EVENT_END_ERROR, EVENT_DEGRADED];
        for (i, a) in events.iter().enumerate() {
            for b in &events[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
