//! Canonical logging macros

/// Log the start of an operation
///
/// # Example
///
/// ```
/// # use revcompare_core::log_op_start;
/// log_op_start!("compare");
/// log_op_start!("compare", model = "shop.Car", object_id = "1");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = revcompare_core_types::schema::EVENT_START,
        );
    };
    ($op:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = revcompare_core_types::schema::EVENT_START,
            $($field)*
        );
    };
}

/// Log the successful end of an operation
///
/// # Example
///
/// ```
/// # use revcompare_core::log_op_end;
/// log_op_end!("compare", duration_ms = 3);
/// log_op_end!("compare", duration_ms = 3, changed_fields = 2);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = revcompare_core_types::schema::EVENT_END,
            duration_ms = $duration,
        );
    };
    ($op:expr, duration_ms = $duration:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = revcompare_core_types::schema::EVENT_END,
            duration_ms = $duration,
            $($field)*
        );
    };
}

/// Log an operation error
///
/// `err` is anything convertible into [`ExError`](crate::errors::ExError).
///
/// # Example
///
/// ```
/// # use revcompare_core::{log_op_error, errors::CompareError};
/// let err = CompareError::UnknownModel { model: "shop.Car".to_string() };
/// log_op_error!("compare", err, duration_ms = 1);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr) => {{
        use $crate::errors::ExError;
        let ex_err: ExError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = revcompare_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err.kind = ?ex_err.kind(),
            err.code = ex_err.code(),
            err.comparison_id = %ex_err.comparison_id().map(ToString::to_string).unwrap_or_default(),
        );
    }};
    ($op:expr, $err:expr, duration_ms = $duration:expr, $($field:tt)*) => {{
        use $crate::errors::ExError;
        let ex_err: ExError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = revcompare_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err.kind = ?ex_err.kind(),
            err.code = ex_err.code(),
            err.comparison_id = %ex_err.comparison_id().map(ToString::to_string).unwrap_or_default(),
            $($field)*
        );
    }};
}

/// Log a locally recovered per-field failure
///
/// # Example
///
/// ```
/// # use revcompare_core::log_degraded;
/// log_degraded!("resolve_many_to_many", "pets", "m2m value is not a list");
/// ```
#[macro_export]
macro_rules! log_degraded {
    ($op:expr, $field_name:expr, $reason:expr) => {
        tracing::warn!(
            component = module_path!(),
            op = $op,
            event = revcompare_core_types::schema::EVENT_DEGRADED,
            field = $field_name,
            reason = $reason,
        );
    };
    ($op:expr, $field_name:expr, $reason:expr, $($field:tt)*) => {
        tracing::warn!(
            component = module_path!(),
            op = $op,
            event = revcompare_core_types::schema::EVENT_DEGRADED,
            field = $field_name,
            reason = $reason,
            $($field)*
        );
    };
}
