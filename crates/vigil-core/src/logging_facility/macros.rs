//! Canonical logging macros
//!
//! These macros give every operation the same start/end/end_error shape so
//! that log queries (and the test capture layer) can key on `op` and `event`.

/// Log the start of an operation
///
/// # Example
///
/// ```
/// # use vigil_core::log_op_start;
/// log_op_start!("pipeline_cycle");
/// log_op_start!("pipeline_cycle", cycle_id = "c1");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::vigil_core_types::schema::EVENT_START,
        );
    };
    ($op:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::vigil_core_types::schema::EVENT_START,
            $($field)*
        );
    };
}

/// Log the successful end of an operation
///
/// # Example
///
/// ```
/// # use vigil_core::log_op_end;
/// log_op_end!("pipeline_cycle", duration_ms = 42);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::vigil_core_types::schema::EVENT_END,
            duration_ms = $duration,
        );
    };
    ($op:expr, duration_ms = $duration:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::vigil_core_types::schema::EVENT_END,
            duration_ms = $duration,
            $($field)*
        );
    };
}

/// Log an operation error
///
/// The error expression must convert into [`VgError`](crate::errors::VgError).
///
/// # Example
///
/// ```
/// # use vigil_core::log_op_error;
/// # use vigil_core::errors::{VgError, VgErrorKind};
/// let err = VgError::new(VgErrorKind::SnapshotLoad);
/// log_op_error!("load_snapshot", err, duration_ms = 10);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr) => {{
        let vg_err: $crate::errors::VgError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::vigil_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err.kind = ?vg_err.kind(),
            err.code = vg_err.code(),
            error = %vg_err,
        );
    }};
    ($op:expr, $err:expr, duration_ms = $duration:expr, $($field:tt)*) => {{
        let vg_err: $crate::errors::VgError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::vigil_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err.kind = ?vg_err.kind(),
            err.code = vg_err.code(),
            error = %vg_err,
            $($field)*
        );
    }};
}
