//! Convenience macros for lsync subsystem tracing.
//!
//! Each macro wraps a standard `tracing` macro with the target of one
//! [`Subsystem`](crate::Subsystem). Callers must depend on `tracing`.

/// Emit a watch registration trace.
///
/// # Example
/// ```ignore
/// trace_watch!(path = %dir.display(), "watch registered");
/// ```
#[macro_export]
macro_rules! trace_watch {
    ($($arg:tt)*) => {
        ::tracing::debug!(target: "lsync::watch", $($arg)*);
    };
}

/// Emit a copy or directory-creation trace.
///
/// # Example
/// ```ignore
/// trace_copy!("copied {} bytes", bytes);
/// ```
#[macro_export]
macro_rules! trace_copy {
    ($($arg:tt)*) => {
        ::tracing::info!(target: "lsync::copy", $($arg)*);
    };
}

/// Emit a deletion trace.
///
/// # Example
/// ```ignore
/// trace_del!("deleting {}", path.display());
/// ```
#[macro_export]
macro_rules! trace_del {
    ($($arg:tt)*) => {
        ::tracing::info!(target: "lsync::delete", $($arg)*);
    };
}

/// Emit a dispatch-loop trace.
///
/// # Example
/// ```ignore
/// trace_dispatch!(kind = ?event.kind(), "dispatching");
/// ```
#[macro_export]
macro_rules! trace_dispatch {
    ($($arg:tt)*) => {
        ::tracing::debug!(target: "lsync::dispatch", $($arg)*);
    };
}

/// Emit a reconciliation walk trace.
///
/// # Example
/// ```ignore
/// trace_walk!("reconciled {} entries", count);
/// ```
#[macro_export]
macro_rules! trace_walk {
    ($($arg:tt)*) => {
        ::tracing::debug!(target: "lsync::walk", $($arg)*);
    };
}
