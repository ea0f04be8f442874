//! Process-wide logging setup shared by every binary in the workspace.

pub mod tracing;

pub use crate::tracing::LogFormat;

/// Initialize process-wide observability using `LOG_FORMAT` and `RUST_LOG`.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(LogFormat::from_env());
}
