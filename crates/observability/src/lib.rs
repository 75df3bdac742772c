//! Process-wide tracing setup shared by binaries.

pub mod subscriber;

pub use subscriber::{ENV_LOG_FORMAT, LogFormat};

/// Initialize process-wide observability (tracing/logging).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    subscriber::init(LogFormat::from_env());
}
