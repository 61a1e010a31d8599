//! Process-wide logging setup shared by every binary.

pub mod tracing;

pub use self::tracing::{LogFormat, LogSettings};

/// Initialize logging from `RUST_LOG` / `ATELIER_LOG_FORMAT`.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init_with(&LogSettings::from_env());
}
