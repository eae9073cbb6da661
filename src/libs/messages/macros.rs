//! Convenient macros for engine messaging and logging.
//!
//! Every event the engine reports is a [`Message`](super::Message). The
//! macros route it to the matching `tracing` level so the embedding
//! application decides, through its subscriber, what gets shown. Only
//! `msg_print!` writes directly to stdout; the inspection binary uses it for
//! its own output.
//!
//! ## Debug Mode Detection
//!
//! Debug mode is enabled when either environment variable is set:
//! - **`RELORM_DEBUG`**: Explicit debug mode enablement
//! - **`RUST_LOG`**: Standard Rust logging configuration
//!
//! In debug mode logged SQL has its bound arguments rendered inline.
//!
//! ## Usage Examples
//!
//! ```rust
//! use relorm::{msg_debug, msg_warning};
//! use relorm::libs::messages::Message;
//!
//! msg_warning!(Message::EntityWithoutTable("Draft".to_string()));
//! msg_debug!(Message::ExecutingSql("SELECT 1".to_string()));
//! ```

use std::sync::OnceLock;

/// Cached result of debug mode detection.
static DEBUG_MODE: OnceLock<bool> = OnceLock::new();

/// Checks if debug mode is enabled, with caching.
#[doc(hidden)]
pub fn is_debug_mode() -> bool {
    *DEBUG_MODE.get_or_init(|| std::env::var("RELORM_DEBUG").is_ok() || std::env::var("RUST_LOG").is_ok())
}

/// Prints a message to stdout, optionally surrounded by blank lines.
#[macro_export]
macro_rules! msg_print {
    ($msg:expr) => {
        println!("{}", $msg)
    };
    ($msg:expr, true) => {
        println!("\n{}\n", $msg)
    };
}

/// Logs a success message at info level with a ✅ prefix.
#[macro_export]
macro_rules! msg_success {
    ($msg:expr) => {
        tracing::info!("✅ {}", $msg)
    };
}

/// Logs an informational message at info level.
#[macro_export]
macro_rules! msg_info {
    ($msg:expr) => {
        tracing::info!("{}", $msg)
    };
}

/// Logs a warning. Used for schema problems the engine works around.
#[macro_export]
macro_rules! msg_warning {
    ($msg:expr) => {
        tracing::warn!("⚠️ {}", $msg)
    };
}

/// Logs an error. Used where a façade call turns a failure into a sentinel.
#[macro_export]
macro_rules! msg_error {
    ($msg:expr) => {
        tracing::error!("❌ {}", $msg)
    };
}

/// Logs a debug-level message.
#[macro_export]
macro_rules! msg_debug {
    ($msg:expr) => {
        tracing::debug!("🔍 {}", $msg)
    };
}

/// Creates an `anyhow::Error` from a message with ❌ prefix.
#[macro_export]
macro_rules! msg_error_anyhow {
    ($msg:expr) => {
        anyhow::anyhow!("❌ {}", $msg)
    };
}

/// Early return with an error created from a message.
#[macro_export]
macro_rules! msg_bail_anyhow {
    ($msg:expr) => {
        anyhow::bail!("❌ {}", $msg)
    };
}
