#![forbid(unsafe_code)]

//! Logging facade.
//!
//! With the `tracing` feature the usual macros are re-exported so downstream
//! crates can log through `fdock_core::debug!` without a direct dependency.
//! `tracing-json` adds a JSON subscriber builder for production hosts.

#[cfg(feature = "tracing")]
pub use tracing::{
    debug, debug_span, error, error_span, info, info_span, trace, trace_span, warn, warn_span,
};

/// Environment variable read by [`json_subscriber`] for the filter directive.
pub const LOG_FILTER_ENV: &str = "FDOCK_LOG";

/// Build a JSON subscriber filtered by [`LOG_FILTER_ENV`] (default `info`).
///
/// The caller decides whether to install it globally or scope it with
/// `tracing::subscriber::with_default`.
#[cfg(feature = "tracing-json")]
#[must_use]
pub fn json_subscriber() -> impl tracing::Subscriber + Send + Sync {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_target(true)
        .finish()
}
