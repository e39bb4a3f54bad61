//! Observability infrastructure for Rudder.
//!
//! Structured logging with consistent spans. This module provides
//! initialization helpers and span constructors so every component logs
//! with the same fields.

use std::sync::Once;

use tracing::Span;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default)]
pub enum LogFormat {
    /// JSON structured logs (for production).
    Json,
    /// Pretty-printed logs (for development).
    #[default]
    Pretty,
}

/// Initializes the logging subsystem.
///
/// Call once at application startup. Safe to call multiple times;
/// subsequent calls are no-ops.
///
/// # Environment Variables
///
/// - `RUST_LOG`: Controls log levels (e.g., `info`, `rudder_dispatch=debug`)
///
/// # Example
///
/// ```rust
/// use rudder_core::observability::{init_logging, LogFormat};
///
/// init_logging(LogFormat::Pretty);
/// ```
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        match format {
            LogFormat::Json => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(tracing_subscriber::fmt::layer().json())
                    .init();
            }
            LogFormat::Pretty => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(tracing_subscriber::fmt::layer().pretty())
                    .init();
            }
        }
    });
}

/// Creates a span for dispatch operations with standard fields.
///
/// # Example
///
/// ```rust
/// use rudder_core::observability::dispatch_span;
///
/// let span = dispatch_span("append", "payments", "transfer-queue");
/// let _guard = span.enter();
/// // ... do dispatch operation
/// ```
#[must_use]
pub fn dispatch_span(operation: &str, domain: &str, task_list: &str) -> Span {
    tracing::info_span!(
        "dispatch",
        op = operation,
        domain = domain,
        task_list = task_list,
    )
}

/// Creates a span for partition decisions with standard fields.
#[must_use]
pub fn partition_span(operation: &str, domain: &str) -> Span {
    tracing::info_span!("partition", op = operation, domain = domain)
}
