//! Tracing configuration and log routing.
//!
//! Logs go to stdout through a compact formatter and to a file. When `MEDBRIEF_LOG_FILE` is set,
//! logs are appended to that path; otherwise a file logger is created under `logs/medbrief.log`.
//! Both sinks share a field formatter that masks any field able to carry document text, patient
//! context, chat bodies or credentials, so only sizes and identifiers reach disk.
use std::fmt::Debug;
use std::sync::OnceLock;

use tracing::field::Field;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{
    EnvFilter,
    field::MakeExt,
    fmt::{self, FormatFields, format::Writer},
    prelude::*,
};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Field names whose values are replaced with `<redacted>` in every sink.
pub const REDACTED_FIELDS: &[&str] = &[
    "text",
    "content",
    "context",
    "body",
    "summary",
    "response",
    "user_message",
    "assistant_response",
    "api_key",
];

/// Configure tracing subscribers for stdout and optional file logging.
///
/// - Respects `RUST_LOG` for filtering (defaults to `info`).
/// - Installs a compact stdout layer and, when available, a file layer.
/// - Masks [`REDACTED_FIELDS`] in both layers.
/// - Uses a global guard to keep the non‑blocking writer alive for the process lifetime.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer()
        .with_target(false)
        .compact()
        .fmt_fields(redacting_fields());

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer);

    if let Some(writer) = configure_file_writer() {
        let file_layer = fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_ansi(false)
            .compact()
            .fmt_fields(redacting_fields());

        registry.with(file_layer).init();
    } else {
        registry.init();
    }
}

/// Field formatter that writes `name=value` pairs, masking [`REDACTED_FIELDS`].
pub fn redacting_fields() -> impl for<'writer> FormatFields<'writer> + Send + Sync + 'static {
    fmt::format::debug_fn(write_field).delimited(" ")
}

fn write_field(writer: &mut Writer<'_>, field: &Field, value: &dyn Debug) -> std::fmt::Result {
    match field.name() {
        "message" => write!(writer, "{value:?}"),
        name if REDACTED_FIELDS.contains(&name) => write!(writer, "{name}=<redacted>"),
        name => write!(writer, "{name}={value:?}"),
    }
}

/// Build a non‑blocking writer for file logging.
///
/// Returns `None` when the logs directory cannot be created or the target file cannot be opened.
fn configure_file_writer() -> Option<NonBlocking> {
    if let Ok(path) = std::env::var("MEDBRIEF_LOG_FILE") {
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
        {
            Ok(file) => {
                let (non_blocking, guard) = tracing_appender::non_blocking(file);
                let _ = LOG_GUARD.set(guard);
                Some(non_blocking)
            }
            Err(err) => {
                eprintln!("Failed to open log file {path}: {err}");
                None
            }
        }
    } else {
        if let Err(err) = std::fs::create_dir_all("logs") {
            eprintln!("Failed to create logs directory: {err}");
            return None;
        }
        let file_appender = tracing_appender::rolling::never("logs", "medbrief.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let _ = LOG_GUARD.set(guard);
        Some(non_blocking)
    }
}
