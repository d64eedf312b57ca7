//! Logging and observability for ideaforge
//!
//! Structured logging via `tracing`. Stage helpers attach `project_id` and
//! `stage` fields so a single run can be followed through the log.

use crate::redaction::redact_secrets;
use tracing::{Level, error, info, span};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` takes precedence. Otherwise the filter is
/// `ideaforge=debug,info` when verbose and `ideaforge=info,warn` when not.
/// Output goes to stderr so stdout stays reserved for JSON envelopes.
pub fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("ideaforge=debug,info")
            } else {
                EnvFilter::try_new("ideaforge=info,warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if verbose {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_line_number(false)
                    .with_file(false)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_line_number(false)
                    .with_file(false)
                    .compact(),
            )
            .try_init()?;
    }

    Ok(())
}

/// Span covering one stage action for a project
pub fn stage_span(project_id: &str, stage: &str) -> tracing::Span {
    span!(
        Level::INFO,
        "stage_action",
        project_id = %project_id,
        stage = %stage,
    )
}

pub fn log_stage_start(project_id: &str, stage: &str, provider: &str) {
    info!(
        project_id = %project_id,
        stage = %stage,
        provider = %provider,
        "Starting stage"
    );
}

pub fn log_stage_complete(project_id: &str, stage: &str, duration_ms: u128) {
    info!(
        project_id = %project_id,
        stage = %stage,
        duration_ms = %duration_ms,
        "Stage completed"
    );
}

/// Log a stage failure. The message is redacted before it is emitted.
pub fn log_stage_error(project_id: &str, stage: &str, error_kind: &str, message: &str) {
    let sanitized = redact_secrets(message);
    error!(
        project_id = %project_id,
        stage = %stage,
        error_kind = %error_kind,
        error = %sanitized,
        "Stage failed"
    );
}
