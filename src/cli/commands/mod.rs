//! Subcommand handlers
//!
//! Handlers print their result and return the exit code; they never panic
//! on a pipeline failure.

mod catalog;
mod init;
mod stage;
mod status;

pub use catalog::catalog;
pub use init::{InitArgs, init};
pub use stage::{generate, run_stage};
pub use status::status;

use serde::Serialize;

use ideaforge_engine::EnvelopeError;
use ideaforge_utils::error::PipelineError;
use ideaforge_utils::exit_codes::ExitCode;

/// Print `value` as pretty JSON on stdout
pub(crate) fn emit_json<T: Serialize>(value: &T) -> Result<(), ExitCode> {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{json}");
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: failed to serialize output: {e}");
            Err(ExitCode::STAGE_FAILED)
        }
    }
}

/// Report a pipeline error on stderr and return its exit code
pub(crate) fn fail(err: &PipelineError) -> Result<(), ExitCode> {
    eprintln!("{}", err.display_for_user());
    Err(err.to_exit_code())
}

/// Exit code for a failure envelope
pub(crate) fn envelope_exit(error: Option<&EnvelopeError>) -> Result<(), ExitCode> {
    let Some(error) = error else {
        return Ok(());
    };
    eprintln!("Error: {}", error.message);
    for suggestion in &error.suggestions {
        eprintln!("  - {suggestion}");
    }
    match error.kind.as_str() {
        "Config" | "ProjectNotFound" => Err(ExitCode::CLI_ARGS),
        _ => Err(ExitCode::STAGE_FAILED),
    }
}
