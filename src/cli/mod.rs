//! Command-line interface for ideaforge
//!
//! - `args`: clap argument definitions
//! - `run`: entry point, configuration and dispatch
//! - `commands`: one handler per subcommand

pub mod args;
mod commands;
mod run;

pub use args::{Cli, Commands, StageArg};
pub use run::run;
