//! CLI entry point and dispatch
//!
//! `run()` owns all output. Envelopes go to stdout as pretty JSON; errors and
//! logs go to stderr. main.rs only maps the returned code to the process exit.

use std::sync::Arc;

use clap::Parser;

use ideaforge_config::{CliArgs, Config};
use ideaforge_engine::{ActionLocks, JsonFileStore, Orchestrator, dry_run_backend};
use ideaforge_llm::ProviderGateway;
use ideaforge_utils::error::{ConfigError, PipelineError};
use ideaforge_utils::exit_codes::ExitCode;
use ideaforge_utils::logging::init_tracing;

use super::args::{Cli, Commands};
use super::commands;

pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("Warning: failed to initialize logging: {e}");
    }

    let cli_args = CliArgs {
        config_path: cli.config.clone(),
        provider: None,
        stage_timeout_secs: cli.timeout,
        output_dir: match &cli.command {
            Commands::Generate { out, .. } => out.clone(),
            _ => None,
        },
        store_path: cli.store.clone(),
    };

    let config = match Config::discover(&cli_args) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            let err = PipelineError::Config(ConfigError::InvalidFile(format!("{e:#}")));
            eprintln!("{}", err.display_for_user());
            return Err(err.to_exit_code());
        }
    };

    // catalog needs neither the store nor a runtime
    if let Commands::Catalog { app_type } = &cli.command {
        return commands::catalog(&config, app_type.as_deref());
    }

    let gateway = if cli.dry_run {
        ProviderGateway::with_backend(Arc::new(dry_run_backend()))
    } else {
        ProviderGateway::http()
    };
    let store_path = config.defaults.store_path.clone();
    let store = Arc::new(JsonFileStore::new(store_path.clone()));
    // Lock files next to the store keep separate invocations on one project apart.
    let orchestrator = Orchestrator::new(config.clone(), store, gateway)
        .with_locks(ActionLocks::with_lock_files(store_path.into_std_path_buf()));

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create async runtime: {e}");
            return Err(ExitCode::STAGE_FAILED);
        }
    };

    tracing::debug!(operation = cli.operation(), dry_run = cli.dry_run, "Dispatching command");
    match cli.command {
        Commands::Init {
            name,
            requirements,
            description,
            app_type,
            stack,
            provider,
        } => commands::init(
            &orchestrator,
            commands::InitArgs {
                name,
                requirements,
                description,
                app_type,
                stack,
                provider,
            },
        ),
        Commands::Run { project_id, stage } => {
            rt.block_on(commands::run_stage(&orchestrator, &project_id, stage.into()))
        }
        Commands::Generate { project_id, .. } => {
            rt.block_on(commands::generate(&orchestrator, &project_id))
        }
        Commands::Status { project_id, json } => commands::status(&orchestrator, &project_id, json),
        Commands::Catalog { .. } => Ok(()),
    }
}
