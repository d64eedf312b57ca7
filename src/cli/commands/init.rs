use anyhow::Context;
use camino::Utf8Path;

use ideaforge_engine::{NewProject, Orchestrator};
use ideaforge_utils::error::{ConfigError, PipelineError};
use ideaforge_utils::exit_codes::ExitCode;

use super::{emit_json, fail};

#[derive(Debug)]
pub struct InitArgs {
    pub name: String,
    pub requirements: String,
    pub description: Option<String>,
    pub app_type: Option<String>,
    pub stack: Option<String>,
    pub provider: Option<String>,
}

/// Read `@path` arguments from disk; anything else is taken literally
fn read_requirements(arg: &str) -> Result<String, PipelineError> {
    match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(Utf8Path::new(path))
            .with_context(|| format!("cannot read {path}"))
            .map_err(|e| {
                PipelineError::Config(ConfigError::InvalidValue {
                    key: "requirements".to_string(),
                    value: format!("{e:#}"),
                })
            }),
        None => Ok(arg.to_string()),
    }
}

pub fn init(orchestrator: &Orchestrator, args: InitArgs) -> Result<(), ExitCode> {
    let requirements = match read_requirements(&args.requirements) {
        Ok(text) => text,
        Err(err) => return fail(&err),
    };

    let draft = NewProject {
        name: args.name,
        description: args.description.unwrap_or_default(),
        requirements,
        application_type_id: args.app_type,
        tech_stack_id: args.stack,
        ai_provider: args.provider.unwrap_or_default(),
    };

    match orchestrator.create_project(draft) {
        Ok(project) => {
            tracing::info!(project_id = %project.id, name = %project.name, "Project created");
            emit_json(&project)
        }
        Err(err) => fail(&err),
    }
}
