use ideaforge_engine::Orchestrator;
use ideaforge_status::StageKind;
use ideaforge_utils::exit_codes::ExitCode;

use super::{emit_json, envelope_exit};

pub async fn run_stage(
    orchestrator: &Orchestrator,
    project_id: &str,
    stage: StageKind,
) -> Result<(), ExitCode> {
    let envelope = orchestrator.run_stage(project_id, stage).await;
    emit_json(&envelope)?;
    envelope_exit(envelope.error.as_ref())
}

pub async fn generate(orchestrator: &Orchestrator, project_id: &str) -> Result<(), ExitCode> {
    let envelope = orchestrator.run_generation(project_id).await;
    emit_json(&envelope)?;
    if let Some(manifest) = &envelope.manifest {
        for warning in &manifest.warnings {
            eprintln!("Warning: {warning}");
        }
    }
    envelope_exit(envelope.error.as_ref())
}
