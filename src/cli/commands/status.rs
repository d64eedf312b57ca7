use ideaforge_engine::Orchestrator;
use ideaforge_utils::exit_codes::ExitCode;

use super::{emit_json, fail};

pub fn status(orchestrator: &Orchestrator, project_id: &str, json: bool) -> Result<(), ExitCode> {
    let view = match orchestrator.status(project_id) {
        Ok(view) => view,
        Err(err) => return fail(&err),
    };
    if json {
        return emit_json(&view);
    }

    println!("Project {} ({})", view.project_id, view.name);
    println!("Status:   {}", view.status);
    println!("Provider: {}", view.ai_provider);
    if let Some(stack) = &view.tech_stack_id {
        println!("Stack:    {stack}");
    }
    println!();
    for state in &view.stages {
        let mark = match (state.completed, state.available) {
            (true, _) => "done",
            (false, true) => "ready",
            (false, false) => "blocked",
        };
        println!("  {:<20} {mark}", state.stage.as_str());
    }
    if view.action_in_progress {
        println!("\nAn action is currently running for this project.");
    }
    Ok(())
}
