//! End-to-end stage scenarios against the in-memory store
//!
//! Each test drives the orchestrator through its public API with a scripted
//! provider, then inspects the stored project.

use std::collections::BTreeSet;
use std::sync::Arc;

use camino::Utf8PathBuf;
use tempfile::TempDir;

use ideaforge::{
    ArtifactStore, Config, GenerationOutcome, MemoryStore, Orchestrator, Project, ProviderGateway,
    ScriptedBackend, StageKind,
};
use ideaforge_llm::{LlmError, LlmInvocation};
use ideaforge_validation::INSUFFICIENT_PREFIX;

const ARCHITECTURE: &str = "# System Architecture\n\n## Components\n- API\n- Web client";
const UX: &str = "# UX Design\n\n## Screens\n- Lesson list\n- Booking form";

fn happy_path(inv: &LlmInvocation) -> Result<String, LlmError> {
    let reply = match inv.purpose.as_str() {
        "requirements" => {
            r##"{"sufficient": true, "refined_requirements": "# Refined\n\nA todo list for one user."}"##
                .to_string()
        }
        "architecture" => ARCHITECTURE.to_string(),
        "ux_design" => UX.to_string(),
        "data_model" => "# Data Model\n\n## Entities\n- Task(id, title, done)".to_string(),
        "stack_selection" => r#"{"selectedStackId": "no_such_stack"}"#.to_string(),
        _ => "```\ngenerated\n```".to_string(),
    };
    Ok(reply)
}

struct Harness {
    orchestrator: Orchestrator,
    store: Arc<MemoryStore>,
    backend: Arc<ScriptedBackend>,
    _out: TempDir,
}

fn harness(backend: ScriptedBackend, project: Project) -> Harness {
    let out = TempDir::new().unwrap();
    let backend = Arc::new(backend);
    let store = Arc::new(MemoryStore::new());
    store.insert(project);
    let orchestrator = Orchestrator::new(
        Arc::new(Config::builtin().unwrap()),
        store.clone(),
        ProviderGateway::with_backend(backend.clone()),
    )
    .with_output_root(Utf8PathBuf::from_path_buf(out.path().to_path_buf()).unwrap());
    Harness {
        orchestrator,
        store,
        backend,
        _out: out,
    }
}

fn todo_project() -> Project {
    Project::new("1", "Todo", "Build a todo app", "anthropic")
}

/// A project that has been through requirements, architecture and UX design
fn designed_project(application_type: &str, stack: &str) -> Project {
    let mut project = todo_project()
        .with_application_type(application_type)
        .with_tech_stack(stack);
    project.refined_requirements = Some("# Refined\n\nTodo".into());
    project.architecture = Some(ARCHITECTURE.into());
    project.ux_design = Some(UX.into());
    project
}

#[tokio::test]
async fn architecture_before_requirements_is_rejected() {
    let h = harness(ScriptedBackend::new(happy_path), todo_project());

    let env = h.orchestrator.run_stage("1", StageKind::Architecture).await;

    assert!(!env.success);
    assert_eq!(env.error_kind(), Some("StagePrerequisiteNotMet"));
    assert!(!env.error.unwrap().retryable);
    assert_eq!(h.backend.call_count(), 0);
}

#[tokio::test]
async fn requirements_stage_sets_refined_requirements_only() {
    let h = harness(ScriptedBackend::new(happy_path), todo_project());

    let env = h.orchestrator.run_stage("1", StageKind::Requirements).await;
    assert!(env.success);

    let project = h.store.load_project("1").unwrap();
    assert!(project.refined_requirements.is_some());
    assert_eq!(project.status, "Requirements Complete");
    assert!(project.architecture.is_none());
}

#[tokio::test]
async fn insufficient_input_carries_model_guidance() {
    let backend = ScriptedBackend::constant(
        r#"{"sufficient": false, "guidance": ["Who are the users?", "What is a task?"]}"#,
    );
    let h = harness(backend, todo_project());
    let before = h.store.load_project("1").unwrap();

    let env = h.orchestrator.run_stage("1", StageKind::Requirements).await;

    let error = env.error.unwrap();
    assert_eq!(error.kind, "ProviderMalformedResponse");
    assert!(error.message.starts_with(INSUFFICIENT_PREFIX));
    assert!(error.message.contains("Who are the users?"));
    assert_eq!(h.store.load_project("1").unwrap(), before);
}

#[tokio::test]
async fn malformed_architecture_leaves_fields_byte_identical() {
    let mut project = todo_project();
    project.refined_requirements = Some("# Refined\n\nTodo".into());
    project.architecture = Some("# Old architecture\n\nkept\nas is".into());
    let h = harness(
        ScriptedBackend::constant("I have created the architecture document above."),
        project,
    );
    let before = h.store.load_project("1").unwrap();

    let env = h.orchestrator.run_stage("1", StageKind::Architecture).await;

    assert_eq!(env.error_kind(), Some("ProviderMalformedResponse"));
    assert_eq!(h.store.load_project("1").unwrap(), before);
}

#[tokio::test]
async fn regenerating_a_stage_keeps_later_artifacts() {
    let mut project = todo_project();
    project.refined_requirements = Some("old".into());
    project.architecture = Some("old architecture".into());
    let h = harness(ScriptedBackend::new(happy_path), project);

    let env = h.orchestrator.run_stage("1", StageKind::Requirements).await;
    assert!(env.success);

    let project = h.store.load_project("1").unwrap();
    assert_eq!(project.architecture.as_deref(), Some("old architecture"));
    assert_eq!(project.status, "System Architecture Complete");
}

#[tokio::test]
async fn full_pipeline_with_unknown_model_stack_falls_back() {
    let project = todo_project().with_application_type("automation_script");
    let h = harness(ScriptedBackend::new(happy_path), project);

    for stage in [StageKind::Requirements, StageKind::Architecture, StageKind::UxDesign] {
        let env = h.orchestrator.run_stage("1", stage).await;
        assert!(env.success, "{stage}: {env:?}");
    }
    let env = h.orchestrator.run_generation("1").await;
    assert!(env.success, "{env:?}");

    let manifest = env.manifest.unwrap();
    assert_eq!(manifest.stack_id, "python_script");
    assert_eq!(manifest.outcome, GenerationOutcome::Completed);
    assert_eq!(env.status.as_deref(), Some("Project Generated"));
    assert!(h.backend.purposes().contains(&"stack_selection".to_string()));

    let project = h.store.load_project("1").unwrap();
    assert_eq!(project.status, "Project Generated");
    assert_eq!(project.generated_path.as_deref(), Some(manifest.root.as_str()));
}

#[tokio::test]
async fn generation_twice_yields_identical_paths() {
    let project = designed_project("web_application", "react_nodejs");
    let h = harness(ScriptedBackend::new(happy_path), project);

    let first = h.orchestrator.run_generation("1").await.manifest.unwrap();
    let second = h.orchestrator.run_generation("1").await.manifest.unwrap();

    let a: BTreeSet<_> = first.files.iter().collect();
    let b: BTreeSet<_> = second.files.iter().collect();
    assert_eq!(a, b);
    assert_eq!(first.root, second.root);
    assert_eq!(first.files.len(), 7);
}

#[tokio::test]
async fn split_stack_with_two_failed_files_completes_with_warnings() {
    let project = designed_project("web_application", "vue_python");
    let backend = ScriptedBackend::new(|inv| match inv.purpose.as_str() {
        "data_model" => Err(LlmError::Transport("connection reset".into())),
        "file:backend/main.py" | "file:frontend/src/App.vue" => Ok(String::new()),
        _ => Ok("```\nok\n```".into()),
    });
    let h = harness(backend, project);

    let env = h.orchestrator.run_generation("1").await;

    assert!(env.success);
    let manifest = env.manifest.unwrap();
    assert!(manifest.files.len() <= 4);
    let file_warnings: Vec<_> = manifest
        .warnings
        .iter()
        .filter(|w| !w.starts_with("data model"))
        .collect();
    assert_eq!(file_warnings.len(), 2);
    assert_eq!(manifest.outcome, GenerationOutcome::CompletedWithWarnings);
}
