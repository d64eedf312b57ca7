//! ideaforge - staged AI pipeline from product idea to starter project
//!
//! A project moves through four stages. Each stage's output is the next
//! stage's input, and a stage cannot run until its predecessor has produced
//! a non-empty artifact:
//!
//! ```text
//! Requirements → Architecture → UX Design → Project Generation
//! ```
//!
//! # Quick Start (CLI)
//!
//! ```bash
//! ideaforge init "Guitar Lessons" --requirements "A site listing lessons with prices"
//! ideaforge run 1 requirements
//! ideaforge status 1 --json
//! ```
//!
//! # Library use
//!
//! ```ignore
//! use std::sync::Arc;
//! use ideaforge::{Config, MemoryStore, Orchestrator, ProviderGateway, StageKind};
//!
//! let orchestrator = Orchestrator::new(
//!     Arc::new(Config::builtin()?),
//!     Arc::new(MemoryStore::new()),
//!     ProviderGateway::http(),
//! );
//! let envelope = orchestrator.run_stage("1", StageKind::Requirements).await;
//! ```
//!
//! Every orchestrator operation returns an envelope; provider failures never
//! surface as panics or `Err` values.

pub mod cli;

pub use ideaforge_config::{CliArgs, Config, ProviderConfig, ProviderKind, TechStackCatalog};
pub use ideaforge_engine::{
    ActionLocks, ArtifactStore, CodeGenerator, GenerationEnvelope, GenerationManifest, GenerationOutcome,
    JsonFileStore, MemoryStore, NewProject, Orchestrator, ProjectStatusView, StageEnvelope,
    TechStackResolver, dry_run_backend,
};
pub use ideaforge_llm::{LlmBackend, ProviderGateway, ScriptedBackend};
pub use ideaforge_status::{ArtifactField, Project, StageKind, derive_status, stage_status};
pub use ideaforge_utils::error::PipelineError;
pub use ideaforge_utils::exit_codes::ExitCode;
