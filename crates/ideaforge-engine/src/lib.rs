//! Pipeline engine for ideaforge
//!
//! Runs the staged pipeline for one project at a time:
//!
//! ```text
//! Requirements → Architecture → UXDesign → ProjectGeneration
//! ```
//!
//! - [`orchestrator`]: lock, prerequisite check, provider call, persist
//! - [`stages`]: prompts and response postprocessing per stage
//! - [`resolver`]: tech stack selection with catalog fallback
//! - [`codegen`]: template families and the per-file generation loop
//! - [`store`]: the artifact store boundary and its two implementations

pub mod codegen;
pub mod context;
pub mod dry_run;
pub mod orchestrator;
pub mod resolver;
pub mod stages;
pub mod store;

pub use codegen::{CodeGenerator, GenerationManifest, GenerationOutcome, TemplateFamily};
pub use context::ContextPayload;
pub use dry_run::dry_run_backend;
pub use ideaforge_lock::ActionLocks;
pub use orchestrator::{
    EnvelopeError, GenerationEnvelope, Orchestrator, ProjectStatusView, StageEnvelope,
};
pub use resolver::{ResolvedStack, StackSource, TechStackResolver};
pub use store::{ArtifactStore, JsonFileStore, MemoryStore, NewProject};
