//! CLI argument definitions

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand, ValueEnum};

use ideaforge_status::StageKind;

/// ideaforge - turn a product idea into requirements, architecture, UX and a starter project
#[derive(Debug, Parser)]
#[command(name = "ideaforge")]
#[command(about = "Staged AI pipeline from product idea to scaffolded project")]
#[command(long_about = r#"
ideaforge runs a product idea through four stages, each one built on the
output of the previous stage:

  Requirements → Architecture → UX Design → Project Generation

EXAMPLES:
  # Create a project
  ideaforge init "Guitar Lessons" --requirements "A site listing lessons with prices"

  # Run the stages in order
  ideaforge run 1 requirements
  ideaforge run 1 architecture
  ideaforge run 1 ux-design
  ideaforge generate 1 --out ./projects

  # Inspect progress
  ideaforge status 1 --json

  # Run offline with canned provider replies
  ideaforge --dry-run run 1 requirements

CONFIGURATION:
  Precedence is CLI flags > config file > defaults. The config file is found
  by searching upward from the current directory for .ideaforge/config.toml.
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<Utf8PathBuf>,

    /// Path to the project store file
    #[arg(long, global = true)]
    pub store: Option<Utf8PathBuf>,

    /// Use canned provider replies instead of calling a provider
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Per-call provider timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create a project from a name and free-text requirements
    Init {
        name: String,

        /// Requirements text, or @path to read them from a file
        #[arg(long, short)]
        requirements: String,

        #[arg(long)]
        description: Option<String>,

        /// Application type id (see `ideaforge catalog`)
        #[arg(long)]
        app_type: Option<String>,

        /// Tech stack id within the application type
        #[arg(long)]
        stack: Option<String>,

        /// AI provider name from the configuration
        #[arg(long)]
        provider: Option<String>,
    },

    /// Run one design stage for a project
    Run {
        project_id: String,

        #[arg(value_enum)]
        stage: StageArg,
    },

    /// Generate the starter project for a project whose UX design is done
    Generate {
        project_id: String,

        /// Output root directory
        #[arg(long)]
        out: Option<Utf8PathBuf>,
    },

    /// Show derived stage status for a project
    Status {
        project_id: String,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// List application types and tech stacks
    Catalog {
        /// Only show this application type
        #[arg(long)]
        app_type: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StageArg {
    Requirements,
    Architecture,
    UxDesign,
}

impl From<StageArg> for StageKind {
    fn from(arg: StageArg) -> Self {
        match arg {
            StageArg::Requirements => StageKind::Requirements,
            StageArg::Architecture => StageKind::Architecture,
            StageArg::UxDesign => StageKind::UxDesign,
        }
    }
}

impl Cli {
    /// Operation name used in error reports
    pub fn operation(&self) -> &'static str {
        match &self.command {
            Commands::Init { .. } => "init",
            Commands::Run { .. } => "run",
            Commands::Generate { .. } => "generate",
            Commands::Status { .. } => "status",
            Commands::Catalog { .. } => "catalog",
        }
    }
}
