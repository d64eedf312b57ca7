//! Stage identifiers and the fixed stage table

use serde::{Deserialize, Serialize};

use crate::project::ArtifactField;

/// `StageKind` names the stages of the pipeline.
///
/// # Stage Order
///
/// ```text
/// Requirements → Architecture → UXDesign → ProjectGeneration
/// ```
///
/// Each stage needs the previous stage's output to be non-empty. The first
/// stage needs only the project's free-text requirements.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    #[strum(serialize = "requirements")]
    Requirements,
    #[strum(serialize = "architecture")]
    Architecture,
    #[strum(serialize = "ux-design", serialize = "ux_design")]
    UxDesign,
    #[strum(serialize = "generation", serialize = "project_generation")]
    ProjectGeneration,
}

impl StageKind {
    pub const ALL: [StageKind; 4] = [
        Self::Requirements,
        Self::Architecture,
        Self::UxDesign,
        Self::ProjectGeneration,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Requirements => "requirements",
            Self::Architecture => "architecture",
            Self::UxDesign => "ux_design",
            Self::ProjectGeneration => "project_generation",
        }
    }

    #[must_use]
    pub const fn index(&self) -> usize {
        match self {
            Self::Requirements => 0,
            Self::Architecture => 1,
            Self::UxDesign => 2,
            Self::ProjectGeneration => 3,
        }
    }

    #[must_use]
    pub fn previous(&self) -> Option<StageKind> {
        self.index().checked_sub(1).map(|i| Self::ALL[i])
    }

    #[must_use]
    pub fn descriptor(&self) -> &'static StageDescriptor {
        &STAGES[self.index()]
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static description of one stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageDescriptor {
    pub kind: StageKind,
    /// Must be non-empty before the stage may run
    pub prerequisite: ArtifactField,
    pub output: ArtifactField,
    /// Project status once this is the furthest completed stage
    pub completed_label: &'static str,
}

pub static STAGES: [StageDescriptor; 4] = [
    StageDescriptor {
        kind: StageKind::Requirements,
        prerequisite: ArtifactField::Requirements,
        output: ArtifactField::RefinedRequirements,
        completed_label: "Requirements Complete",
    },
    StageDescriptor {
        kind: StageKind::Architecture,
        prerequisite: ArtifactField::RefinedRequirements,
        output: ArtifactField::Architecture,
        completed_label: "System Architecture Complete",
    },
    StageDescriptor {
        kind: StageKind::UxDesign,
        prerequisite: ArtifactField::Architecture,
        output: ArtifactField::UxDesign,
        completed_label: "UX Design Complete",
    },
    StageDescriptor {
        kind: StageKind::ProjectGeneration,
        prerequisite: ArtifactField::UxDesign,
        output: ArtifactField::GeneratedPath,
        completed_label: "Project Generated",
    },
];
