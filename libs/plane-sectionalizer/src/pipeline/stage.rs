//! # Pipeline Stages
//!
//! The sectionalizer runs a fixed sequence of stages. A [`StagePlan`] pairs
//! each stage with an enabled flag; disabled stages pass their input through
//! unchanged.

use crate::settings::SectionalizerSettings;

/// One step of the sectionalizer pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Join the baked sources into the working copy.
    Bake,
    /// Dissolve and collapse the working copy.
    Simplify,
    /// Split the working copy into loose parts.
    Separate,
    /// Cut every part by the grid planes.
    Multisect,
    /// Split the cut parts into pieces.
    Reseparate,
    /// Transfer normals from each part onto its pieces.
    FixNormals,
    /// Assign pieces to cells.
    Classify,
    /// Join the pieces of each cell into a section.
    Merge,
    /// Recompute split normals of the sections.
    FinalNormals,
    /// Move the sections back by the grid origin offset.
    Reposition,
    /// Remove all temporaries.
    Cleanup,
}

impl Stage {
    pub const ALL: [Stage; 11] = [
        Stage::Bake,
        Stage::Simplify,
        Stage::Separate,
        Stage::Multisect,
        Stage::Reseparate,
        Stage::FixNormals,
        Stage::Classify,
        Stage::Merge,
        Stage::FinalNormals,
        Stage::Reposition,
        Stage::Cleanup,
    ];

    /// Progress label.
    pub fn label(self) -> &'static str {
        match self {
            Stage::Bake => "Creating temp data",
            Stage::Simplify => "Decimating",
            Stage::Separate => "Separating loose parts",
            Stage::Multisect => "Multisecting",
            Stage::Reseparate => "Separating sections",
            Stage::FixNormals => "Transferring normals",
            Stage::Classify => "Finalizing sections",
            Stage::Merge => "Joining sections",
            Stage::FinalNormals => "Calculating custom normals",
            Stage::Reposition => "Repositioning sections",
            Stage::Cleanup => "Removing temp data",
        }
    }
}

/// Ordered stages with their enabled flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagePlan {
    stages: Vec<(Stage, bool)>,
}

impl Default for StagePlan {
    fn default() -> Self {
        Self {
            stages: Stage::ALL.iter().map(|&s| (s, true)).collect(),
        }
    }
}

impl StagePlan {
    /// Every stage enabled except [`Stage::Simplify`], which follows
    /// `settings.decimate`.
    pub fn from_settings(settings: &SectionalizerSettings) -> Self {
        Self::default().with(Stage::Simplify, settings.decimate)
    }

    pub fn set(&mut self, stage: Stage, enabled: bool) {
        for (s, flag) in &mut self.stages {
            if *s == stage {
                *flag = enabled;
            }
        }
    }

    pub fn with(mut self, stage: Stage, enabled: bool) -> Self {
        self.set(stage, enabled);
        self
    }

    pub fn is_enabled(&self, stage: Stage) -> bool {
        self.stages.iter().any(|&(s, enabled)| s == stage && enabled)
    }

    /// Enabled stages in execution order.
    pub fn enabled(&self) -> impl Iterator<Item = Stage> + '_ {
        self.stages.iter().filter(|(_, enabled)| *enabled).map(|&(s, _)| s)
    }
}
