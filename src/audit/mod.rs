//! Run orchestration: the audit state machine, its failure taxonomy,
//! and the merge that assembles the final report.

pub mod orchestrator;
pub mod report;

pub use orchestrator::AuditOrchestrator;
pub use report::{AuditReport, MergeValidationFailure};

use std::fmt;

use thiserror::Error;

use crate::scope::ScopeError;
use crate::stages::{GenerationFailure, StageId};

/// The phases an audit run moves through, in order. Used to tag
/// failures with where the run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    ScopeResolution,
    Stage1,
    Stage2,
    Stage3,
    Merge,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::ScopeResolution => "scope_resolution",
            RunPhase::Stage1 => "stage1",
            RunPhase::Stage2 => "stage2",
            RunPhase::Stage3 => "stage3",
            RunPhase::Merge => "merge",
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a run currently is. `Complete` and `Failed` are terminal;
/// every other state has exactly one successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    ResolvingScope,
    RunningStage1,
    RunningStage2,
    RunningStage3,
    Merging,
    Complete,
    Failed(RunPhase),
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Idle => f.write_str("idle"),
            RunState::ResolvingScope => f.write_str("resolving_scope"),
            RunState::RunningStage1 => f.write_str("running_stage1"),
            RunState::RunningStage2 => f.write_str("running_stage2"),
            RunState::RunningStage3 => f.write_str("running_stage3"),
            RunState::Merging => f.write_str("merging"),
            RunState::Complete => f.write_str("complete"),
            RunState::Failed(phase) => write!(f, "failed({phase})"),
        }
    }
}

/// Terminal failure of one audit run, wrapping whichever collaborator
/// gave up first.
#[derive(Error, Debug)]
pub enum AuditError {
    #[error(transparent)]
    Scope(#[from] ScopeError),
    #[error(transparent)]
    Generation(#[from] GenerationFailure),
    #[error(transparent)]
    Merge(#[from] MergeValidationFailure),
}

impl AuditError {
    /// The phase whose collaborator produced this error.
    pub fn phase(&self) -> RunPhase {
        match self {
            AuditError::Scope(_) => RunPhase::ScopeResolution,
            AuditError::Generation(failure) => match failure.stage {
                StageId::Stage1 => RunPhase::Stage1,
                StageId::Stage2 => RunPhase::Stage2,
                StageId::Stage3 => RunPhase::Stage3,
            },
            AuditError::Merge(_) => RunPhase::Merge,
        }
    }
}
