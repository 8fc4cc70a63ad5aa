use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};

/// One of the remote-call stages of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    Classifying,
    ComposingRecipe,
    Illustrating,
}

impl Stage {
    /// Progress bar position once this stage has started
    pub fn percent(&self) -> u8 {
        match self {
            Stage::Classifying => 25,
            Stage::ComposingRecipe => 50,
            Stage::Illustrating => 75,
        }
    }

    pub fn status_message(&self) -> &'static str {
        match self {
            Stage::Classifying => "Analyzing ingredients...",
            Stage::ComposingRecipe => "Crafting recipe...",
            Stage::Illustrating => "Creating visuals...",
        }
    }

    /// What we were doing, for "An error occurred while ..." messages.
    pub fn activity(&self) -> &'static str {
        match self {
            Stage::Classifying => "identifying the foods",
            Stage::ComposingRecipe => "writing the recipe",
            Stage::Illustrating => "drawing the dish",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "stage", rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Running(Stage),
    Done,
    Failed(Stage),
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("Cannot move the pipeline from {from:?} to {to:?}")]
pub struct InvalidTransition {
    pub from: PipelineState,
    pub to: PipelineState,
}

impl PipelineState {
    fn rank(&self) -> u8 {
        match self {
            PipelineState::Idle => 0,
            PipelineState::Running(Stage::Classifying) => 1,
            PipelineState::Running(Stage::ComposingRecipe) => 2,
            PipelineState::Running(Stage::Illustrating) => 3,
            PipelineState::Done => 4,
            PipelineState::Failed(_) => 5,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed(_))
    }

    /// Move forward one state.
    ///
    /// Stages can only be entered in order, `Done` only follows illustration,
    /// and `Failed` must name the stage that was running.
    pub fn advance(self, to: PipelineState) -> Result<PipelineState, InvalidTransition> {
        let allowed = match (self, to) {
            (PipelineState::Running(running), PipelineState::Failed(failed)) => running == failed,
            (_, PipelineState::Failed(_)) => false,
            (from, _) if from.is_terminal() => false,
            (from, to) => to.rank() == from.rank() + 1,
        };
        if allowed {
            Ok(to)
        } else {
            Err(InvalidTransition { from: self, to })
        }
    }

    pub fn percent(&self) -> u8 {
        match self {
            PipelineState::Idle => 0,
            PipelineState::Running(stage) | PipelineState::Failed(stage) => stage.percent(),
            PipelineState::Done => 100,
        }
    }
}
