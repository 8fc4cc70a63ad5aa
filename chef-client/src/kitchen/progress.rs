use chef::{PipelineState, Stage};
use tokio::sync::mpsc::UnboundedSender;

/// Receives state changes while a recipe is being made.
///
/// Purely informational: nothing a sink does can change the outcome.
pub trait ProgressSink: Send + Sync {
    fn state_changed(&self, state: PipelineState);
}

impl ProgressSink for () {
    fn state_changed(&self, _state: PipelineState) {}
}

impl ProgressSink for UnboundedSender<PipelineState> {
    fn state_changed(&self, state: PipelineState) {
        // The listener may have hung up, which is fine
        let _ = self.send(state);
    }
}

/// Writes each state change to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn state_changed(&self, state: PipelineState) {
        match state {
            PipelineState::Running(stage) => {
                tracing::info!(percent = stage.percent(), "{}", stage.status_message())
            }
            PipelineState::Done => tracing::info!(percent = 100, "Recipe ready"),
            PipelineState::Failed(stage) => tracing::warn!(%stage, "Recipe failed"),
            PipelineState::Idle => {}
        }
    }
}

/// Tracks the pipeline state and forwards every valid transition.
pub(crate) struct StateTracker<'a> {
    state: PipelineState,
    sink: &'a dyn ProgressSink,
}

impl<'a> StateTracker<'a> {
    pub(crate) fn new(sink: &'a dyn ProgressSink) -> Self {
        Self {
            state: PipelineState::Idle,
            sink,
        }
    }

    pub(crate) fn enter(&mut self, stage: Stage) {
        self.advance(PipelineState::Running(stage));
    }

    pub(crate) fn finish(&mut self) {
        self.advance(PipelineState::Done);
    }

    pub(crate) fn fail(&mut self, stage: Stage) {
        self.advance(PipelineState::Failed(stage));
    }

    pub(crate) fn state(&self) -> PipelineState {
        self.state
    }

    fn advance(&mut self, next: PipelineState) {
        match self.state.advance(next) {
            Ok(state) => {
                self.state = state;
                self.sink.state_changed(state);
            }
            Err(err) => tracing::error!("{}", err),
        }
    }
}
