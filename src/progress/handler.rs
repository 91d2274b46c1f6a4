use std::time::Duration;

/// Deployment pipeline state transitions, in the order they occur.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    PipelineStarted { root: String, stage_count: usize },

    StageStarted {
        stage: String,
        index: usize,
        total: usize,
    },

    StageCompleted {
        stage: String,
        index: usize,
        duration: Duration,
    },

    /// Terminal; later stages will not start
    StageFailed {
        stage: String,
        index: usize,
        reason: String,
    },

    IdentifierScraped { strategy: String, identifier: String },

    Completed { total_time: Duration },
}

impl ProgressEvent {
    /// Stage the event belongs to, for stage-scoped events
    pub fn stage(&self) -> Option<&str> {
        match self {
            ProgressEvent::StageStarted { stage, .. }
            | ProgressEvent::StageCompleted { stage, .. }
            | ProgressEvent::StageFailed { stage, .. } => Some(stage),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProgressEvent::StageFailed { .. } | ProgressEvent::Completed { .. }
        )
    }
}

/// Receives pipeline progress. Called inline, so implementations must not block.
pub trait ProgressHandler: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {}
}
