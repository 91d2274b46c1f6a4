use super::{ProgressEvent, ProgressHandler};
use tracing::{debug, info, warn};

/// Forwards pipeline progress to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::PipelineStarted { root, stage_count } => {
                info!(%root, stage_count, "Publishing directory");
            }
            ProgressEvent::StageStarted { stage, index, total } => {
                info!(%stage, "[{}/{}] {}", index + 1, total, stage);
            }
            ProgressEvent::StageCompleted { stage, duration, .. } => {
                debug!(%stage, elapsed_ms = duration.as_millis() as u64, "Stage succeeded");
            }
            ProgressEvent::StageFailed { stage, reason, .. } => {
                warn!(%stage, %reason, "Stage did not succeed; remaining stages skipped");
            }
            ProgressEvent::IdentifierScraped { strategy, identifier } => {
                info!(%strategy, %identifier, "Scraped published identifier");
            }
            ProgressEvent::Completed { total_time } => {
                info!(elapsed_ms = total_time.as_millis() as u64, "Publish finished");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_failed_run_sequence() {
        let stages = ["install", "build"];
        let handler = LoggingHandler;

        handler.on_progress(&ProgressEvent::PipelineStarted {
            root: "/tmp/site".to_string(),
            stage_count: stages.len(),
        });
        for (index, stage) in stages.iter().enumerate() {
            handler.on_progress(&ProgressEvent::StageStarted {
                stage: stage.to_string(),
                index,
                total: stages.len(),
            });
        }
        handler.on_progress(&ProgressEvent::StageCompleted {
            stage: "install".to_string(),
            index: 0,
            duration: Duration::from_millis(40),
        });
        handler.on_progress(&ProgressEvent::StageFailed {
            stage: "build".to_string(),
            index: 1,
            reason: "Timed out after 600s".to_string(),
        });
    }
}
