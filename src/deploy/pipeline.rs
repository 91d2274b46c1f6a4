use super::runner::{StageFailure, StageOutput, StageRunner};
use super::scrape::{scrape_identifier, ScrapeStrategy};
use super::stage::PipelineStage;
use crate::progress::{NoOpHandler, ProgressEvent, ProgressHandler};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(600);

/// Lifecycle of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Running(usize),
    Failed(usize),
    Succeeded,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Failed(_) | PipelineState::Succeeded)
    }

    /// Moves to the next stage, or to `Succeeded` after the last one.
    fn advance(self, stage_count: usize) -> Self {
        match self {
            PipelineState::Idle if stage_count > 0 => PipelineState::Running(0),
            PipelineState::Running(i) if i + 1 < stage_count => PipelineState::Running(i + 1),
            PipelineState::Running(_) => PipelineState::Succeeded,
            other => other,
        }
    }

    fn fail(self) -> Self {
        match self {
            PipelineState::Running(i) => PipelineState::Failed(i),
            other => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishResult {
    pub identifier: String,
    /// Stage whose output carried the identifier
    pub stage: String,
    pub strategy: String,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Deployment pipeline has no stages")]
    NoStages,

    #[error("Stage '{stage}' failed: {failure}{}", stderr_suffix(.stderr))]
    StageFailed {
        stage: String,
        index: usize,
        #[source]
        failure: StageFailure,
        /// Captured standard error of the failing stage, verbatim
        stderr: String,
    },

    #[error("No published identifier found in output of stage '{stage}' (tried {})", .strategies.join(", "))]
    IdentifierNotFound {
        stage: String,
        strategies: Vec<String>,
    },
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("\nstderr:\n{}", trimmed)
    }
}

impl PipelineError {
    pub fn stage(&self) -> Option<&str> {
        match self {
            PipelineError::NoStages => None,
            PipelineError::StageFailed { stage, .. } | PipelineError::IdentifierNotFound { stage, .. } => {
                Some(stage)
            }
        }
    }
}

/// Runs deployment stages in order and scrapes the published identifier.
pub struct DeploymentPipeline {
    runner: Arc<dyn StageRunner>,
    scrape: Vec<ScrapeStrategy>,
    stage_timeout: Duration,
    progress: Arc<dyn ProgressHandler>,
}

impl DeploymentPipeline {
    pub fn new(runner: Arc<dyn StageRunner>, scrape: Vec<ScrapeStrategy>) -> Self {
        Self {
            runner,
            scrape,
            stage_timeout: DEFAULT_STAGE_TIMEOUT,
            progress: Arc::new(NoOpHandler),
        }
    }

    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = timeout;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressHandler>) -> Self {
        self.progress = progress;
        self
    }

    pub fn scrape_strategies(&self) -> &[ScrapeStrategy] {
        &self.scrape
    }

    /// Runs `stages` against `root`.
    ///
    /// Stages run strictly in order; the first failure ends the run and later
    /// stages never start. Success of the last stage is not enough: its stdout
    /// must also yield an identifier.
    pub async fn publish(
        &self,
        root: &Path,
        stages: &[PipelineStage],
        cancel: &CancellationToken,
    ) -> Result<PublishResult, PipelineError> {
        if stages.is_empty() {
            return Err(PipelineError::NoStages);
        }

        let start = Instant::now();
        let total = stages.len();
        let mut state = PipelineState::Idle;
        let mut last_stdout = String::new();

        self.progress.on_progress(&ProgressEvent::PipelineStarted {
            root: root.display().to_string(),
            stage_count: total,
        });

        for (index, stage) in stages.iter().enumerate() {
            state = state.advance(total);
            debug!(?state, stage = %stage.name, "Pipeline transition");

            self.progress.on_progress(&ProgressEvent::StageStarted {
                stage: stage.name.clone(),
                index,
                total,
            });

            let stage_start = Instant::now();
            let cwd = stage.resolve_working_directory(root);
            let timeout = stage.timeout.unwrap_or(self.stage_timeout);

            let outcome = match self.runner.run(stage, &cwd, timeout, cancel).await {
                Ok(output) => check_output(stage, &cwd, output).await,
                Err(failure) => Err((failure, String::new())),
            };

            match outcome {
                Ok(stdout) => {
                    self.progress.on_progress(&ProgressEvent::StageCompleted {
                        stage: stage.name.clone(),
                        index,
                        duration: stage_start.elapsed(),
                    });
                    last_stdout = stdout;
                }
                Err((failure, stderr)) => {
                    state = state.fail();
                    error!(
                        ?state,
                        stage = %stage.name,
                        command = %stage.command_line(),
                        error = %failure,
                        stderr = %stderr,
                        "Deployment stage failed"
                    );
                    self.progress.on_progress(&ProgressEvent::StageFailed {
                        stage: stage.name.clone(),
                        index,
                        reason: failure.to_string(),
                    });
                    return Err(PipelineError::StageFailed {
                        stage: stage.name.clone(),
                        index,
                        failure,
                        stderr,
                    });
                }
            }
        }

        let final_stage = stages[total - 1].name.clone();
        let Some((strategy, identifier)) = scrape_identifier(&last_stdout, &self.scrape) else {
            error!(stage = %final_stage, stdout = %last_stdout, "Final stage output carried no identifier");
            return Err(PipelineError::IdentifierNotFound {
                stage: final_stage,
                strategies: self.scrape.iter().map(ToString::to_string).collect(),
            });
        };

        state = state.advance(total);
        debug!(?state, "Pipeline transition");

        self.progress.on_progress(&ProgressEvent::IdentifierScraped {
            strategy: strategy.to_string(),
            identifier: identifier.clone(),
        });
        self.progress.on_progress(&ProgressEvent::Completed {
            total_time: start.elapsed(),
        });
        info!(identifier = %identifier, stage = %final_stage, "Deployment published");

        Ok(PublishResult {
            identifier,
            stage: final_stage,
            strategy: strategy.to_string(),
            published_at: Utc::now(),
        })
    }
}

impl std::fmt::Debug for DeploymentPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeploymentPipeline")
            .field("scrape", &self.scrape)
            .field("stage_timeout", &self.stage_timeout)
            .finish()
    }
}

/// Stage stdout on success, otherwise the failure and captured stderr.
async fn check_output(
    stage: &PipelineStage,
    cwd: &Path,
    output: StageOutput,
) -> Result<String, (StageFailure, String)> {
    if !output.success() {
        return Err((output.termination.into(), output.stderr));
    }

    if let Some(expected) = &stage.expect_path {
        let path = cwd.join(expected);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err((StageFailure::MissingOutput { path }, output.stderr));
        }
    }

    Ok(output.stdout)
}
