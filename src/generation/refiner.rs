use super::prompts::{refinement_prompt, REFINEMENT_SYSTEM_PROMPT};
use super::GenerationParams;
use crate::completion::{CompletionClient, CompletionError, CompletionRequest, ResponseMode};
use crate::files::FileSet;
use crate::normalize::{NormalizeError, Normalizer};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum RefineError {
    #[error("Refinement request failed: {0}")]
    Completion(#[from] CompletionError),

    #[error("Refinement output could not be parsed: {0}")]
    Parse(#[from] NormalizeError),
}

/// Asks the completion service for incremental changes to an existing project.
#[derive(Debug, Clone)]
pub struct Refiner {
    completion: CompletionClient,
    normalizer: Normalizer,
    params: GenerationParams,
}

impl Refiner {
    pub fn new(completion: CompletionClient, params: GenerationParams) -> Self {
        Self {
            completion,
            normalizer: Normalizer::refinement(),
            params,
        }
    }

    /// Returns new or changed files; an empty set means nothing needs to change.
    pub async fn refine(
        &self,
        context: &str,
        change_request: &str,
        cancel: &CancellationToken,
    ) -> Result<FileSet, RefineError> {
        let request = self
            .params
            .apply(CompletionRequest::new(refinement_prompt(
                change_request,
                context,
            )))
            .with_system(REFINEMENT_SYSTEM_PROMPT)
            .with_mode(ResponseMode::Structured);

        let raw = self.completion.complete(request, cancel).await?;

        let files = self.normalizer.normalize(&raw).map_err(|e| {
            warn!(raw = %raw, "Refinement output could not be normalized");
            e
        })?;

        if files.is_empty() {
            info!("Refinement reported no changes");
        } else {
            info!(file_count = files.len(), "Refinement produced changes");
        }
        Ok(files)
    }
}
