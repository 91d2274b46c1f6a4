use super::prompts::{generation_prompt, GENERATION_SYSTEM_PROMPT};
use super::{GenerationParams, ProjectId};
use crate::completion::{CompletionClient, CompletionError, CompletionRequest, ResponseMode};
use crate::files::FileSet;
use crate::normalize::{NormalizeError, Normalizer};
use std::time::Instant;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Result of a successful generation.
#[derive(Debug, Clone)]
pub struct Generation {
    pub project_id: ProjectId,
    pub files: FileSet,
}

#[derive(Debug, Error)]
pub enum GenerateFailure {
    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error(transparent)]
    Parse(#[from] NormalizeError),

    #[error("Model output parsed but contained no files")]
    EmptyGeneration,
}

/// Generation failure, tagged with the project id minted for the request.
#[derive(Debug, Error)]
#[error("Generation {project_id} failed: {reason}")]
pub struct GenerateError {
    pub project_id: ProjectId,
    #[source]
    pub reason: GenerateFailure,
}

impl GenerateError {
    pub fn is_empty_generation(&self) -> bool {
        matches!(self.reason, GenerateFailure::EmptyGeneration)
    }
}

/// Turns a project description into a complete file set.
#[derive(Debug, Clone)]
pub struct Generator {
    completion: CompletionClient,
    normalizer: Normalizer,
    params: GenerationParams,
}

impl Generator {
    pub fn new(completion: CompletionClient, params: GenerationParams) -> Self {
        Self {
            completion,
            normalizer: Normalizer::generation(),
            params,
        }
    }

    /// Generates files for `description` under a freshly minted project id.
    pub async fn generate(
        &self,
        description: &str,
        cancel: &CancellationToken,
    ) -> Result<Generation, GenerateError> {
        let project_id = ProjectId::new();
        self.generate_as(project_id, description, cancel).await
    }

    /// Generates files under a caller-supplied project id.
    pub async fn generate_as(
        &self,
        project_id: ProjectId,
        description: &str,
        cancel: &CancellationToken,
    ) -> Result<Generation, GenerateError> {
        let start = Instant::now();
        info!(%project_id, "Starting site generation");

        let fail = |reason: GenerateFailure| GenerateError { project_id, reason };

        let request = self
            .params
            .apply(CompletionRequest::new(generation_prompt(description)))
            .with_system(GENERATION_SYSTEM_PROMPT)
            .with_mode(ResponseMode::FreeForm);

        let raw = self
            .completion
            .complete(request, cancel)
            .await
            .map_err(|e| fail(e.into()))?;
        debug!(%project_id, raw_len = raw.len(), "Raw generation output received");

        let files = self.normalizer.normalize(&raw).map_err(|e| {
            warn!(%project_id, raw = %raw, "Generation output could not be normalized");
            fail(e.into())
        })?;

        if files.is_empty() {
            warn!(%project_id, "Generation produced an empty file set");
            return Err(fail(GenerateFailure::EmptyGeneration));
        }

        info!(
            %project_id,
            file_count = files.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Site generation complete"
        );
        Ok(Generation { project_id, files })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::RetryPolicy;
    use crate::llm::{MockLLMClient, MockResponse};
    use std::sync::Arc;

    fn generator(mock: &Arc<MockLLMClient>) -> Generator {
        Generator::new(
            CompletionClient::with_policy(mock.clone(), RetryPolicy::immediate()),
            GenerationParams::default(),
        )
    }

    #[tokio::test]
    async fn test_generate_returns_files() {
        let mock = Arc::new(MockLLMClient::new());
        mock.add_response(MockResponse::text(
            "```json\n[{\"filename\": \"index.html\", \"type\": \"html\", \"content\": \"<h1/>\"}]\n```",
        ));

        let generation = generator(&mock)
            .generate("a landing page", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(generation.files.paths(), vec!["index.html"]);
        let request = &mock.requests()[0];
        assert!(!request.json_mode);
        assert!(request.messages[1].content.contains("a landing page"));
    }

    #[tokio::test]
    async fn test_empty_array_is_empty_generation() {
        let mock = Arc::new(MockLLMClient::new());
        mock.add_response(MockResponse::text("[]"));

        let err = generator(&mock)
            .generate("anything", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(err.is_empty_generation());
    }

    #[tokio::test]
    async fn test_parse_failure_keeps_project_id() {
        let mock = Arc::new(MockLLMClient::new());
        mock.add_response(MockResponse::text("Sure! Here is your site."));
        let project_id = ProjectId::new();

        let err = generator(&mock)
            .generate_as(project_id, "anything", &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.project_id, project_id);
        assert!(matches!(err.reason, GenerateFailure::Parse(_)));
    }
}
