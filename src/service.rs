//! Site service orchestration
//!
//! [`SiteService`] composes the pieces of a request end to end:
//!
//! 1. Verifies wallet ownership when access control is configured
//! 2. Generates the project files
//! 3. Saves them to the project store
//! 4. Materializes them into `<workspace_dir>/<project_id>`
//! 5. Publishes the workspace through the deployment pipeline
//! 6. Registers an access policy for the published identifier
//!
//! Errors carry full diagnostics for operators. Callers outside the trust
//! boundary should only ever see [`ServiceError::public_message`].
//!
//! # Example
//!
//! ```no_run
//! use sitesmith::service::{SiteRequest, SiteService};
//! use sitesmith::SitesmithConfig;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SitesmithConfig::load(None)?;
//! let service = SiteService::from_config(&config)?;
//!
//! let outcome = service
//!     .create_site(&SiteRequest::new("A portfolio site for a ceramic artist"), &CancellationToken::new())
//!     .await?;
//! println!("Project: {}", outcome.project_id);
//! # Ok(())
//! # }
//! ```

use crate::collab::{
    CollabError, FsProjectStore, OwnershipCriteria, OwnershipVerifier, PolicyRegistry,
    ProjectStore,
};
use crate::completion::{CompletionClient, CompletionError};
use crate::config::{ConfigError, SitesmithConfig};
use crate::deploy::{DeployProfile, DeploymentPipeline, PipelineError, PublishResult, StageFailure};
use crate::files::FileSet;
use crate::generation::{
    GenerateError, GenerateFailure, GenerationParams, Generator, ProjectId, RefineError, Refiner,
};
use crate::progress::ProgressHandler;
use crate::workspace::{ensure_contained, MaterializeError, MaterializeReport, Materializer};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("A wallet address is required to create a {asset_type} site")]
    WalletRequired { asset_type: String },

    #[error("Wallet {wallet} does not hold a {asset_type} asset")]
    AccessDenied { wallet: String, asset_type: String },

    #[error(transparent)]
    Generate(#[from] GenerateError),

    #[error(transparent)]
    Refine(#[from] RefineError),

    #[error("Collaborator error: {0}")]
    Collab(#[from] CollabError),

    #[error(transparent)]
    Materialize(#[from] MaterializeError),

    #[error(transparent)]
    Publish(#[from] PipelineError),
}

impl ServiceError {
    /// True when the caller's cancellation context ended the request.
    pub fn is_cancelled(&self) -> bool {
        match self {
            ServiceError::Generate(GenerateError {
                reason: GenerateFailure::Completion(CompletionError::Cancelled),
                ..
            })
            | ServiceError::Refine(RefineError::Completion(CompletionError::Cancelled)) => true,
            ServiceError::Publish(PipelineError::StageFailed { failure, .. }) => {
                matches!(failure, StageFailure::Cancelled)
            }
            _ => false,
        }
    }

    /// Caller-safe message; never includes model output or tool diagnostics.
    pub fn public_message(&self) -> &'static str {
        if self.is_cancelled() {
            return "The request was cancelled.";
        }
        match self {
            ServiceError::WalletRequired { .. } => "A wallet address is required.",
            ServiceError::AccessDenied { .. } => "Access denied.",
            ServiceError::Refine(_) => "Failed to refine the project. Please try again later.",
            ServiceError::Collab(CollabError::ProjectNotFound(_)) => "Project not found.",
            _ => "Failed to create the site. Please try again later.",
        }
    }

    /// Operator-facing message with troubleshooting hints
    pub fn help_message(&self) -> String {
        match self {
            ServiceError::Config(e) => format!(
                "Error: Invalid configuration\n\n\
                Help: Check the config file and SITESMITH_* environment variables.\n\
                Run `sitesmith --help` for the supported options.\n\n\
                Details: {}",
                e
            ),
            ServiceError::WalletRequired { asset_type } => format!(
                "Error: Wallet address missing\n\n\
                Help: Access control is enabled for asset type '{}'.\n\
                Pass the owner's wallet with --wallet <ADDRESS>.",
                asset_type
            ),
            ServiceError::AccessDenied { wallet, asset_type } => format!(
                "Error: Ownership check failed\n\n\
                Help: Wallet {} does not hold an asset of type '{}'.\n\
                Verify SITESMITH_ASSET_TYPE matches the asset the wallet owns.",
                wallet, asset_type
            ),
            ServiceError::Generate(e) if e.is_empty_generation() => format!(
                "Error: The model returned no files\n\n\
                Help: Try a more specific prompt, or a different model via SITESMITH_MODEL.\n\n\
                Details: {}",
                e
            ),
            ServiceError::Generate(e) => format!(
                "Error: Generation failed\n\n\
                Help: Try:\n\
                - Check the provider credentials for SITESMITH_PROVIDER\n\
                - Re-run with --log-level debug to see the raw model output\n\n\
                Details: {}",
                e
            ),
            ServiceError::Refine(e) => format!(
                "Error: Refinement failed\n\n\
                Help: Re-run with --log-level debug to see the raw model output.\n\n\
                Details: {}",
                e
            ),
            ServiceError::Collab(CollabError::ProjectNotFound(id)) => format!(
                "Error: Project {} not found\n\n\
                Help: Projects are read from the store directory (SITESMITH_STORE_DIR).\n\
                Check that the id is correct and the store directory has not moved.",
                id
            ),
            ServiceError::Collab(e) => format!("Error: Collaborator service failed\n\nDetails: {}", e),
            ServiceError::Materialize(e) => format!(
                "Error: Could not write the workspace\n\n\
                Help: Check that SITESMITH_WORKSPACE_DIR is writable.\n\n\
                Details: {}",
                e
            ),
            ServiceError::Publish(e) => format!(
                "Error: Deployment failed\n\n\
                Help: Try:\n\
                - Check that the deployment tools are installed (SITE_BUILDER_PATH, WALRUS_CLI_PATH)\n\
                - Run `sitesmith publish <DIR>` against the workspace to reproduce\n\n\
                Details: {}",
                e
            ),
        }
    }
}

/// Ownership gate and policy registration for published sites.
#[derive(Clone)]
pub struct AccessControl {
    pub asset_type: String,
    pub verifier: Option<Arc<dyn OwnershipVerifier>>,
    pub registry: Option<Arc<dyn PolicyRegistry>>,
}

impl AccessControl {
    pub fn new(asset_type: impl Into<String>) -> Self {
        Self {
            asset_type: asset_type.into(),
            verifier: None,
            registry: None,
        }
    }

    pub fn with_verifier(mut self, verifier: Arc<dyn OwnershipVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    pub fn with_registry(mut self, registry: Arc<dyn PolicyRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }
}

#[derive(Debug, Clone)]
pub struct SiteRequest {
    pub prompt: String,
    pub wallet_address: Option<String>,
    /// Run the deployment pipeline after materializing
    pub deploy: bool,
}

impl SiteRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            wallet_address: None,
            deploy: true,
        }
    }

    pub fn with_wallet(mut self, wallet: impl Into<String>) -> Self {
        self.wallet_address = Some(wallet.into());
        self
    }

    pub fn without_deploy(mut self) -> Self {
        self.deploy = false;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SiteOutcome {
    pub project_id: ProjectId,
    pub workspace: PathBuf,
    pub files: MaterializeReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish: Option<PublishResult>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefineOutcome {
    pub project_id: ProjectId,
    pub files: FileSet,
    /// Present when the changes were written to the workspace
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied: Option<MaterializeReport>,
}

pub struct SiteService {
    generator: Generator,
    refiner: Refiner,
    store: Arc<dyn ProjectStore>,
    materializer: Materializer,
    pipeline: DeploymentPipeline,
    profile: DeployProfile,
    workspace_dir: PathBuf,
    access: Option<AccessControl>,
}

impl SiteService {
    pub fn new(
        completion: CompletionClient,
        params: GenerationParams,
        store: Arc<dyn ProjectStore>,
        pipeline: DeploymentPipeline,
        profile: DeployProfile,
        workspace_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            generator: Generator::new(completion.clone(), params),
            refiner: Refiner::new(completion, params),
            store,
            materializer: Materializer::new(),
            pipeline,
            profile,
            workspace_dir: workspace_dir.into(),
            access: None,
        }
    }

    /// Wires the genai backend, filesystem store and process runner from configuration.
    ///
    /// Access control is left unset: verifier and registry services are
    /// external and must be supplied with [`SiteService::with_access`].
    pub fn from_config(config: &SitesmithConfig) -> Result<Self, ServiceError> {
        config.validate()?;

        let completion =
            CompletionClient::with_policy(config.create_llm_client()?, config.retry_policy());
        let store = Arc::new(FsProjectStore::new(
            config.store_dir.clone(),
            config.max_context_size,
        ));
        let profile = DeployProfile::from_config(&config.deploy)?;
        let pipeline = DeploymentPipeline::for_profile(&profile);

        info!(
            provider = %config.provider,
            model = %config.model,
            profile = %profile.kind,
            "Site service initialized"
        );

        Ok(Self::new(
            completion,
            config.generation_params(),
            store,
            pipeline,
            profile,
            config.workspace_dir.clone(),
        ))
    }

    pub fn with_access(mut self, access: AccessControl) -> Self {
        self.access = Some(access);
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressHandler>) -> Self {
        self.pipeline = self.pipeline.with_progress(progress);
        self
    }

    pub fn profile(&self) -> &DeployProfile {
        &self.profile
    }

    pub fn workspace_for(&self, project_id: ProjectId) -> PathBuf {
        self.workspace_dir.join(project_id.to_string())
    }

    /// Generates, stores, materializes and (optionally) publishes a new site.
    pub async fn create_site(
        &self,
        request: &SiteRequest,
        cancel: &CancellationToken,
    ) -> Result<SiteOutcome, ServiceError> {
        let start = Instant::now();

        self.check_ownership(request.wallet_address.as_deref()).await?;

        let generation = self
            .generator
            .generate(&request.prompt, cancel)
            .await
            .map_err(|e| {
                error!(project_id = %e.project_id, error = %e, "Site generation failed");
                e
            })?;
        let project_id = generation.project_id;

        // Nothing is stored or written unless every path stays inside the project.
        ensure_contained(&generation.files).map_err(|e| {
            error!(%project_id, error = %e, "Generated file set rejected");
            e
        })?;
        self.store.save(project_id, &generation.files).await?;

        let workspace = self.workspace_for(project_id);
        let report = self
            .materializer
            .materialize(&generation.files, &workspace)
            .await
            .map_err(|e| {
                error!(%project_id, error = %e, "Workspace materialization failed");
                e
            })?;

        let publish = if request.deploy {
            let result = self.publish_directory(&workspace, cancel).await?;
            self.register_policy(&result.identifier, request.wallet_address.as_deref())
                .await?;
            Some(result)
        } else {
            None
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            %project_id,
            files = report.files.len(),
            identifier = publish.as_ref().map(|p| p.identifier.as_str()).unwrap_or("-"),
            duration_ms,
            "Site created"
        );

        Ok(SiteOutcome {
            project_id,
            workspace,
            files: report,
            publish,
            duration_ms,
        })
    }

    /// Asks for changes to a stored project; with `apply`, writes them to
    /// its workspace and updates the store.
    pub async fn refine_project(
        &self,
        project_id: ProjectId,
        query: &str,
        apply: bool,
        cancel: &CancellationToken,
    ) -> Result<RefineOutcome, ServiceError> {
        let context = self.store.load_relevant(project_id, query).await?;
        let changes = self.refiner.refine(&context, query, cancel).await?;

        let applied = if apply && !changes.is_empty() {
            ensure_contained(&changes).map_err(|e| {
                error!(%project_id, error = %e, "Refinement changes rejected");
                e
            })?;
            let mut merged = self.store.load(project_id).await?;
            for file in changes.iter().cloned() {
                merged.insert(file);
            }
            self.store.save(project_id, &merged).await?;

            let report = self
                .materializer
                .materialize(&changes, &self.workspace_for(project_id))
                .await?;
            Some(report)
        } else {
            None
        };

        info!(
            %project_id,
            changed = changes.len(),
            applied = applied.is_some(),
            "Project refined"
        );

        Ok(RefineOutcome {
            project_id,
            files: changes,
            applied,
        })
    }

    /// Runs the configured profile's stages against an existing directory.
    pub async fn publish_directory(
        &self,
        root: &Path,
        cancel: &CancellationToken,
    ) -> Result<PublishResult, ServiceError> {
        Ok(self
            .pipeline
            .publish(root, &self.profile.stages, cancel)
            .await?)
    }

    async fn check_ownership(&self, wallet: Option<&str>) -> Result<(), ServiceError> {
        let Some(access) = &self.access else {
            return Ok(());
        };
        let Some(verifier) = &access.verifier else {
            return Ok(());
        };

        let wallet = wallet.ok_or_else(|| ServiceError::WalletRequired {
            asset_type: access.asset_type.clone(),
        })?;

        if !verifier.verify_ownership(wallet, &access.asset_type).await? {
            warn!(wallet, asset_type = %access.asset_type, "Ownership verification failed");
            return Err(ServiceError::AccessDenied {
                wallet: wallet.to_string(),
                asset_type: access.asset_type.clone(),
            });
        }
        Ok(())
    }

    async fn register_policy(
        &self,
        identifier: &str,
        wallet: Option<&str>,
    ) -> Result<(), ServiceError> {
        let Some(access) = &self.access else {
            return Ok(());
        };
        let Some(registry) = &access.registry else {
            return Ok(());
        };

        let criteria = OwnershipCriteria {
            asset_type: access.asset_type.clone(),
            wallet_address: wallet.map(str::to_string),
        };
        registry.register_policy(identifier, &criteria).await?;
        info!(identifier, asset_type = %criteria.asset_type, "Access policy registered");
        Ok(())
    }
}

impl std::fmt::Debug for SiteService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteService")
            .field("profile", &self.profile.kind)
            .field("workspace_dir", &self.workspace_dir)
            .field("access", &self.access.as_ref().map(|a| &a.asset_type))
            .finish()
    }
}
