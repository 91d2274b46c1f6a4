//! Downstream collaborator interfaces
//!
//! Persistence, access-policy registration and ownership verification are
//! provided by external services. This module defines the narrow interfaces
//! the site service calls, plus [`FsProjectStore`], a filesystem-backed
//! project store for local use.

mod fs_store;

pub use fs_store::FsProjectStore;

use crate::files::FileSet;
use crate::generation::ProjectId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollabError {
    #[error("Project not found: {0}")]
    ProjectNotFound(ProjectId),

    #[error("Project store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stored project is corrupt: {0}")]
    Corrupt(String),

    #[error("Refusing to store path outside the project root: {0}")]
    InvalidPath(String),

    #[error("{service} service error: {message}")]
    Service { service: String, message: String },
}

/// Who may access a published artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipCriteria {
    pub asset_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
}

#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn save(&self, project_id: ProjectId, files: &FileSet) -> Result<(), CollabError>;

    async fn load(&self, project_id: ProjectId) -> Result<FileSet, CollabError>;

    /// Text excerpt of the files most relevant to `query`.
    async fn load_relevant(&self, project_id: ProjectId, query: &str)
        -> Result<String, CollabError>;
}

#[async_trait]
pub trait PolicyRegistry: Send + Sync {
    async fn register_policy(
        &self,
        identifier: &str,
        criteria: &OwnershipCriteria,
    ) -> Result<(), CollabError>;
}

#[async_trait]
pub trait OwnershipVerifier: Send + Sync {
    async fn verify_ownership(
        &self,
        wallet_address: &str,
        asset_type: &str,
    ) -> Result<bool, CollabError>;
}
