//! Deployment pipeline
//!
//! A deployment is a declarative list of [`PipelineStage`]s run one after
//! another against a materialized workspace by a [`StageRunner`]. The final
//! stage's stdout is scanned with an ordered list of [`ScrapeStrategy`]s to
//! find the published identifier. [`DeployProfile`] provides the stage lists
//! for the supported publishing toolchains.

mod pipeline;
mod profile;
mod runner;
mod scrape;
mod stage;

pub use pipeline::{
    DeploymentPipeline, PipelineError, PipelineState, PublishResult, DEFAULT_STAGE_TIMEOUT,
};
pub use profile::{
    DeployProfile, DeployProfileKind, BLOB_ID_MARKER, CONTENT_SCHEME, SITE_OBJECT_MARKER,
};
pub use runner::{ProcessStageRunner, StageFailure, StageOutput, StageRunner, Termination};
pub use scrape::{scrape_identifier, ScrapeStrategy};
pub use stage::PipelineStage;

use std::sync::Arc;

impl DeploymentPipeline {
    /// Pipeline running real processes with the profile's scrape strategies and timeout.
    pub fn for_profile(profile: &DeployProfile) -> Self {
        Self::new(Arc::new(ProcessStageRunner::new()), profile.scrape.clone())
            .with_stage_timeout(profile.stage_timeout)
    }
}
