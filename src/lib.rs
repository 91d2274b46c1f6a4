//! sitesmith - prompt-to-site generation and publishing
//!
//! This library turns a natural-language description into a complete web
//! project and publishes it through an external build/publish toolchain.
//!
//! # Pipeline
//!
//! - **Completion client**: sends prompts to a language-model backend and
//!   retries transient failures exactly once, escalating to structured output
//! - **Normalization**: turns free-form model output into a canonical
//!   [`FileSet`] using an ordered list of parse strategies
//! - **Materialization**: writes a file set beneath a workspace root, refusing
//!   any path that would escape it
//! - **Deployment**: runs declarative pipeline stages as child processes and
//!   scrapes the published identifier from the final stage's output
//!
//! # Example
//!
//! ```no_run
//! use sitesmith::normalize;
//!
//! let files = normalize::normalize(r#"{"files": [{"filename": "index.html", "content": "<h1>Hi</h1>"}]}"#)?;
//! assert_eq!(files.paths(), vec!["index.html"]);
//! # Ok::<(), sitesmith::NormalizeError>(())
//! ```
//!
//! # Modules
//!
//! - [`completion`]: completion client and transient-error classifier
//! - [`normalize`]: response normalizer
//! - [`generation`]: generation and refinement orchestrators
//! - [`workspace`]: workspace materializer
//! - [`deploy`]: deployment pipeline, stage runner and deploy profiles
//! - [`service`]: end-to-end site service

pub mod cli;
pub mod collab;
pub mod completion;
pub mod config;
pub mod deploy;
pub mod files;
pub mod generation;
pub mod llm;
pub mod normalize;
pub mod progress;
pub mod service;
pub mod util;
pub mod workspace;

pub use completion::{CompletionClient, CompletionError, CompletionRequest, ResponseMode};
pub use config::{ConfigError, SitesmithConfig};
pub use deploy::{DeploymentPipeline, PipelineError, PipelineStage, PublishResult, ScrapeStrategy};
pub use files::{FileDescriptor, FileSet};
pub use generation::{GenerateError, Generator, ProjectId, RefineError, Refiner};
pub use llm::{BackendError, LLMClient};
pub use normalize::{NormalizeError, Normalizer};
pub use service::{ServiceError, SiteService};
pub use util::{init_from_env, init_logging, LoggingConfig};
pub use workspace::{MaterializeError, Materializer};

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name, also the binary name
pub const NAME: &str = env!("CARGO_PKG_NAME");
