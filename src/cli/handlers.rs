//! Command handlers
//!
//! Each handler runs one subcommand and returns the process exit code.
//! Results go to stdout; diagnostics go to stderr.

use super::commands::{CliArgs, GenerateArgs, NormalizeArgs, PublishArgs, RefineArgs};
use super::output::{OutputFormat, OutputFormatter};
use crate::config::SitesmithConfig;
use crate::deploy::{DeployProfile, DeploymentPipeline};
use crate::normalize::Normalizer;
use crate::progress::LoggingHandler;
use crate::service::{ServiceError, SiteRequest, SiteService};
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_CONFIG: i32 = 2;
pub const EXIT_CANCELLED: i32 = 130;

/// Settings shared by every subcommand.
pub struct CliContext {
    pub config: SitesmithConfig,
    pub formatter: OutputFormatter,
    pub quiet: bool,
}

impl CliContext {
    pub fn from_args(args: &CliArgs) -> Result<Self> {
        let config = SitesmithConfig::load(args.config.as_deref())
            .context("Failed to load configuration")?;
        config.validate().context("Invalid configuration")?;
        debug!("{}", config);

        Ok(Self {
            config,
            formatter: OutputFormatter::new(OutputFormat::from(args.format)),
            quiet: args.quiet,
        })
    }

    fn service(&self) -> Result<SiteService, ServiceError> {
        let service = SiteService::from_config(&self.config)?;
        Ok(if self.quiet {
            service
        } else {
            service.with_progress(Arc::new(LoggingHandler))
        })
    }
}

fn print_output(rendered: Result<String>) -> i32 {
    match rendered {
        Ok(text) => {
            print!("{}", text);
            if !text.ends_with('\n') {
                println!();
            }
            EXIT_SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            EXIT_FAILURE
        }
    }
}

fn report_service_error(e: &ServiceError) -> i32 {
    error!(error = %e, "Command failed");
    eprintln!("{}", e.help_message());
    if e.is_cancelled() {
        EXIT_CANCELLED
    } else if matches!(e, ServiceError::Config(_)) {
        EXIT_CONFIG
    } else {
        EXIT_FAILURE
    }
}

pub async fn handle_generate(args: &GenerateArgs, ctx: &CliContext, cancel: &CancellationToken) -> i32 {
    let service = match ctx.service() {
        Ok(service) => service,
        Err(e) => return report_service_error(&e),
    };

    let mut request = SiteRequest::new(&args.prompt);
    if let Some(wallet) = &args.wallet {
        request = request.with_wallet(wallet);
    }
    if args.no_deploy {
        request = request.without_deploy();
    }

    match service.create_site(&request, cancel).await {
        Ok(outcome) => print_output(ctx.formatter.format_site(&outcome)),
        Err(e) => report_service_error(&e),
    }
}

pub async fn handle_refine(args: &RefineArgs, ctx: &CliContext, cancel: &CancellationToken) -> i32 {
    let service = match ctx.service() {
        Ok(service) => service,
        Err(e) => return report_service_error(&e),
    };

    match service
        .refine_project(args.project_id, &args.query, args.apply, cancel)
        .await
    {
        Ok(outcome) => print_output(ctx.formatter.format_refinement(&outcome)),
        Err(e) => report_service_error(&e),
    }
}

pub async fn handle_publish(args: &PublishArgs, ctx: &CliContext, cancel: &CancellationToken) -> i32 {
    if !args.directory.is_dir() {
        eprintln!(
            "Error: Directory not found\nPath: {}\n\n\
            Help: Pass the directory that holds the site sources.",
            args.directory.display()
        );
        return EXIT_FAILURE;
    }

    let mut deploy = ctx.config.deploy.clone();
    if let Some(kind) = args.profile {
        deploy.profile = kind;
    }
    let profile = match DeployProfile::from_config(&deploy) {
        Ok(profile) => profile,
        Err(e) => return report_service_error(&ServiceError::Config(e)),
    };

    let mut pipeline = DeploymentPipeline::for_profile(&profile);
    if !ctx.quiet {
        pipeline = pipeline.with_progress(Arc::new(LoggingHandler));
    }

    match pipeline.publish(&args.directory, &profile.stages, cancel).await {
        Ok(result) => print_output(ctx.formatter.format_publish(&result)),
        Err(e) => report_service_error(&ServiceError::Publish(e)),
    }
}

pub async fn handle_normalize(args: &NormalizeArgs, ctx: &CliContext) -> i32 {
    let raw = match read_input(args.input.as_deref()).await {
        Ok(raw) => raw,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return EXIT_FAILURE;
        }
    };

    let normalizer = if args.refinement {
        Normalizer::refinement()
    } else {
        Normalizer::generation()
    };

    match normalizer.normalize(&raw) {
        Ok(files) => print_output(ctx.formatter.format_files(&files)),
        Err(e) => {
            eprintln!("Error: {}", e);
            for attempt in e.attempts() {
                eprintln!("  - {}: {}", attempt.strategy, attempt.error);
            }
            eprintln!("Input starts with: {:?}", e.excerpt());
            EXIT_FAILURE
        }
    }
}

async fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut raw = String::new();
            tokio::io::stdin()
                .read_to_string(&mut raw)
                .await
                .context("Failed to read standard input")?;
            Ok(raw)
        }
    }
}
