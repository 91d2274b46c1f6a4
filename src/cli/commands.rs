use crate::deploy::DeployProfileKind;
use crate::generation::ProjectId;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Prompt-to-site generator
#[derive(Parser, Debug)]
#[command(
    name = "sitesmith",
    about = "Generate, refine and publish static sites from a prompt",
    version,
    author,
    long_about = "sitesmith asks a language model for a complete project, normalizes the \
                  returned file list, writes it to a workspace and publishes it through an \
                  external build/publish toolchain (site-builder or a content-publish CLI)."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        short = 'c',
        long,
        global = true,
        value_name = "FILE",
        help = "Config file (.yaml, .yml or .toml)"
    )]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, value_name = "LEVEL", help = "trace, debug, info, warn or error")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Verbose logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Only log errors and skip progress output"
    )]
    pub quiet: bool,

    #[arg(
        short = 'f',
        long,
        global = true,
        value_enum,
        default_value = "human",
        help = "How results are printed on stdout"
    )]
    pub format: OutputFormatArg,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Generate a new site from a description",
        long_about = "Generates a complete project from a description, stores it, writes it to \
                      a fresh workspace and publishes it with the configured deploy profile.\n\n\
                      Examples:\n  \
                      sitesmith generate \"A landing page for a coffee roaster\"\n  \
                      sitesmith generate \"A recipe blog\" --no-deploy\n  \
                      sitesmith generate \"Members area\" --wallet 0x12ab"
    )]
    Generate(GenerateArgs),

    #[command(
        about = "Request changes to an existing project",
        long_about = "Sends the files most relevant to the query, together with the query, \
                      to the model and prints the changed files.\n\n\
                      Examples:\n  \
                      sitesmith refine 5f0c7a2e-... \"Make the navbar sticky\"\n  \
                      sitesmith refine 5f0c7a2e-... \"Add a contact form\" --apply"
    )]
    Refine(RefineArgs),

    #[command(
        about = "Publish an existing directory",
        long_about = "Runs the deploy profile's stages against a directory and prints the \
                      published identifier.\n\n\
                      Examples:\n  \
                      sitesmith publish ./my-site\n  \
                      sitesmith publish ./dist --profile content-publish"
    )]
    Publish(PublishArgs),

    #[command(
        about = "Normalize raw model output into a file list",
        long_about = "Parses raw completion text (a JSON array, a single file object or a \
                      wrapped object, optionally inside a code fence) and prints the files.\n\n\
                      Examples:\n  \
                      sitesmith normalize response.txt\n  \
                      cat response.txt | sitesmith normalize --refinement"
    )]
    Normalize(NormalizeArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct GenerateArgs {
    #[arg(value_name = "PROMPT", help = "Description of the site to build")]
    pub prompt: String,

    #[arg(long, value_name = "ADDRESS", help = "Owner wallet address")]
    pub wallet: Option<String>,

    #[arg(long, help = "Write the workspace but skip the deployment pipeline")]
    pub no_deploy: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct RefineArgs {
    #[arg(value_name = "PROJECT_ID")]
    pub project_id: ProjectId,

    #[arg(value_name = "QUERY", help = "Requested change")]
    pub query: String,

    #[arg(long, help = "Write the changed files to the project workspace and store")]
    pub apply: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct PublishArgs {
    #[arg(value_name = "DIR", help = "Directory to publish")]
    pub directory: PathBuf,

    #[arg(
        short = 'p',
        long,
        value_parser = parse_profile_kind,
        help = "Deploy profile (overrides the configured one)"
    )]
    pub profile: Option<DeployProfileKind>,
}

#[derive(Parser, Debug, Clone)]
pub struct NormalizeArgs {
    #[arg(value_name = "FILE", help = "Raw output file (reads stdin when omitted)")]
    pub input: Option<PathBuf>,

    #[arg(long, help = "Use the refinement wrapper keys and accept an empty result")]
    pub refinement: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

fn parse_profile_kind(s: &str) -> Result<DeployProfileKind, String> {
    s.parse::<DeployProfileKind>()
}
