use sitesmith::cli::commands::{CliArgs, Commands};
use sitesmith::cli::handlers::{
    handle_generate, handle_normalize, handle_publish, handle_refine, CliContext, EXIT_CONFIG,
};
use sitesmith::util::logging::{self, parse_level, LoggingConfig};
use sitesmith::VERSION;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn, Level};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    logging::init_logging(logging_config(&args));

    debug!("sitesmith v{} starting", VERSION);
    debug!(?args, "Parsed arguments");

    let ctx = match CliContext::from_args(&args) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            on_interrupt.cancel();
        }
    });

    let exit_code = match &args.command {
        Commands::Generate(generate_args) => handle_generate(generate_args, &ctx, &cancel).await,
        Commands::Refine(refine_args) => handle_refine(refine_args, &ctx, &cancel).await,
        Commands::Publish(publish_args) => handle_publish(publish_args, &ctx, &cancel).await,
        Commands::Normalize(normalize_args) => handle_normalize(normalize_args, &ctx).await,
    };

    std::process::exit(exit_code);
}

fn logging_config(args: &CliArgs) -> LoggingConfig {
    let mut config = LoggingConfig::from_env();

    if let Some(level_str) = &args.log_level {
        match parse_level(level_str) {
            Some(level) => config.level = level,
            None => eprintln!(
                "Ignoring unknown log level '{}' (use trace, debug, info, warn or error)",
                level_str
            ),
        }
    } else if args.verbose {
        config.level = Level::DEBUG;
    } else if args.quiet {
        config.level = Level::ERROR;
    }

    config
}
