pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{CliArgs, Commands, GenerateArgs, NormalizeArgs, PublishArgs, RefineArgs};
pub use output::{OutputFormat, OutputFormatter};
