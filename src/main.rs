//! scenecraft - conversational video-script scene editor
//!
//! Usage:
//!   scenecraft chat                       Interactive editing session
//!   scenecraft serve --bind 0.0.0.0:3000  Serve the chat and edit API
//!   scenecraft edit --tag Intro --content "Hi" --prompt "punchier"
//!   scenecraft --help                     Show all commands

use anyhow::Result;
use clap::Parser;

use scenecraft::cli::output::OutputMode;
use scenecraft::cli::{Cli, Commands};
use scenecraft::init::AppContext;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Tracing to stderr so stdout stays clean for --json and the REPL
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(default_directive(&cli.command).parse()?),
        )
        .init();

    let mode = OutputMode::from_json_flag(cli.json);
    let ctx = AppContext::new(cli.data_path.clone(), cli.config.as_deref())?;
    scenecraft::cli::execute(&cli.command, &ctx, mode).await?;

    Ok(())
}

/// The REPL shares the terminal with log output, so keep it quieter.
fn default_directive(command: &Commands) -> &'static str {
    match command {
        Commands::Chat => "scenecraft=warn",
        _ => "scenecraft=info",
    }
}
