//! CLI interface for scenecraft.

pub mod handlers;
pub mod output;

use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

use output::OutputMode;

/// scenecraft - conversational video-script scene editor
#[derive(Parser)]
#[command(name = "scenecraft", version, about, long_about = None)]
pub struct Cli {
    /// Override data directory (default: ~/.scenecraft)
    #[arg(long, env = "SCENECRAFT_DATA_PATH", global = true)]
    pub data_path: Option<PathBuf>,

    /// Config file (default: {data_path}/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output as JSON instead of human-readable format
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the chat and edit API over HTTP
    Serve {
        /// Listen address (overrides server.bind)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Interactive editing session in the terminal
    Chat,

    /// Rewrite one scene and print the suggestion
    Edit {
        /// Scene tag, passed as context
        #[arg(long)]
        tag: String,
        /// Current scene content
        #[arg(long)]
        content: String,
        /// Instruction (default: improve this scene)
        #[arg(long)]
        prompt: Option<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell type (bash, zsh, fish, elvish, powershell)
        shell: clap_complete::Shell,
    },
}

/// Execute a CLI command.
pub async fn execute(
    command: &Commands,
    ctx: &crate::init::AppContext,
    mode: OutputMode,
) -> anyhow::Result<()> {
    match command {
        Commands::Serve { bind } => handlers::serve::handle_serve(ctx, bind.as_deref()).await?,

        Commands::Chat => handlers::chat::handle_chat(ctx, mode).await?,

        Commands::Edit {
            tag,
            content,
            prompt,
        } => handlers::edit::handle_edit(ctx, tag, content, prompt.as_deref(), mode).await?,

        Commands::Completions { shell } => {
            clap_complete::generate(
                *shell,
                &mut Cli::command(),
                "scenecraft",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_edit() {
        let cli = Cli::try_parse_from([
            "scenecraft",
            "--json",
            "edit",
            "--tag",
            "Intro",
            "--content",
            "Hi",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Edit { tag, prompt, .. } => {
                assert_eq!(tag, "Intro");
                assert_eq!(prompt, None);
            }
            _ => panic!("expected edit"),
        }
    }
}
