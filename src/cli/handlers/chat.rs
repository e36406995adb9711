//! Interactive editing session: free text is a chat turn, `/` starts a command.

use anyhow::Result;
use colored::Colorize;
use serde_json::json;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::cli::output::{
    output_json, print_error, print_hint, print_scenes, print_success, print_suggestion,
    OutputMode,
};
use crate::init::AppContext;
use crate::models::{Scene, SceneField};
use crate::session::{EditorSession, UndoRecord};
use crate::ScriptError;

const HELP: &str = "\
Commands:
  /scenes                      list scenes
  /add [tag] [content...]      append a scene
  /delete <id|#>               delete a scene
  /set <id|#> content|tag <v>  change one field
  /pending                     show the pending suggestion
  /approve  /dismiss           resolve the pending suggestion
  /undo                        revert the last scene change
  /mentions <query>            scenes matching a query
  /help  /quit
Anything else is sent to the assistant. Mention a scene with @[Tag].";

/// One line of REPL input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Say(String),
    Scenes,
    Add {
        tag: Option<String>,
        content: Option<String>,
    },
    Delete(String),
    Set {
        scene: String,
        field: SceneField,
        value: String,
    },
    Pending,
    Approve,
    Dismiss,
    Undo,
    Mentions(String),
    Help,
    Quit,
    Empty,
}

impl ReplCommand {
    pub fn parse(line: &str) -> Result<Self, ScriptError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(ReplCommand::Empty);
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(ReplCommand::Say(line.to_string()));
        };

        let (name, args) = match rest.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (rest, ""),
        };
        let usage = |text: &str| ScriptError::Validation(format!("Usage: {}", text));

        let command = match name {
            "scenes" | "ls" => ReplCommand::Scenes,
            "add" => {
                let (tag, content) = match args.split_once(char::is_whitespace) {
                    Some((tag, content)) => (Some(tag), Some(content.trim())),
                    None => (Some(args), None),
                };
                ReplCommand::Add {
                    tag: tag.filter(|t| !t.is_empty()).map(String::from),
                    content: content.filter(|c| !c.is_empty()).map(String::from),
                }
            }
            "delete" | "rm" => {
                if args.is_empty() {
                    return Err(usage("/delete <id|#>"));
                }
                ReplCommand::Delete(args.to_string())
            }
            "set" => {
                let mut parts = args.splitn(3, char::is_whitespace);
                let (Some(scene), Some(field), Some(value)) =
                    (parts.next(), parts.next(), parts.next())
                else {
                    return Err(usage("/set <id|#> content|tag <value>"));
                };
                ReplCommand::Set {
                    scene: scene.to_string(),
                    field: field.parse()?,
                    value: value.trim().to_string(),
                }
            }
            "pending" => ReplCommand::Pending,
            "approve" => ReplCommand::Approve,
            "dismiss" => ReplCommand::Dismiss,
            "undo" => ReplCommand::Undo,
            "mentions" => ReplCommand::Mentions(args.to_string()),
            "help" | "?" => ReplCommand::Help,
            "quit" | "exit" | "q" => ReplCommand::Quit,
            other => {
                return Err(ScriptError::Validation(format!(
                    "Unknown command '/{}' (try /help)",
                    other
                )))
            }
        };
        Ok(command)
    }
}

/// Resolve a scene reference typed by the user: a 1-based position or an id.
pub fn resolve_scene_ref(scenes: &[Scene], reference: &str) -> Option<String> {
    if let Ok(n) = reference.parse::<usize>() {
        if n >= 1 && n <= scenes.len() {
            return Some(scenes[n - 1].id.clone());
        }
    }
    scenes
        .iter()
        .find(|s| s.id == reference)
        .map(|s| s.id.clone())
}

pub async fn handle_chat(ctx: &AppContext, mode: OutputMode) -> Result<()> {
    let session = ctx.session();

    if let Some(greeting) = session.conversation().await.last() {
        println!("{} {}", "assistant:".cyan().bold(), greeting.message.content);
    }
    print_scenes(&session.scenes().await);
    print_hint("Type /help for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", ">".bold());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let command = match ReplCommand::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                print_error(&e.to_string());
                continue;
            }
        };
        if command == ReplCommand::Quit {
            break;
        }
        if let Err(e) = run_command(&session, command, mode).await {
            print_error(&e.to_string());
        }
    }

    Ok(())
}

async fn run_command(
    session: &EditorSession,
    command: ReplCommand,
    mode: OutputMode,
) -> Result<(), ScriptError> {
    match command {
        ReplCommand::Say(text) => run_turn(session, &text, mode).await?,
        ReplCommand::Scenes => show_scenes(&session.scenes().await, mode),
        ReplCommand::Add { tag, content } => {
            let scene = session
                .add_scene(content.as_deref(), tag.as_deref())
                .await?;
            print_success(&format!("Added scene \"{}\" ({})", scene.tag, scene.id));
        }
        ReplCommand::Delete(reference) => {
            let id = lookup(session, &reference).await?;
            let scene = session.delete_scene(&id).await?;
            print_success(&format!("Deleted scene \"{}\"", scene.tag));
        }
        ReplCommand::Set {
            scene,
            field,
            value,
        } => {
            let id = lookup(session, &scene).await?;
            session.update_scene(&id, field, &value).await?;
            print_success(&format!("Updated {} of {}", field, id));
        }
        ReplCommand::Pending => match session.pending().await {
            Some(s) if mode == OutputMode::Json => output_json(&s),
            Some(s) => print_suggestion(&s),
            None => print_hint("No pending suggestion."),
        },
        ReplCommand::Approve => match session.approve().await? {
            Some(scene) => print_success(&format!(
                "Applied the suggested changes to \"{}\".",
                scene.tag
            )),
            None => print_hint("No pending suggestion."),
        },
        ReplCommand::Dismiss => match session.dismiss().await {
            Some(_) => print_success("Suggestion dismissed"),
            None => print_hint("No pending suggestion."),
        },
        ReplCommand::Undo => match session.undo().await {
            Some(record) => print_success(&describe_undo(&record)),
            None => print_hint("Nothing to undo."),
        },
        ReplCommand::Mentions(query) => show_scenes(&session.mention_candidates(&query).await, mode),
        ReplCommand::Help => println!("{}", HELP),
        ReplCommand::Quit | ReplCommand::Empty => {}
    }
    Ok(())
}

async fn run_turn(session: &EditorSession, text: &str, mode: OutputMode) -> Result<(), ScriptError> {
    let human = mode == OutputMode::Human;
    if human {
        print!("{} ", "assistant:".cyan().bold());
    }
    let outcome = session
        .run_turn(text, |fragment| {
            if human {
                print!("{}", fragment);
                let _ = std::io::stdout().flush();
            }
        })
        .await?;

    if !human {
        output_json(&json!({
            "reply": outcome.reply,
            "suggestion": outcome.suggestion,
            "failure": outcome.failure.map(|class| class.substitute_message()),
        }));
        return Ok(());
    }

    println!();
    if let Some(class) = outcome.failure {
        println!("{}", class.substitute_message().yellow());
    }
    if let Some(suggestion) = &outcome.suggestion {
        print_suggestion(suggestion);
    }
    Ok(())
}

async fn lookup(session: &EditorSession, reference: &str) -> Result<String, ScriptError> {
    resolve_scene_ref(&session.scenes().await, reference).ok_or_else(|| {
        ScriptError::SceneNotFound {
            id: reference.to_string(),
        }
    })
}

fn show_scenes(scenes: &[Scene], mode: OutputMode) {
    match mode {
        OutputMode::Json => output_json(&scenes),
        OutputMode::Human => print_scenes(scenes),
    }
}

fn describe_undo(record: &UndoRecord) -> String {
    match record {
        UndoRecord::Add { scene } => format!("Removed added scene \"{}\"", scene.tag),
        UndoRecord::Delete { scene } => format!("Restored scene \"{}\"", scene.tag),
        UndoRecord::Update { old, .. } => format!("Reverted scene \"{}\"", old.tag),
    }
}
