//! One-shot scene rewrite.

use anyhow::Result;

use crate::cli::output::{output_json, print_rewrite, OutputMode};
use crate::init::AppContext;
use crate::models::SceneSnapshot;

pub async fn handle_edit(
    ctx: &AppContext,
    tag: &str,
    content: &str,
    prompt: Option<&str>,
    mode: OutputMode,
) -> Result<()> {
    let scene = SceneSnapshot {
        content: content.to_string(),
        tag: tag.to_string(),
    };
    let rewrite = ctx
        .suggestion_service
        .request_edit(&scene, prompt.unwrap_or_default())
        .await?;

    match mode {
        OutputMode::Json => output_json(&rewrite),
        OutputMode::Human => print_rewrite(&rewrite),
    }
    Ok(())
}
