//! The `vedro chat` command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use vedro_core::model::{ActionResult, ChatReply, ChatbotInput};
use vedro_render::{chat_reply_html, chat_reply_markdown, page};

use super::{build_tutor, ModelArgs, OutputFormat};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Role {
    User,
    Model,
}

/// One message in a saved conversation.
#[derive(Debug, Serialize, Deserialize)]
struct TranscriptEntry {
    id: Uuid,
    role: Role,
    timestamp: DateTime<Utc>,
    content: serde_json::Value,
}

impl TranscriptEntry {
    fn new(role: Role, content: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            timestamp: Utc::now(),
            content,
        }
    }
}

pub async fn execute(
    message: String,
    file: Option<String>,
    format: OutputFormat,
    transcript: Option<PathBuf>,
    model: ModelArgs,
) -> Result<()> {
    anyhow::ensure!(
        !message.trim().is_empty() || file.is_some(),
        "a message or --file is required"
    );

    let tutor = build_tutor(&model)?;
    let mut input = ChatbotInput::new(message);
    if let Some(uri) = file {
        input = input.with_file(uri);
    }

    let result = tutor.chat(&input).await;

    if let Some(path) = &transcript {
        append_transcript(
            path,
            vec![
                TranscriptEntry::new(Role::User, serde_json::to_value(&input)?),
                TranscriptEntry::new(Role::Model, serde_json::to_value(&result)?),
            ],
        )?;
    }

    print_reply(&input, result, format)
}

fn print_reply(
    input: &ChatbotInput,
    result: ActionResult<ChatReply>,
    format: OutputFormat,
) -> Result<()> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    }
    let reply = result.into_result()?;

    match format {
        OutputFormat::Text => println!("{}", chat_reply_markdown(&reply)),
        OutputFormat::Html => {
            let title = match input.message.trim() {
                "" => "Chat",
                message => message,
            };
            println!("{}", page(title, &chat_reply_html(&reply), Utc::now()));
        }
        OutputFormat::Json => {}
    }
    Ok(())
}

/// Append entries to a JSON array on disk, creating the file if needed.
fn append_transcript(path: &Path, entries: Vec<TranscriptEntry>) -> Result<()> {
    let mut transcript: Vec<TranscriptEntry> = match std::fs::read_to_string(path) {
        Ok(content) if content.trim().is_empty() => Vec::new(),
        Ok(content) => serde_json::from_str(&content)
            .with_context(|| format!("failed to parse transcript: {}", path.display()))?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read transcript: {}", path.display()))
        }
    };
    transcript.extend(entries);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(&transcript)?)
        .with_context(|| format!("failed to write transcript: {}", path.display()))?;
    tracing::debug!(path = %path.display(), messages = transcript.len(), "transcript updated");
    Ok(())
}
