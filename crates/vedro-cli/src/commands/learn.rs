//! The `vedro learn` command.

use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use vedro_core::model::LearningPack;
use vedro_render::{html_escape, learning_pack_html, learning_pack_markdown, page, write_document};

use super::{build_tutor_with, ModelArgs, OutputFormat};

/// A generated pack with the topic it was asked for.
#[derive(Debug, Serialize, Deserialize)]
pub struct TopicPack {
    pub topic: String,
    pub pack: LearningPack,
}

pub async fn execute(
    topics: Vec<String>,
    format: OutputFormat,
    parallelism: Option<usize>,
    output: Option<PathBuf>,
    model: ModelArgs,
) -> Result<()> {
    let topics: Vec<String> = topics
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    anyhow::ensure!(!topics.is_empty(), "at least one non-empty topic is required");

    let tutor = build_tutor_with(&model, |config| {
        if let Some(p) = parallelism {
            config.parallelism = p;
        }
    })?;

    eprintln!(
        "Preparing {} learning pack(s) with {} (parallelism {})",
        topics.len(),
        tutor.config().model,
        tutor.config().parallelism
    );
    let packs: Vec<TopicPack> = tutor
        .learning_packs(&topics)
        .await
        .into_iter()
        .map(|(topic, pack)| TopicPack { topic, pack })
        .collect();

    let failed = packs.iter().filter(|p| p.pack.is_summary_only()).count();
    if failed > 0 {
        eprintln!("{failed} of {} pack(s) could not be prepared", packs.len());
    }
    let stats = tutor.cache_stats();
    tracing::debug!(hits = stats.hits, misses = stats.misses, "cache");

    let rendered = render(&packs, format)?;
    match output {
        Some(path) => {
            write_document(&rendered, &path)?;
            eprintln!("Saved to: {}", path.display());
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

fn render(packs: &[TopicPack], format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(packs)?,
        OutputFormat::Text => packs
            .iter()
            .map(|p| format!("# {}\n\n{}", p.topic, learning_pack_markdown(&p.pack)))
            .collect::<Vec<_>>()
            .join("\n\n---\n\n"),
        OutputFormat::Html => {
            let title = packs
                .iter()
                .map(|p| p.topic.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            let body: String = packs
                .iter()
                .map(|p| {
                    format!(
                        "<section class=\"topic\">\n<h1>{}</h1>\n{}</section>\n",
                        html_escape(&p.topic),
                        learning_pack_html(&p.pack)
                    )
                })
                .collect();
            page(&title, &body, Utc::now())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packs() -> Vec<TopicPack> {
        vec![
            TopicPack {
                topic: "tides".into(),
                pack: LearningPack::fallback("tides"),
            },
            TopicPack {
                topic: "<b>magnets</b>".into(),
                pack: LearningPack::fallback("magnets"),
            },
        ]
    }

    #[test]
    fn text_output_separates_topics() {
        let text = render(&packs(), OutputFormat::Text).unwrap();
        assert!(text.starts_with("# tides\n\n## Simple Summary"));
        assert_eq!(text.matches("\n---\n").count(), 1);
    }

    #[test]
    fn json_output_round_trips() {
        let json = render(&packs(), OutputFormat::Json).unwrap();
        let parsed: Vec<TopicPack> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].topic, "tides");
    }

    #[test]
    fn html_escapes_topics() {
        let html = render(&packs(), OutputFormat::Html).unwrap();
        assert!(html.contains("<h1>&lt;b&gt;magnets&lt;/b&gt;</h1>"));
        assert!(!html.contains("<b>magnets</b>"));
    }
}
