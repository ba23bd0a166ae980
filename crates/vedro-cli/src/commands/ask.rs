//! The `vedro ask` command.

use anyhow::Result;
use chrono::Utc;

use vedro_render::{markdown_to_html, page};

use super::{build_tutor, ModelArgs, OutputFormat};

pub async fn execute(query: String, format: OutputFormat, model: ModelArgs) -> Result<()> {
    anyhow::ensure!(!query.trim().is_empty(), "the question is empty");

    let tutor = build_tutor(&model)?;
    let result = tutor.ask(&query).await;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    }
    let answer = result.into_result()?;

    match format {
        OutputFormat::Text => println!("{answer}"),
        OutputFormat::Html => println!(
            "{}",
            page(query.trim(), &markdown_to_html(&answer), Utc::now())
        ),
        OutputFormat::Json => {}
    }
    Ok(())
}
