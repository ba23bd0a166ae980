//! The `vedro experiment` command.

use anyhow::Result;
use chrono::Utc;

use vedro_core::lab::Beaker;
use vedro_render::{explanation_html, page};

use super::{build_tutor, ModelArgs, OutputFormat};

pub async fn execute(elements: Vec<String>, format: OutputFormat, model: ModelArgs) -> Result<()> {
    let mut beaker = Beaker::new();
    for id in &elements {
        if !beaker.add(id)? {
            tracing::debug!(element = %id, "already in the beaker");
        }
    }
    // Offline checks first
    let description = beaker.mix()?;
    eprintln!("{description}");

    let tutor = build_tutor(&model)?;
    let result = tutor.explain_experiment(&description).await;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    }
    let explanation = result.into_result()?;

    match format {
        OutputFormat::Text => println!("{}", explanation.explanation),
        OutputFormat::Html => {
            let names: Vec<&str> = beaker.contents().iter().map(|e| e.name).collect();
            println!(
                "{}",
                page(&names.join(" + "), &explanation_html(&explanation), Utc::now())
            );
        }
        OutputFormat::Json => {}
    }
    Ok(())
}
