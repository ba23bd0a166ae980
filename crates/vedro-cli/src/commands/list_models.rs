//! The `vedro list-models` command.

use std::path::PathBuf;

use anyhow::Result;

use vedro_providers::create_provider;

pub fn execute(provider_filter: Option<String>, config_path: Option<PathBuf>) -> Result<()> {
    let config = vedro_providers::config::load_config_from(config_path.as_deref())?;

    let mut names: Vec<&String> = config.providers.keys().collect();
    names.sort();

    let mut found_any = false;

    for name in names {
        if let Some(filter) = &provider_filter {
            if name != filter {
                continue;
            }
        }

        let provider = create_provider(&config.providers[name])?;
        let models = provider.available_models();

        if !models.is_empty() {
            found_any = true;
            let default_marker = |id: &str| {
                if *name == config.default_provider && id == config.default_model {
                    " [default]"
                } else {
                    ""
                }
            };
            println!("Provider: {name}");
            for model in &models {
                println!(
                    "  {} - {} ({}K context{}){}",
                    model.id,
                    model.name,
                    model.max_context / 1000,
                    if model.supports_json { ", JSON mode" } else { "" },
                    default_marker(&model.id),
                );
            }
            println!();
        }
    }

    if !found_any {
        println!("No providers configured. Run `vedro init` to create a config file.");
    }

    Ok(())
}
