//! The `vedro init` command.

use anyhow::{Context, Result};

use vedro_providers::config::CONFIG_FILE_NAME;
use vedro_providers::VedroConfig;

pub fn execute() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE_NAME);
    if path.exists() {
        println!("{CONFIG_FILE_NAME} already exists, skipping.");
    } else {
        std::fs::write(path, VedroConfig::starter_toml())
            .with_context(|| format!("failed to write {CONFIG_FILE_NAME}"))?;
        println!("Created {CONFIG_FILE_NAME}");
    }

    println!("\nNext steps:");
    println!("  1. Export GEMINI_API_KEY (or edit {CONFIG_FILE_NAME})");
    println!("  2. Run: vedro chat \"How do volcanoes erupt?\"");
    println!("  3. Run: vedro experiment hcl naoh");

    Ok(())
}
