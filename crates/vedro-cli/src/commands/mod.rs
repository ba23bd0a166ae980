//! Subcommand implementations and the setup they share.

pub mod ask;
pub mod chat;
pub mod concept;
pub mod experiment;
pub mod init;
pub mod learn;
pub mod list_models;
pub mod quiz;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};

use vedro_core::{Tutor, TutorConfig};
use vedro_providers::config::load_config_from;
use vedro_providers::create_provider;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Markdown for the terminal
    Text,
    /// The tagged `{success, response|error}` result
    Json,
    /// A standalone HTML page
    Html,
}

/// Provider selection shared by the commands that call a model.
#[derive(Debug, Args)]
pub struct ModelArgs {
    /// Provider name from the config (default: `default_provider`)
    #[arg(long)]
    pub provider: Option<String>,

    /// Model override (default: `default_model`)
    #[arg(long)]
    pub model: Option<String>,

    /// Config file path
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Load config, create the provider and wrap it in a tutor.
pub fn build_tutor(args: &ModelArgs) -> Result<Tutor> {
    build_tutor_with(args, |_| {})
}

/// Like [`build_tutor`], with a chance to adjust the tutor config first.
pub fn build_tutor_with(args: &ModelArgs, adjust: impl FnOnce(&mut TutorConfig)) -> Result<Tutor> {
    let config = load_config_from(args.config.as_deref())?;
    let (name, provider_config) = config.provider_config(args.provider.as_deref())?;
    let provider = create_provider(provider_config)
        .with_context(|| format!("failed to create provider '{name}'"))?;

    let mut tutor_config = config.tutor_config();
    if let Some(model) = &args.model {
        tutor_config.model = model.clone();
    }
    adjust(&mut tutor_config);

    anyhow::ensure!(
        (0.0..=2.0).contains(&tutor_config.temperature),
        "temperature must be between 0.0 and 2.0"
    );
    anyhow::ensure!(tutor_config.parallelism >= 1, "parallelism must be at least 1");

    tracing::info!(provider = name, model = %tutor_config.model, "tutor ready");
    Ok(Tutor::new(Arc::from(provider), tutor_config))
}
