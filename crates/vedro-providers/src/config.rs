//! Provider configuration and factory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use vedro_core::traits::LlmProvider;
use vedro_core::{RetryPolicy, TutorConfig};

use crate::gemini::GeminiProvider;
use crate::openai::OpenAiProvider;

/// Local config file name.
pub const CONFIG_FILE_NAME: &str = "vedro.toml";

/// Configuration for a single LLM provider.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    Gemini {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
    },
    OpenAI {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        org_id: Option<String>,
    },
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::Gemini {
                api_key: _,
                base_url,
            } => f
                .debug_struct("Gemini")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .finish(),
            ProviderConfig::OpenAI {
                api_key: _,
                base_url,
                org_id,
            } => f
                .debug_struct("OpenAI")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("org_id", org_id)
                .finish(),
        }
    }
}

impl ProviderConfig {
    fn api_key(&self) -> &str {
        match self {
            ProviderConfig::Gemini { api_key, .. } | ProviderConfig::OpenAI { api_key, .. } => {
                api_key
            }
        }
    }
}

/// Top-level vedro configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VedroConfig {
    /// Provider configurations keyed by name.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    #[serde(default = "default_provider")]
    pub default_provider: String,
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Attempts per model call, the first one included.
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    /// Initial backoff in milliseconds; doubles after every failed attempt.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    /// Cached completions (0 disables the cache).
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    /// Cache entry lifetime (0 keeps entries until evicted).
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    /// Concurrent learning pack generations.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Ask the model once to fix a learning pack that fails validation.
    #[serde(default = "default_repair")]
    pub repair_invalid_packs: bool,
}

fn default_provider() -> String {
    "gemini".to_string()
}
fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}
fn default_temperature() -> f64 {
    0.7
}
fn default_max_tokens() -> u32 {
    2048
}
fn default_retries() -> u32 {
    3
}
fn default_retry_delay() -> u64 {
    1000
}
fn default_cache_capacity() -> usize {
    64
}
fn default_cache_ttl() -> u64 {
    600
}
fn default_parallelism() -> usize {
    4
}
fn default_repair() -> bool {
    true
}

impl Default for VedroConfig {
    fn default() -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider(),
            default_model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            max_retries: default_retries(),
            retry_delay_ms: default_retry_delay(),
            cache_capacity: default_cache_capacity(),
            cache_ttl_secs: default_cache_ttl(),
            parallelism: default_parallelism(),
            repair_invalid_packs: default_repair(),
        }
    }
}

impl VedroConfig {
    /// Tutor settings derived from this config.
    pub fn tutor_config(&self) -> TutorConfig {
        TutorConfig {
            model: self.default_model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            retry: RetryPolicy::new(
                self.max_retries,
                Duration::from_millis(self.retry_delay_ms),
            ),
            cache_capacity: self.cache_capacity,
            cache_ttl: (self.cache_ttl_secs > 0).then(|| Duration::from_secs(self.cache_ttl_secs)),
            parallelism: self.parallelism.max(1),
            repair_invalid_packs: self.repair_invalid_packs,
        }
    }

    /// Look up a provider by name, falling back to `default_provider`.
    pub fn provider_config(&self, name: Option<&str>) -> Result<(&str, &ProviderConfig)> {
        let name = name.unwrap_or(self.default_provider.as_str());
        let (name, config) = self.providers.get_key_value(name).with_context(|| {
            format!(
                "provider '{name}' is not configured (set VEDRO_{}_KEY or run `vedro init`)",
                name.to_uppercase()
            )
        })?;
        if config.api_key().is_empty() {
            anyhow::bail!("provider '{name}' has an empty api_key");
        }
        Ok((name.as_str(), config))
    }

    /// Starter config written by `vedro init`.
    pub fn starter_toml() -> String {
        format!(
            r#"# vedro configuration

default_provider = "{provider}"
default_model = "{model}"
temperature = {temperature}
max_tokens = {max_tokens}
max_retries = {retries}
retry_delay_ms = {delay}
cache_capacity = {capacity}
cache_ttl_secs = {ttl}
parallelism = {parallelism}

[providers.gemini]
type = "gemini"
api_key = "${{GEMINI_API_KEY}}"

# [providers.openai]
# type = "openai"
# api_key = "${{OPENAI_API_KEY}}"
"#,
            provider = default_provider(),
            model = default_model(),
            temperature = default_temperature(),
            max_tokens = default_max_tokens(),
            retries = default_retries(),
            delay = default_retry_delay(),
            capacity = default_cache_capacity(),
            ttl = default_cache_ttl(),
            parallelism = default_parallelism(),
        )
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

fn resolve_provider_config(config: &ProviderConfig) -> ProviderConfig {
    match config {
        ProviderConfig::Gemini { api_key, base_url } => ProviderConfig::Gemini {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_ref().map(|u| resolve_env_vars(u)),
        },
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => ProviderConfig::OpenAI {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_ref().map(|u| resolve_env_vars(u)),
            org_id: org_id.as_ref().map(|o| resolve_env_vars(o)),
        },
    }
}

/// First non-empty value among the named environment variables.
fn env_key(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|v| !v.trim().is_empty())
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `vedro.toml` in the current directory
/// 2. `~/.config/vedro/config.toml`
///
/// Environment variable overrides: `VEDRO_GEMINI_KEY` (or `GEMINI_API_KEY`),
/// `VEDRO_OPENAI_KEY`.
pub fn load_config() -> Result<VedroConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<VedroConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() {
                Some(local)
            } else {
                dirs_path()
                    .map(|dir| dir.join("config.toml"))
                    .filter(|global| global.exists())
            }
        }
    };

    let mut config = match config_path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<VedroConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => VedroConfig::default(),
    };

    // Resolve `${VAR}` references before the explicit overrides land
    config.providers = config
        .providers
        .iter()
        .map(|(k, v)| (k.clone(), resolve_provider_config(v)))
        .collect();

    if let Some(key) = env_key(&["VEDRO_GEMINI_KEY", "GEMINI_API_KEY"]) {
        let entry = config
            .providers
            .entry("gemini".into())
            .or_insert(ProviderConfig::Gemini {
                api_key: String::new(),
                base_url: None,
            });
        if let ProviderConfig::Gemini { api_key, .. } = entry {
            *api_key = key;
        }
    }

    if let Some(key) = env_key(&["VEDRO_OPENAI_KEY"]) {
        let entry = config
            .providers
            .entry("openai".into())
            .or_insert(ProviderConfig::OpenAI {
                api_key: String::new(),
                base_url: None,
                org_id: None,
            });
        if let ProviderConfig::OpenAI { api_key, .. } = entry {
            *api_key = key;
        }
    }

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("vedro"))
}

/// Create a provider instance from its configuration.
pub fn create_provider(config: &ProviderConfig) -> Result<Box<dyn LlmProvider>> {
    match config {
        ProviderConfig::Gemini { api_key, base_url } => {
            Ok(Box::new(GeminiProvider::new(api_key, base_url.clone())?))
        }
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => Ok(Box::new(OpenAiProvider::new(
            api_key,
            base_url.clone(),
            org_id.clone(),
        )?)),
    }
}
