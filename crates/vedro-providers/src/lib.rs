//! vedro-providers: LLM provider integrations.
//!
//! Implements the `LlmProvider` trait for Google Gemini and OpenAI-compatible
//! endpoints, plus the config file that selects between them.

pub mod config;
pub mod gemini;
mod http;
pub mod mock;
pub mod openai;

pub use config::{create_provider, load_config, load_config_from, ProviderConfig, VedroConfig};
pub use gemini::GeminiProvider;
pub use mock::MockProvider;
pub use openai::OpenAiProvider;
