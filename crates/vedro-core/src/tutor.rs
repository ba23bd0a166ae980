//! Tutoring engine.
//!
//! Turns user input into prompts, sends them through the response cache and
//! the retry policy, and shapes what comes back into the types front ends
//! render. Provider failures surface as [`ActionResult::Failure`]; malformed
//! structured output is repaired once and then replaced by a fallback pack.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use futures::stream::{self, StreamExt};

use crate::cache::{CacheStats, ResponseCache};
use crate::error::{ProviderError, SchemaError, SchemaViolation};
use crate::lab::Beaker;
use crate::model::{
    parse_data_uri, ActionResult, ChatReply, ChatbotInput, ExperimentExplanation, LearningPack,
};
use crate::prompt::{
    assistant_prompt, experiment_prompt, learning_pack_prompt, learning_pack_repair_prompt,
    CHATBOT_PERSONA,
};
use crate::retry::RetryPolicy;
use crate::router::{classify, greeting_reply, Intent};
use crate::schema::{parse_learning_pack, SchemaMode};
use crate::traits::{Attachment, GenerateRequest, LlmProvider, ResponseFormat};

/// Prefix for chat failures shown to the user.
pub const CHAT_FAILURE_PREFIX: &str = "The Alchemist is busy.";

/// Shown when the assistant produces no text.
pub const LOST_FOR_WORDS: &str =
    "I'm sorry, I seem to be at a loss for words. Could you please rephrase your question?";

/// Shown when an experiment cannot be explained.
pub const EXPERIMENT_FAILURE: &str = "Failed to get explanation from the Alchemist.";

/// Explanation used when the model cannot be reached for an experiment.
pub const INERT_EXPLANATION: &str = "### The Alchemist Ponders...\n\
The mixture is inert, like a silent stone in a forgotten library. No reaction occurred with \
these elements. Perhaps try combining different ingredients from the scrolls?";

/// Topic used when a message is empty but carries an attachment.
const ATTACHMENT_TOPIC: &str = "the attached file";

/// Configuration for the tutor.
#[derive(Debug, Clone)]
pub struct TutorConfig {
    /// Model identifier passed to the provider.
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub retry: RetryPolicy,
    /// Maximum cached completions (0 disables the cache).
    pub cache_capacity: usize,
    pub cache_ttl: Option<Duration>,
    /// Concurrent learning pack generations in [`Tutor::learning_packs`].
    pub parallelism: usize,
    /// Ask the model to fix a learning pack that fails validation.
    pub repair_invalid_packs: bool,
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self {
            model: "gemini-1.5-flash".to_string(),
            temperature: 0.7,
            max_tokens: 2048,
            retry: RetryPolicy::default(),
            cache_capacity: 64,
            cache_ttl: Some(Duration::from_secs(600)),
            parallelism: 4,
            repair_invalid_packs: true,
        }
    }
}

/// The tutoring engine.
pub struct Tutor {
    provider: Arc<dyn LlmProvider>,
    cache: ResponseCache,
    config: TutorConfig,
}

impl Tutor {
    pub fn new(provider: Arc<dyn LlmProvider>, config: TutorConfig) -> Self {
        Self {
            provider,
            cache: ResponseCache::new(config.cache_capacity, config.cache_ttl),
            config,
        }
    }

    pub fn config(&self) -> &TutorConfig {
        &self.config
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    // -----------------------------------------------------------------------
    // Flows
    // -----------------------------------------------------------------------

    /// Answer a chat message: a greeting gets a simple reply, anything else
    /// gets a learning pack.
    pub async fn chat(&self, input: &ChatbotInput) -> ActionResult<ChatReply> {
        let attachment = match input.file_data_uri.as_deref().map(parse_data_uri) {
            None => None,
            Some(Ok(uri)) => Some(Attachment {
                mime_type: uri.mime_type.to_string(),
                data: uri.payload.to_string(),
            }),
            Some(Err(e)) => return ActionResult::failure(format!("{CHAT_FAILURE_PREFIX} {e}")),
        };

        // An attachment always goes to the model, even behind a greeting
        let topic = match (classify(&input.message), attachment.is_some()) {
            (Intent::Topic(topic), _) => topic,
            (Intent::Greeting, true) => ATTACHMENT_TOPIC.to_string(),
            (Intent::Greeting, false) => {
                tracing::debug!("greeting detected, answering without the model");
                return ActionResult::Success(ChatReply::simple(greeting_reply()));
            }
        };

        match self.generate_pack(&topic, attachment).await {
            Ok(pack) => ActionResult::Success(ChatReply::LearningPack(pack)),
            Err(e) => ActionResult::failure(format!("{CHAT_FAILURE_PREFIX} {e}")),
        }
    }

    /// Generate a learning pack, substituting [`LearningPack::fallback`] for
    /// any failure.
    pub async fn learning_pack(&self, topic: &str) -> LearningPack {
        match self.try_learning_pack(topic).await {
            Ok(pack) => pack,
            Err(e) => {
                tracing::error!("learning pack for '{}' failed: {e:#}", topic.trim());
                LearningPack::fallback(topic)
            }
        }
    }

    /// Generate a learning pack.
    ///
    /// Errors only when the provider cannot be reached; a pack that stays
    /// invalid after the repair attempt becomes the fallback pack.
    pub async fn try_learning_pack(&self, topic: &str) -> Result<LearningPack> {
        self.generate_pack(topic, None).await
    }

    /// Generate packs for several topics concurrently, returned in input order.
    pub async fn learning_packs(&self, topics: &[String]) -> Vec<(String, LearningPack)> {
        stream::iter(topics.iter().cloned())
            .map(|topic| async move {
                let pack = self.learning_pack(&topic).await;
                (topic, pack)
            })
            .buffered(self.config.parallelism.max(1))
            .collect()
            .await
    }

    /// Free-text study assistant.
    pub async fn ask(&self, query: &str) -> ActionResult<String> {
        if query.trim().is_empty() {
            return ActionResult::failure("Please ask a question first.");
        }
        let prompt = assistant_prompt(query);
        match self
            .complete(
                "assistant answer",
                prompt,
                Some(CHATBOT_PERSONA),
                ResponseFormat::Text,
                None,
                is_non_blank,
            )
            .await
        {
            Ok(text) if text.trim().is_empty() => ActionResult::Success(LOST_FOR_WORDS.to_string()),
            Ok(text) => ActionResult::Success(text.trim().to_string()),
            Err(e) if is_empty_response(&e) => ActionResult::Success(LOST_FOR_WORDS.to_string()),
            Err(e) => ActionResult::failure(format!("{CHAT_FAILURE_PREFIX} {e}")),
        }
    }

    /// Explain a sandbox experiment. Model failures fall back to
    /// [`INERT_EXPLANATION`]; only an empty description is a failure.
    pub async fn explain_experiment(&self, description: &str) -> ActionResult<ExperimentExplanation> {
        if description.trim().is_empty() {
            return ActionResult::failure(EXPERIMENT_FAILURE);
        }
        let prompt = experiment_prompt(description);
        let explanation = match self
            .complete(
                "experiment explanation",
                prompt,
                None,
                ResponseFormat::Text,
                None,
                is_non_blank,
            )
            .await
        {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                tracing::warn!("experiment explanation was empty, using fallback");
                INERT_EXPLANATION.to_string()
            }
            Err(e) => {
                tracing::warn!("experiment explanation failed, using fallback: {e:#}");
                INERT_EXPLANATION.to_string()
            }
        };
        ActionResult::Success(ExperimentExplanation { explanation })
    }

    /// Mix the beaker and explain the result.
    pub async fn explain_beaker(&self, beaker: &Beaker) -> ActionResult<ExperimentExplanation> {
        match beaker.mix() {
            Ok(description) => self.explain_experiment(&description).await,
            Err(e) => ActionResult::failure(e.to_string()),
        }
    }

    // -----------------------------------------------------------------------
    // Model access
    // -----------------------------------------------------------------------

    async fn generate_pack(
        &self,
        topic: &str,
        attachment: Option<Attachment>,
    ) -> Result<LearningPack> {
        let topic = topic.trim();
        if topic.is_empty() {
            bail!("a topic is required to build a learning pack");
        }

        let prompt = learning_pack_prompt(topic);
        let key = self.cache_key(
            Some(CHATBOT_PERSONA),
            &prompt,
            ResponseFormat::Json,
            attachment.as_ref(),
        );
        let raw = self
            .complete(
                "learning pack",
                prompt,
                Some(CHATBOT_PERSONA),
                ResponseFormat::Json,
                attachment.clone(),
                is_valid_pack,
            )
            .await?;
        let violations = match parse_learning_pack(&raw, SchemaMode::Strict) {
            Ok(pack) => return Ok(pack),
            Err(SchemaError::Invalid(violations)) => violations,
            Err(e @ SchemaError::Parse(_)) => {
                tracing::warn!(topic, "learning pack did not parse: {e}");
                vec![SchemaViolation {
                    field: "(root)".to_string(),
                    message: e.to_string(),
                }]
            }
        };

        if !self.config.repair_invalid_packs {
            tracing::warn!(topic, "learning pack invalid, using fallback");
            return Ok(LearningPack::fallback(topic));
        }

        tracing::warn!(
            topic,
            violations = violations.len(),
            "learning pack failed validation, asking for a repair"
        );
        let repair = learning_pack_repair_prompt(topic, &violations);
        // The repaired pack is stored under the original prompt, not the repair prompt
        let raw = self
            .complete(
                "learning pack repair",
                repair,
                Some(CHATBOT_PERSONA),
                ResponseFormat::Json,
                attachment,
                |_| false,
            )
            .await?;
        match parse_learning_pack(&raw, SchemaMode::Strict) {
            Ok(pack) => {
                if let Some(key) = key {
                    self.cache.insert(key, raw);
                }
                Ok(pack)
            }
            Err(e) => {
                tracing::warn!(topic, "repaired learning pack still invalid, using fallback: {e}");
                Ok(LearningPack::fallback(topic))
            }
        }
    }

    /// Cache key for a call, or `None` when the call must bypass the cache.
    fn cache_key(
        &self,
        system_prompt: Option<&str>,
        prompt: &str,
        format: ResponseFormat,
        attachment: Option<&Attachment>,
    ) -> Option<String> {
        attachment
            .is_none()
            .then(|| ResponseCache::key(&self.config.model, system_prompt, prompt, format))
    }

    /// Every model call goes through here: cache lookup, then a retried
    /// provider call. The completion is stored only when `keep` accepts it.
    /// Calls with an attachment bypass the cache.
    async fn complete(
        &self,
        what: &str,
        prompt: String,
        system_prompt: Option<&str>,
        format: ResponseFormat,
        attachment: Option<Attachment>,
        keep: impl Fn(&str) -> bool,
    ) -> Result<String> {
        let key = self.cache_key(system_prompt, &prompt, format, attachment.as_ref());
        if let Some(hit) = key.as_deref().and_then(|k| self.cache.get(k)) {
            tracing::debug!("{what} served from cache");
            return Ok(hit);
        }

        let content = self
            .request(what, prompt, system_prompt, format, attachment)
            .await?;
        if let Some(key) = key.filter(|_| keep(&content)) {
            self.cache.insert(key, content.clone());
        }
        Ok(content)
    }

    /// One provider call wrapped in the retry policy.
    async fn request(
        &self,
        what: &str,
        prompt: String,
        system_prompt: Option<&str>,
        format: ResponseFormat,
        attachment: Option<Attachment>,
    ) -> Result<String> {
        let request = GenerateRequest {
            model: self.config.model.clone(),
            prompt,
            system_prompt: system_prompt.map(str::to_string),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            format,
            attachment,
        };

        let response = self
            .config
            .retry
            .run(what, |_| self.provider.generate(&request))
            .await?;

        tracing::info!(
            provider = self.provider.name(),
            model = %response.model,
            latency_ms = response.latency_ms,
            tokens = response.token_usage.total_tokens,
            "{what} generated"
        );
        Ok(response.content)
    }
}

fn is_non_blank(text: &str) -> bool {
    !text.trim().is_empty()
}

fn is_valid_pack(raw: &str) -> bool {
    parse_learning_pack(raw, SchemaMode::Strict).is_ok()
}

fn is_empty_response(err: &anyhow::Error) -> bool {
    err.chain().any(|e| {
        matches!(
            e.downcast_ref::<ProviderError>(),
            Some(ProviderError::EmptyResponse)
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::schema::fixtures::valid_pack;
    use crate::traits::{GenerateResponse, ModelInfo, TokenUsage};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays a fixed script of outcomes, one per call.
    struct ScriptedProvider {
        script: Mutex<VecDeque<Result<String, ProviderError>>>,
        requests: Mutex<Vec<GenerateRequest>>,
    }

    impl ScriptedProvider {
        fn new(script: Vec<Result<String, ProviderError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        fn last_request(&self) -> GenerateRequest {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
            self.requests.lock().unwrap().push(request.clone());
            let next = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(String::new()));
            let content = next?;
            Ok(GenerateResponse {
                content,
                model: request.model.clone(),
                token_usage: TokenUsage::default(),
                latency_ms: 1,
            })
        }

        fn available_models(&self) -> Vec<ModelInfo> {
            vec![]
        }
    }

    fn pack_json() -> String {
        serde_json::to_string(&valid_pack()).unwrap()
    }

    fn fast_config() -> TutorConfig {
        TutorConfig {
            retry: RetryPolicy::new(3, Duration::from_millis(10)),
            ..TutorConfig::default()
        }
    }

    fn tutor(provider: &Arc<ScriptedProvider>) -> Tutor {
        Tutor::new(Arc::clone(provider) as Arc<dyn LlmProvider>, fast_config())
    }

    #[tokio::test]
    async fn greeting_skips_the_model() {
        let provider = ScriptedProvider::new(vec![]);
        let reply = tutor(&provider).chat(&ChatbotInput::new("Hello!")).await;
        assert_eq!(reply, ActionResult::Success(ChatReply::simple(greeting_reply())));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn topic_yields_learning_pack() {
        let provider = ScriptedProvider::new(vec![Ok(format!("```json\n{}\n```", pack_json()))]);
        let reply = tutor(&provider)
            .chat(&ChatbotInput::new("photosynthesis"))
            .await;
        assert_eq!(
            reply,
            ActionResult::Success(ChatReply::LearningPack(valid_pack()))
        );

        let request = provider.last_request();
        assert_eq!(request.format, ResponseFormat::Json);
        assert!(request.prompt.contains("Topic: photosynthesis"));
        assert_eq!(request.system_prompt.as_deref(), Some(CHATBOT_PERSONA));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_are_retried() {
        let provider = ScriptedProvider::new(vec![
            Err(ProviderError::RateLimited { retry_after_ms: Some(50) }),
            Err(ProviderError::ServerError {
                status: 500,
                message: "boom".into(),
            }),
            Ok(pack_json()),
        ]);
        let pack = tutor(&provider).try_learning_pack("gravity").await.unwrap();
        assert_eq!(pack, valid_pack());
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_become_chat_failure() {
        let provider = ScriptedProvider::new(vec![
            Err(ProviderError::Timeout(30)),
            Err(ProviderError::Timeout(30)),
            Err(ProviderError::Timeout(30)),
        ]);
        let reply = tutor(&provider).chat(&ChatbotInput::new("gravity")).await;
        let error = reply.error().unwrap();
        assert!(error.starts_with(CHAT_FAILURE_PREFIX));
        assert!(error.contains("timed out"));
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn invalid_pack_is_repaired() {
        let provider = ScriptedProvider::new(vec![
            Ok(r#"{"simpleSummary": "Gravity pulls things together."}"#.to_string()),
            Ok(pack_json()),
        ]);
        let pack = tutor(&provider).learning_pack("gravity").await;
        assert_eq!(pack, valid_pack());
        assert_eq!(provider.calls(), 2);
        assert!(provider
            .last_request()
            .prompt
            .contains("Your previous answer was rejected"));
    }

    #[tokio::test]
    async fn unrepairable_pack_falls_back() {
        let provider = ScriptedProvider::new(vec![
            Ok("not json at all".to_string()),
            Ok("still not json".to_string()),
        ]);
        let pack = tutor(&provider).learning_pack("gravity").await;
        assert_eq!(pack, LearningPack::fallback("gravity"));
    }

    #[tokio::test]
    async fn repair_can_be_disabled() {
        let provider = ScriptedProvider::new(vec![Ok("{}".to_string())]);
        let tutor = Tutor::new(
            Arc::clone(&provider) as Arc<dyn LlmProvider>,
            TutorConfig {
                repair_invalid_packs: false,
                ..fast_config()
            },
        );
        let pack = tutor.learning_pack("gravity").await;
        assert!(pack.is_summary_only());
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn valid_packs_are_cached() {
        let provider = ScriptedProvider::new(vec![Ok(pack_json())]);
        let tutor = tutor(&provider);
        tutor.learning_pack("gravity").await;
        let again = tutor.learning_pack("  gravity ").await;
        assert_eq!(again, valid_pack());
        assert_eq!(provider.calls(), 1);
        assert_eq!(tutor.cache_stats().hits, 1);
    }

    #[tokio::test]
    async fn bad_attachment_is_rejected() {
        let provider = ScriptedProvider::new(vec![]);
        let input = ChatbotInput::new("explain this").with_file("not-a-data-uri");
        let reply = tutor(&provider).chat(&input).await;
        assert!(reply.error().unwrap().contains("data:"));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn attachment_only_message_becomes_topic() {
        let provider = ScriptedProvider::new(vec![Ok(pack_json())]);
        let input = ChatbotInput::new("").with_file("data:image/png;base64,iVBORw0KGgo=");
        let reply = tutor(&provider).chat(&input).await;
        assert!(reply.is_success());
        let request = provider.last_request();
        assert!(request.prompt.contains("Topic: the attached file"));
        assert_eq!(request.attachment.unwrap().mime_type, "image/png");
    }

    #[tokio::test]
    async fn greeting_with_attachment_goes_to_the_model() {
        let provider = ScriptedProvider::new(vec![Ok(pack_json())]);
        let input = ChatbotInput::new("hello").with_file("data:image/png;base64,iVBORw0KGgo=");
        let reply = tutor(&provider).chat(&input).await;
        assert_eq!(
            reply,
            ActionResult::Success(ChatReply::LearningPack(valid_pack()))
        );
        assert_eq!(provider.calls(), 1);
        let request = provider.last_request();
        assert!(request.prompt.contains("Topic: the attached file"));
        assert!(request.attachment.is_some());
    }

    #[tokio::test]
    async fn ask_handles_empty_completion() {
        let provider = ScriptedProvider::new(vec![Ok("   ".to_string())]);
        let answer = tutor(&provider).ask("what is osmosis?").await;
        assert_eq!(answer, ActionResult::Success(LOST_FOR_WORDS.to_string()));
    }

    #[tokio::test]
    async fn ask_handles_empty_response_error() {
        let provider = ScriptedProvider::new(vec![Err(ProviderError::EmptyResponse)]);
        let tutor = tutor(&provider);
        let answer = tutor.ask("what is osmosis?").await;
        assert_eq!(answer, ActionResult::Success(LOST_FOR_WORDS.to_string()));
        assert_eq!(provider.calls(), 1);
        assert_eq!(tutor.cache_stats().len, 0);
    }

    #[tokio::test]
    async fn experiment_falls_back_to_inert() {
        let provider = ScriptedProvider::new(vec![Err(ProviderError::AuthenticationFailed(
            "bad key".into(),
        ))]);
        let mut beaker = Beaker::new();
        beaker.add("hcl").unwrap();
        beaker.add("naoh").unwrap();

        let result = tutor(&provider).explain_beaker(&beaker).await;
        assert_eq!(
            result.ok().unwrap().explanation,
            INERT_EXPLANATION.to_string()
        );
    }

    #[tokio::test]
    async fn experiment_requires_description() {
        let provider = ScriptedProvider::new(vec![]);
        let tutor = tutor(&provider);
        assert_eq!(
            tutor.explain_experiment("  ").await.error(),
            Some(EXPERIMENT_FAILURE)
        );

        let mut beaker = Beaker::new();
        beaker.add("water").unwrap();
        let result = tutor.explain_beaker(&beaker).await;
        assert!(result.error().unwrap().contains("at least two elements"));
    }

    #[tokio::test]
    async fn batch_preserves_order() {
        let provider = ScriptedProvider::new(vec![Ok(pack_json()), Ok(pack_json())]);
        let topics = vec!["gravity".to_string(), "magnetism".to_string()];
        let packs = tutor(&provider).learning_packs(&topics).await;
        let names: Vec<_> = packs.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(names, vec!["gravity", "magnetism"]);
    }

    /// Holds every call open for a while and records the most calls in flight.
    #[derive(Default)]
    struct SlowProvider {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl LlmProvider for SlowProvider {
        fn name(&self) -> &str {
            "slow"
        }

        async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(100)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(GenerateResponse {
                content: pack_json(),
                model: request.model.clone(),
                token_usage: TokenUsage::default(),
                latency_ms: 100,
            })
        }

        fn available_models(&self) -> Vec<ModelInfo> {
            vec![]
        }
    }

    async fn peak_in_flight(parallelism: usize) -> usize {
        let provider = Arc::new(SlowProvider::default());
        let tutor = Tutor::new(
            Arc::clone(&provider) as Arc<dyn LlmProvider>,
            TutorConfig {
                parallelism,
                ..fast_config()
            },
        );
        let topics: Vec<String> = ["tides", "volcanoes", "magnets", "rainbows", "clouds", "atoms"]
            .iter()
            .map(|t| t.to_string())
            .collect();
        let packs = tutor.learning_packs(&topics).await;
        assert_eq!(packs.len(), topics.len());
        assert!(packs.iter().all(|(_, pack)| *pack == valid_pack()));
        provider.peak.load(Ordering::SeqCst)
    }

    #[tokio::test(start_paused = true)]
    async fn batch_concurrency_is_bounded() {
        assert_eq!(peak_in_flight(1).await, 1);
        assert_eq!(peak_in_flight(2).await, 2);
        assert_eq!(peak_in_flight(4).await, 4);
    }
}
