//! OpenAI-compatible chat completions provider.

use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use vedro_core::error::ProviderError;
use vedro_core::traits::{
    GenerateRequest, GenerateResponse, LlmProvider, ModelInfo, ResponseFormat, TokenUsage,
};

use crate::http::{build_client, error_from_response, send_error};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// OpenAI-compatible API provider.
pub struct OpenAiProvider {
    api_key: String,
    base_url: String,
    org_id: Option<String>,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(
        api_key: &str,
        base_url: Option<String>,
        org_id: Option<String>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            api_key: api_key.to_string(),
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            org_id,
            client: build_client(DEFAULT_TIMEOUT_SECS)?,
        })
    }
}

#[derive(Serialize)]
struct OpenAiRequest {
    model: String,
    max_tokens: u32,
    temperature: f64,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<OpenAiResponseFormat>,
}

#[derive(Serialize)]
struct OpenAiMessage {
    role: &'static str,
    content: OpenAiContent,
}

#[derive(Serialize)]
#[serde(untagged)]
enum OpenAiContent {
    Text(String),
    Parts(Vec<OpenAiPart>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OpenAiPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Serialize)]
struct OpenAiResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: OpenAiUsage,
    model: String,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiChoiceMessage,
}

#[derive(Deserialize)]
struct OpenAiChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize, Default)]
struct OpenAiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

#[derive(Deserialize)]
struct OpenAiError {
    error: OpenAiErrorBody,
}

#[derive(Deserialize)]
struct OpenAiErrorBody {
    message: String,
}

fn build_body(request: &GenerateRequest) -> OpenAiRequest {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = &request.system_prompt {
        messages.push(OpenAiMessage {
            role: "system",
            content: OpenAiContent::Text(system.clone()),
        });
    }

    let user = match &request.attachment {
        Some(file) if file.mime_type.starts_with("image/") => OpenAiContent::Parts(vec![
            OpenAiPart::Text {
                text: request.prompt.clone(),
            },
            OpenAiPart::ImageUrl {
                image_url: ImageUrl {
                    url: format!("data:{};base64,{}", file.mime_type, file.data),
                },
            },
        ]),
        Some(file) => {
            tracing::warn!(
                mime_type = %file.mime_type,
                "attachment type not supported by chat completions, sending prompt only"
            );
            OpenAiContent::Text(request.prompt.clone())
        }
        None => OpenAiContent::Text(request.prompt.clone()),
    };
    messages.push(OpenAiMessage {
        role: "user",
        content: user,
    });

    OpenAiRequest {
        model: request.model.clone(),
        max_tokens: request.max_tokens,
        temperature: request.temperature,
        messages,
        response_format: (request.format == ResponseFormat::Json)
            .then_some(OpenAiResponseFormat { kind: "json_object" }),
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        let start = Instant::now();

        let mut req = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key);
        if let Some(org) = &self.org_id {
            req = req.header("OpenAI-Organization", org);
        }

        let response = req
            .json(&build_body(request))
            .send()
            .await
            .map_err(|e| send_error(e, DEFAULT_TIMEOUT_SECS))?;

        if !response.status().is_success() {
            let err = error_from_response(response, &request.model, |body| {
                serde_json::from_str::<OpenAiError>(body)
                    .ok()
                    .map(|e| e.error.message)
            })
            .await;
            return Err(err.into());
        }

        let api_response: OpenAiResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status: 0,
                message: format!("failed to parse response: {e}"),
            })?;

        let content = api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        if content.is_empty() {
            return Err(ProviderError::EmptyResponse.into());
        }

        Ok(GenerateResponse {
            content,
            model: api_response.model,
            token_usage: TokenUsage {
                prompt_tokens: api_response.usage.prompt_tokens,
                completion_tokens: api_response.usage.completion_tokens,
                total_tokens: api_response.usage.total_tokens,
            },
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        vec![
            ModelInfo {
                id: "gpt-4.1".into(),
                name: "GPT-4.1".into(),
                provider: "openai".into(),
                max_context: 1_000_000,
                supports_json: true,
            },
            ModelInfo {
                id: "gpt-4.1-mini".into(),
                name: "GPT-4.1 Mini".into(),
                provider: "openai".into(),
                max_context: 1_000_000,
                supports_json: true,
            },
            ModelInfo {
                id: "gpt-4o-mini".into(),
                name: "GPT-4o Mini".into(),
                provider: "openai".into(),
                max_context: 128_000,
                supports_json: true,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vedro_core::traits::Attachment;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(model: &str) -> GenerateRequest {
        GenerateRequest {
            model: model.into(),
            prompt: "What is photosynthesis?".into(),
            system_prompt: None,
            max_tokens: 100,
            temperature: 0.7,
            format: ResponseFormat::Text,
            attachment: None,
        }
    }

    #[tokio::test]
    async fn successful_generation() {
        let server = MockServer::start().await;

        let response_body = serde_json::json!({
            "choices": [{"message": {"content": "Plants turn light into sugar.", "role": "assistant"}, "index": 0}],
            "model": "gpt-4.1",
            "usage": {"prompt_tokens": 40, "completion_tokens": 15, "total_tokens": 55}
        });

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&response_body))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new("test-key", Some(server.uri()), None).unwrap();
        let response = provider.generate(&request("gpt-4.1")).await.unwrap();
        assert!(response.content.contains("sugar"));
        assert_eq!(response.token_usage.total_tokens, 55);
    }

    #[tokio::test]
    async fn json_mode_requests_json_object() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(serde_json::json!({
                "response_format": {"type": "json_object"},
                "messages": [{"role": "system", "content": "be terse"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "{\"reply\": \"hi\"}"}}],
                "model": "custom-model"
            })))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new("key", Some(format!("{}/", server.uri())), None).unwrap();
        let mut req = request("custom-model");
        req.format = ResponseFormat::Json;
        req.system_prompt = Some("be terse".into());

        let response = provider.generate(&req).await.unwrap();
        assert_eq!(response.model, "custom-model");
        assert_eq!(response.token_usage, TokenUsage::default());
    }

    #[test]
    fn image_attachment_becomes_content_part() {
        let mut req = request("gpt-4.1");
        req.attachment = Some(Attachment {
            mime_type: "image/jpeg".into(),
            data: "/9j/4AAQ".into(),
        });
        let body = serde_json::to_value(build_body(&req)).unwrap();
        let parts = &body["messages"][0]["content"];
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[1]["type"], "image_url");
        assert_eq!(parts[1]["image_url"]["url"], "data:image/jpeg;base64,/9j/4AAQ");

        req.attachment = Some(Attachment {
            mime_type: "application/pdf".into(),
            data: "JVBERi0=".into(),
        });
        let body = serde_json::to_value(build_body(&req)).unwrap();
        assert_eq!(body["messages"][0]["content"], "What is photosynthesis?");
        assert!(body.get("response_format").is_none());
    }

    #[tokio::test]
    async fn error_responses_are_classified() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({"model": "broken"})))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({"model": "locked"})))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
            })))
            .mount(&server)
            .await;

        let provider = OpenAiProvider::new("key", Some(server.uri()), None).unwrap();

        let err = provider.generate(&request("broken")).await.unwrap_err();
        let pe = err.downcast_ref::<ProviderError>().unwrap();
        assert!(pe.is_retryable());
        assert!(pe.to_string().contains("500"));

        let err = provider.generate(&request("locked")).await.unwrap_err();
        let pe = err.downcast_ref::<ProviderError>().unwrap();
        assert!(pe.is_permanent());
        assert!(pe.to_string().contains("Incorrect API key provided"));
    }
}
