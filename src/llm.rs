//! LLM port: `generate(messages) -> text` and schema-constrained
//! `generate_structured(messages, schema) -> value`.
//!
//! Single HTTP implementation (OpenAI-compatible chat completions). No
//! streaming; minimal types. Structured output uses provider-side
//! constrained decoding via `response_format: json_schema`; callers
//! deserialise the returned value into their typed record and treat a
//! mismatch as a failed call.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{Config, LlmConfig};
use crate::domain::Message;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// LLM module errors.
#[derive(Debug)]
pub enum LlmError {
    Config(String),
    Http(String),
    Parse(String),
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmError::Config(s) => write!(f, "llm config: {}", s),
            LlmError::Http(s) => write!(f, "llm http: {}", s),
            LlmError::Parse(s) => write!(f, "llm parse: {}", s),
        }
    }
}

impl std::error::Error for LlmError {}

/// Named JSON schema for constrained decoding.
#[derive(Debug, Clone)]
pub struct StructuredSchema {
    pub name: &'static str,
    pub schema: serde_json::Value,
}

/// Text-completion capability over an ordered message list. The list always
/// starts with a SYSTEM message and ends with a USER message; history in
/// between may interleave USER/ASSISTANT. Stateless and side-effect-free
/// beyond the network call.
pub trait LlmPort: Send + Sync {
    /// Free-form assistant response.
    fn generate<'a>(&'a self, messages: &'a [Message]) -> BoxFuture<'a, Result<String, LlmError>>;

    /// Response conforming to `schema`. The provider enforces the schema;
    /// a value the schema cannot accept fails the call.
    fn generate_structured<'a>(
        &'a self,
        messages: &'a [Message],
        schema: &'a StructuredSchema,
    ) -> BoxFuture<'a, Result<serde_json::Value, LlmError>>;
}

// --- Request/response (raw API shape for serde) ---

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    type_: &'a str,
    json_schema: JsonSchemaSpec<'a>,
}

#[derive(Serialize)]
struct JsonSchemaSpec<'a> {
    name: &'a str,
    strict: bool,
    schema: &'a serde_json::Value,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat<'a>>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Option<Vec<Choice>>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

// --- Provider ---

/// HTTP provider (OpenAI-compatible: OpenRouter, OpenAI, Groq, etc.).
#[derive(Debug)]
pub struct HttpLlm {
    api_base: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

const DEFAULT_API_BASE: &str = "https://openrouter.ai/api/v1";
const REQUEST_TIMEOUT_SECS: u64 = 120;

impl HttpLlm {
    /// Build provider from validated config. Default api_base is OpenRouter.
    pub fn from_config(cfg: &Config) -> Result<Self, LlmError> {
        let llm: &LlmConfig = cfg
            .llm
            .as_ref()
            .ok_or_else(|| LlmError::Config("llm section missing".into()))?;
        let api_key = llm
            .api_key
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| LlmError::Config("llm.api_key required".into()))?
            .to_string();
        let model = llm
            .model
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| LlmError::Config("llm.model required".into()))?
            .to_string();
        let api_base = llm
            .api_base
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_API_BASE)
            .trim_end_matches('/')
            .to_string();
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| LlmError::Config(format!("reqwest client: {}", e)))?;
        Ok(Self {
            api_base,
            api_key,
            model,
            client,
        })
    }

    async fn chat(
        &self,
        messages: &[Message],
        response_format: Option<ResponseFormat<'_>>,
    ) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.api_base);
        let body = ChatRequest {
            model: &self.model,
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role().as_str(),
                    content: m.content(),
                })
                .collect(),
            response_format,
        };
        let res = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Http(e.to_string()))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| LlmError::Http(e.to_string()))?;
        if !status.is_success() {
            return Err(LlmError::Http(format!("{} {}", status, text)));
        }

        let parsed: ChatResponse =
            serde_json::from_str(&text).map_err(|e| LlmError::Parse(e.to_string()))?;

        let content = parsed
            .choices
            .as_deref()
            .and_then(|c| c.first())
            .and_then(|choice| choice.message.as_ref())
            .and_then(|m| m.content.clone())
            .unwrap_or_default();

        Ok(content)
    }
}

impl LlmPort for HttpLlm {
    fn generate<'a>(&'a self, messages: &'a [Message]) -> BoxFuture<'a, Result<String, LlmError>> {
        Box::pin(async move { self.chat(messages, None).await })
    }

    fn generate_structured<'a>(
        &'a self,
        messages: &'a [Message],
        schema: &'a StructuredSchema,
    ) -> BoxFuture<'a, Result<serde_json::Value, LlmError>> {
        Box::pin(async move {
            let format = ResponseFormat {
                type_: "json_schema",
                json_schema: JsonSchemaSpec {
                    name: schema.name,
                    strict: true,
                    schema: &schema.schema,
                },
            };
            let content = self.chat(messages, Some(format)).await?;
            serde_json::from_str(&content).map_err(|e| LlmError::Parse(e.to_string()))
        })
    }
}
