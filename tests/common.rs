#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use concierge::domain::{Message, SearchResult};
use concierge::llm::{BoxFuture, LlmError, LlmPort, StructuredSchema};
use concierge::repository::{ChatSessionRepository, Database, FeedbackRepository};
use concierge::search::{SearchError, SearchPort};

// ---------------------------------------------------------------------------
// Temp database + repositories
// ---------------------------------------------------------------------------

pub struct TestDb {
    // Keep TempDir alive so the file isn't deleted until struct drop
    _tmp: TempDir,
    pub db: Arc<Database>,
}

impl TestDb {
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("failed to create temp dir");
        let db = Arc::new(Database::open(&tmp.path().join("concierge.db")).expect("open db"));
        Self { _tmp: tmp, db }
    }

    pub fn sessions(&self) -> ChatSessionRepository {
        ChatSessionRepository::new(Arc::clone(&self.db))
    }

    pub fn feedbacks(&self) -> FeedbackRepository {
        FeedbackRepository::new(Arc::clone(&self.db))
    }
}

// ---------------------------------------------------------------------------
// Routed LLM stub
// ---------------------------------------------------------------------------

pub enum Reply {
    Text(String),
    Value(serde_json::Value),
}

struct Rule {
    /// Structured-output schema name; `None` matches `generate` calls.
    schema: Option<&'static str>,
    /// Substring of the last message's content; empty matches anything.
    needle: &'static str,
    reply: Reply,
    delay: Duration,
    /// Remaining uses; `None` = unlimited.
    remaining: Option<usize>,
}

/// LLM stub routed on schema name + last-message content, so concurrent
/// agents can interleave calls in any order. Rules are matched first to
/// last; a rule added with `once` is consumed when it fires.
#[derive(Default)]
pub struct RoutedLlm {
    rules: Mutex<Vec<Rule>>,
    generate_calls: AtomicUsize,
    structured_calls: AtomicUsize,
}

impl RoutedLlm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_generate(&self, needle: &'static str, text: &str) {
        self.push(None, needle, Reply::Text(text.to_string()), Duration::ZERO, None);
    }

    pub fn on_generate_delayed(&self, needle: &'static str, text: &str, delay: Duration) {
        self.push(None, needle, Reply::Text(text.to_string()), delay, None);
    }

    pub fn on_schema(&self, schema: &'static str, value: serde_json::Value) {
        self.push(Some(schema), "", Reply::Value(value), Duration::ZERO, None);
    }

    /// Single-use schema rule; lets a test script "first call this, then that".
    pub fn on_schema_once(&self, schema: &'static str, value: serde_json::Value) {
        self.push(Some(schema), "", Reply::Value(value), Duration::ZERO, Some(1));
    }

    pub fn generate_count(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    pub fn structured_count(&self) -> usize {
        self.structured_calls.load(Ordering::SeqCst)
    }

    fn push(
        &self,
        schema: Option<&'static str>,
        needle: &'static str,
        reply: Reply,
        delay: Duration,
        remaining: Option<usize>,
    ) {
        self.rules.lock().unwrap().push(Rule {
            schema,
            needle,
            reply,
            delay,
            remaining,
        });
    }

    fn route(&self, schema: Option<&'static str>, last_content: &str) -> Option<(Reply, Duration)> {
        let mut rules = self.rules.lock().unwrap();
        for rule in rules.iter_mut() {
            if rule.schema != schema {
                continue;
            }
            if !rule.needle.is_empty() && !last_content.contains(rule.needle) {
                continue;
            }
            if let Some(count) = rule.remaining.as_mut() {
                if *count == 0 {
                    continue;
                }
                *count -= 1;
            }
            let reply = match &rule.reply {
                Reply::Text(s) => Reply::Text(s.clone()),
                Reply::Value(v) => Reply::Value(v.clone()),
            };
            return Some((reply, rule.delay));
        }
        None
    }
}

impl LlmPort for RoutedLlm {
    fn generate<'a>(&'a self, messages: &'a [Message]) -> BoxFuture<'a, Result<String, LlmError>> {
        Box::pin(async move {
            self.generate_calls.fetch_add(1, Ordering::SeqCst);
            let last = messages.last().map(Message::content).unwrap_or("");
            match self.route(None, last) {
                Some((Reply::Text(text), delay)) => {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    Ok(text)
                }
                _ => Err(LlmError::Http(format!(
                    "no generate rule for prompt: {:.80}",
                    last
                ))),
            }
        })
    }

    fn generate_structured<'a>(
        &'a self,
        messages: &'a [Message],
        schema: &'a StructuredSchema,
    ) -> BoxFuture<'a, Result<serde_json::Value, LlmError>> {
        Box::pin(async move {
            self.structured_calls.fetch_add(1, Ordering::SeqCst);
            let last = messages.last().map(Message::content).unwrap_or("");
            match self.route(Some(schema.name), last) {
                Some((Reply::Value(value), delay)) => {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    Ok(value)
                }
                _ => Err(LlmError::Http(format!(
                    "no {} rule for prompt: {:.80}",
                    schema.name, last
                ))),
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Search stub
// ---------------------------------------------------------------------------

/// Returns the same fixed result list for every query; records queries.
#[derive(Default)]
pub struct FixedSearch {
    results: Vec<SearchResult>,
    pub queries: Mutex<Vec<String>>,
}

impl FixedSearch {
    pub fn new(results: Vec<SearchResult>) -> Self {
        Self {
            results,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl SearchPort for FixedSearch {
    fn search<'a>(
        &'a self,
        query: &'a str,
        _num_results: u8,
    ) -> BoxFuture<'a, Result<Vec<SearchResult>, SearchError>> {
        Box::pin(async move {
            self.queries.lock().unwrap().push(query.to_string());
            Ok(self.results.clone())
        })
    }
}

pub fn python_org_result() -> SearchResult {
    SearchResult {
        url: "https://python.org".to_string(),
        title: "Python".to_string(),
        content: "Python 3.13".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Wiremock fixtures for the HTTP providers
// ---------------------------------------------------------------------------

pub struct MockLlmServer {
    pub server: MockServer,
}

impl MockLlmServer {
    pub async fn new() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn endpoint(&self) -> String {
        self.server.uri()
    }

    /// Mount a mock for /chat/completions that returns the given JSON body.
    pub async fn mock_chat_completion(&self, response_body: serde_json::Value) {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(response_body))
            .mount(&self.server)
            .await;
    }
}

/// Chat-completions body with plain text content.
pub fn chat_completion_body(content: &str) -> serde_json::Value {
    serde_json::json!({
        "choices": [{
            "message": { "content": content, "role": "assistant" },
            "finish_reason": "stop"
        }]
    })
}
