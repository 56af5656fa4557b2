//! Per-task attempt traces, tagged by agent kind.
//!
//! A web-search log records every query with the results it returned; a
//! general-answer log records every generated response. The tag must match
//! the owning task's agent kind, so recording an attempt of the wrong kind
//! is rejected here as well as at the `Task` level.

use serde::{Deserialize, Serialize};

use crate::domain::task::AgentKind;
use crate::domain::DomainError;

/// One ranked search hit with the fetched (or snippet-fallback) page text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub url: String,
    pub title: String,
    pub content: String,
}

/// One search query and everything it returned. An empty result list is a
/// valid attempt (the query ran and found nothing).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchAttempt {
    pub query: String,
    pub results: Vec<SearchResult>,
}

/// One LLM generation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationAttempt {
    pub response: String,
}

/// Kind-tagged attempt trace. The JSON shape (`{"attempts": [...]}`) is the
/// persisted `task_log_json` column; the kind is carried by the task row's
/// `agent_name`, not by the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskLog {
    WebSearch { attempts: Vec<SearchAttempt> },
    GeneralAnswer { attempts: Vec<GenerationAttempt> },
}

#[derive(Serialize, Deserialize)]
struct SearchLogDoc {
    attempts: Vec<SearchAttempt>,
}

#[derive(Serialize, Deserialize)]
struct GenerationLogDoc {
    attempts: Vec<GenerationAttempt>,
}

impl TaskLog {
    pub fn web_search() -> Self {
        TaskLog::WebSearch {
            attempts: Vec::new(),
        }
    }

    pub fn general_answer() -> Self {
        TaskLog::GeneralAnswer {
            attempts: Vec::new(),
        }
    }

    pub fn kind(&self) -> AgentKind {
        match self {
            TaskLog::WebSearch { .. } => AgentKind::WebSearch,
            TaskLog::GeneralAnswer { .. } => AgentKind::GeneralAnswer,
        }
    }

    /// Record one search attempt. Rejects an empty query and the wrong kind;
    /// accepts an empty result list.
    pub fn add_search_attempt(
        &mut self,
        query: &str,
        results: Vec<SearchResult>,
    ) -> Result<(), DomainError> {
        if query.trim().is_empty() {
            return Err(DomainError::EmptySearchQuery);
        }
        match self {
            TaskLog::WebSearch { attempts } => {
                attempts.push(SearchAttempt {
                    query: query.to_string(),
                    results,
                });
                Ok(())
            }
            TaskLog::GeneralAnswer { .. } => {
                Err(DomainError::TaskLogKindMismatch(AgentKind::WebSearch))
            }
        }
    }

    /// Record one generation attempt. Rejects an empty response and the wrong kind.
    pub fn add_generation_attempt(&mut self, response: &str) -> Result<(), DomainError> {
        if response.trim().is_empty() {
            return Err(DomainError::EmptyResponse);
        }
        match self {
            TaskLog::GeneralAnswer { attempts } => {
                attempts.push(GenerationAttempt {
                    response: response.to_string(),
                });
                Ok(())
            }
            TaskLog::WebSearch { .. } => {
                Err(DomainError::TaskLogKindMismatch(AgentKind::GeneralAnswer))
            }
        }
    }

    /// Every query used so far, in order. Empty for general-answer logs.
    pub fn queries(&self) -> Vec<&str> {
        match self {
            TaskLog::WebSearch { attempts } => {
                attempts.iter().map(|a| a.query.as_str()).collect()
            }
            TaskLog::GeneralAnswer { .. } => Vec::new(),
        }
    }

    /// All search results across all attempts, flattened in order.
    pub fn search_results(&self) -> Vec<&SearchResult> {
        match self {
            TaskLog::WebSearch { attempts } => {
                attempts.iter().flat_map(|a| a.results.iter()).collect()
            }
            TaskLog::GeneralAnswer { .. } => Vec::new(),
        }
    }

    pub fn search_attempts(&self) -> &[SearchAttempt] {
        match self {
            TaskLog::WebSearch { attempts } => attempts,
            TaskLog::GeneralAnswer { .. } => &[],
        }
    }

    pub fn generation_attempts(&self) -> &[GenerationAttempt] {
        match self {
            TaskLog::GeneralAnswer { attempts } => attempts,
            TaskLog::WebSearch { .. } => &[],
        }
    }

    /// Serialise to the persisted document shape.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            TaskLog::WebSearch { attempts } => serde_json::json!({ "attempts": attempts }),
            TaskLog::GeneralAnswer { attempts } => serde_json::json!({ "attempts": attempts }),
        }
    }

    /// Rebuild from the persisted document, keyed on the owning task's agent kind.
    pub fn from_json(kind: AgentKind, value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        match kind {
            AgentKind::WebSearch => {
                let doc: SearchLogDoc = serde_json::from_value(value.clone())?;
                Ok(TaskLog::WebSearch {
                    attempts: doc.attempts,
                })
            }
            AgentKind::GeneralAnswer => {
                let doc: GenerationLogDoc = serde_json::from_value(value.clone())?;
                Ok(TaskLog::GeneralAnswer {
                    attempts: doc.attempts,
                })
            }
        }
    }
}
