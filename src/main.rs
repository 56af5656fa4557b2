//! concierge: workspace chat assistant core.
//!
//! Wires config, database, providers, workflow, and use cases. The chat
//! platform adapter (webhook endpoint, signature checks, reactions) mounts
//! on top of the use cases; this binary verifies the wiring comes up.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use concierge::config::Config;
use concierge::llm::HttpLlm;
use concierge::repository::{ChatSessionRepository, Database, FeedbackRepository};
use concierge::search::HttpSearch;
use concierge::usecase::{AnswerToUserRequestUseCase, FeedbackUseCase};
use concierge::workflow::{Workflow, MAX_CONCURRENT_WORKFLOWS};

const DEFAULT_DB_PATH: &str = "concierge.db";

fn main() -> ExitCode {
    eprintln!("concierge {}", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::var("CONCIERGE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("concierge: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = config.validate() {
        eprintln!("concierge: {}", e);
        return ExitCode::FAILURE;
    }

    let db_path = config
        .database
        .as_ref()
        .and_then(|d| d.path.as_deref())
        .unwrap_or(DEFAULT_DB_PATH)
        .to_string();
    let database = match Database::open(std::path::Path::new(&db_path)) {
        Ok(db) => Arc::new(db),
        Err(e) => {
            eprintln!("concierge: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if !database.health_check() {
        eprintln!("concierge: database health check failed ({})", db_path);
        return ExitCode::FAILURE;
    }

    let llm = match HttpLlm::from_config(&config) {
        Ok(llm) => Arc::new(llm),
        Err(e) => {
            eprintln!("concierge: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let search = match HttpSearch::from_config(&config) {
        Ok(search) => Arc::new(search),
        Err(e) => {
            eprintln!("concierge: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let max_concurrency = config
        .workflow
        .as_ref()
        .and_then(|w| w.max_concurrency)
        .unwrap_or(MAX_CONCURRENT_WORKFLOWS);
    let workflow = Arc::new(Workflow::new(llm, search, max_concurrency));

    let _answer = AnswerToUserRequestUseCase::new(
        Arc::clone(&workflow),
        ChatSessionRepository::new(Arc::clone(&database)),
    );
    let _feedback = FeedbackUseCase::new(FeedbackRepository::new(database));

    eprintln!(
        "concierge: ready (db={}, workflows<={}); mount a chat adapter on the use cases",
        db_path, max_concurrency
    );
    ExitCode::SUCCESS
}
