//! concierge library: config, domain model, LLM and search ports, prompted
//! services, workflow supervisor, repositories, use cases, event dedupe.

pub mod config;
pub mod dedupe;
pub mod domain;
pub mod llm;
pub mod repository;
pub mod search;
pub mod services;
pub mod usecase;
pub mod workflow;
