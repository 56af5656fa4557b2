//! Config load, env overrides, validation.

use serde::Deserialize;

/// Root config: llm, search, database, workflow sections.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub llm: Option<LlmConfig>,
    pub search: Option<SearchConfig>,
    pub database: Option<DatabaseConfig>,
    pub workflow: Option<WorkflowConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LlmConfig {
    pub provider: Option<String>,
    pub api_base: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SearchConfig {
    pub api_base: Option<String>,
    pub api_key: Option<String>,
    pub max_results: Option<u8>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DatabaseConfig {
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct WorkflowConfig {
    pub max_concurrency: Option<usize>,
}

#[derive(Debug)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    MissingEnv(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(s) => write!(f, "config io: {}", s),
            ConfigError::Parse(s) => write!(f, "config parse: {}", s),
            ConfigError::MissingEnv(name) => {
                write!(f, "missing environment variable or config key: {}", name)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Load from a TOML file, then apply environment overrides. A missing
    /// file yields the default (env-only) config.
    pub fn load(path: &std::path::Path) -> Result<Config, ConfigError> {
        let mut cfg = if path.exists() {
            let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
            toml::from_str(&raw).map_err(|e| ConfigError::Parse(e.to_string()))?
        } else {
            Config::default()
        };
        cfg.apply_overrides(|name| std::env::var(name).ok());
        Ok(cfg)
    }

    /// Overlay values from a lookup (the environment in production). A set
    /// variable wins over the file value.
    pub fn apply_overrides(&mut self, get: impl Fn(&str) -> Option<String>) {
        let llm = self.llm.get_or_insert_with(LlmConfig::default);
        if let Some(v) = get("CONCIERGE_LLM_API_KEY") {
            llm.api_key = Some(v);
        }
        if let Some(v) = get("CONCIERGE_LLM_API_BASE") {
            llm.api_base = Some(v);
        }
        if let Some(v) = get("CONCIERGE_LLM_MODEL") {
            llm.model = Some(v);
        }

        let search = self.search.get_or_insert_with(SearchConfig::default);
        if let Some(v) = get("CONCIERGE_SEARCH_API_KEY") {
            search.api_key = Some(v);
        }
        if let Some(v) = get("CONCIERGE_SEARCH_API_BASE") {
            search.api_base = Some(v);
        }

        if let Some(v) = get("CONCIERGE_DB_PATH") {
            self.database.get_or_insert_with(DatabaseConfig::default).path = Some(v);
        }
    }

    /// Check that every key the wiring needs is present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn present(v: Option<&str>) -> bool {
            v.is_some_and(|s| !s.trim().is_empty())
        }

        if !present(self.llm.as_ref().and_then(|l| l.api_key.as_deref())) {
            return Err(ConfigError::MissingEnv("CONCIERGE_LLM_API_KEY".into()));
        }
        if !present(self.llm.as_ref().and_then(|l| l.model.as_deref())) {
            return Err(ConfigError::MissingEnv("CONCIERGE_LLM_MODEL".into()));
        }
        if !present(self.search.as_ref().and_then(|s| s.api_key.as_deref())) {
            return Err(ConfigError::MissingEnv("CONCIERGE_SEARCH_API_KEY".into()));
        }
        Ok(())
    }
}
