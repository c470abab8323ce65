//! TOML-based configuration for deep-research
//!
//! All settings live in an optional `deep-research.toml`. Every field has a
//! default, so an empty file (or no file at all) gives a working local setup
//! against Ollama. Command-line flags are applied on top by the binary.
//!
//! API keys are never stored in the file: a model entry names the environment
//! variable that holds its key (`api_key_env`), resolved once at startup.

use crate::llm::Provider;
use crate::report::DanglingCitationPolicy;
use crate::tools::search::SearchOptions;
use crate::types::{AppError, LoopBounds};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "deep-research.toml";

/// Root configuration structure loaded from deep-research.toml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResearchConfig {
    #[serde(default)]
    pub research: ResearchSettings,

    #[serde(default)]
    pub models: ModelsConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

// ============= Research Configuration =============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchSettings {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    #[serde(default = "default_max_time_minutes")]
    pub max_time_minutes: u64,

    /// Upper bound on tasks per iteration and on tasks running at once
    #[serde(default = "default_max_concurrent_tasks")]
    pub max_concurrent_tasks: usize,

    #[serde(default = "default_capability_timeout_secs")]
    pub capability_timeout_secs: u64,

    #[serde(default)]
    pub dangling_citations: DanglingCitationPolicy,

    /// Search the web for background before planning a deep report
    #[serde(default = "default_scoping_search")]
    pub scoping_search: bool,
}

fn default_max_iterations() -> usize {
    5
}

fn default_max_time_minutes() -> u64 {
    10
}

fn default_max_concurrent_tasks() -> usize {
    3
}

fn default_capability_timeout_secs() -> u64 {
    120
}

fn default_scoping_search() -> bool {
    true
}

impl Default for ResearchSettings {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            max_time_minutes: default_max_time_minutes(),
            max_concurrent_tasks: default_max_concurrent_tasks(),
            capability_timeout_secs: default_capability_timeout_secs(),
            dangling_citations: DanglingCitationPolicy::default(),
            scoping_search: default_scoping_search(),
        }
    }
}

impl ResearchSettings {
    pub fn bounds(&self) -> LoopBounds {
        LoopBounds {
            max_iterations: self.max_iterations,
            max_time: Duration::from_secs(self.max_time_minutes.saturating_mul(60)),
        }
    }

    pub fn capability_timeout(&self) -> Duration {
        Duration::from_secs(self.capability_timeout_secs)
    }
}

// ============= Model Configuration =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Ollama,
    #[serde(alias = "openai-compatible")]
    OpenAI,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_provider")]
    pub provider: ProviderKind,

    #[serde(default = "default_model")]
    pub model: String,

    /// Defaults to the provider's usual endpoint
    pub base_url: Option<String>,

    /// Environment variable containing the API key (openai only)
    pub api_key_env: Option<String>,

    pub temperature: Option<f32>,
}

fn default_provider() -> ProviderKind {
    ProviderKind::Ollama
}

fn default_model() -> String {
    "llama3.2".to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_openai_base() -> String {
    "https://api.openai.com/v1".to_string()
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            api_key_env: None,
            temperature: None,
        }
    }
}

impl ModelConfig {
    pub fn base_url(&self) -> String {
        match (&self.base_url, self.provider) {
            (Some(url), _) => url.clone(),
            (None, ProviderKind::Ollama) => default_ollama_url(),
            (None, ProviderKind::OpenAI) => default_openai_base(),
        }
    }

    /// Build a provider, reading the API key through `lookup`.
    pub fn to_provider<F>(&self, lookup: F) -> Result<Provider, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        match self.provider {
            ProviderKind::Ollama => Ok(Provider::Ollama {
                base_url: self.base_url(),
                model: self.model.clone(),
            }),
            ProviderKind::OpenAI => {
                let env = self.api_key_env.as_deref().ok_or_else(|| {
                    ConfigError::ValidationError(format!(
                        "Model '{}' uses the openai provider but has no api_key_env",
                        self.model
                    ))
                })?;
                let api_key = lookup(env).ok_or_else(|| ConfigError::MissingEnvVar(env.to_string()))?;
                Ok(Provider::OpenAI {
                    api_key,
                    api_base: self.base_url(),
                    model: self.model.clone(),
                    temperature: self.temperature,
                })
            }
        }
    }
}

/// The three model tiers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Report planning
    #[serde(default)]
    pub reasoning: ModelConfig,

    /// Synthesis and section writing
    #[serde(default)]
    pub main: ModelConfig,

    /// Reflection, gap evaluation, tool selection and capability summaries
    #[serde(default)]
    pub fast: ModelConfig,
}

impl ModelsConfig {
    fn tiers(&self) -> [(&'static str, &ModelConfig); 3] {
        [
            ("reasoning", &self.reasoning),
            ("main", &self.main),
            ("fast", &self.fast),
        ]
    }
}

// ============= Search Configuration =============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Characters kept from each fetched page
    #[serde(default = "default_content_length_limit")]
    pub content_length_limit: usize,

    /// Summarize fetched pages with the fast model
    #[serde(default = "default_summarize")]
    pub summarize: bool,

    #[serde(default = "default_crawl_max_pages")]
    pub crawl_max_pages: usize,
}

fn default_max_results() -> usize {
    5
}

fn default_content_length_limit() -> usize {
    10_000
}

fn default_summarize() -> bool {
    true
}

fn default_crawl_max_pages() -> usize {
    10
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            content_length_limit: default_content_length_limit(),
            summarize: default_summarize(),
            crawl_max_pages: default_crawl_max_pages(),
        }
    }
}

impl SearchConfig {
    pub fn options(&self) -> SearchOptions {
        SearchOptions {
            max_results: self.max_results,
            content_length_limit: self.content_length_limit,
        }
    }
}

// ============= Logging Configuration =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

impl ResearchConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config: ResearchConfig = toml::from_str(&content)?;

        config.validate()?;

        Ok(config)
    }

    /// Load an explicit path, or `deep-research.toml` in the working directory
    /// if present, or the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.exists() {
                    Self::load(fallback)
                } else {
                    tracing::debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                    Ok(Self::default())
                }
            }
        }
    }

    /// Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("research.max_iterations", self.research.max_iterations as u64),
            ("research.max_time_minutes", self.research.max_time_minutes),
            ("research.max_concurrent_tasks", self.research.max_concurrent_tasks as u64),
            ("research.capability_timeout_secs", self.research.capability_timeout_secs),
            ("search.max_results", self.search.max_results as u64),
            ("search.content_length_limit", self.search.content_length_limit as u64),
            ("search.crawl_max_pages", self.search.crawl_max_pages as u64),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "{} must be greater than zero",
                    name
                )));
            }
        }

        for (tier, model) in self.models.tiers() {
            if model.model.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "models.{}.model must not be empty",
                    tier
                )));
            }
            if model.provider == ProviderKind::OpenAI && model.api_key_env.is_none() {
                return Err(ConfigError::ValidationError(format!(
                    "models.{} uses the openai provider and needs api_key_env",
                    tier
                )));
            }
        }

        Ok(())
    }

    /// Check that every referenced environment variable is set.
    pub fn validate_env(&self) -> Result<(), ConfigError> {
        for (_, model) in self.models.tiers() {
            if let Some(env) = &model.api_key_env {
                std::env::var(env).map_err(|_| ConfigError::MissingEnvVar(env.clone()))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_config() -> String {
        r#"
[research]
max_iterations = 3
max_time_minutes = 5
max_concurrent_tasks = 2
dangling_citations = "preserve"
scoping_search = false

[models.reasoning]
provider = "openai"
model = "gpt-4o"
api_key_env = "DEEP_RESEARCH_TEST_KEY"

[models.fast]
model = "qwen2.5:3b"
base_url = "http://gpu-box:11434"

[search]
summarize = false

[logging]
level = "debug"
format = "json"
"#
        .to_string()
    }

    #[test]
    fn test_parse_config() {
        let config: ResearchConfig =
            toml::from_str(&create_test_config()).expect("Failed to parse config");

        assert_eq!(config.research.max_iterations, 3);
        assert_eq!(config.research.max_concurrent_tasks, 2);
        assert_eq!(config.research.capability_timeout_secs, 120);
        assert_eq!(config.research.dangling_citations, DanglingCitationPolicy::Preserve);
        assert!(!config.research.scoping_search);
        assert_eq!(config.models.reasoning.provider, ProviderKind::OpenAI);
        assert_eq!(config.models.reasoning.base_url(), "https://api.openai.com/v1");
        assert_eq!(config.models.main, ModelConfig::default());
        assert_eq!(config.models.fast.base_url(), "http://gpu-box:11434");
        assert!(!config.search.summarize);
        assert_eq!(config.search.max_results, 5);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: ResearchConfig = toml::from_str("").unwrap();
        assert_eq!(config, ResearchConfig::default());
        assert_eq!(config.research.bounds(), LoopBounds::default());
        assert_eq!(config.research.capability_timeout(), Duration::from_secs(120));
        assert!(config.research.scoping_search);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(create_test_config().as_bytes()).unwrap();

        let config = ResearchConfig::load(file.path()).unwrap();
        assert_eq!(config.research.max_time_minutes, 5);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");
        let result = ResearchConfig::load(&path);
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));

        let result = ResearchConfig::load_or_default(Some(&path));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_invalid_toml() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[research\nmax_iterations = ").unwrap();
        assert!(matches!(
            ResearchConfig::load(file.path()),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_zero_bounds_rejected() {
        let config: ResearchConfig = toml::from_str("[research]\nmax_iterations = 0").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("research.max_iterations"));
    }

    #[test]
    fn test_huge_time_budget_saturates() {
        let config: ResearchConfig =
            toml::from_str(&format!("[research]\nmax_time_minutes = {}", u64::MAX / 10)).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.research.bounds().max_time, Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_openai_requires_api_key_env() {
        let config: ResearchConfig =
            toml::from_str("[models.main]\nprovider = \"openai\"\nmodel = \"gpt-4o\"").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_unknown_provider_is_parse_error() {
        let result: Result<ResearchConfig, _> = toml::from_str("[models.main]\nprovider = \"gemini\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_to_provider_resolves_key() {
        let config: ResearchConfig = toml::from_str(&create_test_config()).unwrap();

        let provider = config
            .models
            .reasoning
            .to_provider(|name| (name == "DEEP_RESEARCH_TEST_KEY").then(|| "sk-test".to_string()))
            .unwrap();
        match provider {
            Provider::OpenAI { api_key, model, .. } => {
                assert_eq!(api_key, "sk-test");
                assert_eq!(model, "gpt-4o");
            }
            other => panic!("unexpected provider {:?}", other),
        }

        let missing = config.models.reasoning.to_provider(|_| None);
        assert!(matches!(missing, Err(ConfigError::MissingEnvVar(name)) if name == "DEEP_RESEARCH_TEST_KEY"));

        let ollama = config.models.fast.to_provider(|_| None).unwrap();
        assert!(matches!(ollama, Provider::Ollama { ref base_url, .. } if base_url == "http://gpu-box:11434"));
    }
}
