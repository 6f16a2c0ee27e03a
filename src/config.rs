//! Layered configuration: defaults, one TOML file, environment, CLI flags.
//!
//! The resolved values are handed to each component constructor; nothing in
//! the crate reads configuration from global state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{DocError, Result};

pub const PROJECT_CONFIG_FILE: &str = ".docenhancer.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Local,
    OpenAi,
    Anthropic,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Local => "local",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
        }
    }

    pub fn default_endpoint(&self) -> &'static str {
        match self {
            ProviderKind::Local => "http://localhost:11434",
            ProviderKind::OpenAi => "https://api.openai.com",
            ProviderKind::Anthropic => "https://api.anthropic.com",
        }
    }

    /// Environment variable holding the API key, for cloud backends.
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            ProviderKind::Local => None,
            ProviderKind::OpenAi => Some("OPENAI_API_KEY"),
            ProviderKind::Anthropic => Some("ANTHROPIC_API_KEY"),
        }
    }

    pub fn is_cloud(&self) -> bool {
        !matches!(self, ProviderKind::Local)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = DocError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(ProviderKind::Local),
            "openai" => Ok(ProviderKind::OpenAi),
            "anthropic" => Ok(ProviderKind::Anthropic),
            other => Err(DocError::config(format!(
                "unknown provider '{}' (expected local, openai or anthropic)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub language: Language,
    pub provider: ProviderConfig,
    pub runner: RunnerConfig,
    pub search: SearchConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Language(pub String);

impl Default for Language {
    fn default() -> Self {
        Language("en".to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// local, openai or anthropic
    pub name: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    pub timeout_secs: u64,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: None,
            model: None,
            api_key: None,
            endpoint: None,
            timeout_secs: 120,
            temperature: 0.2,
            max_tokens: 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub python: String,
    pub timeout_secs: u64,
    pub max_output_bytes: usize,
    /// Address-space cap applied inside the example process (POSIX only)
    pub memory_limit_mb: Option<u64>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            python: "python3".to_string(),
            timeout_secs: 5,
            max_output_bytes: 8 * 1024,
            memory_limit_mb: Some(512),
        }
    }
}

impl RunnerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub embed_model: String,
    pub endpoint: Option<String>,
    pub dimensions: usize,
    pub limit: usize,
    pub index_file: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            embed_model: "nomic-embed-text".to_string(),
            endpoint: None,
            dimensions: 768,
            limit: 5,
            index_file: ".docenhancer-index.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

/// Provider settings after validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedProvider {
    pub kind: ProviderKind,
    pub model: String,
    pub api_key: Option<String>,
    pub endpoint: String,
    pub timeout: Duration,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| DocError::config(format!("invalid config: {}", e)))
    }

    /// Load the first config file found: the explicit path, then
    /// `./.docenhancer.toml`, then the user config directory. Missing files
    /// yield defaults; an explicit path that does not exist is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(DocError::config(format!(
                    "config file {} does not exist",
                    path.display()
                )));
            }
            return Self::from_file(path);
        }

        for candidate in Self::candidate_paths() {
            if candidate.is_file() {
                return Self::from_file(&candidate);
            }
        }

        Ok(Self::default())
    }

    fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(PROJECT_CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("docenhancer").join("config.toml"));
        }
        paths
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| DocError::io(path, e))?;
        Self::from_toml_str(&content).map_err(|e| match e {
            DocError::Configuration(msg) => {
                DocError::config(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    /// Apply `DOCENHANCER_*` overrides from the given environment lookup.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty("DOCENHANCER_PROVIDER") {
            self.select_provider(&v);
        }
        if let Some(v) = non_empty("DOCENHANCER_MODEL") {
            self.provider.model = Some(v);
        }
        if let Some(v) = non_empty("DOCENHANCER_API_KEY") {
            self.provider.api_key = Some(v);
        }
        if let Some(v) = non_empty("DOCENHANCER_ENDPOINT") {
            self.provider.endpoint = Some(v);
        }
        if let Some(v) = non_empty("DOCENHANCER_LANGUAGE") {
            self.language = Language(v);
        }
    }

    /// Switch to another backend. A key or endpoint configured for a
    /// different backend is dropped so it is never sent to this one.
    pub fn select_provider(&mut self, name: &str) {
        let switching = self
            .provider
            .name
            .as_deref()
            .is_some_and(|current| !current.trim().eq_ignore_ascii_case(name.trim()));
        if switching {
            self.provider.api_key = None;
            self.provider.endpoint = None;
        }
        self.provider.name = Some(name.to_string());
    }

    /// Fill a missing API key from the provider's conventional variable
    /// (`OPENAI_API_KEY`, `ANTHROPIC_API_KEY`).
    pub fn fill_provider_key<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.provider.api_key.is_some() {
            return;
        }
        let kind = self
            .provider
            .name
            .as_deref()
            .and_then(|name| name.parse::<ProviderKind>().ok());
        if let Some(var) = kind.and_then(|k| k.api_key_env()) {
            self.provider.api_key = lookup(var).filter(|v| !v.trim().is_empty());
        }
    }

    pub fn language(&self) -> &str {
        &self.language.0
    }

    /// Validate provider settings. Fails before any network activity when
    /// the provider, model, or a required API key is missing.
    pub fn resolve_provider(&self) -> Result<ResolvedProvider> {
        let name = self
            .provider
            .name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| {
                DocError::config(
                    "no provider configured; pass --provider {local|openai|anthropic} or set DOCENHANCER_PROVIDER",
                )
            })?;
        let kind: ProviderKind = name.parse()?;

        let model = self
            .provider
            .model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .ok_or_else(|| {
                DocError::config(format!(
                    "no model configured for provider '{}'; pass --model or set DOCENHANCER_MODEL",
                    kind
                ))
            })?;

        let api_key = self
            .provider
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty());
        if kind.is_cloud() && api_key.is_none() {
            return Err(DocError::config(format!(
                "provider '{}' requires an API key; pass --api-key or set {}",
                kind,
                kind.api_key_env().unwrap_or("DOCENHANCER_API_KEY")
            )));
        }

        if self.language().trim().is_empty() {
            return Err(DocError::config("language must not be empty"));
        }

        let endpoint = self
            .provider
            .endpoint
            .clone()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| kind.default_endpoint().to_string());

        Ok(ResolvedProvider {
            kind,
            model: model.to_string(),
            api_key,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(self.provider.timeout_secs.max(1)),
            temperature: self.provider.temperature,
            max_tokens: self.provider.max_tokens,
        })
    }
}
