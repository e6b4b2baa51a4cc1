pub mod chat;
use serde::{ Deserialize, Serialize };
use std::str::FromStr;
use std::fmt;
use std::time::Duration;
use url::Url;
use crate::error::ConfigError;

/// Shape of the request sent per submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    /// `{"prompt": "..."}` carrying only the latest input.
    Single,
    /// `{"history": [...]}` carrying every turn so far.
    Multi,
}

/// What `submit` does with blank input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmptyInputPolicy {
    Block,
    PassThrough,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseOptionError {
    message: String,
}

impl fmt::Display for ParseOptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseOptionError {}

impl FromStr for GenerationMode {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single" | "single-turn" | "prompt" => Ok(GenerationMode::Single),
            "multi" | "multi-turn" | "history" => Ok(GenerationMode::Multi),
            _ =>
                Err(ParseOptionError {
                    message: format!("Invalid generation mode: '{}'", s),
                }),
        }
    }
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationMode::Single => write!(f, "single"),
            GenerationMode::Multi => write!(f, "multi"),
        }
    }
}

impl FromStr for EmptyInputPolicy {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "block" => Ok(EmptyInputPolicy::Block),
            "pass-through" | "passthrough" | "allow" => Ok(EmptyInputPolicy::PassThrough),
            _ =>
                Err(ParseOptionError {
                    message: format!("Invalid empty input policy: '{}'", s),
                }),
        }
    }
}

impl fmt::Display for EmptyInputPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmptyInputPolicy::Block => write!(f, "block"),
            EmptyInputPolicy::PassThrough => write!(f, "pass-through"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub url: Url,
    pub mode: GenerationMode,
    pub timeout: Option<Duration>,
    pub use_system_proxy: bool,
}

impl BackendConfig {
    pub fn new(
        url: &str,
        mode: GenerationMode,
        timeout: Option<Duration>
    ) -> Result<Self, ConfigError> {
        let parsed = Url::parse(url.trim()).map_err(|source| ConfigError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        match parsed.scheme() {
            "http" | "https" => {}
            other => {
                return Err(ConfigError::UnsupportedScheme(other.to_string()));
            }
        }
        Ok(Self { url: parsed, mode, timeout, use_system_proxy: true })
    }

    pub fn without_proxy(mut self) -> Self {
        self.use_system_proxy = false;
        self
    }

    /// Sibling `/health` route of the generate endpoint.
    pub fn health_url(&self) -> Url {
        let mut url = self.url.clone();
        let path = match url.path().trim_end_matches('/').rsplit_once('/') {
            Some((base, _)) => format!("{}/health", base),
            None => "/health".to_string(),
        };
        url.set_path(&path);
        url.set_query(None);
        url
    }
}
