//! Error types for E2E verification

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Application failed to start: {0}")]
    ServerStartup(String),

    #[error("Application health check failed after {0} attempts")]
    ServerHealthCheck(usize),

    #[error("Playwright not found. Install with: npm install playwright && npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Scenario parse error: {0}")]
    SpecParse(String),

    #[error("Scenario not found: {0}")]
    ScenarioNotFound(String),

    #[error("Invalid mock backend: {0}")]
    InvalidMock(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Glob pattern error: {0}")]
    Pattern(#[from] regex::Error),
}

pub type E2eResult<T> = Result<T, E2eError>;

/// Classification of a failed scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// A step could not complete, typically a selector that never appeared.
    Setup,
    /// The page was reachable but the observed state was wrong.
    Assertion,
    /// Anything else: script crashes, missing tooling, bad input.
    Unexpected,
}

impl FailureKind {
    /// Classify a Playwright error by its JS `error.name`.
    pub fn from_error_name(name: Option<&str>) -> Self {
        match name {
            Some("TimeoutError") => FailureKind::Setup,
            _ => FailureKind::Unexpected,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Setup => "setup",
            FailureKind::Assertion => "assertion",
            FailureKind::Unexpected => "unexpected",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl E2eError {
    /// Failure kind for an error raised by the harness itself.
    pub fn kind(&self) -> FailureKind {
        match self {
            E2eError::Timeout(_) | E2eError::ServerHealthCheck(_) => FailureKind::Setup,
            _ => FailureKind::Unexpected,
        }
    }
}
