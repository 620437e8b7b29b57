//! Harness configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{E2eError, E2eResult};
use crate::playwright::PlaywrightConfig;
use crate::server::AppConfig;
use crate::session::DEFAULT_ADMIN_CREDENTIAL;

/// Harness configuration, usually from `media-e2e.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Credential submitted by `authenticate` steps without their own
    pub admin_credential: String,

    /// Directory of YAML scenarios, in addition to the built-ins
    pub specs_dir: Option<PathBuf>,

    /// Output directory for the JSON report
    pub output_dir: PathBuf,

    /// Scenarios run when nothing is selected; empty means every built-in
    /// or YAML scenario not tagged opt-in
    pub default_scenarios: Vec<String>,

    /// Browser and script settings
    pub playwright: PlaywrightConfig,

    /// Application under test
    pub app: AppConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            admin_credential: DEFAULT_ADMIN_CREDENTIAL.to_string(),
            specs_dir: None,
            output_dir: PathBuf::from("test-results"),
            default_scenarios: Vec::new(),
            playwright: PlaywrightConfig::default(),
            app: AppConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Load configuration from file, or defaults when it does not exist
    pub fn load(path: &Path) -> E2eResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> E2eResult<()> {
        let url = &self.playwright.base_url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(E2eError::Config(format!("base_url must be http(s): {}", url)));
        }
        if self.playwright.script_timeout_secs == 0 {
            return Err(E2eError::Config("script_timeout_secs must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playwright::Browser;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = HarnessConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.admin_credential, "12345");
        assert_eq!(config.playwright.base_url, "http://localhost:3000");
    }

    #[test]
    fn partial_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("media-e2e.toml");
        std::fs::write(
            &path,
            r#"
admin_credential = "s3cret"

[playwright]
base_url = "http://127.0.0.1:4000"
browser = "webkit"

[app]
command = ["npm", "run", "dev"]
startup_timeout_secs = 90
"#,
        )
        .unwrap();

        let config = HarnessConfig::load(&path).unwrap();
        assert_eq!(config.admin_credential, "s3cret");
        assert_eq!(config.playwright.browser, Browser::Webkit);
        assert!(config.playwright.headless);
        assert_eq!(config.app.command, vec!["npm", "run", "dev"]);
        assert_eq!(config.app.health_path, "/");
    }

    #[test]
    fn rejects_non_http_base_url() {
        let mut config = HarnessConfig::default();
        config.playwright.base_url = "localhost:3000".to_string();
        assert!(matches!(config.validate(), Err(E2eError::Config(_))));
    }
}
