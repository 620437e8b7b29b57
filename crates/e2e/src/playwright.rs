//! Playwright browser automation
//!
//! A scenario is rendered into one self-contained Node.js script: one browser,
//! one fresh context with the backend mock installed, one page, every step in
//! order, and `browser.close()` in a `finally`. The script reports back over
//! the line protocol in [`crate::protocol`].

use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command as TokioCommand;
use tracing::{debug, warn};

use crate::error::{E2eError, E2eResult};
use crate::protocol::{ScriptOutput, EVENT_PREFIX};
use crate::spec::{ScenarioSpec, TestStep};
use crate::target::js_string;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

/// Runs a generated script and collects what it reported.
#[async_trait]
pub trait ScriptExecutor: Send + Sync {
    async fn execute(&self, script: &str) -> E2eResult<ScriptOutput>;
}

/// Configuration for Playwright
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaywrightConfig {
    /// Base URL of the application under test
    pub base_url: String,
    pub browser: Browser,
    pub headless: bool,
    /// Node.js executable
    pub node_binary: PathBuf,
    /// Directory whose `node_modules` provides `playwright`
    pub node_modules_dir: PathBuf,
    /// Default timeout for Playwright actions
    pub action_timeout_ms: u64,
    /// Hard limit for a whole scenario script
    pub script_timeout_secs: u64,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            browser: Browser::Chromium,
            headless: true,
            node_binary: PathBuf::from("node"),
            node_modules_dir: PathBuf::from("."),
            action_timeout_ms: 10_000,
            script_timeout_secs: 120,
        }
    }
}

impl PlaywrightConfig {
    /// Build the Playwright script for one scenario
    pub fn build_script(&self, spec: &ScenarioSpec, admin_credential: &str) -> E2eResult<String> {
        let backend = spec.backend()?;
        let mut script = String::new();

        // Header
        script.push_str(&format!(
            r#"const {{ chromium, firefox, webkit }} = require('playwright');

const emit = (event) => console.log({prefix} + JSON.stringify(event));

(async () => {{
  const browser = await {browser}.launch({{ headless: {headless} }});
  try {{
    const context = await browser.newContext({{
      viewport: {{ width: {width}, height: {height} }}
    }});
    const requests = [];
{mock}
    const page = await context.newPage();
    page.setDefaultTimeout({timeout});
    const baseUrl = {base_url};

    const step = async (index, name, body) => {{
      const started = Date.now();
      try {{
        const outcome = await body();
        emit({{ event: 'step', index, name, ok: true, duration_ms: Date.now() - started }});
        return outcome;
      }} catch (error) {{
        emit({{ event: 'step', index, name, ok: false, duration_ms: Date.now() - started, error_name: error.name, error: error.message }});
        throw error;
      }}
    }};

    const run = async () => {{
"#,
            prefix = js_string(EVENT_PREFIX),
            browser = self.browser.as_str(),
            headless = self.headless,
            width = spec.viewport.width,
            height = spec.viewport.height,
            mock = backend.to_js()?,
            timeout = self.action_timeout_ms,
            base_url = js_string(&self.base_url),
        ));

        // Generate step code
        for (i, step) in spec.expanded_steps(admin_credential).iter().enumerate() {
            script.push_str(&format!("      // Step {}: {}\n", i + 1, step.name()));
            script.push_str(&format!(
                "      if ((await step({}, {}, async () => {{\n{}\n      }})) === false) return;\n",
                i,
                js_string(&step.name()),
                self.step_to_js(step, i, admin_credential)
            ));
        }

        // Footer
        script.push_str(
            r#"    };

    await run();
    emit({ event: 'done' });
  } catch (error) {
    emit({ event: 'error', name: error.name, message: error.message });
  } finally {
    await browser.close();
  }
})().catch((error) => {
  emit({ event: 'error', name: error.name, message: error.message });
  process.exitCode = 1;
});
"#,
        );

        Ok(script)
    }

    /// Convert a step to the body of its step closure
    fn step_to_js(&self, step: &TestStep, step_index: usize, admin_credential: &str) -> String {
        match step {
            TestStep::Navigate { url, wait_for } => {
                let wait = wait_for
                    .as_ref()
                    .map(|t| format!("\n      await {}.waitFor({{ state: 'visible' }});", t.locator()))
                    .unwrap_or_default();
                format!(
                    "      await page.goto(new URL({}, baseUrl).toString());{}",
                    js_string(url),
                    wait
                )
            }
            TestStep::Fill { target, value } => {
                format!("      await {}.fill({});", target.locator(), js_string(value))
            }
            TestStep::Click { target, timeout_ms } => match timeout_ms {
                Some(t) => format!("      await {}.click({{ timeout: {} }});", target.locator(), t),
                None => format!("      await {}.click();", target.locator()),
            },
            TestStep::Wait { target, timeout_ms, state } => format!(
                "      await {}.waitFor({{ state: '{}', timeout: {} }});",
                target.locator(),
                state.as_str(),
                timeout_ms
            ),
            TestStep::Sleep { ms } => format!("      await page.waitForTimeout({});", ms),
            TestStep::Authenticate(_) | TestStep::CreateFolder(_) => step
                .expand(admin_credential)
                .iter()
                .map(|s| self.step_to_js(s, step_index, admin_credential))
                .collect::<Vec<_>>()
                .join("\n"),
            TestStep::Drag(dispatch) => dispatch.to_js(step_index),
            TestStep::ExpectLabel(check) => check.to_js(step_index),
            TestStep::ExpectRequest(check) => check.to_js(step_index),
            TestStep::Log { message } => {
                format!("      console.log('[TEST] ' + {});", js_string(message))
            }
        }
    }
}

/// Playwright browser handle
pub struct PlaywrightHandle {
    config: PlaywrightConfig,
}

impl PlaywrightHandle {
    /// Create a new Playwright handle
    pub fn new(config: PlaywrightConfig) -> E2eResult<Self> {
        // Verify playwright is installed
        Self::check_playwright_installed(&config)?;
        Ok(Self { config })
    }


    /// Check if Playwright is installed
    fn check_playwright_installed(config: &PlaywrightConfig) -> E2eResult<()> {
        let output = Command::new("npx")
            .args(["--no-install", "playwright", "--version"])
            .current_dir(&config.node_modules_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    fn node_path(&self) -> PathBuf {
        let dir = if self.config.node_modules_dir.is_absolute() {
            self.config.node_modules_dir.clone()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(&self.config.node_modules_dir))
                .unwrap_or_else(|_| self.config.node_modules_dir.clone())
        };
        dir.join("node_modules")
    }

    /// Execute the full script via Node
    pub async fn run_script(&self, script: &str) -> E2eResult<ScriptOutput> {
        // Write script to temp file
        let temp_dir = tempfile::tempdir()?;
        let script_path = temp_dir.path().join("scenario.js");
        std::fs::write(&script_path, script)?;

        debug!("Running Playwright script: {}", script_path.display());

        let child = TokioCommand::new(&self.config.node_binary)
            .arg(&script_path)
            .current_dir(temp_dir.path())
            .env("NODE_PATH", self.node_path())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                E2eError::Playwright(format!(
                    "failed to spawn {}: {}",
                    self.config.node_binary.display(),
                    e
                ))
            })?;

        let limit = Duration::from_secs(self.config.script_timeout_secs);
        let output = tokio::time::timeout(limit, child.wait_with_output())
            .await
            .map_err(|_| E2eError::Timeout(format!("scenario script after {:?}", limit)))??;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let parsed = ScriptOutput::parse(&stdout, &stderr, output.status.code());

        if parsed.events.is_empty() {
            return Err(E2eError::Playwright(format!(
                "Script produced no events:\nstdout: {}\nstderr: {}",
                stdout, stderr
            )));
        }
        if !output.status.success() {
            warn!("Playwright script exited with {}", output.status);
        }

        Ok(parsed)
    }
}

#[async_trait]
impl ScriptExecutor for PlaywrightHandle {
    async fn execute(&self, script: &str) -> E2eResult<ScriptOutput> {
        self.run_script(script).await
    }
}
