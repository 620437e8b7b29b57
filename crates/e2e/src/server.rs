//! Application under test: health checking an external server, or spawning one

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};

/// Handle to the application. Stops a spawned process on drop.
pub struct AppServer {
    child: Option<Child>,
    base_url: String,
}

impl AppServer {
    /// Use the configured server: spawn it if a command is given, then wait
    /// until `base_url` answers.
    pub async fn start(config: &AppConfig, base_url: &str) -> E2eResult<Self> {
        let child = match config.command.split_first() {
            Some((program, args)) => Some(Self::spawn(config, program, args, base_url)?),
            None => None,
        };

        let handle = AppServer {
            child,
            base_url: base_url.to_string(),
        };

        handle
            .wait_for_healthy(&config.health_path, Duration::from_secs(config.startup_timeout_secs))
            .await?;

        info!("Application is healthy at {}", handle.base_url);
        Ok(handle)
    }

    fn spawn(config: &AppConfig, program: &str, args: &[String], base_url: &str) -> E2eResult<Child> {
        info!("Spawning application: {} {}", program, args.join(" "));

        let mut cmd = Command::new(program);
        cmd.args(args);

        if let Some(dir) = &config.workdir {
            cmd.current_dir(dir);
        }
        if let Some(port) = port_of(base_url) {
            cmd.env("PORT", port.to_string());
        }
        for (key, value) in &config.env {
            cmd.env(key, value);
        }

        cmd.stdout(Stdio::null()).stderr(Stdio::null());

        cmd.spawn().map_err(|e| {
            E2eError::ServerStartup(format!("Failed to spawn {}: {}", program, e))
        })
    }

    /// Wait for the application to respond
    async fn wait_for_healthy(&self, health_path: &str, timeout_duration: Duration) -> E2eResult<()> {
        let health_url = format!("{}{}", self.base_url.trim_end_matches('/'), health_path);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;

        let start = std::time::Instant::now();
        let mut attempts = 0;

        while start.elapsed() < timeout_duration {
            attempts += 1;

            match client.get(&health_url).send().await {
                Ok(resp) if resp.status().is_success() || resp.status().is_redirection() => {
                    return Ok(());
                }
                Ok(resp) => {
                    warn!("Health check returned {}", resp.status());
                }
                Err(e) => {
                    if attempts == 1 {
                        info!("Waiting for application at {}...", health_url);
                    }
                    // Connection refused is expected while the app is starting
                    if !e.is_connect() {
                        warn!("Health check error: {}", e);
                    }
                }
            }

            sleep(Duration::from_millis(250)).await;
        }

        Err(E2eError::ServerHealthCheck(attempts))
    }

    /// Stop a spawned application; no-op for an external one
    pub fn stop(&mut self) -> E2eResult<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        info!("Stopping application (pid: {})", child.id());

        // Try graceful shutdown first
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let pid = Pid::from_raw(child.id() as i32);
            if kill(pid, Signal::SIGTERM).is_ok() {
                // Give it a moment to shut down gracefully
                std::thread::sleep(Duration::from_millis(500));
            }
        }

        // Force kill if still running
        let _ = child.kill();
        let _ = child.wait();

        Ok(())
    }
}

impl Drop for AppServer {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// How to reach (or start) the application
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Command that starts the application; empty means it is already running
    pub command: Vec<String>,

    /// Working directory for the command
    pub workdir: Option<PathBuf>,

    /// Extra environment for the command
    pub env: BTreeMap<String, String>,

    /// Path polled until the application answers
    pub health_path: String,

    /// Timeout for startup
    pub startup_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            workdir: None,
            env: BTreeMap::new(),
            health_path: "/".to_string(),
            startup_timeout_secs: 60,
        }
    }
}

/// Port from a URL like `http://localhost:3000/`
fn port_of(base_url: &str) -> Option<u16> {
    let authority = base_url.split("://").nth(1)?.split('/').next()?;
    authority.rsplit_once(':')?.1.parse().ok()
}
