//! Scenario runner: one isolated browser per scenario, structured verdicts

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::{E2eError, E2eResult, FailureKind};
use crate::mock::MockRequest;
use crate::playwright::{PlaywrightConfig, ScriptExecutor};
use crate::protocol::{Observation, ScriptEvent, ScriptOutput, StepRecord};
use crate::spec::{ScenarioSpec, TestStep};

/// Terminal result of one scenario run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub scenario: String,
    /// Repetition number, starting at 1
    pub run: usize,
    pub success: bool,
    pub failure: Option<FailureKind>,
    pub detail: String,
    pub duration_ms: u64,
    /// Label lines requested by checks with `report_as`
    pub report: Vec<String>,
    pub steps: Vec<StepRecord>,
    pub observations: Vec<Observation>,
    pub requests: Vec<MockRequest>,
}

impl Verdict {
    fn failed(scenario: &str, run: usize, kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            scenario: scenario.to_string(),
            run,
            success: false,
            failure: Some(kind),
            detail: detail.into(),
            duration_ms: 0,
            report: Vec::new(),
            steps: Vec::new(),
            observations: Vec::new(),
            requests: Vec::new(),
        }
    }

    /// Final human-readable line.
    pub fn summary_line(&self) -> String {
        match self.failure {
            None => format!("SUCCESS: {}", self.detail),
            Some(FailureKind::Assertion) => format!("FAILURE: {}", self.detail),
            Some(_) => format!("Error: {}", self.detail),
        }
    }
}

/// Result of running a batch of scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub repeat: usize,
    pub duration_ms: u64,
    /// Scenarios whose verdict differed between repetitions
    pub inconsistent: Vec<String>,
    pub results: Vec<Verdict>,
}

impl SuiteReport {
    pub fn success(&self) -> bool {
        self.failed == 0 && self.inconsistent.is_empty()
    }

    /// 0 when everything passed, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        if self.success() {
            0
        } else {
            1
        }
    }

    /// Write the report to `<dir>/e2e-results.json`
    pub fn write_json(&self, dir: &Path) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(dir)?;

        let path = dir.join("e2e-results.json");
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

/// Main scenario runner
pub struct ScenarioRunner<E> {
    executor: E,
    playwright: PlaywrightConfig,
    admin_credential: String,
}

impl<E: ScriptExecutor> ScenarioRunner<E> {
    pub fn new(executor: E, playwright: PlaywrightConfig, admin_credential: impl Into<String>) -> Self {
        Self {
            executor,
            playwright,
            admin_credential: admin_credential.into(),
        }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Generated script for a scenario
    pub fn script_for(&self, spec: &ScenarioSpec) -> E2eResult<String> {
        self.playwright.build_script(spec, &self.admin_credential)
    }

    /// Run one scenario. Every failure becomes a verdict.
    pub async fn run_scenario(&self, spec: &ScenarioSpec, run: usize) -> Verdict {
        let start = Instant::now();
        debug!("Running scenario: {} (run {})", spec.name, run);

        let mut verdict = match self.execute(spec).await {
            Ok(output) => self.judge(spec, run, &output),
            Err(e) => Verdict::failed(&spec.name, run, e.kind(), e.to_string()),
        };
        verdict.duration_ms = start.elapsed().as_millis() as u64;
        verdict
    }

    async fn execute(&self, spec: &ScenarioSpec) -> E2eResult<ScriptOutput> {
        let script = self.script_for(spec)?;
        self.executor.execute(&script).await
    }

    /// Turn what the script reported into a verdict.
    pub fn judge(&self, spec: &ScenarioSpec, run: usize, output: &ScriptOutput) -> Verdict {
        let steps = spec.expanded_steps(&self.admin_credential);
        let mut verdict = Verdict {
            scenario: spec.name.clone(),
            run,
            success: true,
            failure: None,
            detail: spec.success_message.clone(),
            duration_ms: 0,
            report: Vec::new(),
            steps: output.steps().cloned().collect(),
            observations: output.observations().cloned().collect(),
            requests: output.requests().cloned().collect(),
        };

        let mut assertion_failed = false;
        let mut checks_seen = 0;

        for event in &output.events {
            match event {
                ScriptEvent::Observation(obs) => {
                    checks_seen += 1;
                    let Some(TestStep::ExpectLabel(check)) = steps.get(obs.index) else {
                        warn!("Observation for unknown step {}", obs.index);
                        assertion_failed = true;
                        continue;
                    };
                    if let Some(prefix) = &check.report_as {
                        verdict.report.push(format!(
                            "{} {}: {}",
                            prefix,
                            obs.attribute,
                            format_labels(&obs.labels)
                        ));
                    }
                    let held = check.expect.holds(&obs.labels);
                    if held != obs.passed {
                        warn!(
                            "Page and runner disagree on step {} ({} vs {})",
                            obs.index, obs.passed, held
                        );
                    }
                    assertion_failed |= !held;
                }
                ScriptEvent::RequestCheck { index, matched, .. } => {
                    checks_seen += 1;
                    let held = match (steps.get(*index), matched) {
                        (Some(TestStep::ExpectRequest(check)), Some(request)) => check.matches(request),
                        _ => false,
                    };
                    assertion_failed |= !held;
                }
                _ => {}
            }
        }

        if let Some((name, message)) = output.error() {
            verdict.success = false;
            verdict.failure = Some(FailureKind::from_error_name(name));
            verdict.detail = message.to_string();
        } else if assertion_failed {
            verdict.success = false;
            verdict.failure = Some(FailureKind::Assertion);
            verdict.detail = spec.failure_message.clone();
        } else if !output.completed() {
            verdict.success = false;
            verdict.failure = Some(FailureKind::Unexpected);
            verdict.detail = format!(
                "script ended before completion (exit code {:?}): {}",
                output.exit_code,
                output.stderr.lines().last().unwrap_or("")
            );
        } else {
            let expected = steps.iter().filter(|s| s.is_check()).count();
            if checks_seen < expected {
                verdict.success = false;
                verdict.failure = Some(FailureKind::Unexpected);
                verdict.detail = format!("only {} of {} checks reported", checks_seen, expected);
            }
        }

        verdict
    }

    /// Run every scenario `repeat` times, each in its own browser.
    pub async fn run_suite(&self, specs: &[ScenarioSpec], repeat: usize) -> SuiteReport {
        let started_at = Utc::now();
        let start = Instant::now();
        let repeat = repeat.max(1);
        let mut results = Vec::new();
        let mut inconsistent = Vec::new();
        let mut passed = 0;
        let mut failed = 0;

        info!("Running {} scenario(s) x{}...", specs.len(), repeat);

        for spec in specs {
            let mut outcomes = Vec::with_capacity(repeat);
            for run in 1..=repeat {
                let verdict = self.run_scenario(spec, run).await;
                if verdict.success {
                    passed += 1;
                    info!("✓ {} ({} ms)", verdict.scenario, verdict.duration_ms);
                } else {
                    failed += 1;
                    error!(
                        "✗ {} [{}] - {}",
                        verdict.scenario,
                        verdict.failure.map(|k| k.as_str()).unwrap_or("unknown"),
                        verdict.detail
                    );
                }
                outcomes.push(verdict.success);
                results.push(verdict);
            }
            if outcomes.windows(2).any(|w| w[0] != w[1]) {
                warn!("Scenario '{}' gave different verdicts across runs", spec.name);
                inconsistent.push(spec.name.clone());
            }
        }

        let duration_ms = start.elapsed().as_millis() as u64;

        info!(
            "Scenario results: {} passed, {} failed ({} ms)",
            passed, failed, duration_ms
        );

        SuiteReport {
            started_at,
            total: results.len(),
            passed,
            failed,
            repeat,
            duration_ms,
            inconsistent,
            results,
        }
    }
}

fn format_labels(labels: &[Option<String>]) -> String {
    let rendered: Vec<String> = labels
        .iter()
        .map(|l| l.clone().unwrap_or_else(|| "None".to_string()))
        .collect();
    rendered.join(" | ")
}

/// Pick scenarios by name and/or tag. No selection means `defaults`.
pub fn select(
    available: Vec<ScenarioSpec>,
    defaults: &[String],
    names: &[String],
    tag: Option<&str>,
) -> E2eResult<Vec<ScenarioSpec>> {
    if names.is_empty() && tag.is_none() {
        return Ok(available
            .into_iter()
            .filter(|s| defaults.contains(&s.name))
            .collect());
    }

    for name in names {
        if !available.iter().any(|s| &s.name == name) {
            return Err(E2eError::ScenarioNotFound(name.clone()));
        }
    }

    Ok(available
        .into_iter()
        .filter(|s| names.contains(&s.name) || tag.map_or(false, |t| s.has_tag(t)))
        .collect())
}
