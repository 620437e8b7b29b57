//! Line protocol between the generated Playwright script and the runner
//!
//! The script prints one JSON object per line, prefixed with
//! [`EVENT_PREFIX`]. Anything else on stdout is page or tool noise.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::mock::MockRequest;

pub const EVENT_PREFIX: &str = "@@E2E ";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScriptEvent {
    Step(StepRecord),
    Request {
        #[serde(flatten)]
        request: MockRequest,
        rule: Option<usize>,
    },
    Dispatch {
        index: usize,
        #[serde(rename = "type")]
        kind: String,
        target: String,
        delivered: bool,
        default_prevented: bool,
    },
    Observation(Observation),
    RequestCheck {
        index: usize,
        matched: Option<MockRequest>,
        elapsed_ms: u64,
        passed: bool,
    },
    Error {
        #[serde(default)]
        name: Option<String>,
        message: String,
    },
    Done,
}

/// Outcome of one executed step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub index: usize,
    pub name: String,
    pub ok: bool,
    pub duration_ms: u64,
    #[serde(default)]
    pub error_name: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Labels read by a label check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub index: usize,
    pub target: String,
    pub attribute: String,
    pub expectation: String,
    pub marker: String,
    pub labels: Vec<Option<String>>,
    pub attempts: u32,
    pub elapsed_ms: u64,
    pub passed: bool,
}

/// Everything a script run reported
#[derive(Debug, Clone, Default)]
pub struct ScriptOutput {
    pub events: Vec<ScriptEvent>,
    /// Non-protocol stdout lines
    pub noise: Vec<String>,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

impl ScriptOutput {
    /// Split raw stdout into protocol events and noise.
    pub fn parse(stdout: &str, stderr: &str, exit_code: Option<i32>) -> Self {
        let mut events = Vec::new();
        let mut noise = Vec::new();

        for line in stdout.lines() {
            match line.strip_prefix(EVENT_PREFIX) {
                Some(payload) => match serde_json::from_str::<ScriptEvent>(payload) {
                    Ok(event) => events.push(event),
                    Err(e) => {
                        debug!("Unparseable script event ({}): {}", e, payload);
                        noise.push(line.to_string());
                    }
                },
                None => noise.push(line.to_string()),
            }
        }

        Self {
            events,
            noise,
            stderr: stderr.to_string(),
            exit_code,
        }
    }

    pub fn steps(&self) -> impl Iterator<Item = &StepRecord> {
        self.events.iter().filter_map(|e| match e {
            ScriptEvent::Step(step) => Some(step),
            _ => None,
        })
    }

    pub fn observations(&self) -> impl Iterator<Item = &Observation> {
        self.events.iter().filter_map(|e| match e {
            ScriptEvent::Observation(obs) => Some(obs),
            _ => None,
        })
    }

    pub fn requests(&self) -> impl Iterator<Item = &MockRequest> {
        self.events.iter().filter_map(|e| match e {
            ScriptEvent::Request { request, .. } => Some(request),
            _ => None,
        })
    }

    pub fn error(&self) -> Option<(Option<&str>, &str)> {
        self.events.iter().find_map(|e| match e {
            ScriptEvent::Error { name, message } => Some((name.as_deref(), message.as_str())),
            _ => None,
        })
    }

    pub fn completed(&self) -> bool {
        self.events.iter().any(|e| matches!(e, ScriptEvent::Done))
    }
}
