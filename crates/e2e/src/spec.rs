//! Declarative YAML scenarios

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::drag::DragDispatch;
use crate::error::{E2eError, E2eResult};
use crate::mock::{MockBackend, MockSpec};
use crate::observe::{LabelCheck, RequestCheck};
use crate::seeder::FolderSeed;
use crate::session::AdminLogin;
use crate::target::Target;

/// A complete scenario parsed from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSpec {
    /// Unique name for this scenario
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering scenarios
    #[serde(default)]
    pub tags: Vec<String>,

    /// Viewport size for the browser
    #[serde(default = "default_viewport")]
    pub viewport: Viewport,

    /// Intercepted backend routes
    #[serde(default)]
    pub mock: MockSpec,

    /// Steps to execute in order
    pub steps: Vec<TestStep>,

    /// Detail reported when every step and check passes
    #[serde(default = "default_success_message")]
    pub success_message: String,

    /// Detail reported when a check fails
    #[serde(default = "default_failure_message")]
    pub failure_message: String,
}

fn default_viewport() -> Viewport {
    Viewport { width: 1280, height: 720 }
}

fn default_success_message() -> String {
    "All checks passed.".to_string()
}

fn default_failure_message() -> String {
    "Observed state did not match.".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// A single step in a scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TestStep {
    /// Navigate to a URL (relative to base)
    Navigate {
        url: String,
        #[serde(default)]
        wait_for: Option<Target>,
    },

    /// Fill an input field
    Fill {
        target: Target,
        value: String,
    },

    /// Click an element
    Click {
        target: Target,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Wait for an element to reach a state
    Wait {
        target: Target,
        #[serde(default = "default_wait_timeout")]
        timeout_ms: u64,
        #[serde(default)]
        state: WaitState,
    },

    /// Wait for a fixed amount of time (use sparingly)
    Sleep {
        ms: u64,
    },

    /// Authenticate as admin through the access panel
    Authenticate(AdminLogin),

    /// Create a folder through the UI
    CreateFolder(FolderSeed),

    /// Dispatch a synthetic drag event on an element
    Drag(DragDispatch),

    /// Poll an element's accessible label
    ExpectLabel(LabelCheck),

    /// Wait for an intercepted request
    ExpectRequest(RequestCheck),

    /// Log a message (for debugging)
    Log {
        message: String,
    },
}

fn default_wait_timeout() -> u64 {
    5000 // 5 seconds default
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitState {
    #[default]
    Visible,
    Hidden,
    Attached,
    Detached,
}

impl WaitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitState::Visible => "visible",
            WaitState::Hidden => "hidden",
            WaitState::Attached => "attached",
            WaitState::Detached => "detached",
        }
    }
}

impl TestStep {
    /// Short name used in logs and step events
    pub fn name(&self) -> String {
        match self {
            TestStep::Navigate { url, .. } => format!("navigate:{}", url),
            TestStep::Fill { target, .. } => format!("fill:{}", target),
            TestStep::Click { target, .. } => format!("click:{}", target),
            TestStep::Wait { target, state, .. } => format!("wait:{}:{}", state.as_str(), target),
            TestStep::Sleep { ms } => format!("sleep:{}ms", ms),
            TestStep::Authenticate(_) => "authenticate".to_string(),
            TestStep::CreateFolder(seed) => format!("create_folder:{}", seed.name),
            TestStep::Drag(dispatch) => dispatch.name(),
            TestStep::ExpectLabel(check) => check.name(),
            TestStep::ExpectRequest(check) => check.name(),
            TestStep::Log { message } => {
                format!("log:{}", message.chars().take(30).collect::<String>())
            }
        }
    }

    /// Replace composite steps with the primitive steps they stand for.
    pub fn expand(&self, admin_credential: &str) -> Vec<TestStep> {
        match self {
            TestStep::Authenticate(login) => login.steps(admin_credential),
            TestStep::CreateFolder(seed) => seed.steps(),
            other => vec![other.clone()],
        }
    }

    /// Whether the step asserts state rather than driving the page.
    pub fn is_check(&self) -> bool {
        matches!(self, TestStep::ExpectLabel(_) | TestStep::ExpectRequest(_))
    }
}

impl ScenarioSpec {
    /// Parse a scenario from YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let spec: Self = serde_yaml::from_str(yaml)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Parse a scenario from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content).map_err(|e| {
            E2eError::SpecParse(format!("{}: {}", path.display(), e))
        })
    }

    /// Load all scenarios from a directory
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        let mut specs = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            let spec = Self::from_file(entry.path())?;
            specs.push(spec);
        }

        Ok(specs)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Built mock backend for this scenario
    pub fn backend(&self) -> E2eResult<MockBackend> {
        self.mock.build()
    }

    /// Steps after composite expansion
    pub fn expanded_steps(&self, admin_credential: &str) -> Vec<TestStep> {
        self.steps
            .iter()
            .flat_map(|s| s.expand(admin_credential))
            .collect()
    }

    fn validate(&self) -> E2eResult<()> {
        if self.name.trim().is_empty() {
            return Err(E2eError::SpecParse("scenario name is empty".to_string()));
        }
        if self.steps.is_empty() {
            return Err(E2eError::SpecParse(format!("scenario '{}' has no steps", self.name)));
        }
        self.backend().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observe::{Expectation, Scope};

    const DRAG_YAML: &str = r#"
name: drag-start-marks-folders
description: Dragging a file marks folders as drop targets
tags:
  - dnd
  - smoke
mock:
  media:
    listing:
      prefix: ""
      folders:
        - { key: folder1, name: folder1 }
      files:
        - { key: image.png, url: "http://example.com/image.png", type: image }
steps:
  - action: navigate
    url: /
  - action: authenticate
  - action: wait
    target: { aria_label: { tag: article, label: "image.png 預覽" } }
  - action: drag
    target: { aria_label: { tag: article, label: "image.png 預覽" } }
  - action: expect_label
    target: { text: { tag: article, text: folder1 } }
    expect: { contains: 將媒體移動到 }
    scope: first
success_message: Drag state updated UI.
"#;

    #[test]
    fn test_parse_drag_scenario() {
        let spec = ScenarioSpec::from_yaml(DRAG_YAML).unwrap();
        assert_eq!(spec.name, "drag-start-marks-folders");
        assert_eq!(spec.steps.len(), 5);
        assert!(spec.has_tag("smoke"));
        assert_eq!(spec.success_message, "Drag state updated UI.");
        assert_eq!(spec.backend().unwrap().rules().len(), 2);

        match &spec.steps[4] {
            TestStep::ExpectLabel(check) => {
                assert_eq!(check.scope, Scope::First);
                assert_eq!(check.expect, Expectation::Contains("將媒體移動到".into()));
            }
            other => panic!("unexpected step {:?}", other),
        }
    }

    #[test]
    fn test_authenticate_expands_with_credential() {
        let spec = ScenarioSpec::from_yaml(DRAG_YAML).unwrap();
        let steps = spec.expanded_steps("secret");
        assert_eq!(steps.len(), 8);
        assert!(steps.iter().any(|s| matches!(s, TestStep::Fill { value, .. } if value == "secret")));
        assert!(!steps.iter().any(|s| matches!(s, TestStep::Authenticate(_))));
    }

    #[test]
    fn test_rejects_empty_and_duplicate_listing() {
        let empty = "name: x\nsteps: []\n";
        assert!(matches!(ScenarioSpec::from_yaml(empty), Err(E2eError::SpecParse(_))));

        let dup = r#"
name: dup
mock:
  media:
    listing:
      folders: [{ key: a, name: a }, { key: a, name: b }]
steps:
  - action: sleep
    ms: 1
"#;
        assert!(matches!(ScenarioSpec::from_yaml(dup), Err(E2eError::InvalidMock(_))));
    }
}
