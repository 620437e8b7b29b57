//! Session bootstrapper: admin authentication through the access panel

use serde::{Deserialize, Serialize};

use crate::spec::{TestStep, WaitState};
use crate::target::Target;

/// Placeholder of the admin password input.
pub const ADMIN_PASSWORD_PLACEHOLDER: &str = "輸入管理密碼以進行上傳與修改";

/// Visible text of the validating button.
pub const VALIDATE_BUTTON_TEXT: &str = "驗證管理密碼";

/// Credential accepted by the mocked validation endpoint.
pub const DEFAULT_ADMIN_CREDENTIAL: &str = "12345";

/// Authentication flow parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminLogin {
    /// Credential to submit. Falls back to the configured credential.
    #[serde(default)]
    pub credential: Option<String>,

    #[serde(default = "default_placeholder")]
    pub placeholder: String,

    #[serde(default = "default_button")]
    pub button: String,

    /// Bound on waiting for the panel to leave its pre-authentication state
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,

    /// Fixed delay instead of waiting for the button to hide. Fragile;
    /// kept for flows that were written against it.
    #[serde(default)]
    pub fixed_delay_ms: Option<u64>,
}

fn default_placeholder() -> String {
    ADMIN_PASSWORD_PLACEHOLDER.to_string()
}

fn default_button() -> String {
    VALIDATE_BUTTON_TEXT.to_string()
}

fn default_timeout() -> u64 {
    5000
}

impl Default for AdminLogin {
    fn default() -> Self {
        Self {
            credential: None,
            placeholder: default_placeholder(),
            button: default_button(),
            timeout_ms: default_timeout(),
            fixed_delay_ms: None,
        }
    }
}

impl AdminLogin {
    /// Fill the credential, activate validation, then block until the
    /// validating control is hidden (or the fixed delay elapses).
    pub fn steps(&self, fallback_credential: &str) -> Vec<TestStep> {
        let credential = self
            .credential
            .clone()
            .unwrap_or_else(|| fallback_credential.to_string());
        let button = Target::Button(self.button.clone());

        let mut steps = vec![
            TestStep::Wait {
                target: Target::Placeholder(self.placeholder.clone()),
                timeout_ms: self.timeout_ms,
                state: WaitState::Visible,
            },
            TestStep::Fill {
                target: Target::Placeholder(self.placeholder.clone()),
                value: credential,
            },
            TestStep::Click {
                target: button.clone(),
                timeout_ms: Some(self.timeout_ms),
            },
        ];

        match self.fixed_delay_ms {
            Some(ms) => steps.push(TestStep::Sleep { ms }),
            None => steps.push(TestStep::Wait {
                target: button,
                timeout_ms: self.timeout_ms,
                state: WaitState::Hidden,
            }),
        }

        steps
    }
}
