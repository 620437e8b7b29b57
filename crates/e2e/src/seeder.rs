//! Fixture seeder: create precondition state through the UI

use serde::{Deserialize, Serialize};

use crate::spec::TestStep;
use crate::target::Target;

pub const FOLDER_NAME_PLACEHOLDER: &str = "輸入資料夾名稱（例如：taiwan-trip）";
pub const CREATE_FOLDER_BUTTON_TEXT: &str = "建立";

/// Not idempotent: seeding the same name twice is up to the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderSeed {
    pub name: String,

    #[serde(default = "default_placeholder")]
    pub placeholder: String,

    #[serde(default = "default_button")]
    pub button: String,
}

fn default_placeholder() -> String {
    FOLDER_NAME_PLACEHOLDER.to_string()
}

fn default_button() -> String {
    CREATE_FOLDER_BUTTON_TEXT.to_string()
}

impl FolderSeed {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            placeholder: default_placeholder(),
            button: default_button(),
        }
    }

    pub fn steps(&self) -> Vec<TestStep> {
        vec![
            TestStep::Fill {
                target: Target::Placeholder(self.placeholder.clone()),
                value: self.name.clone(),
            },
            TestStep::Click {
                target: Target::Button(self.button.clone()),
                timeout_ms: None,
            },
        ]
    }
}
