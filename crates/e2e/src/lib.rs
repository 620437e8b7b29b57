//! Media library drag-and-drop verification
//!
//! A Rust-controlled harness that drives Playwright against the media library
//! UI under an admin session:
//! - Intercepts the media API with a declarative mock backend
//! - Authenticates and seeds folders through the UI
//! - Dispatches synthetic HTML5 drag events on tiles
//! - Polls accessible labels until the UI reflects the drag state
//! - Reports a structured verdict per scenario and a process exit code
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Scenario Runner (Rust)                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ScenarioRunner                                             │
//! │    ├── build_script(spec) -> Playwright script              │
//! │    ├── ScriptExecutor::execute(script) -> ScriptOutput      │
//! │    └── judge(spec, output) -> Verdict                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Generated script (one browser/context/page)                │
//! │    ├── context.route(glob) -> MockBackend rules             │
//! │    ├── authenticate / create_folder                         │
//! │    ├── drag { target, event }                               │
//! │    ├── expect_label { target, contains | absent }           │
//! │    └── @@E2E {json} event lines on stdout                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod drag;
pub mod error;
pub mod fixture;
pub mod mock;
pub mod observe;
pub mod playwright;
pub mod protocol;
pub mod runner;
pub mod scenario;
pub mod seeder;
pub mod server;
pub mod session;
pub mod spec;
pub mod target;

pub use config::HarnessConfig;
pub use error::{E2eError, E2eResult, FailureKind};
pub use runner::{ScenarioRunner, SuiteReport, Verdict};
pub use spec::{ScenarioSpec, TestStep};
