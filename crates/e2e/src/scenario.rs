//! Built-in scenarios for the media library drag-and-drop flow

use crate::drag::{DragDispatch, DragEventKind};
use crate::fixture::FixtureListing;
use crate::mock::MockSpec;
use crate::observe::{Expectation, LabelCheck, RequestCheck, Scope, MOVE_TARGET_MARKER};
use crate::seeder::FolderSeed;
use crate::session::AdminLogin;
use crate::spec::{ScenarioSpec, TestStep, Viewport, WaitState};
use crate::target::Target;

pub const DRAG_START_MARKS_FOLDERS: &str = "drag-start-marks-folders";
pub const FOLDERS_UNMARKED_WITHOUT_DRAG: &str = "folders-unmarked-without-drag";
pub const SEED_FOLDER_AFTER_LOGIN: &str = "seed-folder-after-login";
pub const DROP_MOVES_MEDIA: &str = "drop-moves-media";

/// Tag of scenarios excluded from the default run.
pub const OPT_IN_TAG: &str = "drop";

fn file_tile() -> Target {
    Target::aria_label("article", FixtureListing::preview_label("image.png"))
}

fn folder_tile() -> Target {
    Target::text("article", "folder1")
}

/// Every folder card: the grid tiles that are not media previews.
fn folder_tiles() -> Target {
    Target::Css("article[role=button]:not([aria-label$=\" 預覽\"])".to_string())
}

fn base(name: &str, description: &str, tags: &[&str]) -> ScenarioSpec {
    ScenarioSpec {
        name: name.to_string(),
        description: description.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        viewport: Viewport { width: 1280, height: 720 },
        mock: MockSpec::media(FixtureListing::drag_drop_sample()),
        steps: Vec::new(),
        success_message: String::new(),
        failure_message: String::new(),
    }
}

/// Log in, wait for the grid, return the setup steps.
fn authenticated_grid() -> Vec<TestStep> {
    vec![
        TestStep::Navigate {
            url: "/".to_string(),
            wait_for: None,
        },
        TestStep::Authenticate(AdminLogin::default()),
        TestStep::Wait {
            target: file_tile(),
            timeout_ms: 5000,
            state: WaitState::Attached,
        },
    ]
}

/// After a dragstart on `image.png`, `folder1` advertises itself as a
/// move target.
pub fn drag_start_marks_folders() -> ScenarioSpec {
    let mut spec = base(
        DRAG_START_MARKS_FOLDERS,
        "Dragging a file while authorized marks folders as drop targets",
        &["dnd", "smoke"],
    );
    spec.steps = authenticated_grid();
    // the marker must come from the drag, not from the initial render
    spec.steps.push(TestStep::ExpectLabel(
        LabelCheck::new(folder_tiles(), Expectation::Absent(MOVE_TARGET_MARKER.to_string()))
            .scope(Scope::Every)
            .timeout_ms(1000),
    ));
    spec.steps.push(TestStep::Drag(DragDispatch::begin(file_tile())));
    spec.steps.push(TestStep::ExpectLabel(
        LabelCheck::new(folder_tile(), Expectation::Contains(MOVE_TARGET_MARKER.to_string()))
            .report_as("Folder"),
    ));
    spec.steps.push(TestStep::ExpectLabel(
        LabelCheck::new(folder_tiles(), Expectation::Contains(MOVE_TARGET_MARKER.to_string()))
            .scope(Scope::Every),
    ));
    spec.success_message = "Drag state updated UI.".to_string();
    spec.failure_message = "Drag state did not update UI.".to_string();
    spec
}

/// Without a drag the marker must not appear: it is drag-state dependent.
pub fn folders_unmarked_without_drag() -> ScenarioSpec {
    let mut spec = base(
        FOLDERS_UNMARKED_WITHOUT_DRAG,
        "Folders carry no move-target marker while nothing is dragged",
        &["dnd", "smoke"],
    );
    spec.steps = authenticated_grid();
    spec.steps.push(TestStep::ExpectLabel(
        LabelCheck::new(folder_tile(), Expectation::Absent(MOVE_TARGET_MARKER.to_string()))
            .timeout_ms(1000)
            .report_as("Folder"),
    ));
    spec.success_message = "Folder is not a move target without a drag.".to_string();
    spec.failure_message = "Folder advertised a move target without a drag.".to_string();
    spec
}

/// Authenticate, create `test-folder`, and let the listing reload.
pub fn seed_folder_after_login() -> ScenarioSpec {
    let mut spec = base(
        SEED_FOLDER_AFTER_LOGIN,
        "Create a folder through the UI after logging in",
        &["seed"],
    );
    spec.steps = vec![
        TestStep::Navigate {
            url: "/".to_string(),
            wait_for: None,
        },
        TestStep::Authenticate(AdminLogin::default()),
        TestStep::CreateFolder(FolderSeed::new("test-folder")),
        TestStep::ExpectRequest(RequestCheck {
            method: Some("POST".to_string()),
            body_contains: Some("test-folder".to_string()),
            ..Default::default()
        }),
        TestStep::Sleep { ms: 2000 },
    ];
    spec.success_message = "Page loaded and setup complete".to_string();
    spec.failure_message = "Folder creation request was not sent.".to_string();
    spec
}

/// Drag `image.png` onto `folder1` and expect a move request.
pub fn drop_moves_media() -> ScenarioSpec {
    let mut spec = base(
        DROP_MOVES_MEDIA,
        "Dropping a dragged file on a folder sends a move request",
        &["dnd", OPT_IN_TAG],
    );
    spec.steps = authenticated_grid();
    spec.steps.extend([
        TestStep::Drag(DragDispatch::begin(file_tile())),
        TestStep::ExpectLabel(LabelCheck::new(
            folder_tile(),
            Expectation::Contains(MOVE_TARGET_MARKER.to_string()),
        )),
        TestStep::Drag(DragDispatch::new(folder_tile(), DragEventKind::DragEnter)),
        TestStep::Drag(DragDispatch::new(folder_tile(), DragEventKind::DragOver)),
        TestStep::Drag(DragDispatch::new(folder_tile(), DragEventKind::Drop)),
        TestStep::ExpectRequest(RequestCheck {
            method: Some("PATCH".to_string()),
            body_contains: Some(r#""action":"move""#.to_string()),
            ..Default::default()
        }),
    ]);
    spec.success_message = "Drop sent a move request.".to_string();
    spec.failure_message = "Drop did not send a move request.".to_string();
    spec
}

/// Every built-in scenario.
pub fn builtin() -> Vec<ScenarioSpec> {
    vec![
        drag_start_marks_folders(),
        folders_unmarked_without_drag(),
        seed_folder_after_login(),
        drop_moves_media(),
    ]
}

/// Built-ins run when no scenario or tag is selected.
pub fn default_set() -> Vec<ScenarioSpec> {
    builtin()
        .into_iter()
        .filter(|s| !s.has_tag(OPT_IN_TAG))
        .collect()
}

/// Names run when nothing is selected: every available scenario, built-in
/// or loaded from YAML, that is not tagged opt-in.
pub fn default_names(available: &[ScenarioSpec]) -> Vec<String> {
    available
        .iter()
        .filter(|s| !s.has_tag(OPT_IN_TAG))
        .map(|s| s.name.clone())
        .collect()
}
