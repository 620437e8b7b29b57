//! Built-in scenarios, YAML loading, generated scripts and the mock backend

use std::path::PathBuf;

use test_case::test_case;

use media_e2e::fixture::FixtureListing;
use media_e2e::mock::{MethodClass, MockBackend, MockRequest, MockResponse, RouteRule, MEDIA_API_PATTERN};
use media_e2e::playwright::PlaywrightConfig;
use media_e2e::{scenario, E2eError, ScenarioSpec, TestStep};

fn bundled_scenarios() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios")
}

#[test]
fn bundled_yaml_scenarios_load() {
    let specs = ScenarioSpec::load_all(&bundled_scenarios()).unwrap();
    let names: Vec<_> = specs.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["legacy-folder-form", "nested-prefix-drag"]);

    let nested = &specs[1];
    let backend = nested.backend().unwrap();
    assert_eq!(backend.rules().len(), 3);
    assert!(backend.resolve("GET", "http://localhost:3000/api/session").is_some());
    assert!(backend.resolve("POST", "http://localhost:3000/api/session").is_none());
}

#[test]
fn legacy_form_overrides_seeding_labels() {
    let specs = ScenarioSpec::load_all(&bundled_scenarios()).unwrap();
    let script = PlaywrightConfig::default().build_script(&specs[0], "12345").unwrap();

    assert!(script.contains("getByPlaceholder(\"新資料夾名稱\", { exact: true })"));
    assert!(script.contains("getByRole('button', { name: \"建立資料夾\", exact: true })"));
    assert!(script.contains("waitForTimeout(1000)"));
}

#[test]
fn load_all_skips_other_files_and_sorts() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("b.yml"),
        "name: second\nsteps:\n  - action: log\n    message: hi\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("a.yaml"),
        "name: first\nsteps:\n  - action: sleep\n    ms: 10\n",
    )
    .unwrap();
    std::fs::write(dir.path().join("notes.txt"), "not a scenario").unwrap();

    let specs = ScenarioSpec::load_all(dir.path()).unwrap();
    let names: Vec<_> = specs.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["first", "second"]);
}

#[test]
fn malformed_yaml_names_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.yaml");
    std::fs::write(&path, "name: broken\nsteps:\n  - action: teleport\n").unwrap();

    match ScenarioSpec::from_file(&path) {
        Err(E2eError::SpecParse(msg)) => assert!(msg.contains("broken.yaml"), "{}", msg),
        other => panic!("expected parse error, got {:?}", other),
    }
}

#[test_case(scenario::DRAG_START_MARKS_FOLDERS, &["dragstart", "將媒體移動到"] ; "drag start")]
#[test_case(scenario::FOLDERS_UNMARKED_WITHOUT_DRAG, &["absent"] ; "no drag")]
#[test_case(scenario::SEED_FOLDER_AFTER_LOGIN, &["建立", "waitForTimeout(2000)"] ; "seed folder")]
#[test_case(scenario::DROP_MOVES_MEDIA, &["dragenter", "dragover", "\"drop\""] ; "drop")]
fn builtin_scripts_render(name: &str, fragments: &[&str]) {
    let spec = scenario::builtin().into_iter().find(|s| s.name == name).unwrap();
    let script = PlaywrightConfig::default().build_script(&spec, "12345").unwrap();

    let route = script.find("context.route(").unwrap();
    let page = script.find("context.newPage()").unwrap();
    let goto = script.find("page.goto(").unwrap();
    assert!(route < page && page < goto);

    assert!(script.contains("輸入管理密碼以進行上傳與修改"));
    assert!(script.contains("\"12345\""));
    for fragment in fragments {
        assert!(script.contains(fragment), "missing {} in {}", fragment, name);
    }
}

#[test]
fn builtins_authenticate_before_any_drag() {
    for spec in scenario::builtin() {
        let steps = spec.expanded_steps("12345");
        let login = steps
            .iter()
            .position(|s| matches!(s, TestStep::Click { .. }))
            .unwrap();
        if let Some(drag) = steps.iter().position(|s| matches!(s, TestStep::Drag(_))) {
            assert!(login < drag, "{} drags before logging in", spec.name);
        }
    }
}

#[test_case("GET", Some(r#"{"prefix":"","folders":[{"key":"folder1","name":"folder1"}],"files":[{"key":"image.png","url":"http://example.com/image.png","type":"image"}]}"#) ; "listing on read")]
#[test_case("PATCH", Some(r#"{"ok":true}"#) ; "ack on move")]
#[test_case("POST", Some(r#"{"ok":true}"#) ; "ack on create")]
fn media_backend_answers(method: &str, body: Option<&str>) {
    let backend = MockBackend::media_api(MEDIA_API_PATTERN, &FixtureListing::drag_drop_sample()).unwrap();
    let request = MockRequest {
        method: method.to_string(),
        url: "http://localhost:3000/api/media?prefix=".to_string(),
        post_data: None,
    };
    assert_eq!(backend.respond(&request).map(|r| r.body.as_str()), body);
}

#[test]
fn unmatched_requests_fall_through() {
    let backend = MockBackend::media_api(MEDIA_API_PATTERN, &FixtureListing::drag_drop_sample()).unwrap();
    let request = MockRequest {
        method: "GET".to_string(),
        url: "http://localhost:3000/_next/static/chunk.js".to_string(),
        post_data: None,
    };
    assert!(backend.respond(&request).is_none());
    assert!(backend.to_js().unwrap().contains("route.fallback()"));
}

#[test]
fn earlier_rule_wins_across_patterns() {
    let mut backend = MockBackend::new();
    backend
        .install(
            RouteRule::new(
                "**/api/media?prefix=trips*",
                MethodClass::Read,
                MockResponse::json(200, &serde_json::json!({ "trips": true })).unwrap(),
            )
            .unwrap(),
        )
        .unwrap();
    backend
        .install(RouteRule::new(MEDIA_API_PATTERN, MethodClass::Any, MockResponse::acknowledgment()).unwrap())
        .unwrap();

    assert_eq!(backend.resolve("GET", "http://x/api/media?prefix=trips"), Some(0));
    assert_eq!(backend.resolve("GET", "http://x/api/media?prefix="), Some(1));
    assert_eq!(backend.resolve("DELETE", "http://x/api/media?prefix=trips"), Some(1));
}
