//! Backend mock: declarative route interception
//!
//! Rules map `{URL glob, method class}` to a canned response. The same rules
//! are resolved here in Rust (for validation and tests) and rendered into the
//! Playwright script, where they are installed with `context.route`.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{E2eError, E2eResult};
use crate::fixture::FixtureListing;

/// Default glob for the application's media API.
pub const MEDIA_API_PATTERN: &str = "**/api/media*";

/// Which request methods a rule answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodClass {
    /// GET, HEAD, OPTIONS
    #[default]
    Read,
    /// POST, PUT, PATCH, DELETE
    Write,
    Any,
}

const READ_METHODS: &[&str] = &["GET", "HEAD", "OPTIONS"];
const WRITE_METHODS: &[&str] = &["POST", "PUT", "PATCH", "DELETE"];

impl MethodClass {
    pub fn methods(&self) -> Vec<&'static str> {
        match self {
            MethodClass::Read => READ_METHODS.to_vec(),
            MethodClass::Write => WRITE_METHODS.to_vec(),
            MethodClass::Any => READ_METHODS.iter().chain(WRITE_METHODS).copied().collect(),
        }
    }

    pub fn matches(&self, method: &str) -> bool {
        let method = method.to_ascii_uppercase();
        self.methods().iter().any(|m| *m == method)
    }

    fn overlaps(&self, other: &MethodClass) -> bool {
        matches!(
            (self, other),
            (MethodClass::Any, _)
                | (_, MethodClass::Any)
                | (MethodClass::Read, MethodClass::Read)
                | (MethodClass::Write, MethodClass::Write)
        )
    }
}

/// A fulfilled response. The body is serialised once, so every request
/// answered by the same rule receives identical bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MockResponse {
    pub status: u16,
    pub content_type: String,
    pub body: String,
}

impl MockResponse {
    pub fn json<T: Serialize>(status: u16, value: &T) -> E2eResult<Self> {
        Ok(Self {
            status,
            content_type: "application/json".to_string(),
            body: serde_json::to_string(value)?,
        })
    }

    /// `{"ok":true}` with status 200.
    pub fn acknowledgment() -> Self {
        Self {
            status: 200,
            content_type: "application/json".to_string(),
            body: r#"{"ok":true}"#.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RouteRule {
    pub pattern: String,
    pub methods: MethodClass,
    pub response: MockResponse,
    matcher: Regex,
}

impl RouteRule {
    pub fn new(pattern: impl Into<String>, methods: MethodClass, response: MockResponse) -> E2eResult<Self> {
        let pattern = pattern.into();
        let matcher = glob_to_regex(&pattern)?;
        Ok(Self {
            pattern,
            methods,
            response,
            matcher,
        })
    }

    pub fn matches(&self, method: &str, url: &str) -> bool {
        self.methods.matches(method) && self.matcher.is_match(url)
    }
}

/// An intercepted request as seen by the mock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MockRequest {
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub post_data: Option<String>,
}

/// The set of interception rules owned by one scenario.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    rules: Vec<RouteRule>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Media API mock: writes are acknowledged, reads return `listing`.
    pub fn media_api(pattern: &str, listing: &FixtureListing) -> E2eResult<Self> {
        listing.validate()?;
        let mut backend = Self::new();
        backend.install(RouteRule::new(pattern, MethodClass::Write, MockResponse::acknowledgment())?)?;
        backend.install(RouteRule::new(pattern, MethodClass::Read, MockResponse::json(200, listing)?)?)?;
        Ok(backend)
    }

    /// Register a rule. Two rules on the same pattern may not answer the
    /// same method.
    pub fn install(&mut self, rule: RouteRule) -> E2eResult<()> {
        if let Some(existing) = self
            .rules
            .iter()
            .find(|r| r.pattern == rule.pattern && r.methods.overlaps(&rule.methods))
        {
            return Err(E2eError::InvalidMock(format!(
                "rules for '{}' overlap ({:?} and {:?})",
                rule.pattern, existing.methods, rule.methods
            )));
        }
        self.rules.push(rule);
        Ok(())
    }

    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }

    /// Index of the rule that answers a request, in declaration order.
    pub fn resolve(&self, method: &str, url: &str) -> Option<usize> {
        self.rules.iter().position(|r| r.matches(method, url))
    }

    /// Response for a request, or `None` when it should reach the network.
    /// Only method and URL are consulted; the payload is never validated.
    pub fn respond(&self, request: &MockRequest) -> Option<&MockResponse> {
        self.resolve(&request.method, &request.url)
            .map(|i| &self.rules[i].response)
    }

    /// JS array literal consumed by the route installer in the script.
    pub fn rules_json(&self) -> E2eResult<String> {
        let rules: Vec<serde_json::Value> = self
            .rules
            .iter()
            .map(|r| {
                serde_json::json!({
                    "pattern": r.pattern,
                    "methods": r.methods.methods(),
                    "status": r.response.status,
                    "contentType": r.response.content_type,
                    "body": r.response.body,
                })
            })
            .collect();
        Ok(serde_json::to_string(&rules)?)
    }

    /// Script fragment installing the rules on `context`.
    ///
    /// One handler per rule. Playwright runs the most recently registered
    /// handler first, so rules are registered last to first and rule 0 is
    /// consulted first. A handler whose rule does not answer the method falls
    /// back to the next handler and finally the network, which gives the
    /// same resolution as [`MockBackend::resolve`].
    pub fn to_js(&self) -> E2eResult<String> {
        if self.rules.is_empty() {
            return Ok(String::new());
        }
        Ok(format!(
            r#"
    const mockRules = {rules};
    for (let index = mockRules.length - 1; index >= 0; index -= 1) {{
      const rule = mockRules[index];
      await context.route(rule.pattern, async (route) => {{
        const request = route.request();
        const method = request.method();
        if (!rule.methods.includes(method)) {{
          await route.fallback();
          return;
        }}
        const record = {{ method, url: request.url(), post_data: request.postData(), rule: index }};
        requests.push(record);
        emit({{ event: 'request', ...record }});
        await route.fulfill({{ status: rule.status, contentType: rule.contentType, body: rule.body }});
      }});
    }}
"#,
            rules = self.rules_json()?
        ))
    }
}

/// YAML form of a scenario's mock.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MockSpec {
    /// Standard media API mock
    #[serde(default)]
    pub media: Option<MediaMockSpec>,

    /// Additional routes
    #[serde(default)]
    pub routes: Vec<RouteSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaMockSpec {
    #[serde(default = "default_media_pattern")]
    pub pattern: String,
    pub listing: FixtureListing,
}

fn default_media_pattern() -> String {
    MEDIA_API_PATTERN.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteSpec {
    pub pattern: String,
    #[serde(default)]
    pub methods: MethodClass,
    #[serde(default = "default_status")]
    pub status: u16,
    pub body: serde_json::Value,
}

fn default_status() -> u16 {
    200
}

impl MockSpec {
    pub fn media(listing: FixtureListing) -> Self {
        Self {
            media: Some(MediaMockSpec {
                pattern: default_media_pattern(),
                listing,
            }),
            routes: Vec::new(),
        }
    }

    pub fn build(&self) -> E2eResult<MockBackend> {
        let mut backend = match &self.media {
            Some(media) => MockBackend::media_api(&media.pattern, &media.listing)?,
            None => MockBackend::new(),
        };
        for route in &self.routes {
            let response = MockResponse::json(route.status, &route.body)?;
            backend.install(RouteRule::new(route.pattern.clone(), route.methods, response)?)?;
        }
        Ok(backend)
    }
}

/// Translate a Playwright URL glob into an anchored regex.
///
/// `**` matches across `/`, `*` stays within a segment, `{a,b}` alternates,
/// everything else (including `?`) is literal.
pub fn glob_to_regex(glob: &str) -> E2eResult<Regex> {
    let mut out = String::from("^");
    let mut chars = glob.chars().peekable();
    let mut in_group = false;
    let mut prev: Option<char> = None;

    while let Some(c) = chars.next() {
        match c {
            '*' => {
                let starts_segment = matches!(prev, None | Some('/'));
                if chars.peek() == Some(&'*') {
                    chars.next();
                    // `**` only spans segments when it is a whole segment
                    let ends_segment = matches!(chars.peek(), None | Some('/'));
                    if starts_segment && ends_segment {
                        out.push_str(".*");
                    } else {
                        out.push_str("[^/]*");
                    }
                } else {
                    out.push_str("[^/]*");
                }
            }
            '{' if !in_group => {
                in_group = true;
                out.push('(');
            }
            '}' if in_group => {
                in_group = false;
                out.push(')');
            }
            ',' if in_group => out.push('|'),
            '\\' => {
                if let Some(next) = chars.next() {
                    out.push_str(&regex::escape(&next.to_string()));
                }
            }
            other => out.push_str(&regex::escape(&other.to_string())),
        }
        prev = Some(c);
    }

    if in_group {
        return Err(E2eError::InvalidMock(format!("unclosed '{{' in pattern '{}'", glob)));
    }

    out.push('$');
    Ok(Regex::new(&out)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("http://localhost:3000/api/media", true ; "bare path")]
    #[test_case("http://localhost:3000/api/media?prefix=", true ; "query string")]
    #[test_case("http://localhost:3000/api/media?prefix=albums%2F2024", true ; "encoded prefix")]
    #[test_case("http://localhost:3000/api/media/usage", false ; "nested path")]
    #[test_case("http://localhost:3000/api/upload", false ; "other api")]
    fn media_glob(url: &str, expected: bool) {
        let re = glob_to_regex(MEDIA_API_PATTERN).unwrap();
        assert_eq!(re.is_match(url), expected);
    }

    #[test_case("**/api/x", "http://h/a/b/api/x", true ; "leading globstar crosses segments")]
    #[test_case("http://h/**", "http://h/a/b/c", true ; "trailing globstar crosses segments")]
    #[test_case("http://h/**/x", "http://h/a/b/x", true ; "inner globstar crosses segments")]
    #[test_case("http://h/a**b", "http://h/a/b", false ; "globstar inside a segment stays in it")]
    #[test_case("http://h/a**b", "http://h/axyzb", true ; "globstar inside a segment matches within it")]
    #[test_case("http://h/**x/y", "http://h/a/bx/y", false ; "globstar glued to text is a single star")]
    fn globstar_only_spans_whole_segments(glob: &str, url: &str, expected: bool) {
        assert_eq!(glob_to_regex(glob).unwrap().is_match(url), expected);
    }

    #[test]
    fn glob_alternation() {
        let re = glob_to_regex("**/*.{png,jpg}").unwrap();
        assert!(re.is_match("http://cdn/x/a.png"));
        assert!(re.is_match("http://cdn/x/a.jpg"));
        assert!(!re.is_match("http://cdn/x/a.gif"));
        assert!(glob_to_regex("**/{a,b").is_err());
    }

    #[test]
    fn writes_are_acknowledged_regardless_of_payload() {
        let backend = MockBackend::media_api(MEDIA_API_PATTERN, &FixtureListing::drag_drop_sample()).unwrap();
        for (method, body) in [
            ("POST", Some(r#"{"action":"validate"}"#)),
            ("PATCH", Some(r#"{"action":"move","key":"image.png","targetPrefix":"folder1/"}"#)),
            ("DELETE", Some("not even json")),
            ("post", None),
        ] {
            let request = MockRequest {
                method: method.to_string(),
                url: "http://localhost:3000/api/media".to_string(),
                post_data: body.map(String::from),
            };
            let response = backend.respond(&request).unwrap();
            assert_eq!(response.status, 200);
            assert_eq!(response.body, r#"{"ok":true}"#);
        }
    }

    #[test]
    fn listing_is_stable_across_calls() {
        let listing = FixtureListing::drag_drop_sample();
        let backend = MockBackend::media_api(MEDIA_API_PATTERN, &listing).unwrap();
        let get = |url: &str| MockRequest {
            method: "GET".to_string(),
            url: url.to_string(),
            post_data: None,
        };
        let first = backend.respond(&get("http://localhost:3000/api/media?prefix=")).unwrap().clone();
        let second = backend.respond(&get("http://localhost:3000/api/media?prefix=folder1%2F")).unwrap();
        assert_eq!(&first, second);
        assert_eq!(first.body, serde_json::to_string(&listing).unwrap());
    }

    #[test]
    fn unmatched_requests_are_not_answered() {
        let backend = MockBackend::media_api(MEDIA_API_PATTERN, &FixtureListing::drag_drop_sample()).unwrap();
        let request = MockRequest {
            method: "GET".to_string(),
            url: "http://localhost:3000/api/usage".to_string(),
            post_data: None,
        };
        assert!(backend.respond(&request).is_none());
    }

    #[test]
    fn overlapping_rules_are_rejected() {
        let mut backend = MockBackend::new();
        backend
            .install(RouteRule::new("**/api/x", MethodClass::Read, MockResponse::acknowledgment()).unwrap())
            .unwrap();
        let err = backend
            .install(RouteRule::new("**/api/x", MethodClass::Any, MockResponse::acknowledgment()).unwrap())
            .unwrap_err();
        assert!(matches!(err, E2eError::InvalidMock(_)));
        backend
            .install(RouteRule::new("**/api/x", MethodClass::Write, MockResponse::acknowledgment()).unwrap())
            .unwrap();
        assert_eq!(backend.rules().len(), 2);
    }

    #[test]
    fn spec_builds_media_and_extra_routes() {
        let yaml = r#"
media:
  listing:
    prefix: ""
    folders: [{ key: folder1, name: folder1 }]
    files: []
routes:
  - pattern: "**/api/usage*"
    body: { used: 0 }
"#;
        let spec: MockSpec = serde_yaml::from_str(yaml).unwrap();
        let backend = spec.build().unwrap();
        assert_eq!(backend.rules().len(), 3);
        assert_eq!(backend.resolve("GET", "http://h/api/usage"), Some(2));
        assert_eq!(backend.resolve("POST", "http://h/api/usage"), None);

        let js = backend.to_js().unwrap();
        assert!(js.contains("context.route(rule.pattern"));
        assert!(js.contains("route.fallback()"));
        assert!(js.contains(r#"\"folders\""#));
    }

    /// Replays the rendered installer the way Playwright dispatches routes:
    /// the last registered handler runs first and `fallback()` hands the
    /// request to the one registered before it.
    fn dispatch_rendered(js: &str, method: &str, url: &str) -> Option<usize> {
        let start = js.find("const mockRules = ").unwrap() + "const mockRules = ".len();
        let end = start + js[start..].find(";\n").unwrap();
        let rules: Vec<serde_json::Value> = serde_json::from_str(&js[start..end]).unwrap();

        let registered: Vec<usize> = (0..rules.len()).rev().collect();
        registered.iter().rev().copied().find(|&index| {
            let rule = &rules[index];
            let pattern = glob_to_regex(rule["pattern"].as_str().unwrap()).unwrap();
            let answers = rule["methods"].as_array().unwrap().iter().any(|m| m == method);
            pattern.is_match(url) && answers
        })
    }

    #[test]
    fn installed_handlers_resolve_like_declaration_order() {
        let mut backend = MockBackend::new();
        for (pattern, methods) in [
            ("**/api/x*", MethodClass::Read),
            ("**/api/*", MethodClass::Any),
            ("**/api/x*", MethodClass::Write),
        ] {
            backend
                .install(RouteRule::new(pattern, methods, MockResponse::acknowledgment()).unwrap())
                .unwrap();
        }
        let js = backend.to_js().unwrap();

        assert!(js.contains("for (let index = mockRules.length - 1; index >= 0; index -= 1)"));
        assert_eq!(js.matches("context.route(").count(), 1);
        assert!(!js.contains("new Set("));

        assert_eq!(backend.resolve("POST", "http://h/api/x"), Some(1));
        for (method, url) in [
            ("POST", "http://h/api/x"),
            ("GET", "http://h/api/x"),
            ("DELETE", "http://h/api/y"),
            ("GET", "http://h/other"),
        ] {
            assert_eq!(
                dispatch_rendered(&js, method, url),
                backend.resolve(method, url),
                "{} {}",
                method,
                url
            );
        }
    }
}
