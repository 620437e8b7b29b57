//! State observer: poll accessible labels and intercepted requests
//!
//! The application has no "finished re-rendering" signal, so checks wait a
//! short settle window and then poll a predicate at a fixed interval until it
//! holds or the timeout elapses. The predicate is evaluated in the page for
//! polling and again here, against the reported values, for the verdict.

use serde::{Deserialize, Serialize};

use crate::mock::MockRequest;
use crate::target::{js_string, Target};

/// Substring a folder label gains while it is a valid drop target.
pub const MOVE_TARGET_MARKER: &str = "將媒體移動到";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expectation {
    /// Poll until every observed label contains the marker.
    Contains(String),
    /// Sample for the whole window; any sighting of the marker fails.
    Absent(String),
}

impl Expectation {
    pub fn marker(&self) -> &str {
        match self {
            Expectation::Contains(m) | Expectation::Absent(m) => m,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Expectation::Contains(_) => "contains",
            Expectation::Absent(_) => "absent",
        }
    }

    /// At least one label must have been read.
    pub fn holds(&self, labels: &[Option<String>]) -> bool {
        if labels.is_empty() {
            return false;
        }
        let has_marker = |l: &Option<String>| l.as_deref().unwrap_or("").contains(self.marker());
        match self {
            Expectation::Contains(_) => labels.iter().all(has_marker),
            Expectation::Absent(_) => !labels.iter().any(has_marker),
        }
    }
}

/// Which of the matched elements are observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Exactly one element; more is an error
    #[default]
    Single,
    First,
    /// Every match; zero matches fails
    Every,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCheck {
    pub target: Target,
    pub expect: Expectation,

    #[serde(default)]
    pub scope: Scope,

    #[serde(default = "default_attribute")]
    pub attribute: String,

    #[serde(default = "default_settle")]
    pub settle_ms: u64,

    /// Total budget after settling, waiting for the target included
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,

    #[serde(default = "default_interval")]
    pub interval_ms: u64,

    /// Prefix for the printed label line, e.g. "Folder"
    #[serde(default)]
    pub report_as: Option<String>,
}

fn default_attribute() -> String {
    "aria-label".to_string()
}

fn default_settle() -> u64 {
    100
}

fn default_timeout() -> u64 {
    5000
}

fn default_interval() -> u64 {
    100
}

impl LabelCheck {
    pub fn new(target: Target, expect: Expectation) -> Self {
        Self {
            target,
            expect,
            scope: Scope::default(),
            attribute: default_attribute(),
            settle_ms: default_settle(),
            timeout_ms: default_timeout(),
            interval_ms: default_interval(),
            report_as: None,
        }
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn report_as(mut self, label: impl Into<String>) -> Self {
        self.report_as = Some(label.into());
        self
    }

    pub fn name(&self) -> String {
        format!("expect_label:{}:{}", self.expect.kind(), self.target)
    }

    /// Step body; resolves to whether the expectation held.
    pub fn to_js(&self, index: usize) -> String {
        let attribute = js_string(&self.attribute);
        let read = match self.scope {
            Scope::Single => format!("[await locator.getAttribute({})]", attribute),
            Scope::First => format!("[await locator.first().getAttribute({})]", attribute),
            Scope::Every => format!(
                "await Promise.all((await locator.all()).map((el) => el.getAttribute({})))",
                attribute
            ),
        };

        format!(
            r#"      const kind = {kind};
      const marker = {marker};
      const holds = (labels) => labels.length > 0 && (kind === 'contains'
        ? labels.every((l) => (l ?? '').includes(marker))
        : !labels.some((l) => (l ?? '').includes(marker)));
      const settled = (labels) => kind === 'contains' ? holds(labels) : !holds(labels);
      await page.waitForTimeout({settle});
      const locator = {locator};
      const started = Date.now();
      await locator.first().waitFor({{ state: 'attached', timeout: {timeout} }});
      const read = async () => {read};
      let labels = await read();
      let attempts = 1;
      while (!settled(labels) && Date.now() - started < {timeout}) {{
        await page.waitForTimeout({interval});
        labels = await read();
        attempts += 1;
      }}
      const passed = holds(labels);
      emit({{ event: 'observation', index: {index}, target: {target}, attribute: {attribute}, expectation: kind, marker, labels, attempts, elapsed_ms: Date.now() - started, passed }});
      return passed;"#,
            kind = js_string(self.expect.kind()),
            marker = js_string(self.expect.marker()),
            settle = self.settle_ms,
            locator = self.target.locator(),
            timeout = self.timeout_ms,
            read = read,
            interval = self.interval_ms,
            index = index,
            target = js_string(&self.target.describe()),
            attribute = attribute,
        )
    }
}

/// Wait for an intercepted request matching all given filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestCheck {
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub url_contains: Option<String>,
    #[serde(default)]
    pub body_contains: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
}

impl Default for RequestCheck {
    fn default() -> Self {
        Self {
            method: None,
            url_contains: None,
            body_contains: None,
            timeout_ms: default_timeout(),
        }
    }
}

impl RequestCheck {
    pub fn name(&self) -> String {
        format!(
            "expect_request:{}",
            self.method.as_deref().unwrap_or("*").to_ascii_uppercase()
        )
    }

    pub fn matches(&self, request: &MockRequest) -> bool {
        let method_ok = self
            .method
            .as_deref()
            .map_or(true, |m| m.eq_ignore_ascii_case(&request.method));
        let url_ok = self
            .url_contains
            .as_deref()
            .map_or(true, |u| request.url.contains(u));
        let body_ok = self
            .body_contains
            .as_deref()
            .map_or(true, |b| request.post_data.as_deref().unwrap_or("").contains(b));
        method_ok && url_ok && body_ok
    }

    pub fn to_js(&self, index: usize) -> String {
        let opt = |v: &Option<String>| v.as_deref().map(js_string).unwrap_or_else(|| "null".to_string());
        format!(
            r#"      const filter = {{ method: {method}, url: {url}, body: {body} }};
      const isMatch = (r) => (filter.method === null || r.method.toUpperCase() === filter.method.toUpperCase())
        && (filter.url === null || r.url.includes(filter.url))
        && (filter.body === null || (r.post_data ?? '').includes(filter.body));
      const started = Date.now();
      let matched = requests.find(isMatch) ?? null;
      while (matched === null && Date.now() - started < {timeout}) {{
        await page.waitForTimeout(100);
        matched = requests.find(isMatch) ?? null;
      }}
      emit({{ event: 'request_check', index: {index}, matched, elapsed_ms: Date.now() - started, passed: matched !== null }});
      return matched !== null;"#,
            method = opt(&self.method),
            url = opt(&self.url_contains),
            body = opt(&self.body_contains),
            timeout = self.timeout_ms,
            index = index,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn labels(values: &[Option<&str>]) -> Vec<Option<String>> {
        values.iter().map(|v| v.map(String::from)).collect()
    }

    #[test_case(&[Some("將媒體移動到 folder1")], true ; "single marked")]
    #[test_case(&[Some("folder1")], false ; "single unmarked")]
    #[test_case(&[None], false ; "missing attribute")]
    #[test_case(&[Some("將媒體移動到 a"), Some("b")], false ; "not every folder")]
    #[test_case(&[], false ; "nothing observed")]
    fn contains_marker(values: &[Option<&str>], expected: bool) {
        let expect = Expectation::Contains(MOVE_TARGET_MARKER.into());
        assert_eq!(expect.holds(&labels(values)), expected);
    }

    #[test_case(&[Some("folder1")], true ; "unmarked")]
    #[test_case(&[None], true ; "missing attribute")]
    #[test_case(&[Some("folder1"), Some("將媒體移動到 b")], false ; "one marked")]
    #[test_case(&[], false ; "nothing observed")]
    fn absent_marker(values: &[Option<&str>], expected: bool) {
        let expect = Expectation::Absent(MOVE_TARGET_MARKER.into());
        assert_eq!(expect.holds(&labels(values)), expected);
    }

    #[test]
    fn label_check_polls_with_settle_and_interval() {
        let check = LabelCheck::new(
            Target::text("article", "folder1"),
            Expectation::Contains(MOVE_TARGET_MARKER.into()),
        )
        .scope(Scope::First)
        .timeout_ms(3000);
        let js = check.to_js(7);
        assert!(js.contains("await page.waitForTimeout(100);\n      const locator"));
        assert!(js.contains(r#"page.locator("article", { hasText: "folder1" })"#));
        assert!(js.contains(r#"[await locator.first().getAttribute("aria-label")]"#));
        assert!(js.contains("Date.now() - started < 3000"));
        assert!(js.contains(r#"const marker = "將媒體移動到";"#));
        assert!(js.contains("index: 7"));
    }

    #[test]
    fn label_check_timeout_covers_the_attach_wait() {
        let check = LabelCheck::new(
            Target::text("article", "folder1"),
            Expectation::Absent(MOVE_TARGET_MARKER.into()),
        )
        .timeout_ms(1000);
        let js = check.to_js(0);

        let started = js.find("const started = Date.now();").unwrap();
        let attach = js.find("waitFor({ state: 'attached', timeout: 1000 })").unwrap();
        let poll = js.find("Date.now() - started < 1000").unwrap();
        assert!(started < attach && attach < poll);
        assert_eq!(js.matches("const started").count(), 1);
    }

    #[test]
    fn label_check_from_yaml() {
        let yaml = r#"
target: { text: { tag: article, text: folder1 } }
expect: { absent: 將媒體移動到 }
scope: every
timeout_ms: 1000
"#;
        let check: LabelCheck = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(check.scope, Scope::Every);
        assert_eq!(check.expect, Expectation::Absent(MOVE_TARGET_MARKER.into()));
        assert_eq!(check.settle_ms, 100);
        assert!(check.to_js(0).contains("locator.all()"));
    }

    #[test]
    fn request_check_filters() {
        let check = RequestCheck {
            method: Some("patch".into()),
            body_contains: Some(r#""action":"move""#.into()),
            ..Default::default()
        };
        let request = MockRequest {
            method: "PATCH".into(),
            url: "http://localhost:3000/api/media".into(),
            post_data: Some(r#"{"action":"move","key":"image.png","isFolder":false,"targetPrefix":"folder1/"}"#.into()),
        };
        assert!(check.matches(&request));
        assert!(!check.matches(&MockRequest {
            method: "POST".into(),
            ..request.clone()
        }));
        assert!(!check.matches(&MockRequest {
            post_data: None,
            ..request
        }));
        assert!(check.to_js(2).contains(r#"body: "\"action\":\"move\"""#));
    }
}
