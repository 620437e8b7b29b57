//! Synthetic drag events
//!
//! Pointer-driven drag gestures are unreliable against applications that
//! listen for native HTML5 drag events, so events are constructed in the page
//! and dispatched directly on the target node. Each dispatch gets a fresh
//! `DataTransfer`; nothing is carried between events.

use serde::{Deserialize, Serialize};

use crate::target::{js_string, Target};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DragEventKind {
    #[default]
    DragStart,
    DragEnter,
    DragOver,
    Drop,
    DragEnd,
}

impl DragEventKind {
    /// DOM event type.
    pub fn as_str(&self) -> &'static str {
        match self {
            DragEventKind::DragStart => "dragstart",
            DragEventKind::DragEnter => "dragenter",
            DragEventKind::DragOver => "dragover",
            DragEventKind::Drop => "drop",
            DragEventKind::DragEnd => "dragend",
        }
    }
}

/// One event dispatched on one element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragDispatch {
    pub target: Target,
    #[serde(default)]
    pub event: DragEventKind,
}

impl DragDispatch {
    pub fn begin(target: Target) -> Self {
        Self {
            target,
            event: DragEventKind::DragStart,
        }
    }

    pub fn new(target: Target, event: DragEventKind) -> Self {
        Self { target, event }
    }

    pub fn name(&self) -> String {
        format!("drag:{}@{}", self.event.as_str(), self.target)
    }

    /// Step body. The locator is strict, so the target must resolve to
    /// exactly one element that is already attached.
    pub fn to_js(&self, index: usize) -> String {
        format!(
            r#"      const result = await {locator}.evaluate((node, type) => {{
        const dataTransfer = new DataTransfer();
        const event = new DragEvent(type, {{ bubbles: true, cancelable: true, dataTransfer }});
        const delivered = node.dispatchEvent(event);
        return {{ delivered, defaultPrevented: event.defaultPrevented }};
      }}, {event});
      emit({{ event: 'dispatch', index: {index}, type: {event}, target: {target}, delivered: result.delivered, default_prevented: result.defaultPrevented }});"#,
            locator = self.target.locator(),
            event = js_string(self.event.as_str()),
            target = js_string(&self.target.describe()),
            index = index,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dragstart_is_bubbling_and_cancelable() {
        let dispatch = DragDispatch::begin(Target::aria_label("article", "image.png 預覽"));
        let js = dispatch.to_js(4);
        assert!(js.contains("new DataTransfer()"));
        assert!(js.contains("new DragEvent(type, { bubbles: true, cancelable: true, dataTransfer })"));
        assert!(js.contains(r#"}, "dragstart");"#));
        assert!(js.contains(r#"page.locator("article[aria-label=\"image.png 預覽\"]").evaluate"#));
        assert!(js.contains("index: 4"));
    }

    #[test]
    fn event_kind_parses_lowercase() {
        let dispatch: DragDispatch =
            serde_yaml::from_str("target: { css: '#a' }\nevent: dragover").unwrap();
        assert_eq!(dispatch.event, DragEventKind::DragOver);
        assert_eq!(dispatch.name(), "drag:dragover@#a");
    }
}
