//! Host-side state machine behind the script injected into each preview.
//!
//! The script only reports gestures (text selected, element clicked,
//! element blurred) by locator and applies the directives returned here.
//! At most one element is editable at a time; activating another one
//! releases the previous element first, and its late blur still commits.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bridge::{BridgeMessage, ContentUpdateEvent, Envelope, FrameId, Point, SelectionEvent};
use crate::dom::{Document, NodeId};
use crate::locator::{self, fingerprint, Fingerprint, Locator};

use super::recovery::recover_formatting;
use super::HOST_ATTR_PREFIX;

/// Characters of element text kept in a selection snapshot.
pub const SNAPSHOT_TEXT_LIMIT: usize = 50;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Gesture {
    /// Mouse released over a non-collapsed selection; `anchor` is the
    /// nearest element containing the selected range.
    SelectionMade { anchor: Locator, rect: Point },
    /// Click with a collapsed selection.
    Click { target: Locator },
    Blur { target: Locator, html: String },
    KeyDown {
        key: String,
        #[serde(default)]
        shift: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Directive {
    MakeEditable { locator: Locator },
    Release { locator: Locator },
    ForceBlur,
}

/// What one gesture produced: directives for the frame and messages for
/// the host bridge.
#[derive(Debug, Default)]
pub struct AgentStep {
    pub directives: Vec<Directive>,
    pub messages: Vec<Envelope>,
}

impl AgentStep {
    fn message(envelope: Envelope) -> Self {
        Self {
            directives: Vec::new(),
            messages: vec![envelope],
        }
    }

    fn directive(directive: Directive) -> Self {
        Self {
            directives: vec![directive],
            messages: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
struct Editable {
    node: NodeId,
    locator: Locator,
    fingerprint: Fingerprint,
    original_html: String,
}

#[derive(Debug)]
pub struct EditAgent {
    frame: FrameId,
    document: Document,
    active: Option<Editable>,
    /// The previous editable after a switch, until its blur arrives.
    released: Option<Editable>,
}

impl EditAgent {
    pub fn new(frame: FrameId, document: Document) -> Self {
        Self {
            frame,
            document,
            active: None,
            released: None,
        }
    }

    pub fn is_editing(&self) -> bool {
        self.active.is_some()
    }

    pub fn handle(&mut self, gesture: Gesture) -> AgentStep {
        match gesture {
            Gesture::SelectionMade { anchor, rect } => self.select(&anchor, rect),
            Gesture::Click { target } => self.activate(&target),
            Gesture::Blur { target, html } => self.commit(&target, &html),
            Gesture::KeyDown { key, shift } => {
                if key == "Enter" && !shift && self.active.is_some() {
                    AgentStep::directive(Directive::ForceBlur)
                } else {
                    AgentStep::default()
                }
            }
        }
    }

    fn locate(&self, locator: &Locator) -> Option<NodeId> {
        match locator::query(&self.document, locator) {
            Ok(node) => Some(node),
            Err(err) => {
                debug!("{}: ignoring gesture: {err}", self.frame);
                None
            }
        }
    }

    fn select(&self, anchor: &Locator, rect: Point) -> AgentStep {
        let Some(node) = self.locate(anchor) else {
            return AgentStep::default();
        };
        let Some(el) = self.document.element(node) else {
            return AgentStep::default();
        };
        let event = SelectionEvent {
            tag_name: el.name.clone(),
            id: el.id().unwrap_or_default().to_string(),
            class_name: el.class_name().to_string(),
            text_content: truncate_text(&self.document.text_content(node), SNAPSHOT_TEXT_LIMIT),
            html: self.document.outer_html(node),
            position: rect,
        };
        AgentStep::message(Envelope::new(
            self.frame,
            BridgeMessage::ElementSelected(event),
        ))
    }

    fn activate(&mut self, target: &Locator) -> AgentStep {
        let Some(clicked) = self.locate(target) else {
            return AgentStep::default();
        };
        let node = self.promote(clicked);
        if self.active.as_ref().is_some_and(|e| e.node == node) {
            return AgentStep::default();
        }
        let Some(locator) = locator::resolve(&self.document, node) else {
            return AgentStep::default();
        };

        let mut step = AgentStep::default();
        if let Some(previous) = self.active.take() {
            step.directives.push(Directive::Release {
                locator: previous.locator.clone(),
            });
            if let Some(lost) = self.released.replace(previous) {
                debug!("{}: {} released without a blur", self.frame, lost.locator);
            }
        }
        self.active = Some(Editable {
            node,
            locator: locator.clone(),
            fingerprint: fingerprint(&self.document, node),
            original_html: self.document.inner_html(node),
        });
        step.directives.push(Directive::MakeEditable { locator });
        step
    }

    /// Clicks on inline formatting edit the enclosing block instead.
    fn promote(&self, mut node: NodeId) -> NodeId {
        while self
            .document
            .element(node)
            .is_some_and(|el| el.is_formatting())
        {
            match self.document.parent_element(node) {
                Some(parent) if locator::resolve(&self.document, parent).is_some() => node = parent,
                _ => break,
            }
        }
        node
    }

    fn commit(&mut self, target: &Locator, html: &str) -> AgentStep {
        let Some(node) = self.locate(target) else {
            return AgentStep::default();
        };
        let editable = if self.active.as_ref().is_some_and(|e| e.node == node) {
            self.active.take()
        } else if self.released.as_ref().is_some_and(|e| e.node == node) {
            self.released.take()
        } else {
            None
        };
        let Some(editable) = editable else {
            debug!("{}: blur on {target} which is not editable", self.frame);
            return AgentStep::default();
        };

        let mut edited = Document::parse(html);
        let edited_root = edited.root();
        edited.strip_attrs_with_prefix(edited_root, HOST_ATTR_PREFIX);
        let original = Document::parse(&editable.original_html);
        let recovered = recover_formatting(&original, &mut edited);
        if recovered > 0 {
            debug!("{}: restored {recovered} label(s) in {}", self.frame, editable.locator);
        }

        self.document.replace_children(node, &edited);
        let Some(el) = self.document.element(node) else {
            return AgentStep::default();
        };
        let event = ContentUpdateEvent {
            tag_name: el.name.clone(),
            id: el.id().unwrap_or_default().to_string(),
            class_name: el.class_name().to_string(),
            text_content: self.document.text_content(node),
            html: self.document.inner_html(node),
            locator: editable.locator,
            fingerprint: Some(editable.fingerprint),
        };
        AgentStep::message(Envelope::new(
            self.frame,
            BridgeMessage::ContentUpdated(event),
        ))
    }
}

/// Trims `text` and cuts it to `limit` characters, marking the cut.
pub fn truncate_text(text: &str, limit: usize) -> String {
    let text = text.trim();
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body><div class="resume">
<h1 id="name">Ada</h1>
<p class="skills"><strong>Languages:</strong> Java</p>
<p>Plain paragraph with quite a lot of words that goes on and on past fifty characters</p>
</div></body></html>"#;

    fn agent() -> EditAgent {
        EditAgent::new(FrameId(4), Document::parse(PAGE))
    }

    fn loc(s: &str) -> Locator {
        s.parse().unwrap()
    }

    fn only_update(step: &AgentStep) -> &ContentUpdateEvent {
        match step.messages.as_slice() {
            [Envelope {
                message: BridgeMessage::ContentUpdated(event),
                ..
            }] => event,
            other => panic!("expected one contentUpdated, got {other:?}"),
        }
    }

    #[test]
    fn test_selection_emits_truncated_snapshot() {
        let mut agent = agent();
        let step = agent.handle(Gesture::SelectionMade {
            anchor: loc(".resume > p:nth-of-type(2)"),
            rect: Point { x: 10.0, y: 20.0 },
        });
        let [envelope] = step.messages.as_slice() else {
            panic!("expected one message");
        };
        assert_eq!(envelope.frame, FrameId(4));
        let BridgeMessage::ElementSelected(event) = &envelope.message else {
            panic!("expected elementSelected");
        };
        assert_eq!(event.tag_name, "p");
        assert_eq!(event.text_content.chars().count(), SNAPSHOT_TEXT_LIMIT + 3);
        assert!(event.text_content.ends_with("..."));
        assert!(event.html.starts_with("<p>Plain"));
        assert_eq!(event.position, Point { x: 10.0, y: 20.0 });
        assert!(!agent.is_editing());
    }

    #[test]
    fn test_click_on_strong_edits_parent_block() {
        let mut agent = agent();
        let step = agent.handle(Gesture::Click {
            target: loc(".resume > .skills > strong"),
        });
        let [Directive::MakeEditable { locator }] = step.directives.as_slice() else {
            panic!("expected makeEditable, got {:?}", step.directives);
        };
        assert_eq!(locator.to_string(), ".resume > .skills");
        assert_eq!(
            agent.active.as_ref().unwrap().locator.to_string(),
            ".resume > .skills"
        );
    }

    #[test]
    fn test_switching_releases_previous_editable() {
        let mut agent = agent();
        agent.handle(Gesture::Click { target: loc("#name") });
        let step = agent.handle(Gesture::Click {
            target: loc(".resume > .skills"),
        });
        assert_eq!(step.directives.len(), 2);
        assert!(matches!(&step.directives[0], Directive::Release { locator } if locator.to_string() == "#name"));

        // The released element's blur still commits.
        let step = agent.handle(Gesture::Blur {
            target: loc("#name"),
            html: "Ada Lovelace".into(),
        });
        assert_eq!(only_update(&step).html, "Ada Lovelace");
        assert!(agent.is_editing());
    }

    #[test]
    fn test_clicking_the_active_element_is_a_no_op() {
        let mut agent = agent();
        agent.handle(Gesture::Click { target: loc("#name") });
        let step = agent.handle(Gesture::Click { target: loc("#name") });
        assert!(step.directives.is_empty());
    }

    #[test]
    fn test_blur_recovers_formatting_and_carries_fingerprint() {
        let mut agent = agent();
        let before = {
            let doc = Document::parse(PAGE);
            let node = locator::query(&doc, &loc(".resume > .skills")).unwrap();
            fingerprint(&doc, node)
        };
        agent.handle(Gesture::Click {
            target: loc(".resume > .skills"),
        });
        let step = agent.handle(Gesture::Blur {
            target: loc(".resume > .skills"),
            html: "Languages: Python".into(),
        });
        let event = only_update(&step);
        assert_eq!(event.html, "<strong>Languages:</strong> Python");
        assert_eq!(event.text_content, "Languages: Python");
        assert_eq!(event.locator.to_string(), ".resume > .skills");
        assert_eq!(event.fingerprint.as_ref(), Some(&before));
        assert!(!agent.is_editing());
    }

    #[test]
    fn test_blur_strips_host_attributes() {
        let mut agent = agent();
        agent.handle(Gesture::Click { target: loc("#name") });
        let step = agent.handle(Gesture::Blur {
            target: loc("#name"),
            html: "<span data-studio-loc=\"x\">Ada</span>".into(),
        });
        assert_eq!(only_update(&step).html, "<span>Ada</span>");
    }

    #[test]
    fn test_blur_of_unknown_element_is_ignored() {
        let mut agent = agent();
        let step = agent.handle(Gesture::Blur {
            target: loc("#name"),
            html: "x".into(),
        });
        assert!(step.messages.is_empty());
    }

    #[test]
    fn test_enter_without_shift_forces_blur() {
        let mut agent = agent();
        let enter = || Gesture::KeyDown {
            key: "Enter".into(),
            shift: false,
        };
        assert!(agent.handle(enter()).directives.is_empty());
        agent.handle(Gesture::Click { target: loc("#name") });
        assert_eq!(agent.handle(enter()).directives, vec![Directive::ForceBlur]);
        let shifted = agent.handle(Gesture::KeyDown {
            key: "Enter".into(),
            shift: true,
        });
        assert!(shifted.directives.is_empty());
    }

    #[test]
    fn test_gesture_wire_format() {
        let gesture: Gesture = serde_json::from_str(
            r##"{"kind": "selectionMade", "anchor": "#name", "rect": {"x": 1, "y": 2}}"##,
        )
        .unwrap();
        assert!(matches!(gesture, Gesture::SelectionMade { .. }));
        let directive = serde_json::to_value(Directive::MakeEditable {
            locator: loc(".resume > .skills"),
        })
        .unwrap();
        assert_eq!(directive["kind"], "makeEditable");
        assert_eq!(directive["locator"], ".resume > .skills");
    }

    #[test]
    fn test_truncate_text_counts_characters() {
        assert_eq!(truncate_text("  short  ", 50), "short");
        assert_eq!(truncate_text("ééééé", 3), "ééé...");
    }
}
