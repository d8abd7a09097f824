use std::fmt;
use std::ops::Add;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::locator::{Fingerprint, Locator};

pub const PROTOCOL_VERSION: u32 = 1;

/// Largest `html` payload accepted from a preview agent.
pub const MAX_HTML_BYTES: usize = 256 * 1024;

/// Identifies one rendered preview document. A new id is minted on every
/// successful render, so messages from a frame that has since been
/// replaced can be told apart from live ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameId(pub u64);

impl FrameId {
    pub fn next(self) -> Self {
        FrameId(self.0 + 1)
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Add for Point {
    type Output = Point;

    fn add(self, other: Point) -> Point {
        Point {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }
}

/// The user selected text inside the preview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SelectionEvent {
    pub tag_name: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub class_name: String,
    /// Truncated to a short preview of the element's text.
    #[serde(default)]
    pub text_content: String,
    pub html: String,
    /// Bounding-box origin of the element in page coordinates of the frame.
    pub position: Point,
}

/// An inline edit was committed inside the preview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ContentUpdateEvent {
    pub tag_name: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub class_name: String,
    #[serde(default)]
    pub text_content: String,
    /// New inner HTML of the element.
    pub html: String,
    pub locator: Locator,
    /// Fingerprint of the element before the edit. Agents that cannot
    /// compute one omit it and the patcher skips the check.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<Fingerprint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "payload", rename_all = "camelCase")]
pub enum BridgeMessage {
    ElementSelected(SelectionEvent),
    ContentUpdated(ContentUpdateEvent),
}

impl BridgeMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            BridgeMessage::ElementSelected(_) => "elementSelected",
            BridgeMessage::ContentUpdated(_) => "contentUpdated",
        }
    }
}

/// `{kind, version, frame, payload}` on the wire.
///
/// There is deliberately no `Deserialize` impl: inbound envelopes go through
/// [`Envelope::from_json`], which checks the version before looking at the
/// payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub version: u32,
    pub frame: FrameId,
    #[serde(flatten)]
    pub message: BridgeMessage,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u32),

    #[error("unknown message kind '{0}'")]
    UnknownKind(String),

    #[error("malformed {kind} payload: {reason}")]
    MalformedPayload { kind: String, reason: String },

    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEnvelope {
    kind: String,
    version: u32,
    frame: FrameId,
    payload: Value,
}

impl Envelope {
    pub fn new(frame: FrameId, message: BridgeMessage) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            frame,
            message,
        }
    }

    /// Validates an inbound envelope.
    pub fn from_json(value: Value) -> Result<Self, BridgeError> {
        let raw: RawEnvelope = serde_json::from_value(value)
            .map_err(|e| BridgeError::MalformedEnvelope(e.to_string()))?;
        if raw.version != PROTOCOL_VERSION {
            return Err(BridgeError::UnsupportedVersion(raw.version));
        }
        let malformed = |reason: String| BridgeError::MalformedPayload {
            kind: raw.kind.clone(),
            reason,
        };
        let message = match raw.kind.as_str() {
            "elementSelected" => {
                let event: SelectionEvent = serde_json::from_value(raw.payload.clone())
                    .map_err(|e| malformed(e.to_string()))?;
                check_common(&event.tag_name, &event.html).map_err(malformed)?;
                BridgeMessage::ElementSelected(event)
            }
            "contentUpdated" => {
                let event: ContentUpdateEvent = serde_json::from_value(raw.payload.clone())
                    .map_err(|e| malformed(e.to_string()))?;
                check_common(&event.tag_name, &event.html).map_err(malformed)?;
                BridgeMessage::ContentUpdated(event)
            }
            other => return Err(BridgeError::UnknownKind(other.to_string())),
        };
        Ok(Self {
            version: raw.version,
            frame: raw.frame,
            message,
        })
    }
}

fn check_common(tag_name: &str, html: &str) -> Result<(), String> {
    if tag_name.is_empty() || !tag_name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(format!("invalid tagName '{tag_name}'"));
    }
    if html.len() > MAX_HTML_BYTES {
        return Err(format!("html exceeds {MAX_HTML_BYTES} bytes"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn update_json() -> Value {
        json!({
            "kind": "contentUpdated",
            "version": 1,
            "frame": 7,
            "payload": {
                "tagName": "p",
                "id": "",
                "className": "x",
                "textContent": "B",
                "html": "B",
                "locator": ".x"
            }
        })
    }

    #[test]
    fn test_accepts_well_formed_update() {
        let envelope = Envelope::from_json(update_json()).unwrap();
        assert_eq!(envelope.frame, FrameId(7));
        match envelope.message {
            BridgeMessage::ContentUpdated(event) => {
                assert_eq!(event.locator.to_string(), ".x");
                assert!(event.fingerprint.is_none());
            }
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn test_serializes_to_wire_shape() {
        let envelope = Envelope::from_json(update_json()).unwrap();
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["kind"], "contentUpdated");
        assert_eq!(value["version"], 1);
        assert_eq!(value["frame"], 7);
        assert_eq!(value["payload"]["locator"], ".x");
        assert_eq!(Envelope::from_json(value).unwrap(), envelope);
    }

    #[test]
    fn test_rejects_unknown_kind_and_version() {
        let mut value = update_json();
        value["kind"] = json!("deleteEverything");
        assert_eq!(
            Envelope::from_json(value).unwrap_err(),
            BridgeError::UnknownKind("deleteEverything".into())
        );

        let mut value = update_json();
        value["version"] = json!(2);
        assert_eq!(
            Envelope::from_json(value).unwrap_err(),
            BridgeError::UnsupportedVersion(2)
        );
    }

    #[test]
    fn test_rejects_malformed_payloads() {
        let mut value = update_json();
        value["payload"]["locator"] = json!("");
        assert!(matches!(
            Envelope::from_json(value),
            Err(BridgeError::MalformedPayload { .. })
        ));

        let mut value = update_json();
        value["payload"]["tagName"] = json!("p onclick=x");
        assert!(matches!(
            Envelope::from_json(value),
            Err(BridgeError::MalformedPayload { .. })
        ));

        let mut value = update_json();
        value["payload"]["sneaky"] = json!(true);
        assert!(matches!(
            Envelope::from_json(value),
            Err(BridgeError::MalformedPayload { .. })
        ));

        let untyped = json!({"type": "contentUpdated", "html": "B"});
        assert!(matches!(
            Envelope::from_json(untyped),
            Err(BridgeError::MalformedEnvelope(_))
        ));
    }
}
