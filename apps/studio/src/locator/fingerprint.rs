use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::dom::{Document, NodeId};

/// Content hash of an element as it looked before an edit.
///
/// The canonical form is the tag name plus the element's whitespace-collapsed
/// text, so a preview copy (which carries extra host attributes and inlined
/// styles) and the source copy of the same element hash identically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn fingerprint(doc: &Document, node: NodeId) -> Fingerprint {
    let tag = doc.tag_name(node).unwrap_or_default();
    let text = doc.text_content(node);
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let canonical = format!("STUDIO_NODE_V1\ntag={tag}\ntext={collapsed}");
    Fingerprint(sha256_hex(&canonical))
}

fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}
