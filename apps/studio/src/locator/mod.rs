//! Locators: recomputable addresses for elements of a markup document.
//!
//! A locator is a child-combinator chain of segments from just below
//! `<body>` down to the target. Each segment picks the most specific stable
//! handle an element has: `#id`, then `.firstClass`, then its tag name, with
//! a 1-based `:nth-of-type(n)` ordinal appended whenever the segment alone
//! would match more than one sibling. Ids are document-unique, so a segment
//! carrying an id anchors the chain and no ancestors are recorded above it.
//!
//! Resolution is purely structural: if siblings are reordered or class lists
//! change between render and patch, a locator can miss or hit the wrong
//! node. [`fingerprint`] exists to catch the second case.

mod fingerprint;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dom::{Document, ElementData, NodeId};

pub use fingerprint::{fingerprint, Fingerprint};

/// One hop of a locator chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Segment {
    /// Lowercased tag name. Always set by [`resolve`]; absent when parsed
    /// from a `#id` or `.class` string.
    pub tag_name: Option<String>,
    pub id: Option<String>,
    pub class_name: Option<String>,
    /// 1-based position among same-tag element siblings.
    pub nth_of_type: Option<usize>,
}

impl Segment {
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let Some(el) = doc.element(node) else {
            return false;
        };
        if self.tag_name.as_deref().is_some_and(|tag| tag != el.name) {
            return false;
        }
        if let Some(id) = &self.id {
            if el.id() != Some(id.as_str()) {
                return false;
            }
        } else if let Some(class) = &self.class_name {
            if !el.has_class(class) {
                return false;
            }
        }
        match self.nth_of_type {
            Some(nth) => doc.nth_of_type(node).is_some_and(|(index, _)| index == nth),
            None => true,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(id) = &self.id {
            write!(f, "#{id}")?;
        } else if let Some(class) = &self.class_name {
            write!(f, ".{class}")?;
        } else {
            f.write_str(self.tag_name.as_deref().unwrap_or("*"))?;
        }
        if let Some(nth) = self.nth_of_type {
            write!(f, ":nth-of-type({nth})")?;
        }
        Ok(())
    }
}

/// A chain of segments, outermost first. Serialized as its string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Locator {
    segments: Vec<Segment>,
}


impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(" > ")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl From<Locator> for String {
    fn from(locator: Locator) -> Self {
        locator.to_string()
    }
}

impl TryFrom<String> for Locator {
    type Error = LocatorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocatorParseError {
    #[error("locator is empty")]
    Empty,

    #[error("invalid locator segment '{0}'")]
    InvalidSegment(String),
}

impl FromStr for Locator {
    type Err = LocatorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(LocatorParseError::Empty);
        }
        let segments = s
            .split('>')
            .map(|part| parse_segment(part.trim()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Locator { segments })
    }
}

/// Parses `tag`, `tag#id`, `.class`, `tag.a.b` (first class kept) and an
/// optional trailing `:nth-of-type(n)`.
fn parse_segment(part: &str) -> Result<Segment, LocatorParseError> {
    let invalid = || LocatorParseError::InvalidSegment(part.to_string());
    if part.is_empty() {
        return Err(invalid());
    }

    let (body, nth_of_type) = match part.split_once(":nth-of-type(") {
        Some((body, rest)) => {
            let digits = rest.strip_suffix(')').ok_or_else(invalid)?;
            let nth: usize = digits.trim().parse().map_err(|_| invalid())?;
            if nth == 0 {
                return Err(invalid());
            }
            (body, Some(nth))
        }
        None => (part, None),
    };

    let tag_end = body.find(['#', '.']).unwrap_or(body.len());
    let tag = &body[..tag_end];
    if !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '*') {
        return Err(invalid());
    }
    let tag_name = match tag {
        "" | "*" => None,
        tag => Some(tag.to_ascii_lowercase()),
    };

    let mut id = None;
    let mut class_name = None;
    let mut rest = &body[tag_end..];
    while !rest.is_empty() {
        let marker = rest.as_bytes()[0];
        let end = rest[1..].find(['#', '.']).map_or(rest.len(), |i| i + 1);
        let value = &rest[1..end];
        if value.is_empty() {
            return Err(invalid());
        }
        match marker {
            b'#' => id = Some(value.to_string()),
            _ => {
                class_name.get_or_insert_with(|| value.to_string());
            }
        }
        rest = &rest[end..];
    }

    if tag_name.is_none() && id.is_none() && class_name.is_none() {
        return Err(invalid());
    }
    Ok(Segment {
        tag_name,
        id,
        class_name,
        nth_of_type,
    })
}

/// Computes the locator for `node`. `None` for non-elements and for the
/// document scaffolding (`html`, `head`, `body`) itself.
pub fn resolve(doc: &Document, node: NodeId) -> Option<Locator> {
    let el = doc.element(node)?;
    if matches!(el.name.as_str(), "html" | "body" | "head") {
        return None;
    }

    let mut segments = Vec::new();
    let mut current = Some(node);
    while let Some(id) = current {
        let Some(el) = doc.element(id) else {
            break;
        };
        if matches!(el.name.as_str(), "html" | "body") {
            break;
        }
        let segment = segment_for(doc, id, el);
        let anchored = segment.id.is_some();
        segments.push(segment);
        if anchored {
            break;
        }
        current = doc.parent(id);
    }
    segments.reverse();
    Some(Locator { segments })
}

fn segment_for(doc: &Document, node: NodeId, el: &ElementData) -> Segment {
    let mut segment = Segment {
        tag_name: Some(el.name.clone()),
        id: None,
        class_name: None,
        nth_of_type: None,
    };
    if let Some(id) = el.id() {
        segment.id = Some(id.to_string());
        return segment;
    }
    segment.class_name = el.first_class().map(str::to_string);

    let Some(parent) = doc.parent(node) else {
        return segment;
    };
    let competing = doc
        .element_children(parent)
        .filter(|&sibling| segment.matches(doc, sibling))
        .count();
    if competing > 1 {
        segment.nth_of_type = doc.nth_of_type(node).map(|(index, _)| index);
    }
    segment
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocateError {
    #[error("no element matches '{0}'")]
    NotFound(String),

    #[error("'{locator}' matches {count} elements")]
    Ambiguous { locator: String, count: usize },
}

/// Finds the single element `locator` addresses in `doc`.
pub fn query(doc: &Document, locator: &Locator) -> Result<NodeId, LocateError> {
    let mut segments = locator.segments.iter();
    let Some(first) = segments.next() else {
        return Err(LocateError::NotFound(locator.to_string()));
    };

    let mut candidates: Vec<NodeId> = if first.id.is_some() {
        doc.descendants(doc.root())
            .filter(|&n| first.matches(doc, n))
            .collect()
    } else {
        doc.element_children(doc.scope_root())
            .filter(|&n| first.matches(doc, n))
            .collect()
    };

    for segment in segments {
        candidates = candidates
            .iter()
            .flat_map(|&parent| doc.element_children(parent))
            .filter(|&n| segment.matches(doc, n))
            .collect();
    }

    match candidates.as_slice() {
        [] => Err(LocateError::NotFound(locator.to_string())),
        [single] => Ok(*single),
        many => Err(LocateError::Ambiguous {
            locator: locator.to_string(),
            count: many.len(),
        }),
    }
}
