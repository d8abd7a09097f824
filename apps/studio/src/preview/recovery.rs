//! Restores label emphasis lost during a plain-text inline edit.
//!
//! Browsers tend to drop `<strong>` wrappers when a user retypes the start
//! of a line such as `<strong>Languages:</strong> Java`. If the content
//! before the edit had emphasis and the edited content has none, every
//! `Label:` run that appeared in the original text is wrapped in `<strong>`
//! again at its first occurrence in the edited text. The whole pass works on
//! parsed text nodes; serialized markup is never searched.

use std::sync::OnceLock;

use regex::Regex;

use crate::dom::{Document, ElementData, NodeData, NodeId};

static LABEL: OnceLock<Regex> = OnceLock::new();

fn label_pattern() -> &'static Regex {
    LABEL.get_or_init(|| Regex::new(r"[A-Za-z ]+:").expect("label pattern is valid"))
}

/// Returns the number of labels re-wrapped.
pub fn recover_formatting(original: &Document, edited: &mut Document) -> usize {
    if !original.contains_formatting(original.root()) || edited.contains_formatting(edited.root()) {
        return 0;
    }

    let mut recovered = 0;
    for label in labels(original) {
        if wrap_first(edited, &label) {
            recovered += 1;
        }
    }
    recovered
}

/// Distinct trimmed labels from the text of `doc`, in document order.
fn labels(doc: &Document) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for node in doc.descendants(doc.root()) {
        let NodeData::Text(_) = doc.data(node) else {
            continue;
        };
        let text = doc.text_content(node);
        for found in label_pattern().find_iter(&text) {
            let label = found.as_str().trim();
            if label.len() > 1 && !out.iter().any(|l| l == label) {
                out.push(label.to_string());
            }
        }
    }
    out
}

fn wrap_first(doc: &mut Document, label: &str) -> bool {
    let hit = doc.descendants(doc.root()).find_map(|node| match doc.data(node) {
        NodeData::Text(raw) if !inside_strong(doc, node) => {
            raw.find(label).map(|at| (node, raw.clone(), at))
        }
        _ => None,
    });
    let Some((node, raw, at)) = hit else {
        return false;
    };
    let Some(parent) = doc.parent(node) else {
        return false;
    };
    let Some(index) = doc.children(parent).iter().position(|&c| c == node) else {
        return false;
    };

    let before = &raw[..at];
    let after = &raw[at + label.len()..];
    let strong = doc.create_element(ElementData::new("strong"));
    let label_text = doc.create_text(label);
    doc.append_child(strong, label_text);

    doc.detach(node);
    let mut replacement: Vec<NodeId> = Vec::with_capacity(3);
    if !before.is_empty() {
        replacement.push(doc.create_text(before));
    }
    replacement.push(strong);
    if !after.is_empty() {
        replacement.push(doc.create_text(after));
    }
    for (offset, new_node) in replacement.into_iter().enumerate() {
        doc.insert_child(parent, index + offset, new_node);
    }
    true
}

fn inside_strong(doc: &Document, node: NodeId) -> bool {
    doc.parent(node).and_then(|p| doc.tag_name(p)) == Some("strong")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recover(original: &str, edited: &str) -> String {
        let original = Document::parse(original);
        let mut edited = Document::parse(edited);
        recover_formatting(&original, &mut edited);
        edited.to_html()
    }

    #[test]
    fn test_rewraps_dropped_label() {
        assert_eq!(
            recover("<strong>Languages:</strong> Java", "Languages: Python"),
            "<strong>Languages:</strong> Python"
        );
    }

    #[test]
    fn test_wraps_label_in_the_middle_of_text() {
        assert_eq!(
            recover(
                "<b>Tools:</b> Git<br>More",
                "Updated list. Tools: Git, Docker"
            ),
            "Updated list. <strong>Tools:</strong> Git, Docker"
        );
    }

    #[test]
    fn test_multiple_labels_each_wrapped_once() {
        assert_eq!(
            recover(
                "<strong>Languages:</strong> Rust <strong>Frameworks:</strong> Axum",
                "Languages: Rust, Go Frameworks: Axum"
            ),
            "<strong>Languages:</strong> Rust, Go <strong>Frameworks:</strong> Axum"
        );
    }

    #[test]
    fn test_no_change_when_original_had_no_emphasis() {
        assert_eq!(recover("Languages: Java", "Languages: Python"), "Languages: Python");
    }

    #[test]
    fn test_no_change_when_edit_kept_emphasis() {
        assert_eq!(
            recover(
                "<strong>Languages:</strong> Java",
                "<em>Languages:</em> Python"
            ),
            "<em>Languages:</em> Python"
        );
    }

    #[test]
    fn test_missing_label_is_skipped() {
        let original = Document::parse("<strong>Languages:</strong> Java");
        let mut edited = Document::parse("Python only");
        assert_eq!(recover_formatting(&original, &mut edited), 0);
        assert_eq!(edited.to_html(), "Python only");
    }
}
