//! Source-preserving HTML tree.
//!
//! Elements parsed from source keep the exact text of their start and end
//! tags, and text nodes keep their raw (still-escaped) source text. A node
//! that is never touched therefore serializes back to the same bytes it was
//! parsed from, which is what lets the patcher splice one element's content
//! without disturbing the rest of a hand-written resume.
//!
//! Nodes live in an arena owned by [`Document`]; detached nodes stay in the
//! arena but are unreachable from the root.

mod parser;
mod serialize;

pub(crate) use serialize::decode_entities;

/// Index of a node inside its owning [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Elements whose clicks are promoted to the enclosing block for editing.
pub const FORMATTING_TAGS: [&str; 4] = ["strong", "em", "b", "i"];

/// Elements that never have content or an end tag.
pub(crate) const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose content is raw text up to the matching end tag.
pub(crate) const RAW_TEXT_ELEMENTS: [&str; 4] = ["script", "style", "textarea", "title"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Lowercased attribute name.
    pub name: String,
    /// Decoded value; `None` for a bare boolean attribute.
    pub value: Option<String>,
}

/// How an element's end tag is emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseTag {
    /// The exact end tag text found in source.
    Raw(String),
    /// The source omitted the end tag; nothing is emitted.
    Omitted,
    /// Emit `</name>` (or nothing for void elements).
    Canonical,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    /// Lowercased tag name.
    pub name: String,
    pub attrs: Vec<Attribute>,
    /// Exact start tag text from source, dropped once attributes change.
    pub raw_open: Option<String>,
    pub close: CloseTag,
}

impl ElementData {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            attrs: Vec::new(),
            raw_open: None,
            close: CloseTag::Canonical,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_deref().unwrap_or(""))
    }

    /// The element's id, if present and non-empty.
    pub fn id(&self) -> Option<&str> {
        self.attr("id").map(str::trim).filter(|id| !id.is_empty())
    }

    /// The raw `class` attribute, empty when absent.
    pub fn class_name(&self) -> &str {
        self.attr("class").unwrap_or("")
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.class_name().split_whitespace()
    }

    pub fn first_class(&self) -> Option<&str> {
        self.classes().next()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    pub fn is_void(&self) -> bool {
        VOID_ELEMENTS.contains(&self.name.as_str())
    }

    pub fn is_formatting(&self) -> bool {
        FORMATTING_TAGS.contains(&self.name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Document,
    /// `<!DOCTYPE ...>` or any other `<!...>` declaration, verbatim.
    Doctype(String),
    /// Full comment text including the `<!--` and `-->` delimiters.
    Comment(String),
    /// Raw source text; entities are not decoded.
    Text(String),
    /// An end tag with no matching open element, kept verbatim.
    Stray(String),
    Element(ElementData),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

/// An arena-backed HTML tree rooted at a `NodeData::Document` node.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                data: NodeData::Document,
            }],
        }
    }

    /// Parses a full document or a fragment. Parsing never fails; malformed
    /// markup is kept as verbatim nodes.
    pub fn parse(source: &str) -> Self {
        parser::parse(source)
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0].data
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.nodes[id.0].data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.nodes[id.0].data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.name.as_str())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(|&c| self.element(c).is_some())
    }

    /// Nearest ancestor (or self) that is an element.
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|&p| self.element(p).is_some())
    }

    /// Pre-order traversal of `id` and everything below it.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            doc: self,
            stack: vec![id],
        }
    }

    pub fn find_element(&self, name: &str) -> Option<NodeId> {
        self.descendants(self.root())
            .find(|&n| self.tag_name(n) == Some(name))
    }

    pub fn body(&self) -> Option<NodeId> {
        self.find_element("body")
    }

    pub fn head(&self) -> Option<NodeId> {
        self.find_element("head")
    }

    /// The node whose element children are the first hop of a locator: the
    /// `<body>` when present, then `<html>`, otherwise the document root
    /// (fragments).
    pub fn scope_root(&self) -> NodeId {
        self.body()
            .or_else(|| self.find_element("html"))
            .unwrap_or(self.root())
    }

    /// All elements carrying `id`, in document order.
    pub fn elements_with_id<'a>(&'a self, id: &'a str) -> impl Iterator<Item = NodeId> + 'a {
        self.descendants(self.root())
            .filter(move |&n| self.element(n).and_then(ElementData::id) == Some(id))
    }

    /// Decoded text of a node and its descendants. Comments are skipped, and
    /// so is the content of `<script>`/`<style>`.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match self.data(id) {
            NodeData::Text(raw) => out.push_str(&decode_entities(raw)),
            NodeData::Element(el) if el.name == "script" || el.name == "style" => {}
            NodeData::Element(_) | NodeData::Document => {
                for &child in self.children(id) {
                    self.collect_text(child, out);
                }
            }
            _ => {}
        }
    }

    /// True if any descendant of `id` (excluding `id` itself) is a
    /// formatting element.
    pub fn contains_formatting(&self, id: NodeId) -> bool {
        self.descendants(id)
            .skip(1)
            .any(|n| self.element(n).is_some_and(ElementData::is_formatting))
    }

    pub fn create_element(&mut self, data: ElementData) -> NodeId {
        self.push_node(NodeData::Element(data))
    }

    pub fn create_text(&mut self, raw: impl Into<String>) -> NodeId {
        self.push_node(NodeData::Text(raw.into()))
    }

    pub(crate) fn push_node(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            data,
        });
        id
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Inserts `child` into `parent`'s child list at `index`.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        let children = &mut self.nodes[parent.0].children;
        let index = index.min(children.len());
        children.insert(index, child);
    }

    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != id);
        }
    }

    pub fn clear_children(&mut self, id: NodeId) {
        for child in std::mem::take(&mut self.nodes[id.0].children) {
            self.nodes[child.0].parent = None;
        }
    }

    /// Replaces the children of `target` with deep copies of the top-level
    /// nodes of `fragment`. Copied elements are emitted canonically, so tag
    /// names come out lowercase whatever case the fragment used.
    pub fn replace_children(&mut self, target: NodeId, fragment: &Document) {
        self.clear_children(target);
        for &child in fragment.children(fragment.root()) {
            let copied = self.import(fragment, child);
            self.append_child(target, copied);
        }
    }

    fn import(&mut self, from: &Document, id: NodeId) -> NodeId {
        let data = match from.data(id) {
            NodeData::Element(el) => NodeData::Element(ElementData {
                name: el.name.clone(),
                attrs: el.attrs.clone(),
                raw_open: None,
                close: CloseTag::Canonical,
            }),
            other => other.clone(),
        };
        let copy = self.push_node(data);
        for &child in from.children(id) {
            let child_copy = self.import(from, child);
            self.append_child(copy, child_copy);
        }
        copy
    }

    /// Sets (or replaces) an attribute; the element is re-emitted canonically.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(el) = self.element_mut(id) {
            el.raw_open = None;
            match el.attrs.iter_mut().find(|a| a.name == name) {
                Some(attr) => attr.value = Some(value.to_string()),
                None => el.attrs.push(Attribute {
                    name: name.to_string(),
                    value: Some(value.to_string()),
                }),
            }
        }
    }

    /// Removes every attribute whose name starts with `prefix` from all
    /// elements below `id`.
    pub fn strip_attrs_with_prefix(&mut self, id: NodeId, prefix: &str) {
        let targets: Vec<NodeId> = self.descendants(id).collect();
        for node in targets {
            if let Some(el) = self.element_mut(node) {
                if el.attrs.iter().any(|a| a.name.starts_with(prefix)) {
                    el.attrs.retain(|a| !a.name.starts_with(prefix));
                    el.raw_open = None;
                }
            }
        }
    }

    /// Position of `id` among its parent's element children with the same
    /// tag name, 1-based, together with how many such siblings there are.
    pub fn nth_of_type(&self, id: NodeId) -> Option<(usize, usize)> {
        let name = self.tag_name(id)?;
        let parent = self.parent(id)?;
        let mut index = 0;
        let mut count = 0;
        for sibling in self.element_children(parent) {
            if self.tag_name(sibling) == Some(name) {
                count += 1;
                if sibling == id {
                    index = count;
                }
            }
        }
        Some((index, count))
    }
}

pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.doc.children(id).iter().rev().copied());
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESUME: &str = r#"<!DOCTYPE html>
<html>
<head><title>Resume</title></head>
<body>
    <div class="resume">
        <h1 id="name">Your Name</h1>
        <p class="summary">Builder of <strong>things</strong> &amp; stuff</p>
        <ul><li>One</li><li>Two</li></ul>
    </div>
</body>
</html>"#;

    #[test]
    fn test_parse_finds_body_and_ids() {
        let doc = Document::parse(RESUME);
        let body = doc.body().unwrap();
        assert_eq!(doc.tag_name(body), Some("body"));
        let h1 = doc.elements_with_id("name").next().unwrap();
        assert_eq!(doc.text_content(h1), "Your Name");
    }

    #[test]
    fn test_text_content_decodes_entities() {
        let doc = Document::parse(RESUME);
        let p = doc.find_element("p").unwrap();
        assert_eq!(doc.text_content(p), "Builder of things & stuff");
        assert!(doc.contains_formatting(p));
    }

    #[test]
    fn test_nth_of_type_counts_same_tag_siblings() {
        let doc = Document::parse(RESUME);
        let items: Vec<_> = doc
            .descendants(doc.root())
            .filter(|&n| doc.tag_name(n) == Some("li"))
            .collect();
        assert_eq!(doc.nth_of_type(items[0]), Some((1, 2)));
        assert_eq!(doc.nth_of_type(items[1]), Some((2, 2)));
    }

    #[test]
    fn test_replace_children_lowercases_imported_tags() {
        let mut doc = Document::parse("<p class=\"x\">A</p>");
        let p = doc.find_element("p").unwrap();
        let fragment = Document::parse("<STRONG>B</STRONG> c");
        doc.replace_children(p, &fragment);
        assert_eq!(doc.to_html(), "<p class=\"x\"><strong>B</strong> c</p>");
    }

    #[test]
    fn test_strip_attrs_with_prefix_rewrites_tag() {
        let mut doc = Document::parse("<p data-studio-loc=\"p\" class=\"x\">A</p>");
        doc.strip_attrs_with_prefix(doc.root(), "data-studio-");
        assert_eq!(doc.to_html(), "<p class=\"x\">A</p>");
    }
}
