//! Lenient HTML tree builder.
//!
//! This is not a complete HTML5 parser: it knows enough about void
//! elements, raw-text elements and the common implied end tags (`p`, `li`,
//! `dt`/`dd`, table rows and cells, `option`) to build the same shape a
//! browser builds for hand-written resume markup, while recording every
//! token's source text so untouched regions re-serialize verbatim.

use super::{
    decode_entities, Attribute, CloseTag, Document, ElementData, NodeData, NodeId,
    RAW_TEXT_ELEMENTS, VOID_ELEMENTS,
};

/// Start tags that implicitly close an open `<p>`.
const CLOSES_P: [&str; 24] = [
    "address", "article", "aside", "blockquote", "div", "dl", "fieldset", "footer", "form", "h1",
    "h2", "h3", "h4", "h5", "h6", "header", "hr", "main", "nav", "ol", "p", "section", "table",
    "ul",
];

struct StartTag {
    name: String,
    attrs: Vec<Attribute>,
    self_closing: bool,
}

struct TreeBuilder {
    doc: Document,
    stack: Vec<NodeId>,
}

pub(super) fn parse(source: &str) -> Document {
    let doc = Document::new();
    let root = doc.root();
    let mut builder = TreeBuilder {
        doc,
        stack: vec![root],
    };

    let bytes = source.as_bytes();
    let mut pos = 0;
    let mut text_start = 0;

    while pos < bytes.len() {
        if bytes[pos] != b'<' {
            pos += 1;
            continue;
        }
        let rest = &source[pos..];
        let next = bytes.get(pos + 1).copied();

        if rest.starts_with("<!--") {
            let len = rest[4..].find("-->").map_or(rest.len(), |i| i + 7);
            builder.text(&source[text_start..pos]);
            builder.leaf(NodeData::Comment(rest[..len].to_string()));
            pos += len;
            text_start = pos;
        } else if matches!(next, Some(b'!') | Some(b'?')) {
            let len = rest.find('>').map_or(rest.len(), |i| i + 1);
            builder.text(&source[text_start..pos]);
            builder.leaf(NodeData::Doctype(rest[..len].to_string()));
            pos += len;
            text_start = pos;
        } else if next == Some(b'/') && bytes.get(pos + 2).is_some_and(u8::is_ascii_alphabetic) {
            let len = rest.find('>').map_or(rest.len(), |i| i + 1);
            builder.text(&source[text_start..pos]);
            builder.end_tag(&rest[..len]);
            pos += len;
            text_start = pos;
        } else if next.is_some_and(|b| b.is_ascii_alphabetic()) {
            let Some((tag, len)) = parse_start_tag(rest) else {
                pos += 1;
                continue;
            };
            builder.text(&source[text_start..pos]);
            let raw_text = RAW_TEXT_ELEMENTS.contains(&tag.name.as_str()) && !tag.self_closing;
            let name = tag.name.clone();
            builder.start_tag(tag, &rest[..len]);
            pos += len;
            text_start = pos;

            if raw_text {
                let close = find_end_tag(source, pos, &name).unwrap_or(source.len());
                builder.text(&source[pos..close]);
                pos = close;
                text_start = pos;
                if close < source.len() {
                    let len = source[close..].find('>').map_or(source.len() - close, |i| i + 1);
                    builder.end_tag(&source[close..close + len]);
                    pos += len;
                    text_start = pos;
                }
            }
        } else {
            pos += 1;
        }
    }
    builder.text(&source[text_start..]);
    builder.doc
}

impl TreeBuilder {
    fn current(&self) -> NodeId {
        self.stack.last().copied().unwrap_or(self.doc.root())
    }

    fn text(&mut self, raw: &str) {
        if raw.is_empty() {
            return;
        }
        let node = self.doc.create_text(raw);
        let parent = self.current();
        self.doc.append_child(parent, node);
    }

    fn leaf(&mut self, data: NodeData) {
        let node = self.doc.push_node(data);
        let parent = self.current();
        self.doc.append_child(parent, node);
    }

    fn start_tag(&mut self, tag: StartTag, raw: &str) {
        self.close_implied(&tag.name);

        let is_void = VOID_ELEMENTS.contains(&tag.name.as_str());
        let node = self.doc.create_element(ElementData {
            name: tag.name,
            attrs: tag.attrs,
            raw_open: Some(raw.to_string()),
            close: CloseTag::Omitted,
        });
        let parent = self.current();
        self.doc.append_child(parent, node);
        if !is_void && !tag.self_closing {
            self.stack.push(node);
        }
    }

    fn end_tag(&mut self, raw: &str) {
        let name: String = raw[2..]
            .chars()
            .take_while(|c| !c.is_whitespace() && *c != '>' && *c != '/')
            .collect::<String>()
            .to_ascii_lowercase();

        let open = self
            .stack
            .iter()
            .rposition(|&n| self.doc.tag_name(n) == Some(name.as_str()));

        match open {
            Some(index) if index > 0 && !VOID_ELEMENTS.contains(&name.as_str()) => {
                let node = self.stack[index];
                self.stack.truncate(index);
                if let Some(el) = self.doc.element_mut(node) {
                    el.close = CloseTag::Raw(raw.to_string());
                }
            }
            _ => self.leaf(NodeData::Stray(raw.to_string())),
        }
    }

    /// Pops elements whose end tag is implied by the start of `name`.
    fn close_implied(&mut self, name: &str) {
        if CLOSES_P.contains(&name) && self.top_is("p") {
            self.stack.pop();
        }
        match name {
            "li" => self.close_up_to("li", &["ul", "ol"]),
            "dt" | "dd" => {
                self.close_up_to("dt", &["dl"]);
                self.close_up_to("dd", &["dl"]);
            }
            "tr" => self.close_up_to("tr", &["table", "thead", "tbody", "tfoot"]),
            "td" | "th" => {
                self.close_up_to("td", &["tr", "table"]);
                self.close_up_to("th", &["tr", "table"]);
            }
            "option" if self.top_is("option") => {
                self.stack.pop();
            }
            _ => {}
        }
    }

    fn top_is(&self, name: &str) -> bool {
        self.stack.len() > 1 && self.doc.tag_name(self.current()) == Some(name)
    }

    /// Closes the nearest open `name` unless one of `boundaries` is nearer.
    fn close_up_to(&mut self, name: &str, boundaries: &[&str]) {
        for index in (1..self.stack.len()).rev() {
            let tag = self.doc.tag_name(self.stack[index]).unwrap_or_default();
            if tag == name {
                self.stack.truncate(index);
                return;
            }
            if boundaries.contains(&tag) {
                return;
            }
        }
    }
}

/// Parses `<name attr=value ...>` at the start of `input`, returning the tag
/// and its byte length. `None` when the tag is unterminated.
fn parse_start_tag(input: &str) -> Option<(StartTag, usize)> {
    let bytes = input.as_bytes();
    let mut pos = 1;
    while pos < bytes.len() && is_name_byte(bytes[pos]) {
        pos += 1;
    }
    let name = input[1..pos].to_ascii_lowercase();
    let mut attrs = Vec::new();

    loop {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        match bytes.get(pos)? {
            b'>' => {
                return Some((
                    StartTag {
                        name,
                        attrs,
                        self_closing: false,
                    },
                    pos + 1,
                ))
            }
            b'/' if bytes.get(pos + 1) == Some(&b'>') => {
                return Some((
                    StartTag {
                        name,
                        attrs,
                        self_closing: true,
                    },
                    pos + 2,
                ))
            }
            b'/' => {
                pos += 1;
                continue;
            }
            _ => {}
        }

        let name_start = pos;
        while pos < bytes.len()
            && !bytes[pos].is_ascii_whitespace()
            && !matches!(bytes[pos], b'=' | b'>' | b'/')
        {
            pos += 1;
        }
        let attr_name = input[name_start..pos].to_ascii_lowercase();

        let mut look = pos;
        while look < bytes.len() && bytes[look].is_ascii_whitespace() {
            look += 1;
        }
        if bytes.get(look) != Some(&b'=') {
            attrs.push(Attribute {
                name: attr_name,
                value: None,
            });
            continue;
        }
        pos = look + 1;
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        let value = match bytes.get(pos)? {
            quote @ (b'"' | b'\'') => {
                let close = input[pos + 1..].find(*quote as char)? + pos + 1;
                let value = &input[pos + 1..close];
                pos = close + 1;
                value
            }
            _ => {
                let start = pos;
                while pos < bytes.len() && !bytes[pos].is_ascii_whitespace() && bytes[pos] != b'>'
                {
                    pos += 1;
                }
                &input[start..pos]
            }
        };
        attrs.push(Attribute {
            name: attr_name,
            value: Some(decode_entities(value)),
        });
    }
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b':' || b == b'_'
}

/// Byte offset of the first `</name` at or after `from`, case-insensitive.
fn find_end_tag(source: &str, from: usize, name: &str) -> Option<usize> {
    let haystack = source[from..].to_ascii_lowercase();
    let needle = format!("</{name}");
    let mut offset = 0;
    while let Some(found) = haystack[offset..].find(&needle) {
        let at = offset + found;
        let after = haystack.as_bytes().get(at + needle.len()).copied();
        if after.map_or(true, |b| !is_name_byte(b)) {
            return Some(from + at);
        }
        offset = at + needle.len();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(source: &str) {
        assert_eq!(Document::parse(source).to_html(), source);
    }

    #[test]
    fn test_roundtrip_preserves_source_bytes() {
        roundtrip("<!DOCTYPE html>\n<html lang=en>\n<HEAD><Title>x &amp; y</Title></HEAD>\n<body class='a'>\n  <p>One<p>Two\n  <br>\n  <img src=\"a.png\" alt=\"\"/>\n</body></html>\n");
    }

    #[test]
    fn test_roundtrip_keeps_stray_and_unterminated_markup() {
        roundtrip("<div>a</span> < b <!-- note --> 3 <> 4</div><p");
    }

    #[test]
    fn test_style_content_is_raw_text() {
        let doc = Document::parse("<style>p > a { color: red }</style><p>x</p>");
        let style = doc.find_element("style").unwrap();
        assert_eq!(doc.children(style).len(), 1);
        assert!(doc.find_element("a").is_none());
    }

    #[test]
    fn test_implied_end_tags_for_paragraphs_and_items() {
        let doc = Document::parse("<ul><li>a<li>b</ul><p>one<div>two</div>");
        let ul = doc.find_element("ul").unwrap();
        assert_eq!(doc.element_children(ul).count(), 2);
        let div = doc.find_element("div").unwrap();
        assert_eq!(doc.tag_name(doc.parent(div).unwrap()), None);
    }

    #[test]
    fn test_attributes_are_decoded_and_lowercased() {
        let doc = Document::parse("<P ID=\"top\" Class=\"a&amp;b c\" hidden>x</P>");
        let p = doc.find_element("p").unwrap();
        let el = doc.element(p).unwrap();
        assert_eq!(el.id(), Some("top"));
        assert_eq!(el.first_class(), Some("a&b"));
        assert_eq!(el.attr("hidden"), Some(""));
    }
}
