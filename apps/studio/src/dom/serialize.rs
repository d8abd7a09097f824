use super::{CloseTag, Document, ElementData, NodeData, NodeId};

impl Document {
    /// Serializes the whole tree.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for &child in self.children(self.root()) {
            self.write_node(child, &mut out);
        }
        out
    }

    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for &child in self.children(id) {
            self.write_node(child, &mut out);
        }
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        match self.data(id) {
            NodeData::Document => {
                for &child in self.children(id) {
                    self.write_node(child, out);
                }
            }
            NodeData::Doctype(raw)
            | NodeData::Comment(raw)
            | NodeData::Text(raw)
            | NodeData::Stray(raw) => out.push_str(raw),
            NodeData::Element(el) => {
                match &el.raw_open {
                    Some(raw) => out.push_str(raw),
                    None => write_open_tag(el, out),
                }
                for &child in self.children(id) {
                    self.write_node(child, out);
                }
                match &el.close {
                    CloseTag::Raw(raw) => out.push_str(raw),
                    CloseTag::Omitted => {}
                    CloseTag::Canonical if el.is_void() => {}
                    CloseTag::Canonical => {
                        out.push_str("</");
                        out.push_str(&el.name);
                        out.push('>');
                    }
                }
            }
        }
    }
}

fn write_open_tag(el: &ElementData, out: &mut String) {
    out.push('<');
    out.push_str(&el.name);
    for attr in &el.attrs {
        out.push(' ');
        out.push_str(&attr.name);
        if let Some(value) = &attr.value {
            out.push_str("=\"");
            out.push_str(&escape_attr(value));
            out.push('"');
        }
    }
    out.push('>');
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Decodes the named entities resume markup actually uses plus numeric
/// references. Unknown entities are left as written.
pub fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_entity(&rest[1..semi]).map(|c| (c, semi + 1)));
        match decoded {
            Some((c, len)) => {
                out.push(c);
                rest = &rest[len..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let digits = name.strip_prefix('#')?;
            let code = match digits.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => digits.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("a &amp; b &#39;c&#x27; &bogus; &"), "a & b 'c' &bogus; &");
    }

    #[test]
    fn test_canonical_open_tag_escapes_attributes() {
        let mut el = ElementData::new("A");
        el.attrs.push(crate::dom::Attribute {
            name: "title".into(),
            value: Some("say \"hi\" & bye".into()),
        });
        let mut out = String::new();
        write_open_tag(&el, &mut out);
        assert_eq!(out, "<a title=\"say &quot;hi&quot; &amp; bye\">");
    }
}
