use std::collections::BTreeMap;

use crate::bridge::FrameId;
use crate::dom::{Attribute, Document, ElementData, NodeId};
use crate::locator;
use crate::remote::RenderOutput;

use super::LOCATOR_ATTR;

const AGENT_SCRIPT: &str = include_str!("../../assets/edit_agent.js");

pub struct PreviewDocument {
    /// What the frame displays: stamped, styled and scripted.
    pub html: String,
    /// The render output as parsed, without anything the host injected.
    pub document: Document,
}

pub fn build_preview(output: &RenderOutput, frame: FrameId, events_url: &str) -> PreviewDocument {
    let document = Document::parse(&output.html);
    let mut shown = document.clone();
    stamp_locators(&mut shown);
    inline_styles(&mut shown, &output.css_files);
    inject_agent(&mut shown, frame, events_url);
    PreviewDocument {
        html: shown.to_html(),
        document,
    }
}

/// Tags every element under the scope root with its locator.
fn stamp_locators(doc: &mut Document) {
    let stamps: Vec<(NodeId, String)> = doc
        .descendants(doc.scope_root())
        .filter_map(|node| locator::resolve(doc, node).map(|loc| (node, loc.to_string())))
        .collect();
    for (node, stamp) in stamps {
        doc.set_attr(node, LOCATOR_ATTR, &stamp);
    }
}

fn inline_styles(doc: &mut Document, css_files: &BTreeMap<String, String>) {
    if css_files.is_empty() {
        return;
    }
    let head = match doc.head() {
        Some(head) => head,
        None => {
            let head = doc.create_element(ElementData::new("head"));
            let parent = doc.find_element("html").unwrap_or(doc.root());
            doc.insert_child(parent, 0, head);
            head
        }
    };
    for (path, css) in css_files {
        let mut el = ElementData::new("style");
        el.attrs.push(Attribute {
            name: "data-studio-css".into(),
            value: Some(path.clone()),
        });
        let style = doc.create_element(el);
        let text = doc.create_text(css.replace("</style", "<\\/style"));
        doc.append_child(style, text);
        doc.append_child(head, style);
    }
}

fn inject_agent(doc: &mut Document, frame: FrameId, events_url: &str) {
    let endpoint = serde_json::Value::from(events_url)
        .to_string()
        .replace("</", "<\\/");
    let source = AGENT_SCRIPT
        .replace("__STUDIO_FRAME__", &frame.0.to_string())
        .replace("__STUDIO_ENDPOINT__", &endpoint);

    let mut el = ElementData::new("script");
    el.attrs.push(Attribute {
        name: "data-studio-agent".into(),
        value: None,
    });
    let script = doc.create_element(el);
    let text = doc.create_text(source);
    doc.append_child(script, text);

    let parent = doc
        .body()
        .or_else(|| doc.find_element("html"))
        .unwrap_or(doc.root());
    doc.append_child(parent, script);
}
