//! JSON page fixtures.
//!
//! A fixture describes a rendered page without a layout engine: each element
//! lists its attributes (inline `style` included) and, optionally, its page
//! rectangle.
//!
//! ```json
//! {
//!   "viewport": { "width": 1280, "height": 720 },
//!   "scroll": { "x": 0, "y": 0 },
//!   "root": { "tag": "html", "children": [
//!     { "tag": "body", "rect": { "x": 0, "y": 0, "width": 1280, "height": 720 },
//!       "children": [
//!         { "tag": "div", "attributes": { "id": "x", "class": "a b" },
//!           "rect": { "x": 10, "y": 40, "width": 200, "height": 30 },
//!           "children": [ { "text": "hello" } ] }
//!       ] }
//!   ] }
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::dom::{MemoryDocument, NodeId, Point, Rect, Viewport};

/// A whole page: viewport, scroll offset and the `<html>` tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageFixture {
    #[serde(default)]
    pub viewport: Viewport,
    #[serde(default)]
    pub scroll: Point,
    pub root: FixtureNode,
}

/// One node of a fixture tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FixtureNode {
    Element(FixtureElement),
    Text { text: String },
    Comment { comment: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureElement {
    pub tag: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rect: Option<Rect>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FixtureNode>,
}

impl PageFixture {
    /// Parse a fixture from JSON text.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Build the document. A root that is not `<html>` is wrapped in
    /// `<html><body>...</body></html>` so the page always has a body.
    #[must_use]
    pub fn build(&self) -> MemoryDocument {
        let mut doc = MemoryDocument::new(self.viewport);
        doc.set_scroll(self.scroll.x, self.scroll.y);
        let document = doc.document_node();

        match &self.root {
            FixtureNode::Element(root) if root.tag.eq_ignore_ascii_case("html") => {
                insert(&mut doc, document, &self.root);
            }
            other => {
                let html = doc.push_element(document, "html", Vec::new());
                let body = doc.push_element(html, "body", Vec::new());
                let full = Rect::new(0.0, 0.0, self.viewport.width, self.viewport.height);
                doc.set_rect(html, full);
                doc.set_rect(body, full);
                insert(&mut doc, body, other);
            }
        }
        doc
    }
}

fn insert(doc: &mut MemoryDocument, parent: NodeId, node: &FixtureNode) {
    // Parents are always elements or the document node here, so appends cannot fail.
    match node {
        FixtureNode::Element(element) => {
            let attributes = element
                .attributes
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            let id = doc.push_element(parent, &element.tag, attributes);
            if let Some(rect) = element.rect {
                doc.set_rect(id, rect);
            }
            for child in &element.children {
                insert(doc, id, child);
            }
        }
        FixtureNode::Text { text } => {
            let _ = doc.append_text(parent, text);
        }
        FixtureNode::Comment { comment } => {
            let _ = doc.append_comment(parent, comment);
        }
    }
}
