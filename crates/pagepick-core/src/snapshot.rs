//! Element snapshot capture.
//!
//! An [`ElementSnapshot`] is built in one synchronous pass over a single node
//! and owns all of its data. It holds no handle into the document, so it stays
//! valid after the source node is changed or removed.
//!
//! # Degraded reads
//!
//! Layout-dependent reads can fail on a node that is detached or foreign to
//! the document. Such failures omit the affected field instead of failing the
//! snapshot:
//!
//! | Read fails | Effect |
//! |------------|--------|
//! | one computed style | property missing from `computedStyles` |
//! | bounding rect | `dimensions` omitted |
//! | locator | `xpath` omitted |
//!
//! Field names on the wire follow the chat widget's `dom_context` format
//! (`innerText`, `innerHTML`, `tagName`, `xpath`, ...).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::dom::{Document, NodeId, Rect};
use crate::error::PickError;
use crate::locator;

/// Style properties captured in every snapshot.
pub const STYLE_ALLOW_LIST: &[&str] = &[
    "color",
    "background",
    "font-size",
    "font-weight",
    "display",
    "position",
    "visibility",
    "opacity",
    "margin",
    "padding",
    "border",
    "width",
    "height",
];

/// Viewport-relative geometry at capture time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
    pub top: f64,
    pub left: f64,
}

impl From<Rect> for Dimensions {
    fn from(rect: Rect) -> Self {
        Self {
            width: rect.width,
            height: rect.height,
            top: rect.top(),
            left: rect.left(),
        }
    }
}

/// Structured record of one picked element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementSnapshot {
    /// Rendered text of the element.
    #[serde(rename = "innerText")]
    pub text: String,

    /// Serialized markup of the element's children.
    #[serde(rename = "innerHTML")]
    pub markup: String,

    /// Lower-cased tag name.
    #[serde(rename = "tagName")]
    pub tag_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(
        rename = "className",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub class_name: Option<String>,

    /// Every attribute present on the element.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,

    /// Resolved values for [`STYLE_ALLOW_LIST`].
    #[serde(rename = "computedStyles", default)]
    pub computed_styles: BTreeMap<String, String>,

    /// Locator produced by [`locator::locate`].
    #[serde(rename = "xpath", default, skip_serializing_if = "Option::is_none")]
    pub locator: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
}

impl ElementSnapshot {
    /// First class token, if any.
    pub fn first_class(&self) -> Option<&str> {
        self.class_name
            .as_deref()
            .and_then(|c| c.split_whitespace().next())
    }
}

/// Capture a snapshot of an element.
///
/// Fails only when `node` is unknown or not an element; every other read
/// degrades as described in the module docs.
pub fn extract<D: Document + ?Sized>(doc: &D, node: NodeId) -> Result<ElementSnapshot, PickError> {
    if doc.kind(node).is_none() {
        return Err(PickError::node_not_found(node.to_string()));
    }
    let Some(tag) = doc.tag_name(node) else {
        return Err(PickError::invalid_input(format!(
            "Node {} is not an element",
            node
        )));
    };
    let tag_name = tag.to_string();

    let text = doc.inner_text(node).unwrap_or_else(|e| {
        warn!("Snapshot of {}: innerText unavailable: {}", node, e);
        String::new()
    });
    let markup = doc.inner_html(node).unwrap_or_else(|e| {
        warn!("Snapshot of {}: innerHTML unavailable: {}", node, e);
        String::new()
    });

    let attributes: BTreeMap<String, String> = doc.attributes(node).into_iter().collect();
    let id = attributes.get("id").filter(|v| !v.is_empty()).cloned();
    let class_name = attributes.get("class").filter(|v| !v.is_empty()).cloned();

    let mut computed_styles = BTreeMap::new();
    let mut style_failures = 0usize;
    for property in STYLE_ALLOW_LIST {
        match doc.computed_style(node, property) {
            Ok(value) => {
                computed_styles.insert((*property).to_string(), value);
            }
            Err(e) => {
                debug!("Snapshot of {}: style '{}' unavailable: {}", node, property, e);
                style_failures += 1;
            }
        }
    }
    if style_failures > 0 {
        warn!(
            "Snapshot of {}: omitted {} of {} computed styles",
            node,
            style_failures,
            STYLE_ALLOW_LIST.len()
        );
    }

    let locator = locator::locate(doc, node);
    if locator.is_none() {
        warn!("Snapshot of {}: no locator (node not connected)", node);
    }

    let dimensions = match doc.bounding_rect(node) {
        Ok(rect) => Some(Dimensions::from(rect)),
        Err(e) => {
            warn!("Snapshot of {}: dimensions omitted: {}", node, e);
            None
        }
    };

    Ok(ElementSnapshot {
        text,
        markup,
        tag_name,
        id,
        class_name,
        attributes,
        computed_styles,
        locator,
        dimensions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::test_support::{blank_page, el};
    use crate::dom::Rect;
    use crate::error::ErrorCode;

    #[test]
    fn captures_identified_div() {
        let (mut doc, body) = blank_page();
        let div = el(
            &mut doc,
            body,
            "div",
            &[("id", "x"), ("class", "a b")],
            Some(Rect::new(10.0, 40.0, 200.0, 30.0)),
        );
        doc.append_text(div, "hello").unwrap();

        let snap = extract(&doc, div).unwrap();

        assert_eq!(snap.tag_name, "div");
        assert_eq!(snap.id.as_deref(), Some("x"));
        assert!(snap.class_name.as_deref().unwrap().contains("a b"));
        assert_eq!(snap.text, "hello");
        assert_eq!(snap.markup, "hello");
        assert_eq!(snap.locator.as_deref(), Some(r#"//*[@id="x"]"#));
        assert_eq!(snap.attributes["class"], "a b");
        assert_eq!(snap.attributes["id"], "x");
        assert_eq!(
            snap.dimensions,
            Some(Dimensions {
                width: 200.0,
                height: 30.0,
                top: 40.0,
                left: 10.0
            })
        );
        assert_eq!(snap.first_class(), Some("a"));
    }

    #[test]
    fn captures_full_style_allow_list() {
        let (mut doc, body) = blank_page();
        let div = el(&mut doc, body, "div", &[("style", "color: red")], None);

        let snap = extract(&doc, div).unwrap();

        assert_eq!(snap.computed_styles.len(), STYLE_ALLOW_LIST.len());
        assert_eq!(snap.computed_styles["color"], "red");
        assert_eq!(snap.computed_styles["display"], "block");
        assert_eq!(snap.computed_styles["opacity"], "1");
    }

    #[test]
    fn absent_id_and_class_are_omitted() {
        let (mut doc, body) = blank_page();
        let span = el(&mut doc, body, "span", &[("class", "")], None);

        let snap = extract(&doc, span).unwrap();
        assert_eq!(snap.id, None);
        assert_eq!(snap.class_name, None);
        assert_eq!(snap.first_class(), None);
        assert_eq!(snap.attributes.get("class").map(String::as_str), Some(""));
    }

    #[test]
    fn detached_node_degrades_instead_of_failing() {
        let (mut doc, body) = blank_page();
        let div = el(&mut doc, body, "div", &[], Some(Rect::new(0.0, 0.0, 5.0, 5.0)));
        doc.append_text(div, "gone soon").unwrap();
        doc.remove_node(div).unwrap();

        let snap = extract(&doc, div).unwrap();
        assert_eq!(snap.text, "gone soon");
        assert!(snap.computed_styles.is_empty());
        assert_eq!(snap.dimensions, None);
        assert_eq!(snap.locator, None);
    }

    #[test]
    fn snapshot_outlives_source_mutation() {
        let (mut doc, body) = blank_page();
        let div = el(&mut doc, body, "div", &[("title", "before")], None);
        let snap = extract(&doc, div).unwrap();

        doc.set_attribute(div, "title", "after").unwrap();
        doc.remove_node(div).unwrap();

        assert_eq!(snap.attributes["title"], "before");
        assert_eq!(snap.locator.as_deref(), Some("/html/body/div[1]"));
    }

    #[test]
    fn rejects_non_elements() {
        let (mut doc, body) = blank_page();
        let text = doc.append_text(body, "t").unwrap();
        assert_eq!(extract(&doc, text).unwrap_err().code, ErrorCode::InvalidInput);
        assert_eq!(
            extract(&doc, NodeId(9999)).unwrap_err().code,
            ErrorCode::NodeNotFound
        );
    }

    #[test]
    fn serializes_with_widget_field_names() {
        let (mut doc, body) = blank_page();
        let div = el(&mut doc, body, "div", &[("id", "x")], None);
        let json = serde_json::to_value(extract(&doc, div).unwrap()).unwrap();

        for key in [
            "innerText",
            "innerHTML",
            "tagName",
            "id",
            "attributes",
            "computedStyles",
            "xpath",
            "dimensions",
        ] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
        assert!(json.get("className").is_none());
    }
}
