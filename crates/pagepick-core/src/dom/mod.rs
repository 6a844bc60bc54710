//! Document abstraction the picker works against.
//!
//! The picker never talks to a concrete browser. Everything it needs from a
//! page goes through the [`Document`] trait: tree navigation, the reads that
//! feed a snapshot, hit testing, and a small set of reversible writes
//! (overlay nodes, class tokens, one inline style, listener registration).
//!
//! [`MemoryDocument`] is an arena-backed implementation loaded from a JSON
//! [`PageFixture`]. It is what the CLI and the tests drive.

pub mod fixture;
pub mod memory;
pub mod style;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use fixture::{FixtureElement, FixtureNode, PageFixture};
pub use memory::MemoryDocument;

/// Handle to a node inside one document.
///
/// Handles stay valid after a node is removed; reads on a removed node report
/// [`DomError::Detached`] where the read needs layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of a document node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Document,
    Element,
    Text,
    Comment,
}

/// A point in viewport coordinates (CSS pixels).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle (CSS pixels).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn top(&self) -> f64 {
        self.y
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Half-open containment: the right and bottom edges are outside.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left()
            && point.x < self.right()
            && point.y >= self.top()
            && point.y < self.bottom()
    }

    /// Smallest rectangle covering both.
    #[must_use]
    pub fn union(&self, other: &Rect) -> Rect {
        let left = self.left().min(other.left());
        let top = self.top().min(other.top());
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect::new(left, top, right - left, bottom - top)
    }

    #[must_use]
    pub fn translate(&self, dx: f64, dy: f64) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.width, self.height)
    }
}

/// Visible area of the page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
        }
    }
}

/// Pointer listeners a picker can register on the document root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenerKind {
    PointerMove,
    Click,
}

/// Registration handle returned by [`Document::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// A listener currently attached at the document root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listener {
    pub id: ListenerId,
    pub kind: ListenerKind,
    /// Capturing listeners see events before any page handler.
    pub capture: bool,
    pub owner: String,
}

/// An element to be created by [`Document::append_element`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewElement {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub text: Option<String>,
}

impl NewElement {
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

/// Failures of document reads and writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    /// The handle does not belong to this document.
    UnknownNode(NodeId),
    /// The node is no longer connected to the document.
    Detached(NodeId),
    /// The operation needs an element.
    NotAnElement(NodeId),
}

impl fmt::Display for DomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomError::UnknownNode(id) => write!(f, "unknown node {}", id),
            DomError::Detached(id) => write!(f, "node {} is detached from the document", id),
            DomError::NotAnElement(id) => write!(f, "node {} is not an element", id),
        }
    }
}

impl std::error::Error for DomError {}

/// Uniform access to a live (or simulated) document.
///
/// Read methods never mutate. Write methods exist only for the picker's own,
/// fully reversible artifacts.
pub trait Document {
    /// The `<html>` element, if present.
    fn document_element(&self) -> Option<NodeId>;

    /// The root content container (`<body>`).
    fn root_container(&self) -> Option<NodeId>;

    fn kind(&self, node: NodeId) -> Option<NodeKind>;

    /// Lower-cased tag name for elements, `None` for other nodes.
    fn tag_name(&self, node: NodeId) -> Option<&str>;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    fn children(&self, node: NodeId) -> Vec<NodeId>;

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str>;

    /// All attributes present on the node, in source order.
    fn attributes(&self, node: NodeId) -> Vec<(String, String)>;

    /// Every connected element in document order.
    fn elements(&self) -> Vec<NodeId>;

    /// Topmost element under a viewport point, ignoring anything whose
    /// `pointer-events` is `none`.
    fn element_from_point(&self, point: Point) -> Option<NodeId>;

    /// Rendered text of the node (innerText semantics).
    fn inner_text(&self, node: NodeId) -> Result<String, DomError>;

    /// Serialized markup of the node's children.
    fn inner_html(&self, node: NodeId) -> Result<String, DomError>;

    /// Resolved value of one style property.
    fn computed_style(&self, node: NodeId, property: &str) -> Result<String, DomError>;

    /// Viewport-relative border box.
    fn bounding_rect(&self, node: NodeId) -> Result<Rect, DomError>;

    fn viewport(&self) -> Viewport;

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), DomError>;

    fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<(), DomError>;

    /// Create an element and append it as the last child of `parent`.
    fn append_element(&mut self, parent: NodeId, element: NewElement) -> Result<NodeId, DomError>;

    /// Detach a node (and its subtree) from its parent.
    fn remove_node(&mut self, node: NodeId) -> Result<(), DomError>;

    /// Register a capturing listener at the document root.
    fn add_listener(&mut self, kind: ListenerKind, owner: &str) -> ListenerId;

    /// Returns false if the listener was not attached.
    fn remove_listener(&mut self, id: ListenerId) -> bool;

    fn listeners(&self) -> Vec<Listener>;

    // ------------------------------------------------------------------
    // Provided helpers
    // ------------------------------------------------------------------

    fn is_element(&self, node: NodeId) -> bool {
        self.kind(node) == Some(NodeKind::Element)
    }

    /// Whether `node` is `ancestor` or sits somewhere below it.
    fn is_inclusive_descendant(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    /// First connected element whose `id` attribute equals `id`.
    fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.elements()
            .into_iter()
            .find(|&n| self.attribute(n, "id") == Some(id))
    }

    /// Number of connected elements carrying this `id`.
    fn count_with_id(&self, id: &str) -> usize {
        self.elements()
            .into_iter()
            .filter(|&n| self.attribute(n, "id") == Some(id))
            .count()
    }

    /// Connected elements carrying the named attribute.
    fn nodes_with_attribute(&self, name: &str) -> Vec<NodeId> {
        self.elements()
            .into_iter()
            .filter(|&n| self.attribute(n, name).is_some())
            .collect()
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.attribute(node, "class")
            .is_some_and(|value| value.split_whitespace().any(|token| token == class))
    }

    /// Add a class token. Returns false if the token was already present.
    fn add_class(&mut self, node: NodeId, class: &str) -> Result<bool, DomError> {
        if !self.is_element(node) {
            return Err(DomError::NotAnElement(node));
        }
        if self.has_class(node, class) {
            return Ok(false);
        }
        let value = match self.attribute(node, "class") {
            Some(existing) if !existing.trim().is_empty() => {
                format!("{} {}", existing.trim_end(), class)
            }
            _ => class.to_string(),
        };
        self.set_attribute(node, "class", &value)?;
        Ok(true)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Append an element under `parent` with the given attributes and page rect.
    pub fn el(
        doc: &mut MemoryDocument,
        parent: NodeId,
        tag: &str,
        attributes: &[(&str, &str)],
        rect: Option<Rect>,
    ) -> NodeId {
        let mut element = NewElement::new(tag);
        for (name, value) in attributes {
            element = element.with_attribute(*name, *value);
        }
        let node = doc
            .append_element(parent, element)
            .expect("parent must exist");
        if let Some(rect) = rect {
            doc.set_rect(node, rect);
        }
        node
    }

    /// A 1280x720 page with `<html><head></head><body></body></html>`.
    pub fn blank_page() -> (MemoryDocument, NodeId) {
        let doc = MemoryDocument::blank(Viewport::default());
        let body = doc.root_container().expect("blank page has a body");
        (doc, body)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{blank_page, el};
    use super::*;

    #[test]
    fn rect_contains_is_half_open() {
        let rect = Rect::new(10.0, 10.0, 20.0, 5.0);
        assert!(rect.contains(Point::new(10.0, 10.0)));
        assert!(rect.contains(Point::new(29.9, 14.9)));
        assert!(!rect.contains(Point::new(30.0, 12.0)));
        assert!(!rect.contains(Point::new(15.0, 15.0)));
    }

    #[test]
    fn rect_union_covers_both() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 20.0, 10.0, 5.0);
        assert_eq!(a.union(&b), Rect::new(0.0, 0.0, 15.0, 25.0));
    }

    #[test]
    fn add_class_appends_token_once() {
        let (mut doc, body) = blank_page();
        let div = el(&mut doc, body, "div", &[("class", "a b")], None);

        assert!(doc.add_class(div, "picked").unwrap());
        assert!(!doc.add_class(div, "picked").unwrap());
        assert_eq!(doc.attribute(div, "class"), Some("a b picked"));
        assert!(doc.has_class(div, "picked"));
    }

    #[test]
    fn add_class_creates_attribute() {
        let (mut doc, body) = blank_page();
        let span = el(&mut doc, body, "span", &[], None);

        doc.add_class(span, "x").unwrap();
        assert_eq!(doc.attribute(span, "class"), Some("x"));
    }

    #[test]
    fn add_class_rejects_text_nodes() {
        let (mut doc, body) = blank_page();
        let text = doc.append_text(body, "hi").unwrap();
        assert_eq!(doc.add_class(text, "x"), Err(DomError::NotAnElement(text)));
    }

    #[test]
    fn inclusive_descendant_walks_parents() {
        let (mut doc, body) = blank_page();
        let outer = el(&mut doc, body, "div", &[], None);
        let inner = el(&mut doc, outer, "p", &[], None);
        let other = el(&mut doc, body, "p", &[], None);

        assert!(doc.is_inclusive_descendant(inner, outer));
        assert!(doc.is_inclusive_descendant(outer, outer));
        assert!(!doc.is_inclusive_descendant(other, outer));
    }

    #[test]
    fn count_with_id_sees_duplicates() {
        let (mut doc, body) = blank_page();
        el(&mut doc, body, "div", &[("id", "dup")], None);
        el(&mut doc, body, "div", &[("id", "dup")], None);
        el(&mut doc, body, "div", &[("id", "solo")], None);

        assert_eq!(doc.count_with_id("dup"), 2);
        assert_eq!(doc.count_with_id("solo"), 1);
        assert_eq!(doc.count_with_id("missing"), 0);
    }
}
