//! Arena-backed in-memory document.
//!
//! Nodes live in a `Vec` and are addressed by [`NodeId`]. Removing a node only
//! detaches it, so handles held elsewhere (e.g. by a snapshot in flight) stay
//! valid. Layout is supplied, not computed: each element may carry a page
//! rectangle, and elements without one take the union of their children.

use crate::dom::style::{self, px};
use crate::dom::{
    Document, DomError, Listener, ListenerId, ListenerKind, NewElement, NodeId, NodeKind, Point,
    Rect, Viewport,
};

/// The document node is always the first arena slot.
const DOCUMENT: NodeId = NodeId(0);

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    /// Lower-cased tag for elements, empty otherwise.
    tag: String,
    attributes: Vec<(String, String)>,
    /// Character data for text and comment nodes.
    data: String,
    /// Page-relative layout box.
    rect: Option<Rect>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            tag: String::new(),
            attributes: Vec::new(),
            data: String::new(),
            rect: None,
            parent: None,
            children: Vec::new(),
        }
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// In-memory document with scroll offset, viewport and listener registry.
#[derive(Debug, Clone)]
pub struct MemoryDocument {
    nodes: Vec<NodeData>,
    viewport: Viewport,
    scroll: Point,
    listeners: Vec<Listener>,
    next_listener: u64,
}

impl MemoryDocument {
    /// An empty document (document node only).
    #[must_use]
    pub fn new(viewport: Viewport) -> Self {
        Self {
            nodes: vec![NodeData::new(NodeKind::Document)],
            viewport,
            scroll: Point::default(),
            listeners: Vec::new(),
            next_listener: 1,
        }
    }

    /// `<html><head></head><body></body></html>` with body filling the viewport.
    #[must_use]
    pub fn blank(viewport: Viewport) -> Self {
        let mut doc = Self::new(viewport);
        let full = Rect::new(0.0, 0.0, viewport.width, viewport.height);
        let html = doc.push_element(DOCUMENT, "html", Vec::new());
        doc.push_element(html, "head", Vec::new());
        let body = doc.push_element(html, "body", Vec::new());
        doc.nodes[html.0].rect = Some(full);
        doc.nodes[body.0].rect = Some(full);
        doc
    }

    /// The document node itself.
    pub fn document_node(&self) -> NodeId {
        DOCUMENT
    }

    pub fn scroll(&self) -> Point {
        self.scroll
    }

    pub fn set_scroll(&mut self, x: f64, y: f64) {
        self.scroll = Point::new(x, y);
    }

    /// Set an element's page-relative layout box.
    pub fn set_rect(&mut self, node: NodeId, rect: Rect) {
        if let Some(data) = self.nodes.get_mut(node.0) {
            data.rect = Some(rect);
        }
    }

    /// Append a text node.
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> Result<NodeId, DomError> {
        self.check_container(parent)?;
        let mut data = NodeData::new(NodeKind::Text);
        data.data = text.to_string();
        Ok(self.push(parent, data))
    }

    /// Append a comment node.
    pub fn append_comment(&mut self, parent: NodeId, text: &str) -> Result<NodeId, DomError> {
        self.check_container(parent)?;
        let mut data = NodeData::new(NodeKind::Comment);
        data.data = text.to_string();
        Ok(self.push(parent, data))
    }

    /// Whether the node is reachable from the document node.
    pub fn is_connected(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == DOCUMENT {
                return true;
            }
            current = self.nodes.get(n.0).and_then(|d| d.parent);
        }
        false
    }

    pub(crate) fn push_element(
        &mut self,
        parent: NodeId,
        tag: &str,
        attributes: Vec<(String, String)>,
    ) -> NodeId {
        let mut data = NodeData::new(NodeKind::Element);
        data.tag = tag.to_ascii_lowercase();
        data.attributes = attributes
            .into_iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value))
            .collect();
        self.push(parent, data)
    }

    fn push(&mut self, parent: NodeId, mut data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        data.parent = Some(parent);
        self.nodes.push(data);
        self.nodes[parent.0].children.push(id);
        id
    }

    fn node(&self, node: NodeId) -> Result<&NodeData, DomError> {
        self.nodes.get(node.0).ok_or(DomError::UnknownNode(node))
    }

    fn element(&self, node: NodeId) -> Result<&NodeData, DomError> {
        let data = self.node(node)?;
        if data.kind != NodeKind::Element {
            return Err(DomError::NotAnElement(node));
        }
        Ok(data)
    }

    fn check_container(&self, parent: NodeId) -> Result<(), DomError> {
        match self.node(parent)?.kind {
            NodeKind::Document | NodeKind::Element => Ok(()),
            _ => Err(DomError::NotAnElement(parent)),
        }
    }

    fn find_child(&self, parent: NodeId, tag: &str) -> Option<NodeId> {
        self.nodes[parent.0]
            .children
            .iter()
            .copied()
            .find(|c| self.nodes[c.0].kind == NodeKind::Element && self.nodes[c.0].tag == tag)
    }

    /// Resolve a (lower-cased) property through inline style, inheritance and
    /// initial values. Unknown properties resolve to an empty string.
    fn resolve_style(&self, node: NodeId, property: &str) -> String {
        let data = &self.nodes[node.0];
        if let Some(value) = data
            .attr("style")
            .and_then(|decls| style::declared(decls, property))
        {
            return value;
        }
        if style::is_inherited(property) {
            if let Some(parent) = data
                .parent
                .filter(|p| self.nodes[p.0].kind == NodeKind::Element)
            {
                return self.resolve_style(parent, property);
            }
        }
        match property {
            "display" => style::default_display(&data.tag).to_string(),
            "width" => px(self.layout_rect(node).width),
            "height" => px(self.layout_rect(node).height),
            _ => style::initial_value(property).unwrap_or("").to_string(),
        }
    }

    /// Page-relative box: explicit rect, else the union of child boxes.
    fn layout_rect(&self, node: NodeId) -> Rect {
        let data = &self.nodes[node.0];
        if let Some(rect) = data.rect {
            return rect;
        }
        data.children
            .iter()
            .filter(|c| self.nodes[c.0].kind == NodeKind::Element)
            .map(|c| self.layout_rect(*c))
            .filter(|r| r.width > 0.0 || r.height > 0.0)
            .reduce(|acc, r| acc.union(&r))
            .unwrap_or_default()
    }

    /// Fixed-position boxes are described by their inline offsets, already in
    /// viewport coordinates.
    fn fixed_rect(&self, node: NodeId) -> Option<Rect> {
        if self.nodes[node.0].rect.is_some() || self.resolve_style(node, "position") != "fixed" {
            return None;
        }
        let get = |prop: &str| style::parse_px(&self.resolve_style(node, prop)).unwrap_or(0.0);
        Some(Rect::new(get("left"), get("top"), get("width"), get("height")))
    }

    fn viewport_rect(&self, node: NodeId) -> Rect {
        self.fixed_rect(node)
            .unwrap_or_else(|| self.layout_rect(node).translate(-self.scroll.x, -self.scroll.y))
    }

    fn collect_elements(&self, node: NodeId, out: &mut Vec<NodeId>) {
        for &child in &self.nodes[node.0].children {
            if self.nodes[child.0].kind == NodeKind::Element {
                out.push(child);
                self.collect_elements(child, out);
            }
        }
    }

    fn hit_test(&self, node: NodeId, point: Point, hit: &mut Option<NodeId>) {
        for &child in &self.nodes[node.0].children {
            if self.nodes[child.0].kind != NodeKind::Element {
                continue;
            }
            if self.resolve_style(child, "display") == "none" {
                continue;
            }
            let targetable = self.resolve_style(child, "pointer-events") != "none"
                && self.resolve_style(child, "visibility") != "hidden";
            if targetable && self.viewport_rect(child).contains(point) {
                *hit = Some(child);
            }
            self.hit_test(child, point, hit);
        }
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        // Hidden elements keep their layout breaks but contribute no text.
        let visible = self.resolve_style(node, "visibility") != "hidden";
        for &child in &self.nodes[node.0].children {
            let data = &self.nodes[child.0];
            match data.kind {
                NodeKind::Text if !visible => {}
                // Source newlines are plain whitespace; only blocks and <br> break lines.
                NodeKind::Text => out.push_str(&data.data.replace(['\n', '\r', '\t'], " ")),
                NodeKind::Element => {
                    if data.tag == "br" {
                        out.push('\n');
                        continue;
                    }
                    let display = self.resolve_style(child, "display");
                    if display == "none" {
                        continue;
                    }
                    let block = display != "inline" && display != "inline-block";
                    if block {
                        out.push('\n');
                    }
                    self.collect_text(child, out);
                    if block {
                        out.push('\n');
                    }
                }
                NodeKind::Comment | NodeKind::Document => {}
            }
        }
    }

    fn serialize_children(&self, node: NodeId, out: &mut String) {
        let raw_text = matches!(self.nodes[node.0].tag.as_str(), "script" | "style");
        for &child in &self.nodes[node.0].children {
            let data = &self.nodes[child.0];
            match data.kind {
                NodeKind::Text if raw_text => out.push_str(&data.data),
                NodeKind::Text => out.push_str(&escape_text(&data.data)),
                NodeKind::Comment => {
                    out.push_str("<!--");
                    out.push_str(&data.data);
                    out.push_str("-->");
                }
                NodeKind::Element => {
                    out.push('<');
                    out.push_str(&data.tag);
                    for (name, value) in &data.attributes {
                        out.push(' ');
                        out.push_str(name);
                        out.push_str("=\"");
                        out.push_str(&escape_attribute(value));
                        out.push('"');
                    }
                    out.push('>');
                    if style::is_void(&data.tag) {
                        continue;
                    }
                    self.serialize_children(child, out);
                    out.push_str("</");
                    out.push_str(&data.tag);
                    out.push('>');
                }
                NodeKind::Document => {}
            }
        }
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attribute(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

/// Collapse whitespace within lines and drop blank lines.
fn normalize_rendered_text(raw: &str) -> String {
    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

impl Document for MemoryDocument {
    fn document_element(&self) -> Option<NodeId> {
        self.find_child(DOCUMENT, "html")
    }

    fn root_container(&self) -> Option<NodeId> {
        let html = self.document_element()?;
        self.find_child(html, "body")
    }

    fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.nodes.get(node.0).map(|d| d.kind)
    }

    fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.nodes
            .get(node.0)
            .filter(|d| d.kind == NodeKind::Element)
            .map(|d| d.tag.as_str())
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0).and_then(|d| d.parent)
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(node.0)
            .map(|d| d.children.clone())
            .unwrap_or_default()
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.nodes.get(node.0).and_then(|d| d.attr(name))
    }

    fn attributes(&self, node: NodeId) -> Vec<(String, String)> {
        self.nodes
            .get(node.0)
            .map(|d| d.attributes.clone())
            .unwrap_or_default()
    }

    fn elements(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_elements(DOCUMENT, &mut out);
        out
    }

    fn element_from_point(&self, point: Point) -> Option<NodeId> {
        let mut hit = None;
        self.hit_test(DOCUMENT, point, &mut hit);
        hit
    }

    fn inner_text(&self, node: NodeId) -> Result<String, DomError> {
        self.element(node)?;
        let mut raw = String::new();
        self.collect_text(node, &mut raw);
        Ok(normalize_rendered_text(&raw))
    }

    fn inner_html(&self, node: NodeId) -> Result<String, DomError> {
        self.element(node)?;
        let mut out = String::new();
        self.serialize_children(node, &mut out);
        Ok(out)
    }

    fn computed_style(&self, node: NodeId, property: &str) -> Result<String, DomError> {
        self.element(node)?;
        if !self.is_connected(node) {
            return Err(DomError::Detached(node));
        }
        Ok(self.resolve_style(node, &property.to_ascii_lowercase()))
    }

    fn bounding_rect(&self, node: NodeId) -> Result<Rect, DomError> {
        self.element(node)?;
        if !self.is_connected(node) {
            return Err(DomError::Detached(node));
        }
        Ok(self.viewport_rect(node))
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        self.element(node)?;
        let name = name.to_ascii_lowercase();
        let attributes = &mut self.nodes[node.0].attributes;
        match attributes.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => attributes.push((name, value.to_string())),
        }
        Ok(())
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<(), DomError> {
        self.element(node)?;
        let name = name.to_ascii_lowercase();
        self.nodes[node.0].attributes.retain(|(n, _)| *n != name);
        Ok(())
    }

    fn append_element(&mut self, parent: NodeId, element: NewElement) -> Result<NodeId, DomError> {
        self.check_container(parent)?;
        let node = self.push_element(parent, &element.tag, element.attributes);
        if let Some(text) = element.text {
            self.append_text(node, &text)?;
        }
        Ok(node)
    }

    fn remove_node(&mut self, node: NodeId) -> Result<(), DomError> {
        let parent = self.node(node)?.parent.ok_or(DomError::Detached(node))?;
        self.nodes[parent.0].children.retain(|c| *c != node);
        self.nodes[node.0].parent = None;
        Ok(())
    }

    fn add_listener(&mut self, kind: ListenerKind, owner: &str) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push(Listener {
            id,
            kind,
            capture: true,
            owner: owner.to_string(),
        });
        id
    }

    fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.id != id);
        self.listeners.len() != before
    }

    fn listeners(&self) -> Vec<Listener> {
        self.listeners.clone()
    }
}
