//! Highlight overlays.
//!
//! Split in two halves:
//!
//! - [`compute_overlay`] is a pure function from an element's viewport box to
//!   an [`OverlaySpec`] (frame geometry plus label text and placement). No
//!   document is needed to test it.
//! - [`OverlayRenderer`] turns a spec into two fixed-position nodes appended
//!   to the body, and removes them again. Both nodes carry the marker
//!   attribute, so [`OverlayRenderer::clear`] finds them by attribute rather
//!   than by handle.
//!
//! Overlay nodes set `pointer-events: none`, so hit testing never lands on
//! them and the picker never highlights its own highlight.
//!
//! # Label placement
//!
//! The label (`tag.firstClass#id`) sits above the frame when the frame's top
//! edge has at least `label_clearance` px of room, otherwise it is pinned
//! inside the frame's top edge. It is clamped horizontally into the viewport.

use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthStr;

use crate::config::PickerConfig;
use crate::dom::style::{px, serialize_declarations};
use crate::dom::{Document, DomError, NewElement, NodeId, Point, Rect, Viewport};

/// Height of the label box.
pub const LABEL_HEIGHT: f64 = 20.0;

/// Approximate advance of one monospace label column.
const LABEL_COLUMN_WIDTH: f64 = 7.0;

/// Horizontal padding inside the label box (both sides).
const LABEL_PADDING: f64 = 8.0;

/// Labels longer than this many columns are truncated with an ellipsis.
const MAX_LABEL_COLUMNS: usize = 48;

/// Above every page element.
const OVERLAY_Z_INDEX: &str = "2147483647";

/// Which highlight is being drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayTone {
    /// Tracking the element under the pointer.
    Hover,
    /// Brief confirmation after a click was accepted.
    Commit,
}

impl OverlayTone {
    fn stroke(self) -> &'static str {
        match self {
            OverlayTone::Hover => "#3b82f6",
            OverlayTone::Commit => "#16a34a",
        }
    }

    fn fill(self) -> &'static str {
        match self {
            OverlayTone::Hover => "rgba(59, 130, 246, 0.15)",
            OverlayTone::Commit => "rgba(22, 163, 74, 0.25)",
        }
    }
}

/// Label text and where it goes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelSpec {
    pub text: String,
    /// Top-left corner in viewport coordinates.
    pub origin: Point,
    pub width: f64,
    /// True when the label is drawn above the frame.
    pub above: bool,
}

/// Everything needed to draw one highlight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlaySpec {
    pub frame: Rect,
    pub label: LabelSpec,
    pub tone: OverlayTone,
}

/// `tag[.firstClass][#id]`
pub fn element_label(tag: &str, class_name: Option<&str>, id: Option<&str>) -> String {
    let mut label = tag.to_string();
    if let Some(class) = class_name.and_then(|c| c.split_whitespace().next()) {
        label.push('.');
        label.push_str(class);
    }
    if let Some(id) = id.filter(|id| !id.is_empty()) {
        label.push('#');
        label.push_str(id);
    }
    label
}

/// Shorten a label to [`MAX_LABEL_COLUMNS`] display columns.
fn truncate_label(label: &str) -> String {
    if label.width() <= MAX_LABEL_COLUMNS {
        return label.to_string();
    }
    let mut out = String::new();
    for ch in label.chars() {
        let mut candidate = out.clone();
        candidate.push(ch);
        if candidate.width() + 1 > MAX_LABEL_COLUMNS {
            break;
        }
        out = candidate;
    }
    out.push('…');
    out
}

/// Compute the highlight for an element box.
pub fn compute_overlay(
    frame: Rect,
    label: &str,
    viewport: Viewport,
    label_clearance: f64,
    tone: OverlayTone,
) -> OverlaySpec {
    let text = truncate_label(label);
    let width = text.width() as f64 * LABEL_COLUMN_WIDTH + LABEL_PADDING;

    let above = frame.top() >= label_clearance.max(LABEL_HEIGHT);
    let top = if above {
        frame.top() - LABEL_HEIGHT
    } else {
        frame.top().max(0.0)
    };
    let max_left = (viewport.width - width).max(0.0);
    let left = frame.left().clamp(0.0, max_left);

    OverlaySpec {
        frame,
        label: LabelSpec {
            text,
            origin: Point::new(left, top),
            width,
            above,
        },
        tone,
    }
}

/// Read an element's label and box from the document and compute its overlay.
pub fn overlay_for<D: Document + ?Sized>(
    doc: &D,
    node: NodeId,
    config: &PickerConfig,
    tone: OverlayTone,
) -> Result<OverlaySpec, DomError> {
    let tag = doc.tag_name(node).ok_or(DomError::NotAnElement(node))?;
    let label = element_label(tag, doc.attribute(node, "class"), doc.attribute(node, "id"));
    let frame = doc.bounding_rect(node)?;
    Ok(compute_overlay(
        frame,
        &label,
        doc.viewport(),
        config.label_clearance,
        tone,
    ))
}

/// Draws and removes overlay nodes tagged with a marker attribute.
#[derive(Debug, Clone)]
pub struct OverlayRenderer {
    marker: String,
}

impl OverlayRenderer {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    /// Replace any current overlay with the one described by `spec`.
    ///
    /// Returns the frame and label nodes.
    pub fn show<D: Document + ?Sized>(
        &self,
        doc: &mut D,
        spec: &OverlaySpec,
    ) -> Result<(NodeId, NodeId), DomError> {
        self.clear(doc);
        let parent = doc
            .root_container()
            .or_else(|| doc.document_element())
            .ok_or(DomError::UnknownNode(NodeId(0)))?;

        let frame = NewElement::new("div")
            .with_attribute(self.marker.clone(), "frame")
            .with_attribute("style", frame_style(spec));
        let label = NewElement::new("div")
            .with_attribute(self.marker.clone(), "label")
            .with_attribute("style", label_style(spec))
            .with_text(spec.label.text.clone());

        let frame = doc.append_element(parent, frame)?;
        let label = doc.append_element(parent, label)?;
        Ok((frame, label))
    }

    /// Remove every node carrying the marker. Safe when there are none.
    ///
    /// Returns how many nodes were removed.
    pub fn clear<D: Document + ?Sized>(&self, doc: &mut D) -> usize {
        let mut removed = 0;
        for node in doc.nodes_with_attribute(&self.marker) {
            if doc.remove_node(node).is_ok() {
                removed += 1;
            }
        }
        removed
    }

    /// Number of overlay nodes currently in the document.
    pub fn count<D: Document + ?Sized>(&self, doc: &D) -> usize {
        doc.nodes_with_attribute(&self.marker).len()
    }
}

fn decl(name: &str, value: impl Into<String>) -> (String, String) {
    (name.to_string(), value.into())
}

fn frame_style(spec: &OverlaySpec) -> String {
    let tone = spec.tone;
    serialize_declarations(&[
        decl("position", "fixed"),
        decl("top", px(spec.frame.top())),
        decl("left", px(spec.frame.left())),
        decl("width", px(spec.frame.width)),
        decl("height", px(spec.frame.height)),
        decl("box-sizing", "border-box"),
        decl("border", format!("2px solid {}", tone.stroke())),
        decl("background", tone.fill()),
        decl("pointer-events", "none"),
        decl("z-index", OVERLAY_Z_INDEX),
    ])
}

fn label_style(spec: &OverlaySpec) -> String {
    let label = &spec.label;
    serialize_declarations(&[
        decl("position", "fixed"),
        decl("top", px(label.origin.y)),
        decl("left", px(label.origin.x)),
        decl("width", px(label.width)),
        decl("height", px(LABEL_HEIGHT)),
        decl("font", format!("12px/{} monospace", px(LABEL_HEIGHT))),
        decl("white-space", "nowrap"),
        decl("color", "#ffffff"),
        decl("background", spec.tone.stroke()),
        decl("pointer-events", "none"),
        decl("z-index", OVERLAY_Z_INDEX),
    ])
}
