//! Deterministic XPath-style locators.
//!
//! A locator describes where an element sits so it can be found again later,
//! on a best-effort basis (the page may have changed by then).
//!
//! # Generation
//!
//! 1. An element with a non-empty `id` that is unique in the document gets
//!    the one-step form `//*[@id="main"]`, whatever its depth.
//! 2. Otherwise the generator walks up to `<body>`, emitting `tag[n]` at each
//!    step, where `n` is the 1-based position among preceding siblings of the
//!    same tag. `n` is always written, even for an only child.
//! 3. `<body>` contributes the fixed prefix `/html/body`. Elements outside the
//!    body (e.g. in `<head>`) are anchored at the document instead, as
//!    `/html[1]/head[1]/...`.
//!
//! | Element | Locator |
//! |---------|---------|
//! | `<div id="x">` | `//*[@id="x"]` |
//! | `<body>` | `/html/body` |
//! | second `<div>` in body, first `<p>` in it | `/html/body/div[2]/p[1]` |

use crate::dom::{Document, NodeId, NodeKind};
use crate::error::PickError;

/// Fixed path of the root content container.
pub const ROOT_CONTAINER_PATH: &str = "/html/body";

/// Compute the locator for an element.
///
/// Returns `None` for non-elements and for elements not connected to the
/// document.
pub fn locate<D: Document + ?Sized>(doc: &D, node: NodeId) -> Option<String> {
    doc.tag_name(node)?;

    if let Some(anchored) = id_anchor(doc, node) {
        return Some(anchored);
    }
    structural_path(doc, node)
}

/// The positional form of a locator, ignoring ids.
pub fn structural_path<D: Document + ?Sized>(doc: &D, node: NodeId) -> Option<String> {
    doc.tag_name(node)?;
    let root = doc.root_container();
    let mut segments = Vec::new();
    let mut current = node;

    let prefix = loop {
        if Some(current) == root {
            break ROOT_CONTAINER_PATH;
        }
        match doc.kind(current)? {
            NodeKind::Document => break "",
            NodeKind::Element => {
                let tag = doc.tag_name(current)?;
                segments.push(format!("{}[{}]", tag, ordinal(doc, current)));
                current = doc.parent(current)?;
            }
            NodeKind::Text | NodeKind::Comment => return None,
        }
    };

    if segments.is_empty() {
        return Some(prefix.to_string());
    }
    segments.reverse();
    Some(format!("{}/{}", prefix, segments.join("/")))
}

/// One-step locator for an element with a unique, quotable id.
fn id_anchor<D: Document + ?Sized>(doc: &D, node: NodeId) -> Option<String> {
    let id = doc.attribute(node, "id").filter(|id| !id.is_empty())?;
    if doc.count_with_id(id) != 1 {
        return None;
    }
    if !id.contains('"') {
        Some(format!("//*[@id=\"{}\"]", id))
    } else if !id.contains('\'') {
        Some(format!("//*[@id='{}']", id))
    } else {
        // No XPath 1.0 string literal can hold both quote kinds.
        None
    }
}

/// 1-based position among preceding siblings with the same kind and tag.
pub fn ordinal<D: Document + ?Sized>(doc: &D, node: NodeId) -> usize {
    let Some(parent) = doc.parent(node) else {
        return 1;
    };
    let kind = doc.kind(node);
    let tag = doc.tag_name(node);
    let preceding = doc
        .children(parent)
        .into_iter()
        .take_while(|&sibling| sibling != node)
        .filter(|&sibling| doc.kind(sibling) == kind && doc.tag_name(sibling) == tag)
        .count();
    preceding + 1
}

/// Find the element a locator points at.
///
/// Understands exactly the forms [`locate`] produces. Returns `Ok(None)` when
/// the locator is well-formed but nothing matches any more.
pub fn resolve<D: Document + ?Sized>(doc: &D, locator: &str) -> Result<Option<NodeId>, PickError> {
    let locator = locator.trim();

    if let Some(rest) = locator.strip_prefix("//*[@id=") {
        let id = parse_quoted_id(rest).ok_or_else(|| PickError::invalid_locator(locator))?;
        return Ok(doc.element_by_id(id));
    }

    let Some(path) = locator.strip_prefix('/') else {
        return Err(PickError::invalid_locator(locator));
    };
    let steps = path
        .split('/')
        .map(parse_step)
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| PickError::invalid_locator(locator))?;

    let mut steps = steps.into_iter();
    match steps.next() {
        Some(("html", 1)) => {}
        _ => return Err(PickError::invalid_locator(locator)),
    }
    let Some(mut current) = doc.document_element() else {
        return Ok(None);
    };

    for (tag, index) in steps {
        let next = doc
            .children(current)
            .into_iter()
            .filter(|&child| doc.tag_name(child) == Some(tag))
            .nth(index - 1);
        match next {
            Some(child) => current = child,
            None => return Ok(None),
        }
    }
    Ok(Some(current))
}

/// Parse `"id"]` or `'id']`.
fn parse_quoted_id(rest: &str) -> Option<&str> {
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let inner = rest[1..].strip_suffix(']')?.strip_suffix(quote)?;
    if inner.contains(quote) {
        return None;
    }
    Some(inner)
}

/// Parse `tag` or `tag[n]` with `n >= 1`.
fn parse_step(step: &str) -> Option<(&str, usize)> {
    let (tag, index) = match step.split_once('[') {
        Some((tag, rest)) => (tag, rest.strip_suffix(']')?.parse::<usize>().ok()?),
        None => (step, 1),
    };
    let valid_tag = !tag.is_empty()
        && tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    (valid_tag && index >= 1).then_some((tag, index))
}
