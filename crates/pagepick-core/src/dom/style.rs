//! Inline style parsing and the small cascade used by [`MemoryDocument`].
//!
//! This is not a CSS engine. It resolves a property from the element's inline
//! `style` attribute, then from the parent for inherited properties, then from
//! a table of initial values.
//!
//! [`MemoryDocument`]: crate::dom::MemoryDocument

/// Properties whose value flows from parent to child when not set.
const INHERITED: &[&str] = &[
    "color",
    "cursor",
    "font-family",
    "font-size",
    "font-weight",
    "line-height",
    "pointer-events",
    "visibility",
];

/// Tags rendered inline by default.
const INLINE_TAGS: &[&str] = &[
    "a", "abbr", "b", "button", "code", "em", "i", "img", "input", "kbd", "label", "select",
    "small", "span", "strong", "sub", "sup", "textarea",
];

/// Tags that never render.
const HIDDEN_TAGS: &[&str] = &[
    "head", "link", "meta", "noscript", "script", "style", "template", "title",
];

/// Void elements have no closing tag and no children.
pub const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

pub fn is_inherited(property: &str) -> bool {
    INHERITED.contains(&property)
}

pub fn is_void(tag: &str) -> bool {
    VOID_TAGS.contains(&tag)
}

/// Default `display` for a tag.
pub fn default_display(tag: &str) -> &'static str {
    if HIDDEN_TAGS.contains(&tag) {
        "none"
    } else if INLINE_TAGS.contains(&tag) {
        "inline"
    } else if tag == "li" {
        "list-item"
    } else {
        "block"
    }
}

/// Initial value of a property, as a browser would report it.
///
/// Returns `None` for properties the table does not know.
pub fn initial_value(property: &str) -> Option<&'static str> {
    let value = match property {
        "color" => "rgb(0, 0, 0)",
        "background" => "rgba(0, 0, 0, 0) none repeat scroll 0% 0% / auto padding-box border-box",
        "background-color" => "rgba(0, 0, 0, 0)",
        "font-size" => "16px",
        "font-weight" => "400",
        "font-family" => "serif",
        "line-height" => "normal",
        "position" => "static",
        "visibility" => "visible",
        "opacity" => "1",
        "margin" => "0px",
        "padding" => "0px",
        "border" => "0px none rgb(0, 0, 0)",
        "cursor" => "auto",
        "pointer-events" => "auto",
        "z-index" => "auto",
        "top" | "left" | "right" | "bottom" => "auto",
        _ => return None,
    };
    Some(value)
}

/// Format a pixel length the way computed styles print it (`12px`, `12.5px`).
pub fn px(value: f64) -> String {
    format!("{}px", value)
}

/// Parse a `12px` length. Bare numbers are accepted as pixels.
pub fn parse_px(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    trimmed
        .strip_suffix("px")
        .unwrap_or(trimmed)
        .trim()
        .parse()
        .ok()
}

/// Split an inline `style` attribute into `(property, value)` declarations.
///
/// Property names are lower-cased. Later declarations win on lookup via
/// [`declared`].
pub fn parse_declarations(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|decl| {
            let (name, value) = decl.split_once(':')?;
            let name = name.trim().to_ascii_lowercase();
            let value = value.trim();
            if name.is_empty() || value.is_empty() {
                return None;
            }
            Some((name, value.to_string()))
        })
        .collect()
}

/// Last declared value of `property` in an inline style attribute.
pub fn declared(style: &str, property: &str) -> Option<String> {
    parse_declarations(style)
        .into_iter()
        .rev()
        .find(|(name, _)| name == property)
        .map(|(_, value)| value)
}

/// Serialize declarations back into a `style` attribute value.
pub fn serialize_declarations(declarations: &[(String, String)]) -> String {
    declarations
        .iter()
        .map(|(name, value)| format!("{}: {};", name, value))
        .collect::<Vec<_>>()
        .join(" ")
}
