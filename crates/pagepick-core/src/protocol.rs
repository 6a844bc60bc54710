//! Chat payload types.
//!
//! The picker's only consumer is a chat collaborator that attaches the
//! snapshot to an outgoing question. This module defines that payload and
//! the element index the assistant side uses to talk about a page. Transport
//! is not handled here.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::dom::{Document, NodeId};
use crate::error::PickError;
use crate::locator;
use crate::snapshot::{ElementSnapshot, STYLE_ALLOW_LIST};

/// Number of rendered-text characters kept in an element descriptor.
const DESCRIPTOR_TEXT_CHARS: usize = 30;

/// Minimum similarity for [`match_elements`] to report a candidate.
const MATCH_THRESHOLD: f64 = 0.2;

/// Who is asking. Selects the assistant's instructions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Developer,
    Tester,
    User,
}

impl Role {
    /// Instruction given to the assistant for this audience.
    pub fn instruction(self) -> &'static str {
        match self {
            Role::Developer => "Explain code, architecture, and impact of changes.",
            Role::Tester => {
                "Explain features, suggest test cases and edge cases. \
                 Use DOM and XPath context if available."
            }
            Role::User => "Explain functionality and navigation in simple language.",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Developer => "developer",
            Role::Tester => "tester",
            Role::User => "user",
        };
        f.write_str(name)
    }
}

impl FromStr for Role {
    type Err = PickError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "developer" => Ok(Role::Developer),
            "tester" => Ok(Role::Tester),
            "user" => Ok(Role::User),
            other => Err(PickError::invalid_input_with_suggestion(
                format!("Unknown role '{}'", other),
                "Use one of: developer, tester, user",
            )),
        }
    }
}

/// A question plus the runtime context it refers to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatQuery {
    pub question: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dom_context: Option<ElementSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl ChatQuery {
    pub fn new(question: impl Into<String>, role: Role) -> Self {
        Self {
            question: question.into(),
            role,
            dom_context: None,
            trace_context: None,
            model: None,
        }
    }

    #[must_use]
    pub fn with_snapshot(mut self, snapshot: ElementSnapshot) -> Self {
        self.dom_context = Some(snapshot);
        self
    }

    #[must_use]
    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.trace_context = Some(trace.into());
        self
    }

    /// The question followed by the picked element and trace as plain text.
    pub fn runtime_prompt(&self) -> String {
        let dom = self
            .dom_context
            .as_ref()
            .map(describe_snapshot)
            .unwrap_or_default();
        let trace = self.trace_context.as_deref().unwrap_or_default();
        format!("{}\n\nRuntime Context:\n{}\n\n{}", self.question, dom, trace)
    }
}

/// Compact multi-line rendering of a snapshot for prompts.
pub fn describe_snapshot(snapshot: &ElementSnapshot) -> String {
    let mut lines = Vec::new();

    let mut open_tag = format!("<{}", snapshot.tag_name);
    if let Some(id) = &snapshot.id {
        open_tag.push_str(&format!(" id=\"{}\"", id));
    }
    if let Some(class) = &snapshot.class_name {
        open_tag.push_str(&format!(" class=\"{}\"", class));
    }
    open_tag.push('>');
    lines.push(format!("Element: {}", open_tag));

    if let Some(locator) = &snapshot.locator {
        lines.push(format!("XPath: {}", locator));
    }
    if !snapshot.text.is_empty() {
        lines.push(format!("Text: {}", snapshot.text.replace('\n', " / ")));
    }
    if let Some(d) = &snapshot.dimensions {
        lines.push(format!(
            "Box: {}x{} at ({}, {})",
            d.width, d.height, d.left, d.top
        ));
    }

    let styles: Vec<String> = STYLE_ALLOW_LIST
        .iter()
        .filter_map(|p| {
            snapshot
                .computed_styles
                .get(*p)
                .filter(|v| !v.is_empty())
                .map(|v| format!("{}: {}", p, v))
        })
        .collect();
    if !styles.is_empty() {
        lines.push(format!("Styles: {}", styles.join("; ")));
    }
    lines.join("\n")
}

/// One entry of a page's element index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementDescriptor {
    /// `tag attr="v" ... text`
    pub descriptor: String,
    /// Positional locator (never id-anchored).
    pub xpath: String,
}

/// Index every connected element in document order.
pub fn describe_elements<D: Document + ?Sized>(doc: &D) -> Vec<ElementDescriptor> {
    doc.elements()
        .into_iter()
        .filter_map(|node| {
            let xpath = locator::structural_path(doc, node)?;
            let tag = doc.tag_name(node)?;
            let attrs = doc
                .attributes(node)
                .iter()
                .map(|(k, v)| format!("{}=\"{}\"", k, v))
                .collect::<Vec<_>>()
                .join(" ");
            let text = leading_text(doc, node);
            let descriptor = [tag, attrs.as_str(), text.as_str()]
                .iter()
                .filter(|part| !part.is_empty())
                .copied()
                .collect::<Vec<_>>()
                .join(" ");
            Some(ElementDescriptor { descriptor, xpath })
        })
        .collect()
}

/// A fuzzy match of a free-text descriptor against the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementMatch {
    pub xpath: String,
    /// Similarity in percent, two decimals.
    pub confidence: f64,
    pub descriptor: String,
}

/// Best candidates for a descriptor like `"button login Sign in"`.
///
/// Each element is summarized as `tag id class text` and compared with the
/// query by Ratcliff/Obershelp similarity, case-insensitively. Candidates
/// scoring above 0.2 are returned best first, at most `limit` of them.
pub fn match_elements<D: Document + ?Sized>(
    doc: &D,
    query: &str,
    limit: usize,
) -> Vec<ElementMatch> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }
    let query: Vec<char> = query.chars().collect();

    let mut matches: Vec<ElementMatch> = doc
        .elements()
        .into_iter()
        .filter_map(|node| {
            let xpath = locator::structural_path(doc, node)?;
            let summary = [
                doc.tag_name(node).unwrap_or_default(),
                doc.attribute(node, "id").unwrap_or_default(),
                doc.attribute(node, "class").unwrap_or_default(),
                leading_text(doc, node).as_str(),
            ]
            .join(" ")
            .trim()
            .to_string();
            let candidate: Vec<char> = summary.to_lowercase().chars().collect();
            let score = similarity(&query, &candidate);
            (score > MATCH_THRESHOLD).then(|| ElementMatch {
                xpath,
                confidence: (score * 10_000.0).round() / 100.0,
                descriptor: summary,
            })
        })
        .collect();

    matches.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    matches.truncate(limit);
    matches
}

/// First rendered line of an element, cut to a short prefix.
fn leading_text<D: Document + ?Sized>(doc: &D, node: NodeId) -> String {
    doc.inner_text(node)
        .ok()
        .and_then(|text| text.lines().next().map(str::to_string))
        .map(|line| line.chars().take(DESCRIPTOR_TEXT_CHARS).collect::<String>())
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Ratcliff/Obershelp similarity: `2 * matched / (len(a) + len(b))`.
fn similarity(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matched_chars(a, b) as f64 / total as f64
}

/// Characters covered by the longest common block and, recursively, the
/// blocks to either side of it.
fn matched_chars(a: &[char], b: &[char]) -> usize {
    let (start_a, start_b, len) = longest_common_block(a, b);
    if len == 0 {
        return 0;
    }
    len + matched_chars(&a[..start_a], &b[..start_b])
        + matched_chars(&a[start_a + len..], &b[start_b + len..])
}

fn longest_common_block(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    // Run lengths ending at the previous row, indexed by position in `b`.
    let mut prev = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        let mut row = vec![0usize; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            if ca == cb {
                row[j + 1] = prev[j] + 1;
                if row[j + 1] > best.2 {
                    best = (i + 1 - row[j + 1], j + 1 - row[j + 1], row[j + 1]);
                }
            }
        }
        prev = row;
    }
    best
}
