//! Picker session state machine.
//!
//! ```text
//!            enable()              click(target)             finish_commit()
//!   Idle ─────────────▶ Armed ─────────────────▶ Committing ─────────────────▶ Idle
//!     ▲                   │
//!     └───── disable() ───┘
//! ```
//!
//! A [`PickerSession`] is synchronous and owns no clock. A click that commits
//! returns a [`CommitTicket`] and the confirmation delay; the caller waits
//! that long (however it likes) and hands the ticket back to
//! [`PickerSession::finish_commit`] to receive the snapshot.
//!
//! # Owned resources
//!
//! While not idle the session holds a [`SessionResources`]: the listener pair
//! at the document root, the selectable-class marks and the cursor override.
//! All of it is acquired in one place and released in one place, on commit,
//! on cancel and on abort alike.
//!
//! # Policies
//!
//! - `disable()` during `Committing` does nothing; the commit completes.
//! - A second session cannot arm a document whose listener pair is already
//!   held ([`ErrorCode::SessionActive`](crate::error::ErrorCode::SessionActive)).
//! - If the host UI root is configured but missing, every node counts as
//!   excluded until it reappears.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::PickerConfig;
use crate::dom::style::{parse_declarations, serialize_declarations};
use crate::dom::{Document, ListenerId, ListenerKind, NodeId, Point};
use crate::error::PickError;
use crate::overlay::{overlay_for, OverlayRenderer, OverlaySpec, OverlayTone};
use crate::snapshot::{self, ElementSnapshot};

/// Owner tag on listeners registered by a picker session.
pub const PICKER_LISTENER_OWNER: &str = "pagepick";

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickerState {
    /// No listeners, no overlays, no marks.
    Idle,
    /// Tracking the pointer and intercepting clicks.
    Armed,
    /// A click was accepted; waiting out the confirmation delay.
    Committing,
}

/// Which nodes the picker must not pick, as of one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    /// The page has no host UI.
    Nothing,
    /// The host UI root and everything below it.
    Subtree(NodeId),
    /// The host UI root is configured but missing.
    Everything,
}

impl Exclusion {
    pub fn excludes<D: Document + ?Sized>(&self, doc: &D, node: NodeId) -> bool {
        match *self {
            Exclusion::Nothing => false,
            Exclusion::Subtree(root) => doc.is_inclusive_descendant(node, root),
            Exclusion::Everything => true,
        }
    }
}

/// Identifies one in-flight commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommitTicket(u64);

/// Result of a pointer move.
#[derive(Debug, Clone, PartialEq)]
pub enum MoveOutcome {
    /// The session is not armed.
    Ignored,
    /// Nothing under the pointer; any highlight was cleared.
    NoTarget,
    /// The node under the pointer is excluded; the highlight is unchanged.
    Excluded(NodeId),
    /// The node is now highlighted.
    Highlighted { node: NodeId, overlay: OverlaySpec },
}

/// Result of a click.
#[derive(Debug, Clone, PartialEq)]
pub enum ClickOutcome {
    /// The session is idle; the page handles the click.
    PassThrough,
    /// A commit is in flight; the click is swallowed.
    Swallowed,
    /// Nothing under the pointer.
    NoTarget,
    /// The target is excluded; the session stays armed.
    Excluded(NodeId),
    /// The target was captured. Call [`PickerSession::finish_commit`] with
    /// the ticket after `delay`.
    Committing {
        node: NodeId,
        ticket: CommitTicket,
        delay: Duration,
    },
    /// Capture failed; the session stays armed.
    Failed(PickError),
}

impl ClickOutcome {
    /// Whether the page's default action for the click is suppressed.
    pub fn default_prevented(&self) -> bool {
        !matches!(self, ClickOutcome::PassThrough)
    }
}

#[derive(Debug, Clone)]
struct MarkedNode {
    node: NodeId,
    /// Exact `class` value before marking; `None` if the attribute was absent.
    original_class: Option<String>,
}

#[derive(Debug, Clone)]
struct CursorOverride {
    node: NodeId,
    original_style: Option<String>,
}

/// Everything a non-idle session holds on the document.
#[derive(Debug)]
pub struct SessionResources {
    listeners: Vec<ListenerId>,
    marked: Vec<MarkedNode>,
    cursor: Option<CursorOverride>,
}

impl SessionResources {
    /// Attach the listener pair and apply the pick affordance.
    fn acquire<D: Document + ?Sized>(
        doc: &mut D,
        config: &PickerConfig,
        exclusion: Exclusion,
    ) -> Self {
        let listeners = vec![
            doc.add_listener(ListenerKind::PointerMove, PICKER_LISTENER_OWNER),
            doc.add_listener(ListenerKind::Click, PICKER_LISTENER_OWNER),
        ];
        let mut resources = Self {
            listeners,
            marked: Vec::new(),
            cursor: None,
        };
        resources.apply_affordance(doc, config, exclusion);
        resources
    }

    /// Mark eligible elements selectable and switch the cursor.
    fn apply_affordance<D: Document + ?Sized>(
        &mut self,
        doc: &mut D,
        config: &PickerConfig,
        exclusion: Exclusion,
    ) {
        let Some(body) = doc.root_container() else {
            return;
        };

        let view: &D = doc;
        let eligible: Vec<NodeId> = view
            .elements()
            .into_iter()
            .filter(|&n| view.is_inclusive_descendant(n, body))
            .filter(|&n| view.attribute(n, &config.overlay_marker).is_none())
            .filter(|&n| !exclusion.excludes(view, n))
            .collect();
        for node in eligible {
            let original_class = doc.attribute(node, "class").map(str::to_string);
            match doc.add_class(node, &config.selectable_class) {
                Ok(true) => self.marked.push(MarkedNode {
                    node,
                    original_class,
                }),
                Ok(false) => {}
                Err(e) => debug!("Cannot mark {} selectable: {}", node, e),
            }
        }

        let original_style = doc.attribute(body, "style").map(str::to_string);
        let mut declarations: Vec<(String, String)> = original_style
            .as_deref()
            .map(parse_declarations)
            .unwrap_or_default()
            .into_iter()
            .filter(|(name, _)| name != "cursor")
            .collect();
        declarations.push(("cursor".to_string(), config.pick_cursor.clone()));
        match doc.set_attribute(body, "style", &serialize_declarations(&declarations)) {
            Ok(()) => {
                self.cursor = Some(CursorOverride {
                    node: body,
                    original_style,
                })
            }
            Err(e) => warn!("Cannot set pick cursor: {}", e),
        }
    }

    /// Undo the selectable marks and the cursor override.
    fn release_affordance<D: Document + ?Sized>(&mut self, doc: &mut D, class: &str) {
        for marked in self.marked.drain(..) {
            // The page rewrote the class since marking; leave its value alone.
            if !doc.has_class(marked.node, class) {
                continue;
            }
            let restored = match &marked.original_class {
                Some(value) => doc.set_attribute(marked.node, "class", value),
                None => doc.remove_attribute(marked.node, "class"),
            };
            if let Err(e) = restored {
                debug!("Cannot unmark {}: {}", marked.node, e);
            }
        }

        if let Some(cursor) = self.cursor.take() {
            let restored = match &cursor.original_style {
                Some(style) => doc.set_attribute(cursor.node, "style", style),
                None => doc.remove_attribute(cursor.node, "style"),
            };
            if let Err(e) = restored {
                warn!("Cannot restore cursor on {}: {}", cursor.node, e);
            }
        }
    }

    /// Release everything, listeners included.
    fn release<D: Document + ?Sized>(mut self, doc: &mut D, class: &str) {
        self.release_affordance(doc, class);
        for id in self.listeners {
            if !doc.remove_listener(id) {
                debug!("Listener {:?} was already detached", id);
            }
        }
    }
}

#[derive(Debug)]
struct PendingCommit {
    ticket: CommitTicket,
    snapshot: ElementSnapshot,
}

/// One picker, bound to whichever document its caller passes in.
#[derive(Debug)]
pub struct PickerSession {
    config: PickerConfig,
    renderer: OverlayRenderer,
    state: PickerState,
    resources: Option<SessionResources>,
    hovered: Option<NodeId>,
    pending: Option<PendingCommit>,
    next_ticket: u64,
}

impl PickerSession {
    pub fn new(config: PickerConfig) -> Self {
        let renderer = OverlayRenderer::new(config.overlay_marker.clone());
        Self {
            config,
            renderer,
            state: PickerState::Idle,
            resources: None,
            hovered: None,
            pending: None,
            next_ticket: 0,
        }
    }

    pub fn state(&self) -> PickerState {
        self.state
    }

    /// True while armed or committing.
    pub fn is_active(&self) -> bool {
        self.state != PickerState::Idle
    }

    /// Element currently highlighted, if any.
    pub fn hovered(&self) -> Option<NodeId> {
        self.hovered
    }

    /// Look up the host UI root. Never cached: the host may re-render.
    pub fn exclusion<D: Document + ?Sized>(&self, doc: &D) -> Exclusion {
        let Some(id) = self.config.host_root_id.as_deref() else {
            return Exclusion::Nothing;
        };
        match doc.element_by_id(id) {
            Some(root) => Exclusion::Subtree(root),
            None => {
                warn!("Host root '#{}' not found; nothing is pickable", id);
                Exclusion::Everything
            }
        }
    }

    pub fn is_excluded<D: Document + ?Sized>(&self, doc: &D, node: NodeId) -> bool {
        self.exclusion(doc).excludes(doc, node)
    }

    /// Arm the picker.
    ///
    /// Returns `Ok(false)` when this session is already active, and
    /// [`PickError::session_active`] when another session holds the document.
    pub fn enable<D: Document + ?Sized>(&mut self, doc: &mut D) -> Result<bool, PickError> {
        if self.state != PickerState::Idle {
            debug!("enable() while {:?}: no-op", self.state);
            return Ok(false);
        }
        if doc
            .listeners()
            .iter()
            .any(|l| l.owner == PICKER_LISTENER_OWNER)
        {
            return Err(PickError::session_active());
        }

        let exclusion = self.exclusion(doc);
        let resources = SessionResources::acquire(doc, &self.config, exclusion);
        info!(
            "Picker armed ({} elements selectable)",
            resources.marked.len()
        );
        self.resources = Some(resources);
        self.state = PickerState::Armed;
        Ok(true)
    }

    /// Cancel an armed picker.
    ///
    /// Returns false when nothing was cancelled: the session was idle, or a
    /// commit is in flight (it completes regardless).
    pub fn disable<D: Document + ?Sized>(&mut self, doc: &mut D) -> bool {
        match self.state {
            PickerState::Idle => false,
            PickerState::Committing => {
                debug!("disable() during commit: commit completes");
                false
            }
            PickerState::Armed => {
                self.teardown(doc);
                info!("Picker cancelled");
                true
            }
        }
    }

    /// Release everything regardless of state, dropping any in-flight commit.
    ///
    /// Returns false when the session was already idle.
    pub fn abort<D: Document + ?Sized>(&mut self, doc: &mut D) -> bool {
        if self.state == PickerState::Idle {
            return false;
        }
        if self.pending.take().is_some() {
            warn!("Picker aborted with a commit in flight");
        }
        self.teardown(doc);
        true
    }

    pub fn pointer_move<D: Document + ?Sized>(&mut self, doc: &mut D, point: Point) -> MoveOutcome {
        if self.state != PickerState::Armed {
            return MoveOutcome::Ignored;
        }
        let Some(target) = doc.element_from_point(point) else {
            self.renderer.clear(doc);
            self.hovered = None;
            return MoveOutcome::NoTarget;
        };
        if self.is_excluded(doc, target) {
            debug!("Move over excluded {}", target);
            return MoveOutcome::Excluded(target);
        }

        match overlay_for(doc, target, &self.config, OverlayTone::Hover) {
            Ok(overlay) => {
                if let Err(e) = self.renderer.show(doc, &overlay) {
                    warn!("Cannot draw highlight for {}: {}", target, e);
                }
                self.hovered = Some(target);
                MoveOutcome::Highlighted {
                    node: target,
                    overlay,
                }
            }
            Err(e) => {
                warn!("Cannot measure {}: {}", target, e);
                self.renderer.clear(doc);
                self.hovered = None;
                MoveOutcome::NoTarget
            }
        }
    }

    pub fn click<D: Document + ?Sized>(&mut self, doc: &mut D, point: Point) -> ClickOutcome {
        match self.state {
            PickerState::Idle => return ClickOutcome::PassThrough,
            PickerState::Committing => return ClickOutcome::Swallowed,
            PickerState::Armed => {}
        }
        let Some(target) = doc.element_from_point(point) else {
            return ClickOutcome::NoTarget;
        };
        let exclusion = self.exclusion(doc);
        if exclusion.excludes(doc, target) {
            debug!("Click on excluded {}", target);
            return ClickOutcome::Excluded(target);
        }

        // Picker artifacts must not leak into the snapshot.
        self.renderer.clear(doc);
        self.hovered = None;
        let class = self.config.selectable_class.clone();
        if let Some(resources) = self.resources.as_mut() {
            resources.release_affordance(doc, &class);
        }

        let snapshot = match snapshot::extract(doc, target) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Capture of {} failed: {}", target, e);
                if let Some(resources) = self.resources.as_mut() {
                    resources.apply_affordance(doc, &self.config, exclusion);
                }
                return ClickOutcome::Failed(e);
            }
        };

        let ticket = CommitTicket(self.next_ticket);
        self.next_ticket += 1;
        self.pending = Some(PendingCommit { ticket, snapshot });
        self.state = PickerState::Committing;

        match overlay_for(doc, target, &self.config, OverlayTone::Commit) {
            Ok(overlay) => {
                if let Err(e) = self.renderer.show(doc, &overlay) {
                    debug!("No confirmation highlight for {}: {}", target, e);
                }
            }
            Err(e) => debug!("No confirmation highlight for {}: {}", target, e),
        }

        info!("Committing {}", target);
        ClickOutcome::Committing {
            node: target,
            ticket,
            delay: self.config.commit_flash,
        }
    }

    /// Finish the commit identified by `ticket` and return its snapshot.
    ///
    /// Returns `None` for a stale or unknown ticket.
    pub fn finish_commit<D: Document + ?Sized>(
        &mut self,
        doc: &mut D,
        ticket: CommitTicket,
    ) -> Option<ElementSnapshot> {
        if self.state != PickerState::Committing {
            return None;
        }
        if self.pending.as_ref().map(|p| p.ticket) != Some(ticket) {
            debug!("Ignoring stale commit ticket {:?}", ticket);
            return None;
        }
        let pending = self.pending.take()?;
        self.teardown(doc);
        info!("Picked <{}>", pending.snapshot.tag_name);
        Some(pending.snapshot)
    }

    fn teardown<D: Document + ?Sized>(&mut self, doc: &mut D) {
        self.renderer.clear(doc);
        if let Some(resources) = self.resources.take() {
            resources.release(doc, &self.config.selectable_class);
        }
        self.hovered = None;
        self.pending = None;
        self.state = PickerState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::test_support::{blank_page, el};
    use crate::dom::{MemoryDocument, Rect};
    use crate::error::ErrorCode;

    struct Page {
        doc: MemoryDocument,
        body: NodeId,
        target: NodeId,
        other: NodeId,
        host_button: NodeId,
    }

    /// A body with two divs and a host UI panel in the bottom-right corner.
    fn page() -> Page {
        let (mut doc, body) = blank_page();
        let target = el(
            &mut doc,
            body,
            "div",
            &[("id", "x"), ("class", "a b")],
            Some(Rect::new(10.0, 40.0, 200.0, 30.0)),
        );
        doc.append_text(target, "hello").unwrap();
        let other = el(
            &mut doc,
            body,
            "div",
            &[],
            Some(Rect::new(10.0, 100.0, 200.0, 30.0)),
        );
        let host = el(
            &mut doc,
            body,
            "div",
            &[("id", "pagepick-host")],
            Some(Rect::new(1000.0, 600.0, 280.0, 120.0)),
        );
        let host_button = el(
            &mut doc,
            host,
            "button",
            &[],
            Some(Rect::new(1010.0, 610.0, 80.0, 30.0)),
        );
        Page {
            doc,
            body,
            target,
            other,
            host_button,
        }
    }

    fn session() -> PickerSession {
        PickerSession::new(PickerConfig::default())
    }

    fn overlays(doc: &MemoryDocument) -> usize {
        OverlayRenderer::new(crate::config::DEFAULT_OVERLAY_MARKER).count(doc)
    }

    fn commit(session: &mut PickerSession, doc: &mut MemoryDocument, at: Point) -> ElementSnapshot {
        let ClickOutcome::Committing { ticket, .. } = session.click(doc, at) else {
            panic!("click did not commit");
        };
        session.finish_commit(doc, ticket).expect("commit resolves")
    }

    const ON_TARGET: Point = Point { x: 20.0, y: 50.0 };
    const ON_OTHER: Point = Point { x: 20.0, y: 110.0 };
    const ON_HOST: Point = Point { x: 1020.0, y: 620.0 };

    #[test]
    fn enable_attaches_capturing_listener_pair() {
        let Page { mut doc, .. } = page();
        let mut picker = session();

        assert!(picker.enable(&mut doc).unwrap());
        assert_eq!(picker.state(), PickerState::Armed);

        let listeners = doc.listeners();
        assert_eq!(listeners.len(), 2);
        assert!(listeners.iter().all(|l| l.capture && l.owner == PICKER_LISTENER_OWNER));
        assert!(listeners.iter().any(|l| l.kind == ListenerKind::PointerMove));
        assert!(listeners.iter().any(|l| l.kind == ListenerKind::Click));
    }

    #[test]
    fn enable_and_disable_are_idempotent() {
        let Page { mut doc, .. } = page();
        let mut picker = session();

        assert!(picker.enable(&mut doc).unwrap());
        assert!(!picker.enable(&mut doc).unwrap());
        assert_eq!(doc.listeners().len(), 2);

        assert!(picker.disable(&mut doc));
        assert!(!picker.disable(&mut doc));
        assert!(doc.listeners().is_empty());
    }

    #[test]
    fn second_session_cannot_arm_same_document() {
        let Page { mut doc, .. } = page();
        let mut first = session();
        let mut second = session();

        first.enable(&mut doc).unwrap();
        let err = second.enable(&mut doc).unwrap_err();
        assert_eq!(err.code, ErrorCode::SessionActive);
        assert_eq!(second.state(), PickerState::Idle);

        first.disable(&mut doc);
        assert!(second.enable(&mut doc).unwrap());
    }

    #[test]
    fn affordance_marks_eligible_nodes_and_cursor() {
        let Page {
            mut doc,
            body,
            target,
            other,
            host_button,
        } = page();
        doc.set_attribute(body, "style", "color: red").unwrap();
        let mut picker = session();
        picker.enable(&mut doc).unwrap();

        let class = crate::config::DEFAULT_SELECTABLE_CLASS;
        assert!(doc.has_class(target, class));
        assert!(doc.has_class(other, class));
        assert!(!doc.has_class(host_button, class));
        assert_eq!(doc.computed_style(body, "cursor").unwrap(), "crosshair");
        assert_eq!(doc.computed_style(body, "color").unwrap(), "red");

        picker.disable(&mut doc);
        assert_eq!(doc.attribute(target, "class"), Some("a b"));
        assert_eq!(doc.attribute(other, "class"), None);
        assert_eq!(doc.attribute(body, "style"), Some("color: red"));
    }

    #[test]
    fn moves_keep_exactly_one_overlay_set() {
        let Page {
            mut doc,
            target,
            other,
            ..
        } = page();
        let mut picker = session();
        picker.enable(&mut doc).unwrap();

        let first = picker.pointer_move(&mut doc, ON_TARGET);
        assert!(matches!(first, MoveOutcome::Highlighted { node, .. } if node == target));
        assert_eq!(overlays(&doc), 2);

        let second = picker.pointer_move(&mut doc, ON_OTHER);
        assert!(matches!(second, MoveOutcome::Highlighted { node, .. } if node == other));
        assert_eq!(overlays(&doc), 2);
        assert_eq!(picker.hovered(), Some(other));

        let snap = commit(&mut picker, &mut doc, ON_OTHER);
        assert_eq!(snap.tag_name, "div");
        assert_eq!(overlays(&doc), 0);
        assert!(doc.listeners().is_empty());
        assert_eq!(picker.state(), PickerState::Idle);
    }

    #[test]
    fn highlight_frames_the_hovered_element() {
        let Page { mut doc, .. } = page();
        let mut picker = session();
        picker.enable(&mut doc).unwrap();

        let MoveOutcome::Highlighted { overlay, .. } = picker.pointer_move(&mut doc, ON_TARGET) else {
            panic!("expected a highlight");
        };
        assert_eq!(overlay.frame, Rect::new(10.0, 40.0, 200.0, 30.0));
        assert_eq!(overlay.label.text, "div.a#x");
        assert_eq!(overlay.tone, OverlayTone::Hover);
    }

    #[test]
    fn move_over_host_ui_keeps_previous_highlight() {
        let Page {
            mut doc,
            target,
            host_button,
            ..
        } = page();
        let mut picker = session();
        picker.enable(&mut doc).unwrap();
        picker.pointer_move(&mut doc, ON_TARGET);

        assert_eq!(
            picker.pointer_move(&mut doc, ON_HOST),
            MoveOutcome::Excluded(host_button)
        );
        assert_eq!(picker.hovered(), Some(target));
        assert_eq!(overlays(&doc), 2);
    }

    #[test]
    fn move_over_nothing_clears_highlight() {
        let Page { mut doc, body, .. } = page();
        let mut picker = session();
        picker.enable(&mut doc).unwrap();
        picker.pointer_move(&mut doc, ON_TARGET);

        // Push the body out of the way so the point hits nothing.
        doc.set_rect(body, Rect::new(0.0, 0.0, 1.0, 1.0));
        let html = doc.document_element().unwrap();
        doc.set_rect(html, Rect::new(0.0, 0.0, 1.0, 1.0));

        assert_eq!(
            picker.pointer_move(&mut doc, Point::new(500.0, 500.0)),
            MoveOutcome::NoTarget
        );
        assert_eq!(overlays(&doc), 0);
        assert_eq!(picker.hovered(), None);
    }

    #[test]
    fn click_on_host_ui_never_picks() {
        let Page {
            mut doc,
            host_button,
            ..
        } = page();
        let mut picker = session();
        picker.enable(&mut doc).unwrap();

        let outcome = picker.click(&mut doc, ON_HOST);
        assert_eq!(outcome, ClickOutcome::Excluded(host_button));
        assert!(outcome.default_prevented());
        assert_eq!(picker.state(), PickerState::Armed);
        assert_eq!(doc.listeners().len(), 2);
    }

    #[test]
    fn disable_while_armed_leaves_no_trace() {
        let Page { mut doc, target, .. } = page();
        let mut picker = session();
        picker.enable(&mut doc).unwrap();
        picker.pointer_move(&mut doc, ON_TARGET);

        assert!(picker.disable(&mut doc));
        assert!(doc.listeners().is_empty());
        assert_eq!(overlays(&doc), 0);
        assert_eq!(doc.attribute(target, "class"), Some("a b"));
        assert_eq!(picker.click(&mut doc, ON_TARGET), ClickOutcome::PassThrough);
    }

    #[test]
    fn release_restores_exact_class_values() {
        let (mut doc, body) = blank_page();
        let spaced = el(
            &mut doc,
            body,
            "div",
            &[("class", "  a   b ")],
            Some(Rect::new(0.0, 0.0, 200.0, 30.0)),
        );
        doc.append_text(spaced, "spaced").unwrap();
        let blank = el(
            &mut doc,
            body,
            "div",
            &[("class", "   ")],
            Some(Rect::new(0.0, 40.0, 200.0, 30.0)),
        );
        let bare = el(&mut doc, body, "div", &[], Some(Rect::new(0.0, 80.0, 200.0, 30.0)));
        let mut picker = PickerSession::new(PickerConfig::default().with_host_root(None));

        picker.enable(&mut doc).unwrap();
        picker.disable(&mut doc);
        assert_eq!(doc.attribute(spaced, "class"), Some("  a   b "));
        assert_eq!(doc.attribute(blank, "class"), Some("   "));
        assert_eq!(doc.attribute(bare, "class"), None);

        picker.enable(&mut doc).unwrap();
        let snap = commit(&mut picker, &mut doc, Point::new(10.0, 10.0));
        assert_eq!(snap.class_name.as_deref(), Some("  a   b "));
        assert_eq!(snap.attributes["class"], "  a   b ");
        assert_eq!(doc.attribute(spaced, "class"), Some("  a   b "));
    }

    #[test]
    fn picks_identified_div_end_to_end() {
        let Page { mut doc, target, .. } = page();
        let mut picker = session();
        picker.enable(&mut doc).unwrap();
        picker.pointer_move(&mut doc, ON_TARGET);

        let snap = commit(&mut picker, &mut doc, ON_TARGET);

        assert_eq!(snap.tag_name, "div");
        assert_eq!(snap.id.as_deref(), Some("x"));
        assert!(snap.class_name.as_deref().unwrap().contains("a b"));
        assert_eq!(snap.text, "hello");
        assert_eq!(snap.markup, "hello");
        assert_eq!(snap.locator.as_deref(), Some(r#"//*[@id="x"]"#));
        assert_eq!(snap.attributes["class"], "a b");
        assert_eq!(doc.attribute(target, "class"), Some("a b"));
    }

    #[test]
    fn picks_nested_div_with_structural_locator() {
        let (mut doc, body) = blank_page();
        el(&mut doc, body, "div", &[], Some(Rect::new(0.0, 0.0, 100.0, 20.0)));
        let outer = el(&mut doc, body, "div", &[], Some(Rect::new(0.0, 20.0, 400.0, 200.0)));
        el(&mut doc, outer, "div", &[], Some(Rect::new(0.0, 20.0, 400.0, 50.0)));
        let inner = el(
            &mut doc,
            outer,
            "div",
            &[("class", "a b")],
            Some(Rect::new(0.0, 80.0, 400.0, 50.0)),
        );
        doc.append_text(inner, "hello").unwrap();

        let mut picker = PickerSession::new(PickerConfig::default().with_host_root(None));
        picker.enable(&mut doc).unwrap();
        let snap = commit(&mut picker, &mut doc, Point::new(10.0, 90.0));

        assert_eq!(snap.locator.as_deref(), Some("/html/body/div[2]/div[2]"));
        assert_eq!(snap.class_name.as_deref(), Some("a b"));
    }

    #[test]
    fn commit_freezes_moves_and_swallows_clicks() {
        let Page { mut doc, .. } = page();
        let mut picker = session();
        picker.enable(&mut doc).unwrap();

        let ClickOutcome::Committing { ticket, delay, .. } = picker.click(&mut doc, ON_TARGET) else {
            panic!("click did not commit");
        };
        assert_eq!(delay, Duration::from_millis(300));
        assert_eq!(picker.state(), PickerState::Committing);
        assert_eq!(overlays(&doc), 2);

        assert_eq!(picker.pointer_move(&mut doc, ON_OTHER), MoveOutcome::Ignored);
        let swallowed = picker.click(&mut doc, ON_OTHER);
        assert_eq!(swallowed, ClickOutcome::Swallowed);
        assert!(swallowed.default_prevented());

        let snap = picker.finish_commit(&mut doc, ticket).unwrap();
        assert_eq!(snap.id.as_deref(), Some("x"));
    }

    #[test]
    fn disable_during_commit_lets_commit_finish() {
        let Page { mut doc, .. } = page();
        let mut picker = session();
        picker.enable(&mut doc).unwrap();
        let ClickOutcome::Committing { ticket, .. } = picker.click(&mut doc, ON_TARGET) else {
            panic!("click did not commit");
        };

        assert!(!picker.disable(&mut doc));
        assert!(!picker.enable(&mut doc).unwrap());
        assert!(picker.finish_commit(&mut doc, ticket).is_some());
        assert!(doc.listeners().is_empty());
    }

    #[test]
    fn stale_ticket_is_ignored() {
        let Page { mut doc, .. } = page();
        let mut picker = session();

        picker.enable(&mut doc).unwrap();
        let ClickOutcome::Committing { ticket: old, .. } = picker.click(&mut doc, ON_TARGET) else {
            panic!("click did not commit");
        };
        picker.abort(&mut doc);
        assert_eq!(picker.finish_commit(&mut doc, old), None);

        picker.enable(&mut doc).unwrap();
        let ClickOutcome::Committing { ticket: new, .. } = picker.click(&mut doc, ON_OTHER) else {
            panic!("click did not commit");
        };
        assert_eq!(picker.finish_commit(&mut doc, old), None);
        assert_eq!(picker.state(), PickerState::Committing);
        assert!(picker.finish_commit(&mut doc, new).is_some());
    }

    #[test]
    fn snapshot_carries_no_picker_artifacts() {
        let Page { mut doc, body, .. } = page();
        let mut picker = session();
        picker.enable(&mut doc).unwrap();
        picker.pointer_move(&mut doc, Point::new(600.0, 400.0));

        let snap = commit(&mut picker, &mut doc, Point::new(600.0, 400.0));

        assert_eq!(snap.tag_name, "body");
        assert!(!snap.markup.contains(crate::config::DEFAULT_OVERLAY_MARKER));
        assert!(!snap.markup.contains(crate::config::DEFAULT_SELECTABLE_CLASS));
        assert!(!snap.attributes.contains_key("style"));
        assert_eq!(doc.attribute(body, "style"), None);
    }

    #[test]
    fn missing_host_root_fails_closed() {
        let Page { mut doc, target, .. } = page();
        let config = PickerConfig::default().with_host_root(Some("no-such-root"));
        let mut picker = PickerSession::new(config);
        picker.enable(&mut doc).unwrap();

        assert_eq!(picker.exclusion(&doc), Exclusion::Everything);
        assert_eq!(
            picker.pointer_move(&mut doc, ON_TARGET),
            MoveOutcome::Excluded(target)
        );
        assert_eq!(picker.click(&mut doc, ON_TARGET), ClickOutcome::Excluded(target));
        assert_eq!(picker.state(), PickerState::Armed);
    }

    #[test]
    fn host_root_is_looked_up_per_event() {
        let Page {
            mut doc, target, ..
        } = page();
        let config = PickerConfig::default().with_host_root(Some("late-root"));
        let mut picker = PickerSession::new(config);
        picker.enable(&mut doc).unwrap();
        assert!(picker.is_excluded(&doc, target));

        let body = doc.root_container().unwrap();
        el(&mut doc, body, "aside", &[("id", "late-root")], None);
        assert!(!picker.is_excluded(&doc, target));
    }

    #[test]
    fn idle_click_passes_through() {
        let Page { mut doc, .. } = page();
        let mut picker = session();
        let outcome = picker.click(&mut doc, ON_TARGET);
        assert_eq!(outcome, ClickOutcome::PassThrough);
        assert!(!outcome.default_prevented());
        assert_eq!(picker.pointer_move(&mut doc, ON_TARGET), MoveOutcome::Ignored);
    }
}
