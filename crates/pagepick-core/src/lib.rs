//! Core types and logic for pagepick.
//!
//! pagepick lets a user point at an element on a page and capture a
//! structured snapshot of it (text, markup, attributes, computed styles,
//! geometry and a locator) to attach to a chat question.
//!
//! Everything here is synchronous and runtime-agnostic. The async host
//! integration and the CLI live in `pagepick-cli`.
//!
//! # Modules
//!
//! - [`dom`]: the [`Document`](dom::Document) seam and an in-memory page
//! - [`locator`]: XPath-style locator generation and replay
//! - [`snapshot`]: element snapshot capture
//! - [`overlay`]: highlight geometry and overlay nodes
//! - [`picker`]: the picker session state machine
//! - [`config`]: picker settings with environment overrides
//! - [`protocol`]: chat payload and element index
//! - [`error`]: error types with suggestions
//!
//! # Picking
//!
//! | Event | Armed session does |
//! |-------|--------------------|
//! | pointer move | highlight the element under the pointer, unless it is host UI |
//! | click | suppress the page action, capture the target, flash a confirmation |
//! | flash elapsed | remove overlays, marks and listeners; emit the snapshot |
//! | `disable()` | remove overlays, marks and listeners; emit nothing |

pub mod config;
pub mod dom;
pub mod error;
pub mod locator;
pub mod overlay;
pub mod picker;
pub mod protocol;
pub mod snapshot;
