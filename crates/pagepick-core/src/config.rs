//! Picker configuration with environment overrides.
//!
//! Every setting has a default. Each can be overridden by a `PAGEPICK_*`
//! environment variable; empty values are ignored and invalid values fall back
//! to the default with a warning.
//!
//! | Variable | Setting | Default |
//! |----------|---------|---------|
//! | `PAGEPICK_COMMIT_FLASH_MS` | confirmation delay before a pick resolves | `300` |
//! | `PAGEPICK_HOST_ROOT` | id of the host UI root excluded from picking | `pagepick-host` |
//! | `PAGEPICK_NO_HOST_ROOT` | set to `1` when the page has no host UI | unset |
//! | `PAGEPICK_OVERLAY_MARKER` | attribute tagging overlay nodes | `data-pagepick-overlay` |
//! | `PAGEPICK_SELECTABLE_CLASS` | class marking pickable elements | `pagepick-selectable` |
//! | `PAGEPICK_LABEL_CLEARANCE` | px needed above a box to place the label there | `20` |
//! | `PAGEPICK_CURSOR` | cursor shown while armed | `crosshair` |

use std::env;
use std::time::Duration;

use tracing::warn;

pub const DEFAULT_COMMIT_FLASH: Duration = Duration::from_millis(300);
pub const DEFAULT_HOST_ROOT_ID: &str = "pagepick-host";
pub const DEFAULT_OVERLAY_MARKER: &str = "data-pagepick-overlay";
pub const DEFAULT_SELECTABLE_CLASS: &str = "pagepick-selectable";
pub const DEFAULT_LABEL_CLEARANCE: f64 = 20.0;
pub const DEFAULT_PICK_CURSOR: &str = "crosshair";

/// Upper bound for the confirmation delay.
const MAX_COMMIT_FLASH_MS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq)]
pub struct PickerConfig {
    /// How long the confirming highlight stays before the pick resolves.
    pub commit_flash: Duration,
    /// Id of the host UI root. `None` means the page carries no host UI.
    pub host_root_id: Option<String>,
    pub overlay_marker: String,
    pub selectable_class: String,
    pub label_clearance: f64,
    pub pick_cursor: String,
}

impl Default for PickerConfig {
    fn default() -> Self {
        Self {
            commit_flash: DEFAULT_COMMIT_FLASH,
            host_root_id: Some(DEFAULT_HOST_ROOT_ID.to_string()),
            overlay_marker: DEFAULT_OVERLAY_MARKER.to_string(),
            selectable_class: DEFAULT_SELECTABLE_CLASS.to_string(),
            label_clearance: DEFAULT_LABEL_CLEARANCE,
            pick_cursor: DEFAULT_PICK_CURSOR.to_string(),
        }
    }
}

impl PickerConfig {
    /// Defaults overridden by `PAGEPICK_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        // Empty values count as unset.
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(raw) = get("PAGEPICK_COMMIT_FLASH_MS") {
            match raw.trim().parse::<u64>() {
                Ok(ms) if ms <= MAX_COMMIT_FLASH_MS => {
                    config.commit_flash = Duration::from_millis(ms);
                }
                _ => warn!(
                    "Invalid PAGEPICK_COMMIT_FLASH_MS '{}' (expected 0-{}), using {}ms",
                    raw,
                    MAX_COMMIT_FLASH_MS,
                    DEFAULT_COMMIT_FLASH.as_millis()
                ),
            }
        }

        if get("PAGEPICK_NO_HOST_ROOT").is_some_and(|v| v == "1" || v == "true") {
            config.host_root_id = None;
        } else if let Some(id) = get("PAGEPICK_HOST_ROOT") {
            config.host_root_id = Some(id.trim().to_string());
        }

        if let Some(marker) = get("PAGEPICK_OVERLAY_MARKER") {
            if is_valid_attribute_name(&marker) {
                config.overlay_marker = marker.to_ascii_lowercase();
            } else {
                warn!(
                    "Invalid PAGEPICK_OVERLAY_MARKER '{}', using '{}'",
                    marker, DEFAULT_OVERLAY_MARKER
                );
            }
        }

        if let Some(class) = get("PAGEPICK_SELECTABLE_CLASS") {
            if is_valid_class_token(&class) {
                config.selectable_class = class;
            } else {
                warn!(
                    "Invalid PAGEPICK_SELECTABLE_CLASS '{}', using '{}'",
                    class, DEFAULT_SELECTABLE_CLASS
                );
            }
        }

        if let Some(raw) = get("PAGEPICK_LABEL_CLEARANCE") {
            match raw.trim().parse::<f64>() {
                Ok(px) if px.is_finite() && px >= 0.0 => config.label_clearance = px,
                _ => warn!(
                    "Invalid PAGEPICK_LABEL_CLEARANCE '{}', using {}",
                    raw, DEFAULT_LABEL_CLEARANCE
                ),
            }
        }

        if let Some(cursor) = get("PAGEPICK_CURSOR") {
            config.pick_cursor = cursor.trim().to_string();
        }

        config
    }

    /// Builder-style override of the host root.
    #[must_use]
    pub fn with_host_root(mut self, id: Option<&str>) -> Self {
        self.host_root_id = id.map(str::to_string);
        self
    }

    #[must_use]
    pub fn with_commit_flash(mut self, flash: Duration) -> Self {
        self.commit_flash = flash;
        self
    }
}

/// Letters first, then letters, digits, `-` or `_`.
fn is_valid_attribute_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn is_valid_class_token(class: &str) -> bool {
    !class.is_empty() && !class.chars().any(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_overrides() {
        let config = PickerConfig::from_lookup(lookup(&[]));
        assert_eq!(config, PickerConfig::default());
        assert_eq!(config.host_root_id.as_deref(), Some("pagepick-host"));
        assert_eq!(config.commit_flash, Duration::from_millis(300));
    }

    #[test]
    fn overrides_apply() {
        let config = PickerConfig::from_lookup(lookup(&[
            ("PAGEPICK_COMMIT_FLASH_MS", "50"),
            ("PAGEPICK_HOST_ROOT", "chat-root"),
            ("PAGEPICK_OVERLAY_MARKER", "data-hl"),
            ("PAGEPICK_SELECTABLE_CLASS", "can-pick"),
            ("PAGEPICK_LABEL_CLEARANCE", "24"),
            ("PAGEPICK_CURSOR", "cell"),
        ]));
        assert_eq!(config.commit_flash, Duration::from_millis(50));
        assert_eq!(config.host_root_id.as_deref(), Some("chat-root"));
        assert_eq!(config.overlay_marker, "data-hl");
        assert_eq!(config.selectable_class, "can-pick");
        assert_eq!(config.label_clearance, 24.0);
        assert_eq!(config.pick_cursor, "cell");
    }

    #[test]
    fn empty_values_are_ignored() {
        let config = PickerConfig::from_lookup(lookup(&[
            ("PAGEPICK_HOST_ROOT", ""),
            ("PAGEPICK_CURSOR", "  "),
        ]));
        assert_eq!(config, PickerConfig::default());
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = PickerConfig::from_lookup(lookup(&[
            ("PAGEPICK_COMMIT_FLASH_MS", "soon"),
            ("PAGEPICK_OVERLAY_MARKER", "1bad name"),
            ("PAGEPICK_SELECTABLE_CLASS", "two words"),
            ("PAGEPICK_LABEL_CLEARANCE", "-3"),
        ]));
        assert_eq!(config, PickerConfig::default());
    }

    #[test]
    fn commit_flash_is_bounded() {
        let config = PickerConfig::from_lookup(lookup(&[("PAGEPICK_COMMIT_FLASH_MS", "60000")]));
        assert_eq!(config.commit_flash, DEFAULT_COMMIT_FLASH);
    }

    #[test]
    fn no_host_root_wins_over_host_root() {
        let config = PickerConfig::from_lookup(lookup(&[
            ("PAGEPICK_NO_HOST_ROOT", "1"),
            ("PAGEPICK_HOST_ROOT", "chat-root"),
        ]));
        assert_eq!(config.host_root_id, None);
    }
}
