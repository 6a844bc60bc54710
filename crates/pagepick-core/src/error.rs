//! Host-friendly error types with suggestions.
//!
//! Nothing in the picker core is fatal to the host page. Errors surface to the
//! host integration (and the CLI) as a [`PickError`], which always carries a
//! hint about what to try next.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes for picker failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    SessionActive,
    NodeNotFound,
    InvalidInput,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::SessionActive => write!(f, "SESSION_ACTIVE"),
            ErrorCode::NodeNotFound => write!(f, "NODE_NOT_FOUND"),
            ErrorCode::InvalidInput => write!(f, "INVALID_INPUT"),
        }
    }
}

/// A picker error with a suggestion for the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickError {
    pub code: ErrorCode,
    pub message: String,
    pub suggestion: Option<String>,
}

impl fmt::Display for PickError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, " (hint: {})", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for PickError {}

impl PickError {
    /// Another picker already holds the document's listener pair.
    pub fn session_active() -> Self {
        Self {
            code: ErrorCode::SessionActive,
            message: "A picker session is already armed on this document".to_string(),
            suggestion: Some("Disable the active picker before arming a new one".into()),
        }
    }

    pub fn no_element_at(x: f64, y: f64) -> Self {
        Self {
            code: ErrorCode::NodeNotFound,
            message: format!("No element under point ({}, {})", x, y),
            suggestion: Some(
                "Run 'pagepick elements <page>' to list elements and their positions".into(),
            ),
        }
    }

    pub fn node_not_found(what: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::NodeNotFound,
            message: format!("Node not found: {}", what.into()),
            suggestion: Some("The document may have changed since the node was seen".into()),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::InvalidInput,
            message: message.into(),
            suggestion: Some("Check the command syntax and try again".into()),
        }
    }

    /// Create an invalid input error with a custom suggestion.
    pub fn invalid_input_with_suggestion(
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self {
            code: ErrorCode::InvalidInput,
            message: message.into(),
            suggestion: Some(suggestion.into()),
        }
    }

    pub fn invalid_locator(locator: &str) -> Self {
        Self::invalid_input_with_suggestion(
            format!("Unsupported locator '{}'", locator),
            "Locators look like //*[@id=\"main\"] or /html/body/div[2]/span[1]",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_has_suggestion(err: &PickError, context: &str) {
        assert!(
            err.suggestion.is_some(),
            "{} should have a suggestion, but got None",
            context
        );
    }

    #[test]
    fn test_session_active_has_suggestion() {
        let err = PickError::session_active();
        assert_has_suggestion(&err, "session_active");
        assert_eq!(err.code, ErrorCode::SessionActive);
    }

    #[test]
    fn test_no_element_at_mentions_point() {
        let err = PickError::no_element_at(12.0, 40.5);
        assert_has_suggestion(&err, "no_element_at");
        assert!(err.message.contains("(12, 40.5)"));
        assert!(err.suggestion.as_ref().unwrap().contains("elements"));
    }

    #[test]
    fn test_invalid_locator_has_example() {
        let err = PickError::invalid_locator("div > span");
        assert_eq!(err.code, ErrorCode::InvalidInput);
        assert!(err.message.contains("div > span"));
        assert!(err.suggestion.as_ref().unwrap().contains("/html/body"));
    }

    #[test]
    fn test_display_format_with_suggestion() {
        let err = PickError::node_not_found("#main");
        let display = format!("{}", err);
        assert!(display.contains("[NODE_NOT_FOUND]"));
        assert!(display.contains("#main"));
        assert!(display.contains("(hint:"));
    }

    #[test]
    fn test_json_round_trip_keeps_code() {
        let json = r#"{"code":"SESSION_ACTIVE","message":"m","suggestion":null}"#;
        let err: PickError = serde_json::from_str(json).unwrap();
        assert_eq!(err.code, ErrorCode::SessionActive);
        assert!(serde_json::to_string(&err).unwrap().contains("SESSION_ACTIVE"));
    }
}
