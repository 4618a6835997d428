//! Extraction setup errors
//!
//! Extraction itself never fails (missing fields fall through to the next
//! source); these errors only cover building an extractor from a profile,
//! e.g. an invalid CSS selector or regex.

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ExtractionError {
    #[error("Invalid CSS selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Invalid article number pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

impl ExtractionError {
    pub fn invalid_selector(selector: &str, reason: impl ToString) -> Self {
        Self::InvalidSelector {
            selector: selector.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_pattern(pattern: &str, reason: impl ToString) -> Self {
        Self::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type ExtractionResult<T> = Result<T, ExtractionError>;
