use thiserror::Error;

/// Errors raised while building value makers from mapping definitions.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValueError {
    #[error("Invalid pattern `{pattern}`: {detail}")]
    InvalidPattern { pattern: String, detail: String },

    #[error("Invalid value regex `{regex}`: {detail}")]
    InvalidRegex { regex: String, detail: String },

    #[error("Invalid language tag `{tag}`")]
    InvalidLanguageTag { tag: String },
}

impl ValueError {
    pub fn invalid_pattern(pattern: &str, detail: impl Into<String>) -> Self {
        ValueError::InvalidPattern {
            pattern: pattern.to_string(),
            detail: detail.into(),
        }
    }
}
