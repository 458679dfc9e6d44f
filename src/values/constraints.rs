use std::fmt;

use regex::Regex;

use super::errors::ValueError;

/// Restrictions known to hold for every value a maker produces. A constant
/// that violates them can be rejected without asking the database.
#[derive(Debug, Clone, Default)]
pub struct ValueConstraints {
    max_length: Option<usize>,
    contains: Vec<String>,
    regex: Option<Regex>,
}

impl ValueConstraints {
    pub fn new() -> Self {
        ValueConstraints::default()
    }

    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(self.max_length.map_or(max_length, |m| m.min(max_length)));
        self
    }

    pub fn contains(mut self, substring: impl Into<String>) -> Self {
        self.contains.push(substring.into());
        self
    }

    /// The whole value must match `regex`.
    pub fn regex(mut self, regex: &str) -> Result<Self, ValueError> {
        let anchored = format!("^(?:{})$", regex);
        let compiled = Regex::new(&anchored).map_err(|e| ValueError::InvalidRegex {
            regex: regex.to_string(),
            detail: e.to_string(),
        })?;
        self.regex = Some(compiled);
        Ok(self)
    }

    pub fn is_unrestricted(&self) -> bool {
        self.max_length.is_none() && self.contains.is_empty() && self.regex.is_none()
    }

    pub fn matches(&self, value: &str) -> bool {
        if let Some(max) = self.max_length {
            if value.chars().count() > max {
                return false;
            }
        }
        if !self.contains.iter().all(|s| value.contains(s.as_str())) {
            return false;
        }
        self.regex.as_ref().map_or(true, |r| r.is_match(value))
    }
}

impl PartialEq for ValueConstraints {
    fn eq(&self, other: &Self) -> bool {
        self.max_length == other.max_length
            && self.contains == other.contains
            && self.regex.as_ref().map(Regex::as_str) == other.regex.as_ref().map(Regex::as_str)
    }
}

impl Eq for ValueConstraints {}

impl fmt::Display for ValueConstraints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(max) = self.max_length {
            parts.push(format!("maxLength={}", max));
        }
        for s in &self.contains {
            parts.push(format!("contains={:?}", s));
        }
        if let Some(r) = &self.regex {
            parts.push(format!("regex={}", r.as_str()));
        }
        write!(f, "{}", parts.join(", "))
    }
}
