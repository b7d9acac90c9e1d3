//! Validation outcome payloads

use serde::{Deserialize, Serialize};

/// Outcome of a single validation check
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    /// True when no error was found
    pub valid: bool,
    /// Ordered error messages
    #[serde(default)]
    pub errors: Vec<String>,
    /// Proposed correction, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ValidationResult {
    /// Passing result
    #[inline]
    #[must_use]
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            suggestion: None,
        }
    }

    /// Result that is valid exactly when `errors` is empty
    #[inline]
    #[must_use]
    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
            suggestion: None,
        }
    }

    /// With suggestion
    #[inline]
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Fold another result into this one
    pub fn merge(&mut self, other: ValidationResult) {
        self.valid &= other.valid;
        self.errors.extend(other.errors);
        if self.suggestion.is_none() {
            self.suggestion = other.suggestion;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_errors_sets_validity() {
        assert!(ValidationResult::from_errors(Vec::new()).valid);
        assert!(!ValidationResult::from_errors(vec!["bad".to_string()]).valid);
    }

    #[test]
    fn merge_keeps_first_suggestion() {
        let mut a = ValidationResult::from_errors(vec!["a".into()]).with_suggestion("fix a");
        a.merge(ValidationResult::from_errors(vec!["b".into()]).with_suggestion("fix b"));
        assert!(!a.valid);
        assert_eq!(a.errors, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(a.suggestion.as_deref(), Some("fix a"));
    }
}
