//! ValidationRule - Acceptance rule for a step's keypad input

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;

/// Rule a step's collected digits must satisfy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValidationRule {
    /// Exactly `length` keys
    ExactLength { length: usize },
    /// Regular expression that must match the whole input
    Pattern { pattern: String },
}

impl ValidationRule {
    /// Check the rule is well formed (used when a script is saved)
    pub fn validate(&self) -> Result<(), DomainError> {
        match self {
            Self::ExactLength { length } if *length == 0 => Err(DomainError::Validation(
                "exact_length rule needs a length of at least 1".to_string(),
            )),
            Self::ExactLength { .. } => Ok(()),
            Self::Pattern { pattern } => anchored(pattern).map(|_| ()),
        }
    }

    /// Whether `digits` satisfies the rule
    pub fn matches(&self, digits: &str) -> Result<bool, DomainError> {
        match self {
            Self::ExactLength { length } => Ok(digits.chars().count() == *length),
            Self::Pattern { pattern } => Ok(anchored(pattern)?.is_match(digits)),
        }
    }
}

fn anchored(pattern: &str) -> Result<Regex, DomainError> {
    Regex::new(&format!("^(?:{})$", pattern))
        .map_err(|e| DomainError::Validation(format!("invalid digit pattern '{}': {}", pattern, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_length() {
        let rule = ValidationRule::ExactLength { length: 6 };
        assert!(rule.matches("123456").unwrap());
        assert!(!rule.matches("12345").unwrap());
        assert!(!rule.matches("1234567").unwrap());
    }

    #[test]
    fn test_pattern_matches_whole_input() {
        let rule = ValidationRule::Pattern {
            pattern: "[12]".to_string(),
        };
        assert!(rule.matches("1").unwrap());
        assert!(rule.matches("2").unwrap());
        assert!(!rule.matches("12").unwrap());
        assert!(!rule.matches("3").unwrap());
    }

    #[test]
    fn test_rule_deserializes_from_script_json() {
        let rule: ValidationRule =
            serde_json::from_value(serde_json::json!({"type": "exact_length", "length": 6}))
                .unwrap();
        assert_eq!(rule, ValidationRule::ExactLength { length: 6 });
    }

    #[test]
    fn test_invalid_rules_rejected() {
        assert!(ValidationRule::ExactLength { length: 0 }.validate().is_err());
        let broken = ValidationRule::Pattern {
            pattern: "[0-9".to_string(),
        };
        assert!(broken.validate().is_err());
        assert!(broken.matches("1").is_err());
    }
}
