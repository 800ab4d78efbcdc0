//! Field-level constraint validation
//!
//! Mirrors browser constraint validation: `required`, `pattern`,
//! `min`/`max` and `minlength`/`maxlength`, interpreted according to the
//! field's input kind. Every rule except `required` is skipped for an empty
//! value, and patterns must match the whole value.

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::money::parse_amount;

/// Date format used by date inputs
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Input kind of a field; decides how `min`/`max` are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Password,
    Number,
    Date,
    Select,
    Hidden,
}

/// Declarative rules for one field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRule {
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

impl FieldRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn set_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn min(mut self, min: impl Into<String>) -> Self {
        self.min = Some(min.into());
        self
    }

    pub fn max(mut self, max: impl Into<String>) -> Self {
        self.max = Some(max.into());
        self
    }

    pub fn min_length(mut self, len: usize) -> Self {
        self.min_length = Some(len);
        self
    }

    pub fn max_length(mut self, len: usize) -> Self {
        self.max_length = Some(len);
        self
    }
}

/// Why a field failed validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum Violation {
    ValueMissing,
    PatternMismatch,
    BadInput,
    RangeUnderflow,
    RangeOverflow,
    TooShort,
    TooLong,
    /// A cross-field or business check (amount, password match)
    Custom(String),
}

/// Check a single value against its rules, returning the first violation
pub fn check_value(kind: FieldKind, rule: &FieldRule, value: &str) -> Option<Violation> {
    if value.is_empty() {
        return rule.required.then_some(Violation::ValueMissing);
    }

    match kind {
        FieldKind::Number => {
            let Ok(number) = parse_amount(value) else {
                return Some(Violation::BadInput);
            };
            let bound = |b: &Option<String>| b.as_deref().and_then(|s| parse_amount(s).ok());
            if let Some(min) = bound(&rule.min) {
                if number < min {
                    return Some(Violation::RangeUnderflow);
                }
            }
            if let Some(max) = bound(&rule.max) {
                if number > max {
                    return Some(Violation::RangeOverflow);
                }
            }
        }
        FieldKind::Date => {
            let Ok(date) = NaiveDate::parse_from_str(value, DATE_FORMAT) else {
                return Some(Violation::BadInput);
            };
            let bound = |b: &Option<String>| {
                b.as_deref()
                    .and_then(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).ok())
            };
            if let Some(min) = bound(&rule.min) {
                if date < min {
                    return Some(Violation::RangeUnderflow);
                }
            }
            if let Some(max) = bound(&rule.max) {
                if date > max {
                    return Some(Violation::RangeOverflow);
                }
            }
        }
        _ => {}
    }

    let len = value.chars().count();
    if rule.min_length.is_some_and(|min| len < min) {
        return Some(Violation::TooShort);
    }
    if rule.max_length.is_some_and(|max| len > max) {
        return Some(Violation::TooLong);
    }

    if let Some(pattern) = &rule.pattern {
        // An unparseable pattern is ignored, as browsers do
        if let Ok(re) = Regex::new(&format!("^(?:{})$", pattern)) {
            if !re.is_match(value) {
                return Some(Violation::PatternMismatch);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_and_empty() {
        let rule = FieldRule::new().required().pattern("[0-9]{10}");
        assert_eq!(
            check_value(FieldKind::Text, &rule, ""),
            Some(Violation::ValueMissing)
        );
        // optional empty fields skip every other rule
        let optional = FieldRule::new().pattern("[0-9]{10}");
        assert_eq!(check_value(FieldKind::Text, &optional, ""), None);
    }

    #[test]
    fn test_pattern_is_anchored() {
        let rule = FieldRule::new().pattern("[0-9]{9}");
        assert_eq!(check_value(FieldKind::Text, &rule, "123456789"), None);
        assert_eq!(
            check_value(FieldKind::Text, &rule, "1234567890"),
            Some(Violation::PatternMismatch)
        );
        // alternation must not escape the anchors
        let alt = FieldRule::new().pattern("a|b");
        assert_eq!(
            check_value(FieldKind::Text, &alt, "ab"),
            Some(Violation::PatternMismatch)
        );
    }

    #[test]
    fn test_invalid_pattern_is_ignored() {
        let rule = FieldRule::new().pattern("[unclosed");
        assert_eq!(check_value(FieldKind::Text, &rule, "anything"), None);
    }

    #[test]
    fn test_number_bounds() {
        let rule = FieldRule::new().min("0.01").max("1000");
        assert_eq!(check_value(FieldKind::Number, &rule, "12.50"), None);
        assert_eq!(
            check_value(FieldKind::Number, &rule, "0"),
            Some(Violation::RangeUnderflow)
        );
        assert_eq!(
            check_value(FieldKind::Number, &rule, "1000.01"),
            Some(Violation::RangeOverflow)
        );
        assert_eq!(
            check_value(FieldKind::Number, &rule, "twelve"),
            Some(Violation::BadInput)
        );
    }

    #[test]
    fn test_date_bounds() {
        let rule = FieldRule::new().max("2024-06-01");
        assert_eq!(check_value(FieldKind::Date, &rule, "1990-01-31"), None);
        assert_eq!(
            check_value(FieldKind::Date, &rule, "2024-06-02"),
            Some(Violation::RangeOverflow)
        );
        assert_eq!(
            check_value(FieldKind::Date, &rule, "31/01/1990"),
            Some(Violation::BadInput)
        );
    }

    #[test]
    fn test_length_rules() {
        let rule = FieldRule::new().min_length(2).max_length(4);
        assert_eq!(
            check_value(FieldKind::Password, &rule, "a"),
            Some(Violation::TooShort)
        );
        assert_eq!(check_value(FieldKind::Password, &rule, "abcd"), None);
        assert_eq!(
            check_value(FieldKind::Password, &rule, "abcde"),
            Some(Violation::TooLong)
        );
    }
}
