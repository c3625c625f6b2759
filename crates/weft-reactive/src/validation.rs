#![forbid(unsafe_code)]

//! Declarative validation: field identities, rules, and rule sets.
//!
//! Rules are supplied programmatically through [`RuleSet`] rather than
//! discovered from attributes or other language-level metadata; the field
//! identity (logical name plus human-readable display name) is resolved once
//! when validation is enabled and handed to every rule evaluation.
//!
//! Validation failures are first-class observable state on the cell; they
//! are never surfaced as `Err` and never panic.
//!
//! # Example
//!
//! ```
//! use weft_reactive::{FieldIdentity, ObservableValue, RuleSet, rules};
//!
//! let name = ObservableValue::new(String::from("Ada"));
//! name.enable_validation(
//!     FieldIdentity::new("name").display("Full name"),
//!     RuleSet::new().rule(rules::required()).rule(rules::max_length(32)),
//! );
//!
//! name.set(String::new());
//! assert!(name.has_errors());
//! assert_eq!(name.errors(), vec!["Full name is required.".to_string()]);
//! ```

use std::sync::Arc;

/// Logical identity of the field a cell's value represents.
///
/// Used only for validation: rules receive it to produce human-readable
/// messages. The display name defaults to the logical name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldIdentity {
    name: String,
    display_name: Option<String>,
}

impl FieldIdentity {
    /// Create a field identity from a logical name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
        }
    }

    /// Attach a human-readable display name.
    #[must_use]
    pub fn display(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// The logical field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The display name, falling back to the logical name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

/// A single validation failure: a message plus the names of the fields it
/// concerns (usually just the validated field itself).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationFailure {
    /// Human-readable failure message.
    pub message: String,
    /// Logical names of the fields the failure is associated with.
    pub member_names: Vec<String>,
}

impl ValidationFailure {
    /// Create a failure with a message and no associated field names.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            member_names: Vec::new(),
        }
    }

    /// Create a failure associated with the given field.
    #[must_use]
    pub fn for_field(message: impl Into<String>, field: &FieldIdentity) -> Self {
        Self {
            message: message.into(),
            member_names: vec![field.name().to_string()],
        }
    }
}

/// A validation rule over values of type `T`.
///
/// Returning `None` means the value passes this rule. Closures of the shape
/// `Fn(&T, &FieldIdentity) -> Option<ValidationFailure>` implement this trait
/// directly.
pub trait ValidationRule<T>: Send + Sync {
    /// Evaluate the rule against a candidate value.
    fn validate(&self, value: &T, field: &FieldIdentity) -> Option<ValidationFailure>;
}

impl<T, F> ValidationRule<T> for F
where
    F: Fn(&T, &FieldIdentity) -> Option<ValidationFailure> + Send + Sync,
{
    fn validate(&self, value: &T, field: &FieldIdentity) -> Option<ValidationFailure> {
        self(value, field)
    }
}

/// An ordered collection of validation rules.
///
/// Rules are evaluated in registration order; every failing rule contributes
/// one message, so a single value can carry several errors at once.
pub struct RuleSet<T: 'static> {
    rules: Vec<Arc<dyn ValidationRule<T>>>,
}

impl<T: 'static> Clone for RuleSet<T> {
    fn clone(&self) -> Self {
        Self {
            rules: self.rules.clone(),
        }
    }
}

impl<T: 'static> Default for RuleSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> RuleSet<T> {
    /// Create an empty rule set.
    #[must_use]
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule, preserving evaluation order.
    #[must_use]
    pub fn rule(mut self, rule: impl ValidationRule<T> + 'static) -> Self {
        self.rules.push(Arc::new(rule));
        self
    }

    /// Number of rules in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the set contains no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub(crate) fn evaluate(&self, value: &T, field: &FieldIdentity) -> Vec<ValidationFailure> {
        self.rules
            .iter()
            .filter_map(|rule| rule.validate(value, field))
            .collect()
    }
}

impl<T: 'static> std::fmt::Debug for RuleSet<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleSet").field("rules", &self.len()).finish()
    }
}

/// Ready-made rules for common constraints.
pub mod rules {
    use super::{FieldIdentity, ValidationFailure, ValidationRule};

    /// The string must not be empty or whitespace-only.
    #[must_use]
    pub fn required() -> impl ValidationRule<String> {
        |value: &String, field: &FieldIdentity| {
            if value.trim().is_empty() {
                Some(ValidationFailure::for_field(
                    format!("{} is required.", field.display_name()),
                    field,
                ))
            } else {
                None
            }
        }
    }

    /// The string must be at most `max` characters long.
    #[must_use]
    pub fn max_length(max: usize) -> impl ValidationRule<String> {
        move |value: &String, field: &FieldIdentity| {
            if value.chars().count() > max {
                Some(ValidationFailure::for_field(
                    format!(
                        "{} must be at most {max} characters long.",
                        field.display_name()
                    ),
                    field,
                ))
            } else {
                None
            }
        }
    }

    /// The value must lie within `min..=max`.
    #[must_use]
    pub fn range<T>(min: T, max: T) -> impl ValidationRule<T>
    where
        T: PartialOrd + Copy + std::fmt::Display + Send + Sync,
    {
        move |value: &T, field: &FieldIdentity| {
            if *value < min || *value > max {
                Some(ValidationFailure::for_field(
                    format!(
                        "{} must be between {min} and {max}.",
                        field.display_name()
                    ),
                    field,
                ))
            } else {
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn field() -> FieldIdentity {
        FieldIdentity::new("age").display("Age")
    }

    #[test]
    fn display_name_falls_back_to_name() {
        let plain = FieldIdentity::new("name");
        assert_eq!(plain.display_name(), "name");
        assert_eq!(field().display_name(), "Age");
    }

    #[test]
    fn rules_evaluate_in_order() {
        let set = RuleSet::new()
            .rule(|_: &String, _: &FieldIdentity| Some(ValidationFailure::new("first")))
            .rule(|_: &String, _: &FieldIdentity| None)
            .rule(|_: &String, _: &FieldIdentity| Some(ValidationFailure::new("second")));

        let failures = set.evaluate(&String::from("x"), &FieldIdentity::new("f"));
        let messages: Vec<_> = failures.iter().map(|f| f.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second"]);
    }

    #[test]
    fn required_rejects_whitespace() {
        let rule = rules::required();
        let field = FieldIdentity::new("name").display("Full name");
        assert!(rule.validate(&String::from("  "), &field).is_some());
        assert!(rule.validate(&String::from("Ada"), &field).is_none());

        let failure = rule.validate(&String::new(), &field).unwrap();
        assert_eq!(failure.message, "Full name is required.");
        assert_eq!(failure.member_names, vec!["name".to_string()]);
    }

    #[test]
    fn max_length_counts_chars_not_bytes() {
        let rule = rules::max_length(3);
        let field = FieldIdentity::new("tag");
        assert!(rule.validate(&String::from("äöü"), &field).is_none());
        assert!(rule.validate(&String::from("äöüß"), &field).is_some());
    }

    #[test]
    fn range_is_inclusive() {
        let rule = rules::range(1, 10);
        assert!(rule.validate(&1, &field()).is_none());
        assert!(rule.validate(&10, &field()).is_none());
        assert!(rule.validate(&0, &field()).is_some());
        assert!(rule.validate(&11, &field()).is_some());
    }
}
