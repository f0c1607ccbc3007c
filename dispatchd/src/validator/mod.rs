//! Declarative request body validation
//!
//! Rules map attribute names to comma-separated rule tokens and are applied
//! against a parsed JSON value. Rules run in lexicographic attribute order
//! (the rules map is a `BTreeMap`), so error output is deterministic. The
//! special `*` attribute checks the root value itself and aborts the whole
//! pass when it fails.
//!
//! Supported tokens: `is_object`, `is_string`, `is_number`, `is_uuid`,
//! `is_array_of_strings`, `confirmed`, `nullable`.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use uuid::Uuid;

/// The outcome of one validation pass.
///
/// `errors` maps attribute names to arrays of message strings; `success` is
/// simply "no errors recorded". serde_json's default object map iterates in
/// key order, which keeps serialized error output stable.
#[derive(Debug, Default)]
pub struct Validation {
    errors: Map<String, Value>,
    success: bool,
}

impl Validation {
    /// Run `rules` against `value` and collect every violation.
    #[must_use]
    pub fn make(rules: &BTreeMap<String, String>, value: &Value) -> Self {
        let mut validation = Self::default();

        for (attribute, rule) in rules {
            if validation.per_rule(value, attribute, rule) {
                break;
            }
        }

        validation.success = validation.errors.is_empty();
        validation
    }

    /// Whether the pass recorded no errors.
    #[must_use]
    pub fn success(&self) -> bool {
        self.success
    }

    /// Attribute → message-array error object.
    #[must_use]
    pub fn errors(&self) -> &Map<String, Value> {
        &self.errors
    }

    /// Consume the pass and return the error object.
    #[must_use]
    pub fn into_errors(self) -> Map<String, Value> {
        self.errors
    }

    // Returns true when the whole pass must stop.
    fn per_rule(&mut self, value: &Value, attribute: &str, rule: &str) -> bool {
        if attribute == "*" {
            if !value.is_object() {
                self.insert_or_push(attribute, "Message must be an JSON object.".into());
                return true;
            }
            return false;
        }

        for scoped_rule in rule.split(',') {
            if self.per_scoped_rule(value, attribute, scoped_rule) {
                break;
            }
        }
        false
    }

    // Returns true when the remaining tokens for this attribute must be
    // skipped (the attribute is absent).
    fn per_scoped_rule(&mut self, value: &Value, attribute: &str, rule: &str) -> bool {
        if value.get(attribute).is_none() && rule != "nullable" {
            self.insert_or_push(attribute, format!("Attribute {attribute} is required."));
            return true;
        }

        match rule {
            "is_string" => self.on_string_rule(value, attribute),
            "is_uuid" => self.on_uuid_rule(value, attribute),
            "confirmed" => self.on_confirmation_rule(value, attribute),
            "is_object" => self.on_object_rule(value, attribute),
            "is_number" => self.on_number_rule(value, attribute),
            "is_array_of_strings" => self.on_array_of_strings_rule(value, attribute),
            _ => {}
        }

        false
    }

    fn on_string_rule(&mut self, value: &Value, attribute: &str) {
        if !value[attribute].is_string() {
            self.insert_or_push(attribute, format!("Attribute {attribute} must be string."));
        }
    }

    fn on_number_rule(&mut self, value: &Value, attribute: &str) {
        if !value[attribute].is_i64() {
            self.insert_or_push(attribute, format!("Attribute {attribute} must be a number."));
        }
    }

    fn on_object_rule(&mut self, value: &Value, attribute: &str) {
        if !value[attribute].is_object() {
            self.insert_or_push(attribute, format!("Attribute {attribute} must be an object."));
        }
    }

    fn on_uuid_rule(&mut self, value: &Value, attribute: &str) {
        match value[attribute].as_str() {
            None => {
                self.insert_or_push(attribute, format!("Attribute {attribute} must be string."));
            }
            Some(candidate) => {
                if Uuid::parse_str(candidate).is_err() {
                    self.insert_or_push(attribute, format!("Attribute {attribute} must be uuid."));
                }
            }
        }
    }

    fn on_confirmation_rule(&mut self, value: &Value, attribute: &str) {
        let companion = format!("{attribute}_confirmation");
        match value.get(&companion) {
            None => {
                self.insert_or_push(attribute, format!("Attribute {companion} must be present."));
            }
            Some(confirmation) => match confirmation.as_str() {
                None => {
                    self.insert_or_push(attribute, format!("Attribute {companion} must be string."));
                }
                Some(confirmation) => {
                    if value[attribute].as_str() != Some(confirmation) {
                        self.insert_or_push(
                            attribute,
                            format!("Attribute {attribute} and {companion} must be equals."),
                        );
                    }
                }
            },
        }
    }

    fn on_array_of_strings_rule(&mut self, value: &Value, attribute: &str) {
        let Some(elements) = value[attribute].as_array() else {
            self.insert_or_push(attribute, format!("Attribute {attribute} must be an array."));
            return;
        };

        if elements.is_empty() {
            self.insert_or_push(attribute, format!("Attribute {attribute} cannot be empty."));
            return;
        }

        for (position, element) in elements.iter().enumerate() {
            if !element.is_string() {
                self.insert_or_push(
                    attribute,
                    format!("Attribute {attribute} at position {position} must be string."),
                );
            }
        }
    }

    fn insert_or_push(&mut self, key: &str, message: String) {
        self.errors
            .entry(key.to_string())
            .or_insert_with(|| Value::Array(Vec::new()))
            .as_array_mut()
            .expect("error entries are always arrays")
            .push(Value::String(message));
    }
}
