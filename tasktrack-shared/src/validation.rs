/// Per-field validation errors
///
/// Every validation step in Tasktrack (request bodies, password policy,
/// query filters) collects its failures into a [`FieldErrors`] map instead of
/// stopping at the first problem, so a client sees every invalid field at once.
///
/// # Example
///
/// ```
/// use tasktrack_shared::validation::{FieldErrors, BLANK};
///
/// let mut errors = FieldErrors::new();
/// errors.add("description", BLANK);
/// errors.add("description", "Another problem.");
///
/// assert_eq!(errors.get("description").map(|m| m.len()), Some(2));
/// assert!(errors.into_result().is_err());
/// ```

use serde::Serialize;
use std::collections::BTreeMap;

/// Message for a required field that was not supplied
pub const REQUIRED: &str = "This field is required.";

/// Message for a text field that is empty or whitespace only
pub const BLANK: &str = "This field may not be blank.";

/// Message for a field sent as JSON `null`
pub const NULL: &str = "This field may not be null.";

/// Message for a text field sent as a boolean, array or object
pub const NOT_A_STRING: &str = "Not a valid string.";

/// Field name to list of messages, serialized as a plain JSON object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(transparent)]
#[error("{} field(s) failed validation", .0.len())]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a map holding exactly one message
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Appends a message for a field
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// Appends several messages for a field; does nothing for an empty iterator
    pub fn extend_field<I>(&mut self, field: &str, messages: I)
    where
        I: IntoIterator<Item = String>,
    {
        for message in messages {
            self.add(field, message);
        }
    }

    /// Moves all messages of `other` into `self`
    pub fn merge(&mut self, other: FieldErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    /// Drops every message for a field
    pub fn remove(&mut self, field: &str) {
        self.0.remove(field);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Names of the failing fields, sorted
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// `Ok(())` when nothing was collected, otherwise `Err(self)`
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<validator::ValidationErrors> for FieldErrors {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut collected = FieldErrors::new();
        for (field, field_errors) in errors.field_errors() {
            for error in field_errors.iter() {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value ({}).", error.code));
                collected.add(field.to_string(), message);
            }
        }
        collected
    }
}
