/// JSON request bodies read field by field
///
/// Write endpoints accept any JSON object and read each field on its own, so
/// a field that is `null` or has the wrong type is reported under its own
/// name next to every other invalid field. Numbers are accepted for text
/// fields and kept in their JSON spelling (`5` becomes `"5"`).
///
/// A body that is not a JSON object at all is still rejected by the `Json`
/// extractor as a plain `400 Bad Request`.

use serde_json::{Map, Value};
use tasktrack_shared::validation::{FieldErrors, BLANK, NOT_A_STRING, NULL, REQUIRED};

/// Request body as received
pub type JsonObject = Map<String, Value>;

/// Reads an optional text field
///
/// Returns `None` when the field is absent, and also when it is invalid, in
/// which case the reason is recorded in `errors`.
pub fn optional_text(body: &JsonObject, field: &str, errors: &mut FieldErrors) -> Option<String> {
    match body.get(field)? {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Null => {
            errors.add(field, NULL);
            None
        }
        Value::Bool(_) | Value::Array(_) | Value::Object(_) => {
            errors.add(field, NOT_A_STRING);
            None
        }
    }
}

/// Reads a text field that must be present
pub fn required_text(body: &JsonObject, field: &str, errors: &mut FieldErrors) -> Option<String> {
    if !body.contains_key(field) {
        errors.add(field, REQUIRED);
        return None;
    }
    optional_text(body, field, errors)
}

/// Reads a required text field that must not be blank; the value is not trimmed
pub fn required_nonblank(
    body: &JsonObject,
    field: &str,
    errors: &mut FieldErrors,
) -> Option<String> {
    let text = required_text(body, field, errors)?;
    if text.trim().is_empty() {
        errors.add(field, BLANK);
        return None;
    }
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> JsonObject {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn test_absent_optional_field_is_not_an_error() {
        let mut errors = FieldErrors::new();
        assert_eq!(optional_text(&object(json!({})), "email", &mut errors), None);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_null_and_wrong_types_are_field_errors() {
        let body = object(json!({
            "email": null,
            "first_name": true,
            "last_name": ["x"],
            "description": { "text": "x" },
        }));
        let mut errors = FieldErrors::new();

        for field in ["email", "first_name", "last_name", "description"] {
            assert_eq!(optional_text(&body, field, &mut errors), None);
        }

        assert_eq!(errors.get("email").unwrap(), [NULL]);
        assert_eq!(errors.get("first_name").unwrap(), [NOT_A_STRING]);
        assert_eq!(errors.get("last_name").unwrap(), [NOT_A_STRING]);
        assert_eq!(errors.get("description").unwrap(), [NOT_A_STRING]);
    }

    #[test]
    fn test_numbers_are_read_as_text() {
        let body = object(json!({ "description": 5, "ratio": 2.5 }));
        let mut errors = FieldErrors::new();

        assert_eq!(
            optional_text(&body, "description", &mut errors).as_deref(),
            Some("5")
        );
        assert_eq!(optional_text(&body, "ratio", &mut errors).as_deref(), Some("2.5"));
        assert!(errors.is_empty());
    }

    #[test]
    fn test_required_field_distinguishes_missing_from_null() {
        let mut errors = FieldErrors::new();
        required_text(&object(json!({})), "username", &mut errors);
        required_text(&object(json!({ "password": null })), "password", &mut errors);

        assert_eq!(errors.get("username").unwrap(), [REQUIRED]);
        assert_eq!(errors.get("password").unwrap(), [NULL]);
    }

    #[test]
    fn test_required_nonblank_keeps_surrounding_spaces() {
        let body = object(json!({ "username": " ", "password": " secret " }));
        let mut errors = FieldErrors::new();

        assert_eq!(required_nonblank(&body, "username", &mut errors), None);
        assert_eq!(
            required_nonblank(&body, "password", &mut errors).as_deref(),
            Some(" secret ")
        );
        assert_eq!(errors.get("username").unwrap(), [BLANK]);
    }
}
