/// Query filters for list endpoints
///
/// Filters arrive as raw query-string pairs and are parsed once into typed
/// structs. Each parsed filter can then be evaluated two ways:
///
/// - in memory, against a model value (`matches`)
/// - in SQL, by appending `AND ...` clauses to an `sqlx::QueryBuilder`
///   (`push_conditions`)
///
/// Both paths must agree; the in-memory store and the Postgres store rely on
/// the same parsed value.
///
/// Absent and empty parameters impose no constraint. All constraints are
/// combined with AND.
///
/// # Example
///
/// ```
/// use std::collections::HashMap;
/// use tasktrack_shared::filter::task::TaskFilter;
///
/// let params = HashMap::from([
///     ("description__contains".to_string(), "milk".to_string()),
///     ("completed".to_string(), "false".to_string()),
/// ]);
///
/// let filter = TaskFilter::from_params(&params, chrono_tz::UTC).unwrap();
/// assert_eq!(filter.completed, Some(false));
/// ```

pub mod ordering;
pub mod task;
pub mod user;

use std::collections::HashMap;

/// Raw query-string parameters
pub type QueryParams = HashMap<String, String>;

pub const INVALID_DATE: &str = "Enter a valid date.";
pub const INVALID_CHOICE: &str = "Select a valid choice.";
pub const INVALID_REGEX: &str = "Enter a valid regular expression.";

/// Returns a parameter's value, treating an empty string as absent
pub(crate) fn param<'a>(params: &'a QueryParams, name: &str) -> Option<&'a str> {
    params
        .get(name)
        .map(String::as_str)
        .filter(|value| !value.is_empty())
}

/// Escapes `LIKE` wildcards so user input matches literally (escape char `\`)
pub(crate) fn like_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

pub(crate) fn icontains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

pub(crate) fn istartswith(haystack: &str, prefix: &str) -> bool {
    haystack.to_lowercase().starts_with(&prefix.to_lowercase())
}

pub(crate) fn iexact(left: &str, right: &str) -> bool {
    left.to_lowercase() == right.to_lowercase()
}
