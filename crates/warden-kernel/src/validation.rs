//! Composable predicates over untyped boundary values.
//!
//! Every function here is pure: it takes `&Value`, never mutates it, and
//! always answers with a `bool`. A [`Validator`] is the boxed predicate shape
//! accepted by [`GatewayCallSpec`](crate::gateway::GatewayCallSpec) for both
//! parameter and result checks.
//!
//! ```rust
//! use serde_json::json;
//! use warden_kernel::validation::{has_required_properties, is_array_of, validator};
//!
//! let tags = is_array_of(validator(|v| v.is_string()));
//! assert!(tags(&json!(["a", "b"])));
//! assert!(!tags(&json!(["a", 1])));
//!
//! assert!(has_required_properties(&json!({"path": "a.txt", "extra": 1}), &["path"]));
//! ```

use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

/// Boxed predicate over an untyped value.
pub type Validator = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Box a plain predicate into a [`Validator`].
pub fn validator<F>(f: F) -> Validator
where
    F: Fn(&Value) -> bool + Send + Sync + 'static,
{
    Arc::new(f)
}

// ─────────────────────────────────────────────────────────────────────────────
// Shape predicates
// ─────────────────────────────────────────────────────────────────────────────

/// `true` for null, strings, numbers and booleans.
pub fn is_primitive(value: &Value) -> bool {
    matches!(
        value,
        Value::Null | Value::String(_) | Value::Number(_) | Value::Bool(_)
    )
}

/// `true` for a structured record (a JSON object). Arrays and null are not
/// plain objects.
pub fn is_plain_object(value: &Value) -> bool {
    value.is_object()
}

/// `true` if `value` is a plain object carrying every key in `names`.
///
/// Presence only: the property values are not type-checked and extra keys
/// are permitted.
pub fn has_required_properties(value: &Value, names: &[&str]) -> bool {
    match value.as_object() {
        Some(map) => names.iter().all(|name| map.contains_key(*name)),
        None => false,
    }
}

/// Build a validator that accepts an array whose every element passes
/// `item`. The empty array is accepted.
pub fn is_array_of(item: Validator) -> Validator {
    validator(move |value: &Value| match value.as_array() {
        Some(items) => items.iter().all(|v| item(v)),
        None => false,
    })
}

/// Build a validator that accepts only when every validator in `all` does.
pub fn all_of(all: Vec<Validator>) -> Validator {
    validator(move |value: &Value| all.iter().all(|v| v(value)))
}

/// Adapt a fallible external schema check into a [`Validator`].
///
/// An `Err` from `check` is a rejection. A panic inside `check` is also a
/// rejection: it is caught here and never reaches the caller.
pub fn matches_schema<F, E>(check: F) -> Validator
where
    F: Fn(&Value) -> Result<(), E> + Send + Sync + 'static,
{
    validator(move |value: &Value| {
        catch_unwind(AssertUnwindSafe(|| check(value).is_ok())).unwrap_or(false)
    })
}

/// Accept any value that deserializes into `T`.
///
/// This is the serde equivalent of a schema library's "safe parse".
pub fn matches_type<T>() -> Validator
where
    T: DeserializeOwned + 'static,
{
    matches_schema(|value: &Value| serde_json::from_value::<T>(value.clone()).map(|_| ()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Boundary heuristics
// ─────────────────────────────────────────────────────────────────────────────

/// Markup / script fragments that should never cross the boundary verbatim.
/// Matched case-insensitively.
pub const SCRIPT_MARKERS: &[&str] = &[
    "<script",
    "javascript:",
    "data:text/html",
    "vbscript:",
    "onload=",
    "onerror=",
    "onclick=",
    "onmouseover=",
];

static SQL_INJECTION: Lazy<Vec<String>> = Lazy::new(|| {
    [
        "' OR ",
        "\" OR ",
        "' OR '1'='1",
        "\" OR \"1\"=\"1",
        "'; DROP TABLE",
        "\"; DROP TABLE",
        "'; SELECT ",
        "'; INSERT ",
    ]
    .iter()
    .map(|p| p.to_uppercase())
    .collect()
});

const TRAVERSAL_MARKERS: &[&str] = &[
    "..",
    "~",
    "/etc/",
    "C:\\Windows\\",
    "/dev/",
    "/proc/",
    "/sys/",
    "/var/log/",
    "/root/",
    "/home/",
];

/// Return the first script marker found in `input`, if any.
pub fn find_script_marker(input: &str) -> Option<&'static str> {
    let lower = input.to_lowercase();
    SCRIPT_MARKERS.iter().copied().find(|m| lower.contains(m))
}

/// Clean-input heuristic: no script markers, no SQL-injection fragments, no
/// NUL bytes.
pub fn is_clean_string(input: &str) -> bool {
    if input.contains('\0') || find_script_marker(input).is_some() {
        return false;
    }
    let upper = input.to_uppercase();
    !SQL_INJECTION.iter().any(|p| upper.contains(p.as_str()))
}

/// `true` for a path with no traversal components and no sensitive system
/// prefix.
pub fn is_safe_relative_path(path: &str) -> bool {
    !path.is_empty() && !TRAVERSAL_MARKERS.iter().any(|m| path.contains(m))
}

/// Validator: every string reachable inside the value passes
/// [`is_clean_string`]. Object keys are checked too.
pub fn clean_strings() -> Validator {
    fn walk(value: &Value) -> bool {
        match value {
            Value::String(s) => is_clean_string(s),
            Value::Array(items) => items.iter().all(walk),
            Value::Object(map) => map.iter().all(|(k, v)| is_clean_string(k) && walk(v)),
            _ => true,
        }
    }
    validator(walk)
}

/// Validator: `value[name]` is a string accepted by
/// [`is_safe_relative_path`].
pub fn safe_path_property(name: &'static str) -> Validator {
    validator(move |value: &Value| {
        value
            .get(name)
            .and_then(Value::as_str)
            .is_some_and(is_safe_relative_path)
    })
}
