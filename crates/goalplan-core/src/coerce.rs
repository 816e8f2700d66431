//! Best-effort coercion of loosely typed model output into typed fields.
//!
//! Each function returns a [`Coerced`] value recording whether the default
//! was substituted, so callers can log or count recoveries without ever
//! failing on a single bad field.

use serde_json::Value;

/// A coerced field value plus whether a default stood in for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coerced<T> {
    pub value: T,
    pub defaulted: bool,
}

impl<T> Coerced<T> {
    fn kept(value: T) -> Self {
        Self {
            value,
            defaulted: false,
        }
    }

    fn default_to(value: T) -> Self {
        Self {
            value,
            defaulted: true,
        }
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

/// Interpret a JSON value as an integer, the way a lenient reader would.
///
/// Returns `None` for null, arrays, objects, non-finite numbers and
/// strings that are not a plain base-10 integer.
pub fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite())
                .map(|f| f.trunc() as i64)
        }),
        Value::Bool(b) => Some(i64::from(*b)),
        Value::String(s) => parse_int_str(s),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn parse_int_str(s: &str) -> Option<i64> {
    let s = s.trim();
    if s.starts_with('_') || s.ends_with('_') || s.contains("__") {
        return None;
    }
    s.replace('_', "").parse().ok()
}

/// Coerce an optional field to an integer, substituting `default`.
pub fn coerce_int(value: Option<&Value>, default: i64) -> Coerced<i64> {
    match value.and_then(as_int) {
        Some(n) => Coerced::kept(n),
        None => Coerced::default_to(default),
    }
}

/// Coerce a label such as a priority to a lowercase string.
///
/// Absent and null fall back to `default`; other scalars are stringified.
pub fn coerce_label(value: Option<&Value>, default: &str) -> Coerced<String> {
    match value.and_then(scalar_to_string) {
        Some(s) => Coerced::kept(s.to_lowercase()),
        None => Coerced::default_to(default.to_owned()),
    }
}

/// Coerce a free-text field, keeping strings verbatim.
pub fn coerce_text(value: Option<&Value>) -> Coerced<String> {
    match value.and_then(scalar_to_string) {
        Some(s) => Coerced::kept(s),
        None => Coerced::default_to(String::new()),
    }
}

/// Coerce a list of task ids, dropping elements that are not integers.
pub fn coerce_id_list(value: Option<&Value>) -> Coerced<Vec<i64>> {
    match value {
        None | Some(Value::Null) => Coerced::default_to(Vec::new()),
        Some(Value::Array(items)) => {
            let ids: Vec<i64> = items.iter().filter_map(as_int).collect();
            if ids.len() == items.len() {
                Coerced::kept(ids)
            } else {
                Coerced::default_to(ids)
            }
        }
        Some(other) => match as_int(other) {
            Some(id) => Coerced::kept(vec![id]),
            None => Coerced::default_to(Vec::new()),
        },
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        // Composite values have no sensible text form; serialize them so
        // nothing the model said is silently lost.
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
        Value::Null => None,
    }
}
