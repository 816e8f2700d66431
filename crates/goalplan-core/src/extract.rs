//! Recover a JSON object embedded in free-form model output.
//!
//! The scanner finds the first `{`, then counts braces until the depth
//! returns to zero. Counting is purely lexical: braces inside string
//! literals are counted too, so a literal such as `"}"` can end the
//! candidate early. Such candidates fail to parse and surface as
//! [`ExtractError::MalformedJson`] rather than being silently repaired.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

/// A comma followed by optional whitespace and a closing bracket or brace.
static TRAILING_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",(\s*[}\]])").expect("trailing comma pattern is valid"));

/// Errors from [`extract_json`].
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no JSON object found in model output")]
    NoJsonFound,

    #[error("could not extract balanced JSON from model output")]
    UnbalancedJson,

    #[error("malformed JSON in model output: {0}")]
    MalformedJson(#[source] serde_json::Error),
}

/// Locate and parse the first balanced `{...}` object in `text`.
///
/// Text after the first balanced object is ignored. If the candidate does
/// not parse, trailing commas before `}` or `]` are stripped and the parse
/// is retried once.
pub fn extract_json(text: &str) -> Result<Map<String, Value>, ExtractError> {
    let candidate = balanced_candidate(text)?;

    match serde_json::from_str(candidate) {
        Ok(object) => Ok(object),
        Err(_) => {
            let repaired = strip_trailing_commas(candidate);
            serde_json::from_str(&repaired).map_err(ExtractError::MalformedJson)
        }
    }
}

/// Return the substring from the first `{` to the brace that closes it.
fn balanced_candidate(text: &str) -> Result<&str, ExtractError> {
    let start = text.find('{').ok_or(ExtractError::NoJsonFound)?;

    // `{` and `}` are single-byte in UTF-8 and never appear inside a
    // multi-byte sequence, so byte offsets are valid slice boundaries.
    let mut depth = 0usize;
    for (offset, byte) in text.as_bytes()[start..].iter().enumerate() {
        match byte {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    Err(ExtractError::UnbalancedJson)
}

/// Remove every comma that directly precedes a closing `}` or `]`.
fn strip_trailing_commas(candidate: &str) -> String {
    TRAILING_COMMA.replace_all(candidate, "$1").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_object_surrounded_by_commentary() {
        let text = r#"Sure! Here you go: {"goal": "x", "n": 3} Hope that helps {"other": 1}"#;
        let obj = extract_json(text).unwrap();
        assert_eq!(Value::Object(obj), json!({"goal": "x", "n": 3}));
    }

    #[test]
    fn extracts_bare_object() {
        let obj = extract_json(r#"{"a": 1}"#).unwrap();
        assert_eq!(obj["a"], json!(1));
    }

    #[test]
    fn extracts_nested_objects() {
        let text = "prefix {\"a\": {\"b\": {\"c\": [1, {\"d\": 2}]}}} suffix }}}";
        let obj = extract_json(text).unwrap();
        assert_eq!(obj["a"]["b"]["c"][1]["d"], json!(2));
    }

    #[test]
    fn ignores_text_before_in_code_fence() {
        let text = "```json\n{\"tasks\": []}\n```";
        let obj = extract_json(text).unwrap();
        assert_eq!(obj["tasks"], json!([]));
    }

    #[test]
    fn repairs_trailing_comma_before_bracket() {
        let text = r#"{"tasks": [{"id": 1},], "n": 2}"#;
        let obj = extract_json(text).unwrap();
        assert_eq!(obj["tasks"], json!([{"id": 1}]));
    }

    #[test]
    fn repairs_trailing_comma_before_brace_with_whitespace() {
        let text = "{\"a\": 1,\n   }";
        let obj = extract_json(text).unwrap();
        assert_eq!(Value::Object(obj), json!({"a": 1}));
    }

    #[test]
    fn repairs_multiple_trailing_commas() {
        let text = r#"{"a": [1, 2, ], "b": {"c": 3, }, }"#;
        let obj = extract_json(text).unwrap();
        assert_eq!(Value::Object(obj), json!({"a": [1, 2], "b": {"c": 3}}));
    }

    #[test]
    fn no_brace_is_no_json_found() {
        assert!(matches!(
            extract_json("I cannot help with that."),
            Err(ExtractError::NoJsonFound)
        ));
        assert!(matches!(extract_json(""), Err(ExtractError::NoJsonFound)));
    }

    #[test]
    fn unmatched_open_brace_is_unbalanced() {
        assert!(matches!(
            extract_json(r#"here: {"a": {"b": 1}"#),
            Err(ExtractError::UnbalancedJson)
        ));
    }

    #[test]
    fn truncated_output_is_unbalanced() {
        assert!(matches!(
            extract_json(r#"{"goal": "x", "tasks": [{"id": 1"#),
            Err(ExtractError::UnbalancedJson)
        ));
    }

    #[test]
    fn unparseable_candidate_is_malformed() {
        assert!(matches!(
            extract_json("{not json at all}"),
            Err(ExtractError::MalformedJson(_))
        ));
    }

    #[test]
    fn brace_inside_string_literal_is_counted() {
        // The `}` inside the string closes the candidate early.
        let result = extract_json(r#"{"title": "close }", "n": 1}"#);
        assert!(matches!(result, Err(ExtractError::MalformedJson(_))));
    }

    #[test]
    fn balanced_braces_inside_strings_are_harmless() {
        let obj = extract_json(r#"{"title": "use {braces}", "n": 1}"#).unwrap();
        assert_eq!(obj["title"], json!("use {braces}"));
    }

    #[test]
    fn multibyte_text_around_object() {
        let obj = extract_json("Voilà — le plan: {\"goal\": \"café\"} ✅").unwrap();
        assert_eq!(obj["goal"], json!("café"));
    }

    #[test]
    fn leading_close_brace_before_object_is_skipped() {
        let obj = extract_json(r#"} stray {"a": 1}"#).unwrap();
        assert_eq!(obj["a"], json!(1));
    }
}
