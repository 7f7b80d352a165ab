//! Tool-call argument decoding.
//!
//! Some model families emit the argument object as a JSON string that itself
//! contains JSON (`"{\"query\":\"x\"}"`). For models matching one of the
//! configured name patterns the outer string layer is peeled off first.

use serde_json::Value;
use voxloop_core::error::ToolError;

/// Whether `model` matches any of the double-encoding name patterns.
pub fn is_double_encoding_model(model: &str, patterns: &[String]) -> bool {
    let model = model.to_ascii_lowercase();
    patterns
        .iter()
        .filter(|p| !p.is_empty())
        .any(|p| model.contains(&p.to_ascii_lowercase()))
}

/// Decode the raw argument text of one tool call.
///
/// An empty payload decodes to `{}`. With `unwrap_string` set, a payload that
/// parses as a JSON string is parsed a second time; any other payload is
/// parsed as-is, so well-behaved responses from those models still work.
pub fn decode_arguments(
    tool_name: &str,
    raw: &str,
    unwrap_string: bool,
) -> Result<Value, ToolError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Value::Object(Default::default()));
    }

    let value: Value = serde_json::from_str(raw).map_err(|e| {
        ToolError::InvalidArguments(format!("{tool_name}: malformed arguments: {e}"))
    })?;

    match value {
        Value::String(inner) if unwrap_string => serde_json::from_str(&inner).map_err(|e| {
            ToolError::InvalidArguments(format!("{tool_name}: malformed inner arguments: {e}"))
        }),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn patterns() -> Vec<String> {
        vec!["gemma".into()]
    }

    #[test]
    fn model_matching_is_substring_and_case_insensitive() {
        assert!(is_double_encoding_model("gemma-7b-it", &patterns()));
        assert!(is_double_encoding_model("google/Gemma2-9b", &patterns()));
        assert!(!is_double_encoding_model("llama3-70b-8192", &patterns()));
        assert!(!is_double_encoding_model("llama3", &[String::new()]));
    }

    #[test]
    fn plain_object_arguments() {
        let v = decode_arguments("web_search", r#"{"query":"rust"}"#, false).unwrap();
        assert_eq!(v, json!({"query": "rust"}));
    }

    #[test]
    fn double_encoded_arguments_are_unwrapped() {
        let raw = r#""{\"query\":\"capital of France\"}""#;
        let v = decode_arguments("web_search", raw, true).unwrap();
        assert_eq!(v, json!({"query": "capital of France"}));
    }

    #[test]
    fn unwrap_tolerates_already_decoded_payload() {
        let v = decode_arguments("web_search", r#"{"query":"rust"}"#, true).unwrap();
        assert_eq!(v, json!({"query": "rust"}));
    }

    #[test]
    fn string_payload_is_left_alone_without_unwrap() {
        let v = decode_arguments("web_search", r#""{\"query\":\"x\"}""#, false).unwrap();
        assert!(v.is_string());
    }

    #[test]
    fn empty_payload_is_empty_object() {
        assert_eq!(decode_arguments("t", "  ", false).unwrap(), json!({}));
    }

    #[test]
    fn malformed_payload_is_rejected() {
        let err = decode_arguments("web_search", "{query:", false).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(msg) if msg.contains("web_search")));

        let err = decode_arguments("web_search", r#""not json""#, true).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
