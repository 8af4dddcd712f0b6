//! Maps agent replies of unknown shape onto [`CanonicalEnvelope`].
//!
//! The agent service does not commit to one schema, so the reply shape is
//! inferred from which keys are present. Rules are tried in table order and
//! the first match wins; the last rule accepts anything, which keeps
//! [`normalize`] total.

use serde_json::{Map, Value};

use crate::models::envelope::{CanonicalEnvelope, EnvelopeStatus};

pub const EMPTY_RESPONSE_MESSAGE: &str = "Empty response from agent";

struct ShapeRule {
    name: &'static str,
    matches: fn(&Value) -> bool,
    apply: fn(&Value) -> CanonicalEnvelope,
}

static SHAPE_RULES: [ShapeRule; 9] = [
    ShapeRule {
        name: "empty",
        matches: Value::is_null,
        apply: empty_reply,
    },
    ShapeRule {
        name: "text",
        matches: Value::is_string,
        apply: text_reply,
    },
    ShapeRule {
        name: "scalar",
        matches: is_scalar,
        apply: scalar_reply,
    },
    ShapeRule {
        name: "status_and_result",
        matches: has_status_and_result,
        apply: status_and_result_reply,
    },
    ShapeRule {
        name: "status_only",
        matches: has_status_only,
        apply: status_only_reply,
    },
    ShapeRule {
        name: "result_only",
        matches: has_result_only,
        apply: result_only_reply,
    },
    ShapeRule {
        name: "message",
        matches: has_text_message,
        apply: message_reply,
    },
    ShapeRule {
        name: "wrapped_response",
        matches: has_response,
        apply: wrapped_response_reply,
    },
    ShapeRule {
        name: "passthrough",
        matches: any_value,
        apply: passthrough_reply,
    },
];

/// Never fails: every JSON value maps to exactly one envelope.
pub fn normalize(parsed: &Value) -> CanonicalEnvelope {
    match matching_rule(parsed) {
        Some(rule) => (rule.apply)(parsed),
        None => passthrough_reply(parsed),
    }
}

/// Name of the rule [`normalize`] would apply, for diagnostics.
pub fn detect_shape(parsed: &Value) -> &'static str {
    matching_rule(parsed)
        .map(|rule| rule.name)
        .unwrap_or("passthrough")
}

fn matching_rule(parsed: &Value) -> Option<&'static ShapeRule> {
    SHAPE_RULES.iter().find(|rule| (rule.matches)(parsed))
}

fn any_value(_: &Value) -> bool {
    true
}

fn has_key(value: &Value, key: &str) -> bool {
    value
        .as_object()
        .map(|map| map.contains_key(key))
        .unwrap_or(false)
}

fn is_scalar(value: &Value) -> bool {
    value.is_number() || value.is_boolean()
}

fn has_status_and_result(value: &Value) -> bool {
    has_key(value, "status") && has_key(value, "result")
}

fn has_status_only(value: &Value) -> bool {
    has_key(value, "status") && !has_key(value, "result")
}

fn has_result_only(value: &Value) -> bool {
    has_key(value, "result") && !has_key(value, "status")
}

fn has_text_message(value: &Value) -> bool {
    value.get("message").map(Value::is_string).unwrap_or(false)
}

fn has_response(value: &Value) -> bool {
    has_key(value, "response")
}

fn empty_reply(_: &Value) -> CanonicalEnvelope {
    CanonicalEnvelope::error(EMPTY_RESPONSE_MESSAGE)
}

fn text_reply(value: &Value) -> CanonicalEnvelope {
    let text = value.as_str().unwrap_or_default().to_string();
    text_envelope(text)
}

fn scalar_reply(value: &Value) -> CanonicalEnvelope {
    let mut result = Map::new();
    result.insert("value".to_string(), value.clone());
    CanonicalEnvelope::success(result).with_message(Some(value.to_string()))
}

fn status_and_result_reply(value: &Value) -> CanonicalEnvelope {
    CanonicalEnvelope::success(coerce_result(value.get("result")))
        .with_status(status_of(value))
        .with_message(passthrough_message(value))
        .with_metadata(passthrough_metadata(value))
}

fn status_only_reply(value: &Value) -> CanonicalEnvelope {
    let rest: Map<String, Value> = value
        .as_object()
        .map(|map| {
            map.iter()
                .filter(|(key, _)| !matches!(key.as_str(), "status" | "message" | "metadata"))
                .map(|(key, item)| (key.clone(), item.clone()))
                .collect()
        })
        .unwrap_or_default();

    CanonicalEnvelope::success(rest)
        .with_status(status_of(value))
        .with_message(passthrough_message(value))
        .with_metadata(passthrough_metadata(value))
}

fn result_only_reply(value: &Value) -> CanonicalEnvelope {
    CanonicalEnvelope::success(coerce_result(value.get("result")))
        .with_message(passthrough_message(value))
        .with_metadata(passthrough_metadata(value))
}

fn message_reply(value: &Value) -> CanonicalEnvelope {
    let text = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    text_envelope(text)
}

fn wrapped_response_reply(value: &Value) -> CanonicalEnvelope {
    normalize(value.get("response").unwrap_or(&Value::Null))
}

fn passthrough_reply(value: &Value) -> CanonicalEnvelope {
    CanonicalEnvelope::success(coerce_result(Some(value)))
}

fn text_envelope(text: String) -> CanonicalEnvelope {
    let mut result = Map::new();
    result.insert("text".to_string(), Value::String(text.clone()));
    CanonicalEnvelope::success(result).with_message(Some(text))
}

fn status_of(value: &Value) -> EnvelopeStatus {
    match value.get("status").and_then(Value::as_str) {
        Some("error") => EnvelopeStatus::Error,
        _ => EnvelopeStatus::Success,
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().map(|f| f == 0.0).unwrap_or(false),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// Falsy values become an empty map; strings land under `text` and any other
/// non-object under `value`.
fn coerce_result(value: Option<&Value>) -> Map<String, Value> {
    let Some(value) = value.filter(|item| !is_falsy(item)) else {
        return Map::new();
    };
    match value {
        Value::Object(map) => map.clone(),
        Value::String(text) => {
            let mut map = Map::new();
            map.insert("text".to_string(), Value::String(text.clone()));
            map
        }
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other.clone());
            map
        }
    }
}

fn passthrough_message(value: &Value) -> Option<String> {
    match value.get("message")? {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

fn passthrough_metadata(value: &Value) -> Option<Map<String, Value>> {
    match value.get("metadata")? {
        Value::Null => None,
        Value::Object(map) => Some(map.clone()),
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other.clone());
            Some(map)
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn envelope_json(value: Value) -> Value {
        serde_json::to_value(normalize(&value)).unwrap()
    }

    #[test]
    fn null_is_an_empty_response_error() {
        let env = normalize(&Value::Null);
        assert_eq!(env.status, EnvelopeStatus::Error);
        assert!(env.result.is_empty());
        assert_eq!(env.message.as_deref(), Some(EMPTY_RESPONSE_MESSAGE));
    }

    #[test]
    fn non_object_values_are_successes() {
        for value in [json!("hello"), json!(""), json!(0), json!(3.5), json!(false), json!(true)] {
            assert_eq!(normalize(&value).status, EnvelopeStatus::Success, "{value}");
        }
    }

    #[test]
    fn string_becomes_text_result() {
        assert_eq!(
            envelope_json(json!("plain answer")),
            json!({"status": "success", "result": {"text": "plain answer"}, "message": "plain answer"})
        );
    }

    #[test]
    fn scalar_becomes_value_result() {
        assert_eq!(
            envelope_json(json!(42)),
            json!({"status": "success", "result": {"value": 42}, "message": "42"})
        );
        assert_eq!(
            envelope_json(json!(true)),
            json!({"status": "success", "result": {"value": true}, "message": "true"})
        );
    }

    #[test]
    fn status_and_result_are_taken_verbatim() {
        assert_eq!(
            envelope_json(json!({"status": "error", "result": {"a": 1}})),
            json!({"status": "error", "result": {"a": 1}})
        );
        assert_eq!(
            envelope_json(json!({
                "status": "done",
                "result": {"a": 1},
                "message": "ok",
                "metadata": {"agent_name": "x"}
            })),
            json!({
                "status": "success",
                "result": {"a": 1},
                "message": "ok",
                "metadata": {"agent_name": "x"}
            })
        );
    }

    #[test]
    fn falsy_result_becomes_empty_map() {
        assert_eq!(
            envelope_json(json!({"status": "success", "result": null})),
            json!({"status": "success", "result": {}})
        );
        assert_eq!(
            envelope_json(json!({"result": ""})),
            json!({"status": "success", "result": {}})
        );
    }

    #[test]
    fn status_without_result_collects_remaining_keys() {
        assert_eq!(
            envelope_json(json!({"status": "ok", "foo": "bar"})),
            json!({"status": "success", "result": {"foo": "bar"}})
        );
        assert_eq!(
            envelope_json(json!({"status": "error", "message": "nope", "metadata": {"k": 1}})),
            json!({"status": "error", "result": {}, "message": "nope", "metadata": {"k": 1}})
        );
    }

    #[test]
    fn result_without_status_is_success() {
        assert_eq!(
            envelope_json(json!({"result": {"score": 7}, "message": "scored"})),
            json!({"status": "success", "result": {"score": 7}, "message": "scored"})
        );
    }

    #[test]
    fn message_only_becomes_text_result() {
        assert_eq!(
            envelope_json(json!({"message": "hi"})),
            json!({"status": "success", "result": {"text": "hi"}, "message": "hi"})
        );
    }

    #[test]
    fn non_string_message_falls_through() {
        assert_eq!(
            envelope_json(json!({"message": {"nested": true}})),
            json!({"status": "success", "result": {"message": {"nested": true}}})
        );
    }

    #[test]
    fn response_wrapper_is_unwrapped() {
        assert_eq!(
            envelope_json(json!({"response": {"result": {"x": 1}}})),
            json!({"status": "success", "result": {"x": 1}})
        );
        assert_eq!(
            envelope_json(json!({"response": "wrapped text"})),
            json!({"status": "success", "result": {"text": "wrapped text"}, "message": "wrapped text"})
        );
        assert_eq!(normalize(&json!({"response": null})).status, EnvelopeStatus::Error);
    }

    #[test]
    fn message_rule_wins_over_response_wrapper() {
        assert_eq!(
            envelope_json(json!({"message": "outer", "response": {"result": {"x": 1}}})),
            json!({"status": "success", "result": {"text": "outer"}, "message": "outer"})
        );
    }

    #[test]
    fn unknown_object_passes_through_as_result() {
        let payload = json!({"benchmarkAnalysis": {"extremeCase": true}, "score": 3});
        assert_eq!(
            envelope_json(payload.clone()),
            json!({"status": "success", "result": payload})
        );
    }

    #[test]
    fn arrays_are_wrapped_under_value() {
        assert_eq!(
            envelope_json(json!([1, 2])),
            json!({"status": "success", "result": {"value": [1, 2]}})
        );
    }

    #[test]
    fn detect_shape_reports_rule_precedence() {
        assert_eq!(detect_shape(&Value::Null), "empty");
        assert_eq!(detect_shape(&json!({"status": "x", "result": {}})), "status_and_result");
        assert_eq!(detect_shape(&json!({"status": "x"})), "status_only");
        assert_eq!(detect_shape(&json!({"result": 1})), "result_only");
        assert_eq!(detect_shape(&json!({"response": {}})), "wrapped_response");
        assert_eq!(detect_shape(&json!({})), "passthrough");
    }
}
