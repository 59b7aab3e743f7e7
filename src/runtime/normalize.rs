//! Turn whatever the engine printed into strict result types.
//!
//! The untyped payload stops here: callers only ever see
//! [`AlgorithmResult`] or catalog descriptors.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::api::*;

/// Captured engine text, parsed once.
#[derive(Debug, Clone, PartialEq)]
pub enum EnginePayload {
    Structured(Value),
    /// Not JSON; kept verbatim (trimmed) as an unstructured result.
    Text(String),
}

pub fn parse_output(text: &str) -> EnginePayload {
    let trimmed = text.trim();
    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => EnginePayload::Structured(value),
        Err(err) => {
            debug!(error = %err, "engine output is not JSON; wrapping as text");
            EnginePayload::Text(trimmed.to_string())
        }
    }
}

/// Map a payload onto the result shape, filling absent fields with
/// `false` / `None` / empty.
pub fn normalize_result(payload: EnginePayload) -> AlgorithmResult {
    match payload {
        EnginePayload::Text(text) => AlgorithmResult::success(Some(text), Vec::new())
            .with_source(ResultSource::EngineText),
        EnginePayload::Structured(Value::Object(map)) => normalize_object(&map),
        EnginePayload::Structured(Value::String(text)) => {
            AlgorithmResult::success(Some(text), Vec::new()).with_source(ResultSource::EngineText)
        }
        EnginePayload::Structured(other) => AlgorithmResult::success(Some(other.to_string()), Vec::new())
            .with_source(ResultSource::EngineText),
    }
}

fn normalize_object(map: &Map<String, Value>) -> AlgorithmResult {
    let success = map.get("success").and_then(Value::as_bool).unwrap_or(false);
    let derivation = map
        .get("derivation")
        .and_then(Value::as_array)
        .map(|steps| normalize_steps(steps))
        .unwrap_or_default();
    let error_latex = map
        .get("errorLatex")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    if success {
        AlgorithmResult {
            success,
            final_type: map.get("finalType").and_then(text_of),
            derivation,
            error: None,
            error_latex: false,
            source: ResultSource::Engine,
        }
    } else {
        AlgorithmResult {
            success,
            final_type: None,
            derivation,
            error: map.get("error").and_then(text_of),
            error_latex,
            source: ResultSource::Engine,
        }
    }
}

fn normalize_steps(values: &[Value]) -> Vec<DerivationStep> {
    values
        .iter()
        .filter_map(|value| match value {
            Value::Object(map) => Some(normalize_step(map)),
            other => {
                warn!(value = %other, "dropping non-object derivation step");
                None
            }
        })
        .collect()
}

fn normalize_step(map: &Map<String, Value>) -> DerivationStep {
    DerivationStep {
        rule_id: map
            .get("ruleId")
            .or_else(|| map.get("rule"))
            .and_then(text_of)
            .unwrap_or_default(),
        expression: map.get("expression").and_then(text_of).unwrap_or_default(),
        ty: map.get("type").and_then(text_of),
        explanation: map.get("explanation").and_then(text_of),
        children: map
            .get("children")
            .and_then(Value::as_array)
            .map(|children| normalize_steps(children))
            .unwrap_or_default(),
    }
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Decode the `--meta` document: either a bare array of descriptors or an
/// object with an `algorithms` array.
pub fn normalize_catalog(payload: EnginePayload) -> Result<Vec<AlgorithmDescriptor>, PlaygroundError> {
    let value = match payload {
        EnginePayload::Structured(value) => value,
        EnginePayload::Text(text) => {
            return Err(PlaygroundError::engine(format!(
                "engine metadata is not JSON: {}",
                truncate(&text, 80)
            )));
        }
    };
    let list = match value {
        Value::Array(_) => value,
        Value::Object(mut map) => map.remove("algorithms").unwrap_or(Value::Array(Vec::new())),
        _ => Value::Array(Vec::new()),
    };
    serde_json::from_value(list)
        .map_err(|err| PlaygroundError::engine(format!("malformed engine metadata: {err}")))
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    format!("{cut}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn failure_drops_final_type_and_keeps_partial_trace() {
        let payload = EnginePayload::Structured(json!({
            "success": false,
            "finalType": "Int",
            "error": "cannot unify Int with Bool",
            "errorLatex": true,
            "derivation": [{"ruleId": "App", "expression": "f x"}]
        }));
        let result = normalize_result(payload);
        assert!(!result.success);
        assert_eq!(result.final_type, None);
        assert!(result.error_latex);
        assert_eq!(result.derivation.len(), 1);
    }

    #[test]
    fn missing_fields_default() {
        let result = normalize_result(EnginePayload::Structured(json!({})));
        assert!(!result.success);
        assert!(result.derivation.is_empty());
        assert_eq!(result.error, None);
    }

    #[test]
    fn steps_without_children_are_leaves() {
        let result = normalize_result(EnginePayload::Structured(json!({
            "success": true,
            "derivation": [{"ruleId": "Var", "expression": "x", "children": []}, {"ruleId": "Var", "expression": "y"}]
        })));
        assert!(result.derivation.iter().all(DerivationStep::is_leaf));
    }

    #[test]
    fn catalog_accepts_wrapped_object() {
        let payload = EnginePayload::Structured(json!({"algorithms": [{"id": "W", "name": "Algorithm W"}]}));
        let catalog = normalize_catalog(payload).unwrap();
        assert_eq!(catalog[0].id, "W");
    }
}
