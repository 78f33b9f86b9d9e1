//! JMESPath evaluation over response payloads
//!
//! Path acceptors carry a query expression which is compiled once when the
//! model is parsed (to reject malformed expressions early) and again on every
//! evaluation. Compiled expressions are not `Send`, so they are never stored
//! in the model.

use serde_json::Value;

use crate::errors::{Result, WaiterError};

/// Check that `expression` is a valid JMESPath expression.
pub fn validate(expression: &str) -> Result<()> {
    jmespath::compile(expression)
        .map(|_| ())
        .map_err(|e| WaiterError::query(expression, e))
}

/// Evaluate `expression` against `payload` and return the result as JSON.
pub fn search(expression: &str, payload: &Value) -> Result<Value> {
    let compiled = jmespath::compile(expression).map_err(|e| WaiterError::query(expression, e))?;
    let result = compiled
        .search(payload)
        .map_err(|e| WaiterError::query(expression, e))?;
    Ok(serde_json::to_value(&*result)?)
}

/// JSON equality where numbers compare by value (`1 == 1.0`).
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => match (l.as_f64(), r.as_f64()) {
            (Some(l), Some(r)) => l == r,
            _ => l == r,
        },
        _ => left == right,
    }
}

/// Render a value for messages: strings raw, everything else as JSON text.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_search_nested_field() {
        let payload = json!({"State": {"Name": "running"}});
        assert_eq!(search("State.Name", &payload).unwrap(), json!("running"));
    }

    #[test]
    fn test_search_flattens_projections() {
        let payload = json!({
            "Reservations": [
                {"Instances": [{"State": {"Name": "running"}}, {"State": {"Name": "pending"}}]},
                {"Instances": [{"State": {"Name": "running"}}]}
            ]
        });
        assert_eq!(
            search("Reservations[].Instances[].State.Name", &payload).unwrap(),
            json!(["running", "pending", "running"])
        );
    }

    #[test]
    fn test_search_missing_field_is_null() {
        let payload = json!({"Table": {}});
        assert_eq!(search("Table.TableStatus", &payload).unwrap(), Value::Null);
    }

    #[test]
    fn test_search_functions_and_comparisons() {
        let payload = json!({"Reservations": [{"Instances": []}]});
        assert_eq!(
            search("length(Reservations[]) > `0`", &payload).unwrap(),
            json!(true)
        );
    }

    #[test]
    fn test_validate_rejects_malformed_expression() {
        assert!(validate("State.Name").is_ok());
        let error = validate("State.[").unwrap_err();
        assert!(matches!(error, WaiterError::Query { .. }));
    }

    #[test]
    fn test_values_equal_compares_numbers_by_value() {
        assert!(values_equal(&json!(1), &json!(1.0)));
        assert!(!values_equal(&json!(1), &json!("1")));
        assert!(values_equal(&json!("running"), &json!("running")));
    }

    #[test]
    fn test_display_value() {
        assert_eq!(display_value(&json!("running")), "running");
        assert_eq!(display_value(&json!(200)), "200");
        assert_eq!(display_value(&json!(true)), "true");
    }
}
