use scout_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Decode tool parameters, reporting shape errors as [`Error::InvalidParams`]
pub fn parse_params<T: DeserializeOwned>(params: Value) -> Result<T> {
    serde_json::from_value(params).map_err(|e| Error::invalid_params(e.to_string()))
}

/// Check `params` against the top-level `required` list of an object schema.
///
/// Only presence is checked; value shapes are left to [`parse_params`].
pub fn check_required(schema: &Value, params: &Value) -> Result<()> {
    let Some(required) = schema.get("required").and_then(Value::as_array) else {
        return Ok(());
    };
    let Some(object) = params.as_object() else {
        return Err(Error::invalid_params("parameters must be a JSON object"));
    };

    let missing: Vec<&str> = required
        .iter()
        .filter_map(Value::as_str)
        .filter(|field| object.get(*field).is_none_or(Value::is_null))
        .collect();
    if !missing.is_empty() {
        return Err(Error::invalid_params(format!(
            "missing required parameter(s): {}",
            missing.join(", ")
        )));
    }
    Ok(())
}

/// Reject blank required strings that deserialized successfully
pub fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::invalid_params(format!("'{}' must not be empty", field)));
    }
    Ok(())
}
