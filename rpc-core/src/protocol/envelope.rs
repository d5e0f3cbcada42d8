// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! Response payload convention: the decoded value list's first slot is reserved
//! for an error marker (`Null` on success, `Str(message)` on failure), with the
//! actual return values following. This is what lets a dispatch error travel
//! back as an ordinary Response frame instead of tearing down the connection
//! (spec.md §9's "structured error response" redesign).

use super::codec::Value;

pub fn wrap_success(results: Vec<Value>) -> Vec<Value> {
    let mut values = Vec::with_capacity(results.len() + 1);
    values.push(Value::Null);
    values.extend(results);
    values
}

pub fn wrap_error(message: impl Into<String>) -> Vec<Value> {
    vec![Value::Str(message.into())]
}

/// Splits a decoded response payload back into its error marker and results. Returns
/// `Err(message)` if the response encodes a dispatch-level failure.
pub fn unwrap_response(mut values: Vec<Value>) -> Result<Vec<Value>, String> {
    if values.is_empty() {
        return Ok(Vec::new());
    }

    let marker = values.remove(0);
    match marker {
        Value::Null => Ok(values),
        Value::Str(message) => Err(message),
        other => Err(format!("malformed response error marker: {other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_round_trips() {
        let wrapped = wrap_success(vec![Value::I64(2), Value::Str("BBB".into())]);
        let results = unwrap_response(wrapped).unwrap();
        assert_eq!(results, vec![Value::I64(2), Value::Str("BBB".into())]);
    }

    #[test]
    fn error_surfaces_as_err() {
        let wrapped = wrap_error("method not found: Missing");
        let err = unwrap_response(wrapped).unwrap_err();
        assert_eq!(err, "method not found: Missing");
    }
}
