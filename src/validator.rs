//! # Type validation
//!
//! Checks raw field values against their declared [`VariableType`] and turns
//! them into typed JSON scalars for the evaluation request. A value that does
//! not match its type is rejected, never coerced.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Number, Value};
use thiserror::Error;

use crate::{
    field::RawVariables,
    types::{EvaluationVariables, VariableType},
};

lazy_static! {
    static ref INTEGER: Regex = Regex::new(r"^-?[0-9]+$").unwrap();
    static ref DOUBLE: Regex = Regex::new(r"^-?[0-9]+(\.[0-9]+)?$").unwrap();
}

const BOOLEAN_TRUE: [&str; 3] = ["true", "1", "yes"];
const BOOLEAN_FALSE: [&str; 3] = ["false", "0", "no"];

/// A variable whose raw value did not satisfy its declared type.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("'{variable}' must be {expected}")]
pub struct TypeMismatch {
    pub variable: String,
    pub expected: VariableType,
    pub value: String,
}

/// Whether `raw` is acceptable for `declared`.
pub fn validate(raw: &str, declared: VariableType) -> bool {
    let raw = raw.trim();
    match declared {
        VariableType::String => true,
        VariableType::Integer => INTEGER.is_match(raw),
        VariableType::Double => DOUBLE.is_match(raw),
        VariableType::Boolean => parse_boolean(raw).is_some(),
    }
}

fn parse_boolean(raw: &str) -> Option<bool> {
    let lower = raw.to_ascii_lowercase();
    if BOOLEAN_TRUE.contains(&lower.as_str()) {
        Some(true)
    } else if BOOLEAN_FALSE.contains(&lower.as_str()) {
        Some(false)
    } else {
        None
    }
}

/// Converts a raw value to the typed scalar sent to the decision service.
///
/// Returns `None` when the value fails validation, or when an integer does
/// not fit in 64 bits.
pub fn coerce(raw: &str, declared: VariableType) -> Option<Value> {
    if !validate(raw, declared) {
        return None;
    }
    let raw = raw.trim();
    match declared {
        VariableType::String => Some(Value::String(raw.to_string())),
        VariableType::Integer => raw.parse::<i64>().ok().map(Value::from),
        VariableType::Double => raw
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),
        VariableType::Boolean => parse_boolean(raw).map(Value::Bool),
    }
}

/// Coerces every extracted variable, collecting all mismatches.
pub fn coerce_all(raw: &RawVariables) -> Result<EvaluationVariables, Vec<TypeMismatch>> {
    let mut variables = EvaluationVariables::with_capacity(raw.len());
    let mut mismatches = Vec::new();

    for (name, variable) in raw {
        match coerce(&variable.value, variable.variable_type) {
            Some(value) => {
                variables.insert(name.clone(), value);
            }
            None => mismatches.push(TypeMismatch {
                variable: name.clone(),
                expected: variable.variable_type,
                value: variable.value.clone(),
            }),
        }
    }

    if mismatches.is_empty() {
        Ok(variables)
    } else {
        Err(mismatches)
    }
}
