//! Overload selection and argument coercion.

use std::collections::BTreeMap;

use serde_json::{Map, Number, Value, json};
use thiserror::Error;

use crate::error::JsonRpcErrorObject;
use crate::registry::{MethodCandidate, MethodRegistry, ParamType};
use crate::request::RequestParams;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    #[error("Method '{0}' not found")]
    MethodNotFound(String),

    #[error("{message}")]
    InvalidParams { message: String, data: Value },
}

impl ResolveError {
    pub fn to_error_object(&self) -> JsonRpcErrorObject {
        match self {
            ResolveError::MethodNotFound(method) => JsonRpcErrorObject::method_not_found(method),
            ResolveError::InvalidParams { message, data } => {
                JsonRpcErrorObject::invalid_params(message, data.clone())
            }
        }
    }
}

/// A chosen overload together with its coerced arguments
#[derive(Debug)]
pub struct ResolvedCall<'a> {
    pub candidate: &'a MethodCandidate,
    pub args: Vec<Value>,
}

/// Pick the overload of `method` matching the supplied argument count and
/// coerce each argument to its declared type.
pub fn resolve<'a>(
    registry: &'a MethodRegistry,
    method: &str,
    params: Option<RequestParams>,
) -> Result<ResolvedCall<'a>, ResolveError> {
    let overloads = registry
        .overloads(method)
        .ok_or_else(|| ResolveError::MethodNotFound(method.to_string()))?;

    let args = normalize_params(overloads, params);
    let Some(candidate) = overloads.get(&args.len()) else {
        return Err(ResolveError::InvalidParams {
            message: format!(
                "Method '{}' does not accept {} argument(s)",
                method,
                args.len()
            ),
            data: json!({
                "method": method,
                "supplied": args.len(),
                "argTypes": args.iter().map(json_type_name).collect::<Vec<_>>(),
                "expected": overloads.keys().collect::<Vec<_>>(),
            }),
        });
    };

    let args = candidate
        .params()
        .iter()
        .zip(args)
        .enumerate()
        .map(|(index, (spec, arg))| {
            let actual = json_type_name(&arg);
            coerce(arg, spec.ty).ok_or_else(|| ResolveError::InvalidParams {
                message: format!(
                    "Argument {} of '{}' cannot be converted to {}",
                    index, method, spec.ty
                ),
                data: json!({
                    "method": method,
                    "index": index,
                    "param": spec.name,
                    "expected": spec.ty,
                    "actual": actual,
                }),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ResolvedCall { candidate, args })
}

/// Turn wire params into a positional argument list.
///
/// A named mapping is spread into declared order when some overload's
/// parameter names are exactly its keys; otherwise it is one argument.
pub fn normalize_params(
    overloads: &BTreeMap<usize, MethodCandidate>,
    params: Option<RequestParams>,
) -> Vec<Value> {
    match params {
        None => Vec::new(),
        Some(RequestParams::Array(items)) => items,
        Some(RequestParams::Scalar(value)) => vec![value],
        Some(RequestParams::Object(map)) => match named_overload(overloads, &map) {
            Some(candidate) => {
                let mut map = map;
                candidate
                    .params()
                    .iter()
                    .map(|spec| map.remove(&spec.name).unwrap_or(Value::Null))
                    .collect()
            }
            None => vec![Value::Object(map)],
        },
    }
}

fn named_overload<'a>(
    overloads: &'a BTreeMap<usize, MethodCandidate>,
    map: &Map<String, Value>,
) -> Option<&'a MethodCandidate> {
    let candidate = overloads.get(&map.len())?;
    candidate
        .params()
        .iter()
        .all(|spec| map.contains_key(&spec.name))
        .then_some(candidate)
}

/// Permissive conversion of one argument to a declared parameter type.
/// Returns `None` when the value has no sensible representation in `ty`.
pub fn coerce(value: Value, ty: ParamType) -> Option<Value> {
    match (ty, value) {
        (ParamType::Any, value) => Some(value),

        (ParamType::Integer, Value::Number(n)) => {
            if n.is_i64() {
                Some(Value::Number(n))
            } else if n.is_u64() {
                // Above i64::MAX: not representable as a signed integer.
                None
            } else {
                let f = n.as_f64()?;
                (f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64)
                    .then(|| Value::from(f as i64))
            }
        }
        (ParamType::Integer, Value::String(s)) => s.trim().parse::<i64>().map(Value::from).ok(),

        (ParamType::Float, Value::Number(n)) => Number::from_f64(n.as_f64()?).map(Value::Number),
        (ParamType::Float, Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),

        (ParamType::String, Value::String(s)) => Some(Value::String(s)),
        (ParamType::String, Value::Number(n)) => Some(Value::String(n.to_string())),
        (ParamType::String, Value::Bool(b)) => Some(Value::String(b.to_string())),

        (ParamType::Bool, Value::Bool(b)) => Some(Value::Bool(b)),
        (ParamType::Bool, Value::String(s)) => match s.as_str() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },

        (ParamType::Array, value @ Value::Array(_)) => Some(value),
        (ParamType::Object, value @ Value::Object(_)) => Some(value),

        _ => None,
    }
}

pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
