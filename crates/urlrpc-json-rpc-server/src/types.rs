use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::fmt;

/// Identifier of a JSON-RPC call.
///
/// The id is opaque to the engine: whatever arrived in the request is echoed
/// back in the response with the same JSON type. Numbers keep their exact
/// `serde_json::Number` representation, so the full signed 64-bit range
/// round-trips without narrowing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    #[default]
    Null,
    /// Not a legal id, but echoed back like any other.
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<Value>),
    Object(Map<String, Value>),
}

impl RequestId {
    pub fn is_null(&self) -> bool {
        matches!(self, RequestId::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RequestId::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            RequestId::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        Value::from(self.clone())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::Null => write!(f, "null"),
            RequestId::Number(n) => write!(f, "{}", n),
            RequestId::String(s) => write!(f, "{}", s),
            other => write!(f, "{}", other.to_value()),
        }
    }
}

impl From<Value> for RequestId {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => RequestId::Null,
            Value::Number(n) => RequestId::Number(n),
            Value::String(s) => RequestId::String(s),
            Value::Array(items) => RequestId::Array(items),
            Value::Object(map) => RequestId::Object(map),
            Value::Bool(b) => RequestId::Bool(b),
        }
    }
}

impl From<RequestId> for Value {
    fn from(id: RequestId) -> Self {
        match id {
            RequestId::Null => Value::Null,
            RequestId::Bool(b) => Value::Bool(b),
            RequestId::Number(n) => Value::Number(n),
            RequestId::String(s) => Value::String(s),
            RequestId::Array(items) => Value::Array(items),
            RequestId::Object(map) => Value::Object(map),
        }
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        RequestId::Number(n.into())
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        RequestId::String(s.to_string())
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        RequestId::String(s)
    }
}

/// JSON-RPC version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonRpcVersion {
    #[default]
    V2_0,
}

impl JsonRpcVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            JsonRpcVersion::V2_0 => crate::JSONRPC_VERSION,
        }
    }
}

impl fmt::Display for JsonRpcVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for JsonRpcVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for JsonRpcVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            crate::JSONRPC_VERSION => Ok(JsonRpcVersion::V2_0),
            _ => Err(serde::de::Error::custom(format!(
                "Invalid JSON-RPC version: {}",
                s
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_id_keeps_json_type() {
        assert_eq!(serde_json::to_string(&RequestId::Null).unwrap(), "null");
        assert_eq!(serde_json::to_string(&RequestId::from(42)).unwrap(), "42");
        assert_eq!(
            serde_json::to_string(&RequestId::from("42")).unwrap(),
            r#""42""#
        );

        let nested = RequestId::from(json!({"aa": "bb", "n": [1, 2]}));
        assert_eq!(nested.to_value(), json!({"aa": "bb", "n": [1, 2]}));
    }

    #[test]
    fn test_request_id_int64_extremes() {
        for n in [i64::MAX, i64::MIN] {
            let id = RequestId::from(n);
            let text = serde_json::to_string(&id).unwrap();
            assert_eq!(text, n.to_string());
            assert_eq!(id.as_i64(), Some(n));
        }
    }

    #[test]
    fn test_integral_and_fractional_ids_differ() {
        let int_id = RequestId::from(json!(1));
        let float_id = RequestId::from(json!(1.0));
        assert_ne!(int_id, float_id);
        assert_eq!(serde_json::to_string(&float_id).unwrap(), "1.0");
    }

    #[test]
    fn test_json_rpc_version() {
        let version = JsonRpcVersion::V2_0;
        assert_eq!(version.as_str(), "2.0");
        assert_eq!(serde_json::to_string(&version).unwrap(), r#""2.0""#);
        assert!(serde_json::from_str::<JsonRpcVersion>(r#""1.0""#).is_err());
    }
}
