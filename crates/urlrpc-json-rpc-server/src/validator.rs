use serde_json::Value;

use crate::{
    JSONRPC_VERSION,
    notification::JsonRpcNotification,
    request::{JsonRpcRequest, RequestParams},
    types::RequestId,
};

/// Classification of one decoded request value
#[derive(Debug, Clone, PartialEq)]
pub enum ValidatedEntry {
    Call(JsonRpcRequest),
    Notification(JsonRpcNotification),
    Invalid,
}

impl ValidatedEntry {
    pub fn method(&self) -> Option<&str> {
        match self {
            ValidatedEntry::Call(req) => Some(&req.method),
            ValidatedEntry::Notification(notif) => Some(&notif.method),
            ValidatedEntry::Invalid => None,
        }
    }

    pub fn is_notification(&self) -> bool {
        matches!(self, ValidatedEntry::Notification(_))
    }
}

/// Check one value against the request grammar.
///
/// `jsonrpc` may be omitted but must be `"2.0"` when present. An `id` field
/// makes the value a call even when it is `null`; only its absence makes a
/// notification.
pub fn validate(value: Value) -> ValidatedEntry {
    let Value::Object(mut obj) = value else {
        return ValidatedEntry::Invalid;
    };

    let method = match obj.remove("method") {
        Some(Value::String(method)) => method,
        _ => return ValidatedEntry::Invalid,
    };

    match obj.get("jsonrpc") {
        None => {}
        Some(Value::String(version)) if version == JSONRPC_VERSION => {}
        Some(_) => return ValidatedEntry::Invalid,
    }

    let params = obj.remove("params").and_then(RequestParams::from_value);

    match obj.remove("id") {
        Some(id) => ValidatedEntry::Call(JsonRpcRequest::new(RequestId::from(id), method, params)),
        None => ValidatedEntry::Notification(JsonRpcNotification::new(method, params)),
    }
}
