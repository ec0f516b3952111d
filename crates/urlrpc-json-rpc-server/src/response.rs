use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::error;

use crate::codec;
use crate::error::JsonRpcError;
use crate::types::{JsonRpcVersion, RequestId};

/// Body used when a response cannot be encoded at all
const ENCODING_FAILURE_BODY: &str =
    r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32603,"message":"Internal error"}}"#;

/// A successful JSON-RPC response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(rename = "jsonrpc")]
    pub version: JsonRpcVersion,
    pub id: RequestId,
    pub result: Value,
}

impl JsonRpcResponse {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            version: JsonRpcVersion::V2_0,
            id,
            result,
        }
    }
}

/// Either a successful response or an error response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcMessage {
    /// Successful response with result field
    Response(JsonRpcResponse),
    /// Error response with error field
    Error(JsonRpcError),
}

impl JsonRpcMessage {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self::Response(JsonRpcResponse::success(id, result))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, JsonRpcMessage::Error(_))
    }

    pub fn id(&self) -> &RequestId {
        match self {
            JsonRpcMessage::Response(resp) => &resp.id,
            JsonRpcMessage::Error(err) => &err.id,
        }
    }
}

impl From<JsonRpcResponse> for JsonRpcMessage {
    fn from(response: JsonRpcResponse) -> Self {
        Self::Response(response)
    }
}

impl From<JsonRpcError> for JsonRpcMessage {
    fn from(error: JsonRpcError) -> Self {
        Self::Error(error)
    }
}

/// Everything a dispatch can answer with
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// Nothing is owed: a notification, or a batch of only notifications
    Empty,
    Single(JsonRpcMessage),
    /// Never empty; see [`ResponseBody::from_batch`]
    Batch(Vec<JsonRpcMessage>),
}

impl ResponseBody {
    /// Collect batch responses. No responses means no body, not `[]`.
    pub fn from_batch(messages: Vec<JsonRpcMessage>) -> Self {
        if messages.is_empty() {
            ResponseBody::Empty
        } else {
            ResponseBody::Batch(messages)
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ResponseBody::Empty)
    }

    /// Serialize the outgoing body. `Empty` becomes the empty string.
    pub fn to_json_string(&self) -> String {
        let encoded = match self {
            ResponseBody::Empty => return String::new(),
            ResponseBody::Single(message) => codec::encode(message),
            ResponseBody::Batch(messages) => codec::encode(messages),
        };
        encoded.unwrap_or_else(|err| {
            error!(error = %err, "Failed to encode JSON-RPC response");
            ENCODING_FAILURE_BODY.to_string()
        })
    }
}

impl From<JsonRpcMessage> for ResponseBody {
    fn from(message: JsonRpcMessage) -> Self {
        ResponseBody::Single(message)
    }
}
