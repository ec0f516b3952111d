//! # URL-routed JSON-RPC 2.0 engine
//!
//! A transport-agnostic JSON-RPC 2.0 engine. The transport hands over a
//! routing key (typically the request path) and the raw request text; the
//! engine answers with the body to send back.
//!
//! ## Features
//! - Single calls, notifications and batches, including every malformed-input case
//! - Method overloading by arity, with permissive argument coercion
//! - Ids echoed back with their exact JSON type
//! - Hot-reloadable handler generations per routing key
//! - Built-in `rpc.ls`, `rpc.ll`, `rpc.all` and `rpc.recompile` commands
//!
//! ```rust
//! use std::sync::Arc;
//! use serde_json::json;
//! use urlrpc_json_rpc_server::prelude::*;
//!
//! # futures::executor::block_on(async {
//! let catalog = SourceCatalog::new().with_source(
//!     "calc",
//!     |registry: &mut MethodRegistry| -> anyhow::Result<()> {
//!         let int = |name: &str| ParamSpec::new(name, ParamType::Integer);
//!         registry.method_fn("add", vec![int("a"), int("b")], |args| {
//!             Ok(json!(args[0].as_i64().unwrap_or(0) + args[1].as_i64().unwrap_or(0)))
//!         });
//!         Ok(())
//!     },
//! );
//! let provider = CatalogProvider::new(catalog);
//! provider.initialize("calc", &["calc".to_string()]).unwrap();
//!
//! let dispatcher = JsonRpcDispatcher::new(Arc::new(provider));
//! let out = dispatcher
//!     .dispatch("calc", r#"{"jsonrpc":"2.0","id":1,"method":"add","params":[1,2]}"#)
//!     .await;
//! assert_eq!(out, r#"{"jsonrpc":"2.0","id":1,"result":3}"#);
//! # });
//! ```

pub mod codec;
pub mod dispatch;
pub mod error;
pub mod introspection;
pub mod notification;
pub mod parser;
pub mod prelude;
pub mod provider;
pub mod registry;
pub mod request;
pub mod resolver;
pub mod response;
pub mod types;
pub mod validator;

// Re-export main types
pub use dispatch::JsonRpcDispatcher;
pub use error::{JsonRpcError, JsonRpcErrorCode, JsonRpcErrorObject};
pub use notification::JsonRpcNotification;
pub use provider::{
    CatalogProvider, Handler, HandlerProvider, HandlerSource, ProviderError, SourceCatalog,
};
pub use registry::{
    MethodCandidate, MethodError, MethodRegistry, MethodResult, ParamSpec, ParamType, RpcMethod,
};
pub use request::{JsonRpcRequest, RequestParams};
pub use response::{JsonRpcMessage, JsonRpcResponse, ResponseBody};
pub use types::{JsonRpcVersion, RequestId};

/// JSON-RPC 2.0 version constant
pub const JSONRPC_VERSION: &str = "2.0";

/// Wire error codes
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    /// Default code for failures raised by handler code
    pub const APP_ERROR: i64 = -32500;
}
