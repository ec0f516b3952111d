//! # JSON-RPC Engine Prelude
//!
//! Convenient re-exports of the types needed to build handlers and dispatch
//! requests.
//!
//! ```rust
//! use urlrpc_json_rpc_server::prelude::*;
//! ```

pub use crate::dispatch::JsonRpcDispatcher;
pub use crate::error::{JsonRpcError, JsonRpcErrorCode, JsonRpcErrorObject};
pub use crate::provider::{CatalogProvider, Handler, HandlerProvider, SourceCatalog};
pub use crate::registry::{MethodError, MethodRegistry, MethodResult, ParamSpec, ParamType};
pub use crate::request::RequestParams;
pub use crate::response::{JsonRpcMessage, ResponseBody};
pub use crate::types::RequestId;

// Standard error codes
pub use crate::error_codes::*;
