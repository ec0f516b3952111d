use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::join_all;
use serde_json::{Value, json};
use tracing::{debug, error, warn};

use crate::{
    codec,
    error::{JsonRpcError, JsonRpcErrorObject},
    introspection::BuiltinCommand,
    parser::{self, ParsedInput},
    provider::{Handler, HandlerProvider},
    registry::MethodError,
    request::RequestParams,
    resolver,
    response::{JsonRpcMessage, JsonRpcResponse, ResponseBody},
    types::RequestId,
    validator::{self, ValidatedEntry},
};

/// Routes raw request text to the handler bound to a routing key.
///
/// The binding is looked up on every dispatch, so a reload is picked up by
/// the next request without any coordination with the dispatcher.
#[derive(Clone)]
pub struct JsonRpcDispatcher {
    provider: Arc<dyn HandlerProvider>,
}

impl JsonRpcDispatcher {
    pub fn new(provider: Arc<dyn HandlerProvider>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &Arc<dyn HandlerProvider> {
        &self.provider
    }

    /// Process one transport exchange and return the outgoing body text.
    /// An empty string means no response is owed.
    pub async fn dispatch(&self, routing_key: &str, raw: &str) -> String {
        self.handle(routing_key, raw).await.to_json_string()
    }

    /// Like [`dispatch`](Self::dispatch) but returns the structured body
    pub async fn handle(&self, routing_key: &str, raw: &str) -> ResponseBody {
        let Some(handler) = self.provider.resolve(routing_key) else {
            warn!(routing_key, "No handler bound to routing key");
            let error = JsonRpcError::internal_error(
                recover_id(raw),
                Some(format!("No handler bound to '{}'", routing_key)),
            );
            return ResponseBody::Single(error.into());
        };

        match parser::parse(raw) {
            ParsedInput::Failure(err) => {
                debug!(routing_key, error = %err, "Rejecting unparsable request");
                ResponseBody::Single(JsonRpcError::parse_error().into())
            }
            ParsedInput::Single(value) => match validator::validate(value) {
                ValidatedEntry::Invalid => {
                    ResponseBody::Single(JsonRpcError::invalid_request().into())
                }
                entry => match self.process(&handler, entry).await {
                    Some(message) => ResponseBody::Single(message),
                    None => ResponseBody::Empty,
                },
            },
            ParsedInput::Batch(values) if values.is_empty() => {
                debug!(routing_key, "Rejecting empty batch");
                ResponseBody::Single(JsonRpcError::invalid_request().into())
            }
            ParsedInput::Batch(values) => {
                debug!(routing_key, entries = values.len(), "Dispatching batch");
                let entries = values
                    .into_iter()
                    .map(|value| self.process(&handler, validator::validate(value)));
                // join_all yields results in input order regardless of completion order.
                let messages = join_all(entries).await.into_iter().flatten().collect();
                ResponseBody::from_batch(messages)
            }
        }
    }

    /// Handle one validated entry. Returns `None` for notifications.
    async fn process(&self, handler: &Handler, entry: ValidatedEntry) -> Option<JsonRpcMessage> {
        match entry {
            ValidatedEntry::Invalid => Some(JsonRpcError::invalid_request().into()),
            ValidatedEntry::Call(request) => {
                debug!(method = %request.method, id = %request.id, "Handling call");
                let message = match self.execute(handler, &request.method, request.params).await {
                    Ok(result) => JsonRpcResponse::success(request.id, result).into(),
                    Err(error) => JsonRpcError::new(request.id, error).into(),
                };
                Some(message)
            }
            ValidatedEntry::Notification(notification) => {
                debug!(method = %notification.method, "Handling notification");
                if let Err(error) = self
                    .execute(handler, &notification.method, notification.params)
                    .await
                {
                    debug!(
                        method = %notification.method,
                        code = error.code,
                        message = %error.message,
                        "Notification failed, no response sent"
                    );
                }
                None
            }
        }
    }

    async fn execute(
        &self,
        handler: &Handler,
        method: &str,
        params: Option<RequestParams>,
    ) -> Result<Value, JsonRpcErrorObject> {
        if let Some(command) = BuiltinCommand::from_method(method) {
            return command.execute(handler, self.provider.as_ref());
        }

        let call = resolver::resolve(handler.registry(), method, params)
            .map_err(|err| err.to_error_object())?;

        match AssertUnwindSafe(call.candidate.invoke(call.args))
            .catch_unwind()
            .await
        {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(MethodError::Application { message, data })) => {
                let data = data.unwrap_or_else(|| json!({ "method": method, "causes": [&message] }));
                Err(JsonRpcErrorObject::app_error(message, data))
            }
            Ok(Err(MethodError::Internal(message))) => {
                error!(method, %message, "Handler reported an internal fault");
                Err(JsonRpcErrorObject::internal_error(Some(message), None))
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(method, %message, "Handler panicked");
                Err(JsonRpcErrorObject::internal_error(Some(message), None))
            }
        }
    }
}

impl std::fmt::Debug for JsonRpcDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonRpcDispatcher").finish_non_exhaustive()
    }
}

/// Best-effort id for a response to a request we cannot route.
fn recover_id(raw: &str) -> RequestId {
    match codec::decode(raw) {
        Ok(Value::Object(mut obj)) => obj.remove("id").map(RequestId::from).unwrap_or_default(),
        _ => RequestId::Null,
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("Handler panicked: {}", message)
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("Handler panicked: {}", message)
    } else {
        "Handler panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JsonRpcErrorCode;
    use crate::provider::{CatalogProvider, SourceCatalog};
    use crate::registry::{MethodRegistry, ParamSpec, ParamType};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn dispatcher(hits: Arc<AtomicUsize>) -> JsonRpcDispatcher {
        let catalog = SourceCatalog::new().with_source(
            "calc",
            move |registry: &mut MethodRegistry| -> anyhow::Result<()> {
                let int = |name: &str| ParamSpec::new(name, ParamType::Integer);
                registry.method_fn("add", vec![int("a"), int("b")], |args| {
                    Ok(json!(args[0].as_i64().unwrap_or(0) + args[1].as_i64().unwrap_or(0)))
                });
                let hits = Arc::clone(&hits);
                registry.method_fn("touch", vec![], move |_| {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Err(MethodError::application("touched"))
                });
                registry.method_fn("explode", vec![], |_| panic!("kaboom"));
                registry.method_fn("fault", vec![], |_| Err(MethodError::internal("db gone")));
                Ok(())
            },
        );
        let provider = CatalogProvider::new(catalog);
        provider.initialize("calc", &["calc".to_string()]).unwrap();
        JsonRpcDispatcher::new(Arc::new(provider))
    }

    fn error_code(body: &ResponseBody) -> Option<JsonRpcErrorCode> {
        match body {
            ResponseBody::Single(JsonRpcMessage::Error(err)) => err.error.kind(),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_single_call() {
        let dispatcher = dispatcher(Arc::default());
        let out = dispatcher
            .dispatch("calc", r#"{"jsonrpc":"2.0","id":1,"method":"add","params":[1,2]}"#)
            .await;
        assert_eq!(out, r#"{"jsonrpc":"2.0","id":1,"result":3}"#);
    }

    #[tokio::test]
    async fn test_notification_runs_but_answers_nothing() {
        let hits = Arc::new(AtomicUsize::new(0));
        let dispatcher = dispatcher(Arc::clone(&hits));
        let out = dispatcher.dispatch("calc", r#"{"method":"touch"}"#).await;
        assert_eq!(out, "");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unbound_routing_key_echoes_id() {
        let dispatcher = dispatcher(Arc::default());
        let body = dispatcher
            .handle("failurl", r#"{"id":1,"method":"rpc.ls"}"#)
            .await;
        assert_eq!(error_code(&body), Some(JsonRpcErrorCode::InternalError));
        match body {
            ResponseBody::Single(message) => assert_eq!(message.id(), &RequestId::from(1)),
            other => panic!("expected single response, got {:?}", other),
        }

        let body = dispatcher.handle("failurl", "[").await;
        assert_eq!(error_code(&body), Some(JsonRpcErrorCode::InternalError));
    }

    #[tokio::test]
    async fn test_panics_and_faults_are_internal_errors() {
        let dispatcher = dispatcher(Arc::default());
        for method in ["explode", "fault"] {
            let raw = format!(r#"{{"id":"x","method":"{}"}}"#, method);
            let body = dispatcher.handle("calc", &raw).await;
            assert_eq!(error_code(&body), Some(JsonRpcErrorCode::InternalError), "{method}");
        }
    }

    #[tokio::test]
    async fn test_application_error_gets_default_data() {
        let dispatcher = dispatcher(Arc::default());
        let body = dispatcher.handle("calc", r#"{"id":2,"method":"touch"}"#).await;
        match body {
            ResponseBody::Single(JsonRpcMessage::Error(err)) => {
                assert_eq!(err.id, RequestId::from(2));
                assert_eq!(err.error.kind(), Some(JsonRpcErrorCode::AppError));
                assert_eq!(err.error.message, "touched");
                assert_eq!(
                    err.error.data,
                    Some(json!({"method": "touch", "causes": ["touched"]}))
                );
            }
            other => panic!("expected error response, got {:?}", other),
        }
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "Handler panicked: boom");
        let boxed: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(boxed.as_ref()), "Handler panicked");
    }
}
