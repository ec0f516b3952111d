//! HTTP request handler: path to routing key, body to engine, output to body

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderValue};
use http::{Method, Request, Response, StatusCode};
use http_body::Body;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use tracing::{debug, warn};

use urlrpc_json_rpc_server::{JsonRpcDispatcher, JsonRpcError, ResponseBody};

use crate::config::{ServerConfig, routing_key};

/// Request sent on behalf of `GET <path>`
const LISTING_REQUEST: &str = r#"{"jsonrpc":"2.0","id":null,"method":"rpc.ll"}"#;

/// HTTP handler for JSON-RPC requests
#[derive(Debug, Clone)]
pub struct RpcHttpHandler {
    max_body_size: usize,
    dispatcher: JsonRpcDispatcher,
}

impl RpcHttpHandler {
    pub fn new(config: &ServerConfig, dispatcher: JsonRpcDispatcher) -> Self {
        Self {
            max_body_size: config.max_body_size,
            dispatcher,
        }
    }

    /// Handle one HTTP request
    pub async fn handle<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let key = routing_key(req.uri().path()).to_string();
        debug!("Handling {} /{}", req.method(), key);

        match *req.method() {
            Method::POST => self.handle_json_rpc_request(&key, req.into_body()).await,
            Method::GET => {
                let out = self.dispatcher.dispatch(&key, LISTING_REQUEST).await;
                json_response(out)
            }
            _ => text_response(
                StatusCode::METHOD_NOT_ALLOWED,
                "Only GET and POST are supported",
            ),
        }
    }

    async fn handle_json_rpc_request<B>(&self, key: &str, body: B) -> Response<Full<Bytes>>
    where
        B: Body,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let bytes = match Limited::new(body, self.max_body_size).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
                warn!(limit = self.max_body_size, "Request body too large");
                return text_response(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large");
            }
            Err(err) => {
                warn!("Failed to read request body: {}", err);
                return text_response(StatusCode::BAD_REQUEST, "Failed to read request body");
            }
        };

        let Ok(text) = std::str::from_utf8(&bytes) else {
            debug!(routing_key = key, "Rejecting request body that is not UTF-8");
            let body = ResponseBody::Single(JsonRpcError::parse_error().into());
            return json_response(body.to_json_string());
        };
        let out = self.dispatcher.dispatch(key, text).await;
        json_response(out)
    }
}

fn json_response(body: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn text_response(status: StatusCode, message: &'static str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(message.as_bytes())));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    response
}
