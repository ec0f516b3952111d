use std::sync::Arc;

use bytes::Bytes;
use http::{Method, Request, StatusCode};
use http_body_util::{BodyExt, Empty, Full};
use serde_json::{Value, json};

use urlrpc_json_rpc_server::{CatalogProvider, JsonRpcDispatcher};

use crate::demo::{default_routes, demo_catalog};
use crate::{RpcHttpHandler, ServerConfig, initialize_routes};

fn handler(max_body_size: usize) -> RpcHttpHandler {
    let provider = CatalogProvider::new(demo_catalog());
    initialize_routes(&provider, &default_routes()).unwrap();
    let config = ServerConfig::default().max_body_size(max_body_size);
    RpcHttpHandler::new(&config, JsonRpcDispatcher::new(Arc::new(provider)))
}

fn post(path: &str, body: impl Into<Bytes>) -> Request<Full<Bytes>> {
    Request::builder()
        .method(Method::POST)
        .uri(path)
        .body(Full::new(body.into()))
        .unwrap()
}

async fn body_text(response: http::Response<Full<Bytes>>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_post_dispatches_by_path() {
    let handler = handler(1024);
    let response = handler
        .handle(post("/calc", r#"{"jsonrpc":"2.0","id":1,"method":"add","params":[2,3]}"#))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "application/json");
    assert_eq!(body_text(response).await, r#"{"jsonrpc":"2.0","id":1,"result":5}"#);
}

#[tokio::test]
async fn test_notification_gets_empty_body() {
    let handler = handler(1024);
    let response = handler
        .handle(post("/calc", r#"{"jsonrpc":"2.0","method":"donotify"}"#))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "");
}

#[tokio::test]
async fn test_unbound_path_is_internal_error() {
    let handler = handler(1024);
    let response = handler
        .handle(post("/failurl", r#"{"jsonrpc":"2.0","id":7,"method":"rpc.ls"}"#))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let value: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(value["id"], 7);
    assert_eq!(value["error"]["code"], -32603);
}

#[tokio::test]
async fn test_invalid_utf8_is_parse_error() {
    let handler = handler(1024);
    let prefix = r#"{"jsonrpc":"2.0","id":1,"method":"fun1argstr","params":[""#;
    let inside_string = [prefix.as_bytes(), &b"\xffab\"]}"[..]].concat();

    for body in [Bytes::from_static(&[0xff, 0xfe, b'{']), Bytes::from(inside_string)] {
        let response = handler.handle(post("/calc", body)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_text(response).await,
            r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32700,"message":"Parse error"}}"#
        );
    }
}

#[tokio::test]
async fn test_body_limit() {
    let handler = handler(16);
    let response = handler
        .handle(post("/calc", r#"{"jsonrpc":"2.0","id":1,"method":"add","params":[2,3]}"#))
        .await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_get_lists_signatures() {
    let handler = handler(1024);
    let request = Request::builder()
        .method(Method::GET)
        .uri("/greeter")
        .body(Empty::<Bytes>::new())
        .unwrap();
    let response = handler.handle(request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let value: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(value["id"], Value::Null);
    assert_eq!(
        value["result"],
        json!(["farewell(name: string)", "greet(name: string)", "version()"])
    );
}

#[tokio::test]
async fn test_other_methods_rejected() {
    let handler = handler(1024);
    let request = Request::builder()
        .method(Method::PUT)
        .uri("/calc")
        .body(Empty::<Bytes>::new())
        .unwrap();
    let response = handler.handle(request).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
