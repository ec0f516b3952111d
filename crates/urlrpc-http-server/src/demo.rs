//! Built-in demo handler sources served by the `urlrpc-server` binary.

use serde_json::{Value, json};
use tracing::info;

use urlrpc_json_rpc_server::{MethodError, MethodRegistry, ParamSpec, ParamType, SourceCatalog};

use crate::config::RouteConfig;

pub const CALCULATOR: &str = "demo/calculator";
pub const GREETER_BASE: &str = "demo/base";
pub const GREETER_OVERRIDES: &str = "demo/sub";

/// Catalog with every demo source
pub fn demo_catalog() -> SourceCatalog {
    SourceCatalog::new()
        .with_source(CALCULATOR, load_calculator)
        .with_source(GREETER_BASE, load_greeter_base)
        .with_source(GREETER_OVERRIDES, load_greeter_overrides)
}

/// Routes used when the configuration names none
pub fn default_routes() -> Vec<RouteConfig> {
    vec![
        RouteConfig::new("/calc", vec![CALCULATOR.to_string()]),
        RouteConfig::new(
            "/greeter",
            vec![GREETER_BASE.to_string(), GREETER_OVERRIDES.to_string()],
        ),
    ]
}

fn int(name: &str) -> ParamSpec {
    ParamSpec::new(name, ParamType::Integer)
}

fn as_int(value: &Value) -> i64 {
    value.as_i64().unwrap_or_default()
}

fn load_calculator(registry: &mut MethodRegistry) -> anyhow::Result<()> {
    registry
        .method_fn("add", vec![int("a"), int("b")], |args| {
            Ok(json!(as_int(&args[0]).wrapping_add(as_int(&args[1]))))
        })
        .describe("Sum of two integers");
    registry
        .method_fn("adds", vec![int("a"), int("b"), int("c")], |args| {
            Ok(json!(args.iter().map(as_int).fold(0i64, i64::wrapping_add)))
        })
        .describe("Sum of three integers");
    registry
        .method_fn("adds", vec![int("a"), int("b")], |_| {
            Err(MethodError::application("adds takes three operands"))
        })
        .describe("Always fails with an application error");
    registry
        .method_fn("getDate", vec![], |_| Ok(json!(chrono::Utc::now().to_rfc3339())))
        .describe("Current server time, RFC 3339");
    registry.method_fn("fun1arg", vec![int("x")], |args| {
        Ok(json!(as_int(&args[0]).wrapping_add(1)))
    });
    registry.method_fn(
        "fun1argstr",
        vec![ParamSpec::new("s", ParamType::String)],
        |args| {
            let s = args[0].as_str().unwrap_or_default();
            Ok(json!(s.chars().rev().collect::<String>()))
        },
    );
    registry
        .method_fn(
            "echo",
            vec![
                ParamSpec::new("a", ParamType::Any),
                ParamSpec::new("b", ParamType::Any),
            ],
            |args| Ok(Value::Array(args)),
        )
        .describe("Returns its arguments");
    registry
        .method("donotify", vec![], |_| async {
            info!("donotify received");
            Ok(Value::Null)
        })
        .describe("Logs receipt; meant to be sent as a notification");
    Ok(())
}

fn load_greeter_base(registry: &mut MethodRegistry) -> anyhow::Result<()> {
    registry.method_fn(
        "greet",
        vec![ParamSpec::new("name", ParamType::String)],
        |args| Ok(json!(format!("Hello, {}!", args[0].as_str().unwrap_or("world")))),
    );
    registry.method_fn("version", vec![], |_| Ok(json!("base")));
    Ok(())
}

fn load_greeter_overrides(registry: &mut MethodRegistry) -> anyhow::Result<()> {
    registry.method_fn("version", vec![], |_| Ok(json!("sub")));
    registry.method_fn(
        "farewell",
        vec![ParamSpec::new("name", ParamType::String)],
        |args| Ok(json!(format!("Goodbye, {}!", args[0].as_str().unwrap_or("world")))),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use urlrpc_json_rpc_server::{CatalogProvider, HandlerProvider, JsonRpcDispatcher};

    use crate::initialize_routes;

    fn dispatcher() -> JsonRpcDispatcher {
        let provider = CatalogProvider::new(demo_catalog());
        initialize_routes(&provider, &default_routes()).unwrap();
        JsonRpcDispatcher::new(Arc::new(provider))
    }

    async fn call(dispatcher: &JsonRpcDispatcher, key: &str, raw: &str) -> Value {
        serde_json::from_str(&dispatcher.dispatch(key, raw).await).unwrap()
    }

    #[tokio::test]
    async fn test_calculator_route() {
        let dispatcher = dispatcher();
        let rsp = call(&dispatcher, "calc", r#"{"id":1,"method":"adds","params":[1,2,3]}"#).await;
        assert_eq!(rsp["result"], 6);

        let rsp = call(&dispatcher, "calc", r#"{"id":2,"method":"adds","params":[1,2]}"#).await;
        assert_eq!(rsp["error"]["code"], urlrpc_json_rpc_server::error_codes::APP_ERROR);
    }

    #[tokio::test]
    async fn test_greeter_layers_sources() {
        let dispatcher = dispatcher();
        let rsp = call(&dispatcher, "greeter", r#"{"id":1,"method":"version"}"#).await;
        assert_eq!(rsp["result"], "sub");

        let rsp = call(
            &dispatcher,
            "greeter",
            r#"{"id":2,"method":"greet","params":{"name":"Ada"}}"#,
        )
        .await;
        assert_eq!(rsp["result"], "Hello, Ada!");
    }

    #[test]
    fn test_default_routes_resolve() {
        let catalog = demo_catalog();
        for route in default_routes() {
            assert!(route.sources.iter().all(|s| catalog.contains(s)));
        }
        let provider = CatalogProvider::new(catalog);
        initialize_routes(&provider, &default_routes()).unwrap();
        assert!(provider.resolve("calc").is_some());
        assert!(provider.resolve("greeter").is_some());
    }
}
