//! Built-in `rpc.*` commands.
//!
//! These live outside the user registry and are looked up first, so they
//! never take part in arity resolution and ignore any params they are sent.

use serde_json::{Value, json};
use tracing::info;

use crate::error::JsonRpcErrorObject;
use crate::provider::{Handler, HandlerProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinCommand {
    /// `rpc.ls`: method names
    List,
    /// `rpc.ll`: method signatures
    LongList,
    /// `rpc.all`: everything known about the bound handler
    All,
    /// `rpc.recompile`: reload the handler for the current routing key
    Recompile,
}

impl BuiltinCommand {
    pub const ALL: [BuiltinCommand; 4] = [
        BuiltinCommand::List,
        BuiltinCommand::LongList,
        BuiltinCommand::All,
        BuiltinCommand::Recompile,
    ];

    pub fn from_method(method: &str) -> Option<Self> {
        match method {
            "rpc.ls" => Some(BuiltinCommand::List),
            "rpc.ll" => Some(BuiltinCommand::LongList),
            "rpc.all" => Some(BuiltinCommand::All),
            "rpc.recompile" => Some(BuiltinCommand::Recompile),
            _ => None,
        }
    }

    pub fn method_name(&self) -> &'static str {
        match self {
            BuiltinCommand::List => "rpc.ls",
            BuiltinCommand::LongList => "rpc.ll",
            BuiltinCommand::All => "rpc.all",
            BuiltinCommand::Recompile => "rpc.recompile",
        }
    }

    pub fn execute(
        &self,
        handler: &Handler,
        provider: &dyn HandlerProvider,
    ) -> Result<Value, JsonRpcErrorObject> {
        match self {
            BuiltinCommand::List => Ok(list(handler)),
            BuiltinCommand::LongList => Ok(long_list(handler)),
            BuiltinCommand::All => Ok(describe_all(handler)),
            BuiltinCommand::Recompile => recompile(handler, provider),
        }
    }
}

pub fn list(handler: &Handler) -> Value {
    json!(handler.registry().names().collect::<Vec<_>>())
}

pub fn long_list(handler: &Handler) -> Value {
    json!(
        handler
            .registry()
            .candidates()
            .map(|candidate| candidate.signature())
            .collect::<Vec<_>>()
    )
}

pub fn describe_all(handler: &Handler) -> Value {
    json!({
        "routingKey": handler.routing_key(),
        "generation": handler.generation(),
        "sources": handler.sources(),
        "loadedAt": handler.loaded_at().to_rfc3339(),
        "methods": handler
            .registry()
            .candidates()
            .map(|candidate| candidate.to_description())
            .collect::<Vec<_>>(),
        "builtins": BuiltinCommand::ALL
            .iter()
            .map(BuiltinCommand::method_name)
            .collect::<Vec<_>>(),
    })
}

fn recompile(
    handler: &Handler,
    provider: &dyn HandlerProvider,
) -> Result<Value, JsonRpcErrorObject> {
    let routing_key = handler.routing_key();
    let reloaded = provider.reload(routing_key).map_err(|err| {
        JsonRpcErrorObject::internal_error(
            Some(format!("Recompile failed: {}", err)),
            Some(json!({ "routingKey": routing_key })),
        )
    })?;

    info!(
        routing_key,
        previous = handler.generation(),
        generation = reloaded.generation(),
        "Recompiled via rpc.recompile"
    );

    Ok(json!({
        "status": "reloaded",
        "routingKey": routing_key,
        "generation": reloaded.generation(),
        "methods": reloaded.registry().len(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{CatalogProvider, SourceCatalog};
    use crate::registry::{MethodRegistry, ParamSpec, ParamType};

    fn provider() -> CatalogProvider {
        let catalog = SourceCatalog::new().with_source(
            "calc",
            |registry: &mut MethodRegistry| -> anyhow::Result<()> {
                let int = |name: &str| ParamSpec::new(name, ParamType::Integer);
                registry.method_fn("add", vec![int("a"), int("b")], |_| Ok(Value::Null));
                registry.method_fn("add", vec![int("a"), int("b"), int("c")], |_| {
                    Ok(Value::Null)
                });
                registry.method_fn("now", vec![], |_| Ok(Value::Null));
                Ok(())
            },
        );
        let provider = CatalogProvider::new(catalog);
        provider
            .initialize("calc", &["calc".to_string()])
            .unwrap();
        provider
    }

    #[test]
    fn test_command_table() {
        for command in BuiltinCommand::ALL {
            assert_eq!(BuiltinCommand::from_method(command.method_name()), Some(command));
        }
        assert_eq!(BuiltinCommand::from_method("rpc.unknown"), None);
        assert_eq!(BuiltinCommand::from_method("ls"), None);
    }

    #[test]
    fn test_listing_verbosity() {
        let provider = provider();
        let handler = provider.resolve("calc").unwrap();

        assert_eq!(list(&handler), json!(["add", "now"]));
        assert_eq!(
            long_list(&handler),
            json!([
                "add(a: integer, b: integer)",
                "add(a: integer, b: integer, c: integer)",
                "now()"
            ])
        );

        let all = describe_all(&handler);
        assert_eq!(all["routingKey"], "calc");
        assert_eq!(all["methods"].as_array().unwrap().len(), 3);
        assert_eq!(all["builtins"][3], "rpc.recompile");
    }

    #[test]
    fn test_recompile_reports_new_generation() {
        let provider = provider();
        let handler = provider.resolve("calc").unwrap();

        let status = BuiltinCommand::Recompile
            .execute(&handler, &provider)
            .unwrap();
        assert_eq!(status["status"], "reloaded");
        assert_eq!(status["generation"], handler.generation() + 1);
        assert_eq!(status["methods"], 3);
    }
}
