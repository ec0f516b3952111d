//! Method registry for one handler generation.
//!
//! Methods are keyed by `(name, arity)`. Several methods may share a name as
//! long as their parameter counts differ; the resolver picks between them by
//! the number of arguments a request supplies.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

/// Declared type of a method parameter. Drives argument coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Any,
    Bool,
    Integer,
    Float,
    String,
    Array,
    Object,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::Any => "any",
            ParamType::Bool => "bool",
            ParamType::Integer => "integer",
            ParamType::Float => "float",
            ParamType::String => "string",
            ParamType::Array => "array",
            ParamType::Object => "object",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ParamType,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Failure reported by a handler method
#[derive(Debug, Error)]
pub enum MethodError {
    /// Business-logic failure, reported to the caller as an application error
    #[error("{message}")]
    Application {
        message: String,
        data: Option<Value>,
    },

    /// Unexpected fault inside the handler
    #[error("internal handler fault: {0}")]
    Internal(String),
}

impl MethodError {
    pub fn application(message: impl Into<String>) -> Self {
        MethodError::Application {
            message: message.into(),
            data: None,
        }
    }

    pub fn application_with_data(message: impl Into<String>, data: Value) -> Self {
        MethodError::Application {
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        MethodError::Internal(message.into())
    }
}

impl From<anyhow::Error> for MethodError {
    fn from(err: anyhow::Error) -> Self {
        let causes: Vec<String> = err.chain().map(ToString::to_string).collect();
        MethodError::Application {
            message: err.to_string(),
            data: Some(json!({ "causes": causes })),
        }
    }
}

pub type MethodResult = Result<Value, MethodError>;

/// A callable handler method
#[async_trait]
pub trait RpcMethod: Send + Sync {
    /// Invoke with arguments already coerced to the declared parameter types.
    async fn call(&self, args: Vec<Value>) -> MethodResult;
}

/// Adapts an async closure into an [`RpcMethod`]
pub struct FnMethod<F>(F);

#[async_trait]
impl<F, Fut> RpcMethod for FnMethod<F>
where
    F: Fn(Vec<Value>) -> Fut + Send + Sync,
    Fut: Future<Output = MethodResult> + Send,
{
    async fn call(&self, args: Vec<Value>) -> MethodResult {
        (self.0)(args).await
    }
}

/// Adapts a blocking closure into an [`RpcMethod`]
pub struct SyncFnMethod<F>(F);

#[async_trait]
impl<F> RpcMethod for SyncFnMethod<F>
where
    F: Fn(Vec<Value>) -> MethodResult + Send + Sync,
{
    async fn call(&self, args: Vec<Value>) -> MethodResult {
        (self.0)(args)
    }
}

/// One overload: a name, its parameter list and the callable behind it
#[derive(Clone)]
pub struct MethodCandidate {
    name: String,
    params: Vec<ParamSpec>,
    description: Option<String>,
    method: Arc<dyn RpcMethod>,
}

impl MethodCandidate {
    pub fn new(
        name: impl Into<String>,
        params: Vec<ParamSpec>,
        method: Arc<dyn RpcMethod>,
    ) -> Self {
        Self {
            name: name.into(),
            params,
            description: None,
            method,
        }
    }

    pub fn describe(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// `name(a: integer, b: integer)`
    pub fn signature(&self) -> String {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| format!("{}: {}", p.name, p.ty))
            .collect();
        format!("{}({})", self.name, params.join(", "))
    }

    pub fn to_description(&self) -> Value {
        json!({
            "name": self.name,
            "arity": self.arity(),
            "params": self.params,
            "description": self.description,
        })
    }

    pub async fn invoke(&self, args: Vec<Value>) -> MethodResult {
        self.method.call(args).await
    }
}

impl fmt::Debug for MethodCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodCandidate")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Callable surface of one handler generation
#[derive(Debug, Clone, Default)]
pub struct MethodRegistry {
    methods: BTreeMap<String, BTreeMap<usize, MethodCandidate>>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an async method. Replaces any method with the same name and arity.
    pub fn method<F, Fut>(
        &mut self,
        name: impl Into<String>,
        params: Vec<ParamSpec>,
        f: F,
    ) -> &mut MethodCandidate
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = MethodResult> + Send + 'static,
    {
        self.insert(MethodCandidate::new(name, params, Arc::new(FnMethod(f))))
    }

    /// Register a blocking method. Replaces any method with the same name and arity.
    pub fn method_fn<F>(
        &mut self,
        name: impl Into<String>,
        params: Vec<ParamSpec>,
        f: F,
    ) -> &mut MethodCandidate
    where
        F: Fn(Vec<Value>) -> MethodResult + Send + Sync + 'static,
    {
        self.insert(MethodCandidate::new(name, params, Arc::new(SyncFnMethod(f))))
    }

    pub fn insert(&mut self, candidate: MethodCandidate) -> &mut MethodCandidate {
        let overloads = self.methods.entry(candidate.name.clone()).or_default();
        match overloads.entry(candidate.arity()) {
            Entry::Occupied(mut slot) => {
                slot.insert(candidate);
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(candidate),
        }
    }

    /// All overloads of `name`, keyed by arity
    pub fn overloads(&self, name: &str) -> Option<&BTreeMap<usize, MethodCandidate>> {
        self.methods.get(name)
    }

    pub fn get(&self, name: &str, arity: usize) -> Option<&MethodCandidate> {
        self.methods.get(name)?.get(&arity)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Method names in sorted order, each listed once
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    /// Every overload, ordered by name then arity
    pub fn candidates(&self) -> impl Iterator<Item = &MethodCandidate> {
        self.methods.values().flat_map(|overloads| overloads.values())
    }

    /// Number of overloads
    pub fn len(&self) -> usize {
        self.methods.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Layer `other` on top of this registry; its overloads win on equal name and arity.
    pub fn merge(&mut self, other: MethodRegistry) {
        for (name, overloads) in other.methods {
            self.methods.entry(name).or_default().extend(overloads);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> MethodRegistry {
        let mut registry = MethodRegistry::new();
        registry
            .method_fn(
                "add",
                vec![
                    ParamSpec::new("a", ParamType::Integer),
                    ParamSpec::new("b", ParamType::Integer),
                ],
                |args| Ok(json!(args[0].as_i64().unwrap_or(0) + args[1].as_i64().unwrap_or(0))),
            )
            .describe("Add two integers");
        registry.method_fn("add", vec![ParamSpec::new("a", ParamType::Integer)], |args| {
            Ok(args[0].clone())
        });
        registry.method("ping", vec![], |_args| async { Ok(json!("pong")) });
        registry
    }

    #[test]
    fn test_overloads_by_arity() {
        let registry = registry();
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["add", "ping"]);
        assert_eq!(
            registry.overloads("add").unwrap().keys().copied().collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert!(registry.get("add", 3).is_none());
    }

    #[test]
    fn test_signature_and_description() {
        let registry = registry();
        let add = registry.get("add", 2).unwrap();
        assert_eq!(add.signature(), "add(a: integer, b: integer)");
        assert_eq!(add.description(), Some("Add two integers"));
        assert_eq!(
            add.to_description()["params"][1],
            json!({"name": "b", "type": "integer"})
        );
    }

    #[test]
    fn test_merge_overrides_same_arity() {
        let mut base = registry();
        let mut sub = MethodRegistry::new();
        sub.method_fn("ping", vec![], |_args| Ok(json!("pong from sub")));
        base.merge(sub);

        assert_eq!(base.len(), 3);
        assert!(base.get("ping", 0).is_some());
    }

    #[tokio::test]
    async fn test_invoke() {
        let registry = registry();
        let add = registry.get("add", 2).unwrap();
        assert_eq!(add.invoke(vec![json!(1), json!(2)]).await.unwrap(), json!(3));

        let ping = registry.get("ping", 0).unwrap();
        assert_eq!(ping.invoke(vec![]).await.unwrap(), json!("pong"));
    }

    #[test]
    fn test_anyhow_errors_keep_cause_chain() {
        let err = anyhow::anyhow!("disk full").context("saving report");
        match MethodError::from(err) {
            MethodError::Application { message, data } => {
                assert_eq!(message, "saving report");
                assert_eq!(data, Some(json!({"causes": ["saving report", "disk full"]})));
            }
            other => panic!("expected application error, got {:?}", other),
        }
    }
}
