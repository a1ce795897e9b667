//! Remote function table.
//!
//! # Design Decisions
//! - Built once at startup, then shared read-only behind an `Arc`
//! - Functions receive the whole `Call` and pick arguments by position,
//!   so any arity is accepted and missing arguments read as `Undefined`

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::Extensions;
use tower::BoxError;

use crate::wire::Value;

/// One invocation: the function name, positional arguments and whatever
/// middleware attached to the request.
#[derive(Debug, Default)]
pub struct Call {
    pub function: String,
    pub args: Vec<Value>,
    pub extensions: Extensions,
}

impl Call {
    pub fn new(function: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            function: function.into(),
            args,
            extensions: Extensions::new(),
        }
    }

    /// Argument at `index`, `Undefined` when the caller passed fewer.
    pub fn arg(&self, index: usize) -> &Value {
        const UNDEFINED: &Value = &Value::Undefined;
        self.args.get(index).unwrap_or(UNDEFINED)
    }

    /// Take ownership of the argument at `index`.
    pub fn take_arg(&mut self, index: usize) -> Value {
        self.args.get_mut(index).map(std::mem::take).unwrap_or_default()
    }

    /// A value stored by middleware or shared by the dispatcher.
    pub fn extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions.get::<T>()
    }
}

/// A function callable through the dispatcher.
#[async_trait]
pub trait RemoteFunction: Send + Sync + 'static {
    async fn invoke(&self, call: Call) -> Result<Value, BoxError>;
}

/// Adapter for async closures.
pub struct FnFunction<F>(F);

#[async_trait]
impl<F, Fut> RemoteFunction for FnFunction<F>
where
    F: Fn(Call) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, BoxError>> + Send + 'static,
{
    async fn invoke(&self, call: Call) -> Result<Value, BoxError> {
        (self.0)(call).await
    }
}

#[derive(Clone, Default)]
pub struct RemoteFunctionTable {
    functions: HashMap<String, Arc<dyn RemoteFunction>>,
}

impl RemoteFunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `function` under `name`, replacing any earlier entry.
    pub fn register(mut self, name: impl Into<String>, function: impl RemoteFunction) -> Self {
        let name = name.into();
        if self.functions.insert(name.clone(), Arc::new(function)).is_some() {
            tracing::warn!(function = %name, "Replacing remote function");
        }
        self
    }

    /// Register an async closure.
    pub fn register_fn<F, Fut>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Call) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, BoxError>> + Send + 'static,
    {
        self.register(name, FnFunction(f))
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn RemoteFunction>> {
        self.functions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl std::fmt::Debug for RemoteFunctionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteFunctionTable")
            .field("functions", &self.names())
            .finish()
    }
}
