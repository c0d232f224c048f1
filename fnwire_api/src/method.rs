// SPDX-FileCopyrightText: © 2023 Technical University of Munich, Chair of Connected Mobility
// SPDX-License-Identifier: MIT
use std::any::Any;
use std::sync::Arc;

/// Owning object of an annotated method.
pub type Instance = Arc<dyn Any + Send + Sync>;

pub type HandlerFuture = futures::future::BoxFuture<'static, anyhow::Result<serde_json::Value>>;

type RawHandler = dyn Fn(Instance, FunctionContext) -> HandlerFuture + Send + Sync;

/// Input of one function run.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionContext {
    pub event: serde_json::Value,
    pub run_id: String,
}

impl FunctionContext {
    pub fn new(event: serde_json::Value) -> Self {
        Self {
            event,
            run_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// Stable handle identifying a method, independent of its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodIdentity(usize);

struct MethodInner {
    name: String,
    handler: Box<RawHandler>,
}

/// A method of some type `T`, callable on any instance of `T`.
///
/// Clones share the same identity. Two methods created separately never
/// compare equal, even with the same name.
#[derive(Clone)]
pub struct Method {
    inner: Arc<MethodInner>,
}

impl Method {
    pub fn new<T, F, Fut>(name: &str, f: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(Arc<T>, FunctionContext) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = anyhow::Result<serde_json::Value>> + Send + 'static,
    {
        let method_name = name.to_string();
        let handler = move |instance: Instance, ctx: FunctionContext| -> HandlerFuture {
            match instance.downcast::<T>() {
                Ok(receiver) => Box::pin(f(receiver, ctx)),
                Err(_) => {
                    let method_name = method_name.clone();
                    Box::pin(async move {
                        Err(anyhow::anyhow!(
                            "receiver of method {} is not a {}",
                            method_name,
                            std::any::type_name::<T>()
                        ))
                    })
                }
            }
        };
        Self {
            inner: Arc::new(MethodInner {
                name: name.to_string(),
                handler: Box::new(handler),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn identity(&self) -> MethodIdentity {
        MethodIdentity(Arc::as_ptr(&self.inner) as *const () as usize)
    }

    /// Pair this method with its receiver.
    pub fn bind(&self, instance: Instance) -> BoundHandler {
        BoundHandler {
            method: self.clone(),
            instance,
        }
    }
}

impl PartialEq for Method {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Method {}

impl std::fmt::Debug for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Method").field("name", &self.inner.name).field("identity", &self.identity()).finish()
    }
}

/// A method permanently paired with the instance it runs on.
#[derive(Clone)]
pub struct BoundHandler {
    method: Method,
    instance: Instance,
}

impl BoundHandler {
    pub fn invoke(&self, ctx: FunctionContext) -> HandlerFuture {
        (self.method.inner.handler)(self.instance.clone(), ctx)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }
}

impl std::fmt::Debug for BoundHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("BoundHandler").field("method", &self.method).finish_non_exhaustive()
    }
}
