// SPDX-FileCopyrightText: © 2023 Technical University of Munich, Chair of Connected Mobility
// SPDX-License-Identifier: MIT
use crate::registry::AnnotationRegistry;
use fnwire_api::client::ClientHandle;
use fnwire_api::definitions::{FunctionDefinition, TriggerDefinition};
use fnwire_api::method::Method;

/// One annotation, not yet applied to a method.
#[derive(Debug, Clone, PartialEq)]
pub enum Decorator {
    Function(FunctionDefinition),
    Trigger(Vec<TriggerDefinition>),
}

/// Annotation surface bound to one SDK client.
///
/// ```ignore
/// let fns = Annotations::new(ClientHandle::new("shop"));
/// fns.decorate(&send_welcome, vec![
///     fns.function(FunctionDefinition::new("send-welcome")),
///     fns.trigger([TriggerDefinition::event("user/created")]),
///     fns.trigger([TriggerDefinition::cron("0 2 * * *")]),
/// ]);
/// ```
#[derive(Clone)]
pub struct Annotations {
    client: ClientHandle,
    registry: AnnotationRegistry,
}

impl Annotations {
    pub fn new(client: ClientHandle) -> Self {
        Self::with_registry(client, AnnotationRegistry::new())
    }

    pub fn with_registry(client: ClientHandle, registry: AnnotationRegistry) -> Self {
        Self { client, registry }
    }

    pub fn client(&self) -> &ClientHandle {
        &self.client
    }

    pub fn registry(&self) -> &AnnotationRegistry {
        &self.registry
    }

    pub fn function(&self, definition: FunctionDefinition) -> Decorator {
        Decorator::Function(definition)
    }

    /// Variadic trigger annotation. An argument that is itself a JSON array
    /// contributes its elements (one level of flattening).
    pub fn trigger<I>(&self, definitions: I) -> Decorator
    where
        I: IntoIterator<Item = TriggerDefinition>,
    {
        let mut flattened = vec![];
        for definition in definitions {
            match definition.0 {
                serde_json::Value::Array(items) => flattened.extend(items.into_iter().map(TriggerDefinition)),
                other => flattened.push(TriggerDefinition(other)),
            }
        }
        Decorator::Trigger(flattened)
    }

    /// Apply a single decorator to `method`.
    pub fn apply(&self, method: &Method, decorator: Decorator) {
        match decorator {
            Decorator::Function(definition) => self.registry.record_function(method, definition),
            Decorator::Trigger(definitions) => self.registry.record_trigger(method, definitions),
        }
    }

    /// Apply a stack of decorators given in declaration order (top to bottom).
    ///
    /// IMPORTANT: stacked decorators take effect closest-to-the-method first,
    /// so the list is applied in REVERSE. `[trigger(A), trigger(B)]` stores
    /// `[B, A]`.
    pub fn decorate(&self, method: &Method, decorators: Vec<Decorator>) {
        for decorator in decorators.into_iter().rev() {
            self.apply(method, decorator);
        }
    }
}

impl From<ClientHandle> for Annotations {
    fn from(client: ClientHandle) -> Self {
        Self::new(client)
    }
}
