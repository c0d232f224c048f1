// SPDX-FileCopyrightText: © 2023 Technical University of Munich, Chair of Connected Mobility
// SPDX-License-Identifier: MIT
use fnwire_api::definitions::{FunctionDefinition, TriggerDefinition};
use fnwire_api::method::{Method, MethodIdentity};

struct AnnotatedEntry {
    // held so the identity cannot be reused by another method
    _method: Method,
    function: Option<FunctionDefinition>,
    triggers: Option<Vec<TriggerDefinition>>,
}

#[derive(Default)]
struct RegistryInner {
    entries: std::collections::HashMap<MethodIdentity, AnnotatedEntry>,
}

impl RegistryInner {
    fn entry(&mut self, method: &Method) -> &mut AnnotatedEntry {
        self.entries.entry(method.identity()).or_insert_with(|| AnnotatedEntry {
            _method: method.clone(),
            function: None,
            triggers: None,
        })
    }
}

/// Side-table of function and trigger metadata, keyed by method identity.
///
/// Clones share the same table.
#[derive(Clone, Default)]
pub struct AnnotationRegistry {
    inner: std::sync::Arc<std::sync::RwLock<RegistryInner>>,
}

impl AnnotationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, RegistryInner> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, RegistryInner> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Attach the function definition of `method`. A second call replaces the
    /// first one: allowed, but a method should carry a single function annotation.
    pub fn record_function(&self, method: &Method, definition: FunctionDefinition) {
        let mut inner = self.write();
        let entry = inner.entry(method);
        if let Some(previous) = &entry.function {
            log::warn!("method {} already annotated as function {}, replacing with {}", method.name(), previous.id, definition.id);
        }
        entry.function = Some(definition);
    }

    /// Append `definitions` to the trigger sequence of `method`. Never replaces.
    pub fn record_trigger(&self, method: &Method, definitions: Vec<TriggerDefinition>) {
        let mut inner = self.write();
        inner.entry(method).triggers.get_or_insert_with(Vec::new).extend(definitions);
    }

    pub fn get_function(&self, method: &Method) -> Option<FunctionDefinition> {
        self.read().entries.get(&method.identity()).and_then(|entry| entry.function.clone())
    }

    /// `None` when `method` never received a trigger annotation.
    pub fn get_triggers(&self, method: &Method) -> Option<Vec<TriggerDefinition>> {
        self.read().entries.get(&method.identity()).and_then(|entry| entry.triggers.clone())
    }

    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
