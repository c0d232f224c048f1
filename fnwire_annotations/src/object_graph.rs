// SPDX-FileCopyrightText: © 2023 Technical University of Munich, Chair of Connected Mobility
// SPDX-License-Identifier: MIT
use crate::registry::AnnotationRegistry;
use fnwire_api::discovery::{ContainerCategory, DiscoveredMethod, DiscoveryAPI, Metadata, MetadataKey};
use fnwire_api::method::{Instance, Method};

struct Registration {
    category: ContainerCategory,
    instance: Instance,
    methods: Vec<Method>,
}

/// In-memory object graph: instances grouped as controllers or providers,
/// each listing the methods it exposes. Metadata is looked up in the
/// annotation registry at query time.
#[derive(Clone)]
pub struct ObjectGraph {
    registry: AnnotationRegistry,
    registrations: std::sync::Arc<std::sync::RwLock<Vec<Registration>>>,
}

impl ObjectGraph {
    pub fn new(registry: AnnotationRegistry) -> Self {
        Self {
            registry,
            registrations: std::sync::Arc::new(std::sync::RwLock::new(vec![])),
        }
    }

    pub fn add_controller<T: std::any::Any + Send + Sync>(&self, instance: std::sync::Arc<T>, methods: Vec<Method>) {
        self.add(ContainerCategory::Controller, instance, methods);
    }

    pub fn add_provider<T: std::any::Any + Send + Sync>(&self, instance: std::sync::Arc<T>, methods: Vec<Method>) {
        self.add(ContainerCategory::Provider, instance, methods);
    }

    pub fn add(&self, category: ContainerCategory, instance: Instance, methods: Vec<Method>) {
        log::debug!("adding {:?} with {} method(s)", category, methods.len());
        self.registrations
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(Registration { category, instance, methods });
    }

    /// Every method of the given category carrying metadata at `key`, in registration order.
    pub fn methods_with_meta(&self, category: ContainerCategory, key: MetadataKey) -> Vec<DiscoveredMethod> {
        let registrations = self.registrations.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut found = vec![];
        for registration in registrations.iter().filter(|r| r.category == category) {
            for method in &registration.methods {
                let meta = match key {
                    MetadataKey::Function => self.registry.get_function(method).map(Metadata::Function),
                    MetadataKey::Trigger => self.registry.get_triggers(method).map(Metadata::Triggers),
                };
                if let Some(meta) = meta {
                    found.push(DiscoveredMethod {
                        method: method.clone(),
                        instance: registration.instance.clone(),
                        meta,
                    });
                }
            }
        }
        found
    }
}

#[async_trait::async_trait]
impl DiscoveryAPI for ObjectGraph {
    async fn controller_methods_with_meta(&self, key: MetadataKey) -> anyhow::Result<Vec<DiscoveredMethod>> {
        Ok(self.methods_with_meta(ContainerCategory::Controller, key))
    }

    async fn provider_methods_with_meta(&self, key: MetadataKey) -> anyhow::Result<Vec<DiscoveredMethod>> {
        Ok(self.methods_with_meta(ContainerCategory::Provider, key))
    }
}
