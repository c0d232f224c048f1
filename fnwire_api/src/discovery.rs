// SPDX-FileCopyrightText: © 2023 Technical University of Munich, Chair of Connected Mobility
// SPDX-License-Identifier: MIT
use crate::definitions::{FunctionDefinition, TriggerDefinition};
use crate::method::{Instance, Method};

/// Kind of metadata a discovery query looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataKey {
    Function,
    Trigger,
}

impl MetadataKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataKey::Function => "FNWIRE_FUNCTION",
            MetadataKey::Trigger => "FNWIRE_TRIGGER",
        }
    }
}

impl std::fmt::Display for MetadataKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The two kinds of container scanned by discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerCategory {
    /// Request-handling classes.
    Controller,
    /// Plain injectable classes.
    Provider,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Metadata {
    Function(FunctionDefinition),
    Triggers(Vec<TriggerDefinition>),
}

/// One method found by a discovery query, with the metadata stored at the queried key.
#[derive(Debug, Clone)]
pub struct DiscoveredMethod {
    pub method: Method,
    pub instance: Instance,
    pub meta: Metadata,
}

impl DiscoveredMethod {
    pub fn function_definition(&self) -> Option<&FunctionDefinition> {
        match &self.meta {
            Metadata::Function(definition) => Some(definition),
            Metadata::Triggers(_) => None,
        }
    }

    pub fn trigger_definitions(&self) -> &[TriggerDefinition] {
        match &self.meta {
            Metadata::Function(_) => &[],
            Metadata::Triggers(triggers) => triggers,
        }
    }
}

/// Read-only view over a live object graph.
///
/// Both queries may be issued concurrently.
#[async_trait::async_trait]
pub trait DiscoveryAPI: Sync + Send {
    async fn controller_methods_with_meta(&self, key: MetadataKey) -> anyhow::Result<Vec<DiscoveredMethod>>;
    async fn provider_methods_with_meta(&self, key: MetadataKey) -> anyhow::Result<Vec<DiscoveredMethod>>;
}
