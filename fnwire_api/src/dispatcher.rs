// SPDX-FileCopyrightText: © 2023 Technical University of Munich, Chair of Connected Mobility
// SPDX-License-Identifier: MIT
use crate::client::ClientHandle;
use crate::definitions::{FunctionDefinition, TriggerArgument};
use crate::method::BoundHandler;

/// A function ready to be handed to the orchestration SDK.
#[derive(Debug, Clone)]
pub struct RegisteredFunction {
    pub definition: FunctionDefinition,
    pub triggers: TriggerArgument,
    pub handler: BoundHandler,
}

impl RegisteredFunction {
    pub fn id(&self) -> &str {
        &self.definition.id
    }
}

/// Options of a persistent worker connection.
///
/// Keys other than `instance_id` and `max_worker_concurrency` are kept in
/// `extra` and forwarded verbatim.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ConnectOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_worker_concurrency: Option<u32>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct ServeRequest {
    pub client: ClientHandle,
    pub functions: Vec<RegisteredFunction>,
}

#[derive(Debug, Clone)]
pub struct AppRegistration {
    pub client: ClientHandle,
    pub functions: Vec<RegisteredFunction>,
}

#[derive(Debug, Clone)]
pub struct ConnectRequest {
    pub apps: Vec<AppRegistration>,
    pub options: ConnectOptions,
}

/// Live outbound worker connection.
#[async_trait::async_trait]
pub trait ConnectionAPI: Sync + Send {
    fn connection_id(&self) -> String;
    async fn close(&mut self) -> anyhow::Result<()>;
}

/// The orchestration SDK surface: HTTP serving or a persistent worker connection.
#[async_trait::async_trait]
pub trait DispatcherAPI: Sync + Send {
    fn serve(&mut self, request: ServeRequest) -> anyhow::Result<Box<dyn fnwire_http::MiddlewareHandler>>;
    async fn connect(&mut self, request: ConnectRequest) -> anyhow::Result<Box<dyn ConnectionAPI>>;
}
