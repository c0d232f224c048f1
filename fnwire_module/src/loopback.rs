// SPDX-FileCopyrightText: © 2023 Technical University of Munich, Chair of Connected Mobility
// SPDX-License-Identifier: MIT

//! In-process dispatcher: serves registered functions over the route table
//! and keeps a table of connected workers instead of talking to a backend.

use fnwire_api::client::ClientHandle;
use fnwire_api::dispatcher::{ConnectOptions, ConnectRequest, ConnectionAPI, DispatcherAPI, RegisteredFunction, ServeRequest};
use fnwire_api::method::FunctionContext;
use fnwire_http::{HttpMethod, HttpRequest, HttpResponse, MiddlewareHandler};

#[derive(Debug, Clone, PartialEq)]
pub struct LoopbackWorker {
    pub apps: Vec<ClientHandle>,
    pub function_ids: Vec<String>,
    pub options: ConnectOptions,
}

type WorkerTable = std::sync::Arc<tokio::sync::Mutex<std::collections::HashMap<String, LoopbackWorker>>>;

#[derive(Clone, Default)]
pub struct LoopbackDispatcher {
    workers: WorkerTable,
}

impl LoopbackDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Workers currently connected, by connection id.
    pub async fn connected_workers(&self) -> std::collections::HashMap<String, LoopbackWorker> {
        self.workers.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl DispatcherAPI for LoopbackDispatcher {
    fn serve(&mut self, request: ServeRequest) -> anyhow::Result<Box<dyn MiddlewareHandler>> {
        Ok(Box::new(LoopbackHandler {
            client: request.client,
            functions: request.functions,
        }))
    }

    async fn connect(&mut self, request: ConnectRequest) -> anyhow::Result<Box<dyn ConnectionAPI>> {
        if request.apps.is_empty() {
            anyhow::bail!("a worker must expose at least one app");
        }
        let connection_id = uuid::Uuid::new_v4().to_string();
        let worker = LoopbackWorker {
            apps: request.apps.iter().map(|app| app.client.clone()).collect(),
            function_ids: request
                .apps
                .iter()
                .flat_map(|app| app.functions.iter().map(|f| f.id().to_string()))
                .collect(),
            options: request.options,
        };
        log::info!("worker {} connected with {} function(s)", connection_id, worker.function_ids.len());
        self.workers.lock().await.insert(connection_id.clone(), worker);
        Ok(Box::new(LoopbackConnection {
            connection_id,
            workers: self.workers.clone(),
        }))
    }
}

pub struct LoopbackConnection {
    connection_id: String,
    workers: WorkerTable,
}

#[async_trait::async_trait]
impl ConnectionAPI for LoopbackConnection {
    fn connection_id(&self) -> String {
        self.connection_id.clone()
    }

    async fn close(&mut self) -> anyhow::Result<()> {
        match self.workers.lock().await.remove(&self.connection_id) {
            Some(_) => Ok(()),
            None => Err(anyhow::anyhow!("worker connection {} already closed", self.connection_id)),
        }
    }
}

/// `GET` lists the served functions, `POST ?fnId=<id>` runs one with the
/// JSON body as event.
pub struct LoopbackHandler {
    client: ClientHandle,
    functions: Vec<RegisteredFunction>,
}

impl LoopbackHandler {
    fn introspect(&self) -> anyhow::Result<HttpResponse> {
        let functions: Vec<serde_json::Value> = self
            .functions
            .iter()
            .map(|f| {
                serde_json::json!({
                    "id": f.id(),
                    "name": f.definition.name,
                    "triggers": f.triggers.to_value(),
                })
            })
            .collect();
        HttpResponse::json(200, &serde_json::json!({ "app_id": self.client.id, "functions": functions }))
    }

    async fn run(&self, request: &HttpRequest) -> anyhow::Result<HttpResponse> {
        let function_id = match request.query_param("fnId") {
            Some(id) => id,
            None => return Ok(HttpResponse::text(400, "missing fnId")),
        };
        let function = match self.functions.iter().find(|f| f.id() == function_id) {
            Some(function) => function,
            None => return Ok(HttpResponse::text(404, &format!("unknown function {}", function_id))),
        };
        let event = match request.json_body() {
            Ok(event) => event,
            Err(err) => return Ok(HttpResponse::text(400, &format!("invalid event body: {}", err))),
        };
        match function.handler.invoke(FunctionContext::new(event)).await {
            Ok(result) => HttpResponse::json(200, &serde_json::json!({ "result": result })),
            Err(err) => {
                log::warn!("function {} failed: {}", function_id, err);
                Ok(HttpResponse::text(500, &err.to_string()))
            }
        }
    }
}

#[async_trait::async_trait]
impl MiddlewareHandler for LoopbackHandler {
    async fn handle(&self, request: HttpRequest) -> anyhow::Result<HttpResponse> {
        match request.method {
            HttpMethod::Get => self.introspect(),
            HttpMethod::Post => self.run(&request).await,
            _ => Ok(HttpResponse::empty(405)),
        }
    }
}
