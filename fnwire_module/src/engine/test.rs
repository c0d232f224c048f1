// SPDX-FileCopyrightText: © 2023 Technical University of Munich, Chair of Connected Mobility
// SPDX-License-Identifier: MIT
#![allow(clippy::all)]

use super::*;
use fnwire_api::client::ClientHandle;
use fnwire_api::definitions::{FunctionDefinition, TriggerArgument, TriggerDefinition};
use fnwire_api::discovery::{ContainerCategory, DiscoveredMethod, Metadata};
use fnwire_api::dispatcher::ConnectOptions;
use fnwire_api::method::{FunctionContext, Method};
use fnwire_http::{HttpMethod, HttpRequest, HttpResponse, MiddlewareHandler, RouteTable};
use futures::SinkExt;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

enum MockDispatcherEvent {
    Serve(ServeRequest),
    Connect(ConnectRequest),
    Close(String),
}

#[derive(Clone, Default)]
struct MockDiscovery {
    records: std::collections::HashMap<(ContainerCategory, MetadataKey), Vec<DiscoveredMethod>>,
    failing: Option<(ContainerCategory, MetadataKey)>,
    barrier: Option<std::sync::Arc<tokio::sync::Barrier>>,
    calls: std::sync::Arc<std::sync::Mutex<Vec<(ContainerCategory, MetadataKey)>>>,
}

impl MockDiscovery {
    fn with(mut self, category: ContainerCategory, key: MetadataKey, records: Vec<DiscoveredMethod>) -> Self {
        self.records.insert((category, key), records);
        self
    }

    async fn query(&self, category: ContainerCategory, key: MetadataKey) -> anyhow::Result<Vec<DiscoveredMethod>> {
        self.calls.lock().unwrap().push((category, key));
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        if self.failing == Some((category, key)) {
            return Err(anyhow::anyhow!("discovery unavailable"));
        }
        Ok(self.records.get(&(category, key)).cloned().unwrap_or_default())
    }
}

#[async_trait::async_trait]
impl DiscoveryAPI for MockDiscovery {
    async fn controller_methods_with_meta(&self, key: MetadataKey) -> anyhow::Result<Vec<DiscoveredMethod>> {
        self.query(ContainerCategory::Controller, key).await
    }
    async fn provider_methods_with_meta(&self, key: MetadataKey) -> anyhow::Result<Vec<DiscoveredMethod>> {
        self.query(ContainerCategory::Provider, key).await
    }
}

struct MockMiddleware {
    function_ids: Vec<String>,
}

#[async_trait::async_trait]
impl MiddlewareHandler for MockMiddleware {
    async fn handle(&self, _request: HttpRequest) -> anyhow::Result<HttpResponse> {
        HttpResponse::json(200, &serde_json::json!(self.function_ids))
    }
}

struct MockConnection {
    connection_id: String,
    fail_close: bool,
    sender: futures::channel::mpsc::UnboundedSender<MockDispatcherEvent>,
}

#[async_trait::async_trait]
impl ConnectionAPI for MockConnection {
    fn connection_id(&self) -> String {
        self.connection_id.clone()
    }
    async fn close(&mut self) -> anyhow::Result<()> {
        self.sender.send(MockDispatcherEvent::Close(self.connection_id.clone())).await.unwrap();
        if self.fail_close {
            return Err(anyhow::anyhow!("connection reset"));
        }
        Ok(())
    }
}

struct MockDispatcher {
    fail_connect: bool,
    fail_close: bool,
    sender: futures::channel::mpsc::UnboundedSender<MockDispatcherEvent>,
}

#[async_trait::async_trait]
impl DispatcherAPI for MockDispatcher {
    fn serve(&mut self, request: ServeRequest) -> anyhow::Result<Box<dyn MiddlewareHandler>> {
        let function_ids = request.functions.iter().map(|f| f.id().to_string()).collect();
        self.sender.unbounded_send(MockDispatcherEvent::Serve(request)).unwrap();
        Ok(Box::new(MockMiddleware { function_ids }))
    }
    async fn connect(&mut self, request: ConnectRequest) -> anyhow::Result<Box<dyn ConnectionAPI>> {
        self.sender.send(MockDispatcherEvent::Connect(request)).await.unwrap();
        if self.fail_connect {
            return Err(anyhow::anyhow!("handshake rejected"));
        }
        Ok(Box::new(MockConnection {
            connection_id: "test-connection-123".to_string(),
            fail_close: self.fail_close,
            sender: self.sender.clone(),
        }))
    }
}

struct Handlers {
    name: String,
}

fn method(name: &str) -> Method {
    Method::new(name, |this: std::sync::Arc<Handlers>, ctx: FunctionContext| async move {
        Ok(serde_json::json!({ "instance": this.name, "event": ctx.event }))
    })
}

fn function_record(method: &Method, id: &str) -> DiscoveredMethod {
    DiscoveredMethod {
        method: method.clone(),
        instance: std::sync::Arc::new(Handlers { name: id.to_string() }),
        meta: Metadata::Function(FunctionDefinition::new(id)),
    }
}

fn trigger_record(method: &Method, triggers: Vec<TriggerDefinition>) -> DiscoveredMethod {
    DiscoveredMethod {
        method: method.clone(),
        instance: std::sync::Arc::new(Handlers { name: "trigger".to_string() }),
        meta: Metadata::Triggers(triggers),
    }
}

fn client() -> ClientHandle {
    ClientHandle::new("test-app")
}

/// One controller function with a single event trigger.
fn single_function_discovery() -> MockDiscovery {
    let handler = method("handler");
    MockDiscovery::default()
        .with(ContainerCategory::Controller, MetadataKey::Function, vec![function_record(&handler, "test-fn")])
        .with(
            ContainerCategory::Controller,
            MetadataKey::Trigger,
            vec![trigger_record(&handler, vec![TriggerDefinition::event("test/event")])],
        )
}

fn setup(
    settings: FnwireModuleSettings,
    discovery: MockDiscovery,
    fail_connect: bool,
    fail_close: bool,
) -> (FnwireModule, futures::channel::mpsc::UnboundedReceiver<MockDispatcherEvent>) {
    let (sender, receiver) = futures::channel::mpsc::unbounded::<MockDispatcherEvent>();
    let dispatcher = MockDispatcher {
        fail_connect,
        fail_close,
        sender,
    };
    (FnwireModule::for_root(settings, Box::new(discovery), Box::new(dispatcher)), receiver)
}

#[tokio::test]
async fn test_serve_is_default_mode() {
    init_logger();
    let (mut module, mut receiver) = setup(FnwireModuleSettings::new(client()), single_function_discovery(), false, false);
    let mut routes = RouteTable::new();

    module.configure(&mut routes).await.unwrap();

    match receiver.try_next().unwrap().unwrap() {
        MockDispatcherEvent::Serve(request) => {
            assert_eq!(client(), request.client);
            assert_eq!(1, request.functions.len());
            assert_eq!("test-fn", request.functions[0].id());
            assert_eq!(TriggerArgument::Single(TriggerDefinition::event("test/event")), request.functions[0].triggers);
        }
        _ => panic!("expected serve"),
    }
    assert!(receiver.try_next().is_err(), "connect must not be invoked in serve mode");

    assert_eq!(vec![crate::DEFAULT_PATH.to_string()], routes.routes());
    let response = routes.dispatch(HttpRequest::new(HttpMethod::Get, "/api/inngest")).await;
    assert_eq!(serde_json::json!(["test-fn"]), response.json_body().unwrap());

    assert_eq!(EngineStatus::Serving { path: "/api/inngest".to_string() }, module.status());
    assert_eq!(1, module.registered_functions().len());
}

#[tokio::test]
async fn test_serve_custom_path() {
    let mut settings = FnwireModuleSettings::new(client());
    settings.path = "/internal/functions".to_string();
    let (mut module, _receiver) = setup(settings, single_function_discovery(), false, false);
    let mut routes = RouteTable::new();

    module.configure(&mut routes).await.unwrap();
    assert_eq!(vec!["/internal/functions".to_string()], routes.routes());
}

#[tokio::test]
async fn test_serve_mount_failure_propagates() {
    let (mut module, _receiver) = setup(FnwireModuleSettings::new(client()), single_function_discovery(), false, false);
    let mut routes = RouteTable::new();
    fnwire_http::MiddlewareConsumer::apply(&mut routes, Box::new(MockMiddleware { function_ids: vec![] }), "/api/inngest").unwrap();

    assert!(module.configure(&mut routes).await.is_err());
    assert_eq!(EngineStatus::Unconfigured, module.status());
    assert!(module.registered_functions().is_empty());
}

#[tokio::test]
async fn test_connect_mode() {
    init_logger();
    let options: ConnectOptions = serde_json::from_value(serde_json::json!({
        "instance_id": "test-worker-1",
        "max_worker_concurrency": 5,
        "handshake_timeout": 1000
    }))
    .unwrap();
    let (mut module, mut receiver) = setup(FnwireModuleSettings::connect(client(), options.clone()), single_function_discovery(), false, false);
    let mut routes = RouteTable::new();

    module.configure(&mut routes).await.unwrap();

    match receiver.try_next().unwrap().unwrap() {
        MockDispatcherEvent::Connect(request) => {
            assert_eq!(1, request.apps.len());
            assert_eq!(client(), request.apps[0].client);
            assert_eq!(1, request.apps[0].functions.len());
            assert_eq!("test-fn", request.apps[0].functions[0].id());
            assert_eq!(options, request.options);
            assert_eq!(Some(&serde_json::json!(1000)), request.options.extra.get("handshake_timeout"));
        }
        _ => panic!("expected connect"),
    }
    assert!(receiver.try_next().is_err());
    assert!(routes.is_empty(), "no HTTP registration in connect mode");
    assert_eq!(
        EngineStatus::Connected {
            connection_id: "test-connection-123".to_string()
        },
        module.status()
    );
}

#[tokio::test]
async fn test_connect_mode_default_options() {
    let mut settings = FnwireModuleSettings::new(client());
    settings.mode = DispatchMode::Connect;
    let (mut module, mut receiver) = setup(settings, single_function_discovery(), false, false);

    module.configure(&mut RouteTable::new()).await.unwrap();
    match receiver.try_next().unwrap().unwrap() {
        MockDispatcherEvent::Connect(request) => {
            assert_eq!(ConnectOptions::default(), request.options);
            assert_eq!(client(), request.apps[0].client);
        }
        _ => panic!("expected connect"),
    }
}

#[tokio::test]
async fn test_shutdown_closes_connection_once() {
    let (mut module, mut receiver) = setup(
        FnwireModuleSettings::connect(client(), ConnectOptions::default()),
        single_function_discovery(),
        false,
        false,
    );
    module.configure(&mut RouteTable::new()).await.unwrap();
    assert!(matches!(receiver.try_next().unwrap().unwrap(), MockDispatcherEvent::Connect(_)));

    module.shutdown().await.unwrap();
    match receiver.try_next().unwrap().unwrap() {
        MockDispatcherEvent::Close(connection_id) => assert_eq!("test-connection-123", connection_id),
        _ => panic!("expected close"),
    }
    assert_eq!(EngineStatus::Closed, module.status());

    module.shutdown().await.unwrap();
    assert!(receiver.try_next().is_err(), "close must be invoked exactly once");
}

#[tokio::test]
async fn test_shutdown_in_serve_mode_is_noop() {
    let (mut module, mut receiver) = setup(FnwireModuleSettings::new(client()), single_function_discovery(), false, false);

    // before configuration
    module.shutdown().await.unwrap();
    assert_eq!(EngineStatus::Unconfigured, module.status());

    module.configure(&mut RouteTable::new()).await.unwrap();
    assert!(matches!(receiver.try_next().unwrap().unwrap(), MockDispatcherEvent::Serve(_)));

    module.shutdown().await.unwrap();
    assert!(receiver.try_next().is_err());
    assert!(matches!(module.status(), EngineStatus::Serving { .. }));
}

#[tokio::test]
async fn test_close_failure_propagates() {
    let (mut module, mut receiver) = setup(
        FnwireModuleSettings::connect(client(), ConnectOptions::default()),
        single_function_discovery(),
        false,
        true,
    );
    module.configure(&mut RouteTable::new()).await.unwrap();
    let _ = receiver.try_next();

    assert!(module.shutdown().await.is_err());
    assert!(matches!(receiver.try_next().unwrap().unwrap(), MockDispatcherEvent::Close(_)));
    // no retry
    module.shutdown().await.unwrap();
    assert!(receiver.try_next().is_err());
}

#[tokio::test]
async fn test_discovery_failure_propagates() {
    init_logger();
    for failing in [
        (ContainerCategory::Controller, MetadataKey::Function),
        (ContainerCategory::Provider, MetadataKey::Function),
        (ContainerCategory::Controller, MetadataKey::Trigger),
        (ContainerCategory::Provider, MetadataKey::Trigger),
    ] {
        let mut discovery = single_function_discovery();
        discovery.failing = Some(failing);
        let (mut module, mut receiver) = setup(FnwireModuleSettings::new(client()), discovery, false, false);
        let mut routes = RouteTable::new();

        let err = module.configure(&mut routes).await.unwrap_err();
        assert!(format!("{:#}", err).contains("discovery unavailable"));
        assert!(receiver.try_next().is_err(), "nothing dispatched after a discovery failure");
        assert!(routes.is_empty());
        assert_eq!(EngineStatus::Unconfigured, module.status());
        assert!(module.registered_functions().is_empty());
    }
}

#[tokio::test]
async fn test_connect_failure_propagates() {
    let (mut module, mut receiver) = setup(
        FnwireModuleSettings::connect(client(), ConnectOptions::default()),
        single_function_discovery(),
        true,
        false,
    );

    let err = module.configure(&mut RouteTable::new()).await.unwrap_err();
    assert!(format!("{:#}", err).contains("handshake rejected"));
    assert!(matches!(receiver.try_next().unwrap().unwrap(), MockDispatcherEvent::Connect(_)));
    assert_eq!(EngineStatus::Unconfigured, module.status());
    assert!(module.registered_functions().is_empty());

    // nothing to close
    module.shutdown().await.unwrap();
    assert!(receiver.try_next().is_err());
}

#[tokio::test]
async fn test_configure_runs_once() {
    let (mut module, mut receiver) = setup(
        FnwireModuleSettings::connect(client(), ConnectOptions::default()),
        single_function_discovery(),
        false,
        false,
    );
    module.configure(&mut RouteTable::new()).await.unwrap();
    let _ = receiver.try_next();

    assert!(module.configure(&mut RouteTable::new()).await.is_err());
    assert!(receiver.try_next().is_err(), "the first connection must not be replaced");
    assert_eq!(
        EngineStatus::Connected {
            connection_id: "test-connection-123".to_string()
        },
        module.status()
    );
}

#[tokio::test]
async fn test_discovery_queries_are_concurrent() {
    let mut discovery = single_function_discovery();
    // every query waits until all four are in flight
    discovery.barrier = Some(std::sync::Arc::new(tokio::sync::Barrier::new(4)));
    let calls = discovery.calls.clone();
    let (mut module, _receiver) = setup(FnwireModuleSettings::new(client()), discovery, false, false);

    tokio::time::timeout(std::time::Duration::from_secs(5), module.configure(&mut RouteTable::new()))
        .await
        .expect("discovery queries were not issued concurrently")
        .unwrap();

    let mut calls = calls.lock().unwrap().clone();
    calls.sort_by_key(|(category, key)| (*category as u8, *key as u8));
    assert_eq!(
        vec![
            (ContainerCategory::Controller, MetadataKey::Function),
            (ContainerCategory::Controller, MetadataKey::Trigger),
            (ContainerCategory::Provider, MetadataKey::Function),
            (ContainerCategory::Provider, MetadataKey::Trigger),
        ],
        calls
    );
}

#[tokio::test]
async fn test_correlation_across_container_categories() {
    let shared = method("shared");
    let provider_only = method("provider_only");
    let trigger_only = method("trigger_only");

    let discovery = MockDiscovery::default()
        .with(ContainerCategory::Controller, MetadataKey::Function, vec![function_record(&shared, "shared")])
        .with(ContainerCategory::Provider, MetadataKey::Function, vec![function_record(&provider_only, "provider-only")])
        .with(
            ContainerCategory::Controller,
            MetadataKey::Trigger,
            vec![trigger_record(&shared, vec![TriggerDefinition::event("a")])],
        )
        .with(
            ContainerCategory::Provider,
            MetadataKey::Trigger,
            vec![
                trigger_record(&shared, vec![TriggerDefinition::event("a"), TriggerDefinition::cron("b")]),
                trigger_record(&trigger_only, vec![TriggerDefinition::event("ignored")]),
            ],
        );
    let (mut module, _receiver) = setup(FnwireModuleSettings::new(client()), discovery, false, false);
    module.configure(&mut RouteTable::new()).await.unwrap();

    let registered = module.registered_functions();
    assert_eq!(2, registered.len());
    assert_eq!("shared", registered[0].id());
    assert_eq!(
        TriggerArgument::Many(vec![TriggerDefinition::event("a"), TriggerDefinition::cron("b")]),
        registered[0].triggers
    );
    assert_eq!("provider-only", registered[1].id());
    assert_eq!(TriggerArgument::Absent, registered[1].triggers);

    let result = registered[0].handler.invoke(FunctionContext::new(serde_json::json!("e"))).await.unwrap();
    assert_eq!(serde_json::json!({"instance": "shared", "event": "e"}), result);
}

#[tokio::test]
async fn test_two_functions_with_stacked_triggers_in_connect_mode() {
    let first = method("first");
    let second = method("second");
    // stored order of two stacked annotations: closest to the method first
    let discovery = MockDiscovery::default()
        .with(
            ContainerCategory::Provider,
            MetadataKey::Function,
            vec![function_record(&first, "first"), function_record(&second, "second")],
        )
        .with(
            ContainerCategory::Provider,
            MetadataKey::Trigger,
            vec![
                trigger_record(&first, vec![TriggerDefinition::cron("0 2 * * *"), TriggerDefinition::event("created")]),
                trigger_record(&second, vec![TriggerDefinition::cron("0 2 * * *"), TriggerDefinition::event("updated")]),
            ],
        );
    let (mut module, mut receiver) = setup(
        FnwireModuleSettings::connect(client(), ConnectOptions::default()),
        discovery,
        false,
        false,
    );
    module.configure(&mut RouteTable::new()).await.unwrap();

    match receiver.try_next().unwrap().unwrap() {
        MockDispatcherEvent::Connect(request) => {
            let functions = &request.apps[0].functions;
            assert_eq!(2, functions.len());
            assert_eq!(
                TriggerArgument::Many(vec![TriggerDefinition::cron("0 2 * * *"), TriggerDefinition::event("created")]),
                functions[0].triggers
            );
            assert_eq!(
                TriggerArgument::Many(vec![TriggerDefinition::cron("0 2 * * *"), TriggerDefinition::event("updated")]),
                functions[1].triggers
            );
        }
        _ => panic!("expected connect"),
    }
}
