// SPDX-FileCopyrightText: © 2023 Technical University of Munich, Chair of Connected Mobility
// SPDX-License-Identifier: MIT
use anyhow::Context;
use fnwire_api::discovery::{DiscoveryAPI, MetadataKey};
use fnwire_api::dispatcher::{AppRegistration, ConnectRequest, ConnectionAPI, DispatcherAPI, RegisteredFunction, ServeRequest};

use crate::{DispatchMode, FnwireModuleSettings};

#[cfg(test)]
pub mod test;

/// Post-configuration state. Only `Connected` owns a resource.
enum EngineState {
    Unconfigured,
    Serving { path: String },
    Connected(Box<dyn ConnectionAPI>),
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineStatus {
    Unconfigured,
    Serving { path: String },
    Connected { connection_id: String },
    Closed,
}

impl std::fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            EngineStatus::Unconfigured => write!(f, "unconfigured"),
            EngineStatus::Serving { path } => write!(f, "serving at {}", path),
            EngineStatus::Connected { connection_id } => write!(f, "connected ({})", connection_id),
            EngineStatus::Closed => write!(f, "closed"),
        }
    }
}

/// Discovers annotated methods and hands them to the dispatcher, once.
pub struct FnwireModule {
    settings: FnwireModuleSettings,
    discovery: Box<dyn DiscoveryAPI>,
    dispatcher: Box<dyn DispatcherAPI>,
    state: EngineState,
    registered: Vec<RegisteredFunction>,
}

impl FnwireModule {
    pub fn for_root(settings: FnwireModuleSettings, discovery: Box<dyn DiscoveryAPI>, dispatcher: Box<dyn DispatcherAPI>) -> Self {
        Self {
            settings,
            discovery,
            dispatcher,
            state: EngineState::Unconfigured,
            registered: vec![],
        }
    }

    pub fn settings(&self) -> &FnwireModuleSettings {
        &self.settings
    }

    pub fn status(&self) -> EngineStatus {
        match &self.state {
            EngineState::Unconfigured => EngineStatus::Unconfigured,
            EngineState::Serving { path } => EngineStatus::Serving { path: path.clone() },
            EngineState::Connected(connection) => EngineStatus::Connected {
                connection_id: connection.connection_id(),
            },
            EngineState::Closed => EngineStatus::Closed,
        }
    }

    /// Functions handed to the dispatcher by the successful configuration run.
    pub fn registered_functions(&self) -> &[RegisteredFunction] {
        &self.registered
    }

    /// Discover, aggregate and dispatch.
    ///
    /// Any failure of discovery, of mounting the middleware or of the worker
    /// handshake is returned as is; nothing is registered in that case.
    pub async fn configure(&mut self, consumer: &mut dyn fnwire_http::MiddlewareConsumer) -> anyhow::Result<()> {
        if !matches!(self.state, EngineState::Unconfigured) {
            anyhow::bail!("configuration runs once, module is already {}", self.status());
        }

        let functions = self.discover().await?;
        log::info!(
            "registering {} function(s) for client {} in {} mode",
            functions.len(),
            self.settings.client,
            self.settings.mode
        );

        match self.settings.mode {
            DispatchMode::Serve => {
                let handler = self.dispatcher.serve(ServeRequest {
                    client: self.settings.client.clone(),
                    functions: functions.clone(),
                })?;
                consumer
                    .apply(handler, &self.settings.path)
                    .with_context(|| format!("cannot mount functions at {}", self.settings.path))?;
                self.state = EngineState::Serving {
                    path: self.settings.path.clone(),
                };
            }
            DispatchMode::Connect => {
                let connection = self
                    .dispatcher
                    .connect(ConnectRequest {
                        apps: vec![AppRegistration {
                            client: self.settings.client.clone(),
                            functions: functions.clone(),
                        }],
                        options: self.settings.connect_options.clone(),
                    })
                    .await
                    .context("worker connection to the orchestration backend failed")?;
                log::info!("worker connected: {}", connection.connection_id());
                self.state = EngineState::Connected(connection);
            }
        }

        self.registered = functions;
        Ok(())
    }

    /// Close the worker connection, if any. No-op in every other state.
    pub async fn shutdown(&mut self) -> anyhow::Result<()> {
        match std::mem::replace(&mut self.state, EngineState::Closed) {
            EngineState::Connected(mut connection) => {
                let connection_id = connection.connection_id();
                log::info!("closing worker connection {}", connection_id);
                connection
                    .close()
                    .await
                    .with_context(|| format!("closing worker connection {} failed", connection_id))
            }
            other => {
                self.state = other;
                Ok(())
            }
        }
    }

    async fn discover(&self) -> anyhow::Result<Vec<RegisteredFunction>> {
        let discovery = &self.discovery;
        let (controller_functions, provider_functions, controller_triggers, provider_triggers) = futures::try_join!(
            async {
                discovery
                    .controller_methods_with_meta(MetadataKey::Function)
                    .await
                    .context("discovery of controller functions failed")
            },
            async {
                discovery
                    .provider_methods_with_meta(MetadataKey::Function)
                    .await
                    .context("discovery of provider functions failed")
            },
            async {
                discovery
                    .controller_methods_with_meta(MetadataKey::Trigger)
                    .await
                    .context("discovery of controller triggers failed")
            },
            async {
                discovery
                    .provider_methods_with_meta(MetadataKey::Trigger)
                    .await
                    .context("discovery of provider triggers failed")
            },
        )?;

        let functions: Vec<_> = controller_functions.into_iter().chain(provider_functions).collect();
        let triggers: Vec<_> = controller_triggers.into_iter().chain(provider_triggers).collect();
        log::debug!("discovered {} function record(s), {} trigger record(s)", functions.len(), triggers.len());

        Ok(crate::aggregation::build_registered_functions(&functions, &triggers))
    }
}
