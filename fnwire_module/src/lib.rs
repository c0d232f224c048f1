// SPDX-FileCopyrightText: © 2023 Technical University of Munich, Chair of Connected Mobility
// SPDX-License-Identifier: MIT
pub mod aggregation;
pub mod engine;
pub mod loopback;

pub use engine::{EngineStatus, FnwireModule};

pub const DEFAULT_PATH: &str = "/api/inngest";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// Functions are served by an HTTP middleware mounted at `path`. Default.
    #[default]
    Serve,
    /// This process opens a persistent worker connection to the backend.
    Connect,
}

impl std::fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            DispatchMode::Serve => write!(f, "serve"),
            DispatchMode::Connect => write!(f, "connect"),
        }
    }
}

fn default_path() -> String {
    String::from(DEFAULT_PATH)
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct FnwireModuleSettings {
    pub client: fnwire_api::client::ClientHandle,
    #[serde(default)]
    pub mode: DispatchMode,
    /// Only used in serve mode.
    #[serde(default = "default_path")]
    pub path: String,
    /// Only used in connect mode.
    #[serde(default)]
    pub connect_options: fnwire_api::dispatcher::ConnectOptions,
}

impl FnwireModuleSettings {
    pub fn new(client: fnwire_api::client::ClientHandle) -> Self {
        Self {
            client,
            mode: DispatchMode::default(),
            path: default_path(),
            connect_options: fnwire_api::dispatcher::ConnectOptions::default(),
        }
    }

    pub fn connect(client: fnwire_api::client::ClientHandle, connect_options: fnwire_api::dispatcher::ConnectOptions) -> Self {
        Self {
            mode: DispatchMode::Connect,
            connect_options,
            ..Self::new(client)
        }
    }
}

pub fn read_conf_from_file(filename: &str) -> anyhow::Result<FnwireModuleSettings> {
    let content = std::fs::read_to_string(filename).map_err(|err| anyhow::anyhow!("cannot read {}: {}", filename, err))?;
    Ok(toml::from_str::<FnwireModuleSettings>(&content)?)
}

pub fn fnwire_module_default_conf() -> String {
    String::from(
        r##"mode = "serve"
path = "/api/inngest"

[client]
id = "my-app"

[connect_options]
instance_id = "worker-1"
max_worker_concurrency = 10
"##,
    )
}
