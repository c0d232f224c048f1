// SPDX-FileCopyrightText: © 2023 Technical University of Munich, Chair of Connected Mobility
// SPDX-License-Identifier: MIT

/// Handle to the orchestration SDK client on whose behalf functions are registered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ClientHandle {
    /// Application identifier announced to the orchestration backend.
    pub id: String,
}

impl ClientHandle {
    pub fn new(id: &str) -> Self {
        Self { id: id.to_string() }
    }
}

impl std::fmt::Display for ClientHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}
