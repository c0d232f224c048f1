// SPDX-FileCopyrightText: © 2023 Technical University of Munich, Chair of Connected Mobility
// SPDX-License-Identifier: MIT

pub mod route_table;

pub use route_table::RouteTable;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Patch,
}

/// Inbound call as seen by a middleware handler.
///
/// `path` is the request target including an optional query string, e.g.
/// `/api/inngest?fnId=send-welcome`.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub body: Option<Vec<u8>>,
    pub headers: std::collections::HashMap<String, String>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            body: None,
            headers: std::collections::HashMap::new(),
        }
    }

    pub fn with_json_body(mut self, body: &serde_json::Value) -> anyhow::Result<Self> {
        self.body = Some(serde_json::to_vec(body)?);
        self.headers.insert("content-type".to_string(), "application/json".to_string());
        Ok(self)
    }

    /// Path without the query string.
    pub fn route_path(&self) -> &str {
        match self.path.split_once('?') {
            Some((path, _)) => path,
            None => &self.path,
        }
    }

    /// First value of `key` in the query string, percent-decoded.
    pub fn query_param(&self, key: &str) -> Option<String> {
        let (_, query) = self.path.split_once('?')?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    /// Body parsed as JSON, `null` when the body is missing or empty.
    pub fn json_body(&self) -> anyhow::Result<serde_json::Value> {
        match &self.body {
            Some(body) if !body.is_empty() => Ok(serde_json::from_slice(body)?),
            _ => Ok(serde_json::Value::Null),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub body: Option<Vec<u8>>,
    pub status: u16,
    pub headers: std::collections::HashMap<String, String>,
}

impl HttpResponse {
    pub fn empty(status: u16) -> Self {
        Self {
            body: None,
            status,
            headers: std::collections::HashMap::new(),
        }
    }

    pub fn json(status: u16, body: &serde_json::Value) -> anyhow::Result<Self> {
        Ok(Self {
            body: Some(serde_json::to_vec(body)?),
            status,
            headers: std::collections::HashMap::from([("content-type".to_string(), "application/json".to_string())]),
        })
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            body: Some(body.as_bytes().to_vec()),
            status,
            headers: std::collections::HashMap::from([("content-type".to_string(), "text/plain".to_string())]),
        }
    }

    pub fn json_body(&self) -> anyhow::Result<serde_json::Value> {
        match &self.body {
            Some(body) if !body.is_empty() => Ok(serde_json::from_slice(body)?),
            _ => Ok(serde_json::Value::Null),
        }
    }
}

/// Request-handling middleware produced by the dispatcher in serve mode.
#[async_trait::async_trait]
pub trait MiddlewareHandler: Sync + Send {
    async fn handle(&self, request: HttpRequest) -> anyhow::Result<HttpResponse>;
}

/// Externally-owned routing layer on which middleware handlers are mounted.
pub trait MiddlewareConsumer: Send {
    fn apply(&mut self, handler: Box<dyn MiddlewareHandler>, route: &str) -> anyhow::Result<()>;
}
