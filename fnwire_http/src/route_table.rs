// SPDX-FileCopyrightText: © 2023 Technical University of Munich, Chair of Connected Mobility
// SPDX-License-Identifier: MIT
use crate::{HttpRequest, HttpResponse, MiddlewareConsumer, MiddlewareHandler};

struct Route {
    prefix: String,
    handler: Box<dyn MiddlewareHandler>,
}

/// Minimal request router: each handler owns a path and every sub-path below it.
#[derive(Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

fn normalize_route(route: &str) -> String {
    let trimmed = route.trim().trim_end_matches('/');
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

fn route_matches(prefix: &str, path: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn routes(&self) -> Vec<String> {
        self.routes.iter().map(|route| route.prefix.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Dispatch a request to the handler with the longest matching route.
    ///
    /// Unknown paths yield 404, handler failures yield 500.
    pub async fn dispatch(&self, request: HttpRequest) -> HttpResponse {
        let path = normalize_route(request.route_path());
        let route = self
            .routes
            .iter()
            .filter(|route| route_matches(&route.prefix, &path))
            .max_by_key(|route| route.prefix.len());

        match route {
            Some(route) => match route.handler.handle(request).await {
                Ok(response) => response,
                Err(err) => {
                    log::warn!("handler mounted at {} failed: {}", route.prefix, err);
                    HttpResponse::text(500, &err.to_string())
                }
            },
            None => {
                log::debug!("no route for {}", path);
                HttpResponse::empty(404)
            }
        }
    }
}

impl MiddlewareConsumer for RouteTable {
    fn apply(&mut self, handler: Box<dyn MiddlewareHandler>, route: &str) -> anyhow::Result<()> {
        let prefix = normalize_route(route);
        if self.routes.iter().any(|existing| existing.prefix == prefix) {
            anyhow::bail!("route already in use: {}", prefix);
        }
        log::info!("mounting middleware at {}", prefix);
        self.routes.push(Route { prefix, handler });
        Ok(())
    }
}
