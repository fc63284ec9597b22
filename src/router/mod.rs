use crate::config::RouteConfig;
use crate::error::{GatewayError, Result};
use http::Method;
use matchit::Router as MatchitRouter;
use std::collections::HashMap;

/// Route information
#[derive(Debug, Clone)]
pub struct Route {
    /// Logical service name resolved through the registry
    pub service: String,
    /// Allowed HTTP methods (empty means all methods allowed)
    pub methods: Vec<Method>,
    /// Whether to strip the matched prefix when forwarding
    pub strip_prefix: bool,
    /// Route description
    pub description: String,
}

/// Gateway router for matching incoming requests to logical services
#[derive(Debug, Clone)]
pub struct Router {
    /// Path-based router using matchit
    matcher: MatchitRouter<Route>,
    /// Registered path patterns, in registration order
    paths: Vec<String>,
}

impl Router {
    /// Create a new router from route configurations
    pub fn new(routes: Vec<RouteConfig>) -> Result<Self> {
        let mut matcher = MatchitRouter::new();
        let mut paths = Vec::with_capacity(routes.len());

        for route_config in routes {
            let methods = route_config
                .methods
                .iter()
                .map(|m| {
                    Method::from_bytes(m.to_uppercase().as_bytes())
                        .map_err(|_| GatewayError::InvalidMethod(m.clone()))
                })
                .collect::<Result<Vec<_>>>()?;

            let route = Route {
                service: route_config.service,
                methods,
                strip_prefix: route_config.strip_prefix,
                description: route_config.description,
            };

            // Convert path syntax from :param to {param} and *path to {*path}
            let matchit_path = convert_path_syntax(&route_config.path);

            matcher.insert(&matchit_path, route).map_err(|e| {
                GatewayError::InvalidRoute(format!("Failed to insert route: {}", e))
            })?;
            paths.push(route_config.path);
        }

        Ok(Self { matcher, paths })
    }

    /// Match a request path and method to a route
    pub fn match_route(&self, path: &str, method: &Method) -> Result<RouteMatch> {
        let matched = self
            .matcher
            .at(path)
            .map_err(|_| GatewayError::RouteNotFound(path.to_string()))?;

        let route = matched.value;

        // Empty methods means all methods are allowed
        if !route.methods.is_empty() && !route.methods.contains(method) {
            return Err(GatewayError::InvalidMethod(format!(
                "Method {} not allowed for path {}",
                method, path
            )));
        }

        let params: HashMap<String, String> = matched
            .params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        Ok(RouteMatch {
            route: route.clone(),
            params,
            matched_path: path.to_string(),
        })
    }

    /// Registered path patterns
    pub fn routes(&self) -> &[String] {
        &self.paths
    }
}

/// Result of matching a route
#[derive(Debug, Clone)]
pub struct RouteMatch {
    /// The matched route
    pub route: Route,
    /// Path parameters extracted from the URL
    pub params: HashMap<String, String>,
    /// The original matched path
    pub matched_path: String,
}

impl RouteMatch {
    /// Build the upstream URL from a resolved service base URL
    pub fn build_upstream_url(&self, base_url: &str, original_path: &str) -> String {
        if self.route.strip_prefix {
            let remaining = original_path
                .strip_prefix(&self.matched_path)
                .unwrap_or(original_path);
            format!("{}{}", base_url.trim_end_matches('/'), remaining)
        } else {
            format!("{}{}", base_url.trim_end_matches('/'), original_path)
        }
    }
}

/// Convert path syntax from Express-style (:param, *path) to matchit syntax ({param}, {*path})
fn convert_path_syntax(path: &str) -> String {
    let mut result = String::new();
    let mut chars = path.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            ':' => {
                result.push('{');
                while let Some(&next_ch) = chars.peek() {
                    if next_ch.is_alphanumeric() || next_ch == '_' {
                        result.push(chars.next().unwrap());
                    } else {
                        break;
                    }
                }
                result.push('}');
            }
            '*' => {
                result.push_str("{*");
                while let Some(&next_ch) = chars.peek() {
                    if next_ch.is_alphanumeric() || next_ch == '_' {
                        result.push(chars.next().unwrap());
                    } else {
                        break;
                    }
                }
                result.push('}');
            }
            _ => result.push(ch),
        }
    }

    result
}
