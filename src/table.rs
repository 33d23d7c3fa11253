//! # Route Table
//!
//! Routes, groups and middleware described in YAML and resolved against a
//! [`HandlerRegistry`].
//!
//! ```yaml
//! debug: false
//! pool:
//!   max_idle: 512
//!   prewarm: 64
//! middleware: [recover, request_logger]
//! routes:
//!   - { method: GET, path: /health, handler: ok }
//!   - { methods: [GET, POST], path: /echo/*rest, handler: echo }
//!   - { method: ANY, path: /anything, handler: echo }
//! groups:
//!   - prefix: /api/v1
//!     middleware: [request_id]
//!     routes:
//!       - { method: GET, path: /users/:id, handler: echo }
//!     groups:
//!       - prefix: /admin
//!         routes:
//!           - { method: DELETE, path: /users/:id, handler: no_content }
//! ```
//!
//! A route without `method`/`methods` is registered for `GET`. `ANY` expands
//! to every standard method. Unknown handler or middleware names and invalid
//! methods fail the whole table; nothing is served from a half-applied table.

use anyhow::Context as _;
use http::Method;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use tracing::info;

use crate::config::{DispatchConfig, PoolConfig};
use crate::dispatcher::{Dispatcher, RouteRegistrar, ANY_METHODS};
use crate::error::RouteError;
use crate::registry::HandlerRegistry;

/// One route entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<String>,
    pub path: String,
    pub handler: String,
}

/// A prefix with its own middleware, routes and nested groups
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GroupSpec {
    pub prefix: String,
    pub middleware: Vec<String>,
    pub routes: Vec<RouteSpec>,
    pub groups: Vec<GroupSpec>,
}

/// Top-level route table document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RouteTable {
    pub debug: Option<bool>,
    pub pool: Option<PoolConfig>,
    pub middleware: Vec<String>,
    pub routes: Vec<RouteSpec>,
    pub groups: Vec<GroupSpec>,
}

impl RouteSpec {
    /// Methods this entry registers
    pub fn resolve_methods(&self) -> Result<Vec<Method>, RouteError> {
        let names: Vec<&str> = match (&self.method, self.methods.is_empty()) {
            (Some(m), true) => vec![m.as_str()],
            (None, false) => self.methods.iter().map(String::as_str).collect(),
            (Some(m), false) => std::iter::once(m.as_str())
                .chain(self.methods.iter().map(String::as_str))
                .collect(),
            (None, true) => return Ok(vec![Method::GET]),
        };

        // First occurrence wins, so `[GET, ANY]` registers GET once
        let mut methods: Vec<Method> = Vec::with_capacity(names.len());
        let mut push = |method: Method| {
            if !methods.contains(&method) {
                methods.push(method);
            }
        };
        for name in names {
            let upper = name.trim().to_ascii_uppercase();
            if upper == "ANY" {
                ANY_METHODS.iter().cloned().for_each(&mut push);
                continue;
            }
            let method = Method::from_bytes(upper.as_bytes())
                .map_err(|_| RouteError::InvalidMethod(name.to_string()))?;
            push(method);
        }
        Ok(methods)
    }
}

impl RouteTable {
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(yaml).context("invalid route table")
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read route table {}", path.display()))?;
        Self::from_yaml_str(&text).with_context(|| format!("in {}", path.display()))
    }

    /// Defaults, then the table's settings, then environment overrides
    #[must_use]
    pub fn dispatch_config(&self) -> DispatchConfig {
        let mut config = self.table_config();
        config.apply_overrides(|key| env::var(key).ok());
        config
    }

    fn table_config(&self) -> DispatchConfig {
        let mut config = DispatchConfig::default();
        if let Some(debug) = self.debug {
            config.debug = debug;
        }
        if let Some(pool) = self.pool {
            config.pool = pool;
        }
        config
    }

    /// Number of route registrations the table describes (one per method)
    pub fn route_count(&self) -> Result<usize, RouteError> {
        fn count(routes: &[RouteSpec], groups: &[GroupSpec]) -> Result<usize, RouteError> {
            let mut n = 0;
            for route in routes {
                n += route.resolve_methods()?.len();
            }
            for group in groups {
                n += count(&group.routes, &group.groups)?;
            }
            Ok(n)
        }
        count(&self.routes, &self.groups)
    }

    /// Register everything into `dispatcher`
    pub fn apply(
        &self,
        dispatcher: &mut Dispatcher,
        registry: &HandlerRegistry,
    ) -> Result<(), RouteError> {
        for name in &self.middleware {
            dispatcher.add_middleware(registry.middleware(name)?);
        }
        register_routes(dispatcher, &self.routes, registry)?;
        for group in &self.groups {
            let mut g = dispatcher.group(&group.prefix);
            apply_group(&mut g, group, registry)?;
        }
        info!(
            routes = dispatcher.routes().len(),
            middleware = self.middleware.len(),
            groups = self.groups.len(),
            "Route table loaded"
        );
        Ok(())
    }

    /// New dispatcher configured and populated from this table
    pub fn build_dispatcher(&self, registry: &HandlerRegistry) -> Result<Dispatcher, RouteError> {
        let mut dispatcher = Dispatcher::with_config(self.dispatch_config());
        self.apply(&mut dispatcher, registry)?;
        Ok(dispatcher)
    }
}

fn register_routes<R: RouteRegistrar>(
    registrar: &mut R,
    routes: &[RouteSpec],
    registry: &HandlerRegistry,
) -> Result<(), RouteError> {
    for route in routes {
        let handler = registry.handler(&route.handler)?;
        let methods = route.resolve_methods()?;
        registrar.match_methods(&methods, &route.path, handler)?;
    }
    Ok(())
}

fn apply_group(
    group: &mut crate::dispatcher::Group<'_>,
    spec: &GroupSpec,
    registry: &HandlerRegistry,
) -> Result<(), RouteError> {
    for name in &spec.middleware {
        group.add_middleware(registry.middleware(name)?);
    }
    register_routes(group, &spec.routes, registry)?;
    for nested in &spec.groups {
        let mut child = group.group(&nested.prefix);
        apply_group(&mut child, nested, registry)?;
    }
    Ok(())
}
