//! Route registry model and ingestion.
//!
//! The host process owns this structure, pre-populated before bootstrap; the
//! registration pass only appends to selected routes' middleware chains.
//! Buckets, modules, content types, and routes keep their source order
//! (ordered sequences of named entries), so instrumented chains come out in a
//! stable, reproducible sequence across restarts.
//!
//! Route-list entries arrive in three shapes: an admin-tagged route/router, a
//! router wrapping a nested route sequence, or a bare route descriptor. The
//! shape is classified ONCE at ingestion into [`RouteContainer`]; everything
//! downstream dispatches on the tag instead of probing fields.

use std::fs;
use std::slice;

use serde::{Deserialize, Deserializer};

use morphgate_core::error::{MorphGateError, Result};

use crate::middleware::MiddlewareChain;

/// The two API buckets considered at bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKind {
    Api,
    Plugins,
}

impl ApiKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ApiKind::Api => "api",
            ApiKind::Plugins => "plugins",
        }
    }
}

/// The host's in-memory route registry.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Registry {
    pub api: Vec<ApiModule>,
    pub plugins: Vec<ApiModule>,
}

impl Registry {
    pub fn bucket(&self, kind: ApiKind) -> &[ApiModule] {
        match kind {
            ApiKind::Api => &self.api,
            ApiKind::Plugins => &self.plugins,
        }
    }

    pub fn bucket_mut(&mut self, kind: ApiKind) -> &mut Vec<ApiModule> {
        match kind {
            ApiKind::Api => &mut self.api,
            ApiKind::Plugins => &mut self.plugins,
        }
    }
}

/// One named API module: its content types plus its route list.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiModule {
    pub name: String,
    #[serde(default)]
    pub content_types: Vec<ContentType>,
    #[serde(default)]
    pub routes: Vec<RouteContainer>,
}

/// A content type exposed by an API module.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentType {
    pub uid: String,
    /// Owning plugin module, when plugin-supplied.
    #[serde(default)]
    pub plugin: Option<String>,
}

/// A route-list entry, classified once at ingestion.
#[derive(Debug)]
pub enum RouteContainer {
    /// Tagged `type: "admin"`; never instrumented, payload not modeled.
    Admin,
    /// A single route descriptor.
    Single(Route),
    /// A router wrapping an ordered sequence of routes.
    Group(Vec<Route>),
}

impl RouteContainer {
    /// Concrete routes inside this container (none for admin).
    pub fn routes(&self) -> &[Route] {
        match self {
            RouteContainer::Admin => &[],
            RouteContainer::Single(route) => slice::from_ref(route),
            RouteContainer::Group(routes) => routes,
        }
    }
}

impl<'de> Deserialize<'de> for RouteContainer {
    fn deserialize<D: Deserializer<'de>>(de: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            #[serde(rename = "type", default)]
            kind: Option<String>,
            #[serde(default)]
            routes: Option<Vec<Route>>,
            #[serde(default)]
            method: Option<String>,
            #[serde(default)]
            path: Option<String>,
            #[serde(default)]
            handler: Option<String>,
            #[serde(default)]
            config: Option<RouteConfig>,
        }

        let raw = Raw::deserialize(de)?;

        // The admin tag wins over any other shape.
        if raw.kind.as_deref() == Some("admin") {
            return Ok(RouteContainer::Admin);
        }
        if let Some(routes) = raw.routes {
            return Ok(RouteContainer::Group(routes));
        }
        match raw.method {
            Some(method) => Ok(RouteContainer::Single(Route {
                method,
                path: raw.path.unwrap_or_default(),
                handler: raw.handler,
                config: raw.config.unwrap_or_default(),
            })),
            None => Err(serde::de::Error::custom(
                "route container needs a type tag, a routes list, or a method",
            )),
        }
    }
}

/// A concrete HTTP route descriptor.
#[derive(Debug, Deserialize)]
pub struct Route {
    pub method: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub handler: Option<String>,
    #[serde(default)]
    pub config: RouteConfig,
}

/// Route-local configuration.
///
/// The middleware chain always exists (defaults empty). `transform_installed`
/// guards the chain against a second transform append, both within one
/// registration pass and across re-runs.
#[derive(Debug, Default, Deserialize)]
pub struct RouteConfig {
    #[serde(skip)]
    pub middlewares: MiddlewareChain,
    #[serde(skip)]
    pub transform_installed: bool,
}

pub fn load_from_file(path: &str) -> Result<Registry> {
    let s = fs::read_to_string(path)
        .map_err(|e| MorphGateError::Internal(format!("read {path} failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<Registry> {
    serde_json::from_str(s)
        .map_err(|e| MorphGateError::Internal(format!("invalid registry json: {e}")))
}
