//! morphgate demo host.
//!
//! Loads admin settings and a route registry fixture, runs the bootstrap
//! registration pass, reports which routes were instrumented, then drives one
//! instrumented chain end-to-end so the transform step is visible in the logs.

use std::env;
use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};

use morphgate_host::host::Host;
use morphgate_host::middleware::{noop_next, MiddlewareChain, RequestCtx};
use morphgate_host::register::register;
use morphgate_host::registry::ApiKind;
use morphgate_host::transform::PassthroughTransform;
use morphgate_host::{config, registry};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let settings_path = env::args().nth(1).unwrap_or_else(|| "morphgate.yaml".into());
    let routes_path = env::args().nth(2).unwrap_or_else(|| "routes.json".into());

    let settings = config::load_from_file(&settings_path).expect("settings load failed");
    let routes = registry::load_from_file(&routes_path).expect("registry load failed");

    tracing::info!(%settings_path, %routes_path, "morphgate host starting");

    let host = Host::new(settings, Arc::new(PassthroughTransform), routes);
    register(&host).expect("registration failed");

    let sample: Option<(String, String, MiddlewareChain)> = host
        .with_registry(|reg| {
            let mut sample = None;
            for kind in [ApiKind::Api, ApiKind::Plugins] {
                for module in reg.bucket(kind) {
                    for container in &module.routes {
                        for route in container.routes() {
                            tracing::info!(
                                bucket = kind.as_str(),
                                module = %module.name,
                                method = %route.method,
                                path = %route.path,
                                middlewares = route.config.middlewares.len(),
                                transformed = route.config.transform_installed,
                                "route"
                            );
                            if route.config.transform_installed && sample.is_none() {
                                sample = Some((
                                    route.method.clone(),
                                    route.path.clone(),
                                    route.config.middlewares.clone(),
                                ));
                            }
                        }
                    }
                }
            }
            sample
        })
        .expect("registry lock poisoned");

    if let Some((method, path, chain)) = sample {
        let ctx = RequestCtx::new(method, path);
        let out = chain.dispatch(ctx, noop_next()).await.expect("dispatch failed");
        tracing::info!(method = %out.method, path = %out.path, "sample dispatch completed");
    } else {
        tracing::info!("no route was instrumented with the current settings");
    }
}
