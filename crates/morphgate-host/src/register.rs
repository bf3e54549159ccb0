//! Bootstrap registration: walk the route registry and install the transform
//! middleware on every route the filter policy allows.

use morphgate_core::error::Result;
use morphgate_core::filter::{FilterContext, FilterMode, FilterRules};

use crate::host::{Host, HostHandle};
use crate::middleware::attach_transform;
use crate::registry::{ApiKind, ApiModule, Route, RouteContainer};

/// Single bootstrap entry point.
///
/// Called by the host's plugin-loading phase before it begins serving
/// requests. Safe to call again after the host adds routes: routes already
/// carrying the transform middleware are left untouched, so attachment is
/// at-most-once per route no matter how often the pass runs.
pub fn register(host: &Host) -> Result<()> {
    let handle = host.handle();
    let settings = handle.settings();

    let ct_rules = &settings.content_type_filter.uids;
    let plugin_mode = settings.plugins.mode;
    let plugin_ids = &settings.plugins.ids;

    // An empty first-party map means no first-party filtering at all.
    let ct_mode = if ct_rules.is_empty() {
        FilterMode::None
    } else {
        settings.content_type_filter.mode
    };

    let empty = FilterRules::new();

    let mut attached = 0usize;
    let mut skipped_types = 0usize;

    let mut registry = host.lock_registry()?;

    // First-party bucket first, then plugins; both always scanned. An empty
    // plugin-id map must still allow plugin content types through.
    for kind in [ApiKind::Api, ApiKind::Plugins] {
        for module in registry.bucket_mut(kind) {
            let ApiModule {
                name,
                content_types,
                routes,
            } = module;

            for ct in content_types.iter() {
                let uid = ct.uid.as_str();

                let ctx = if kind == ApiKind::Plugins && ct.plugin.as_deref() == Some(name.as_str())
                {
                    // Plugin-owned content type: the plugin-scoped uid map
                    // governs both the scope and the method checks.
                    let rules = plugin_ids
                        .get(name.as_str())
                        .map(|entry| &entry.uids)
                        .unwrap_or(&empty);
                    FilterContext::new(plugin_mode, rules)
                } else {
                    // First-party content type, or a shared content type
                    // surfaced under a plugin bucket.
                    FilterContext::new(ct_mode, ct_rules)
                };

                if !ctx.allows_scope(uid) {
                    tracing::debug!(
                        bucket = kind.as_str(),
                        module = %name,
                        uid,
                        "content type filtered out"
                    );
                    skipped_types += 1;
                    continue;
                }

                for container in routes.iter_mut() {
                    match container {
                        // Admin routes are never transformed.
                        RouteContainer::Admin => {}
                        RouteContainer::Group(inner) => {
                            for route in inner.iter_mut() {
                                attached += usize::from(try_attach(route, &ctx, uid, &handle));
                            }
                        }
                        RouteContainer::Single(route) => {
                            attached += usize::from(try_attach(route, &ctx, uid, &handle));
                        }
                    }
                }
            }
        }
    }

    tracing::info!(attached, skipped_types, "transform registration pass complete");
    Ok(())
}

fn try_attach(route: &mut Route, ctx: &FilterContext<'_>, uid: &str, handle: &HostHandle) -> bool {
    if !ctx.allows_method(uid, &route.method) {
        return false;
    }
    if !attach_transform(route, handle) {
        return false;
    }
    tracing::debug!(
        uid,
        method = %route.method,
        path = %route.path,
        "transform middleware attached"
    );
    true
}
