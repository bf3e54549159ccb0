//! End-to-end registration scenarios over fixture registries.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use morphgate_core::error::{MorphGateError, Result};
use morphgate_host::config::{self, TransformSettings};
use morphgate_host::host::{Host, HostHandle};
use morphgate_host::middleware::{noop_next, MiddlewareChain, Next, RequestCtx};
use morphgate_host::register::register;
use morphgate_host::registry::{self, ApiKind, Registry};
use morphgate_host::transform::{PassthroughTransform, Transform};

const ARTICLES: &str = r#"{
  "api": [
    {
      "name": "article",
      "contentTypes": [{ "uid": "api::article.article" }],
      "routes": [
        {
          "type": "content-api",
          "routes": [
            { "method": "GET", "path": "/articles", "handler": "article.find" },
            { "method": "POST", "path": "/articles", "handler": "article.create" }
          ]
        },
        {
          "type": "admin",
          "routes": [{ "method": "GET", "path": "/articles/stats" }]
        }
      ]
    },
    {
      "name": "page",
      "contentTypes": [{ "uid": "api::page.page" }],
      "routes": [
        { "method": "GET", "path": "/pages", "handler": "page.find" },
        { "method": "POST", "path": "/pages", "handler": "page.create" }
      ]
    }
  ],
  "plugins": [
    {
      "name": "users-permissions",
      "contentTypes": [
        { "uid": "plugin::users-permissions.user", "plugin": "users-permissions" }
      ],
      "routes": [
        {
          "type": "content-api",
          "routes": [
            { "method": "GET", "path": "/users", "handler": "user.find" },
            { "method": "POST", "path": "/users", "handler": "user.create" }
          ]
        }
      ]
    }
  ]
}"#;

fn fixture() -> Registry {
    registry::load_from_str(ARTICLES).unwrap()
}

fn settings(yaml: &str) -> TransformSettings {
    config::load_from_str(yaml).unwrap()
}

fn boot(yaml: &str, reg: Registry) -> Host {
    let host = Host::new(settings(yaml), Arc::new(PassthroughTransform), reg);
    register(&host).unwrap();
    host
}

/// `"METHOD path" -> middleware count` for every concrete route in a bucket,
/// in registry order.
fn chain_lens(host: &Host, kind: ApiKind) -> Vec<(String, usize)> {
    host.with_registry(|reg| {
        reg.bucket(kind)
            .iter()
            .flat_map(|m| m.routes.iter())
            .flat_map(|c| c.routes())
            .map(|r| (format!("{} {}", r.method, r.path), r.config.middlewares.len()))
            .collect()
    })
    .unwrap()
}

// --------------------
// First-party filtering
// --------------------

#[test]
fn no_settings_instruments_everything_but_admin() {
    let host = boot("", fixture());

    assert_eq!(
        chain_lens(&host, ApiKind::Api),
        vec![
            ("GET /articles".into(), 1),
            ("POST /articles".into(), 1),
            ("GET /pages".into(), 1),
            ("POST /pages".into(), 1),
        ]
    );
    assert_eq!(
        chain_lens(&host, ApiKind::Plugins),
        vec![("GET /users".into(), 1), ("POST /users".into(), 1)]
    );
}

#[test]
fn deny_listed_content_type_skips_all_its_routes() {
    let host = boot(
        r#"
contentTypeFilter:
  mode: "deny"
  uids:
    "api::article.article": true
"#,
        fixture(),
    );

    assert_eq!(
        chain_lens(&host, ApiKind::Api),
        vec![
            ("GET /articles".into(), 0),
            ("POST /articles".into(), 0),
            // no opinion recorded for pages: deny mode leaves them alone
            ("GET /pages".into(), 1),
            ("POST /pages".into(), 1),
        ]
    );
}

#[test]
fn allow_mode_with_per_method_rules() {
    let host = boot(
        r#"
contentTypeFilter:
  mode: "allow"
  uids:
    "api::article.article":
      GET: true
      POST: false
    "api::page.page": true
"#,
        fixture(),
    );

    assert_eq!(
        chain_lens(&host, ApiKind::Api),
        vec![
            ("GET /articles".into(), 1),
            ("POST /articles".into(), 0),
            ("GET /pages".into(), 1),
            ("POST /pages".into(), 1),
        ]
    );
}

#[test]
fn unknown_mode_is_permissive_end_to_end() {
    let host = boot(
        r#"
contentTypeFilter:
  mode: "blocklist"
  uids:
    "api::article.article": false
"#,
        fixture(),
    );

    // unknown mode behaves as none: the explicit false is ignored
    assert_eq!(chain_lens(&host, ApiKind::Api)[0], ("GET /articles".into(), 1));
}

#[test]
fn admin_containers_are_never_instrumented() {
    let host = boot("", fixture());

    host.with_registry(|reg| {
        let article = &reg.bucket(ApiKind::Api)[0];
        assert!(article
            .routes
            .iter()
            .any(|c| matches!(c, registry::RouteContainer::Admin)));
        // admin containers expose no routes to instrument
        for container in &article.routes {
            if matches!(container, registry::RouteContainer::Admin) {
                assert!(container.routes().is_empty());
            }
        }
    })
    .unwrap();
}

// --------------------
// Plugin filtering
// --------------------

#[test]
fn plugin_content_type_with_empty_ids_is_allowed() {
    // plugins.mode allow with an empty ids map: nothing can reject
    let host = boot(
        r#"
plugins:
  mode: "allow"
"#,
        fixture(),
    );

    assert_eq!(
        chain_lens(&host, ApiKind::Plugins),
        vec![("GET /users".into(), 1), ("POST /users".into(), 1)]
    );
}

#[test]
fn plugin_scope_denial_skips_routes() {
    let host = boot(
        r#"
plugins:
  mode: "deny"
  ids:
    "users-permissions":
      uids:
        "plugin::users-permissions.user": true
"#,
        fixture(),
    );

    assert_eq!(
        chain_lens(&host, ApiKind::Plugins),
        vec![("GET /users".into(), 0), ("POST /users".into(), 0)]
    );
}

#[test]
fn plugin_method_rules_use_the_plugin_scoped_map() {
    let host = boot(
        r#"
plugins:
  mode: "allow"
  ids:
    "users-permissions":
      uids:
        "plugin::users-permissions.user":
          GET: true
          POST: false
"#,
        fixture(),
    );

    assert_eq!(
        chain_lens(&host, ApiKind::Plugins),
        vec![("GET /users".into(), 1), ("POST /users".into(), 0)]
    );
}

#[test]
fn shared_content_type_under_plugin_bucket_uses_first_party_rules() {
    // A content type surfaced under a plugin bucket but not owned by that
    // plugin is judged by the first-party filter.
    let reg = r#"{
      "plugins": [
        {
          "name": "content-export",
          "contentTypes": [{ "uid": "api::shared.shared" }],
          "routes": [{ "method": "GET", "path": "/export", "handler": "export.run" }]
        }
      ]
    }"#;

    let denied = boot(
        r#"
contentTypeFilter:
  mode: "deny"
  uids:
    "api::shared.shared": true
"#,
        registry::load_from_str(reg).unwrap(),
    );
    assert_eq!(chain_lens(&denied, ApiKind::Plugins), vec![("GET /export".into(), 0)]);

    let allowed = boot("", registry::load_from_str(reg).unwrap());
    assert_eq!(chain_lens(&allowed, ApiKind::Plugins), vec![("GET /export".into(), 1)]);
}

// --------------------
// At-most-once attachment
// --------------------

#[test]
fn register_twice_attaches_once() {
    let host = boot("", fixture());
    register(&host).unwrap();

    for kind in [ApiKind::Api, ApiKind::Plugins] {
        for (_, len) in chain_lens(&host, kind) {
            assert!(len <= 1);
        }
    }
    assert_eq!(chain_lens(&host, ApiKind::Api)[0], ("GET /articles".into(), 1));
}

#[test]
fn module_with_two_content_types_attaches_once_per_route() {
    let reg = r#"{
      "api": [
        {
          "name": "catalog",
          "contentTypes": [
            { "uid": "api::catalog.item" },
            { "uid": "api::catalog.category" }
          ],
          "routes": [
            { "method": "GET", "path": "/catalog", "handler": "catalog.find" }
          ]
        }
      ]
    }"#;

    let host = boot("", registry::load_from_str(reg).unwrap());
    assert_eq!(chain_lens(&host, ApiKind::Api), vec![("GET /catalog".into(), 1)]);
}

#[test]
fn new_routes_picked_up_by_a_second_pass() {
    let host = boot("", fixture());

    // host adds a module after the first pass (hot reload)
    {
        let mut reg = host.lock_registry().unwrap();
        let added = registry::load_from_str(
            r#"{
              "api": [
                {
                  "name": "comment",
                  "contentTypes": [{ "uid": "api::comment.comment" }],
                  "routes": [{ "method": "GET", "path": "/comments" }]
                }
              ]
            }"#,
        )
        .unwrap();
        reg.api.extend(added.api);
    }

    register(&host).unwrap();

    let lens = chain_lens(&host, ApiKind::Api);
    assert_eq!(lens.last().unwrap(), &("GET /comments".into(), 1));
    // previously instrumented routes were not touched again
    assert_eq!(lens[0], ("GET /articles".into(), 1));
}

// --------------------
// Dispatch through the installed middleware
// --------------------

#[derive(Default)]
struct CountingTransform {
    calls: AtomicUsize,
}

#[async_trait]
impl Transform for CountingTransform {
    async fn apply(&self, _host: &HostHandle, ctx: RequestCtx, next: Next) -> Result<RequestCtx> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut out = next(ctx).await?;
        out.response = Some(serde_json::json!({ "transformed": true }));
        Ok(out)
    }
}

fn first_chain(host: &Host) -> MiddlewareChain {
    host.with_registry(|reg| {
        reg.bucket(ApiKind::Api)[0]
            .routes
            .iter()
            .flat_map(|c| c.routes())
            .next()
            .map(|r| r.config.middlewares.clone())
            .unwrap()
    })
    .unwrap()
}

#[tokio::test]
async fn dispatch_invokes_transform_exactly_once() {
    let transformer = Arc::new(CountingTransform::default());
    let host = Host::new(settings(""), transformer.clone(), fixture());
    register(&host).unwrap();

    let mut ctx = RequestCtx::new("GET", "/articles");
    ctx.request = Some(serde_json::json!({ "title": "hello" }));

    let out = first_chain(&host).dispatch(ctx, noop_next()).await.unwrap();

    assert_eq!(transformer.calls.load(Ordering::SeqCst), 1);
    assert_eq!(out.method, "GET");
    // the request payload rode through the chain untouched
    assert_eq!(out.request, Some(serde_json::json!({ "title": "hello" })));
    assert_eq!(out.response, Some(serde_json::json!({ "transformed": true })));
}

struct FailingTransform;

#[async_trait]
impl Transform for FailingTransform {
    async fn apply(&self, _host: &HostHandle, _ctx: RequestCtx, _next: Next) -> Result<RequestCtx> {
        Err(MorphGateError::Transform("boom".into()))
    }
}

#[tokio::test]
async fn transform_failure_propagates_through_dispatch() {
    let host = Host::new(settings(""), Arc::new(FailingTransform), fixture());
    register(&host).unwrap();

    let err = first_chain(&host)
        .dispatch(RequestCtx::new("GET", "/articles"), noop_next())
        .await
        .unwrap_err();
    assert!(matches!(err, MorphGateError::Transform(_)));
}
