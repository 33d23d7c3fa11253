use super::{Captures, Lookup, Router};
use crate::error::RouteError;
use crate::handler::Handler;
use http::{Method, StatusCode};

fn noop(name: &str) -> Handler {
    Handler::func(|_ctx| Ok(())).named(name)
}

fn router_with(routes: &[(Method, &str)]) -> Router {
    let mut router = Router::new();
    for (method, path) in routes {
        router
            .add(method.clone(), path, noop(path))
            .unwrap_or_else(|e| panic!("failed to add {method} {path}: {e}"));
    }
    router.assert_invariants();
    router
}

/// Resolve and return (matched template, captured name/value pairs, status)
fn resolve(
    router: &Router,
    method: Method,
    path: &str,
) -> (Option<String>, Vec<(String, String)>, StatusCode) {
    let mut captures = Captures::new();
    let lookup = router.lookup(&method, path, &mut captures);
    let status = lookup.status();
    match lookup {
        Lookup::Found(endpoint) => {
            let params = endpoint
                .route
                .param_names
                .iter()
                .zip(captures.iter())
                .map(|(name, (s, e))| (name.to_string(), path[*s..*e].to_string()))
                .collect();
            (Some(endpoint.route.template.to_string()), params, status)
        }
        _ => {
            assert!(captures.is_empty(), "captures leaked from a failed lookup");
            (None, Vec::new(), status)
        }
    }
}

fn template_of(router: &Router, method: Method, path: &str) -> Option<String> {
    resolve(router, method, path).0
}

fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_root_path() {
    let router = router_with(&[(Method::GET, "/")]);
    let (route, params, status) = resolve(&router, Method::GET, "/");
    assert_eq!(route.as_deref(), Some("/"));
    assert!(params.is_empty());
    assert_eq!(status, StatusCode::OK);
}

#[test]
fn test_static_routes_have_no_params() {
    let paths = [
        "/",
        "/users",
        "/users/list",
        "/user",
        "/uploads",
        "/u",
        "/contact",
        "/co",
        "/c",
        "/a/b/c/d",
    ];
    let routes: Vec<(Method, &str)> = paths.iter().map(|p| (Method::GET, *p)).collect();
    let router = router_with(&routes);
    for path in paths {
        let (route, params, _) = resolve(&router, Method::GET, path);
        assert_eq!(route.as_deref(), Some(path));
        assert!(params.is_empty(), "{path} captured {params:?}");
    }
    assert_eq!(template_of(&router, Method::GET, "/us"), None);
    assert_eq!(template_of(&router, Method::GET, "/users/lis"), None);
    assert_eq!(template_of(&router, Method::GET, "/a/b/c/d/e"), None);
}

#[test]
fn test_parameterized_path() {
    let router = router_with(&[(Method::GET, "/users/:id")]);
    let (route, params, _) = resolve(&router, Method::GET, "/users/42");
    assert_eq!(route.as_deref(), Some("/users/:id"));
    assert_eq!(params, pairs(&[("id", "42")]));
}

#[test]
fn test_param_never_matches_empty_segment() {
    let router = router_with(&[(Method::GET, "/users/:id")]);
    let (_, _, status) = resolve(&router, Method::GET, "/users/");
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, _, status) = resolve(&router, Method::GET, "/users//x");
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[test]
fn test_nested_params() {
    let router = router_with(&[(Method::GET, "/orgs/:org/teams/:team/members/:member")]);
    let (_, params, _) = resolve(&router, Method::GET, "/orgs/acme/teams/core/members/7");
    assert_eq!(
        params,
        pairs(&[("org", "acme"), ("team", "core"), ("member", "7")])
    );
}

#[test]
fn test_catch_all_captures_remainder() {
    let router = router_with(&[(Method::GET, "/files/*path")]);
    let (route, params, _) = resolve(&router, Method::GET, "/files/a/b/c");
    assert_eq!(route.as_deref(), Some("/files/*path"));
    assert_eq!(params, pairs(&[("path", "a/b/c")]));
}

#[test]
fn test_catch_all_keeps_leading_slash() {
    let router = router_with(&[(Method::GET, "/static*")]);
    let (_, params, _) = resolve(&router, Method::GET, "/static/css/app.css");
    assert_eq!(params, pairs(&[("*", "/css/app.css")]));
}

#[test]
fn test_catch_all_matches_empty_remainder() {
    let router = router_with(&[(Method::GET, "/static*"), (Method::GET, "/files/*path")]);
    let (route, params, _) = resolve(&router, Method::GET, "/static");
    assert_eq!(route.as_deref(), Some("/static*"));
    assert_eq!(params, pairs(&[("*", "")]));
    let (route, params, _) = resolve(&router, Method::GET, "/files/");
    assert_eq!(route.as_deref(), Some("/files/*path"));
    assert_eq!(params, pairs(&[("path", "")]));
}

#[test]
fn test_static_beats_param() {
    let router = router_with(&[(Method::GET, "/users/:id"), (Method::GET, "/users/new")]);
    assert_eq!(
        template_of(&router, Method::GET, "/users/new").as_deref(),
        Some("/users/new")
    );
    assert_eq!(
        template_of(&router, Method::GET, "/users/newer").as_deref(),
        Some("/users/:id")
    );
    assert_eq!(
        template_of(&router, Method::GET, "/users/ne").as_deref(),
        Some("/users/:id")
    );
}

#[test]
fn test_param_beats_catch_all() {
    let router = router_with(&[
        (Method::GET, "/users/*rest"),
        (Method::GET, "/users/:id"),
        (Method::GET, "/users/new"),
    ]);
    assert_eq!(
        template_of(&router, Method::GET, "/users/new").as_deref(),
        Some("/users/new")
    );
    assert_eq!(
        template_of(&router, Method::GET, "/users/7").as_deref(),
        Some("/users/:id")
    );
    let (route, params, _) = resolve(&router, Method::GET, "/users/7/friends");
    assert_eq!(route.as_deref(), Some("/users/*rest"));
    assert_eq!(params, pairs(&[("rest", "7/friends")]));
}

#[test]
fn test_static_dead_end_backtracks_to_param() {
    let router = router_with(&[
        (Method::GET, "/users/new/profile"),
        (Method::GET, "/users/:id/edit"),
    ]);
    let (route, params, _) = resolve(&router, Method::GET, "/users/new/edit");
    assert_eq!(route.as_deref(), Some("/users/:id/edit"));
    assert_eq!(params, pairs(&[("id", "new")]));
}

#[test]
fn test_backtracking_rolls_back_speculative_captures() {
    let router = router_with(&[
        (Method::GET, "/a/:x/b/:y/c"),
        (Method::GET, "/a/*rest"),
    ]);
    // :x and :y are captured on the way down, then the walk dead-ends at "/c"
    let (route, params, _) = resolve(&router, Method::GET, "/a/1/b/2/d");
    assert_eq!(route.as_deref(), Some("/a/*rest"));
    assert_eq!(params, pairs(&[("rest", "1/b/2/d")]));
}

#[test]
fn test_backtracking_across_levels() {
    let router = router_with(&[
        (Method::GET, "/:a/x/static"),
        (Method::GET, "/p/:b/other"),
    ]);
    // Static "/p/" is tried first, dead-ends, then the root param takes over
    let (route, params, _) = resolve(&router, Method::GET, "/p/x/static");
    assert_eq!(route.as_deref(), Some("/:a/x/static"));
    assert_eq!(params, pairs(&[("a", "p")]));
    let (route, params, _) = resolve(&router, Method::GET, "/p/x/other");
    assert_eq!(route.as_deref(), Some("/p/:b/other"));
    assert_eq!(params, pairs(&[("b", "x")]));
}

#[test]
fn test_method_not_allowed_vs_not_found() {
    let router = router_with(&[(Method::GET, "/widgets/:id"), (Method::PUT, "/widgets/:id")]);
    let mut captures = Captures::new();
    let lookup = router.lookup(&Method::DELETE, "/widgets/1", &mut captures);
    assert_eq!(lookup.status(), StatusCode::METHOD_NOT_ALLOWED);
    let mut allowed = lookup.allowed_methods();
    allowed.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    assert_eq!(allowed, vec![Method::GET, Method::PUT]);

    let (_, _, status) = resolve(&router, Method::DELETE, "/gadgets/1");
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[test]
fn test_method_not_allowed_unions_overlapping_templates() {
    let router = router_with(&[
        (Method::GET, "/a/:id"),
        (Method::POST, "/a/*rest"),
        (Method::PUT, "/a/1"),
    ]);
    let mut captures = Captures::new();
    let lookup = router.lookup(&Method::DELETE, "/a/1", &mut captures);
    assert_eq!(lookup.status(), StatusCode::METHOD_NOT_ALLOWED);
    let mut allowed = lookup.allowed_methods();
    allowed.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    assert_eq!(allowed, vec![Method::GET, Method::POST, Method::PUT]);
    assert!(captures.is_empty());

    // every method in the union is actually served on the path
    for method in [Method::GET, Method::POST, Method::PUT] {
        let (_, _, status) = resolve(&router, method, "/a/1");
        assert_eq!(status, StatusCode::OK);
    }
}

#[test]
fn test_method_filter_prefers_other_branch_with_method() {
    let router = router_with(&[(Method::GET, "/items/special"), (Method::POST, "/items/:id")]);
    // The static node only has GET; POST falls back to the param branch
    let (route, params, _) = resolve(&router, Method::POST, "/items/special");
    assert_eq!(route.as_deref(), Some("/items/:id"));
    assert_eq!(params, pairs(&[("id", "special")]));
}

#[test]
fn test_colon_inside_segment_is_static() {
    let router = router_with(&[(Method::POST, "/v1/users:batchGet"), (Method::GET, "/v1/:id")]);
    assert_eq!(
        template_of(&router, Method::POST, "/v1/users:batchGet").as_deref(),
        Some("/v1/users:batchGet")
    );
    assert_eq!(
        template_of(&router, Method::GET, "/v1/users:x").as_deref(),
        Some("/v1/:id")
    );
}

#[test]
fn test_unicode_prefix_split() {
    let router = router_with(&[(Method::GET, "/café"), (Method::GET, "/cafè"), (Method::GET, "/caf")]);
    assert_eq!(template_of(&router, Method::GET, "/café").as_deref(), Some("/café"));
    assert_eq!(template_of(&router, Method::GET, "/cafè").as_deref(), Some("/cafè"));
    assert_eq!(template_of(&router, Method::GET, "/caf").as_deref(), Some("/caf"));
}

#[test]
fn test_duplicate_param_names_rejected() {
    let mut router = router_with(&[(Method::GET, "/a/:x")]);
    let err = router.add(Method::GET, "/a/:y", noop("y")).unwrap_err();
    assert_eq!(
        err,
        RouteError::DuplicateRoute {
            method: Method::GET,
            path: "/a/:y".to_string(),
            existing: "/a/:x".to_string(),
        }
    );
    // The original registration is untouched
    let (_, params, _) = resolve(&router, Method::GET, "/a/1");
    assert_eq!(params, pairs(&[("x", "1")]));
    // Another method may use its own name on the same node
    router.add(Method::POST, "/a/:y", noop("post")).unwrap();
    let (_, params, _) = resolve(&router, Method::POST, "/a/1");
    assert_eq!(params, pairs(&[("y", "1")]));
}

#[test]
fn test_duplicate_static_route_rejected() {
    let mut router = router_with(&[(Method::GET, "/health")]);
    assert!(matches!(
        router.add(Method::GET, "/health", noop("again")),
        Err(RouteError::DuplicateRoute { .. })
    ));
    assert_eq!(router.routes().len(), 1);
}

#[test]
fn test_malformed_templates_rejected() {
    let mut router = Router::new();
    assert!(matches!(
        router.add(Method::GET, "/files/*path/tail", noop("x")),
        Err(RouteError::CatchAllNotLast { .. })
    ));
    assert!(matches!(
        router.add(Method::GET, "no-slash", noop("x")),
        Err(RouteError::MalformedTemplate { .. })
    ));
    assert!(router.routes().is_empty());
    assert_eq!(router.max_params(), 0);
}

#[test]
fn test_max_params_tracks_largest_route() {
    let router = router_with(&[
        (Method::GET, "/a/:x"),
        (Method::GET, "/b/:x/:y/*z"),
        (Method::GET, "/c"),
    ]);
    assert_eq!(router.max_params(), 3);
}

#[test]
fn test_duplicate_param_name_in_template_last_wins() {
    let router = router_with(&[(Method::GET, "/org/:id/user/:id")]);
    let (_, params, _) = resolve(&router, Method::GET, "/org/1/user/2");
    assert_eq!(params, pairs(&[("id", "1"), ("id", "2")]));
}

const ORDER_ROUTES: &[(&str, &str)] = &[
    ("GET", "/"),
    ("GET", "/users"),
    ("POST", "/users"),
    ("GET", "/users/new"),
    ("GET", "/users/:id"),
    ("PUT", "/users/:id"),
    ("GET", "/users/:id/posts/:post"),
    ("GET", "/users/:id/posts/latest"),
    ("GET", "/users/*rest"),
    ("GET", "/static*"),
    ("GET", "/stats"),
    ("GET", "/status/:code"),
    ("DELETE", "/s"),
    ("GET", "/search"),
];

const ORDER_PROBES: &[(&str, &str)] = &[
    ("GET", "/"),
    ("GET", "/users"),
    ("POST", "/users"),
    ("DELETE", "/users"),
    ("GET", "/users/new"),
    ("GET", "/users/7"),
    ("PUT", "/users/new"),
    ("GET", "/users/7/posts/latest"),
    ("GET", "/users/7/posts/9"),
    ("GET", "/users/7/posts"),
    ("GET", "/users/7/posts/9/x"),
    ("GET", "/static"),
    ("GET", "/static/js/a.js"),
    ("GET", "/stats"),
    ("GET", "/stat"),
    ("GET", "/status/404"),
    ("GET", "/status"),
    ("GET", "/s"),
    ("GET", "/search"),
    ("GET", "/sear"),
    ("GET", "/nope"),
];

fn build_in_order(order: &[usize]) -> Router {
    let routes: Vec<(Method, &str)> = order
        .iter()
        .map(|&i| {
            let (m, p) = ORDER_ROUTES[i];
            (Method::from_bytes(m.as_bytes()).unwrap(), p)
        })
        .collect();
    router_with(&routes)
}

fn probe_all(router: &Router) -> Vec<(Option<String>, Vec<(String, String)>, StatusCode)> {
    ORDER_PROBES
        .iter()
        .map(|(m, p)| resolve(router, Method::from_bytes(m.as_bytes()).unwrap(), p))
        .collect()
}

#[test]
fn test_registration_order_independence() {
    let n = ORDER_ROUTES.len();
    let forward: Vec<usize> = (0..n).collect();
    let reverse: Vec<usize> = (0..n).rev().collect();
    // Deterministic shuffles (multiplicative stride coprime with n)
    let stride5: Vec<usize> = (0..n).map(|i| (i * 5 + 3) % n).collect();
    let stride3: Vec<usize> = (0..n).map(|i| (i * 3 + 1) % n).collect();

    let expected = probe_all(&build_in_order(&forward));
    for order in [reverse, stride5, stride3] {
        let mut sorted = order.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), n, "order {order:?} is not a permutation");
        assert_eq!(probe_all(&build_in_order(&order)), expected, "order {order:?}");
    }
}

#[test]
fn test_substitution_round_trip() {
    let templates = [
        "/users/:id",
        "/users/:id/posts/:post",
        "/orgs/:org/repos/:repo/issues/:issue",
        "/files/:bucket/*key",
        "/x/:a/:b/:c/:d/:e/:f/:g/:h/:i/:j",
    ];
    let routes: Vec<(Method, &str)> = templates.iter().map(|t| (Method::GET, *t)).collect();
    let router = router_with(&routes);

    for template in templates {
        let mut expected = Vec::new();
        let mut path = String::new();
        for (i, segment) in template.split('/').skip(1).enumerate() {
            path.push('/');
            if let Some(name) = segment.strip_prefix(':') {
                let value = format!("v{i}-{name}");
                path.push_str(&value);
                expected.push((name.to_string(), value));
            } else if let Some(name) = segment.strip_prefix('*') {
                let value = format!("deep/{i}/tail");
                path.push_str(&value);
                expected.push((name.to_string(), value));
            } else {
                path.push_str(segment);
            }
        }
        let (route, params, _) = resolve(&router, Method::GET, &path);
        assert_eq!(route.as_deref(), Some(template), "path {path}");
        assert_eq!(params, expected, "path {path}");
    }
}

#[test]
fn test_routes_listing_in_registration_order() {
    let router = router_with(&[(Method::POST, "/b"), (Method::GET, "/a/:id")]);
    let listed: Vec<(Method, &str, &str)> = router
        .routes()
        .iter()
        .map(|r| (r.method.clone(), r.path.as_str(), r.handler_name.as_str()))
        .collect();
    assert_eq!(
        listed,
        vec![(Method::POST, "/b", "/b"), (Method::GET, "/a/:id", "/a/:id")]
    );
}

#[test]
fn test_render_tree_shows_split_nodes() {
    let router = router_with(&[(Method::GET, "/users"), (Method::GET, "/uploads/:id")]);
    let tree = router.render_tree();
    assert!(tree.contains("\"/u\""), "{tree}");
    assert!(tree.contains("\"sers\" [GET]"), "{tree}");
    assert!(tree.contains(":param [GET]"), "{tree}");
}
