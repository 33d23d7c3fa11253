use http::{Method, StatusCode};
use radix_dispatch::router::{Captures, Lookup};
use radix_dispatch::{Handler, RouteError, Router};

fn handler(name: &str) -> Handler {
    Handler::func(|_ctx| Ok(())).named(name)
}

fn router(routes: &[(Method, &str)]) -> Router {
    let mut router = Router::new();
    for (method, path) in routes {
        router
            .add(method.clone(), path, handler(&format!("{method} {path}")))
            .unwrap();
    }
    router
}

/// `(template, params)` for a match, `Err(status)` otherwise
fn resolve(
    router: &Router,
    method: Method,
    path: &str,
) -> Result<(String, Vec<(String, String)>), StatusCode> {
    let mut captures = Captures::new();
    match router.lookup(&method, path, &mut captures) {
        Lookup::Found(endpoint) => {
            let params = endpoint
                .route
                .param_names
                .iter()
                .zip(captures.iter())
                .map(|(n, &(s, e))| (n.to_string(), path[s..e].to_string()))
                .collect();
            Ok((endpoint.route.template.to_string(), params))
        }
        other => Err(other.status()),
    }
}

fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(n, v)| (n.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_static_routes_have_no_params() {
    let paths = ["/", "/zoo", "/zoo/animals", "/zoo/animals/all", "/zebra"];
    let routes: Vec<(Method, &str)> = paths.iter().map(|p| (Method::GET, *p)).collect();
    let r = router(&routes);
    for path in paths {
        let (template, captured) = resolve(&r, Method::GET, path).unwrap();
        assert_eq!(template, path);
        assert!(captured.is_empty());
    }
}

#[test]
fn test_param_route() {
    let r = router(&[(Method::GET, "/users/:id")]);
    assert_eq!(
        resolve(&r, Method::GET, "/users/42").unwrap(),
        ("/users/:id".to_string(), params(&[("id", "42")]))
    );
    assert_eq!(
        resolve(&r, Method::GET, "/users/"),
        Err(StatusCode::NOT_FOUND)
    );
}

#[test]
fn test_catch_all_route() {
    let r = router(&[(Method::GET, "/files/*path")]);
    assert_eq!(
        resolve(&r, Method::GET, "/files/a/b/c").unwrap().1,
        params(&[("path", "a/b/c")])
    );
}

#[test]
fn test_static_wins_over_param() {
    let r = router(&[(Method::GET, "/users/:id"), (Method::GET, "/users/new")]);
    assert_eq!(
        resolve(&r, Method::GET, "/users/new").unwrap().0,
        "/users/new"
    );
    assert_eq!(
        resolve(&r, Method::GET, "/users/newer").unwrap().0,
        "/users/:id"
    );
}

#[test]
fn test_static_dead_end_falls_back_to_param() {
    let r = router(&[
        (Method::GET, "/users/new/settings"),
        (Method::GET, "/users/:id/profile"),
    ]);
    assert_eq!(
        resolve(&r, Method::GET, "/users/new/profile").unwrap(),
        ("/users/:id/profile".to_string(), params(&[("id", "new")]))
    );
}

#[test]
fn test_renamed_param_is_duplicate() {
    let mut r = Router::new();
    r.add(Method::GET, "/a/:x", handler("x")).unwrap();
    let err = r.add(Method::GET, "/a/:y", handler("y")).unwrap_err();
    assert!(matches!(err, RouteError::DuplicateRoute { ref existing, .. } if existing == "/a/:x"));
    // the original registration keeps serving
    assert_eq!(
        resolve(&r, Method::GET, "/a/1").unwrap().1,
        params(&[("x", "1")])
    );
}

#[test]
fn test_method_not_allowed() {
    let r = router(&[(Method::GET, "/widgets/:id"), (Method::PUT, "/widgets/:id")]);
    let mut captures = Captures::new();
    let lookup = r.lookup(&Method::DELETE, "/widgets/1", &mut captures);
    assert_eq!(lookup.status(), StatusCode::METHOD_NOT_ALLOWED);
    let mut allowed = lookup.allowed_methods();
    allowed.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    assert_eq!(allowed, vec![Method::GET, Method::PUT]);
    assert!(captures.is_empty());
}

#[test]
fn test_registration_order_does_not_matter() {
    let routes = [
        (Method::GET, "/"),
        (Method::GET, "/api"),
        (Method::GET, "/api/users"),
        (Method::GET, "/api/users/:id"),
        (Method::GET, "/api/users/:id/posts/:post"),
        (Method::POST, "/api/users"),
        (Method::GET, "/api/uploads/*rest"),
        (Method::GET, "/apple"),
        (Method::GET, "/app/:name"),
    ];
    let probes = [
        (Method::GET, "/api/users/7"),
        (Method::GET, "/api/users/7/posts/9"),
        (Method::GET, "/api/uploads/x/y"),
        (Method::GET, "/apple"),
        (Method::GET, "/app/le"),
        (Method::GET, "/appl"),
        (Method::DELETE, "/api/users"),
        (Method::GET, "/api/user"),
    ];

    let forward = router(&routes);
    let mut reversed_routes = routes.clone();
    reversed_routes.reverse();
    let reversed = router(&reversed_routes);

    for (method, path) in probes {
        assert_eq!(
            resolve(&forward, method.clone(), path),
            resolve(&reversed, method.clone(), path),
            "{method} {path}"
        );
    }
}

#[test]
fn test_substituted_values_round_trip() {
    let templates = [
        "/orgs/:org/repos/:repo",
        "/orgs/:org/members/:user/roles/:role",
        "/assets/:bucket/*key",
    ];
    let routes: Vec<(Method, &str)> = templates.iter().map(|t| (Method::GET, *t)).collect();
    let r = router(&routes);

    for template in templates {
        let mut expected = Vec::new();
        let concrete: Vec<String> = template
            .split('/')
            .enumerate()
            .map(|(i, seg)| match seg.chars().next() {
                Some(':') | Some('*') => {
                    let value = format!("v{i}");
                    expected.push((seg[1..].to_string(), value.clone()));
                    value
                }
                _ => seg.to_string(),
            })
            .collect();
        let path = concrete.join("/");
        assert_eq!(
            resolve(&r, Method::GET, &path).unwrap(),
            (template.to_string(), expected),
            "{path}"
        );
    }
}

#[test]
fn test_routes_listing_keeps_registration_order() {
    let r = router(&[(Method::POST, "/b"), (Method::GET, "/a")]);
    let listed: Vec<(Method, &str)> = r
        .routes()
        .iter()
        .map(|route| (route.method.clone(), route.path.as_str()))
        .collect();
    assert_eq!(listed, vec![(Method::POST, "/b"), (Method::GET, "/a")]);
    assert_eq!(r.routes()[0].handler_name, "POST /b");
}
