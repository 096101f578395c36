use std::sync::Arc;
use std::thread;

use http::Method;
use switchyard::context::{RequestContext, ResponseWriter};
use switchyard::echo::EchoProcedure;
use switchyard::router::{CompositeRouter, MAX_CACHED_PATHS};
use switchyard::servers::{ApiServer, FileServer, ServerKind, SubServer};

fn router() -> CompositeRouter {
    let mut api = ApiServer::json("/api/").unwrap();
    api.register("echo", EchoProcedure).unwrap();

    let mut router = CompositeRouter::new();
    router.register(Arc::new(FileServer::new("static", "tests/staticdata").unwrap()));
    router.register(Arc::new(api));
    router
}

#[test]
fn test_routes_by_prefix() {
    let router = router();
    assert_eq!(router.resolve("/static/hello.txt").unwrap().kind(), ServerKind::Files);
    assert_eq!(router.resolve("/api/echo").unwrap().kind(), ServerKind::Api);
    assert!(router.resolve("/other").is_none());
    assert!(router.resolve("/stat").is_none());
}

#[test]
fn test_earlier_registration_shadows_later() {
    let mut router = router();
    router.register(Arc::new(FileServer::new("/api/assets", "tests/staticdata").unwrap()));

    let server = router.resolve("/api/assets/hello.txt").unwrap();
    assert_eq!(server.kind(), ServerKind::Api);
    assert_eq!(server.pattern(), "/api/");
}

#[test]
fn test_dispatch_missing_prefix_is_404() {
    let router = router();
    let mut out = ResponseWriter::new();
    router.dispatch(&RequestContext::new(Method::GET, "/nowhere"), &mut out);
    assert_eq!(out.status(), 404);
    assert!(out.body().is_empty());
}

#[test]
fn test_stats_count_hits_and_scans() {
    let router = router();
    for _ in 0..3 {
        let _ = router.resolve("/static/hello.txt");
        let _ = router.resolve("/missing");
    }
    let stats = router.stats();
    assert_eq!(stats.scans, 2);
    assert_eq!(stats.cache_hits, 4);
    assert_eq!(stats.cached_paths, 2);
}

#[test]
fn test_shared_router_across_threads() {
    let router = Arc::new(router());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let router = Arc::clone(&router);
            thread::spawn(move || {
                for n in 0..25 {
                    let path = format!("/static/file-{}.txt", (i + n) % 5);
                    let mut out = ResponseWriter::new();
                    router.dispatch(&RequestContext::new(Method::GET, path), &mut out);
                    assert_eq!(out.status(), 404);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    let stats = router.stats();
    assert_eq!(stats.cache_hits + stats.scans, 100);
    assert_eq!(stats.cached_paths, 5);
    assert!(stats.cached_paths <= MAX_CACHED_PATHS);
}
