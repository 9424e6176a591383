#![cfg(feature = "inmem-store")]

mod common;

use actix_web::{test, App};
use blogdesk::identity::inmem::InMemIdentityProvider;
use blogdesk::repo::inmem::InMemRepo;
use blogdesk::{config, AppState, SecurityHeaders, SessionCache, SessionStore};
use common::MockObjectStore;
use std::sync::Arc;

fn state(dir: &tempfile::TempDir) -> AppState {
    AppState {
        repo: Arc::new(InMemRepo::new()),
        assets: Arc::new(MockObjectStore::default()),
        identity: Arc::new(InMemIdentityProvider::new()),
        session: SessionStore::new(),
        cache: SessionCache::new(dir.path().join("session.json")),
        rate_limiter: None,
        reset_continue_url: None,
    }
}

#[actix_web::test]
#[serial_test::serial]
async fn test_security_headers_present() {
    std::env::remove_var("ENABLE_HSTS");
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(
        App::new()
            .wrap(SecurityHeaders::from_env().with_image_origin("http://localhost:9000"))
            .app_data(actix_web::web::Data::new(state(&dir)))
            .configure(config),
    )
    .await;
    let req = test::TestRequest::get().uri("/api/v1/auth/session").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let headers = resp.headers();
    let csp = headers.get("content-security-policy").unwrap().to_str().unwrap();
    assert!(csp.contains("img-src 'self' data: blob: http://localhost:9000;"));
    assert_eq!(headers.get("referrer-policy").unwrap(), "no-referrer");
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert!(headers.get("strict-transport-security").is_none()); // not enabled
}

#[actix_web::test]
#[serial_test::serial]
async fn test_hsts_enabled_via_env() {
    std::env::set_var("ENABLE_HSTS", "1");
    let dir = tempfile::tempdir().unwrap();
    let app = test::init_service(
        App::new()
            .wrap(SecurityHeaders::from_env())
            .app_data(actix_web::web::Data::new(state(&dir)))
            .configure(config),
    )
    .await;
    // error responses carry the headers too
    let req = test::TestRequest::get().uri("/api/v1/profile").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
    assert!(resp.headers().get("strict-transport-security").is_some());
    std::env::remove_var("ENABLE_HSTS");
}
