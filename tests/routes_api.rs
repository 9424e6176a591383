#![cfg(feature = "inmem-store")]

mod common;

use std::sync::Arc;

use actix_web::{test, web, App};
use blogdesk::identity::inmem::InMemIdentityProvider;
use blogdesk::identity::IdentityProvider;
use blogdesk::rate_limit::{Quota, RateLimitConfig, RateLimiter};
use blogdesk::repo::inmem::InMemRepo;
use blogdesk::{config, AppState, SessionCache, SessionStore};
use common::{png, MockObjectStore, CDN};
use serde_json::{json, Value};

const BOUNDARY: &str = "----blogdeskboundary";

struct Harness {
    state: AppState,
    provider: Arc<InMemIdentityProvider>,
    store: Arc<MockObjectStore>,
    _dir: tempfile::TempDir,
}

fn harness(rate_limiter: Option<RateLimiter>) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(InMemIdentityProvider::new());
    let store = Arc::new(MockObjectStore::default());
    let identity: Arc<dyn IdentityProvider> = provider.clone();
    let state = AppState {
        repo: Arc::new(InMemRepo::new()),
        assets: store.clone(),
        identity,
        session: SessionStore::new(),
        cache: SessionCache::new(dir.path().join("session.json")),
        rate_limiter,
        reset_continue_url: Some("http://localhost:5173/".into()),
    };
    Harness { state, provider, store, _dir: dir }
}

macro_rules! init_app {
    ($state:expr) => {
        test::init_service(App::new().app_data(web::Data::new($state.clone())).configure(config)).await
    };
}

enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

// Helper to build a multipart body from text fields and files
fn multipart(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body: Vec<u8> = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes());
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, file_name, bytes) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n")
                        .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn multipart_request(method: actix_web::http::Method, uri: &str, parts: &[Part<'_>]) -> test::TestRequest {
    test::TestRequest::default()
        .method(method)
        .uri(uri)
        .insert_header(("content-type", format!("multipart/form-data; boundary={BOUNDARY}")))
        .set_payload(multipart(parts))
}

async fn json_body(resp: actix_web::dev::ServiceResponse) -> Value {
    serde_json::from_slice(&test::read_body(resp).await).unwrap()
}

#[actix_web::test]
async fn article_flow_over_http() {
    let h = harness(None);
    let app = init_app!(h.state);

    // gated until signed in
    let resp = test::call_service(&app, test::TestRequest::get().uri("/api/v1/articles").to_request()).await;
    assert_eq!(resp.status(), 401);

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/register")
        .set_json(json!({"email": "writer@example.com", "password": "secret1", "confirm_password": "secret1"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let session = json_body(resp).await;
    assert_eq!(session["is_authenticated"], true);
    let uid = session["user"]["uid"].as_str().unwrap().to_string();
    assert_eq!(h.state.cache.load().unwrap().uid, uid);

    // create with a cover image
    let req = multipart_request(
        actix_web::http::Method::POST,
        "/api/v1/articles",
        &[
            Part::Text("title", "Hello"),
            Part::Text("content", "First post"),
            Part::Text("category", "tech"),
            Part::Text("tags", "rust, web"),
            Part::File("image", "cover.png", &png()),
        ],
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let created = json_body(resp).await;
    assert_eq!(created["redirect"], "/articles");
    let id = created["article"]["id"].as_str().unwrap().to_string();
    let cover = created["article"]["image_url"].as_str().unwrap().to_string();
    assert!(cover.starts_with(&format!("{CDN}/featured-images/")));
    assert_eq!(created["article"]["tags"], json!(["rust", "web"]));
    assert_eq!(created["article"]["author_id"], uid.as_str());

    // empty title: 422 and nothing uploaded
    let uploads_before = h.store.upload_count();
    let req = multipart_request(
        actix_web::http::Method::POST,
        "/api/v1/articles",
        &[Part::Text("title", " "), Part::Text("content", "x"), Part::File("image", "c.png", &png())],
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 422);
    assert!(json_body(resp).await["fields"]["title"].is_string());
    assert_eq!(h.store.upload_count(), uploads_before);

    // list with filters
    let resp = test::call_service(&app, test::TestRequest::get().uri("/api/v1/articles?q=HELLO&category=tech").to_request()).await;
    assert_eq!(resp.status(), 200);
    let listed = json_body(resp).await;
    assert_eq!(listed["articles"].as_array().unwrap().len(), 1);
    assert_eq!(listed["categories"], json!(["all", "tech"]));
    assert_eq!(listed["total"], 1);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/api/v1/articles?category=life").to_request()).await;
    assert!(json_body(resp).await["articles"].as_array().unwrap().is_empty());

    let resp = test::call_service(&app, test::TestRequest::get().uri("/api/v1/articles/recent").to_request()).await;
    assert_eq!(json_body(resp).await.as_array().unwrap().len(), 1);

    // editor
    let resp = test::call_service(&app, test::TestRequest::get().uri(&format!("/api/v1/articles/{id}/edit")).to_request()).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(json_body(resp).await["form"]["title"], "Hello");

    // clear the image on update
    let req = multipart_request(
        actix_web::http::Method::PUT,
        &format!("/api/v1/articles/{id}"),
        &[Part::Text("title", "Hello again"), Part::Text("content", "Edited"), Part::Text("clear_image", "true")],
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let updated = json_body(resp).await;
    assert_eq!(updated["redirect"], format!("/articles/{id}"));
    assert!(updated["article"]["image_url"].is_null());
    assert_eq!(h.store.deleted(), vec![cover]);

    let resp = test::call_service(&app, test::TestRequest::delete().uri(&format!("/api/v1/articles/{id}")).to_request()).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(json_body(resp).await["redirect"], "/articles");

    let resp = test::call_service(&app, test::TestRequest::get().uri(&format!("/api/v1/articles/{id}")).to_request()).await;
    assert_eq!(resp.status(), 404);

    // sign out closes the gate again
    let resp = test::call_service(&app, test::TestRequest::post().uri("/api/v1/auth/logout").to_request()).await;
    assert_eq!(resp.status(), 200);
    assert!(h.state.cache.load().is_none());
    let resp = test::call_service(&app, test::TestRequest::get().uri("/api/v1/articles").to_request()).await;
    assert_eq!(resp.status(), 401);
}

#[actix_web::test]
async fn other_authors_article_is_forbidden() {
    let h = harness(None);
    let app = init_app!(h.state);
    let owner = h.provider.sign_up("owner@example.com", "secret1").await.unwrap();
    h.state.session.sign_in_success(owner);

    let req = multipart_request(
        actix_web::http::Method::POST,
        "/api/v1/articles",
        &[Part::Text("title", "Mine"), Part::Text("content", "Body")],
    )
    .to_request();
    let created = json_body(test::call_service(&app, req).await).await;
    let id = created["article"]["id"].as_str().unwrap().to_string();

    let other = h.provider.sign_up("other@example.com", "secret1").await.unwrap();
    h.state.session.sign_in_success(other);

    let resp = test::call_service(&app, test::TestRequest::get().uri(&format!("/api/v1/articles/{id}/edit")).to_request()).await;
    assert_eq!(resp.status(), 403);
    let resp = test::call_service(&app, test::TestRequest::delete().uri(&format!("/api/v1/articles/{id}")).to_request()).await;
    assert_eq!(resp.status(), 403);
    assert_eq!(h.store.calls(), 0);
}

#[actix_web::test]
async fn register_mismatch_fails_locally() {
    let h = harness(None);
    let app = init_app!(h.state);
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/register")
        .set_json(json!({"email": "a@example.com", "password": "secret1", "confirm_password": "secret2"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 422);
    assert_eq!(json_body(resp).await["fields"]["confirm_password"], "Passwords do not match.");
    // no account was created remotely
    h.provider.sign_up("a@example.com", "secret1").await.unwrap();
}

#[actix_web::test]
async fn login_errors_use_message_table() {
    let h = harness(None);
    let app = init_app!(h.state);
    h.provider.sign_up("a@example.com", "secret1").await.unwrap();

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({"email": "a@example.com", "password": "wrong-one"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
    let body = json_body(resp).await;
    assert_eq!(body["error"], "invalid-credential");
    assert_eq!(body["message"], "Incorrect email address or password.");
    let s = h.state.session.snapshot();
    assert!(!s.is_authenticated);
    assert_eq!(s.error.as_deref(), Some("Incorrect email address or password."));

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({"email": "a@example.com", "password": "secret1"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(json_body(resp).await["user"]["email"], "a@example.com");
}

#[actix_web::test]
async fn throttled_sign_in_makes_no_provider_call() {
    let cfg = RateLimitConfig { sign_in: Quota::new(1, 60), ..RateLimitConfig::default() };
    let h = harness(Some(RateLimiter::new(cfg)));
    let app = init_app!(h.state);
    h.provider.sign_up("a@example.com", "secret1").await.unwrap();
    h.provider.sign_out().await.unwrap();

    let login = || {
        test::TestRequest::post()
            .uri("/api/v1/auth/login")
            .set_json(json!({"email": "a@example.com", "password": "secret1"}))
            .to_request()
    };
    assert_eq!(test::call_service(&app, login()).await.status(), 200);
    h.provider.sign_out().await.unwrap();

    let resp = test::call_service(&app, login()).await;
    assert_eq!(resp.status(), 429);
    assert_eq!(json_body(resp).await["message"], "Too many sign-in attempts. Please wait a while and try again.");
    assert!(h.provider.subscribe().borrow().is_none());
}

#[actix_web::test]
async fn invalid_contact_forms_do_not_use_quota() {
    let cfg = RateLimitConfig { contact: Quota::new(1, 60), ..RateLimitConfig::default() };
    let h = harness(Some(RateLimiter::new(cfg)));
    let app = init_app!(h.state);
    let send = |message: &str| {
        test::TestRequest::post()
            .uri("/api/v1/contacts")
            .set_json(json!({"name": "Ann", "email": "ann@example.com", "message": message}))
            .to_request()
    };
    for _ in 0..3 {
        assert_eq!(test::call_service(&app, send("short")).await.status(), 422);
    }
    assert_eq!(test::call_service(&app, send("Hello there, admin")).await.status(), 201);
    assert_eq!(test::call_service(&app, send("Hello there, again")).await.status(), 429);
}

#[actix_web::test]
async fn password_reset_over_http() {
    let h = harness(None);
    let app = init_app!(h.state);
    h.provider.sign_up("a@example.com", "secret1").await.unwrap();
    h.provider.sign_out().await.unwrap();

    let req = test::TestRequest::post().uri("/api/v1/auth/password-reset").set_json(json!({"email": ""})).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 422);

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/password-reset")
        .set_json(json!({"email": "a@example.com"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);
    let sent = h.provider.sent_reset_emails();
    assert_eq!(sent[0].continue_url.as_deref(), Some("http://localhost:5173/"));

    // no code in the link
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/password-reset/confirm")
        .set_json(json!({"new_password": "changed1", "confirm_password": "changed1"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
    assert_eq!(json_body(resp).await["message"], "This reset link is invalid.");

    let code = h.provider.latest_reset_code("a@example.com").unwrap();
    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/auth/password-reset/confirm?oobCode={code}"))
        .set_json(json!({"new_password": "abc", "confirm_password": "abc"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 422);
    assert_eq!(json_body(resp).await["fields"]["new_password"], "Password must be at least 6 characters.");

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/auth/password-reset/confirm?oobCode={code}"))
        .set_json(json!({"new_password": "changed1", "confirm_password": "changed1"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);
    // no session is granted by a reset
    assert!(!h.state.session.snapshot().is_authenticated);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/auth/password-reset/confirm?oobCode={code}"))
        .set_json(json!({"new_password": "changed2", "confirm_password": "changed2"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(json_body(resp).await["error"], "invalid-action-code");
}

#[actix_web::test]
async fn contact_and_admin_triage() {
    let h = harness(None);
    let app = init_app!(h.state);

    let req = test::TestRequest::post()
        .uri("/api/v1/contacts")
        .set_json(json!({"name": "Ann", "email": "nope", "message": "Hello there, admin"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 422);
    assert!(json_body(resp).await["fields"]["email"].is_string());

    // anonymous submission is accepted
    let req = test::TestRequest::post()
        .uri("/api/v1/contacts")
        .set_json(json!({"name": "Ann", "email": "ann@example.com", "message": "Hello there, admin"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let receipt = json_body(resp).await;
    assert_eq!(receipt["ticket"]["status"], "new");
    assert!(receipt["ticket"]["user_id"].is_null());
    let id = receipt["ticket"]["id"].as_str().unwrap().to_string();

    // admin views need a session
    let resp = test::call_service(&app, test::TestRequest::get().uri("/api/v1/admin/contacts").to_request()).await;
    assert_eq!(resp.status(), 401);

    let admin = h.provider.sign_up("admin@example.com", "secret1").await.unwrap();
    h.state.session.sign_in_success(admin);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/api/v1/admin/contacts").to_request()).await;
    assert_eq!(json_body(resp).await.as_array().unwrap().len(), 1);

    let req = test::TestRequest::patch()
        .uri(&format!("/api/v1/admin/contacts/{id}/status"))
        .set_json(json!({"status": "read"}))
        .to_request();
    assert_eq!(json_body(test::call_service(&app, req).await).await["status"], "read");

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/admin/contacts/{id}/reply"))
        .set_json(json!({"reply": "Thanks!"}))
        .to_request();
    let replied = json_body(test::call_service(&app, req).await).await;
    assert_eq!(replied["status"], "replied");
    assert_eq!(replied["reply"], "Thanks!");

    let resp = test::call_service(&app, test::TestRequest::delete().uri(&format!("/api/v1/admin/contacts/{id}")).to_request()).await;
    assert_eq!(resp.status(), 204);
}

#[actix_web::test]
async fn profile_over_http() {
    let h = harness(None);
    let app = init_app!(h.state);
    let me = h.provider.sign_up("me@example.com", "secret1").await.unwrap();
    h.state.session.sign_in_success(me.clone());

    let resp = test::call_service(&app, test::TestRequest::get().uri("/api/v1/profile").to_request()).await;
    let empty = json_body(resp).await;
    assert_eq!(empty["nickname"], "");
    assert!(empty["avatar_url"].is_null());

    let req = multipart_request(
        actix_web::http::Method::PUT,
        "/api/v1/profile",
        &[Part::Text("nickname", "neo"), Part::Text("introduction", "hi"), Part::File("avatar", "me.png", &png())],
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let saved = json_body(resp).await;
    assert_eq!(saved["profile"]["nickname"], "neo");
    let avatar = saved["profile"]["avatar_url"].as_str().unwrap();
    assert!(avatar.starts_with(&format!("{CDN}/profile-images/{}/", me.uid)));
}

#[actix_web::test]
async fn unknown_route_is_json_404() {
    let h = harness(None);
    let app = init_app!(h.state);
    let resp = test::call_service(&app, test::TestRequest::get().uri("/api/v1/nothing-here").to_request()).await;
    assert_eq!(resp.status(), 404);
    assert_eq!(json_body(resp).await["error"], "not found");
}

#[actix_web::test]
async fn session_endpoint_reports_state() {
    let h = harness(None);
    let app = init_app!(h.state);
    h.state.session.set_user(None);
    let resp = test::call_service(&app, test::TestRequest::get().uri("/api/v1/auth/session").to_request()).await;
    let body = json_body(resp).await;
    assert_eq!(body["is_authenticated"], false);
    assert_eq!(body["loading"], false);
}
