use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;

use teejaro_auth::{
    middleware::rate_limit::LoginRateLimiter,
    routes,
    services::{
        auth_service::LoginVerifier,
        telegram_user_service::{InMemoryTelegramUserStore, TelegramUserStore},
    },
    utils::{
        init_data::web_app_secret,
        telegram_auth::{canonicalize, sign, HASH_FIELD},
    },
    AppState,
};

const BOT_TOKEN: &str = "7214402729:AAEN53HK_2QKc2shfAopG4SybaQu_hpReS0";
const INIT_DATA: &str = "query_id=AAGJdcMGAAAAAIl1wwaf8-89&user=%7B%22id%22%3A113472905%2C%22first_name%22%3A%22Leonid%22%2C%22last_name%22%3A%22Burdikov%22%2C%22username%22%3A%22reina_bailando%22%2C%22language_code%22%3A%22en%22%2C%22is_premium%22%3Atrue%2C%22allows_write_to_pm%22%3Atrue%7D&auth_date=1724270665&hash=47f6068f83ce0a2af458c6ee57f33adf7695d636ba51e0668b067d17fd04fdb2";

fn setup_app(token: Option<&str>, rps: u32) -> (Router, InMemoryTelegramUserStore) {
    let store = InMemoryTelegramUserStore::new();
    let state = AppState::new(
        LoginVerifier::new(token.map(str::to_string), None),
        Arc::new(store.clone()),
    );
    (routes::app(state, LoginRateLimiter::per_second(rps)), store)
}

fn signed_login(fields: JsonValue) -> JsonValue {
    let mut payload = fields;
    let hash = sign(
        &canonicalize(payload.as_object().expect("object")),
        BOT_TOKEN.as_bytes(),
    )
    .unwrap();
    payload[HASH_FIELD] = JsonValue::String(hash);
    payload
}

fn post(uri: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, JsonValue) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn login_widget_flow_creates_and_refreshes_user() {
    let (app, store) = setup_app(Some(BOT_TOKEN), 100);

    let first = signed_login(json!({ "id": 12345, "first_name": "Ann", "auth_date": 1700000000 }));
    let (status, body) = send(&app, post("/telegram-auth", first.to_string())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["telegram_id"], 12345);
    assert_eq!(body["user"]["first_name"], "Ann");
    let user_id = body["user"]["id"].clone();

    let second = signed_login(json!({
        "id": 12345,
        "first_name": "Ann",
        "last_name": "K",
        "username": "ann_k",
        "photo_url": "https://t.me/i/userpic/320/ann_k.jpg",
        "auth_date": 1700000100
    }));
    let (status, body) = send(&app, post("/telegram-auth", second.to_string())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], user_id);
    assert_eq!(body["user"]["username"], "ann_k");

    let stored = store.find_by_telegram_id(12345).await.unwrap().unwrap();
    assert_eq!(stored.last_name.as_deref(), Some("K"));
}

#[tokio::test]
async fn tampered_login_is_rejected_without_storing() {
    let (app, store) = setup_app(Some(BOT_TOKEN), 100);

    let mut payload = signed_login(json!({ "id": 12345, "first_name": "Ann", "auth_date": 1700000000 }));
    payload["first_name"] = json!("Bob");
    let (status, body) = send(&app, post("/telegram-auth", payload.to_string())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "error": "Invalid authentication data" }));
    assert!(store.find_by_telegram_id(12345).await.unwrap().is_none());
}

#[tokio::test]
async fn login_without_hash_is_unauthorized() {
    let (app, _) = setup_app(Some(BOT_TOKEN), 100);
    let payload = json!({ "id": 1, "first_name": "A", "auth_date": 100 });
    let (status, _) = send(&app, post("/telegram-auth", payload.to_string())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn invalid_json_is_a_bad_request() {
    let (app, _) = setup_app(Some(BOT_TOKEN), 100);
    let (status, body) = send(&app, post("/telegram-auth", "{not json".to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn missing_bot_token_fails_closed() {
    let (app, store) = setup_app(None, 100);
    let payload = signed_login(json!({ "id": 1, "first_name": "A", "auth_date": 100 }));
    let (status, body) = send(&app, post("/telegram-auth", payload.to_string())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "TELEGRAM_BOT_TOKEN not configured");
    assert!(store.find_by_telegram_id(1).await.unwrap().is_none());
}

#[tokio::test]
async fn web_app_flow_accepts_real_init_data() {
    let (app, store) = setup_app(Some(BOT_TOKEN), 100);
    let body = json!({ "init_data": INIT_DATA }).to_string();
    let (status, body) = send(&app, post("/telegram-auth/web-app", body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["telegram_id"], 113472905);
    assert_eq!(body["user"]["username"], "reina_bailando");
    assert!(store.find_by_telegram_id(113472905).await.unwrap().is_some());
}

#[tokio::test]
async fn web_app_flow_rejects_foreign_signature() {
    let (app, _) = setup_app(Some("111:other-bot"), 100);
    let body = json!({ "init_data": INIT_DATA }).to_string();
    let (status, body) = send(&app, post("/telegram-auth/web-app", body)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid authentication data");
}

#[tokio::test]
async fn web_app_flow_accepts_locally_signed_init_data() {
    let (app, _) = setup_app(Some(BOT_TOKEN), 100);
    let user = r#"{"id":42,"first_name":"Zoe"}"#;
    let secret = web_app_secret(Some(BOT_TOKEN)).unwrap();
    let hash = sign(&format!("auth_date=1700000000\nuser={}", user), &secret).unwrap();
    let init_data = format!(
        "user={}&auth_date=1700000000&hash={}",
        url_encode(user),
        hash
    );

    let body = json!({ "init_data": init_data }).to_string();
    let (status, body) = send(&app, post("/telegram-auth/web-app", body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["first_name"], "Zoe");
}

fn url_encode(raw: &str) -> String {
    raw.bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{:02X}", b),
        })
        .collect()
}

#[tokio::test]
async fn cors_preflight_allows_supabase_headers() {
    let (app, _) = setup_app(Some(BOT_TOKEN), 100);
    let req = Request::builder()
        .method("OPTIONS")
        .uri("/telegram-auth")
        .header("origin", "https://web.telegram.org")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "apikey,x-client-info,content-type")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let headers = resp.headers();
    assert_eq!(headers["access-control-allow-origin"], "*");
    let allowed = headers["access-control-allow-headers"].to_str().unwrap();
    assert!(allowed.contains("apikey"));
    assert!(allowed.contains("x-client-info"));
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert!(bytes.is_empty());
}

#[tokio::test]
async fn other_methods_are_not_allowed() {
    let (app, _) = setup_app(Some(BOT_TOKEN), 100);
    let req = Request::builder()
        .method("GET")
        .uri("/telegram-auth")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["error"], "Method not allowed");
}

#[tokio::test]
async fn login_routes_are_rate_limited() {
    let (app, _) = setup_app(Some(BOT_TOKEN), 1);
    let payload = json!({ "id": 1, "first_name": "A", "auth_date": 100 }).to_string();

    let (first, _) = send(&app, post("/telegram-auth", payload.clone())).await;
    assert_eq!(first, StatusCode::UNAUTHORIZED);
    let (second, body) = send(&app, post("/telegram-auth", payload)).await;
    assert_eq!(second, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "rate_limit_exceeded");

    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn openapi_document_lists_login_routes() {
    let (app, _) = setup_app(Some(BOT_TOKEN), 100);
    let req = Request::builder()
        .method("GET")
        .uri("/api-docs/openapi.json")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/telegram-auth"]["post"].is_object());
    assert!(body["paths"]["/telegram-auth/web-app"]["post"].is_object());
}
