pub mod health;
pub mod telegram_auth;

use axum::{
    routing::{get, post},
    Json, Router,
};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::{
    dto::auth_dto::{AuthPayload, LoginResponse, WebAppLoginRequest},
    middleware::{
        cors::auth_cors,
        rate_limit::{login_rate_limit, LoginRateLimiter},
    },
    models::telegram_user::TelegramUser,
    AppState,
};

#[derive(OpenApi)]
#[openapi(
    paths(health::health, telegram_auth::login, telegram_auth::login_web_app),
    components(schemas(AuthPayload, WebAppLoginRequest, LoginResponse, TelegramUser)),
    tags((name = "auth", description = "Telegram login verification"))
)]
pub struct ApiDoc;

async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Login endpoints, throttled by `limiter`.
pub fn auth_routes(limiter: LoginRateLimiter) -> Router<AppState> {
    Router::new()
        .route(
            "/telegram-auth",
            post(telegram_auth::login)
                .options(telegram_auth::options)
                .fallback(telegram_auth::method_not_allowed),
        )
        .route(
            "/telegram-auth/web-app",
            post(telegram_auth::login_web_app)
                .options(telegram_auth::options)
                .fallback(telegram_auth::method_not_allowed),
        )
        .layer(axum::middleware::from_fn_with_state(
            limiter,
            login_rate_limit,
        ))
}

pub fn app(state: AppState, limiter: LoginRateLimiter) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api-docs/openapi.json", get(openapi))
        .merge(auth_routes(limiter))
        .with_state(state)
        .layer(auth_cors())
        .layer(TraceLayer::new_for_http())
}
