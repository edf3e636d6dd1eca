use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::{json, Map, Value};

use crate::{
    dto::auth_dto::{AuthPayload, LoginResponse, WebAppLoginRequest},
    error::Result,
    models::telegram_user::TelegramProfile,
    AppState,
};

#[utoipa::path(
    post,
    path = "/telegram-auth",
    tag = "auth",
    request_body = AuthPayload,
    responses(
        (status = 200, description = "Login verified and user stored", body = LoginResponse),
        (status = 401, description = "Invalid authentication data"),
        (status = 500, description = "Bot token not configured or storage failure")
    )
)]
#[axum::debug_handler]
pub async fn login(State(state): State<AppState>, body: Bytes) -> Result<Json<LoginResponse>> {
    // non-object JSON is verified as an empty payload and rejected there
    let fields = match serde_json::from_slice::<Value>(&body)? {
        Value::Object(fields) => fields,
        _ => Map::new(),
    };

    let auth = state.verifier.authenticate_login(&fields)?;
    let user = state.user_store.upsert(&TelegramProfile::from(&auth)).await?;
    tracing::info!(telegram_id = user.telegram_id, "Telegram login accepted");

    Ok(Json(LoginResponse::new(user)))
}

#[utoipa::path(
    post,
    path = "/telegram-auth/web-app",
    tag = "auth",
    request_body = WebAppLoginRequest,
    responses(
        (status = 200, description = "initData verified and user stored", body = LoginResponse),
        (status = 400, description = "Body is not a JSON object with init_data"),
        (status = 401, description = "Invalid authentication data"),
        (status = 500, description = "Bot token not configured or storage failure")
    )
)]
#[axum::debug_handler]
pub async fn login_web_app(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<LoginResponse>> {
    let request: WebAppLoginRequest = serde_json::from_slice(&body)?;

    let (data, web_app_user) = state.verifier.authenticate_web_app(&request.init_data)?;
    let user = state
        .user_store
        .upsert(&TelegramProfile::from(&web_app_user))
        .await?;
    tracing::info!(
        telegram_id = user.telegram_id,
        start_param = data.start_param.as_deref().unwrap_or(""),
        "Telegram Mini-App login accepted"
    );

    Ok(Json(LoginResponse::new(user)))
}

/// Bare `OPTIONS` outside a CORS preflight.
pub async fn options() -> StatusCode {
    StatusCode::OK
}

pub async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "error": "Method not allowed" })),
    )
}
