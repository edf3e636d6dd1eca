use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::telegram_user::{TelegramProfile, TelegramUser};
use crate::utils::init_data::WebAppUser;

/// Login Widget assertion as Telegram sends it. Only built after the raw
/// payload has been verified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AuthPayload {
    pub id: i64,
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    pub auth_date: i64,
    pub hash: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct WebAppLoginRequest {
    /// Raw `Telegram.WebApp.initData` query string.
    pub init_data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub success: bool,
    pub user: TelegramUser,
}

impl LoginResponse {
    pub fn new(user: TelegramUser) -> Self {
        Self { success: true, user }
    }
}

impl From<&AuthPayload> for TelegramProfile {
    fn from(payload: &AuthPayload) -> Self {
        Self {
            telegram_id: payload.id,
            first_name: payload.first_name.clone(),
            last_name: payload.last_name.clone(),
            username: payload.username.clone(),
            photo_url: payload.photo_url.clone(),
        }
    }
}

impl From<&WebAppUser> for TelegramProfile {
    fn from(user: &WebAppUser) -> Self {
        Self {
            telegram_id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            username: user.username.clone(),
            photo_url: user.photo_url.clone(),
        }
    }
}
