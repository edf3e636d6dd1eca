//! Mini-App `initData` verification.
//!
//! https://core.telegram.org/bots/webapps#validating-data-received-via-the-mini-app

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::error::{Error, Result};
use crate::utils::telegram_auth::{
    bot_token_secret, data_check_string, sign, signature_matches, RejectReason, HASH_FIELD,
};

type HmacSha256 = Hmac<Sha256>;

const WEB_APP_KEY: &[u8] = b"WebAppData";

/// User object carried in the `user` field of `initData`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WebAppUser {
    pub id: i64,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub photo_url: Option<String>,
    pub language_code: Option<String>,
    pub is_premium: Option<bool>,
}

/// Verified launch parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct InitData {
    pub auth_date: i64,
    pub query_id: Option<String>,
    pub start_param: Option<String>,
    pub user: Option<WebAppUser>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InitDataVerdict {
    Accepted(InitData),
    Rejected(RejectReason),
}

/// Mini-App secret: HMAC-SHA256 of the bot token keyed with `WebAppData`.
pub fn web_app_secret(bot_token: Option<&str>) -> Result<Vec<u8>> {
    let token = bot_token_secret(bot_token)?;
    let mut mac =
        HmacSha256::new_from_slice(WEB_APP_KEY).map_err(|e| Error::Internal(e.to_string()))?;
    mac.update(token);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Decoded `key=value` pairs of a query string.
fn parse_pairs(init_data: &str) -> Vec<(String, String)> {
    url::form_urlencoded::parse(init_data.trim_start_matches('?').as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

fn field<'a>(pairs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

/// Checks a raw `initData` query string against the bot token.
pub fn check_init_data(init_data: &str, bot_token: Option<&str>) -> Result<InitDataVerdict> {
    let secret = web_app_secret(bot_token)?;
    let pairs = parse_pairs(init_data);

    let Some(received) = field(&pairs, HASH_FIELD) else {
        return Ok(InitDataVerdict::Rejected(RejectReason::MissingField(HASH_FIELD)));
    };
    let Some(auth_date) = field(&pairs, "auth_date") else {
        return Ok(InitDataVerdict::Rejected(RejectReason::MissingField("auth_date")));
    };

    let computed = sign(&data_check_string(pairs.iter().map(|(k, v)| (k, v))), &secret)?;
    if !signature_matches(&computed, received) {
        return Ok(InitDataVerdict::Rejected(RejectReason::SignatureMismatch));
    }

    // Signed by Telegram from here on; a field that doesn't decode is a
    // contract violation rather than a forgery, but still not usable.
    let Ok(auth_date) = auth_date.parse::<i64>() else {
        return Ok(InitDataVerdict::Rejected(RejectReason::MissingField("auth_date")));
    };
    let user = match field(&pairs, "user") {
        Some(raw) => match serde_json::from_str::<WebAppUser>(raw) {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!("Signed initData carried an undecodable user: {}", e);
                return Ok(InitDataVerdict::Rejected(RejectReason::MissingField("user")));
            }
        },
        None => None,
    };

    Ok(InitDataVerdict::Accepted(InitData {
        auth_date,
        query_id: field(&pairs, "query_id").map(str::to_string),
        start_param: field(&pairs, "start_param").map(str::to_string),
        user,
    }))
}
