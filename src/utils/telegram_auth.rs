//! Telegram Login Widget verification.
//!
//! Telegram signs a login assertion by sorting every field except `hash`,
//! joining them as `key=value` lines and computing HMAC-SHA256 over the
//! result with the bot token as the key. The same data-check string is reused
//! by the Mini-App `initData` scheme in [`crate::utils::init_data`], which only
//! differs in how the key is derived.

use hmac::{Hmac, Mac};
use serde_json::{Map, Value};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

pub const HASH_FIELD: &str = "hash";

/// Fields Telegram always sends with a login assertion.
const REQUIRED_FIELDS: [&str; 3] = ["id", "first_name", "auth_date"];

/// Outcome of checking one login assertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected(RejectReason),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }
}

/// Why an assertion was rejected. Server-side diagnostics only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    MissingField(&'static str),
    MalformedHash,
    SignatureMismatch,
}

/// Builds the data-check string: every pair except `hash`, sorted by key
/// bytes, joined as `key=value` lines without a trailing newline.
pub fn data_check_string<K, V, I>(fields: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut pairs: Vec<(K, V)> = fields
        .into_iter()
        .filter(|(key, _)| key.as_ref() != HASH_FIELD)
        .collect();
    pairs.sort_by(|a, b| a.0.as_ref().as_bytes().cmp(b.0.as_ref().as_bytes()));

    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k.as_ref(), v.as_ref()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Canonical form of a JSON login payload. `null` fields are skipped the same
/// way absent ones are.
pub fn canonicalize(payload: &Map<String, Value>) -> String {
    data_check_string(
        payload
            .iter()
            .filter_map(|(key, value)| render_value(value).map(|v| (key.as_str(), v))),
    )
}

fn render_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        nested => Some(nested.to_string()),
    }
}

/// Rejects an unset or blank bot token so a misconfigured deployment can
/// never accept a login.
pub fn bot_token_secret(bot_token: Option<&str>) -> Result<&[u8]> {
    match bot_token {
        Some(token) if !token.trim().is_empty() => Ok(token.as_bytes()),
        _ => Err(Error::Config("TELEGRAM_BOT_TOKEN not configured".to_string())),
    }
}

/// Lowercase hex HMAC-SHA256 of `message` under `key`.
pub fn sign(message: &str, key: &[u8]) -> Result<String> {
    let mut mac =
        HmacSha256::new_from_slice(key).map_err(|e| Error::Internal(e.to_string()))?;
    mac.update(message.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time comparison of a computed lowercase hex digest against the
/// hash a client sent. The received side is lowercased first.
pub fn signature_matches(computed: &str, received: &str) -> bool {
    let received = received.to_ascii_lowercase();
    computed.as_bytes().ct_eq(received.as_bytes()).into()
}

fn is_sha256_hex(hash: &str) -> bool {
    hash.len() == 64 && hash.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Checks a Login Widget payload against the bot token.
///
/// Only a missing bot token is an error; every data-driven failure comes back
/// as [`Verdict::Rejected`].
pub fn check_login(payload: &Map<String, Value>, bot_token: Option<&str>) -> Result<Verdict> {
    let secret = bot_token_secret(bot_token)?;

    let received = match payload.get(HASH_FIELD) {
        Some(Value::String(hash)) => hash,
        Some(_) => return Ok(Verdict::Rejected(RejectReason::MalformedHash)),
        None => return Ok(Verdict::Rejected(RejectReason::MissingField(HASH_FIELD))),
    };
    if !is_sha256_hex(received) {
        return Ok(Verdict::Rejected(RejectReason::MalformedHash));
    }

    if let Some(field) = REQUIRED_FIELDS
        .into_iter()
        .find(|field| payload.get(*field).map_or(true, Value::is_null))
    {
        return Ok(Verdict::Rejected(RejectReason::MissingField(field)));
    }

    let computed = sign(&canonicalize(payload), secret)?;
    if signature_matches(&computed, received) {
        Ok(Verdict::Accepted)
    } else {
        Ok(Verdict::Rejected(RejectReason::SignatureMismatch))
    }
}

/// `true` iff the payload was signed with `bot_token`.
pub fn verify(payload: &Map<String, Value>, bot_token: Option<&str>) -> Result<bool> {
    check_login(payload, bot_token).map(|verdict| verdict.is_accepted())
}
