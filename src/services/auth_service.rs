use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::config::Config;
use crate::dto::auth_dto::AuthPayload;
use crate::error::{Error, Result};
use crate::utils::init_data::{check_init_data, InitData, InitDataVerdict, WebAppUser};
use crate::utils::telegram_auth::{check_login, RejectReason, Verdict};
use crate::utils::time::{unix_now, within_window};

/// The only message a client ever sees for a rejected login.
pub const INVALID_AUTH: &str = "Invalid authentication data";

fn rejected() -> Error {
    Error::Unauthorized(INVALID_AUTH.to_string())
}

/// Turns untrusted login assertions into verified identities.
#[derive(Clone)]
pub struct LoginVerifier {
    bot_token: Option<Arc<str>>,
    max_age_secs: Option<u64>,
}

impl fmt::Debug for LoginVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginVerifier")
            .field("bot_token", &self.bot_token.as_ref().map(|_| "xxxxx"))
            .field("max_age_secs", &self.max_age_secs)
            .finish()
    }
}

impl LoginVerifier {
    pub fn new(bot_token: Option<String>, max_age_secs: Option<u64>) -> Self {
        Self {
            bot_token: bot_token
                .filter(|token| !token.trim().is_empty())
                .map(Arc::from),
            max_age_secs,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.telegram_bot_token.clone(), config.auth_max_age_secs)
    }

    pub fn is_configured(&self) -> bool {
        self.bot_token.is_some()
    }

    fn bot_token(&self) -> Option<&str> {
        self.bot_token.as_deref()
    }

    fn ensure_fresh(&self, auth_date: i64) -> Result<()> {
        let Some(max_age) = self.max_age_secs else {
            return Ok(());
        };
        if within_window(auth_date, unix_now(), max_age) {
            Ok(())
        } else {
            tracing::warn!(auth_date, max_age, "Rejected stale Telegram login");
            Err(rejected())
        }
    }

    /// Verifies a Login Widget payload and returns its typed form.
    pub fn authenticate_login(&self, payload: &Map<String, Value>) -> Result<AuthPayload> {
        match check_login(payload, self.bot_token())? {
            Verdict::Accepted => {}
            Verdict::Rejected(reason) => {
                log_rejection("login_widget", &reason);
                return Err(rejected());
            }
        }

        let auth: AuthPayload =
            serde_json::from_value(Value::Object(payload.clone())).map_err(|e| {
                tracing::warn!("Signed Telegram login has unexpected field types: {}", e);
                rejected()
            })?;
        self.ensure_fresh(auth.auth_date)?;
        Ok(auth)
    }

    /// Verifies Mini-App `initData` and returns the launch parameters. The
    /// payload must carry a user to count as a login.
    pub fn authenticate_web_app(&self, init_data: &str) -> Result<(InitData, WebAppUser)> {
        let data = match check_init_data(init_data, self.bot_token())? {
            InitDataVerdict::Accepted(data) => data,
            InitDataVerdict::Rejected(reason) => {
                log_rejection("web_app", &reason);
                return Err(rejected());
            }
        };
        self.ensure_fresh(data.auth_date)?;

        let Some(user) = data.user.clone() else {
            log_rejection("web_app", &RejectReason::MissingField("user"));
            return Err(rejected());
        };
        Ok((data, user))
    }
}

fn log_rejection(scheme: &str, reason: &RejectReason) {
    tracing::warn!(scheme, reason = ?reason, "Rejected Telegram login");
}
