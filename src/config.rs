use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::fmt;
use std::sync::OnceLock;

const DEFAULT_AUTH_RPS: u32 = 20;

#[derive(Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: Option<String>,
    pub telegram_bot_token: Option<String>,
    pub auth_max_age_secs: Option<u64>,
    pub auth_rps: u32,
    pub log_json: bool,
}

// The bot token is a signing secret and must never reach the logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("server_address", &self.server_address)
            .field("database_url", &self.database_url.as_ref().map(|_| "xxxxx"))
            .field(
                "telegram_bot_token",
                &self.telegram_bot_token.as_ref().map(|_| "xxxxx"),
            )
            .field("auth_max_age_secs", &self.auth_max_age_secs)
            .field("auth_rps", &self.auth_rps)
            .field("log_json", &self.log_json)
            .finish()
    }
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_source(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    /// Empty values count as unset.
    pub fn from_source<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get_opt = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Ok(Self {
            server_address: get_opt("SERVER_ADDRESS").ok_or_else(|| missing("SERVER_ADDRESS"))?,
            database_url: get_opt("DATABASE_URL"),
            telegram_bot_token: get_opt("TELEGRAM_BOT_TOKEN"),
            auth_max_age_secs: parse_opt("TELEGRAM_AUTH_MAX_AGE_SECS", get_opt("TELEGRAM_AUTH_MAX_AGE_SECS"))?,
            auth_rps: parse_opt("AUTH_RPS", get_opt("AUTH_RPS"))?.unwrap_or(DEFAULT_AUTH_RPS),
            log_json: get_opt("LOG_FORMAT").is_some_and(|v| v.eq_ignore_ascii_case("json")),
        })
    }
}

fn missing(name: &str) -> Error {
    Error::Config(format!("Missing environment variable: {}", name))
}

fn parse_opt<T>(name: &str, raw: Option<String>) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.map(|v| {
        v.trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e)))
    })
    .transpose()
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
