use std::net::SocketAddr;
use std::sync::Arc;

use teejaro_auth::{
    config::{get_config, init_config},
    database::pool::create_pool,
    middleware::rate_limit::LoginRateLimiter,
    routes,
    services::{
        auth_service::LoginVerifier,
        telegram_user_service::{InMemoryTelegramUserStore, PgTelegramUserStore, TelegramUserStore},
    },
    AppState,
};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_config()?;
    let config = get_config();
    init_tracing(config.log_json);

    let verifier = LoginVerifier::from_config(config);
    if !verifier.is_configured() {
        warn!("TELEGRAM_BOT_TOKEN is not set; every login will fail with a configuration error");
    }

    let user_store: Arc<dyn TelegramUserStore> = match &config.database_url {
        Some(database_url) => {
            let pool = create_pool(database_url).await?;
            sqlx::migrate!("./migrations").run(&pool).await?;
            info!("Using Postgres user store");
            Arc::new(PgTelegramUserStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL is not set; users are kept in memory only");
            Arc::new(InMemoryTelegramUserStore::new())
        }
    };

    let state = AppState::new(verifier, user_store);
    let app = routes::app(state, LoginRateLimiter::per_second(config.auth_rps));

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
