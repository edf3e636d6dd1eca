use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::Result;
use crate::models::telegram_user::{TelegramProfile, TelegramUser};
use crate::utils::time::now;

/// Persistence for users who logged in through Telegram.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TelegramUserStore: Send + Sync {
    /// Inserts the user or refreshes an existing one, bumping `last_login`.
    async fn upsert(&self, profile: &TelegramProfile) -> Result<TelegramUser>;

    async fn find_by_telegram_id(&self, telegram_id: i64) -> Result<Option<TelegramUser>>;
}

#[derive(Clone)]
pub struct PgTelegramUserStore {
    pool: PgPool,
}

impl PgTelegramUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TelegramUserStore for PgTelegramUserStore {
    async fn upsert(&self, profile: &TelegramProfile) -> Result<TelegramUser> {
        let user = sqlx::query_as::<_, TelegramUser>(
            r#"
            INSERT INTO telegram_users (telegram_id, first_name, last_name, username, photo_url, created_at, last_login)
            VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
            ON CONFLICT (telegram_id) DO UPDATE SET
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                username = EXCLUDED.username,
                photo_url = EXCLUDED.photo_url,
                last_login = NOW()
            RETURNING id, telegram_id, first_name, last_name, username, photo_url, created_at, last_login
            "#,
        )
        .bind(profile.telegram_id)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.username)
        .bind(&profile.photo_url)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_telegram_id(&self, telegram_id: i64) -> Result<Option<TelegramUser>> {
        let user = sqlx::query_as::<_, TelegramUser>(
            r#"
            SELECT id, telegram_id, first_name, last_name, username, photo_url, created_at, last_login
            FROM telegram_users
            WHERE telegram_id = $1
            "#,
        )
        .bind(telegram_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }
}

/// Process-local store for running without Postgres.
#[derive(Clone, Default)]
pub struct InMemoryTelegramUserStore {
    users: Arc<RwLock<HashMap<i64, TelegramUser>>>,
}

impl InMemoryTelegramUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TelegramUserStore for InMemoryTelegramUserStore {
    async fn upsert(&self, profile: &TelegramProfile) -> Result<TelegramUser> {
        let mut users = self.users.write().await;
        let login_at = now();
        let user = users
            .entry(profile.telegram_id)
            .and_modify(|user| {
                user.first_name = profile.first_name.clone();
                user.last_name = profile.last_name.clone();
                user.username = profile.username.clone();
                user.photo_url = profile.photo_url.clone();
                user.last_login = login_at;
            })
            .or_insert_with(|| TelegramUser {
                id: Uuid::new_v4(),
                telegram_id: profile.telegram_id,
                first_name: profile.first_name.clone(),
                last_name: profile.last_name.clone(),
                username: profile.username.clone(),
                photo_url: profile.photo_url.clone(),
                created_at: login_at,
                last_login: login_at,
            });
        Ok(user.clone())
    }

    async fn find_by_telegram_id(&self, telegram_id: i64) -> Result<Option<TelegramUser>> {
        Ok(self.users.read().await.get(&telegram_id).cloned())
    }
}
