pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use crate::services::{auth_service::LoginVerifier, telegram_user_service::TelegramUserStore};

#[derive(Clone)]
pub struct AppState {
    pub verifier: LoginVerifier,
    pub user_store: Arc<dyn TelegramUserStore>,
}

impl AppState {
    pub fn new(verifier: LoginVerifier, user_store: Arc<dyn TelegramUserStore>) -> Self {
        Self {
            verifier,
            user_store,
        }
    }
}
