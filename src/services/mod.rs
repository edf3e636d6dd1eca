pub mod auth_service;
pub mod telegram_user_service;
