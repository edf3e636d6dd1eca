pub mod init_data;
pub mod telegram_auth;
pub mod time;
