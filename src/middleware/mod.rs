pub mod auth;

pub use auth::{extract_credentials, AdminUser, CurrentUser, API_KEY_HEADER};
