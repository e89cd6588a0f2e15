pub mod api_key;
pub mod user;

pub use api_key::{ApiKey, ApiKeyCreate, ApiKeyGenerated};
pub use user::{ClerkUserUpdate, Role, UnknownRole, User, UserCreate, UserPatch, UserRead};
