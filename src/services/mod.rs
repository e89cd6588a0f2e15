pub mod api_key_service;
pub mod base;
pub mod clerk_service;
pub mod error;
pub mod user_service;

pub use api_key_service::ApiKeyService;
pub use base::{
    Action, BaseService, BulkCreateService, BulkDeleteService, BulkUpdateService, CreateService,
    DeleteService, ListService, Paginated, ReadService, UpdateService,
};
pub use clerk_service::{ClerkEvent, ClerkUserService, WebhookOutcome};
pub use error::ServiceError;
pub use user_service::UserService;
