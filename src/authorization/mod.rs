pub mod context;
pub mod scope;

pub use context::AuthorizationContext;
pub use scope::{OrganizationScope, OwnerScope, ScopeStrategy, Unscoped};
