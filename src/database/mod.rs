pub mod entity;
pub mod manager;
pub mod memory;
pub mod models;
pub mod query;
pub mod repository;
pub mod schema;
pub mod session;
pub mod sql;
pub mod store;
pub mod value;

pub use entity::{Changeset, Entity};
pub use manager::DatabaseError;
pub use query::{Condition, OrderBy, Select, SortDirection};
pub use repository::Repository;
pub use session::Session;
pub use store::Store;
pub use value::{Changes, FieldValue};
