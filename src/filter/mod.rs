pub mod error;
pub mod params;

pub use error::FilterError;
pub use params::{parse_order, FilterParams, DEFAULT_LIMIT, MAX_LIMIT};
