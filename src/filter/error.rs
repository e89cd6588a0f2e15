use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("Invalid limit: {0}")]
    InvalidLimit(String),

    #[error("Invalid offset: {0}")]
    InvalidOffset(String),

    #[error("Invalid order_by field: {0}")]
    InvalidOrderBy(String),

    #[error("Invalid id in id__in: {0}")]
    InvalidId(String),

    #[error("Unknown query parameter: {0}")]
    UnknownParameter(String),
}
