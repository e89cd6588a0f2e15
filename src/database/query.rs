use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::value::FieldValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub column: &'static str,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `column = value`, or `column IS NULL` for a null value.
    Eq(&'static str, FieldValue),
    /// `column IN (...)`; an empty set matches nothing.
    In(&'static str, Vec<FieldValue>),
    /// Case-insensitive substring match.
    Contains(&'static str, String),
}

/// Backend-neutral description of a row query. Conditions are AND-ed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Select {
    pub conditions: Vec<Condition>,
    pub order: Option<OrderBy>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Select {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_id(id: Uuid) -> Self {
        Self::new().filter(Condition::Eq("id", FieldValue::Uuid(id)))
    }

    pub fn by_ids(ids: &[Uuid]) -> Self {
        Self::new().filter(Condition::In(
            "id",
            ids.iter().copied().map(FieldValue::Uuid).collect(),
        ))
    }

    pub fn filter(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn order_by(mut self, column: &'static str, direction: SortDirection) -> Self {
        self.order = Some(OrderBy { column, direction });
        self
    }

    pub fn page(mut self, limit: i64, offset: i64) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }

    /// Same predicates without ordering or paging, for counts and id projections.
    pub fn unpaged(&self) -> Self {
        Self {
            conditions: self.conditions.clone(),
            order: None,
            limit: None,
            offset: None,
        }
    }
}
