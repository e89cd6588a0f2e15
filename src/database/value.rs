use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

/// A typed column value as it is bound into a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// JSON form matching how entities serialize the same column.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => json!(b),
            FieldValue::Int(i) => json!(i),
            FieldValue::Text(s) => json!(s),
            FieldValue::Uuid(id) => json!(id),
            FieldValue::Timestamp(ts) => json!(ts),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<Uuid> for FieldValue {
    fn from(v: Uuid) -> Self {
        FieldValue::Uuid(v)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(v: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(v)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

/// Ordered column assignments for an insert or a partial update.
///
/// Only the columns present are written; absence and an explicit `Null` are different things.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Changes {
    fields: Vec<(&'static str, FieldValue)>,
}

impl Changes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a column, replacing any earlier value for the same column.
    pub fn set(&mut self, column: &'static str, value: impl Into<FieldValue>) -> &mut Self {
        let value = value.into();
        match self.fields.iter_mut().find(|(c, _)| *c == column) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((column, value)),
        }
        self
    }

    pub fn with(mut self, column: &'static str, value: impl Into<FieldValue>) -> Self {
        self.set(column, value);
        self
    }

    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(c, _)| *c == column).map(|(_, v)| v)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|(c, _)| *c)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &FieldValue)> {
        self.fields.iter().map(|(c, v)| (*c, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_in_place() {
        let mut changes = Changes::new();
        changes.set("email", "a@example.com").set("role", "standard");
        changes.set("email", "b@example.com");

        assert_eq!(changes.len(), 2);
        assert_eq!(changes.columns().collect::<Vec<_>>(), vec!["email", "role"]);
        assert_eq!(changes.get("email"), Some(&FieldValue::Text("b@example.com".to_string())));
    }

    #[test]
    fn none_becomes_explicit_null() {
        let changes = Changes::new().with("clerk_id", None::<String>);
        assert!(changes.contains("clerk_id"));
        assert!(changes.get("clerk_id").is_some_and(FieldValue::is_null));
    }
}
