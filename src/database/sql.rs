//! SQL text generation for [`Select`] queries and write statements.
//!
//! Values are always sent as positional parameters, except `NULL`, which is inlined so Postgres
//! never has to infer a type for an untyped parameter.

use uuid::Uuid;

use super::query::{Condition, Select};
use super::value::{Changes, FieldValue};

#[derive(Debug, Clone, PartialEq)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<FieldValue>,
}

struct SqlBuilder {
    params: Vec<FieldValue>,
}

impl SqlBuilder {
    fn new() -> Self {
        Self { params: vec![] }
    }

    fn param(&mut self, value: FieldValue) -> String {
        if value.is_null() {
            return "NULL".to_string();
        }
        self.params.push(value);
        format!("${}", self.params.len())
    }

    fn where_clause(&mut self, conditions: &[Condition]) -> String {
        if conditions.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = conditions.iter().map(|c| self.condition(c)).collect();
        format!("WHERE {}", parts.join(" AND "))
    }

    fn condition(&mut self, condition: &Condition) -> String {
        match condition {
            Condition::Eq(column, FieldValue::Null) => format!("{} IS NULL", quote(column)),
            Condition::Eq(column, value) => {
                format!("{} = {}", quote(column), self.param(value.clone()))
            }
            Condition::In(_, values) if values.is_empty() => "1=0".to_string(),
            Condition::In(column, values) => {
                let params: Vec<String> = values.iter().map(|v| self.param(v.clone())).collect();
                format!("{} IN ({})", quote(column), params.join(", "))
            }
            Condition::Contains(column, term) => {
                let pattern = format!("%{}%", escape_like(term));
                format!("{} ILIKE {}", quote(column), self.param(FieldValue::Text(pattern)))
            }
        }
    }

    fn finish(self, query: String) -> SqlResult {
        SqlResult { query, params: self.params }
    }
}

fn join_clauses(parts: Vec<String>) -> String {
    parts.into_iter().filter(|s| !s.is_empty()).collect::<Vec<_>>().join(" ")
}

pub fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// Escapes LIKE wildcards so user search text matches literally.
pub fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

pub fn select(table: &str, select: &Select) -> SqlResult {
    let mut builder = SqlBuilder::new();
    let where_clause = builder.where_clause(&select.conditions);
    let order_clause = select
        .order
        .as_ref()
        .map(|o| format!("ORDER BY {} {}", quote(o.column), o.direction.to_sql()))
        .unwrap_or_default();
    let limit_clause = match (select.limit, select.offset) {
        (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
        (Some(l), None) => format!("LIMIT {}", l),
        (None, Some(o)) => format!("OFFSET {}", o),
        (None, None) => String::new(),
    };

    let query = join_clauses(vec![
        format!("SELECT * FROM {}", quote(table)),
        where_clause,
        order_clause,
        limit_clause,
    ]);
    builder.finish(query)
}

/// Counts the filtered rows through a subquery, ignoring ordering and paging.
pub fn count(table: &str, select: &Select) -> SqlResult {
    let inner = self::select(table, &select.unpaged());
    SqlResult {
        query: format!("SELECT COUNT(*) AS count FROM ({}) AS filtered", inner.query),
        params: inner.params,
    }
}

pub fn ids(table: &str, select: &Select) -> SqlResult {
    let mut builder = SqlBuilder::new();
    let where_clause = builder.where_clause(&select.conditions);
    let query = join_clauses(vec![format!("SELECT \"id\" FROM {}", quote(table)), where_clause]);
    builder.finish(query)
}

/// Multi-row insert. Columns missing from a row are written as `DEFAULT`.
pub fn insert(table: &str, rows: &[Changes]) -> SqlResult {
    let mut columns: Vec<&'static str> = vec![];
    for row in rows {
        for column in row.columns() {
            if !columns.contains(&column) {
                columns.push(column);
            }
        }
    }

    let mut builder = SqlBuilder::new();
    if columns.is_empty() {
        return builder.finish(format!("INSERT INTO {} DEFAULT VALUES RETURNING *", quote(table)));
    }

    let tuples: Vec<String> = rows
        .iter()
        .map(|row| {
            let values: Vec<String> = columns
                .iter()
                .map(|column| match row.get(column) {
                    Some(value) => builder.param(value.clone()),
                    None => "DEFAULT".to_string(),
                })
                .collect();
            format!("({})", values.join(", "))
        })
        .collect();

    let column_list: Vec<String> = columns.iter().map(|c| quote(c)).collect();
    let query = format!(
        "INSERT INTO {} ({}) VALUES {} RETURNING *",
        quote(table),
        column_list.join(", "),
        tuples.join(", ")
    );
    builder.finish(query)
}

/// Applies the same assignments to every listed row. `touch` also refreshes `updated_at`.
pub fn update(table: &str, ids: &[Uuid], changes: &Changes, touch: bool) -> SqlResult {
    let mut builder = SqlBuilder::new();
    let mut assignments: Vec<String> = changes
        .iter()
        .map(|(column, value)| format!("{} = {}", quote(column), builder.param(value.clone())))
        .collect();
    if touch && !changes.contains("updated_at") {
        assignments.push("\"updated_at\" = now()".to_string());
    }
    let where_clause = builder.where_clause(&Select::by_ids(ids).conditions);
    let query = format!(
        "UPDATE {} SET {} {} RETURNING *",
        quote(table),
        assignments.join(", "),
        where_clause
    );
    builder.finish(query)
}

pub fn delete(table: &str, select: &Select) -> SqlResult {
    let mut builder = SqlBuilder::new();
    let where_clause = builder.where_clause(&select.conditions);
    let query = join_clauses(vec![format!("DELETE FROM {}", quote(table)), where_clause]);
    builder.finish(query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::query::SortDirection;

    #[test]
    fn select_orders_then_pages() {
        let q = Select::new()
            .filter(Condition::Eq("role", FieldValue::Text("admin".into())))
            .filter(Condition::Contains("email", "Ex".into()))
            .order_by("email", SortDirection::Desc)
            .page(10, 20);
        let sql = select("users", &q);
        assert_eq!(
            sql.query,
            "SELECT * FROM \"users\" WHERE \"role\" = $1 AND \"email\" ILIKE $2 ORDER BY \"email\" DESC LIMIT 10 OFFSET 20"
        );
        assert_eq!(sql.params[1], FieldValue::Text("%Ex%".into()));
    }

    #[test]
    fn count_wraps_unpaged_subquery() {
        let q = Select::new()
            .filter(Condition::Eq("clerk_id", FieldValue::Null))
            .order_by("email", SortDirection::Asc)
            .page(5, 0);
        let sql = count("users", &q);
        assert_eq!(
            sql.query,
            "SELECT COUNT(*) AS count FROM (SELECT * FROM \"users\" WHERE \"clerk_id\" IS NULL) AS filtered"
        );
        assert!(sql.params.is_empty());
    }

    #[test]
    fn empty_in_matches_nothing() {
        let sql = ids("users", &Select::by_ids(&[]));
        assert_eq!(sql.query, "SELECT \"id\" FROM \"users\" WHERE 1=0");
    }

    #[test]
    fn insert_fills_missing_columns_with_default() {
        let rows = vec![
            Changes::new().with("email", "a@example.com").with("role", "admin"),
            Changes::new().with("email", "b@example.com").with("clerk_id", None::<String>),
        ];
        let sql = insert("users", &rows);
        assert_eq!(
            sql.query,
            "INSERT INTO \"users\" (\"email\", \"role\", \"clerk_id\") VALUES ($1, $2, DEFAULT), ($3, DEFAULT, NULL) RETURNING *"
        );
        assert_eq!(sql.params.len(), 3);
    }

    #[test]
    fn update_touches_updated_at() {
        let id = Uuid::new_v4();
        let sql = update("users", &[id], &Changes::new().with("role", "admin"), true);
        assert_eq!(
            sql.query,
            "UPDATE \"users\" SET \"role\" = $1, \"updated_at\" = now() WHERE \"id\" IN ($2) RETURNING *"
        );
        assert_eq!(sql.params, vec![FieldValue::Text("admin".into()), FieldValue::Uuid(id)]);
    }

    #[test]
    fn delete_uses_scoped_predicates() {
        let (id, owner) = (Uuid::new_v4(), Uuid::new_v4());
        let q = Select::by_ids(&[id]).filter(Condition::Eq("user_id", FieldValue::Uuid(owner)));
        let sql = delete("api_keys", &q);
        assert_eq!(sql.query, "DELETE FROM \"api_keys\" WHERE \"id\" IN ($1) AND \"user_id\" = $2");
    }

    #[test]
    fn escapes_like_wildcards() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }

    #[test]
    fn quotes_identifiers() {
        assert_eq!(quote("we\"ird"), "\"we\"\"ird\"");
    }
}
