use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::FilterError;
use crate::database::SortDirection;

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

/// Pagination, search, ordering and id filtering for list queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterParams {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    #[serde(default)]
    pub search: Option<String>,
    /// Column name, optionally prefixed with `-` (descending) or `+`.
    #[serde(default)]
    pub order_by: Option<String>,
    #[serde(default, rename = "id__in")]
    pub id_in: Option<Vec<Uuid>>,
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
            search: None,
            order_by: None,
            id_in: None,
        }
    }
}

impl FilterParams {
    pub fn with_ids(ids: Vec<Uuid>) -> Self {
        Self { id_in: Some(ids), ..Self::default() }
    }

    /// Builds validated params from raw query-string pairs.
    ///
    /// `id__in` may be repeated, comma-separated, or both. Unknown keys are rejected.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, FilterError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            let value = value.as_ref().trim();
            match key.as_ref() {
                "limit" => {
                    params.limit = value
                        .parse()
                        .map_err(|_| FilterError::InvalidLimit(format!("not an integer: {}", value)))?;
                }
                "offset" => {
                    params.offset = value
                        .parse()
                        .map_err(|_| FilterError::InvalidOffset(format!("not an integer: {}", value)))?;
                }
                "search" => params.search = Some(value.to_string()).filter(|s| !s.is_empty()),
                "order_by" => params.order_by = Some(value.to_string()).filter(|s| !s.is_empty()),
                "id__in" => {
                    let ids = params.id_in.get_or_insert_with(Vec::new);
                    for part in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                        let id = Uuid::parse_str(part).map_err(|_| FilterError::InvalidId(part.to_string()))?;
                        ids.push(id);
                    }
                }
                other => return Err(FilterError::UnknownParameter(other.to_string())),
            }
        }
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), FilterError> {
        if !(1..=MAX_LIMIT).contains(&self.limit) {
            return Err(FilterError::InvalidLimit(format!(
                "must be between 1 and {}, got {}",
                MAX_LIMIT, self.limit
            )));
        }
        if self.offset < 0 {
            return Err(FilterError::InvalidOffset(format!("must be non-negative, got {}", self.offset)));
        }
        Ok(())
    }

    /// Rejects an `order_by` whose field is not in `allowed`.
    pub fn validate_order_by(&self, allowed: &[&str]) -> Result<(), FilterError> {
        match self.order_by.as_deref() {
            Some(order_by) => {
                let (field, _) = parse_order(order_by);
                if allowed.contains(&field) {
                    Ok(())
                } else {
                    Err(FilterError::InvalidOrderBy(format!(
                        "{} (allowed: {})",
                        field,
                        allowed.join(", ")
                    )))
                }
            }
            None => Ok(()),
        }
    }
}

/// Splits a leading `-`/`+` direction marker off a field name.
pub fn parse_order(order_by: &str) -> (&str, SortDirection) {
    if let Some(field) = order_by.strip_prefix('-') {
        (field, SortDirection::Desc)
    } else if let Some(field) = order_by.strip_prefix('+') {
        (field, SortDirection::Asc)
    } else {
        (order_by, SortDirection::Asc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let params = FilterParams::default();
        assert_eq!(params.limit, 10);
        assert_eq!(params.offset, 0);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn limit_bounds() {
        for limit in [0, 101, -1] {
            let params = FilterParams { limit, ..Default::default() };
            assert!(matches!(params.validate(), Err(FilterError::InvalidLimit(_))), "limit {}", limit);
        }
        for limit in [1, 100] {
            assert!(FilterParams { limit, ..Default::default() }.validate().is_ok());
        }
    }

    #[test]
    fn negative_offset_rejected() {
        let params = FilterParams { offset: -1, ..Default::default() };
        assert!(matches!(params.validate(), Err(FilterError::InvalidOffset(_))));
    }

    #[test]
    fn parses_direction_prefix() {
        assert_eq!(parse_order("-email"), ("email", SortDirection::Desc));
        assert_eq!(parse_order("+email"), ("email", SortDirection::Asc));
        assert_eq!(parse_order("email"), ("email", SortDirection::Asc));
    }

    #[test]
    fn order_by_allow_list() {
        let params = FilterParams { order_by: Some("-email".into()), ..Default::default() };
        assert!(params.validate_order_by(&["email", "created_at"]).is_ok());
        assert!(matches!(
            params.validate_order_by(&["created_at"]),
            Err(FilterError::InvalidOrderBy(_))
        ));
    }

    #[test]
    fn id_in_accepts_repeats_and_commas() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let pairs = vec![
            ("id__in".to_string(), format!("{},{}", a, b)),
            ("id__in".to_string(), c.to_string()),
            ("limit".to_string(), "50".to_string()),
        ];
        let params = FilterParams::from_pairs(pairs).unwrap();
        assert_eq!(params.id_in, Some(vec![a, b, c]));
        assert_eq!(params.limit, 50);
    }

    #[test]
    fn from_pairs_rejects_unknown_and_malformed() {
        assert_eq!(
            FilterParams::from_pairs([("page", "2")]),
            Err(FilterError::UnknownParameter("page".into()))
        );
        assert_eq!(
            FilterParams::from_pairs([("id__in", "nope")]),
            Err(FilterError::InvalidId("nope".into()))
        );
        assert!(matches!(FilterParams::from_pairs([("limit", "500")]), Err(FilterError::InvalidLimit(_))));
    }

    #[test]
    fn json_rejects_unknown_fields() {
        let parsed: Result<FilterParams, _> = serde_json::from_str(r#"{"limit": 5, "page": 1}"#);
        assert!(parsed.is_err());
        let parsed: FilterParams = serde_json::from_str(r#"{"order_by": "-email"}"#).unwrap();
        assert_eq!(parsed.limit, 10);
    }
}
