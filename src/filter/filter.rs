use serde_json::{Map, Value};
use std::collections::HashMap;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{FilterClause, FilterOp, FilterOrderInfo, PageWindow, Pagination, SqlResult};
use crate::config::FilterConfig;

/// Query-string keys that shape the result rather than filter it.
pub const RESERVED_KEYS: &[&str] = &["select", "sort", "page", "limit"];

/// Sort applied to list requests that do not name one.
pub const DEFAULT_SORT: &str = "-createdAt";

/// A store query: typed predicate plus projection, ordering and page window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<FilterClause>,
    select_columns: Option<Vec<String>>,
    order_data: Vec<FilterOrderInfo>,
    window: Option<PageWindow>,
}

impl Filter {
    /// Matches every record, unordered and unpaginated.
    pub fn new() -> Self {
        Self::default()
    }

    /// Translate list-endpoint query parameters.
    ///
    /// `select`, `sort`, `page` and `limit` are pulled out first; every other
    /// key becomes a clause. Unusable `page`/`limit` values fall back to the
    /// defaults instead of failing the request.
    pub fn from_query(params: &HashMap<String, String>, config: &FilterConfig) -> Result<Self, FilterError> {
        let mut filter = Self::new();

        let mut keys: Vec<&String> = params
            .keys()
            .filter(|key| !RESERVED_KEYS.contains(&key.as_str()))
            .collect();
        keys.sort();
        for key in keys {
            filter.clauses.push(FilterWhere::parse(key, &params[key])?);
        }

        if let Some(select) = params.get("select") {
            let columns: Vec<String> = select
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect();
            filter.select(columns)?;
        }

        let sort = params
            .get("sort")
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SORT);
        filter.order(sort)?;

        let page = parse_positive(params.get("page")).unwrap_or(1);
        let limit = parse_positive(params.get("limit")).unwrap_or(config.default_limit);
        filter.window(page, limit, config);

        if config.debug_logging {
            tracing::debug!(?filter, "translated list query");
        }

        Ok(filter)
    }

    /// Exact-match builder used by services for internal lookups.
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push(FilterClause::new(field, FilterOp::Equals, value));
        self
    }

    pub fn where_in(mut self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.clauses.push(FilterClause::new(field, FilterOp::OneOf, Value::Array(values)));
        self
    }

    pub fn select(&mut self, columns: Vec<String>) -> Result<&mut Self, FilterError> {
        for column in &columns {
            FilterWhere::validate_field(column)?;
        }
        self.select_columns = if columns.is_empty() { None } else { Some(columns) };
        Ok(self)
    }

    pub fn order(&mut self, order_spec: &str) -> Result<&mut Self, FilterError> {
        self.order_data = FilterOrder::parse(order_spec)?;
        Ok(self)
    }

    pub fn window(&mut self, page: u32, limit: u32, config: &FilterConfig) -> &mut Self {
        let max_limit = config.max_limit.unwrap_or(u32::MAX);
        let applied_limit = if limit > max_limit {
            tracing::warn!("Limit {} exceeds max {}, capping to max", limit, max_limit);
            max_limit
        } else {
            limit
        };
        self.window = Some(PageWindow { page: page.max(1), limit: applied_limit.max(1) });
        self
    }

    /// Fail when a clause or sort key touches one of `hidden`.
    pub fn reject_fields(&self, hidden: &[&str]) -> Result<(), FilterError> {
        let touched = self
            .clauses
            .iter()
            .map(|c| c.field.as_str())
            .chain(self.order_data.iter().map(|o| o.column.as_str()));
        for field in touched {
            let root = field.split('.').next().unwrap_or(field);
            if hidden.contains(&root) {
                return Err(FilterError::HiddenField(field.to_string()));
            }
        }
        Ok(())
    }

    pub fn clauses(&self) -> &[FilterClause] {
        &self.clauses
    }

    pub fn selected(&self) -> Option<&[String]> {
        self.select_columns.as_deref()
    }

    pub fn order_info(&self) -> &[FilterOrderInfo] {
        &self.order_data
    }

    pub fn page_window(&self) -> Option<PageWindow> {
        self.window
    }

    /// Neighbouring page links; empty for unpaginated filters.
    pub fn pagination(&self, total: u64) -> Pagination {
        self.window.map(|w| w.pagination(total)).unwrap_or_default()
    }

    pub fn matches(&self, document: &Map<String, Value>) -> bool {
        FilterWhere::matches(document, &self.clauses)
    }

    /// Restrict a document to the selected fields; `id` always survives.
    pub fn project(&self, document: Map<String, Value>) -> Map<String, Value> {
        match &self.select_columns {
            None => document,
            Some(columns) => project_fields(document, columns.as_slice()),
        }
    }

    pub fn to_sql(&self, table_name: &str) -> Result<SqlResult, FilterError> {
        Self::validate_table_name(table_name)?;
        let (where_clause, params) = FilterWhere::generate(&self.clauses, 0);
        let order_clause = FilterOrder::generate(&self.order_data);
        let limit_clause = self.build_limit_clause();

        let query = [
            format!("SELECT \"doc\" FROM \"{}\"", table_name),
            format!("WHERE {}", where_clause),
            order_clause,
            limit_clause,
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        Ok(SqlResult { query, params })
    }

    pub fn to_count_sql(&self, table_name: &str) -> Result<SqlResult, FilterError> {
        Self::validate_table_name(table_name)?;
        let (where_clause, params) = FilterWhere::generate(&self.clauses, 0);
        let query = format!("SELECT COUNT(*) AS count FROM \"{}\" WHERE {}", table_name, where_clause);
        Ok(SqlResult { query, params })
    }

    fn validate_table_name(name: &str) -> Result<(), FilterError> {
        let valid = name
            .chars()
            .next()
            .map(|c| c.is_ascii_alphabetic() || c == '_')
            .unwrap_or(false)
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(FilterError::InvalidTableName(name.to_string()));
        }
        Ok(())
    }

    fn build_limit_clause(&self) -> String {
        match self.window {
            Some(w) => format!("LIMIT {} OFFSET {}", w.limit, w.skip()),
            None => String::new(),
        }
    }
}

/// Keep `id` plus the named top-level fields.
pub fn project_fields(document: Map<String, Value>, columns: &[impl AsRef<str>]) -> Map<String, Value> {
    document
        .into_iter()
        .filter(|(key, _)| key == "id" || columns.iter().any(|c| c.as_ref() == key))
        .collect()
}

fn parse_positive(raw: Option<&String>) -> Option<u32> {
    raw.and_then(|v| v.trim().parse::<u32>().ok()).filter(|v| *v > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::types::SortDirection;
    use serde_json::json;

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn config() -> FilterConfig {
        FilterConfig { default_limit: 20, max_limit: Some(100), debug_logging: false }
    }

    #[test]
    fn reserved_keys_are_not_filters() {
        let f = Filter::from_query(
            &query(&[("select", "name"), ("sort", "name"), ("page", "2"), ("limit", "5"), ("housing", "true")]),
            &config(),
        )
        .unwrap();
        assert_eq!(f.clauses().len(), 1);
        assert_eq!(f.clauses()[0].field, "housing");
        assert_eq!(f.selected(), Some(&["name".to_string()][..]));
        assert_eq!(f.page_window(), Some(PageWindow { page: 2, limit: 5 }));
    }

    #[test]
    fn defaults_apply_without_modifiers() {
        let f = Filter::from_query(&HashMap::new(), &config()).unwrap();
        assert!(f.clauses().is_empty());
        assert_eq!(f.selected(), None);
        assert_eq!(f.order_info()[0].column, "createdAt");
        assert_eq!(f.order_info()[0].sort, SortDirection::Desc);
        assert_eq!(f.page_window(), Some(PageWindow { page: 1, limit: 20 }));
    }

    #[test]
    fn blank_sort_keeps_default_order() {
        let f = Filter::from_query(&query(&[("sort", " ")]), &config()).unwrap();
        assert_eq!(f.order_info()[0].column, "createdAt");
        assert_eq!(f.order_info()[0].sort, SortDirection::Desc);
        let f = Filter::from_query(&query(&[("sort", "")]), &config()).unwrap();
        assert_eq!(f.order_info().len(), 1);
    }

    #[test]
    fn malformed_paging_falls_back_to_defaults() {
        let f = Filter::from_query(&query(&[("page", "abc"), ("limit", "-3")]), &config()).unwrap();
        assert_eq!(f.page_window(), Some(PageWindow { page: 1, limit: 20 }));
        let f = Filter::from_query(&query(&[("page", "0"), ("limit", "0")]), &config()).unwrap();
        assert_eq!(f.page_window(), Some(PageWindow { page: 1, limit: 20 }));
    }

    #[test]
    fn limit_is_capped() {
        let f = Filter::from_query(&query(&[("limit", "5000")]), &config()).unwrap();
        assert_eq!(f.page_window().unwrap().limit, 100);
    }

    #[test]
    fn clause_order_ignores_key_order() {
        let a = Filter::from_query(&query(&[("a", "1"), ("b[gt]", "2")]), &config()).unwrap();
        let b = Filter::from_query(&query(&[("b[gt]", "2"), ("a", "1")]), &config()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn projection_keeps_id() {
        let f = Filter::from_query(&query(&[("select", "name,description")]), &config()).unwrap();
        let doc = json!({"id": "x", "name": "n", "description": "d", "phone": "p"});
        let projected = f.project(doc.as_object().cloned().unwrap());
        assert_eq!(Value::Object(projected), json!({"id": "x", "name": "n", "description": "d"}));
    }

    #[test]
    fn hidden_fields_cannot_be_queried() {
        let f = Filter::from_query(&query(&[("password[gt]", "a")]), &config()).unwrap();
        assert_eq!(
            f.reject_fields(&["password"]),
            Err(FilterError::HiddenField("password".to_string()))
        );
        let f = Filter::from_query(&query(&[("sort", "-password")]), &config()).unwrap();
        assert!(f.reject_fields(&["password"]).is_err());
    }

    #[test]
    fn sql_includes_window() {
        let f = Filter::from_query(&query(&[("page", "3"), ("limit", "10")]), &config()).unwrap();
        let sql = f.to_sql("bootcamps").unwrap();
        assert_eq!(
            sql.query,
            "SELECT \"doc\" FROM \"bootcamps\" WHERE 1=1 ORDER BY \"doc\"->'createdAt' DESC NULLS LAST, \"doc\"->'id' ASC LIMIT 10 OFFSET 20"
        );
        let count = f.to_count_sql("bootcamps").unwrap();
        assert_eq!(count.query, "SELECT COUNT(*) AS count FROM \"bootcamps\" WHERE 1=1");
    }

    #[test]
    fn invalid_table_names_are_rejected() {
        assert!(Filter::new().to_sql("boot camps").is_err());
        assert!(Filter::new().to_sql("").is_err());
    }
}
