use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comparison operator of a single filter clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FilterOp {
    Equals,
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
    OneOf,
}

impl FilterOp {
    /// Map the bracket token of a `field[op]` query key.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "gt" => Some(FilterOp::GreaterThan),
            "gte" => Some(FilterOp::GreaterOrEqual),
            "lt" => Some(FilterOp::LessThan),
            "lte" => Some(FilterOp::LessOrEqual),
            "in" => Some(FilterOp::OneOf),
            _ => None,
        }
    }

    /// SQL comparison for the range operators.
    pub fn to_sql(&self) -> Option<&'static str> {
        match self {
            FilterOp::GreaterThan => Some(">"),
            FilterOp::GreaterOrEqual => Some(">="),
            FilterOp::LessThan => Some("<"),
            FilterOp::LessOrEqual => Some("<="),
            FilterOp::Equals | FilterOp::OneOf => None,
        }
    }
}

/// One typed predicate over a record field. `OneOf` carries an array value.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterClause {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl FilterClause {
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            // Missing keys first when ascending, last when descending
            SortDirection::Asc => "ASC NULLS FIRST",
            SortDirection::Desc => "DESC NULLS LAST",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterOrderInfo {
    pub column: String,
    pub sort: SortDirection,
}

/// 1-based page window over a sorted result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: u32,
    pub limit: u32,
}

impl PageWindow {
    pub fn skip(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }

    /// Links to the neighbouring pages given the unpaginated match count.
    pub fn pagination(&self, total: u64) -> Pagination {
        let end = u64::from(self.page) * u64::from(self.limit);
        Pagination {
            next: (end < total).then(|| PageLink {
                page: self.page + 1,
                limit: self.limit,
            }),
            prev: (self.page > 1).then(|| PageLink {
                page: self.page - 1,
                limit: self.limit,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLink {
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageLink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageLink>,
}

/// Bound parameter of a generated SQL statement.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    Json(Value),
}

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<SqlParam>,
}
