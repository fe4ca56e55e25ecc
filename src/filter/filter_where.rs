use serde_json::{json, Map, Number, Value};
use std::cmp::Ordering;

use super::error::FilterError;
use super::types::{FilterClause, FilterOp, SqlParam};

/// Builds, evaluates and renders the WHERE part of a [`super::Filter`].
pub struct FilterWhere {
    param_values: Vec<SqlParam>,
    param_index: usize,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_index: starting_param_index,
        }
    }

    /// Parse one query-string pair into a typed clause.
    ///
    /// `tuition[lte]=10000` becomes `LessOrEqual(10000)`, `careers[in]=A,B`
    /// becomes `OneOf(["A","B"])` and a bare `housing=true` is `Equals`.
    /// The operator is only ever read from the bracket suffix of the key.
    pub fn parse(key: &str, raw: &str) -> Result<FilterClause, FilterError> {
        let (field, op) = match key.split_once('[') {
            Some((field, rest)) => {
                let token = rest
                    .strip_suffix(']')
                    .ok_or_else(|| FilterError::UnsupportedOperator(key.to_string()))?;
                let op = FilterOp::from_token(token)
                    .ok_or_else(|| FilterError::UnsupportedOperator(token.to_string()))?;
                (field, op)
            }
            None => (key, FilterOp::Equals),
        };
        Self::validate_field(field)?;

        let value = match op {
            // Equality keeps the raw text so "02118" still matches a stored "02118"
            FilterOp::Equals => Value::String(raw.to_string()),
            FilterOp::OneOf => Value::Array(
                raw.split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(|item| Value::String(item.to_string()))
                    .collect(),
            ),
            _ => typed_value(raw),
        };

        Ok(FilterClause::new(field, op, value))
    }

    /// Field names are dotted paths of identifier segments.
    pub fn validate_field(field: &str) -> Result<(), FilterError> {
        if field.is_empty() || !field.split('.').all(is_identifier) {
            return Err(FilterError::InvalidColumn(field.to_string()));
        }
        Ok(())
    }

    /// True when the document satisfies every clause.
    pub fn matches(document: &Map<String, Value>, clauses: &[FilterClause]) -> bool {
        clauses.iter().all(|clause| Self::matches_clause(document, clause))
    }

    fn matches_clause(document: &Map<String, Value>, clause: &FilterClause) -> bool {
        let Some(actual) = lookup(document, &clause.field) else {
            return false;
        };
        if actual.is_null() {
            return false;
        }

        match clause.op {
            FilterOp::Equals => text_eq(actual, &clause.value),
            FilterOp::OneOf => match &clause.value {
                Value::Array(options) => options.iter().any(|option| text_eq(actual, option)),
                other => text_eq(actual, other),
            },
            op => match compare_typed(actual, &clause.value) {
                Some(ordering) => match op {
                    FilterOp::GreaterThan => ordering == Ordering::Greater,
                    FilterOp::GreaterOrEqual => ordering != Ordering::Less,
                    FilterOp::LessThan => ordering == Ordering::Less,
                    FilterOp::LessOrEqual => ordering != Ordering::Greater,
                    FilterOp::Equals | FilterOp::OneOf => false,
                },
                None => false,
            },
        }
    }

    /// Render clauses as a SQL predicate over the `doc` jsonb column.
    pub fn generate(clauses: &[FilterClause], starting_param_index: usize) -> (String, Vec<SqlParam>) {
        let mut filter_where = Self::new(starting_param_index);
        let conditions: Vec<String> = clauses
            .iter()
            .map(|clause| filter_where.build_sql_condition(clause))
            .collect();
        let where_clause = if conditions.is_empty() {
            "1=1".to_string()
        } else {
            conditions.join(" AND ")
        };
        (where_clause, filter_where.param_values)
    }

    fn build_sql_condition(&mut self, clause: &FilterClause) -> String {
        match clause.op {
            FilterOp::Equals => self.equals_sql(&clause.field, &clause.value),
            FilterOp::OneOf => {
                let options = match &clause.value {
                    Value::Array(options) => options.clone(),
                    other => vec![other.clone()],
                };
                if options.is_empty() {
                    return "1=0".to_string();
                }
                let parts: Vec<String> = options
                    .iter()
                    .map(|option| self.equals_sql(&clause.field, option))
                    .collect();
                format!("({})", parts.join(" OR "))
            }
            op => {
                let comparison = op.to_sql().unwrap_or("=");
                let accessor = json_accessor(&clause.field);
                let type_param = self.param(SqlParam::Json(clause.value.clone()));
                let value_param = self.param(SqlParam::Json(clause.value.clone()));
                format!(
                    "(jsonb_typeof({accessor}) = jsonb_typeof({type_param}) AND {accessor} {comparison} {value_param})"
                )
            }
        }
    }

    /// Scalar text equality, or membership when the stored field is an array.
    /// Numeric query text also matches stored numbers by value, so `7` finds `7.0`.
    fn equals_sql(&mut self, field: &str, value: &Value) -> String {
        let text = value_text(value).unwrap_or_default();
        let text_param = self.param(SqlParam::Text(text.clone()));
        let contains_param = self.param(SqlParam::Json(json!([text])));
        let accessor = json_accessor(field);
        let mut condition = format!(
            "({} = {} OR {} @> {}",
            text_accessor(field),
            text_param,
            accessor,
            contains_param
        );
        if let Some(number) = numeric(value) {
            let number_param = self.param(SqlParam::Json(Value::Number(number)));
            condition.push_str(&format!(
                " OR (jsonb_typeof({accessor}) = 'number' AND {accessor} = {number_param})"
            ));
        }
        condition.push(')');
        condition
    }

    fn param(&mut self, value: SqlParam) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}", self.param_index)
    }
}

/// Interpret query text as the JSON scalar it spells.
pub fn typed_value(raw: &str) -> Value {
    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Value::from(i);
    }
    if let Some(n) = raw
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .and_then(Number::from_f64)
    {
        return Value::Number(n);
    }
    Value::String(raw.to_string())
}

/// Follow a dotted path into a document.
pub fn lookup<'a>(document: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Query text that spells a number, as that number.
fn numeric(value: &Value) -> Option<Number> {
    match value {
        Value::Number(n) => Some(n.clone()),
        Value::String(s) => match typed_value(s) {
            Value::Number(n) => Some(n),
            _ => None,
        },
        _ => None,
    }
}

fn text_eq(actual: &Value, expected: &Value) -> bool {
    if let Value::Array(items) = actual {
        return items.iter().any(|item| text_eq(item, expected));
    }
    if let (Value::Number(a), Some(b)) = (actual, numeric(expected)) {
        return a.as_f64() == b.as_f64();
    }
    match (value_text(actual), value_text(expected)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Same-typed comparison; numbers numerically, strings lexically.
fn compare_typed(actual: &Value, bound: &Value) -> Option<Ordering> {
    match (actual, bound) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

pub(crate) fn json_accessor(field: &str) -> String {
    if field.contains('.') {
        format!("\"doc\"#>'{{{}}}'", field.replace('.', ","))
    } else {
        format!("\"doc\"->'{}'", field)
    }
}

fn text_accessor(field: &str) -> String {
    if field.contains('.') {
        format!("\"doc\"#>>'{{{}}}'", field.replace('.', ","))
    } else {
        format!("\"doc\"->>'{}'", field)
    }
}
