use serde_json::{Map, Value};
use std::cmp::Ordering;

use super::error::FilterError;
use super::filter_where::{json_accessor, lookup, FilterWhere};
use super::types::{FilterOrderInfo, SortDirection};

/// Final sort key, so equal keys still page deterministically.
const TIE_BREAK: &str = "id";

pub struct FilterOrder;

impl FilterOrder {
    /// Parse `-rating,name` into `[rating DESC, name ASC]`.
    pub fn parse(spec: &str) -> Result<Vec<FilterOrderInfo>, FilterError> {
        let mut out = Vec::new();
        for part in spec.split(',') {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                continue;
            }
            let (column, sort) = match trimmed.strip_prefix('-') {
                Some(column) => (column, SortDirection::Desc),
                None => (trimmed.strip_prefix('+').unwrap_or(trimmed), SortDirection::Asc),
            };
            FilterWhere::validate_field(column)?;
            out.push(FilterOrderInfo { column: column.to_string(), sort });
        }
        Ok(out)
    }

    pub fn generate(infos: &[FilterOrderInfo]) -> String {
        if infos.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = infos
            .iter()
            .map(|i| format!("{} {}", json_accessor(&i.column), i.sort.to_sql()))
            .chain(std::iter::once(format!("{} ASC", json_accessor(TIE_BREAK))))
            .collect();
        format!("ORDER BY {}", parts.join(", "))
    }

    /// Stable in-place sort with left-to-right tie-breaking.
    pub fn sort(documents: &mut [Map<String, Value>], infos: &[FilterOrderInfo]) {
        if infos.is_empty() {
            return;
        }
        documents.sort_by(|a, b| {
            for info in infos {
                let ordering = compare_values(lookup(a, &info.column), lookup(b, &info.column));
                let ordering = match info.sort {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            compare_values(lookup(a, TIE_BREAK), lookup(b, TIE_BREAK))
        });
    }
}

/// Missing < null < bool < number < string < array < object.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a_val), Some(b_val)) => {
            let type_order = |v: &Value| -> u8 {
                match v {
                    Value::Null => 0,
                    Value::Bool(_) => 1,
                    Value::Number(_) => 2,
                    Value::String(_) => 3,
                    Value::Array(_) => 4,
                    Value::Object(_) => 5,
                }
            };

            let a_type = type_order(a_val);
            let b_type = type_order(b_val);
            if a_type != b_type {
                return a_type.cmp(&b_type);
            }

            match (a_val, b_val) {
                (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
                (Value::Number(x), Value::Number(y)) => {
                    let x = x.as_f64().unwrap_or(0.0);
                    let y = y.as_f64().unwrap_or(0.0);
                    x.partial_cmp(&y).unwrap_or(Ordering::Equal)
                }
                (Value::String(x), Value::String(y)) => x.cmp(y),
                _ => Ordering::Equal,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn docs(values: Vec<Value>) -> Vec<Map<String, Value>> {
        values.into_iter().filter_map(|v| v.as_object().cloned()).collect()
    }

    #[test]
    fn parses_direction_prefixes() {
        let infos = FilterOrder::parse("-rating, name").unwrap();
        assert_eq!(
            infos,
            vec![
                FilterOrderInfo { column: "rating".into(), sort: SortDirection::Desc },
                FilterOrderInfo { column: "name".into(), sort: SortDirection::Asc },
            ]
        );
    }

    #[test]
    fn rejects_invalid_sort_fields() {
        assert!(FilterOrder::parse("-name;drop").is_err());
    }

    #[test]
    fn sorts_descending_with_ascending_tiebreak() {
        let mut d = docs(vec![
            json!({"name": "b", "rating": 8}),
            json!({"name": "c", "rating": 9}),
            json!({"name": "a", "rating": 8}),
        ]);
        FilterOrder::sort(&mut d, &FilterOrder::parse("-rating,name").unwrap());
        let names: Vec<&str> = d.iter().map(|r| r["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[test]
    fn missing_values_sort_first_ascending() {
        let mut d = docs(vec![json!({"name": "x", "rating": 3}), json!({"name": "y"})]);
        FilterOrder::sort(&mut d, &FilterOrder::parse("rating").unwrap());
        assert_eq!(d[0]["name"], json!("y"));
    }

    #[test]
    fn ties_fall_back_to_id() {
        let mut d = docs(vec![
            json!({"id": "c", "housing": true}),
            json!({"id": "a", "housing": true}),
            json!({"id": "b", "housing": true}),
        ]);
        FilterOrder::sort(&mut d, &FilterOrder::parse("-housing").unwrap());
        let ids: Vec<&str> = d.iter().map(|r| r["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn generates_order_by() {
        let sql = FilterOrder::generate(&FilterOrder::parse("-createdAt,name").unwrap());
        assert_eq!(
            sql,
            "ORDER BY \"doc\"->'createdAt' DESC NULLS LAST, \"doc\"->'name' ASC NULLS FIRST, \"doc\"->'id' ASC"
        );
    }
}
