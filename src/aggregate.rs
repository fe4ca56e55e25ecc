use serde_json::{Map, Number, Value};
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::store::{Collection, RecordStore};
use crate::filter::Filter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    None,
    /// Round up to the next multiple of ten, stored as an integer.
    CeilToTen,
}

/// A derived field on a parent that summarizes one field of its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateRule {
    pub child: Collection,
    pub relation: &'static str,
    pub source: &'static str,
    pub parent: Collection,
    pub target: &'static str,
    pub rounding: Rounding,
}

impl AggregateRule {
    pub const AVERAGE_COST: AggregateRule = AggregateRule {
        child: Collection::Courses,
        relation: "bootcamp",
        source: "tuition",
        parent: Collection::Bootcamps,
        target: "averageCost",
        rounding: Rounding::CeilToTen,
    };

    pub const AVERAGE_RATING: AggregateRule = AggregateRule {
        child: Collection::Reviews,
        relation: "bootcamp",
        source: "rating",
        parent: Collection::Bootcamps,
        target: "averageRating",
        rounding: Rounding::None,
    };

    pub const ALL: [AggregateRule; 2] = [Self::AVERAGE_COST, Self::AVERAGE_RATING];

    /// Target value for the given source values; `None` clears the field.
    pub fn summarize(&self, values: &[f64]) -> Option<Value> {
        if values.is_empty() {
            return None;
        }
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        match self.rounding {
            Rounding::CeilToTen => Some(Value::from(((mean / 10.0).ceil() * 10.0) as i64)),
            Rounding::None => Number::from_f64(mean).map(Value::Number),
        }
    }
}

/// Recomputes parent aggregates after child writes.
#[derive(Clone)]
pub struct AggregateMaintainer {
    store: Arc<dyn RecordStore>,
}

impl AggregateMaintainer {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Rewrite `rule.target` on the parent from the current children.
    ///
    /// The parent update goes straight to the store so it never triggers
    /// another recomputation.
    pub async fn recompute(&self, rule: &AggregateRule, parent_id: Uuid) -> Result<Option<Value>, DatabaseError> {
        let filter = Filter::new().where_eq(rule.relation, parent_id.to_string());
        let children = self.store.find(rule.child, &filter).await?;
        let values: Vec<f64> = children
            .iter()
            .filter_map(|child| child.get(rule.source).and_then(Value::as_f64))
            .collect();

        let summary = rule.summarize(&values);
        let mut changes = Map::new();
        changes.insert(rule.target.to_string(), summary.clone().unwrap_or(Value::Null));
        self.store.update_by_id(rule.parent, parent_id, changes).await?;

        debug!(
            parent = %parent_id,
            target = rule.target,
            children = values.len(),
            "recomputed aggregate"
        );
        Ok(summary)
    }

    /// Recompute and log failures instead of returning them; the triggering
    /// write has already committed.
    pub async fn refresh(&self, rule: &AggregateRule, parent_id: Uuid) {
        if let Err(e) = self.recompute(rule, parent_id).await {
            error!(
                parent = %parent_id,
                target = rule.target,
                "aggregate recomputation failed: {}",
                e
            );
        }
    }
}
