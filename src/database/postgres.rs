use async_trait::async_trait;
use serde_json::Value;
use sqlx::{postgres::PgArguments, PgPool, Postgres, Row};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::store::{prepare_insert, Collection, Document, RecordStore};
use crate::filter::{Filter, SqlParam};

/// Postgres store keeping each record as a jsonb document.
pub struct PgStore {
    pool: PgPool,
    log_queries: bool,
}

impl PgStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let pool = DatabaseManager::connect(config).await?;
        let store = Self {
            pool,
            log_queries: config.enable_query_logging,
        };
        store.migrate().await?;
        Ok(store)
    }

    /// Create tables and unique indexes when missing.
    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        for collection in Collection::ALL {
            let table = collection.table_name();
            sqlx::query(&format!(
                "CREATE TABLE IF NOT EXISTS \"{table}\" (\
                 id uuid PRIMARY KEY, \
                 doc jsonb NOT NULL, \
                 created_at timestamptz NOT NULL DEFAULT now())"
            ))
            .execute(&self.pool)
            .await?;

            for fields in collection.unique_keys() {
                let expressions: Vec<String> = fields.iter().map(|f| format!("(doc->>'{f}')")).collect();
                sqlx::query(&format!(
                    "CREATE UNIQUE INDEX IF NOT EXISTS \"{table}_{}_key\" ON \"{table}\" ({})",
                    fields.join("_"),
                    expressions.join(", ")
                ))
                .execute(&self.pool)
                .await?;
            }
        }
        info!("Database schema ready");
        Ok(())
    }

    fn log(&self, sql: &str) {
        if self.log_queries {
            debug!(sql, "executing query");
        }
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn find(&self, collection: Collection, filter: &Filter) -> Result<Vec<Document>, DatabaseError> {
        let sql = filter.to_sql(collection.table_name())?;
        self.log(&sql.query);

        let mut query = sqlx::query(&sql.query);
        for param in &sql.params {
            query = bind_param(query, param);
        }
        let rows = query.fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| -> Result<Document, DatabaseError> {
                let doc: Value = row.try_get("doc")?;
                Ok(filter.project(into_document(doc)?))
            })
            .collect()
    }

    async fn count(&self, collection: Collection, filter: &Filter) -> Result<u64, DatabaseError> {
        let sql = filter.to_count_sql(collection.table_name())?;
        self.log(&sql.query);

        let mut query = sqlx::query(&sql.query);
        for param in &sql.params {
            query = bind_param(query, param);
        }
        let row = query.fetch_one(&self.pool).await?;
        let count: i64 = row.try_get("count")?;
        Ok(count.max(0) as u64)
    }

    async fn find_by_id(&self, collection: Collection, id: Uuid) -> Result<Option<Document>, DatabaseError> {
        let sql = format!("SELECT doc FROM \"{}\" WHERE id = $1", collection.table_name());
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        match row {
            Some(row) => Ok(Some(into_document(row.try_get("doc")?)?)),
            None => Ok(None),
        }
    }

    async fn create(&self, collection: Collection, document: Document) -> Result<Document, DatabaseError> {
        let (id, document) = prepare_insert(document)?;
        let sql = format!(
            "INSERT INTO \"{}\" (id, doc) VALUES ($1, $2)",
            collection.table_name()
        );
        sqlx::query(&sql)
            .bind(id)
            .bind(Value::Object(document.clone()))
            .execute(&self.pool)
            .await
            .map_err(map_unique_violation)?;
        Ok(document)
    }

    async fn update_by_id(
        &self,
        collection: Collection,
        id: Uuid,
        changes: Document,
    ) -> Result<Document, DatabaseError> {
        let mut set = Document::new();
        let mut unset: Vec<String> = Vec::new();
        for (key, value) in changes {
            if key == "id" || key == "createdAt" {
                continue;
            }
            if value.is_null() {
                unset.push(key);
            } else {
                set.insert(key, value);
            }
        }

        let sql = format!(
            "UPDATE \"{}\" SET doc = (doc || $2) - $3::text[] WHERE id = $1 RETURNING doc",
            collection.table_name()
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(Value::Object(set))
            .bind(unset)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_unique_violation)?
            .ok_or_else(|| DatabaseError::NotFound(format!("{} {}", collection.label(), id)))?;
        into_document(row.try_get("doc")?)
    }

    async fn delete_by_id(&self, collection: Collection, id: Uuid) -> Result<bool, DatabaseError> {
        let sql = format!("DELETE FROM \"{}\" WHERE id = $1", collection.table_name());
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_all(&self, collection: Collection) -> Result<u64, DatabaseError> {
        let sql = format!("DELETE FROM \"{}\"", collection.table_name());
        let result = sqlx::query(&sql).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}

fn bind_param<'q>(
    query: sqlx::query::Query<'q, Postgres, PgArguments>,
    param: &'q SqlParam,
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    match param {
        SqlParam::Text(text) => query.bind(text.as_str()),
        SqlParam::Json(value) => query.bind(value),
    }
}

fn into_document(value: Value) -> Result<Document, DatabaseError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(DatabaseError::Corrupt(format!("expected object, found {}", other))),
    }
}

fn map_unique_violation(err: sqlx::Error) -> DatabaseError {
    if let sqlx::Error::Database(db) = &err {
        if db.code().as_deref() == Some("23505") {
            let constraint = db.constraint().unwrap_or("value");
            let fields = constraint
                .split_once('_')
                .map(|(_, rest)| rest.trim_end_matches("_key"))
                .unwrap_or(constraint);
            return DatabaseError::Duplicate(fields.replace('_', ","));
        }
    }
    DatabaseError::Sqlx(err)
}
