//! SQLite document backend — connection pool, migrations and queries.

use std::str::FromStr;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    QueryBuilder, Sqlite, SqlitePool,
};
use tracing::info;

use crate::errors::Result;
use crate::store::{Document, DocumentStore, Filter, Limit};

/// Establish a SQLite connection pool and run pending migrations.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool> {
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };

    // Make sure the file is created if it doesn't exist yet.
    let options = SqliteConnectOptions::from_str(&url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied successfully");
    Ok(pool)
}

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        Ok(Self {
            pool: init_pool(database_url).await?,
        })
    }

    /// A private in-memory database. Limited to one connection that is never
    /// recycled, since every SQLite memory connection is its own database.
    #[cfg(test)]
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn insert(&self, kind: &str, fields: Map<String, Value>) -> Result<String> {
        let body = Value::Object(fields).to_string();
        let (id,): (String,) =
            sqlx::query_as("INSERT INTO documents (kind, body) VALUES (?1, ?2) RETURNING id")
                .bind(kind)
                .bind(body)
                .fetch_one(&self.pool)
                .await?;
        Ok(id)
    }

    async fn query(&self, kind: &str, filter: &Filter, limit: Limit) -> Result<Vec<Document>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT id, body FROM documents WHERE kind = ");
        qb.push_bind(kind);

        // `IS` so that a null filter value also matches an absent field.
        for (key, value) in filter {
            qb.push(" AND json_extract(body, ")
                .push_bind(json_path(key))
                .push(") IS json_extract(")
                .push_bind(value.to_string())
                .push(", '$')");
        }

        qb.push(" ORDER BY seq");
        if let Limit::Bounded(n) = limit {
            qb.push(" LIMIT ").push_bind(i64::from(n));
        }

        let rows = qb
            .build_query_as::<(String, String)>()
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|(id, body)| Document::from_body(id, &body))
            .collect()
    }

    async fn collections(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT DISTINCT kind FROM documents ORDER BY kind")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(kind,)| kind).collect())
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("Database pool closed");
    }
}

/// JSON path selecting the top-level member `key`.
fn json_path(key: &str) -> String {
    format!("$.\"{}\"", key.replace('"', "\\\""))
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
