//! Document store facade.
//!
//! Records are persisted as JSON documents grouped into collections named
//! after their kind. The store generates each document's id; everything else
//! in a document is the record's own fields plus creation timestamps.
//!
//! Two backends implement [`DocumentStore`]:
//!
//! * [`crate::db::SqliteStore`] — a `documents` table in SQLite.
//! * [`crate::memory::MemoryStore`] — process-local, for tests and throwaway runs.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::db::SqliteStore;
use crate::errors::{FundraiserError, Result};
use crate::memory::MemoryStore;
use crate::schema::Record;

/// Top-level field equality constraints. An empty filter matches everything.
pub type Filter = Map<String, Value>;

/// How many documents a query may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    Bounded(u32),
    /// Return the full matching set.
    Unbounded,
}

impl Limit {
    /// Resolve a `?limit=` query parameter. `0` means "no limit".
    pub fn from_request(requested: Option<u32>, default: u32) -> Self {
        match requested.unwrap_or(default) {
            0 => Self::Unbounded,
            n => Self::Bounded(n),
        }
    }

    pub fn as_usize(&self) -> Option<usize> {
        match self {
            Self::Bounded(n) => Some(*n as usize),
            Self::Unbounded => None,
        }
    }
}

/// A stored document: its generated id alongside the original fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Document {
    /// Rebuild a document from its id and stored JSON body.
    pub fn from_body(id: String, body: &str) -> Result<Self> {
        match serde_json::from_str::<Value>(body)? {
            Value::Object(fields) => Ok(Self { id, fields }),
            other => Err(FundraiserError::CorruptDocument {
                id,
                reason: format!("expected a JSON object, found {other}"),
            }),
        }
    }

    /// True when every filter entry equals the corresponding field.
    pub fn matches(&self, filter: &Filter) -> bool {
        filter
            .iter()
            .all(|(key, want)| self.fields.get(key).unwrap_or(&Value::Null) == want)
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persist `fields` under collection `kind`, returning the generated id.
    async fn insert(&self, kind: &str, fields: Map<String, Value>) -> Result<String>;

    /// Up to `limit` documents of `kind` matching `filter`, in store order.
    async fn query(&self, kind: &str, filter: &Filter, limit: Limit) -> Result<Vec<Document>>;

    /// Names of the collections currently holding documents.
    async fn collections(&self) -> Result<Vec<String>>;

    /// Release any held resources. Called once on shutdown.
    async fn close(&self) {}
}

/// Serialize a validated record, stamp creation timestamps and store it.
pub async fn create_document<R: Record>(store: &dyn DocumentStore, record: &R) -> Result<String> {
    let mut fields = match serde_json::to_value(record)? {
        Value::Object(fields) => fields,
        other => {
            return Err(FundraiserError::CorruptDocument {
                id: String::new(),
                reason: format!("{} did not serialize to an object: {other}", R::KIND),
            })
        }
    };

    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    fields.insert("created_at".to_string(), Value::String(now.clone()));
    fields.insert("updated_at".to_string(), Value::String(now));

    let id = store.insert(R::KIND, fields).await?;
    info!("Stored {} document {id}", R::KIND);
    Ok(id)
}

/// Fetch up to `limit` documents of record kind `R`.
pub async fn get_documents<R: Record>(
    store: &dyn DocumentStore,
    filter: &Filter,
    limit: Limit,
) -> Result<Vec<Document>> {
    store.query(R::KIND, filter, limit).await
}

// ─────────────────────────────────────────────────────────
// Store handle
// ─────────────────────────────────────────────────────────

/// The store handle injected into request handling. Empty when no backend
/// was configured or the backend could not be reached at startup.
#[derive(Clone, Default)]
pub struct Storage {
    inner: Option<Arc<dyn DocumentStore>>,
}

impl Storage {
    pub fn new(store: impl DocumentStore + 'static) -> Self {
        Self {
            inner: Some(Arc::new(store)),
        }
    }

    pub fn uninitialized() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Result<&dyn DocumentStore> {
        self.inner.as_deref().ok_or(FundraiserError::NotInitialized)
    }

    /// Open the backend named by `DATABASE_URL`.
    ///
    /// * unset → no backend
    /// * `memory` → [`MemoryStore`]
    /// * anything else → SQLite at that URL/path
    ///
    /// A backend that fails to open is logged and left out, so the service
    /// still starts and reports the failure on its diagnostic endpoint.
    pub async fn open(config: &Config) -> Self {
        match config.database_url.as_deref() {
            None => {
                warn!("DATABASE_URL not set — running without a document store");
                Self::uninitialized()
            }
            Some("memory") => {
                info!("Using in-memory document store");
                Self::new(MemoryStore::default())
            }
            Some(url) => match SqliteStore::connect(url).await {
                Ok(store) => Self::new(store),
                Err(e) => {
                    error!("Failed to open document store: {e}");
                    Self::uninitialized()
                }
            },
        }
    }

    pub async fn close(&self) {
        if let Some(store) = &self.inner {
            store.close().await;
        }
    }
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
