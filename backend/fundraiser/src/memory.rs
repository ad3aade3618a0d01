use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::errors::Result;
use crate::store::{Document, DocumentStore, Filter, Limit};

/// Process-local document store. Documents keep insertion order per
/// collection; ids are 24 hex digits from a per-store counter.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<BTreeMap<String, Vec<Document>>>,
    next_id: AtomicU64,
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, kind: &str, fields: Map<String, Value>) -> Result<String> {
        let seq = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let id = format!("{seq:024x}");
        self.collections
            .write()
            .await
            .entry(kind.to_string())
            .or_default()
            .push(Document {
                id: id.clone(),
                fields,
            });
        Ok(id)
    }

    async fn query(&self, kind: &str, filter: &Filter, limit: Limit) -> Result<Vec<Document>> {
        let collections = self.collections.read().await;
        let Some(docs) = collections.get(kind) else {
            return Ok(Vec::new());
        };
        let matching = docs.iter().filter(|d| d.matches(filter)).cloned();
        Ok(match limit.as_usize() {
            Some(n) => matching.take(n).collect(),
            None => matching.collect(),
        })
    }

    async fn collections(&self) -> Result<Vec<String>> {
        Ok(self.collections.read().await.keys().cloned().collect())
    }
}
