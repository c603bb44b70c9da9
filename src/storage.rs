//! Document collections used by the functions and seed loaders.
//! The managed database sits behind `DocumentStore`; `MemoryStore` is the in-process backend.

use std::collections::{BTreeMap, HashMap};
use futures_util::future::{BoxFuture, FutureExt};
use parking_lot::RwLock;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("document store unavailable: {0}")]
    Unavailable(String),
    #[error("invalid document: {0}")]
    InvalidDocument(String),
}

pub trait DocumentStore: Send + Sync {
    /// Create or overwrite the document `id` in `collection`.
    fn set<'a>(&'a self, collection: &'a str, id: &'a str, doc: Value) -> BoxFuture<'a, Result<(), StoreError>>;
    fn get<'a>(&'a self, collection: &'a str, id: &'a str) -> BoxFuture<'a, Result<Option<Value>, StoreError>>;
    /// Number of documents in `collection`; unknown collections count as empty.
    fn count<'a>(&'a self, collection: &'a str) -> BoxFuture<'a, Result<u64, StoreError>>;
}

#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Value>>>,
    outage: RwLock<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    pub fn set_unavailable(&self, reason: Option<String>) { *self.outage.write() = reason; }

    fn check(&self) -> Result<(), StoreError> {
        match self.outage.read().clone() {
            Some(reason) => Err(StoreError::Unavailable(reason)),
            None => Ok(()),
        }
    }

    fn set_now(&self, collection: &str, id: &str, doc: Value) -> Result<(), StoreError> {
        self.check()?;
        if !doc.is_object() {
            return Err(StoreError::InvalidDocument(format!("{}/{} is not an object", collection, id)));
        }
        self.collections.write().entry(collection.to_string()).or_default().insert(id.to_string(), doc);
        Ok(())
    }

    fn get_now(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        self.check()?;
        Ok(self.collections.read().get(collection).and_then(|c| c.get(id)).cloned())
    }

    fn count_now(&self, collection: &str) -> Result<u64, StoreError> {
        self.check()?;
        Ok(self.collections.read().get(collection).map(|c| c.len() as u64).unwrap_or(0))
    }
}

impl DocumentStore for MemoryStore {
    fn set<'a>(&'a self, collection: &'a str, id: &'a str, doc: Value) -> BoxFuture<'a, Result<(), StoreError>> {
        futures_util::future::ready(self.set_now(collection, id, doc)).boxed()
    }

    fn get<'a>(&'a self, collection: &'a str, id: &'a str) -> BoxFuture<'a, Result<Option<Value>, StoreError>> {
        futures_util::future::ready(self.get_now(collection, id)).boxed()
    }

    fn count<'a>(&'a self, collection: &'a str) -> BoxFuture<'a, Result<u64, StoreError>> {
        futures_util::future::ready(self.count_now(collection)).boxed()
    }
}
