//! In-memory ordered store and blob store.
//!
//! Every handle derived from one `MemoryStore` shares the same tables, so a
//! test can seed through one handle and read through another.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::domain::{ListRange, StoreEntry, StoreError};
use crate::ports::{BlobStore, StoreHandle};

type Table = BTreeMap<String, serde_json::Value>;

#[derive(Default)]
struct Shared {
    tables: RwLock<HashMap<String, Table>>,
    should_fail: AtomicBool,
}

/// In-memory ordered key-value store with nested namespaces.
#[derive(Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Shared>,
    path: String,
}

impl MemoryStore {
    /// Empty store, positioned at its root namespace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Concrete handle to a nested namespace (`a/b` nests twice).
    pub fn namespace(&self, path: &str) -> MemoryStore {
        let path = path
            .split('/')
            .filter(|s| !s.is_empty())
            .fold(self.path.clone(), |acc, segment| {
                if acc.is_empty() {
                    segment.to_string()
                } else {
                    format!("{acc}/{segment}")
                }
            });
        MemoryStore {
            shared: Arc::clone(&self.shared),
            path,
        }
    }

    /// Write a value into this namespace.
    pub fn put(&self, key: impl Into<String>, value: serde_json::Value) {
        self.shared
            .tables
            .write()
            .entry(self.path.clone())
            .or_default()
            .insert(key.into(), value);
    }

    /// Number of keys in this namespace.
    pub fn len(&self) -> usize {
        self.shared
            .tables
            .read()
            .get(&self.path)
            .map_or(0, BTreeMap::len)
    }

    /// True when this namespace holds nothing.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make every read through any handle of this store fail.
    pub fn set_failing(&self, fail: bool) {
        self.shared.should_fail.store(fail, Ordering::SeqCst);
    }

    fn check_failing(&self) -> Result<(), StoreError> {
        if self.shared.should_fail.load(Ordering::SeqCst) {
            return Err(StoreError::Io(format!("injected failure at '{}'", self.path)));
        }
        Ok(())
    }
}

#[async_trait]
impl StoreHandle for MemoryStore {
    fn sub(&self, namespace: &str) -> Arc<dyn StoreHandle> {
        Arc::new(self.namespace(namespace))
    }

    async fn get(&self, key: &str) -> Result<Option<StoreEntry>, StoreError> {
        self.check_failing()?;
        let tables = self.shared.tables.read();
        Ok(tables
            .get(&self.path)
            .and_then(|t| t.get(key))
            .map(|value| StoreEntry::new(key, value.clone())))
    }

    async fn list(&self, range: ListRange) -> Result<Vec<StoreEntry>, StoreError> {
        self.check_failing()?;
        if let (Some(gt), Some(lt)) = (&range.gt, &range.lt) {
            if gt >= lt {
                return Ok(Vec::new());
            }
        }

        let tables = self.shared.tables.read();
        let Some(table) = tables.get(&self.path) else {
            return Ok(Vec::new());
        };

        let lower = range.gt.as_deref().map_or(Bound::Unbounded, Bound::Excluded);
        let upper = range.lt.as_deref().map_or(Bound::Unbounded, Bound::Excluded);
        let limit = range.limit.unwrap_or(usize::MAX);
        let iter = table
            .range::<str, _>((lower, upper))
            .map(|(k, v)| StoreEntry::new(k.clone(), v.clone()));

        Ok(if range.reverse {
            iter.rev().take(limit).collect()
        } else {
            iter.take(limit).collect()
        })
    }
}

/// In-memory blob store.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
    should_fail: AtomicBool,
}

impl MemoryBlobStore {
    /// Empty blob store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a blob.
    pub fn put(&self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.blobs.write().insert(name.into(), bytes.into());
    }

    /// Make every read fail.
    pub fn set_failing(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(StoreError::Io("injected blob failure".to_string()));
        }
        self.blobs
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                what: format!("blob {name}"),
            })
    }
}
