//! # Outbound Ports
//!
//! What the reader needs from the storage layer: namespaced ordered stores,
//! blob stores, and a locator that maps owners and addresses to them.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::domain::{ListRange, OwnerId, StoreEntry};

pub use crate::domain::StoreError;

/// An ordered key-value namespace.
#[async_trait]
pub trait StoreHandle: Send + Sync {
    /// Nested namespace.
    fn sub(&self, namespace: &str) -> Arc<dyn StoreHandle>;

    /// Point lookup. `Ok(None)` when the key is absent.
    async fn get(&self, key: &str) -> Result<Option<StoreEntry>, StoreError>;

    /// Range scan with exclusive bounds.
    async fn list(&self, range: ListRange) -> Result<Vec<StoreEntry>, StoreError>;
}

/// Named binary objects attached to an owner.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch a blob's bytes. Missing blobs are `StoreError::NotFound`.
    async fn get(&self, name: &str) -> Result<Vec<u8>, StoreError>;
}

/// Maps owners to their stores and addresses to owners.
#[async_trait]
pub trait StoreLocator: Send + Sync {
    /// Resolve a network address (or an owner id) to a stable owner id.
    async fn resolve_owner_id(&self, address: &str) -> Result<OwnerId, StoreError>;

    /// The owner's public store, if it is open locally.
    fn public_store(&self, owner: &OwnerId) -> Option<OwnerStore>;

    /// The owner's private store. Only the local principal has one.
    fn private_store(&self, owner: &OwnerId) -> Option<OwnerStore>;
}

/// A store as handed out by the locator.
#[derive(Clone)]
pub struct OwnerStore {
    /// Owner of the store.
    pub owner_id: OwnerId,
    /// Root namespace.
    pub root: Arc<dyn StoreHandle>,
    /// Blob store, for public stores that carry one.
    pub blobs: Option<Arc<dyn BlobStore>>,
}

impl OwnerStore {
    /// Store without blobs.
    pub fn new(owner_id: OwnerId, root: Arc<dyn StoreHandle>) -> Self {
        Self {
            owner_id,
            root,
            blobs: None,
        }
    }

    /// Attach a blob store.
    pub fn with_blobs(mut self, blobs: Arc<dyn BlobStore>) -> Self {
        self.blobs = Some(blobs);
        self
    }

    /// Namespace for a table path. `a/b/c` nests one level per segment.
    pub fn table(&self, path: &str) -> Arc<dyn StoreHandle> {
        path.split('/')
            .filter(|s| !s.is_empty())
            .fold(Arc::clone(&self.root), |handle, segment| handle.sub(segment))
    }
}

impl fmt::Debug for OwnerStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnerStore")
            .field("owner_id", &self.owner_id)
            .field("has_blobs", &self.blobs.is_some())
            .finish()
    }
}
