//! Process-local directory of open stores.
//!
//! Stores are registered as they are opened and removed when closed. An
//! address resolves through its alias if one was recorded, otherwise its
//! host must itself name a registered owner.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

use crate::domain::{OwnerId, StoreError};
use crate::ports::{OwnerStore, StoreLocator};
use crate::urls::address_host;

/// In-memory [`StoreLocator`].
#[derive(Default)]
pub struct StoreRegistry {
    public: RwLock<HashMap<OwnerId, OwnerStore>>,
    private: RwLock<HashMap<OwnerId, OwnerStore>>,
    aliases: RwLock<HashMap<String, OwnerId>>,
}

impl StoreRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a public store under its owner.
    pub fn open_public(&self, store: OwnerStore) {
        debug!(owner = %store.owner_id, "[feed] public store opened");
        self.public.write().insert(store.owner_id.clone(), store);
    }

    /// Register a private store under its owner.
    pub fn open_private(&self, store: OwnerStore) {
        debug!(owner = %store.owner_id, "[feed] private store opened");
        self.private.write().insert(store.owner_id.clone(), store);
    }

    /// Drop both stores of an owner. Returns whether anything was open.
    pub fn close(&self, owner: &OwnerId) -> bool {
        let had_public = self.public.write().remove(owner).is_some();
        let had_private = self.private.write().remove(owner).is_some();
        if had_public || had_private {
            debug!(owner = %owner, "[feed] stores closed");
        }
        had_public || had_private
    }

    /// Record that an address host belongs to `owner`.
    pub fn alias_address(&self, host: impl Into<String>, owner: OwnerId) {
        self.aliases.write().insert(host.into(), owner);
    }

    fn lookup(&self, name: &str) -> Option<OwnerId> {
        if let Some(owner) = self.aliases.read().get(name) {
            return Some(owner.clone());
        }
        let candidate = OwnerId::new(name);
        let known = self.public.read().contains_key(&candidate)
            || self.private.read().contains_key(&candidate);
        known.then_some(candidate)
    }
}

#[async_trait]
impl StoreLocator for StoreRegistry {
    async fn resolve_owner_id(&self, address: &str) -> Result<OwnerId, StoreError> {
        let unresolvable = || StoreError::Unresolvable {
            address: address.to_string(),
        };
        let name = if address.contains("://") {
            address_host(address).map_err(|_| unresolvable())?
        } else {
            address
        };
        self.lookup(name).ok_or_else(unresolvable)
    }

    fn public_store(&self, owner: &OwnerId) -> Option<OwnerStore> {
        self.public.read().get(owner).cloned()
    }

    fn private_store(&self, owner: &OwnerId) -> Option<OwnerStore> {
        self.private.read().get(owner).cloned()
    }
}
