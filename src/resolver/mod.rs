//! Username to public key resolution.
//!
//! A username hashes to a registry uid, the uid maps to an owner address, and
//! the address maps to its latest metadata. The synchronized cache answers the
//! last step; the registry is only consulted on a cache miss.

pub mod name;
pub mod registry;

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use alloy::primitives::{Address, B256};
use log::debug;
use moka::future::Cache;
use serde::Serialize;

use crate::{db::CacheStore, error::ResolveError};

pub use name::{gen_name_hash, name_hash};
pub use registry::RegistryClient;

/// Relay advertised for every resolved key.
pub const DEFAULT_RELAY: &str = "https://relay.hexlink.io";

/// NIP-05 `/.well-known/nostr.json` response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NostrJson {
    pub names: BTreeMap<String, String>,
    pub relays: BTreeMap<String, Vec<String>>,
}

pub fn nostr_json(name: &str, pubkey: &str) -> NostrJson {
    NostrJson {
        names: BTreeMap::from([(name.to_string(), pubkey.to_string())]),
        relays: BTreeMap::from([(pubkey.to_string(), vec![DEFAULT_RELAY.to_string()])]),
    }
}

pub struct Resolver {
    registry: RegistryClient,
    cache: Arc<dyn CacheStore>,
    // uid -> owner, kept for an hour
    owners: Cache<B256, Address>,
}

impl Resolver {
    pub fn new(registry: RegistryClient, cache: Arc<dyn CacheStore>) -> Self {
        let owners = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(Duration::from_secs(3600))
            .build();

        Self {
            registry,
            cache,
            owners,
        }
    }

    async fn owner_of(&self, uid: B256) -> Result<Address, ResolveError> {
        if let Some(address) = self.owners.get(&uid).await {
            return Ok(address);
        }
        let address = self
            .registry
            .resolve_uid(uid)
            .await?
            .ok_or(ResolveError::NotRegistered)?;
        self.owners.insert(uid, address).await;
        Ok(address)
    }

    /// Latest public key metadata for `name`.
    ///
    /// `Ok(None)` means the name is registered but carries no metadata yet.
    pub async fn pubkey(&self, name: &str) -> Result<Option<String>, ResolveError> {
        let uid = gen_name_hash(name)?;
        let address = self.owner_of(uid).await?;

        if let Some(metadata) = self.cache.get(&address.to_checksum(None)).await? {
            return Ok(Some(metadata));
        }

        debug!("Cache miss for {}, falling back to registry", address);
        self.registry.metadata_of(address).await
    }
}
