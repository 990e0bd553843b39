//! Connection cache shared by concurrently reconciled resources
//!
//! Entries are keyed by the SHA-256 digest of the raw credential bytes, so
//! resources using the same ProviderConfig share one client. Each `connect`
//! takes a reference and each `disconnect_all` sweep releases one from every
//! entry; an entry is closed and evicted when its count reaches zero.
//!
//! Reference counts are only mutated while holding the entry's map shard lock,
//! so a sweep can never close an entry that a concurrent `connect` has just
//! acquired. Dialing and closing happen outside any lock.

use std::ops::Deref;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

use temporal_provider_common::config::TemporalServiceConfig;
use temporal_provider_common::Result;

use crate::grpc::GrpcTemporalService;
use crate::service::TemporalService;

/// Creates a client from raw credential bytes
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait Dialer: Send + Sync {
    /// Dial a new client
    async fn dial(&self, credentials: &[u8]) -> Result<Arc<dyn TemporalService>>;
}

/// Dials [`GrpcTemporalService`] from a JSON service config blob
#[derive(Clone, Copy, Debug, Default)]
pub struct GrpcDialer;

#[async_trait]
impl Dialer for GrpcDialer {
    async fn dial(&self, credentials: &[u8]) -> Result<Arc<dyn TemporalService>> {
        let config = TemporalServiceConfig::from_slice(credentials)?;
        let client = GrpcTemporalService::connect(&config).await?;
        Ok(Arc::new(client))
    }
}

struct CacheEntry {
    client: Arc<dyn TemporalService>,
    refs: usize,
}

/// A shared client obtained from the cache
#[derive(Clone)]
pub struct ConnectionHandle {
    key: String,
    client: Arc<dyn TemporalService>,
}

impl ConnectionHandle {
    /// Digest of the credentials this handle was obtained with
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The shared client
    pub fn client(&self) -> &Arc<dyn TemporalService> {
        &self.client
    }
}

impl Deref for ConnectionHandle {
    type Target = dyn TemporalService;

    fn deref(&self) -> &Self::Target {
        self.client.as_ref()
    }
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("key", &self.key)
            .field("instance", &self.client.instance_id())
            .finish()
    }
}

/// Reference-counted clients keyed by credential digest
pub struct ConnectionCache {
    name: String,
    dialer: Arc<dyn Dialer>,
    entries: DashMap<String, CacheEntry>,
}

impl ConnectionCache {
    /// Create an empty cache
    ///
    /// `name` only labels log lines, e.g. the resource kind using the cache.
    pub fn new(name: impl Into<String>, dialer: Arc<dyn Dialer>) -> Self {
        Self {
            name: name.into(),
            dialer,
            entries: DashMap::new(),
        }
    }

    /// Get or create the client for these credentials and take a reference
    ///
    /// When two callers dial the same credentials concurrently, the first to
    /// insert wins and the other closes its freshly dialed client.
    pub async fn connect(&self, credentials: &[u8]) -> Result<ConnectionHandle> {
        let key = credential_digest(credentials);

        if let Some(handle) = self.acquire(&key) {
            return Ok(handle);
        }

        let dialed = self.dialer.dial(credentials).await?;

        let (handle, duplicate) = match self.entries.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                entry.refs += 1;
                let handle = ConnectionHandle {
                    key,
                    client: entry.client.clone(),
                };
                (handle, Some(dialed))
            }
            Entry::Vacant(vacant) => {
                vacant.insert(CacheEntry {
                    client: dialed.clone(),
                    refs: 1,
                });
                let handle = ConnectionHandle {
                    key,
                    client: dialed,
                };
                (handle, None)
            }
        };

        match duplicate {
            Some(duplicate) => {
                warn!(
                    cache = %self.name,
                    instance = %duplicate.instance_id(),
                    "Lost connect race, closing duplicate client"
                );
                duplicate.close();
            }
            None => info!(
                cache = %self.name,
                instance = %handle.client.instance_id(),
                "Cached new Temporal client"
            ),
        }

        Ok(handle)
    }

    /// Release one reference from every entry, closing those that reach zero
    pub fn disconnect_all(&self) {
        let keys: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        let mut evicted = Vec::new();

        for key in keys {
            if let Entry::Occupied(mut occupied) = self.entries.entry(key) {
                let entry = occupied.get_mut();
                entry.refs = entry.refs.saturating_sub(1);
                if entry.refs == 0 {
                    evicted.push(occupied.remove().client);
                }
            }
        }

        for client in evicted {
            info!(
                cache = %self.name,
                instance = %client.instance_id(),
                "Closing idle Temporal client"
            );
            client.close();
        }
    }

    /// Number of cached clients
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no client is cached
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current reference count for a credential digest
    pub fn ref_count(&self, key: &str) -> Option<usize> {
        self.entries.get(key).map(|e| e.refs)
    }

    fn acquire(&self, key: &str) -> Option<ConnectionHandle> {
        self.entries.get_mut(key).map(|mut entry| {
            entry.refs += 1;
            debug!(cache = %self.name, refs = entry.refs, "Reusing cached Temporal client");
            ConnectionHandle {
                key: key.to_string(),
                client: entry.client.clone(),
            }
        })
    }
}

/// Hex SHA-256 digest of raw credential bytes
pub fn credential_digest(credentials: &[u8]) -> String {
    hex::encode(Sha256::digest(credentials))
}
