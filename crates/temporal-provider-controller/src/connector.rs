//! Connects managed resources to Temporal through the shared cache

use std::sync::Arc;

use tracing::debug;

use temporal_provider_client::{CallContext, ConnectionCache, ConnectionHandle};
use temporal_provider_common::Result;

use crate::credentials::CredentialSource;

/// Credential lookup plus the connection cache of one resource kind
#[derive(Clone)]
pub struct Connector {
    credentials: Arc<dyn CredentialSource>,
    cache: Arc<ConnectionCache>,
}

impl Connector {
    /// Create a connector
    pub fn new(credentials: Arc<dyn CredentialSource>, cache: Arc<ConnectionCache>) -> Self {
        Self { credentials, cache }
    }

    /// Get a client for the named ProviderConfig, taking a cache reference
    pub async fn connect(&self, cx: &CallContext, provider_config: &str) -> Result<ConnectionHandle> {
        let credentials = cx
            .run("GetCredentials", self.credentials.credentials(provider_config))
            .await?;
        let handle = cx.run("Connect", self.cache.connect(&credentials)).await?;
        debug!(provider_config = %provider_config, client = ?handle, "Connected");
        Ok(handle)
    }

    /// Release one reference from every cached client
    pub fn disconnect(&self) {
        self.cache.disconnect_all();
    }

    /// The underlying cache
    pub fn cache(&self) -> &Arc<ConnectionCache> {
        &self.cache
    }
}
