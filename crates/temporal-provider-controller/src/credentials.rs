//! Credential sources for ProviderConfig names
//!
//! Credentials are opaque bytes (a JSON service config) handed to the
//! connection cache. They come either from a fixed blob or from the Secret a
//! ProviderConfig points at.

use std::path::Path;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::Api;
use kube::Client;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use temporal_provider_common::crd::{CredentialsSource, ProviderConfig, SecretKeySelector};
use temporal_provider_common::{Error, Result};

/// Fetches the credential bytes for a ProviderConfig
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Credentials for the named ProviderConfig
    async fn credentials(&self, provider_config: &str) -> Result<Vec<u8>>;
}

/// The same credentials for every ProviderConfig
#[derive(Clone, Debug)]
pub struct StaticCredentials {
    bytes: Vec<u8>,
}

impl StaticCredentials {
    /// Use the given bytes
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Read the credentials from a file
    pub async fn from_file(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            Error::credentials(
                path.display().to_string(),
                format!("failed to read credentials file: {e}"),
            )
        })?;
        Ok(Self::new(bytes))
    }
}

#[async_trait]
impl CredentialSource for StaticCredentials {
    async fn credentials(&self, _provider_config: &str) -> Result<Vec<u8>> {
        Ok(self.bytes.clone())
    }
}

/// Credentials read from the Secret referenced by a ProviderConfig
pub struct KubeCredentials {
    client: Client,
}

impl KubeCredentials {
    /// Create a source using the given client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CredentialSource for KubeCredentials {
    async fn credentials(&self, provider_config: &str) -> Result<Vec<u8>> {
        let configs: Api<ProviderConfig> = Api::all(self.client.clone());
        let config = match configs.get(provider_config).await {
            Ok(config) => config,
            Err(kube::Error::Api(ae)) if ae.code == 404 => {
                return Err(Error::credentials(
                    provider_config,
                    "ProviderConfig not found",
                ));
            }
            Err(e) => return Err(e.into()),
        };

        let selector = secret_ref(&config)?;
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), &selector.namespace);
        let secret = match secrets.get(&selector.name).await {
            Ok(secret) => secret,
            Err(kube::Error::Api(ae)) if ae.code == 404 => {
                return Err(Error::credentials(
                    provider_config,
                    format!("secret {}/{} not found", selector.namespace, selector.name),
                ));
            }
            Err(e) => return Err(e.into()),
        };

        debug!(
            provider_config = %provider_config,
            secret = %selector.name,
            namespace = %selector.namespace,
            "Read credentials secret"
        );
        secret_key_bytes(provider_config, &secret, &selector.key)
    }
}

/// The secret key selector of a ProviderConfig using Secret credentials
pub fn secret_ref(config: &ProviderConfig) -> Result<&SecretKeySelector> {
    let name = config.metadata.name.as_deref().unwrap_or_default();
    match config.spec.credentials.source {
        CredentialsSource::Secret => config
            .spec
            .credentials
            .secret_ref
            .as_ref()
            .ok_or_else(|| Error::credentials(name, "credentials.secretRef is required")),
        CredentialsSource::None => Err(Error::credentials(
            name,
            "credentials source None is not supported",
        )),
    }
}

/// Value of one key of a Secret, from `data` or `stringData`
pub fn secret_key_bytes(provider_config: &str, secret: &Secret, key: &str) -> Result<Vec<u8>> {
    if let Some(value) = secret.data.as_ref().and_then(|d| d.get(key)) {
        return Ok(value.0.clone());
    }
    if let Some(value) = secret.string_data.as_ref().and_then(|d| d.get(key)) {
        return Ok(value.clone().into_bytes());
    }
    Err(Error::credentials(
        provider_config,
        format!("key {key} not found in credentials secret"),
    ))
}
