//! ProviderConfig CRD
//!
//! Points managed resources at the Secret holding the Temporal connection
//! config blob.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Where the provider finds connection credentials
///
/// Example:
/// ```yaml
/// apiVersion: temporal.crossplane.io/v1alpha1
/// kind: ProviderConfig
/// metadata:
///   name: default
/// spec:
///   credentials:
///     source: Secret
///     secretRef:
///       namespace: crossplane-system
///       name: temporal-creds
///       key: credentials
/// ```
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "temporal.crossplane.io",
    version = "v1alpha1",
    kind = "ProviderConfig",
    category = "crossplane",
    category = "provider",
    category = "temporal",
    printcolumn = r#"{"name":"SECRET-NAME","type":"string","jsonPath":".spec.credentials.secretRef.name"}"#,
    printcolumn = r#"{"name":"AGE","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfigSpec {
    /// Credentials used to connect to Temporal
    pub credentials: ProviderCredentials,
}

/// Credential source description
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCredentials {
    /// Kind of credential source
    pub source: CredentialsSource,

    /// Secret key holding the config blob (required for `Secret`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<SecretKeySelector>,
}

/// Supported credential sources
#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum CredentialsSource {
    /// Read the blob from a Kubernetes Secret
    Secret,
    /// No credentials; connect with an empty config
    None,
}

/// A key within a namespaced Secret
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SecretKeySelector {
    /// Secret name
    pub name: String,
    /// Secret namespace
    pub namespace: String,
    /// Key within the Secret data
    pub key: String,
}
