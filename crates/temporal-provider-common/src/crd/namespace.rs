//! TemporalNamespace CRD
//!
//! A TemporalNamespace declares a namespace registered on a Temporal cluster.
//! The namespace name is the external identity and never changes.

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::{ArchivalState, Condition, DeletionPolicy, NamespaceState, Reference};
use crate::DEFAULT_RETENTION_DAYS;

/// Desired state of a Temporal namespace
///
/// Example:
/// ```yaml
/// apiVersion: core.temporal.crossplane.io/v1alpha1
/// kind: TemporalNamespace
/// metadata:
///   name: orders
/// spec:
///   forProvider:
///     name: orders
///     description: Order processing workflows
///     workflowExecutionRetentionDays: 14
///     data:
///       team: payments
/// ```
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "core.temporal.crossplane.io",
    version = "v1alpha1",
    kind = "TemporalNamespace",
    status = "TemporalNamespaceStatus",
    category = "crossplane",
    category = "managed",
    category = "temporal",
    printcolumn = r#"{"name":"READY","type":"string","jsonPath":".status.conditions[?(@.type=='Ready')].status"}"#,
    printcolumn = r#"{"name":"SYNCED","type":"string","jsonPath":".status.conditions[?(@.type=='Synced')].status"}"#,
    printcolumn = r#"{"name":"EXTERNAL-NAME","type":"string","jsonPath":".metadata.annotations.crossplane\\.io/external-name"}"#,
    printcolumn = r#"{"name":"AGE","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct TemporalNamespaceSpec {
    /// ProviderConfig holding the connection credentials
    #[serde(default = "default_provider_config_ref")]
    pub provider_config_ref: Reference,

    /// What happens to the namespace when this resource is deleted
    #[serde(default)]
    pub deletion_policy: DeletionPolicy,

    /// Namespace parameters
    pub for_provider: TemporalNamespaceParameters,
}

/// Configurable fields of a Temporal namespace
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TemporalNamespaceParameters {
    /// Namespace name (immutable)
    pub name: String,

    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Owner contact address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_email: Option<String>,

    /// How long closed workflow executions are kept, in days
    #[serde(default = "default_retention_days")]
    #[schemars(range(min = 1))]
    pub workflow_execution_retention_days: u32,

    /// Free-form metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<BTreeMap<String, String>>,

    /// Whether history archival is enabled
    #[serde(default)]
    pub history_archival_state: ArchivalState,

    /// Destination for archived history
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_archival_uri: Option<String>,

    /// Whether visibility archival is enabled
    #[serde(default)]
    pub visibility_archival_state: ArchivalState,

    /// Destination for archived visibility records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility_archival_uri: Option<String>,
}

impl TemporalNamespaceParameters {
    /// Parameters with defaults for everything but the name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            owner_email: None,
            workflow_execution_retention_days: DEFAULT_RETENTION_DAYS,
            data: None,
            history_archival_state: ArchivalState::Disabled,
            history_archival_uri: None,
            visibility_archival_state: ArchivalState::Disabled,
            visibility_archival_uri: None,
        }
    }
}

/// Observed state of a Temporal namespace
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TemporalNamespaceObservation {
    /// Opaque id assigned by Temporal
    pub id: String,

    /// Namespace name
    pub name: String,

    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Owner contact address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_email: Option<String>,

    /// Retention in whole days
    #[serde(default)]
    pub workflow_execution_retention_days: u32,

    /// Free-form metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<BTreeMap<String, String>>,

    /// History archival state
    #[serde(default)]
    pub history_archival_state: ArchivalState,

    /// History archival destination
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_archival_uri: Option<String>,

    /// Visibility archival state
    #[serde(default)]
    pub visibility_archival_state: ArchivalState,

    /// Visibility archival destination
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility_archival_uri: Option<String>,

    /// Lifecycle state reported by Temporal
    #[serde(default)]
    pub state: NamespaceState,
}

/// TemporalNamespace status
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TemporalNamespaceStatus {
    /// Last observation of the remote namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_provider: Option<TemporalNamespaceObservation>,

    /// Ready and Synced conditions
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

fn default_provider_config_ref() -> Reference {
    Reference::new(crate::DEFAULT_PROVIDER_CONFIG)
}

fn default_retention_days() -> u32 {
    DEFAULT_RETENTION_DAYS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_yaml_uses_defaults() {
        let yaml = r#"
apiVersion: core.temporal.crossplane.io/v1alpha1
kind: TemporalNamespace
metadata:
  name: orders
spec:
  forProvider:
    name: orders
"#;
        let ns: TemporalNamespace = serde_yaml::from_str(yaml).expect("valid yaml");
        assert_eq!(ns.spec.provider_config_ref.name, "default");
        assert_eq!(ns.spec.deletion_policy, DeletionPolicy::Delete);
        assert_eq!(
            ns.spec.for_provider,
            TemporalNamespaceParameters::named("orders")
        );
        assert!(ns.status.is_none());
    }

    #[test]
    fn full_yaml_parses() {
        let yaml = r#"
apiVersion: core.temporal.crossplane.io/v1alpha1
kind: TemporalNamespace
metadata:
  name: archive
spec:
  providerConfigRef:
    name: prod
  deletionPolicy: Orphan
  forProvider:
    name: archive
    description: archived
    ownerEmail: ops@example.com
    workflowExecutionRetentionDays: 7
    data:
      team: ops
    historyArchivalState: Enabled
    historyArchivalUri: "s3://bucket/history"
    visibilityArchivalState: Disabled
"#;
        let ns: TemporalNamespace = serde_yaml::from_str(yaml).expect("valid yaml");
        let params = &ns.spec.for_provider;
        assert_eq!(ns.spec.provider_config_ref.name, "prod");
        assert_eq!(ns.spec.deletion_policy, DeletionPolicy::Orphan);
        assert_eq!(params.workflow_execution_retention_days, 7);
        assert_eq!(params.history_archival_state, ArchivalState::Enabled);
        assert_eq!(
            params.data.as_ref().and_then(|d| d.get("team")).map(String::as_str),
            Some("ops")
        );
    }

    #[test]
    fn crd_is_cluster_scoped() {
        use kube::CustomResourceExt;
        let crd = TemporalNamespace::crd();
        assert_eq!(crd.spec.scope, "Cluster");
        assert_eq!(crd.spec.group, "core.temporal.crossplane.io");
    }
}
