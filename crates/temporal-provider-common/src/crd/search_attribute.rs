//! SearchAttribute CRD
//!
//! Every field of a search attribute is part of its identity: once created it
//! can only be deleted, never changed.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::{Condition, DeletionPolicy, Reference, SearchAttributeType, Selector};

/// Desired state of a custom search attribute
///
/// Example:
/// ```yaml
/// apiVersion: core.temporal.crossplane.io/v1alpha1
/// kind: SearchAttribute
/// metadata:
///   name: orders-customer-id
/// spec:
///   forProvider:
///     name: CustomerId
///     type: Keyword
///     temporalNamespaceNameRef:
///       name: orders
/// ```
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "core.temporal.crossplane.io",
    version = "v1alpha1",
    kind = "SearchAttribute",
    status = "SearchAttributeStatus",
    category = "crossplane",
    category = "managed",
    category = "temporal",
    printcolumn = r#"{"name":"READY","type":"string","jsonPath":".status.conditions[?(@.type=='Ready')].status"}"#,
    printcolumn = r#"{"name":"SYNCED","type":"string","jsonPath":".status.conditions[?(@.type=='Synced')].status"}"#,
    printcolumn = r#"{"name":"EXTERNAL-NAME","type":"string","jsonPath":".metadata.annotations.crossplane\\.io/external-name"}"#,
    printcolumn = r#"{"name":"AGE","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct SearchAttributeSpec {
    /// ProviderConfig holding the connection credentials
    #[serde(default = "default_provider_config_ref")]
    pub provider_config_ref: Reference,

    /// What happens to the attribute when this resource is deleted
    #[serde(default)]
    pub deletion_policy: DeletionPolicy,

    /// Search attribute parameters
    pub for_provider: SearchAttributeParameters,
}

/// Configurable fields of a search attribute
///
/// At least one of `temporalNamespaceName`, `temporalNamespaceNameRef` or
/// `temporalNamespaceNameSelector` must be set.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SearchAttributeParameters {
    /// Attribute name (immutable)
    pub name: String,

    /// Attribute value type (immutable)
    #[serde(rename = "type")]
    pub type_: SearchAttributeType,

    /// Owning namespace (immutable)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temporal_namespace_name: Option<String>,

    /// Reference to a TemporalNamespace whose name is used
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temporal_namespace_name_ref: Option<Reference>,

    /// Selects a TemporalNamespace whose name is used
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temporal_namespace_name_selector: Option<Selector>,
}

impl SearchAttributeParameters {
    /// Parameters with a directly named owning namespace
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        type_: SearchAttributeType,
    ) -> Self {
        Self {
            name: name.into(),
            type_,
            temporal_namespace_name: Some(namespace.into()),
            temporal_namespace_name_ref: None,
            temporal_namespace_name_selector: None,
        }
    }

    /// The owning namespace name, if already resolved
    pub fn namespace(&self) -> Option<&str> {
        self.temporal_namespace_name
            .as_deref()
            .filter(|ns| !ns.is_empty())
    }
}

/// Observed state of a search attribute
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SearchAttributeObservation {
    /// Attribute name
    pub name: String,

    /// Attribute value type
    #[serde(rename = "type")]
    pub type_: SearchAttributeType,

    /// Owning namespace
    pub temporal_namespace_name: String,
}

/// SearchAttribute status
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchAttributeStatus {
    /// Last observation of the remote attribute
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_provider: Option<SearchAttributeObservation>,

    /// Ready and Synced conditions
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

fn default_provider_config_ref() -> Reference {
    Reference::new(crate::DEFAULT_PROVIDER_CONFIG)
}
