//! Custom Resource Definitions for the Temporal provider
//!
//! This module contains all CRD definitions reconciled by the provider.

mod namespace;
mod provider_config;
mod search_attribute;
mod types;

pub use namespace::{
    TemporalNamespace, TemporalNamespaceObservation, TemporalNamespaceParameters,
    TemporalNamespaceSpec, TemporalNamespaceStatus,
};
pub use provider_config::{
    CredentialsSource, ProviderConfig, ProviderConfigSpec, ProviderCredentials, SecretKeySelector,
};
pub use search_attribute::{
    SearchAttribute, SearchAttributeObservation, SearchAttributeParameters, SearchAttributeSpec,
    SearchAttributeStatus,
};
pub use types::{
    set_condition, ArchivalState, Condition, ConditionStatus, DeletionPolicy, NamespaceState,
    Reference, SearchAttributeType, Selector, CONDITION_READY, CONDITION_SYNCED, REASON_AVAILABLE,
    REASON_CREATING, REASON_DELETING, REASON_RECONCILE_ERROR, REASON_RECONCILE_SUCCESS,
    REASON_UNAVAILABLE,
};
