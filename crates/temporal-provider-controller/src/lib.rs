//! Temporal provider: reconciles TemporalNamespace and SearchAttribute
//! resources against a Temporal cluster
//!
//! A [`pass::Reconciler`] drives one generic state machine
//! (connect, observe, create/update/delete, disconnect) for any
//! [`managed::ResourceKind`]. [`provider::Provider`] wires one reconciler and
//! connection cache per kind.

#![deny(missing_docs)]

pub mod connector;
pub mod credentials;
pub mod managed;
pub mod manifest;
pub mod namespace;
pub mod pass;
pub mod provider;
pub mod resolver;
pub mod search_attribute;
pub mod telemetry;

pub use connector::Connector;
pub use credentials::{CredentialSource, KubeCredentials, StaticCredentials};
pub use managed::{ExternalObservation, ManagedClient, ManagedResource, ResourceKind};
pub use manifest::Manifest;
pub use namespace::NamespaceKind;
pub use pass::{HeldPass, PassOutcome, Reconciler};
pub use provider::{Provider, RoundSummary};
pub use resolver::{
    KubeNamespaceLookup, NamespaceResolver, StaticNamespaceLookup, TemporalNamespaceLookup,
};
pub use search_attribute::SearchAttributeKind;
