//! Common types for the Temporal provider: CRDs, errors, config and comparison

#![deny(missing_docs)]

pub mod compare;
pub mod config;
pub mod crd;
pub mod error;

pub use error::{Error, ServiceErrorKind};

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// API group for managed Temporal resources
pub const CORE_API_GROUP: &str = "core.temporal.crossplane.io";

/// API group for provider-level configuration
pub const PROVIDER_API_GROUP: &str = "temporal.crossplane.io";

/// Annotation carrying the external identity marker of a managed resource
pub const EXTERNAL_NAME_ANNOTATION: &str = "crossplane.io/external-name";

/// Name of the ProviderConfig used when a resource does not reference one
pub const DEFAULT_PROVIDER_CONFIG: &str = "default";

/// Temporal's own namespace, never reported as a managed namespace
pub const TEMPORAL_SYSTEM_NAMESPACE: &str = "temporal-system";

/// Default workflow execution retention in days
pub const DEFAULT_RETENTION_DAYS: u32 = 30;

/// Seconds in one retention day
pub const SECONDS_PER_DAY: i64 = 24 * 60 * 60;
