//! Error types for the Temporal provider
//!
//! Errors are structured with fields to aid debugging in production. Remote
//! failures keep their classified [`ServiceErrorKind`] so callers can match on
//! the kind instead of inspecting messages.

use thiserror::Error;

/// Default context value when no specific context is available
pub const UNKNOWN_CONTEXT: &str = "unknown";

/// Classification of an error reported by the Temporal service
///
/// Derived from the gRPC status code and, when present, the Temporal
/// error-detail message attached to the status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ServiceErrorKind {
    /// The namespace does not exist
    NamespaceNotFound,
    /// A namespace with the requested name is already registered
    NamespaceAlreadyExists,
    /// The namespace is in a state that forbids the operation
    NamespaceInvalidState,
    /// Generic not-found without Temporal details
    NotFound,
    /// Generic already-exists without Temporal details
    AlreadyExists,
    /// The request was rejected as malformed
    InvalidArgument,
    /// The service refused the operation in its current state
    FailedPrecondition,
    /// The caller is not allowed to perform the operation
    PermissionDenied,
    /// The caller could not be authenticated
    Unauthenticated,
    /// The service is rate limiting or out of capacity
    ResourceExhausted,
    /// The service could not be reached
    Unavailable,
    /// The server-side deadline elapsed
    DeadlineExceeded,
    /// The call was cancelled
    Cancelled,
    /// The service failed internally
    Internal,
    /// Anything not covered above
    Unknown,
}

impl ServiceErrorKind {
    /// Whether retrying the same call later may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Unavailable
                | Self::DeadlineExceeded
                | Self::Cancelled
                | Self::ResourceExhausted
                | Self::Internal
                | Self::Unknown
        )
    }
}

impl std::fmt::Display for ServiceErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NamespaceNotFound => "NamespaceNotFound",
            Self::NamespaceAlreadyExists => "NamespaceAlreadyExists",
            Self::NamespaceInvalidState => "NamespaceInvalidState",
            Self::NotFound => "NotFound",
            Self::AlreadyExists => "AlreadyExists",
            Self::InvalidArgument => "InvalidArgument",
            Self::FailedPrecondition => "FailedPrecondition",
            Self::PermissionDenied => "PermissionDenied",
            Self::Unauthenticated => "Unauthenticated",
            Self::ResourceExhausted => "ResourceExhausted",
            Self::Unavailable => "Unavailable",
            Self::DeadlineExceeded => "DeadlineExceeded",
            Self::Cancelled => "Cancelled",
            Self::Internal => "Internal",
            Self::Unknown => "Unknown",
        };
        write!(f, "{name}")
    }
}

/// Main error type for provider operations
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or incomplete service configuration
    #[error("configuration error: {message}")]
    Config {
        /// Description of what's invalid
        message: String,
        /// The offending config field (e.g., "keyPem")
        field: Option<String>,
    },

    /// TLS material could not be loaded or parsed
    #[error("TLS error: {message}")]
    Tls {
        /// Description of what failed
        message: String,
    },

    /// Dialing the Temporal frontend failed
    #[error("failed to connect to {host_port}: {message}")]
    Connect {
        /// Address that was dialed
        host_port: String,
        /// Description of what failed
        message: String,
    },

    /// The Temporal service returned an error
    #[error("{operation} failed [{kind}]: {message}")]
    Service {
        /// Operation that failed (e.g., "DescribeNamespace")
        operation: String,
        /// Classified error kind
        kind: ServiceErrorKind,
        /// Message reported by the service
        message: String,
    },

    /// The caller cancelled the call before it completed
    #[error("{operation} cancelled")]
    Cancelled {
        /// Operation that was in flight
        operation: String,
    },

    /// The caller's deadline elapsed before the call completed
    #[error("{operation} exceeded its deadline")]
    DeadlineExceeded {
        /// Operation that was in flight
        operation: String,
    },

    /// The client was used after being closed
    #[error("client {instance} is closed")]
    Closed {
        /// Instance id of the closed client
        instance: String,
    },

    /// An update was requested for a resource whose fields are all immutable
    #[error("{resource} can not be updated: all properties are immutable")]
    Immutable {
        /// External name of the resource
        resource: String,
    },

    /// A precondition for reconciling the resource is not met
    #[error("precondition failed for {resource}: {message}")]
    Precondition {
        /// Name of the managed resource
        resource: String,
        /// Description of what is missing
        message: String,
    },

    /// Remote state could not be mapped onto the resource model
    #[error("mapping error: {message}")]
    Mapping {
        /// Description of what failed
        message: String,
    },

    /// Credentials could not be retrieved
    #[error("cannot get credentials from {provider_config}: {message}")]
    Credentials {
        /// ProviderConfig the credentials were requested for
        provider_config: String,
        /// Description of what failed
        message: String,
    },

    /// Kubernetes API error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
        /// The resource kind being serialized (if known)
        kind: Option<String>,
    },
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
            field: None,
        }
    }

    /// Create a configuration error for a specific field
    pub fn config_field(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
            field: Some(field.into()),
        }
    }

    /// Create a TLS error
    pub fn tls(msg: impl Into<String>) -> Self {
        Self::Tls {
            message: msg.into(),
        }
    }

    /// Create a connect error for the given address
    pub fn connect(host_port: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Connect {
            host_port: host_port.into(),
            message: msg.into(),
        }
    }

    /// Create a classified service error
    pub fn service(
        operation: impl Into<String>,
        kind: ServiceErrorKind,
        msg: impl Into<String>,
    ) -> Self {
        Self::Service {
            operation: operation.into(),
            kind,
            message: msg.into(),
        }
    }

    /// Create a precondition error for the given resource
    pub fn precondition(resource: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Precondition {
            resource: resource.into(),
            message: msg.into(),
        }
    }

    /// Create an immutability violation for the given resource
    pub fn immutable(resource: impl Into<String>) -> Self {
        Self::Immutable {
            resource: resource.into(),
        }
    }

    /// Create a mapping error
    pub fn mapping(msg: impl Into<String>) -> Self {
        Self::Mapping {
            message: msg.into(),
        }
    }

    /// Create a credentials error
    pub fn credentials(provider_config: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Credentials {
            provider_config: provider_config.into(),
            message: msg.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: None,
        }
    }

    /// Create a serialization error with resource kind context
    pub fn serialization_for_kind(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: Some(kind.into()),
        }
    }

    /// The classified service error kind, if this is a remote error
    pub fn service_kind(&self) -> Option<ServiceErrorKind> {
        match self {
            Error::Service { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Check if this error is retryable
    ///
    /// Configuration, precondition and immutability errors need a spec or
    /// config fix. Network, cancellation and transient service errors may
    /// succeed on a later pass.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Config { .. } => false,
            Error::Tls { .. } => false,
            Error::Connect { .. } => true,
            Error::Service { kind, .. } => kind.is_transient(),
            Error::Cancelled { .. } => true,
            Error::DeadlineExceeded { .. } => true,
            Error::Closed { .. } => true,
            Error::Immutable { .. } => false,
            Error::Precondition { .. } => false,
            Error::Mapping { .. } => false,
            Error::Credentials { .. } => true,
            Error::Kube { source } => !matches!(
                source,
                kube::Error::Api(ae) if (400..500).contains(&ae.code)
            ),
            Error::Serialization { .. } => false,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Retry Classification
    // =========================================================================

    #[test]
    fn hard_errors_are_not_retryable() {
        assert!(!Error::config("hostPort is required").is_retryable());
        assert!(!Error::tls("bad key").is_retryable());
        assert!(!Error::immutable("default.CustomKeyword").is_retryable());
        assert!(!Error::precondition("attr", "temporalNamespaceName not set").is_retryable());
        assert!(!Error::mapping("unknown archival state").is_retryable());
    }

    #[test]
    fn network_and_cancellation_errors_are_retryable() {
        assert!(Error::connect("temporal:7233", "connection refused").is_retryable());
        assert!(Error::Cancelled {
            operation: "DescribeNamespace".to_string()
        }
        .is_retryable());
        assert!(Error::DeadlineExceeded {
            operation: "ListNamespaces".to_string()
        }
        .is_retryable());
    }

    #[test]
    fn service_errors_follow_kind() {
        let transient = Error::service("RegisterNamespace", ServiceErrorKind::Unavailable, "down");
        assert!(transient.is_retryable());

        let permanent =
            Error::service("RegisterNamespace", ServiceErrorKind::InvalidArgument, "bad");
        assert!(!permanent.is_retryable());
        assert_eq!(
            permanent.service_kind(),
            Some(ServiceErrorKind::InvalidArgument)
        );
    }

    // =========================================================================
    // Display
    // =========================================================================

    #[test]
    fn service_error_display_includes_kind() {
        let err = Error::service(
            "DeleteNamespace",
            ServiceErrorKind::PermissionDenied,
            "not allowed",
        );
        assert_eq!(
            err.to_string(),
            "DeleteNamespace failed [PermissionDenied]: not allowed"
        );
    }

    #[test]
    fn immutable_error_names_resource() {
        let err = Error::immutable("orders.CustomerId");
        assert!(err.to_string().contains("orders.CustomerId"));
        assert!(err.to_string().contains("immutable"));
    }
}
