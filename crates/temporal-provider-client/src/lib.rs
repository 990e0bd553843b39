//! Temporal service client for the provider
//!
//! - [`TemporalService`]: the namespace and search attribute operations the
//!   reconcilers call, implemented over gRPC by [`GrpcTemporalService`]
//! - [`CallContext`]: cancellation and deadline carried through every call
//! - [`ConnectionCache`]: shares one client per credential set across
//!   concurrently reconciled resources and closes it when unused

#![deny(missing_docs)]

pub mod cache;
pub mod context;
pub mod grpc;
pub mod mapping;
pub mod service;
pub mod status;
pub mod tls;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use cache::{ConnectionCache, ConnectionHandle, Dialer, GrpcDialer};
pub use context::CallContext;
pub use grpc::GrpcTemporalService;
pub use service::{DeleteOutcome, TemporalService};

#[cfg(any(test, feature = "testing"))]
pub use service::MockTemporalService;
#[cfg(any(test, feature = "testing"))]
pub use cache::MockDialer;
