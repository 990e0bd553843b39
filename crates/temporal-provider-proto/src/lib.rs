//! Protocol buffer definitions for the Temporal frontend APIs used by the provider.
//!
//! Only the namespace and search attribute management surface is compiled:
//!
//! - `WorkflowService`: RegisterNamespace, DescribeNamespace, ListNamespaces,
//!   UpdateNamespace
//! - `OperatorService`: AddSearchAttributes, RemoveSearchAttributes,
//!   ListSearchAttributes, DeleteNamespace
//! - `errordetails`: the failure messages Temporal attaches to a gRPC status,
//!   decoded through [`google::rpc::Status`]
//!
//! Message field numbers follow the upstream `temporalio/api` definitions so
//! the generated clients talk to a real frontend unchanged.

// Generated protobuf code doesn't have docs
#![allow(missing_docs)]

/// Temporal API packages
pub mod temporal {
    /// `temporal.api.*`
    pub mod api {
        /// Shared enums
        pub mod enums {
            /// Version 1
            pub mod v1 {
                tonic::include_proto!("temporal.api.enums.v1");
            }
        }

        /// Namespace messages
        pub mod namespace {
            /// Version 1
            pub mod v1 {
                tonic::include_proto!("temporal.api.namespace.v1");
            }
        }

        /// Failure details attached to gRPC statuses
        pub mod errordetails {
            /// Version 1
            pub mod v1 {
                tonic::include_proto!("temporal.api.errordetails.v1");
            }
        }

        /// Frontend workflow service
        pub mod workflowservice {
            /// Version 1
            pub mod v1 {
                tonic::include_proto!("temporal.api.workflowservice.v1");
            }
        }

        /// Frontend operator service
        pub mod operatorservice {
            /// Version 1
            pub mod v1 {
                tonic::include_proto!("temporal.api.operatorservice.v1");
            }
        }
    }
}

/// Google RPC status envelope
pub mod google {
    /// `google.rpc`
    pub mod rpc {
        tonic::include_proto!("google.rpc");
    }
}

pub use temporal::api::enums::v1 as enums;
pub use temporal::api::errordetails::v1 as errordetails;
pub use temporal::api::namespace::v1 as namespace;
pub use temporal::api::operatorservice::v1 as operatorservice;
pub use temporal::api::workflowservice::v1 as workflowservice;
