//! The remote operations the reconcilers depend on

use async_trait::async_trait;

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

use temporal_provider_common::crd::{
    SearchAttributeObservation, SearchAttributeParameters, TemporalNamespaceObservation,
    TemporalNamespaceParameters,
};
use temporal_provider_common::Result;

use crate::context::CallContext;

/// How a permissive namespace delete ended
///
/// Every variant is a success for the caller. The distinction is kept for
/// logging and tests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The namespace was handed to Temporal for deletion
    Deleted {
        /// Name Temporal reported for the namespace being deleted
        deleted_namespace: String,
    },
    /// The namespace did not exist before the call
    AlreadyAbsent,
    /// Temporal refused because the namespace is already being deleted
    InvalidState,
    /// The namespace vanished between describe and delete
    NotFoundAtDelete,
}

impl DeleteOutcome {
    /// The deleted marker, present only when this call started the deletion
    pub fn deleted_namespace(&self) -> Option<&str> {
        match self {
            Self::Deleted { deleted_namespace } => Some(deleted_namespace),
            _ => None,
        }
    }
}

/// Namespace and search attribute operations on one Temporal cluster
///
/// Every call takes a [`CallContext`] and fails with a retryable error when
/// the context is cancelled or its deadline passes.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait TemporalService: Send + Sync {
    /// Unique id of this client instance
    fn instance_id(&self) -> String;

    /// Describe a namespace, `None` when it does not exist
    async fn describe_namespace_by_name(
        &self,
        cx: &CallContext,
        name: &str,
    ) -> Result<Option<TemporalNamespaceObservation>>;

    /// Describe a namespace by its Temporal id, `None` when it does not exist
    async fn describe_namespace_by_id(
        &self,
        cx: &CallContext,
        id: &str,
    ) -> Result<Option<TemporalNamespaceObservation>>;

    /// Register a namespace; an existing namespace of that name is success
    async fn create_namespace(
        &self,
        cx: &CallContext,
        params: &TemporalNamespaceParameters,
    ) -> Result<()>;

    /// Replace every mutable field of a namespace
    async fn update_namespace_by_name(
        &self,
        cx: &CallContext,
        params: &TemporalNamespaceParameters,
    ) -> Result<()>;

    /// Delete a namespace, succeeding when it is already gone or going
    async fn delete_namespace_by_name(&self, cx: &CallContext, name: &str)
        -> Result<DeleteOutcome>;

    /// All user namespaces that are not deleted
    async fn list_all_namespaces(&self, cx: &CallContext)
        -> Result<Vec<TemporalNamespaceObservation>>;

    /// Delete every listed namespace, returning every name handled
    ///
    /// A namespace Temporal refuses to delete because it is already being
    /// deleted counts as handled, like any other permissive outcome.
    async fn delete_all_namespaces(&self, cx: &CallContext) -> Result<Vec<String>>;

    /// Add a custom search attribute to its namespace
    async fn create_search_attribute(
        &self,
        cx: &CallContext,
        params: &SearchAttributeParameters,
    ) -> Result<()>;

    /// Find a custom search attribute by name, `None` when it does not exist
    async fn describe_search_attribute_by_name(
        &self,
        cx: &CallContext,
        namespace: &str,
        name: &str,
    ) -> Result<Option<SearchAttributeObservation>>;

    /// Remove a custom search attribute
    async fn delete_search_attribute_by_name(
        &self,
        cx: &CallContext,
        namespace: &str,
        name: &str,
    ) -> Result<()>;

    /// Custom search attributes of a namespace, sorted by name
    async fn list_search_attributes_by_namespace(
        &self,
        cx: &CallContext,
        namespace: &str,
    ) -> Result<Vec<SearchAttributeObservation>>;

    /// Release the underlying connection; later calls fail with `Closed`
    fn close(&self);
}
