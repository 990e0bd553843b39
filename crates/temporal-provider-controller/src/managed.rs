//! Generic managed-resource plumbing shared by every resource kind
//!
//! A [`ResourceKind`] supplies the kind-specific capabilities (describe,
//! create, update or reject, delete, canonical projection). [`ManagedClient`]
//! turns those into the observe/create/update/delete hooks the reconcile pass
//! drives, so the state machine exists once for all kinds.

use async_trait::async_trait;
use kube::{Resource, ResourceExt};
use serde::Serialize;
use tracing::debug;

use temporal_provider_client::{CallContext, TemporalService};
use temporal_provider_common::compare;
use temporal_provider_common::crd::{set_condition, Condition, DeletionPolicy};
use temporal_provider_common::{Result, EXTERNAL_NAME_ANNOTATION};

/// A custom resource reconciled against Temporal
pub trait ManagedResource:
    Resource<DynamicType = ()> + Clone + Serialize + Send + Sync + 'static
{
    /// Name of the ProviderConfig holding the connection credentials
    fn provider_config_name(&self) -> &str;

    /// What happens to the remote object when this resource is deleted
    fn deletion_policy(&self) -> DeletionPolicy;

    /// Current status conditions
    fn conditions(&self) -> &[Condition];

    /// Mutable status conditions, creating the status if needed
    fn conditions_mut(&mut self) -> &mut Vec<Condition>;
}

/// Insert or replace a condition on a managed resource
pub fn set_resource_condition<R: ManagedResource>(resource: &mut R, condition: Condition) {
    set_condition(resource.conditions_mut(), condition);
}

/// The external identity marker recorded on the resource, if any
pub fn external_name<R: ManagedResource>(resource: &R) -> Option<&str> {
    resource
        .annotations()
        .get(EXTERNAL_NAME_ANNOTATION)
        .map(String::as_str)
        .filter(|name| !name.is_empty())
}

/// Record the external identity marker on the resource
pub fn set_external_name<R: ManagedResource>(resource: &mut R, name: impl Into<String>) {
    resource
        .annotations_mut()
        .insert(EXTERNAL_NAME_ANNOTATION.to_string(), name.into());
}

/// Whether the resource has been marked for deletion
pub fn is_deleting<R: ManagedResource>(resource: &R) -> bool {
    resource.meta().deletion_timestamp.is_some()
}

/// Kind-specific capabilities of a managed resource
#[async_trait]
pub trait ResourceKind: Send + Sync + 'static {
    /// The custom resource type
    type Resource: ManagedResource;
    /// Desired remote state
    type Parameters: Send + Sync;
    /// Observed remote state
    type Observation: Send + Sync;
    /// Canonical view used to decide whether the remote object is up to date
    type Projection: Serialize + PartialEq + Send;

    /// Kind name for logs
    const KIND: &'static str;

    /// Desired parameters of a resource
    fn parameters(resource: &Self::Resource) -> &Self::Parameters;

    /// Resolve references in the resource's parameters before observing
    async fn resolve_references(
        &self,
        _cx: &CallContext,
        _resource: &mut Self::Resource,
    ) -> Result<()> {
        Ok(())
    }

    /// External identity marker of the remote object
    fn external_name(params: &Self::Parameters) -> Result<String>;

    /// Look up the remote object, `None` when it does not exist
    async fn describe(
        &self,
        cx: &CallContext,
        client: &dyn TemporalService,
        params: &Self::Parameters,
    ) -> Result<Option<Self::Observation>>;

    /// Create the remote object
    async fn create(
        &self,
        cx: &CallContext,
        client: &dyn TemporalService,
        params: &Self::Parameters,
    ) -> Result<()>;

    /// Bring a drifted remote object back to the desired state, or refuse
    async fn update(
        &self,
        cx: &CallContext,
        client: &dyn TemporalService,
        params: &Self::Parameters,
    ) -> Result<()>;

    /// Delete the remote object
    async fn delete(
        &self,
        cx: &CallContext,
        client: &dyn TemporalService,
        params: &Self::Parameters,
    ) -> Result<()>;

    /// Canonical projection of the desired parameters
    fn project_desired(params: &Self::Parameters) -> Self::Projection;

    /// Canonical projection of the observed state
    fn project_observed(observed: &Self::Observation) -> Self::Projection;

    /// Write an observation into the resource status
    fn record_observation(resource: &mut Self::Resource, observed: Self::Observation);
}

/// Result of observing the remote object
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExternalObservation {
    /// The remote object exists
    pub resource_exists: bool,
    /// The remote object matches the desired state
    pub resource_up_to_date: bool,
    /// Human-readable differences when not up to date
    pub diff: Option<String>,
}

impl ExternalObservation {
    /// The remote object does not exist
    pub fn absent() -> Self {
        Self::default()
    }
}

/// Observe/create/update/delete hooks for one kind on one connection
pub struct ManagedClient<'a, K: ResourceKind> {
    kind: &'a K,
    client: &'a dyn TemporalService,
}

impl<'a, K: ResourceKind> ManagedClient<'a, K> {
    /// Bind a kind to a connected client
    pub fn new(kind: &'a K, client: &'a dyn TemporalService) -> Self {
        Self { kind, client }
    }

    /// Look up the remote object and compare it with the desired state
    ///
    /// Writes the observation into the resource status when the object exists.
    pub async fn observe(
        &self,
        cx: &CallContext,
        resource: &mut K::Resource,
    ) -> Result<ExternalObservation> {
        let params = K::parameters(resource);
        let Some(observed) = self.kind.describe(cx, self.client, params).await? else {
            debug!(kind = K::KIND, resource = %resource.name_any(), "Remote object does not exist");
            return Ok(ExternalObservation::absent());
        };

        let desired = K::project_desired(params);
        let current = K::project_observed(&observed);
        let diff = compare::diff(&desired, &current);
        K::record_observation(resource, observed);

        debug!(
            kind = K::KIND,
            resource = %resource.name_any(),
            up_to_date = diff.is_none(),
            "Observed remote object"
        );
        Ok(ExternalObservation {
            resource_exists: true,
            resource_up_to_date: diff.is_none(),
            diff,
        })
    }

    /// Create the remote object and record its external name
    pub async fn create(&self, cx: &CallContext, resource: &mut K::Resource) -> Result<String> {
        let params = K::parameters(resource);
        let external = K::external_name(params)?;
        self.kind.create(cx, self.client, params).await?;
        set_external_name(resource, external.clone());
        Ok(external)
    }

    /// Update the remote object
    pub async fn update(&self, cx: &CallContext, resource: &K::Resource) -> Result<()> {
        self.kind
            .update(cx, self.client, K::parameters(resource))
            .await
    }

    /// Delete the remote object
    pub async fn delete(&self, cx: &CallContext, resource: &K::Resource) -> Result<()> {
        self.kind
            .delete(cx, self.client, K::parameters(resource))
            .await
    }
}
