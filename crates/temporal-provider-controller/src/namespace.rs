//! TemporalNamespace reconciliation
//!
//! The namespace name is the external identity. Observations carry the remote
//! namespace state, which drives the Ready condition.

use async_trait::async_trait;
use tracing::info;

use temporal_provider_client::{CallContext, TemporalService};
use temporal_provider_common::compare::NamespaceProjection;
use temporal_provider_common::crd::{
    Condition, DeletionPolicy, NamespaceState, TemporalNamespace, TemporalNamespaceObservation,
    TemporalNamespaceParameters,
};
use temporal_provider_common::Result;

use crate::managed::{set_resource_condition, ManagedResource, ResourceKind};

impl ManagedResource for TemporalNamespace {
    fn provider_config_name(&self) -> &str {
        &self.spec.provider_config_ref.name
    }

    fn deletion_policy(&self) -> DeletionPolicy {
        self.spec.deletion_policy
    }

    fn conditions(&self) -> &[Condition] {
        self.status
            .as_ref()
            .map(|s| s.conditions.as_slice())
            .unwrap_or_default()
    }

    fn conditions_mut(&mut self) -> &mut Vec<Condition> {
        &mut self.status.get_or_insert_with(Default::default).conditions
    }
}

/// Ready condition derived from the remote namespace state
///
/// `Deprecated` leaves the current condition untouched.
pub fn readiness(state: NamespaceState) -> Option<Condition> {
    let message = format!("Namespace.State = {state}");
    match state {
        NamespaceState::Registered => Some(Condition::available(message)),
        NamespaceState::Unspecified => Some(Condition::unavailable(message)),
        NamespaceState::Deleted => Some(Condition::deleting().with_message(message)),
        NamespaceState::Deprecated => None,
    }
}

/// Namespace capabilities for the generic reconciler
#[derive(Clone, Copy, Debug, Default)]
pub struct NamespaceKind;

#[async_trait]
impl ResourceKind for NamespaceKind {
    type Resource = TemporalNamespace;
    type Parameters = TemporalNamespaceParameters;
    type Observation = TemporalNamespaceObservation;
    type Projection = NamespaceProjection;

    const KIND: &'static str = "TemporalNamespace";

    fn parameters(resource: &TemporalNamespace) -> &TemporalNamespaceParameters {
        &resource.spec.for_provider
    }

    fn external_name(params: &TemporalNamespaceParameters) -> Result<String> {
        Ok(params.name.clone())
    }

    async fn describe(
        &self,
        cx: &CallContext,
        client: &dyn TemporalService,
        params: &TemporalNamespaceParameters,
    ) -> Result<Option<TemporalNamespaceObservation>> {
        client.describe_namespace_by_name(cx, &params.name).await
    }

    async fn create(
        &self,
        cx: &CallContext,
        client: &dyn TemporalService,
        params: &TemporalNamespaceParameters,
    ) -> Result<()> {
        client.create_namespace(cx, params).await
    }

    async fn update(
        &self,
        cx: &CallContext,
        client: &dyn TemporalService,
        params: &TemporalNamespaceParameters,
    ) -> Result<()> {
        client.update_namespace_by_name(cx, params).await
    }

    async fn delete(
        &self,
        cx: &CallContext,
        client: &dyn TemporalService,
        params: &TemporalNamespaceParameters,
    ) -> Result<()> {
        let outcome = client.delete_namespace_by_name(cx, &params.name).await?;
        info!(namespace = %params.name, outcome = ?outcome, "Namespace delete finished");
        Ok(())
    }

    fn project_desired(params: &TemporalNamespaceParameters) -> NamespaceProjection {
        NamespaceProjection::from(params)
    }

    fn project_observed(observed: &TemporalNamespaceObservation) -> NamespaceProjection {
        NamespaceProjection::from(observed)
    }

    fn record_observation(resource: &mut TemporalNamespace, observed: TemporalNamespaceObservation) {
        if let Some(condition) = readiness(observed.state) {
            set_resource_condition(resource, condition);
        }
        resource
            .status
            .get_or_insert_with(Default::default)
            .at_provider = Some(observed);
    }
}
