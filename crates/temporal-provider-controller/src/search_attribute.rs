//! SearchAttribute reconciliation
//!
//! Every field of a search attribute is part of its identity, so a drifted
//! attribute is never updated in place. The external name is
//! `<namespace>.<attribute>`.

use async_trait::async_trait;
use kube::ResourceExt;
use tracing::debug;

use temporal_provider_client::{CallContext, TemporalService};
use temporal_provider_common::compare::SearchAttributeProjection;
use temporal_provider_common::crd::{
    Condition, DeletionPolicy, SearchAttribute, SearchAttributeObservation,
    SearchAttributeParameters,
};
use temporal_provider_common::{Error, Result, ServiceErrorKind};

use crate::managed::{set_resource_condition, ManagedResource, ResourceKind};
use crate::resolver::NamespaceResolver;

impl ManagedResource for SearchAttribute {
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

fn resolved_namespace<'a>(params: &'a SearchAttributeParameters) -> Result<&'a str> {
    params
        .namespace()
        .ok_or_else(|| Error::precondition(&params.name, "TemporalNamespaceName not set"))
}

/// Search attribute capabilities for the generic reconciler
#[derive(Clone)]
pub struct SearchAttributeKind {
    resolver: NamespaceResolver,
}

impl SearchAttributeKind {
    /// Create the kind with a resolver for namespace references
    pub fn new(resolver: NamespaceResolver) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl ResourceKind for SearchAttributeKind {
    type Resource = SearchAttribute;
    type Parameters = SearchAttributeParameters;
    type Observation = SearchAttributeObservation;
    type Projection = SearchAttributeProjection;

    const KIND: &'static str = "SearchAttribute";

    fn parameters(resource: &SearchAttribute) -> &SearchAttributeParameters {
        &resource.spec.for_provider
    }

    async fn resolve_references(&self, cx: &CallContext, resource: &mut SearchAttribute) -> Result<()> {
        let name = resource.name_any();
        let namespace = self
            .resolver
            .resolve(cx, &name, &resource.spec.for_provider)
            .await?;
        resource.spec.for_provider.temporal_namespace_name = Some(namespace);
        Ok(())
    }

    fn external_name(params: &SearchAttributeParameters) -> Result<String> {
        Ok(format!("{}.{}", resolved_namespace(params)?, params.name))
    }

    /// A missing namespace means the attribute cannot exist either
    async fn describe(
        &self,
        cx: &CallContext,
        client: &dyn TemporalService,
        params: &SearchAttributeParameters,
    ) -> Result<Option<SearchAttributeObservation>> {
        let namespace = resolved_namespace(params)?;
        match client
            .describe_search_attribute_by_name(cx, namespace, &params.name)
            .await
        {
            Err(e)
                if matches!(
                    e.service_kind(),
                    Some(ServiceErrorKind::NamespaceNotFound)
                ) =>
            {
                debug!(namespace = %namespace, search_attribute = %params.name, "Owning namespace does not exist");
                Ok(None)
            }
            other => other,
        }
    }

    async fn create(
        &self,
        cx: &CallContext,
        client: &dyn TemporalService,
        params: &SearchAttributeParameters,
    ) -> Result<()> {
        client.create_search_attribute(cx, params).await
    }

    async fn update(
        &self,
        _cx: &CallContext,
        _client: &dyn TemporalService,
        params: &SearchAttributeParameters,
    ) -> Result<()> {
        Err(Error::immutable(Self::external_name(params)?))
    }

    async fn delete(
        &self,
        cx: &CallContext,
        client: &dyn TemporalService,
        params: &SearchAttributeParameters,
    ) -> Result<()> {
        let namespace = resolved_namespace(params)?;
        client
            .delete_search_attribute_by_name(cx, namespace, &params.name)
            .await
    }

    fn project_desired(params: &SearchAttributeParameters) -> SearchAttributeProjection {
        SearchAttributeProjection::from(params)
    }

    fn project_observed(observed: &SearchAttributeObservation) -> SearchAttributeProjection {
        SearchAttributeProjection::from(observed)
    }

    fn record_observation(resource: &mut SearchAttribute, observed: SearchAttributeObservation) {
        set_resource_condition(resource, Condition::available("SearchAttribute exists"));
        resource
            .status
            .get_or_insert_with(Default::default)
            .at_provider = Some(observed);
    }
}
