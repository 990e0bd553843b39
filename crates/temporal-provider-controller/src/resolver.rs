//! Resolution of a search attribute's owning namespace
//!
//! The namespace name comes from the direct `temporalNamespaceName` value, or
//! from the TemporalNamespace object named by `temporalNamespaceNameRef`, or
//! from the first TemporalNamespace (by object name) matching
//! `temporalNamespaceNameSelector`.

use std::sync::Arc;

use async_trait::async_trait;
use kube::api::Api;
use kube::{Client, ResourceExt};
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use temporal_provider_client::CallContext;
use temporal_provider_common::crd::{SearchAttributeParameters, TemporalNamespace};
use temporal_provider_common::{Error, Result};

/// Source of TemporalNamespace objects for reference resolution
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TemporalNamespaceLookup: Send + Sync {
    /// Get a TemporalNamespace by object name
    async fn get(&self, name: &str) -> Result<Option<TemporalNamespace>>;

    /// List all TemporalNamespace objects
    async fn list(&self) -> Result<Vec<TemporalNamespace>>;
}

/// Lookup over a fixed set of objects, e.g. those loaded from a manifest
#[derive(Clone, Debug, Default)]
pub struct StaticNamespaceLookup {
    objects: Vec<TemporalNamespace>,
}

impl StaticNamespaceLookup {
    /// Create a lookup over the given objects
    pub fn new(objects: Vec<TemporalNamespace>) -> Self {
        Self { objects }
    }
}

#[async_trait]
impl TemporalNamespaceLookup for StaticNamespaceLookup {
    async fn get(&self, name: &str) -> Result<Option<TemporalNamespace>> {
        Ok(self.objects.iter().find(|o| o.name_any() == name).cloned())
    }

    async fn list(&self) -> Result<Vec<TemporalNamespace>> {
        Ok(self.objects.clone())
    }
}

/// Lookup reading TemporalNamespace objects from the cluster
pub struct KubeNamespaceLookup {
    client: Client,
}

impl KubeNamespaceLookup {
    /// Create a lookup using the given client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TemporalNamespaceLookup for KubeNamespaceLookup {
    async fn get(&self, name: &str) -> Result<Option<TemporalNamespace>> {
        let api: Api<TemporalNamespace> = Api::all(self.client.clone());
        match api.get(name).await {
            Ok(ns) => Ok(Some(ns)),
            Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> Result<Vec<TemporalNamespace>> {
        let api: Api<TemporalNamespace> = Api::all(self.client.clone());
        let list = api.list(&Default::default()).await?;
        Ok(list.items)
    }
}

/// Resolves the namespace a search attribute belongs to
#[derive(Clone)]
pub struct NamespaceResolver {
    lookup: Arc<dyn TemporalNamespaceLookup>,
}

impl NamespaceResolver {
    /// Create a resolver backed by the given lookup
    pub fn new(lookup: Arc<dyn TemporalNamespaceLookup>) -> Self {
        Self { lookup }
    }

    /// The Temporal namespace name for these parameters
    ///
    /// Fails with a precondition error when nothing resolves.
    pub async fn resolve(
        &self,
        cx: &CallContext,
        resource: &str,
        params: &SearchAttributeParameters,
    ) -> Result<String> {
        if let Some(name) = params.namespace() {
            return Ok(name.to_string());
        }

        if let Some(reference) = &params.temporal_namespace_name_ref {
            let found = cx
                .run("GetTemporalNamespace", self.lookup.get(&reference.name))
                .await?;
            let Some(ns) = found else {
                return Err(Error::precondition(
                    resource,
                    format!("referenced TemporalNamespace {} not found", reference.name),
                ));
            };
            debug!(resource = %resource, reference = %reference.name, "Resolved namespace reference");
            return namespace_name(resource, &ns);
        }

        if let Some(selector) = &params.temporal_namespace_name_selector {
            let mut matching: Vec<TemporalNamespace> = cx
                .run("ListTemporalNamespaces", self.lookup.list())
                .await?
                .into_iter()
                .filter(|ns| selector.matches(ns.labels()))
                .collect();
            matching.sort_by_key(|ns| ns.name_any());

            let Some(ns) = matching.first() else {
                return Err(Error::precondition(
                    resource,
                    "no TemporalNamespace matches temporalNamespaceNameSelector",
                ));
            };
            debug!(resource = %resource, selected = %ns.name_any(), "Resolved namespace selector");
            return namespace_name(resource, ns);
        }

        Err(Error::precondition(resource, "TemporalNamespaceName not set"))
    }
}

fn namespace_name(resource: &str, ns: &TemporalNamespace) -> Result<String> {
    let name = &ns.spec.for_provider.name;
    if name.is_empty() {
        return Err(Error::precondition(
            resource,
            format!("TemporalNamespace {} has no forProvider.name", ns.name_any()),
        ));
    }
    Ok(name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use temporal_provider_common::crd::{
        DeletionPolicy, Reference, SearchAttributeType, Selector, TemporalNamespaceParameters,
        TemporalNamespaceSpec,
    };

    fn temporal_namespace(object: &str, name: &str, team: &str) -> TemporalNamespace {
        let mut ns = TemporalNamespace::new(
            object,
            TemporalNamespaceSpec {
                provider_config_ref: Reference::new("default"),
                deletion_policy: DeletionPolicy::Delete,
                for_provider: TemporalNamespaceParameters::named(name),
            },
        );
        ns.metadata.labels = Some(BTreeMap::from([("team".to_string(), team.to_string())]));
        ns
    }

    fn unresolved() -> SearchAttributeParameters {
        let mut params = SearchAttributeParameters::new("", "CustomerId", SearchAttributeType::Keyword);
        params.temporal_namespace_name = None;
        params
    }

    fn static_resolver(objects: Vec<TemporalNamespace>) -> NamespaceResolver {
        NamespaceResolver::new(Arc::new(StaticNamespaceLookup::new(objects)))
    }

    // =========================================================================
    // Resolution order
    // =========================================================================

    #[tokio::test]
    async fn direct_name_wins_without_lookup() {
        let mut lookup = MockTemporalNamespaceLookup::new();
        lookup.expect_get().never();
        lookup.expect_list().never();
        let resolver = NamespaceResolver::new(Arc::new(lookup));

        let mut params = unresolved();
        params.temporal_namespace_name = Some("orders".to_string());
        params.temporal_namespace_name_ref = Some(Reference::new("ignored"));

        let name = resolver
            .resolve(&CallContext::background(), "attr", &params)
            .await
            .unwrap();
        assert_eq!(name, "orders");
    }

    /// Story: A reference resolves to the referenced object's namespace name
    ///
    /// The object name and the Temporal namespace name may differ; the
    /// Temporal name is what the attribute is created in.
    #[tokio::test]
    async fn reference_resolves_to_for_provider_name() {
        let resolver = static_resolver(vec![temporal_namespace("orders-ns", "orders", "payments")]);

        let mut params = unresolved();
        params.temporal_namespace_name_ref = Some(Reference::new("orders-ns"));

        let name = resolver
            .resolve(&CallContext::background(), "attr", &params)
            .await
            .unwrap();
        assert_eq!(name, "orders");
    }

    #[tokio::test]
    async fn dangling_reference_is_precondition_error() {
        let resolver = static_resolver(vec![]);

        let mut params = unresolved();
        params.temporal_namespace_name_ref = Some(Reference::new("missing"));

        let err = resolver
            .resolve(&CallContext::background(), "attr", &params)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Precondition { .. }));
        assert!(err.to_string().contains("missing"));
        assert!(!err.is_retryable());
    }

    /// Story: A selector picks the first matching object by name
    #[tokio::test]
    async fn selector_takes_first_match_by_object_name() {
        let resolver = static_resolver(vec![
            temporal_namespace("zeta", "zeta-ns", "payments"),
            temporal_namespace("alpha", "alpha-ns", "payments"),
            temporal_namespace("beta", "beta-ns", "search"),
        ]);

        let mut params = unresolved();
        params.temporal_namespace_name_selector = Some(Selector {
            match_labels: BTreeMap::from([("team".to_string(), "payments".to_string())]),
        });

        let name = resolver
            .resolve(&CallContext::background(), "attr", &params)
            .await
            .unwrap();
        assert_eq!(name, "alpha-ns");
    }

    #[tokio::test]
    async fn selector_without_match_is_precondition_error() {
        let resolver = static_resolver(vec![temporal_namespace("beta", "beta-ns", "search")]);

        let mut params = unresolved();
        params.temporal_namespace_name_selector = Some(Selector {
            match_labels: BTreeMap::from([("team".to_string(), "payments".to_string())]),
        });

        let err = resolver
            .resolve(&CallContext::background(), "attr", &params)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Precondition { .. }));
    }

    #[tokio::test]
    async fn nothing_set_is_precondition_error() {
        let resolver = static_resolver(vec![]);
        let err = resolver
            .resolve(&CallContext::background(), "attr", &unresolved())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("TemporalNamespaceName not set"));
    }

    #[tokio::test]
    async fn lookup_failure_propagates() {
        let mut lookup = MockTemporalNamespaceLookup::new();
        lookup
            .expect_get()
            .returning(|_| Err(Error::credentials("default", "api server unreachable")));
        let resolver = NamespaceResolver::new(Arc::new(lookup));

        let mut params = unresolved();
        params.temporal_namespace_name_ref = Some(Reference::new("orders"));

        let err = resolver
            .resolve(&CallContext::background(), "attr", &params)
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }
}
