//! Composition root: one reconciler and connection cache per resource kind

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use kube::ResourceExt;
use tracing::{info, warn};

use temporal_provider_client::{CallContext, ConnectionCache, Dialer};

use crate::connector::Connector;
use crate::credentials::CredentialSource;
use crate::managed::ResourceKind;
use crate::manifest::Manifest;
use crate::namespace::NamespaceKind;
use crate::pass::{HeldPass, Reconciler};
use crate::resolver::{NamespaceResolver, TemporalNamespaceLookup};
use crate::search_attribute::SearchAttributeKind;

/// Default time budget of one reconcile pass
pub const DEFAULT_PASS_TIMEOUT: Duration = Duration::from_secs(30);

/// Counts of one reconcile round
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RoundSummary {
    /// Passes that succeeded
    pub succeeded: usize,
    /// Passes that failed
    pub failed: usize,
    /// Resources dropped after their deletion finished
    pub removed: usize,
}

impl RoundSummary {
    fn merge(&mut self, other: RoundSummary) {
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.removed += other.removed;
    }
}

/// Reconciles TemporalNamespace and SearchAttribute resources
pub struct Provider {
    namespaces: Reconciler<NamespaceKind>,
    search_attributes: Reconciler<SearchAttributeKind>,
    pass_timeout: Duration,
}

impl Provider {
    /// Wire reconcilers for both kinds
    ///
    /// Each kind gets its own connection cache; both share the dialer and the
    /// credential source.
    pub fn new(
        credentials: Arc<dyn CredentialSource>,
        lookup: Arc<dyn TemporalNamespaceLookup>,
        dialer: Arc<dyn Dialer>,
    ) -> Self {
        let namespace_cache = Arc::new(ConnectionCache::new(NamespaceKind::KIND, dialer.clone()));
        let attribute_cache = Arc::new(ConnectionCache::new(SearchAttributeKind::KIND, dialer));

        Self {
            namespaces: Reconciler::new(
                NamespaceKind,
                Connector::new(credentials.clone(), namespace_cache),
            ),
            search_attributes: Reconciler::new(
                SearchAttributeKind::new(NamespaceResolver::new(lookup)),
                Connector::new(credentials, attribute_cache),
            ),
            pass_timeout: DEFAULT_PASS_TIMEOUT,
        }
    }

    /// Bound every pass by this timeout
    pub fn with_pass_timeout(mut self, timeout: Duration) -> Self {
        self.pass_timeout = timeout;
        self
    }

    /// The namespace reconciler
    pub fn namespaces(&self) -> &Reconciler<NamespaceKind> {
        &self.namespaces
    }

    /// The search attribute reconciler
    pub fn search_attributes(&self) -> &Reconciler<SearchAttributeKind> {
        &self.search_attributes
    }

    /// Run one pass for every resource in the manifest
    ///
    /// Namespaces go first so attributes created in the same round find their
    /// namespace. Passes of one kind run concurrently, and their cache
    /// references are swept only once all of them finished. Resources whose
    /// deletion finished are removed from the manifest.
    pub async fn reconcile_all(&self, cx: &CallContext, manifest: &mut Manifest) -> RoundSummary {
        let mut summary = self
            .reconcile_kind(cx, &self.namespaces, &mut manifest.namespaces)
            .await;
        summary.merge(
            self.reconcile_kind(cx, &self.search_attributes, &mut manifest.search_attributes)
                .await,
        );

        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            removed = summary.removed,
            "Reconcile round finished"
        );
        summary
    }

    async fn reconcile_kind<K: ResourceKind>(
        &self,
        cx: &CallContext,
        reconciler: &Reconciler<K>,
        resources: &mut Vec<K::Resource>,
    ) -> RoundSummary {
        let passes: Vec<HeldPass> = join_all(resources.iter_mut().map(|resource| {
            let cx = cx.child().with_timeout(self.pass_timeout);
            async move { reconciler.reconcile_held(&cx, resource).await }
        }))
        .await;

        // Release only after every pass of the round is done with its client
        let connected = passes.iter().filter(|pass| pass.connected).count();
        for _ in 0..connected {
            reconciler.connector().disconnect();
        }

        let mut summary = RoundSummary::default();
        let mut finished = Vec::with_capacity(passes.len());
        for (resource, pass) in resources.iter().zip(&passes) {
            match &pass.result {
                Ok(outcome) => {
                    summary.succeeded += 1;
                    finished.push(outcome.is_final());
                }
                Err(e) => {
                    summary.failed += 1;
                    finished.push(false);
                    warn!(
                        kind = K::KIND,
                        resource = %resource.name_any(),
                        error = %e,
                        "Pass failed, will retry next round"
                    );
                }
            }
        }

        let mut flags = finished.into_iter();
        resources.retain(|resource| {
            let done = flags.next().unwrap_or(false);
            if done {
                info!(kind = K::KIND, resource = %resource.name_any(), "Deletion finished");
                summary.removed += 1;
            }
            !done
        });
        summary
    }
}
