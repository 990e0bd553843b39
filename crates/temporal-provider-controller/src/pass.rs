//! One reconcile pass for one managed resource
//!
//! Connect, resolve references, observe, then at most one of create, update or
//! delete, then disconnect. Conditions and the external name are written to
//! the resource as the pass goes. There are no retries within a pass; a failed
//! pass returns the error and the caller decides when to run the next one.

use std::fmt;

use kube::ResourceExt;
use tracing::{debug, error, info, instrument};

use temporal_provider_client::{CallContext, ConnectionHandle};
use temporal_provider_common::crd::{Condition, DeletionPolicy};
use temporal_provider_common::Result;

use crate::connector::Connector;
use crate::managed::{
    external_name, is_deleting, set_external_name, set_resource_condition, ManagedClient,
    ManagedResource, ResourceKind,
};

/// What a successful pass did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassOutcome {
    /// The remote object was created
    Created,
    /// A drifted remote object was updated
    Updated,
    /// The remote object already matched
    UpToDate,
    /// The remote object was deleted
    Deleted,
    /// Deletion left the remote object in place
    Orphaned,
    /// Deletion found nothing to delete
    Gone,
}

impl PassOutcome {
    /// Whether the managed resource can be forgotten after this pass
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Deleted | Self::Orphaned | Self::Gone)
    }
}

impl fmt::Display for PassOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "Created",
            Self::Updated => "Updated",
            Self::UpToDate => "UpToDate",
            Self::Deleted => "Deleted",
            Self::Orphaned => "Orphaned",
            Self::Gone => "Gone",
        };
        write!(f, "{s}")
    }
}

/// A finished pass whose cache reference may still be held
#[derive(Debug)]
pub struct HeldPass {
    /// What the pass did
    pub result: Result<PassOutcome>,
    /// The pass took a cache reference that has not been released
    pub connected: bool,
}

/// Runs reconcile passes for one resource kind
pub struct Reconciler<K: ResourceKind> {
    kind: K,
    connector: Connector,
}

impl<K: ResourceKind> Reconciler<K> {
    /// Create a reconciler
    pub fn new(kind: K, connector: Connector) -> Self {
        Self { kind, connector }
    }

    /// The connector used by this reconciler
    pub fn connector(&self) -> &Connector {
        &self.connector
    }

    /// Run one pass and release its connection
    ///
    /// The release sweeps every cached client of this kind, so passes that
    /// share the reconciler concurrently go through [`reconcile_held`] and
    /// leave the sweep to their caller.
    ///
    /// [`reconcile_held`]: Reconciler::reconcile_held
    pub async fn reconcile(&self, cx: &CallContext, resource: &mut K::Resource) -> Result<PassOutcome> {
        let pass = self.reconcile_held(cx, resource).await;
        if pass.connected {
            self.connector.disconnect();
        }
        pass.result
    }

    /// Run one pass, recording the Synced condition either way
    ///
    /// A connected pass keeps its cache reference; the caller releases it
    /// with one [`Connector::disconnect`] once no pass needs the client.
    #[instrument(skip_all, fields(kind = K::KIND, resource = %resource.name_any()))]
    pub async fn reconcile_held(&self, cx: &CallContext, resource: &mut K::Resource) -> HeldPass {
        if is_deleting(resource) && resource.deletion_policy() == DeletionPolicy::Orphan {
            info!("Deletion policy is Orphan, leaving remote object in place");
            return HeldPass {
                result: Ok(PassOutcome::Orphaned),
                connected: false,
            };
        }

        let handle = match self
            .connector
            .connect(cx, resource.provider_config_name())
            .await
        {
            Ok(handle) => handle,
            Err(e) => {
                error!(error = %e, "Failed to connect");
                set_resource_condition(resource, Condition::reconcile_error(e.to_string()));
                return HeldPass {
                    result: Err(e),
                    connected: false,
                };
            }
        };

        let result = self.run(cx, &handle, resource).await;

        match &result {
            Ok(outcome) => {
                info!(outcome = %outcome, "Reconcile pass finished");
                set_resource_condition(resource, Condition::reconcile_success());
            }
            Err(e) => {
                error!(error = %e, retryable = e.is_retryable(), "Reconcile pass failed");
                set_resource_condition(resource, Condition::reconcile_error(e.to_string()));
            }
        }
        HeldPass {
            result,
            connected: true,
        }
    }

    async fn run(
        &self,
        cx: &CallContext,
        handle: &ConnectionHandle,
        resource: &mut K::Resource,
    ) -> Result<PassOutcome> {
        self.kind.resolve_references(cx, resource).await?;

        let client = ManagedClient::new(&self.kind, handle.client().as_ref());
        let observation = client.observe(cx, resource).await?;

        if is_deleting(resource) {
            if !observation.resource_exists {
                debug!("Remote object already gone");
                return Ok(PassOutcome::Gone);
            }
            set_resource_condition(resource, Condition::deleting());
            client.delete(cx, resource).await?;
            return Ok(PassOutcome::Deleted);
        }

        if !observation.resource_exists {
            set_resource_condition(resource, Condition::creating());
            let external = client.create(cx, resource).await?;
            info!(external_name = %external, "Created remote object");
            return Ok(PassOutcome::Created);
        }

        if external_name(resource).is_none() {
            let external = K::external_name(K::parameters(resource))?;
            set_external_name(resource, external);
        }

        if observation.resource_up_to_date {
            return Ok(PassOutcome::UpToDate);
        }

        info!(
            diff = observation.diff.as_deref().unwrap_or_default(),
            "Remote object drifted, updating"
        );
        client.update(cx, resource).await?;
        Ok(PassOutcome::Updated)
    }
}
