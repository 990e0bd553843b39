//! In-memory [`TemporalService`] for tests
//!
//! Behaves like a single Temporal frontend: the `temporal-system` namespace is
//! always present, registering an existing name succeeds, deleting is
//! permissive, and search attributes require their namespace to exist.
//! Every call yields to the scheduler once before touching state, so
//! concurrent callers interleave the way they would over the network.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use temporal_provider_common::crd::{
    NamespaceState, SearchAttributeObservation, SearchAttributeParameters, SearchAttributeType,
    TemporalNamespaceObservation, TemporalNamespaceParameters,
};
use temporal_provider_common::{Error, Result, ServiceErrorKind, TEMPORAL_SYSTEM_NAMESPACE};

use crate::cache::Dialer;
use crate::context::CallContext;
use crate::service::{DeleteOutcome, TemporalService};

#[derive(Default)]
struct State {
    namespaces: BTreeMap<String, TemporalNamespaceObservation>,
    search_attributes: BTreeMap<String, BTreeMap<String, SearchAttributeType>>,
}

#[derive(Default)]
struct Backend {
    state: Mutex<State>,
    mutations: AtomicUsize,
    closes: AtomicUsize,
}

/// Thread-safe in-memory Temporal
///
/// Each value is one client session. Sessions made with [`session`] share the
/// same namespaces but are closed independently.
///
/// [`session`]: InMemoryTemporalService::session
pub struct InMemoryTemporalService {
    instance_id: String,
    backend: Arc<Backend>,
    closed: AtomicBool,
}

impl Default for InMemoryTemporalService {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTemporalService {
    /// A fresh service holding only the system namespace
    pub fn new() -> Self {
        let mut state = State::default();
        let mut system = observation(&TemporalNamespaceParameters::named(
            TEMPORAL_SYSTEM_NAMESPACE,
        ));
        system.state = NamespaceState::Registered;
        state
            .namespaces
            .insert(TEMPORAL_SYSTEM_NAMESPACE.to_string(), system);

        Self::with_backend(Arc::new(Backend {
            state: Mutex::new(state),
            ..Default::default()
        }))
    }

    fn with_backend(backend: Arc<Backend>) -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
            backend,
            closed: AtomicBool::new(false),
        }
    }

    /// A new open session on the same namespaces
    pub fn session(&self) -> Self {
        Self::with_backend(self.backend.clone())
    }

    /// Number of create, update and delete calls that reached the service
    pub fn mutation_count(&self) -> usize {
        self.backend.mutations.load(Ordering::SeqCst)
    }

    /// Number of times `close` was called on any session
    pub fn close_count(&self) -> usize {
        self.backend.closes.load(Ordering::SeqCst)
    }

    /// Put a namespace into the Deleted state without removing it
    pub fn mark_deleting(&self, name: &str) {
        if let Some(ns) = self.lock().namespaces.get_mut(name) {
            ns.state = NamespaceState::Deleted;
        }
    }

    /// Overwrite a namespace's stored retention, simulating out-of-band drift
    pub fn set_retention_days(&self, name: &str, days: u32) {
        if let Some(ns) = self.lock().namespaces.get_mut(name) {
            ns.workflow_execution_retention_days = days;
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.backend
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn open(&self) -> Result<MutexGuard<'_, State>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::Closed {
                instance: self.instance_id.clone(),
            });
        }
        Ok(self.lock())
    }

    fn mutated(&self) {
        self.backend.mutations.fetch_add(1, Ordering::SeqCst);
    }
}

/// Dials a fresh session of one in-memory Temporal, ignoring credentials
pub struct InMemoryDialer {
    service: InMemoryTemporalService,
    dials: AtomicUsize,
}

impl InMemoryDialer {
    /// Dial sessions of the given service
    pub fn new(service: &InMemoryTemporalService) -> Self {
        Self {
            service: service.session(),
            dials: AtomicUsize::new(0),
        }
    }

    /// Number of sessions dialed so far
    pub fn dial_count(&self) -> usize {
        self.dials.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Dialer for InMemoryDialer {
    async fn dial(&self, _credentials: &[u8]) -> Result<Arc<dyn TemporalService>> {
        self.dials.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(self.service.session()))
    }
}

fn observation(params: &TemporalNamespaceParameters) -> TemporalNamespaceObservation {
    TemporalNamespaceObservation {
        id: Uuid::new_v4().to_string(),
        name: params.name.clone(),
        description: params.description.clone().filter(|v| !v.is_empty()),
        owner_email: params.owner_email.clone().filter(|v| !v.is_empty()),
        workflow_execution_retention_days: params.workflow_execution_retention_days,
        data: params.data.clone().filter(|d| !d.is_empty()),
        history_archival_state: params.history_archival_state,
        history_archival_uri: params.history_archival_uri.clone().filter(|v| !v.is_empty()),
        visibility_archival_state: params.visibility_archival_state,
        visibility_archival_uri: params
            .visibility_archival_uri
            .clone()
            .filter(|v| !v.is_empty()),
        state: NamespaceState::Registered,
    }
}

fn namespace_not_found(operation: &str, name: &str) -> Error {
    Error::service(
        operation,
        ServiceErrorKind::NamespaceNotFound,
        format!("Namespace {name} is not found."),
    )
}

#[async_trait]
impl TemporalService for InMemoryTemporalService {
    fn instance_id(&self) -> String {
        self.instance_id.clone()
    }

    async fn describe_namespace_by_name(
        &self,
        cx: &CallContext,
        name: &str,
    ) -> Result<Option<TemporalNamespaceObservation>> {
        cx.run("DescribeNamespace", async {
            tokio::task::yield_now().await;
            Ok(self.open()?.namespaces.get(name).cloned())
        })
        .await
    }

    async fn describe_namespace_by_id(
        &self,
        cx: &CallContext,
        id: &str,
    ) -> Result<Option<TemporalNamespaceObservation>> {
        cx.run("DescribeNamespace", async {
            tokio::task::yield_now().await;
            Ok(self
                .open()?
                .namespaces
                .values()
                .find(|ns| ns.id == id)
                .cloned())
        })
        .await
    }

    async fn create_namespace(
        &self,
        cx: &CallContext,
        params: &TemporalNamespaceParameters,
    ) -> Result<()> {
        cx.run("RegisterNamespace", async {
            tokio::task::yield_now().await;
            let mut state = self.open()?;
            self.mutated();
            state
                .namespaces
                .entry(params.name.clone())
                .or_insert_with(|| observation(params));
            Ok(())
        })
        .await
    }

    async fn update_namespace_by_name(
        &self,
        cx: &CallContext,
        params: &TemporalNamespaceParameters,
    ) -> Result<()> {
        cx.run("UpdateNamespace", async {
            tokio::task::yield_now().await;
            let mut state = self.open()?;
            self.mutated();
            let existing = state
                .namespaces
                .get_mut(&params.name)
                .ok_or_else(|| namespace_not_found("UpdateNamespace", &params.name))?;
            let mut updated = observation(params);
            updated.id = existing.id.clone();
            updated.state = existing.state;
            *existing = updated;
            Ok(())
        })
        .await
    }

    async fn delete_namespace_by_name(
        &self,
        cx: &CallContext,
        name: &str,
    ) -> Result<DeleteOutcome> {
        cx.run("DeleteNamespace", async {
            tokio::task::yield_now().await;
            let mut state = self.open()?;
            let Some(existing) = state.namespaces.get(name) else {
                return Ok(DeleteOutcome::AlreadyAbsent);
            };
            self.mutated();
            if existing.state == NamespaceState::Deleted {
                return Ok(DeleteOutcome::InvalidState);
            }
            state.namespaces.remove(name);
            state.search_attributes.remove(name);
            Ok(DeleteOutcome::Deleted {
                deleted_namespace: name.to_string(),
            })
        })
        .await
    }

    async fn list_all_namespaces(
        &self,
        cx: &CallContext,
    ) -> Result<Vec<TemporalNamespaceObservation>> {
        cx.run("ListNamespaces", async {
            tokio::task::yield_now().await;
            Ok(self
                .open()?
                .namespaces
                .values()
                .filter(|ns| {
                    ns.name != TEMPORAL_SYSTEM_NAMESPACE && ns.state != NamespaceState::Deleted
                })
                .cloned()
                .collect())
        })
        .await
    }

    async fn delete_all_namespaces(&self, cx: &CallContext) -> Result<Vec<String>> {
        let mut handled = Vec::new();
        for ns in self.list_all_namespaces(cx).await? {
            self.delete_namespace_by_name(cx, &ns.name).await?;
            handled.push(ns.name);
        }
        Ok(handled)
    }

    async fn create_search_attribute(
        &self,
        cx: &CallContext,
        params: &SearchAttributeParameters,
    ) -> Result<()> {
        cx.run("AddSearchAttributes", async {
            tokio::task::yield_now().await;
            let namespace = params.namespace().ok_or_else(|| {
                Error::precondition(&params.name, "temporalNamespaceName is not resolved")
            })?;
            let mut state = self.open()?;
            self.mutated();
            if !state.namespaces.contains_key(namespace) {
                return Err(namespace_not_found("AddSearchAttributes", namespace));
            }
            let attributes = state
                .search_attributes
                .entry(namespace.to_string())
                .or_default();
            if attributes.contains_key(&params.name) {
                return Err(Error::service(
                    "AddSearchAttributes",
                    ServiceErrorKind::AlreadyExists,
                    format!("Search attribute {} already exists.", params.name),
                ));
            }
            attributes.insert(params.name.clone(), params.type_);
            Ok(())
        })
        .await
    }

    async fn describe_search_attribute_by_name(
        &self,
        cx: &CallContext,
        namespace: &str,
        name: &str,
    ) -> Result<Option<SearchAttributeObservation>> {
        let attributes = self.list_search_attributes_by_namespace(cx, namespace).await?;
        Ok(attributes.into_iter().find(|a| a.name == name))
    }

    async fn delete_search_attribute_by_name(
        &self,
        cx: &CallContext,
        namespace: &str,
        name: &str,
    ) -> Result<()> {
        cx.run("RemoveSearchAttributes", async {
            tokio::task::yield_now().await;
            let mut state = self.open()?;
            self.mutated();
            let removed = state
                .search_attributes
                .get_mut(namespace)
                .and_then(|attrs| attrs.remove(name));
            match removed {
                Some(_) => Ok(()),
                None => Err(Error::service(
                    "RemoveSearchAttributes",
                    ServiceErrorKind::NotFound,
                    format!("Search attribute {name} doesn't exist."),
                )),
            }
        })
        .await
    }

    async fn list_search_attributes_by_namespace(
        &self,
        cx: &CallContext,
        namespace: &str,
    ) -> Result<Vec<SearchAttributeObservation>> {
        cx.run("ListSearchAttributes", async {
            tokio::task::yield_now().await;
            let state = self.open()?;
            if !state.namespaces.contains_key(namespace) {
                return Err(namespace_not_found("ListSearchAttributes", namespace));
            }
            Ok(state
                .search_attributes
                .get(namespace)
                .map(|attrs| {
                    attrs
                        .iter()
                        .map(|(name, type_)| SearchAttributeObservation {
                            name: name.clone(),
                            type_: *type_,
                            temporal_namespace_name: namespace.to_string(),
                        })
                        .collect()
                })
                .unwrap_or_default())
        })
        .await
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.backend.closes.fetch_add(1, Ordering::SeqCst);
        }
    }
}
