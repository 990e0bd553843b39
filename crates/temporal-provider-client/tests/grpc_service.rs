//! GrpcTemporalService against an in-process Temporal frontend fake
//!
//! The fake answers the way a real frontend does, including the typed failure
//! details attached to NotFound, AlreadyExists and FailedPrecondition statuses,
//! so these tests exercise the client's wire mapping and error classification.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::{Code, Request, Response, Status};

use temporal_provider_client::status::{
    status_with_failure, NAMESPACE_ALREADY_EXISTS_FAILURE, NAMESPACE_INVALID_STATE_FAILURE,
    NAMESPACE_NOT_FOUND_FAILURE,
};
use temporal_provider_client::{CallContext, DeleteOutcome, GrpcTemporalService, TemporalService};
use temporal_provider_common::compare::NamespaceProjection;
use temporal_provider_common::config::TemporalServiceConfig;
use temporal_provider_common::crd::{
    ArchivalState, NamespaceState, SearchAttributeParameters, SearchAttributeType,
    TemporalNamespaceParameters,
};
use temporal_provider_common::{Error, ServiceErrorKind};
use temporal_provider_proto::enums;
use temporal_provider_proto::errordetails::{
    NamespaceAlreadyExistsFailure, NamespaceInvalidStateFailure, NamespaceNotFoundFailure,
};
use temporal_provider_proto::namespace::{NamespaceConfig, NamespaceInfo};
use temporal_provider_proto::operatorservice::operator_service_server::{
    OperatorService, OperatorServiceServer,
};
use temporal_provider_proto::operatorservice::*;
use temporal_provider_proto::workflowservice::workflow_service_server::{
    WorkflowService, WorkflowServiceServer,
};
use temporal_provider_proto::workflowservice::*;

// =============================================================================
// Fake frontend
// =============================================================================

/// Namespaces the fake returns per ListNamespaces page
const FAKE_PAGE_SIZE: usize = 2;

#[derive(Default)]
struct FakeState {
    namespaces: BTreeMap<String, DescribeNamespaceResponse>,
    search_attributes: BTreeMap<String, HashMap<String, i32>>,
    unavailable: bool,
    list_requests: usize,
    /// Listed as registered, but another actor has started deleting them
    refuse_delete: HashSet<String>,
}

#[derive(Clone, Default)]
struct FakeTemporal {
    state: Arc<Mutex<FakeState>>,
}

impl FakeTemporal {
    fn seed(&self, name: &str, state: enums::NamespaceState) {
        self.state.lock().unwrap().namespaces.insert(
            name.to_string(),
            DescribeNamespaceResponse {
                namespace_info: Some(NamespaceInfo {
                    name: name.to_string(),
                    state: state as i32,
                    id: format!("id-{name}"),
                    ..Default::default()
                }),
                config: Some(NamespaceConfig {
                    workflow_execution_retention_ttl: Some(prost_types::Duration {
                        seconds: 86_400,
                        nanos: 0,
                    }),
                    ..Default::default()
                }),
            },
        );
    }

    fn check_available(&self) -> Result<(), Status> {
        if self.state.lock().unwrap().unavailable {
            return Err(Status::unavailable("frontend is shutting down"));
        }
        Ok(())
    }
}

fn not_found(namespace: &str) -> Status {
    status_with_failure(
        Code::NotFound,
        &format!("Namespace {namespace} is not found."),
        NAMESPACE_NOT_FOUND_FAILURE,
        &NamespaceNotFoundFailure {
            namespace: namespace.to_string(),
        },
    )
}

#[tonic::async_trait]
impl WorkflowService for FakeTemporal {
    async fn register_namespace(
        &self,
        request: Request<RegisterNamespaceRequest>,
    ) -> Result<Response<RegisterNamespaceResponse>, Status> {
        self.check_available()?;
        let req = request.into_inner();
        let mut state = self.state.lock().unwrap();
        if state.namespaces.contains_key(&req.namespace) {
            return Err(status_with_failure(
                Code::AlreadyExists,
                "Namespace already exists.",
                NAMESPACE_ALREADY_EXISTS_FAILURE,
                &NamespaceAlreadyExistsFailure {},
            ));
        }
        let response = DescribeNamespaceResponse {
            namespace_info: Some(NamespaceInfo {
                name: req.namespace.clone(),
                state: enums::NamespaceState::Registered as i32,
                description: req.description,
                owner_email: req.owner_email,
                data: req.data,
                id: format!("id-{}", req.namespace),
            }),
            config: Some(NamespaceConfig {
                workflow_execution_retention_ttl: req.workflow_execution_retention_period,
                history_archival_state: req.history_archival_state,
                history_archival_uri: req.history_archival_uri,
                visibility_archival_state: req.visibility_archival_state,
                visibility_archival_uri: req.visibility_archival_uri,
            }),
        };
        state.namespaces.insert(req.namespace, response);
        Ok(Response::new(RegisterNamespaceResponse {}))
    }

    async fn describe_namespace(
        &self,
        request: Request<DescribeNamespaceRequest>,
    ) -> Result<Response<DescribeNamespaceResponse>, Status> {
        self.check_available()?;
        let req = request.into_inner();
        let state = self.state.lock().unwrap();
        let found = if req.id.is_empty() {
            state.namespaces.get(&req.namespace)
        } else {
            state.namespaces.values().find(|ns| {
                ns.namespace_info
                    .as_ref()
                    .is_some_and(|info| info.id == req.id)
            })
        };
        found
            .cloned()
            .map(Response::new)
            .ok_or_else(|| not_found(&req.namespace))
    }

    async fn list_namespaces(
        &self,
        request: Request<ListNamespacesRequest>,
    ) -> Result<Response<ListNamespacesResponse>, Status> {
        self.check_available()?;
        let req = request.into_inner();
        let mut state = self.state.lock().unwrap();
        state.list_requests += 1;

        let start: usize = if req.next_page_token.is_empty() {
            0
        } else {
            String::from_utf8_lossy(&req.next_page_token)
                .parse()
                .map_err(|_| Status::invalid_argument("bad page token"))?
        };
        let page_size = FAKE_PAGE_SIZE.min(req.page_size as usize);
        let all: Vec<_> = state.namespaces.values().cloned().collect();
        let end = (start + page_size).min(all.len());
        let next_page_token = if end < all.len() {
            end.to_string().into_bytes()
        } else {
            Vec::new()
        };

        Ok(Response::new(ListNamespacesResponse {
            namespaces: all[start..end].to_vec(),
            next_page_token,
        }))
    }

    async fn update_namespace(
        &self,
        request: Request<UpdateNamespaceRequest>,
    ) -> Result<Response<UpdateNamespaceResponse>, Status> {
        self.check_available()?;
        let req = request.into_inner();
        let mut state = self.state.lock().unwrap();
        let existing = state
            .namespaces
            .get_mut(&req.namespace)
            .ok_or_else(|| not_found(&req.namespace))?;

        let info = existing.namespace_info.get_or_insert_with(Default::default);
        if let Some(update) = req.update_info {
            info.description = update.description;
            info.owner_email = update.owner_email;
            info.data = update.data;
        }
        if let Some(config) = req.config {
            existing.config = Some(config);
        }
        Ok(Response::new(UpdateNamespaceResponse {
            namespace_info: existing.namespace_info.clone(),
            config: existing.config.clone(),
        }))
    }
}

#[tonic::async_trait]
impl OperatorService for FakeTemporal {
    async fn add_search_attributes(
        &self,
        request: Request<AddSearchAttributesRequest>,
    ) -> Result<Response<AddSearchAttributesResponse>, Status> {
        self.check_available()?;
        let req = request.into_inner();
        let mut state = self.state.lock().unwrap();
        if !state.namespaces.contains_key(&req.namespace) {
            return Err(not_found(&req.namespace));
        }
        state
            .search_attributes
            .entry(req.namespace)
            .or_default()
            .extend(req.search_attributes);
        Ok(Response::new(AddSearchAttributesResponse {}))
    }

    async fn remove_search_attributes(
        &self,
        request: Request<RemoveSearchAttributesRequest>,
    ) -> Result<Response<RemoveSearchAttributesResponse>, Status> {
        self.check_available()?;
        let req = request.into_inner();
        let mut state = self.state.lock().unwrap();
        let attributes = state.search_attributes.entry(req.namespace).or_default();
        for name in req.search_attributes {
            if attributes.remove(&name).is_none() {
                return Err(Status::not_found(format!(
                    "Search attribute {name} doesn't exist."
                )));
            }
        }
        Ok(Response::new(RemoveSearchAttributesResponse {}))
    }

    async fn list_search_attributes(
        &self,
        request: Request<ListSearchAttributesRequest>,
    ) -> Result<Response<ListSearchAttributesResponse>, Status> {
        self.check_available()?;
        let req = request.into_inner();
        let state = self.state.lock().unwrap();
        if !state.namespaces.contains_key(&req.namespace) {
            return Err(not_found(&req.namespace));
        }
        Ok(Response::new(ListSearchAttributesResponse {
            custom_attributes: state
                .search_attributes
                .get(&req.namespace)
                .cloned()
                .unwrap_or_default(),
            system_attributes: HashMap::from([(
                "WorkflowId".to_string(),
                enums::IndexedValueType::Keyword as i32,
            )]),
        }))
    }

    async fn delete_namespace(
        &self,
        request: Request<DeleteNamespaceRequest>,
    ) -> Result<Response<DeleteNamespaceResponse>, Status> {
        self.check_available()?;
        let req = request.into_inner();
        let mut state = self.state.lock().unwrap();
        let Some(mut existing) = state.namespaces.remove(&req.namespace) else {
            return Err(not_found(&req.namespace));
        };

        let info = existing.namespace_info.get_or_insert_with(Default::default);
        let draining = state.refuse_delete.contains(&req.namespace);
        if draining || info.state == enums::NamespaceState::Deleted as i32 {
            state.namespaces.insert(req.namespace.clone(), existing);
            return Err(status_with_failure(
                Code::FailedPrecondition,
                "Namespace has invalid state: Deleted.",
                NAMESPACE_INVALID_STATE_FAILURE,
                &NamespaceInvalidStateFailure {
                    namespace: req.namespace,
                    state: enums::NamespaceState::Deleted as i32,
                    allowed_states: vec![
                        enums::NamespaceState::Registered as i32,
                        enums::NamespaceState::Deprecated as i32,
                    ],
                },
            ));
        }

        // Temporal renames the namespace and removes it asynchronously
        let deleted_name = format!("{}-deleted-5f1c", req.namespace);
        info.name = deleted_name.clone();
        info.state = enums::NamespaceState::Deleted as i32;
        state.namespaces.insert(deleted_name.clone(), existing);
        state.search_attributes.remove(&req.namespace);

        Ok(Response::new(DeleteNamespaceResponse {
            deleted_namespace: deleted_name,
        }))
    }
}

async fn start_fake() -> (FakeTemporal, SocketAddr) {
    let fake = FakeTemporal::default();
    fake.seed("temporal-system", enums::NamespaceState::Registered);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tonic::transport::Server::builder()
        .add_service(WorkflowServiceServer::new(fake.clone()))
        .add_service(OperatorServiceServer::new(fake.clone()))
        .serve_with_incoming(TcpListenerStream::new(listener));
    tokio::spawn(server);

    (fake, addr)
}

async fn connect(addr: SocketAddr) -> GrpcTemporalService {
    let config = TemporalServiceConfig {
        host_port: addr.to_string(),
        ..Default::default()
    };
    GrpcTemporalService::connect(&config)
        .await
        .expect("client should connect to the fake")
}

fn cx() -> CallContext {
    CallContext::background()
}

fn params(name: &str) -> TemporalNamespaceParameters {
    TemporalNamespaceParameters::named(name)
}

// =============================================================================
// Namespaces
// =============================================================================

/// Story: A created namespace describes back to the same projection
#[tokio::test]
async fn create_then_describe_round_trips() {
    let (_fake, addr) = start_fake().await;
    let client = connect(addr).await;

    let mut desired = params("orders");
    desired.description = Some("Order workflows".to_string());
    desired.owner_email = Some("ops@example.com".to_string());
    desired.workflow_execution_retention_days = 14;
    desired.data = Some(BTreeMap::from([("team".to_string(), "payments".to_string())]));
    desired.visibility_archival_state = ArchivalState::Enabled;
    desired.visibility_archival_uri = Some("file:///tmp/visibility".to_string());

    assert!(client
        .describe_namespace_by_name(&cx(), "orders")
        .await
        .unwrap()
        .is_none());

    client.create_namespace(&cx(), &desired).await.unwrap();
    let observed = client
        .describe_namespace_by_name(&cx(), "orders")
        .await
        .unwrap()
        .expect("namespace registered");

    assert_eq!(observed.id, "id-orders");
    assert_eq!(observed.state, NamespaceState::Registered);
    assert_eq!(
        NamespaceProjection::from(&desired),
        NamespaceProjection::from(&observed)
    );

    let by_id = client
        .describe_namespace_by_id(&cx(), "id-orders")
        .await
        .unwrap()
        .expect("found by id");
    assert_eq!(by_id.name, "orders");
}

/// Story: The Test1 scenario end to end over gRPC
#[tokio::test]
async fn test1_scenario() {
    let (_fake, addr) = start_fake().await;
    let client = connect(addr).await;

    let mut desired = params("Test1");
    desired.owner_email = Some(String::new());
    client.create_namespace(&cx(), &desired).await.unwrap();

    let observed = client
        .describe_namespace_by_name(&cx(), "Test1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(observed.state.to_string(), "Registered");
    assert_eq!(observed.workflow_execution_retention_days, 30);
    assert_eq!(observed.history_archival_state.to_string(), "Disabled");
    assert_eq!(observed.visibility_archival_state.to_string(), "Disabled");

    let first = client.delete_namespace_by_name(&cx(), "Test1").await.unwrap();
    assert_eq!(first.deleted_namespace(), Some("Test1-deleted-5f1c"));
    let second = client.delete_namespace_by_name(&cx(), "Test1").await.unwrap();
    assert_eq!(second, DeleteOutcome::AlreadyAbsent);

    assert!(client.list_all_namespaces(&cx()).await.unwrap().is_empty());
}

#[tokio::test]
async fn create_is_idempotent() {
    let (_fake, addr) = start_fake().await;
    let client = connect(addr).await;

    client.create_namespace(&cx(), &params("orders")).await.unwrap();
    client.create_namespace(&cx(), &params("orders")).await.unwrap();

    let listed = client.list_all_namespaces(&cx()).await.unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn list_contains_exactly_user_namespaces() {
    let (_fake, addr) = start_fake().await;
    let client = connect(addr).await;

    client.create_namespace(&cx(), &params("a")).await.unwrap();
    client.create_namespace(&cx(), &params("b")).await.unwrap();

    let names: Vec<String> = client
        .list_all_namespaces(&cx())
        .await
        .unwrap()
        .into_iter()
        .map(|ns| ns.name)
        .collect();
    assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
}

/// Story: Listing follows page tokens until the server stops sending them
#[tokio::test]
async fn list_follows_pagination() {
    let (fake, addr) = start_fake().await;
    let client = connect(addr).await;

    for name in ["n1", "n2", "n3", "n4", "n5"] {
        client.create_namespace(&cx(), &params(name)).await.unwrap();
    }

    let listed = client.list_all_namespaces(&cx()).await.unwrap();
    assert_eq!(listed.len(), 5);
    // six namespaces including temporal-system, two per page
    assert_eq!(fake.state.lock().unwrap().list_requests, 3);
}

#[tokio::test]
async fn update_changes_only_the_target() {
    let (_fake, addr) = start_fake().await;
    let client = connect(addr).await;

    client.create_namespace(&cx(), &params("sibling")).await.unwrap();
    client.create_namespace(&cx(), &params("target")).await.unwrap();

    let mut updated = params("target");
    updated.description = Some("changed".to_string());
    updated.workflow_execution_retention_days = 3;
    updated.data = Some(BTreeMap::from([("k".to_string(), "v".to_string())]));
    client.update_namespace_by_name(&cx(), &updated).await.unwrap();

    let target = client
        .describe_namespace_by_name(&cx(), "target")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        NamespaceProjection::from(&updated),
        NamespaceProjection::from(&target)
    );

    let sibling = client
        .describe_namespace_by_name(&cx(), "sibling")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        NamespaceProjection::from(&params("sibling")),
        NamespaceProjection::from(&sibling)
    );
}

#[tokio::test]
async fn delete_of_namespace_in_deleted_state_is_a_noop() {
    let (fake, addr) = start_fake().await;
    fake.seed("draining", enums::NamespaceState::Deleted);
    let client = connect(addr).await;

    let outcome = client
        .delete_namespace_by_name(&cx(), "draining")
        .await
        .unwrap();
    assert_eq!(outcome, DeleteOutcome::InvalidState);
    assert!(client.list_all_namespaces(&cx()).await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_all_removes_every_user_namespace() {
    let (_fake, addr) = start_fake().await;
    let client = connect(addr).await;

    client.create_namespace(&cx(), &params("a")).await.unwrap();
    client.create_namespace(&cx(), &params("b")).await.unwrap();

    let deleted = client.delete_all_namespaces(&cx()).await.unwrap();
    assert_eq!(deleted, vec!["a".to_string(), "b".to_string()]);
    assert!(client.list_all_namespaces(&cx()).await.unwrap().is_empty());
    assert!(client
        .describe_namespace_by_name(&cx(), "temporal-system")
        .await
        .unwrap()
        .is_some());
}

/// Story: A namespace refused as already deleting still counts as handled
#[tokio::test]
async fn delete_all_reports_namespaces_refused_as_deleting() {
    let (fake, addr) = start_fake().await;
    let client = connect(addr).await;

    client.create_namespace(&cx(), &params("a")).await.unwrap();
    client.create_namespace(&cx(), &params("b")).await.unwrap();
    fake.state
        .lock()
        .unwrap()
        .refuse_delete
        .insert("b".to_string());

    let handled = client.delete_all_namespaces(&cx()).await.unwrap();
    assert_eq!(handled, vec!["a".to_string(), "b".to_string()]);
}

// =============================================================================
// Search attributes
// =============================================================================

#[tokio::test]
async fn search_attribute_lifecycle() {
    let (_fake, addr) = start_fake().await;
    let client = connect(addr).await;
    client.create_namespace(&cx(), &params("orders")).await.unwrap();

    let customer =
        SearchAttributeParameters::new("orders", "CustomerId", SearchAttributeType::Keyword);
    let tags = SearchAttributeParameters::new("orders", "Tags", SearchAttributeType::KeywordList);
    client.create_search_attribute(&cx(), &customer).await.unwrap();
    client.create_search_attribute(&cx(), &tags).await.unwrap();

    let observed = client
        .describe_search_attribute_by_name(&cx(), "orders", "CustomerId")
        .await
        .unwrap()
        .expect("attribute exists");
    assert_eq!(observed.type_, SearchAttributeType::Keyword);
    assert_eq!(observed.temporal_namespace_name, "orders");

    let listed = client
        .list_search_attributes_by_namespace(&cx(), "orders")
        .await
        .unwrap();
    assert_eq!(listed.len(), 2);

    client
        .delete_search_attribute_by_name(&cx(), "orders", "CustomerId")
        .await
        .unwrap();
    assert!(client
        .describe_search_attribute_by_name(&cx(), "orders", "CustomerId")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn search_attribute_in_missing_namespace_is_classified() {
    let (_fake, addr) = start_fake().await;
    let client = connect(addr).await;

    let attr = SearchAttributeParameters::new("missing", "CustomerId", SearchAttributeType::Text);
    let err = client.create_search_attribute(&cx(), &attr).await.unwrap_err();
    assert_eq!(err.service_kind(), Some(ServiceErrorKind::NamespaceNotFound));
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn unavailable_frontend_is_retryable() {
    let (fake, addr) = start_fake().await;
    let client = connect(addr).await;
    fake.state.lock().unwrap().unavailable = true;

    let err = client
        .describe_namespace_by_name(&cx(), "orders")
        .await
        .unwrap_err();
    assert_eq!(err.service_kind(), Some(ServiceErrorKind::Unavailable));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn closed_client_rejects_calls() {
    let (_fake, addr) = start_fake().await;
    let client = connect(addr).await;

    client.close();
    assert!(client.is_closed());
    let err = client.list_all_namespaces(&cx()).await.unwrap_err();
    assert!(matches!(err, Error::Closed { .. }));
}

#[tokio::test]
async fn cancelled_context_fails_before_calling() {
    let (fake, addr) = start_fake().await;
    let client = connect(addr).await;

    let cx = CallContext::background();
    cx.cancel();
    let err = client.list_all_namespaces(&cx).await.unwrap_err();
    assert!(matches!(err, Error::Cancelled { .. }));
    assert_eq!(fake.state.lock().unwrap().list_requests, 0);
}

#[tokio::test]
async fn unreachable_host_is_connect_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = TemporalServiceConfig {
        host_port: addr.to_string(),
        ..Default::default()
    };
    let err = GrpcTemporalService::connect(&config).await.err().unwrap();
    assert!(matches!(err, Error::Connect { .. }));
    assert!(err.is_retryable());
}
