//! gRPC implementation of [`TemporalService`]
//!
//! Namespace registration, description and updates go through the frontend
//! `WorkflowService`; namespace deletion and search attributes go through the
//! `OperatorService`. Both clients share one channel.

use std::future::Future;
use std::sync::Mutex;

use async_trait::async_trait;
use tonic::transport::{Channel, Endpoint};
use tonic::Status;
use tracing::{debug, info, warn};
use uuid::Uuid;

use temporal_provider_common::config::TemporalServiceConfig;
use temporal_provider_common::crd::{
    NamespaceState, SearchAttributeObservation, SearchAttributeParameters,
    TemporalNamespaceObservation, TemporalNamespaceParameters,
};
use temporal_provider_common::{Error, Result, ServiceErrorKind, TEMPORAL_SYSTEM_NAMESPACE};
use temporal_provider_proto::operatorservice::operator_service_client::OperatorServiceClient;
use temporal_provider_proto::operatorservice::{
    DeleteNamespaceRequest, ListSearchAttributesRequest, RemoveSearchAttributesRequest,
};
use temporal_provider_proto::workflowservice::workflow_service_client::WorkflowServiceClient;
use temporal_provider_proto::workflowservice::{DescribeNamespaceRequest, ListNamespacesRequest};

use crate::context::CallContext;
use crate::mapping;
use crate::service::{DeleteOutcome, TemporalService};
use crate::status;
use crate::tls::ClientMtlsConfig;

/// Namespaces requested per ListNamespaces page
pub const LIST_PAGE_SIZE: i32 = 100;

/// Upper bound on ListNamespaces pages for one listing
pub const MAX_LIST_PAGES: usize = 1000;

const REGISTER_NAMESPACE: &str = "RegisterNamespace";
const DESCRIBE_NAMESPACE: &str = "DescribeNamespace";
const UPDATE_NAMESPACE: &str = "UpdateNamespace";
const LIST_NAMESPACES: &str = "ListNamespaces";
const DELETE_NAMESPACE: &str = "DeleteNamespace";
const ADD_SEARCH_ATTRIBUTES: &str = "AddSearchAttributes";
const REMOVE_SEARCH_ATTRIBUTES: &str = "RemoveSearchAttributes";
const LIST_SEARCH_ATTRIBUTES: &str = "ListSearchAttributes";

/// Temporal client over a single gRPC channel
pub struct GrpcTemporalService {
    instance_id: String,
    host_port: String,
    channel: Mutex<Option<Channel>>,
}

impl GrpcTemporalService {
    /// Dial the frontend described by the config
    ///
    /// The connection is established eagerly so that a bad address or bad
    /// TLS material fails here rather than on the first call.
    pub async fn connect(config: &TemporalServiceConfig) -> Result<Self> {
        config.validate()?;

        let mut endpoint = Endpoint::from_shared(config.endpoint_uri())
            .map_err(|e| Error::connect(&config.host_port, e.to_string()))?
            .connect_timeout(config.connect_timeout());

        if let Some(material) = config.tls_material().await? {
            let tls = ClientMtlsConfig::new(material, config.server_domain());
            endpoint = endpoint
                .tls_config(tls.to_tonic_config()?)
                .map_err(|e| Error::tls(e.to_string()))?;
        }

        info!(
            host_port = %config.host_port,
            tls = config.use_tls,
            "Connecting to Temporal"
        );

        let channel = endpoint
            .connect()
            .await
            .map_err(|e| Error::connect(&config.host_port, transport_message(&e)))?;

        Ok(Self::from_channel(channel, config.host_port.clone()))
    }

    /// Wrap an existing channel
    pub fn from_channel(channel: Channel, host_port: impl Into<String>) -> Self {
        let service = Self {
            instance_id: Uuid::new_v4().to_string(),
            host_port: host_port.into(),
            channel: Mutex::new(Some(channel)),
        };
        debug!(
            instance = %service.instance_id,
            host_port = %service.host_port,
            "Temporal client created"
        );
        service
    }

    /// Whether [`TemporalService::close`] was called
    pub fn is_closed(&self) -> bool {
        self.lock_channel().is_none()
    }

    fn lock_channel(&self) -> std::sync::MutexGuard<'_, Option<Channel>> {
        self.channel
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn channel(&self) -> Result<Channel> {
        self.lock_channel().clone().ok_or_else(|| Error::Closed {
            instance: self.instance_id.clone(),
        })
    }

    fn workflow(&self) -> Result<WorkflowServiceClient<Channel>> {
        Ok(WorkflowServiceClient::new(self.channel()?))
    }

    fn operator(&self) -> Result<OperatorServiceClient<Channel>> {
        Ok(OperatorServiceClient::new(self.channel()?))
    }
}

/// Run one unary call under the context and classify its failure
async fn call<T, F>(cx: &CallContext, operation: &'static str, request: F) -> Result<T>
where
    F: Future<Output = std::result::Result<tonic::Response<T>, Status>>,
{
    cx.run(operation, async move {
        request
            .await
            .map(tonic::Response::into_inner)
            .map_err(|s| status::service_error(operation, s))
    })
    .await
}

fn is_not_found(err: &Error) -> bool {
    matches!(
        err.service_kind(),
        Some(ServiceErrorKind::NamespaceNotFound | ServiceErrorKind::NotFound)
    )
}

fn transport_message(err: &tonic::transport::Error) -> String {
    use std::error::Error as _;
    match err.source() {
        Some(source) => format!("{err}: {source}"),
        None => err.to_string(),
    }
}

#[async_trait]
impl TemporalService for GrpcTemporalService {
    fn instance_id(&self) -> String {
        self.instance_id.clone()
    }

    async fn describe_namespace_by_name(
        &self,
        cx: &CallContext,
        name: &str,
    ) -> Result<Option<TemporalNamespaceObservation>> {
        let mut client = self.workflow()?;
        let request = DescribeNamespaceRequest {
            namespace: name.to_string(),
            id: String::new(),
        };

        match call(cx, DESCRIBE_NAMESPACE, client.describe_namespace(cx.request(request))).await {
            Ok(response) => Ok(Some(mapping::observation_from_describe(response)?)),
            Err(e) if is_not_found(&e) => {
                debug!(namespace = %name, "Namespace not found");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn describe_namespace_by_id(
        &self,
        cx: &CallContext,
        id: &str,
    ) -> Result<Option<TemporalNamespaceObservation>> {
        let mut client = self.workflow()?;
        let request = DescribeNamespaceRequest {
            namespace: String::new(),
            id: id.to_string(),
        };

        match call(cx, DESCRIBE_NAMESPACE, client.describe_namespace(cx.request(request))).await {
            Ok(response) => Ok(Some(mapping::observation_from_describe(response)?)),
            Err(e) if is_not_found(&e) => {
                debug!(namespace_id = %id, "Namespace not found");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn create_namespace(
        &self,
        cx: &CallContext,
        params: &TemporalNamespaceParameters,
    ) -> Result<()> {
        let mut client = self.workflow()?;
        let request = mapping::register_request(params);

        match call(cx, REGISTER_NAMESPACE, client.register_namespace(cx.request(request))).await {
            Ok(_) => {
                info!(namespace = %params.name, "Namespace registered");
                Ok(())
            }
            Err(e)
                if matches!(
                    e.service_kind(),
                    Some(ServiceErrorKind::NamespaceAlreadyExists | ServiceErrorKind::AlreadyExists)
                ) =>
            {
                debug!(namespace = %params.name, "Namespace already exists");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn update_namespace_by_name(
        &self,
        cx: &CallContext,
        params: &TemporalNamespaceParameters,
    ) -> Result<()> {
        let mut client = self.workflow()?;
        let request = mapping::update_request(params);

        call(cx, UPDATE_NAMESPACE, client.update_namespace(cx.request(request))).await?;
        info!(namespace = %params.name, "Namespace updated");
        Ok(())
    }

    async fn delete_namespace_by_name(
        &self,
        cx: &CallContext,
        name: &str,
    ) -> Result<DeleteOutcome> {
        if self.describe_namespace_by_name(cx, name).await?.is_none() {
            debug!(namespace = %name, "Namespace already absent");
            return Ok(DeleteOutcome::AlreadyAbsent);
        }

        let mut client = self.operator()?;
        let request = DeleteNamespaceRequest {
            namespace: name.to_string(),
        };

        match call(cx, DELETE_NAMESPACE, client.delete_namespace(cx.request(request))).await {
            Ok(response) => {
                let deleted_namespace = if response.deleted_namespace.is_empty() {
                    name.to_string()
                } else {
                    response.deleted_namespace
                };
                info!(namespace = %name, deleted_namespace = %deleted_namespace, "Namespace deletion started");
                Ok(DeleteOutcome::Deleted { deleted_namespace })
            }
            Err(e) if e.service_kind() == Some(ServiceErrorKind::NamespaceInvalidState) => {
                debug!(namespace = %name, "Namespace already being deleted");
                Ok(DeleteOutcome::InvalidState)
            }
            Err(e) if is_not_found(&e) => {
                debug!(namespace = %name, "Namespace disappeared before delete");
                Ok(DeleteOutcome::NotFoundAtDelete)
            }
            Err(e) => Err(e),
        }
    }

    async fn list_all_namespaces(
        &self,
        cx: &CallContext,
    ) -> Result<Vec<TemporalNamespaceObservation>> {
        let mut client = self.workflow()?;
        let mut namespaces = Vec::new();
        let mut next_page_token = Vec::new();

        for _ in 0..MAX_LIST_PAGES {
            let request = ListNamespacesRequest {
                page_size: LIST_PAGE_SIZE,
                next_page_token: std::mem::take(&mut next_page_token),
            };
            let page = call(cx, LIST_NAMESPACES, client.list_namespaces(cx.request(request))).await?;

            for entry in page.namespaces {
                let observed = mapping::observation_from_describe(entry)?;
                if observed.name == TEMPORAL_SYSTEM_NAMESPACE
                    || observed.state == NamespaceState::Deleted
                {
                    continue;
                }
                namespaces.push(observed);
            }

            if page.next_page_token.is_empty() {
                return Ok(namespaces);
            }
            next_page_token = page.next_page_token;
        }

        warn!(
            pages = MAX_LIST_PAGES,
            listed = namespaces.len(),
            "ListNamespaces did not finish within the page limit, returning partial list"
        );
        Ok(namespaces)
    }

    async fn delete_all_namespaces(&self, cx: &CallContext) -> Result<Vec<String>> {
        let mut handled = Vec::new();
        for namespace in self.list_all_namespaces(cx).await? {
            let outcome = self.delete_namespace_by_name(cx, &namespace.name).await?;
            debug!(namespace = %namespace.name, outcome = ?outcome, "Handled namespace");
            handled.push(namespace.name);
        }
        Ok(handled)
    }

    async fn create_search_attribute(
        &self,
        cx: &CallContext,
        params: &SearchAttributeParameters,
    ) -> Result<()> {
        let request = mapping::add_search_attribute_request(params)?;
        let mut client = self.operator()?;

        call(
            cx,
            ADD_SEARCH_ATTRIBUTES,
            client.add_search_attributes(cx.request(request.clone())),
        )
        .await?;
        info!(
            namespace = %request.namespace,
            search_attribute = %params.name,
            type_ = %params.type_,
            "Search attribute added"
        );
        Ok(())
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
        let mut client = self.operator()?;
        let request = RemoveSearchAttributesRequest {
            search_attributes: vec![name.to_string()],
            namespace: namespace.to_string(),
        };

        call(
            cx,
            REMOVE_SEARCH_ATTRIBUTES,
            client.remove_search_attributes(cx.request(request)),
        )
        .await?;
        info!(namespace = %namespace, search_attribute = %name, "Search attribute removed");
        Ok(())
    }

    async fn list_search_attributes_by_namespace(
        &self,
        cx: &CallContext,
        namespace: &str,
    ) -> Result<Vec<SearchAttributeObservation>> {
        let mut client = self.operator()?;
        let request = ListSearchAttributesRequest {
            namespace: namespace.to_string(),
        };

        let response = call(
            cx,
            LIST_SEARCH_ATTRIBUTES,
            client.list_search_attributes(cx.request(request)),
        )
        .await?;
        mapping::search_attributes_from_list(namespace, response.custom_attributes)
    }

    fn close(&self) {
        if self.lock_channel().take().is_some() {
            debug!(
                instance = %self.instance_id,
                host_port = %self.host_port,
                "Temporal client closed"
            );
        }
    }
}
