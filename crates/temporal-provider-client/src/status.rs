//! Classification of gRPC statuses returned by Temporal
//!
//! Temporal attaches a typed failure message to most statuses through the
//! `grpc-status-details-bin` trailer. The failure's type URL decides the
//! [`ServiceErrorKind`]; the status code is the fallback.

use prost::Message;
use tonic::{Code, Status};

use temporal_provider_common::{Error, ServiceErrorKind};
use temporal_provider_proto::google::rpc;

const TYPE_URL_PREFIX: &str = "type.googleapis.com/";

/// Fully qualified name of the namespace-not-found failure
pub const NAMESPACE_NOT_FOUND_FAILURE: &str =
    "temporal.api.errordetails.v1.NamespaceNotFoundFailure";
/// Fully qualified name of the namespace-already-exists failure
pub const NAMESPACE_ALREADY_EXISTS_FAILURE: &str =
    "temporal.api.errordetails.v1.NamespaceAlreadyExistsFailure";
/// Fully qualified name of the namespace-invalid-state failure
pub const NAMESPACE_INVALID_STATE_FAILURE: &str =
    "temporal.api.errordetails.v1.NamespaceInvalidStateFailure";

/// Classify a status into a service error kind
pub fn classify(status: &Status) -> ServiceErrorKind {
    detail_kind(status).unwrap_or_else(|| code_kind(status.code()))
}

/// Convert a failed call's status into a classified [`Error::Service`]
pub fn service_error(operation: &str, status: Status) -> Error {
    Error::service(operation, classify(&status), status.message())
}

/// Type URL under which a failure message is packed into `Any`
pub fn type_url(full_name: &str) -> String {
    format!("{TYPE_URL_PREFIX}{full_name}")
}

fn detail_kind(status: &Status) -> Option<ServiceErrorKind> {
    if status.details().is_empty() {
        return None;
    }

    let envelope = rpc::Status::decode(status.details()).ok()?;
    envelope.details.iter().find_map(|any| {
        let name = any
            .type_url
            .rsplit_once('/')
            .map(|(_, name)| name)
            .unwrap_or(&any.type_url);
        match name {
            NAMESPACE_NOT_FOUND_FAILURE => Some(ServiceErrorKind::NamespaceNotFound),
            NAMESPACE_ALREADY_EXISTS_FAILURE => Some(ServiceErrorKind::NamespaceAlreadyExists),
            NAMESPACE_INVALID_STATE_FAILURE => Some(ServiceErrorKind::NamespaceInvalidState),
            _ => None,
        }
    })
}

fn code_kind(code: Code) -> ServiceErrorKind {
    match code {
        Code::NotFound => ServiceErrorKind::NotFound,
        Code::AlreadyExists => ServiceErrorKind::AlreadyExists,
        Code::InvalidArgument => ServiceErrorKind::InvalidArgument,
        Code::FailedPrecondition => ServiceErrorKind::FailedPrecondition,
        Code::PermissionDenied => ServiceErrorKind::PermissionDenied,
        Code::Unauthenticated => ServiceErrorKind::Unauthenticated,
        Code::ResourceExhausted => ServiceErrorKind::ResourceExhausted,
        Code::Unavailable => ServiceErrorKind::Unavailable,
        Code::DeadlineExceeded => ServiceErrorKind::DeadlineExceeded,
        Code::Cancelled => ServiceErrorKind::Cancelled,
        Code::Internal | Code::DataLoss => ServiceErrorKind::Internal,
        _ => ServiceErrorKind::Unknown,
    }
}

/// Build a status carrying a Temporal failure detail
///
/// Used by test servers to answer the way a Temporal frontend does.
pub fn status_with_failure<M: Message>(
    code: Code,
    message: &str,
    full_name: &str,
    failure: &M,
) -> Status {
    let envelope = rpc::Status {
        code: code as i32,
        message: message.to_string(),
        details: vec![prost_types::Any {
            type_url: type_url(full_name),
            value: failure.encode_to_vec(),
        }],
    };
    Status::with_details(
        code,
        message,
        tonic::codegen::Bytes::from(envelope.encode_to_vec()),
    )
}
