//! Conversion between Temporal wire messages and provider resource types

use std::collections::{BTreeMap, HashMap};

use tracing::warn;

use temporal_provider_common::crd::{
    ArchivalState, NamespaceState, SearchAttributeObservation, SearchAttributeParameters,
    SearchAttributeType, TemporalNamespaceObservation, TemporalNamespaceParameters,
};
use temporal_provider_common::{Error, Result, SECONDS_PER_DAY};
use temporal_provider_proto::enums;
use temporal_provider_proto::namespace::{NamespaceConfig, UpdateNamespaceInfo};
use temporal_provider_proto::operatorservice::AddSearchAttributesRequest;
use temporal_provider_proto::workflowservice::{
    DescribeNamespaceResponse, RegisterNamespaceRequest, UpdateNamespaceRequest,
};

/// Retention days as a protobuf duration
pub fn retention_to_duration(days: u32) -> prost_types::Duration {
    prost_types::Duration {
        seconds: i64::from(days) * SECONDS_PER_DAY,
        nanos: 0,
    }
}

/// Retention duration as whole days
///
/// Sub-day remainders are truncated with a warning. A missing or negative
/// duration maps to zero days.
pub fn duration_to_retention_days(namespace: &str, ttl: Option<&prost_types::Duration>) -> u32 {
    let Some(ttl) = ttl else {
        warn!(namespace = %namespace, "Namespace reports no retention period");
        return 0;
    };

    if ttl.seconds < 0 || ttl.nanos < 0 {
        warn!(
            namespace = %namespace,
            seconds = ttl.seconds,
            "Namespace reports a negative retention period"
        );
        return 0;
    }

    let days = ttl.seconds / SECONDS_PER_DAY;
    if ttl.seconds % SECONDS_PER_DAY != 0 || ttl.nanos != 0 {
        warn!(
            namespace = %namespace,
            seconds = ttl.seconds,
            nanos = ttl.nanos,
            days,
            "Retention period is not a whole number of days, truncating"
        );
    }
    u32::try_from(days).unwrap_or(u32::MAX)
}

/// Archival state as its wire value
pub fn archival_state_to_proto(state: ArchivalState) -> i32 {
    match state {
        ArchivalState::Disabled => enums::ArchivalState::Disabled as i32,
        ArchivalState::Enabled => enums::ArchivalState::Enabled as i32,
        ArchivalState::Unspecified => enums::ArchivalState::Unspecified as i32,
    }
}

/// Archival state from its wire value
pub fn archival_state_from_proto(state: enums::ArchivalState) -> ArchivalState {
    match state {
        enums::ArchivalState::Disabled => ArchivalState::Disabled,
        enums::ArchivalState::Enabled => ArchivalState::Enabled,
        enums::ArchivalState::Unspecified => ArchivalState::Unspecified,
    }
}

/// Namespace state from its wire value
pub fn namespace_state_from_proto(state: enums::NamespaceState) -> NamespaceState {
    match state {
        enums::NamespaceState::Registered => NamespaceState::Registered,
        enums::NamespaceState::Deprecated => NamespaceState::Deprecated,
        enums::NamespaceState::Deleted => NamespaceState::Deleted,
        enums::NamespaceState::Unspecified => NamespaceState::Unspecified,
    }
}

/// Search attribute type as its wire value
pub fn search_attribute_type_to_proto(type_: SearchAttributeType) -> i32 {
    let indexed = match type_ {
        SearchAttributeType::Text => enums::IndexedValueType::Text,
        SearchAttributeType::Keyword => enums::IndexedValueType::Keyword,
        SearchAttributeType::Int => enums::IndexedValueType::Int,
        SearchAttributeType::Double => enums::IndexedValueType::Double,
        SearchAttributeType::Bool => enums::IndexedValueType::Bool,
        SearchAttributeType::Datetime => enums::IndexedValueType::Datetime,
        SearchAttributeType::KeywordList => enums::IndexedValueType::KeywordList,
    };
    indexed as i32
}

/// Search attribute type from its wire value
pub fn search_attribute_type_from_proto(value: i32) -> Result<SearchAttributeType> {
    match enums::IndexedValueType::try_from(value) {
        Ok(enums::IndexedValueType::Text) => Ok(SearchAttributeType::Text),
        Ok(enums::IndexedValueType::Keyword) => Ok(SearchAttributeType::Keyword),
        Ok(enums::IndexedValueType::Int) => Ok(SearchAttributeType::Int),
        Ok(enums::IndexedValueType::Double) => Ok(SearchAttributeType::Double),
        Ok(enums::IndexedValueType::Bool) => Ok(SearchAttributeType::Bool),
        Ok(enums::IndexedValueType::Datetime) => Ok(SearchAttributeType::Datetime),
        Ok(enums::IndexedValueType::KeywordList) => Ok(SearchAttributeType::KeywordList),
        Ok(enums::IndexedValueType::Unspecified) | Err(_) => Err(Error::mapping(format!(
            "unsupported indexed value type {value}"
        ))),
    }
}

/// Observation from a describe (or list) entry
pub fn observation_from_describe(
    response: DescribeNamespaceResponse,
) -> Result<TemporalNamespaceObservation> {
    let info = response
        .namespace_info
        .ok_or_else(|| Error::mapping("namespace response carries no namespace info"))?;
    let config = response.config.unwrap_or_default();
    let state = namespace_state_from_proto(info.state());
    let history_archival_state = archival_state_from_proto(config.history_archival_state());
    let visibility_archival_state = archival_state_from_proto(config.visibility_archival_state());
    let retention_days = duration_to_retention_days(
        &info.name,
        config.workflow_execution_retention_ttl.as_ref(),
    );

    Ok(TemporalNamespaceObservation {
        id: info.id,
        name: info.name,
        description: non_empty(info.description),
        owner_email: non_empty(info.owner_email),
        workflow_execution_retention_days: retention_days,
        data: non_empty_map(info.data),
        history_archival_state,
        history_archival_uri: non_empty(config.history_archival_uri),
        visibility_archival_state,
        visibility_archival_uri: non_empty(config.visibility_archival_uri),
        state,
    })
}

/// RegisterNamespace request for the given parameters
pub fn register_request(params: &TemporalNamespaceParameters) -> RegisterNamespaceRequest {
    RegisterNamespaceRequest {
        namespace: params.name.clone(),
        description: params.description.clone().unwrap_or_default(),
        owner_email: params.owner_email.clone().unwrap_or_default(),
        workflow_execution_retention_period: Some(retention_to_duration(
            params.workflow_execution_retention_days,
        )),
        data: to_hash_map(params.data.as_ref()),
        history_archival_state: archival_state_to_proto(params.history_archival_state),
        history_archival_uri: params.history_archival_uri.clone().unwrap_or_default(),
        visibility_archival_state: archival_state_to_proto(params.visibility_archival_state),
        visibility_archival_uri: params.visibility_archival_uri.clone().unwrap_or_default(),
    }
}

/// UpdateNamespace request replacing every mutable field
pub fn update_request(params: &TemporalNamespaceParameters) -> UpdateNamespaceRequest {
    UpdateNamespaceRequest {
        namespace: params.name.clone(),
        update_info: Some(UpdateNamespaceInfo {
            description: params.description.clone().unwrap_or_default(),
            owner_email: params.owner_email.clone().unwrap_or_default(),
            data: to_hash_map(params.data.as_ref()),
        }),
        config: Some(NamespaceConfig {
            workflow_execution_retention_ttl: Some(retention_to_duration(
                params.workflow_execution_retention_days,
            )),
            history_archival_state: archival_state_to_proto(params.history_archival_state),
            history_archival_uri: params.history_archival_uri.clone().unwrap_or_default(),
            visibility_archival_state: archival_state_to_proto(params.visibility_archival_state),
            visibility_archival_uri: params.visibility_archival_uri.clone().unwrap_or_default(),
        }),
    }
}

/// AddSearchAttributes request for one attribute
pub fn add_search_attribute_request(
    params: &SearchAttributeParameters,
) -> Result<AddSearchAttributesRequest> {
    let namespace = params.namespace().ok_or_else(|| {
        Error::precondition(&params.name, "temporalNamespaceName is not resolved")
    })?;

    Ok(AddSearchAttributesRequest {
        search_attributes: HashMap::from([(
            params.name.clone(),
            search_attribute_type_to_proto(params.type_),
        )]),
        namespace: namespace.to_string(),
    })
}

/// Observations for the custom attributes of a namespace, sorted by name
pub fn search_attributes_from_list(
    namespace: &str,
    custom_attributes: HashMap<String, i32>,
) -> Result<Vec<SearchAttributeObservation>> {
    let mut attributes = custom_attributes
        .into_iter()
        .map(|(name, value)| {
            Ok(SearchAttributeObservation {
                type_: search_attribute_type_from_proto(value)?,
                name,
                temporal_namespace_name: namespace.to_string(),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    attributes.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(attributes)
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

fn non_empty_map(value: HashMap<String, String>) -> Option<BTreeMap<String, String>> {
    (!value.is_empty()).then(|| value.into_iter().collect())
}

fn to_hash_map(value: Option<&BTreeMap<String, String>>) -> HashMap<String, String> {
    value
        .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use temporal_provider_proto::namespace::NamespaceInfo;

    // =========================================================================
    // Retention
    // =========================================================================

    #[test]
    fn retention_is_exact_days() {
        assert_eq!(retention_to_duration(30).seconds, 30 * 86_400);
        let ttl = retention_to_duration(7);
        assert_eq!(duration_to_retention_days("orders", Some(&ttl)), 7);
    }

    #[test]
    fn partial_day_is_truncated() {
        let ttl = prost_types::Duration {
            seconds: 2 * 86_400 + 3_600,
            nanos: 0,
        };
        assert_eq!(duration_to_retention_days("orders", Some(&ttl)), 2);
    }

    #[test]
    fn missing_or_negative_retention_is_zero() {
        assert_eq!(duration_to_retention_days("orders", None), 0);
        let ttl = prost_types::Duration {
            seconds: -86_400,
            nanos: 0,
        };
        assert_eq!(duration_to_retention_days("orders", Some(&ttl)), 0);
    }

    // =========================================================================
    // Namespaces
    // =========================================================================

    fn describe_response() -> DescribeNamespaceResponse {
        DescribeNamespaceResponse {
            namespace_info: Some(NamespaceInfo {
                name: "orders".to_string(),
                state: enums::NamespaceState::Registered as i32,
                description: String::new(),
                owner_email: "ops@example.com".to_string(),
                data: HashMap::new(),
                id: "5f1c".to_string(),
            }),
            config: Some(NamespaceConfig {
                workflow_execution_retention_ttl: Some(retention_to_duration(30)),
                history_archival_state: enums::ArchivalState::Disabled as i32,
                history_archival_uri: String::new(),
                visibility_archival_state: enums::ArchivalState::Enabled as i32,
                visibility_archival_uri: "file:///tmp/vis".to_string(),
            }),
        }
    }

    #[test]
    fn describe_maps_empty_values_to_none() {
        let observed = observation_from_describe(describe_response()).unwrap();
        assert_eq!(observed.id, "5f1c");
        assert_eq!(observed.state, NamespaceState::Registered);
        assert_eq!(observed.description, None);
        assert_eq!(observed.owner_email.as_deref(), Some("ops@example.com"));
        assert_eq!(observed.data, None);
        assert_eq!(observed.workflow_execution_retention_days, 30);
        assert_eq!(observed.history_archival_uri, None);
        assert_eq!(observed.visibility_archival_state, ArchivalState::Enabled);
    }

    #[test]
    fn describe_without_info_is_mapping_error() {
        let mut response = describe_response();
        response.namespace_info = None;
        assert!(matches!(
            observation_from_describe(response),
            Err(Error::Mapping { .. })
        ));
    }

    #[test]
    fn update_sends_every_mutable_field() {
        let mut params = TemporalNamespaceParameters::named("orders");
        params.description = Some("Orders".to_string());
        params.workflow_execution_retention_days = 14;
        params.data = Some(BTreeMap::from([("team".to_string(), "a".to_string())]));
        params.history_archival_state = ArchivalState::Enabled;

        let request = update_request(&params);
        let info = request.update_info.unwrap();
        let config = request.config.unwrap();
        assert_eq!(request.namespace, "orders");
        assert_eq!(info.description, "Orders");
        assert_eq!(info.data.get("team").map(String::as_str), Some("a"));
        assert_eq!(
            config.workflow_execution_retention_ttl.unwrap().seconds,
            14 * 86_400
        );
        assert_eq!(
            config.history_archival_state,
            enums::ArchivalState::Enabled as i32
        );
        assert_eq!(
            config.visibility_archival_state,
            enums::ArchivalState::Disabled as i32
        );
    }

    // =========================================================================
    // Search attributes
    // =========================================================================

    #[test]
    fn search_attribute_request_requires_namespace() {
        let mut params =
            SearchAttributeParameters::new("orders", "CustomerId", SearchAttributeType::Keyword);
        let request = add_search_attribute_request(&params).unwrap();
        assert_eq!(request.namespace, "orders");
        assert_eq!(
            request.search_attributes.get("CustomerId"),
            Some(&(enums::IndexedValueType::Keyword as i32))
        );

        params.temporal_namespace_name = None;
        assert!(matches!(
            add_search_attribute_request(&params),
            Err(Error::Precondition { .. })
        ));
    }

    #[test]
    fn listed_attributes_are_sorted() {
        let listed = HashMap::from([
            ("Zeta".to_string(), enums::IndexedValueType::Int as i32),
            ("Alpha".to_string(), enums::IndexedValueType::KeywordList as i32),
        ]);
        let attributes = search_attributes_from_list("orders", listed).unwrap();
        assert_eq!(attributes[0].name, "Alpha");
        assert_eq!(attributes[0].type_, SearchAttributeType::KeywordList);
        assert_eq!(attributes[1].temporal_namespace_name, "orders");
    }

    #[test]
    fn unspecified_type_is_mapping_error() {
        assert!(search_attribute_type_from_proto(0).is_err());
        assert!(search_attribute_type_from_proto(99).is_err());
    }
}
