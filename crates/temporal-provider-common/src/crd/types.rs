//! Supporting types shared by the provider CRDs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Condition type reporting whether the external resource is usable
pub const CONDITION_READY: &str = "Ready";
/// Condition type reporting whether the last reconcile pass succeeded
pub const CONDITION_SYNCED: &str = "Synced";

/// The external resource is available
pub const REASON_AVAILABLE: &str = "Available";
/// The external resource exists but is not usable
pub const REASON_UNAVAILABLE: &str = "Unavailable";
/// The external resource is being created
pub const REASON_CREATING: &str = "Creating";
/// The external resource is being deleted
pub const REASON_DELETING: &str = "Deleting";
/// The last reconcile pass succeeded
pub const REASON_RECONCILE_SUCCESS: &str = "ReconcileSuccess";
/// The last reconcile pass failed
pub const REASON_RECONCILE_ERROR: &str = "ReconcileError";

/// Condition status following Kubernetes conventions
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum ConditionStatus {
    /// Condition is true
    True,
    /// Condition is false
    False,
    /// Condition status is unknown
    #[default]
    Unknown,
}

impl std::fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::True => write!(f, "True"),
            Self::False => write!(f, "False"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Kubernetes-style condition for status reporting
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct Condition {
    /// Type of condition (Ready, Synced)
    #[serde(rename = "type")]
    pub type_: String,

    /// Status of the condition (True, False, Unknown)
    pub status: ConditionStatus,

    /// Machine-readable reason for the condition
    pub reason: String,

    /// Human-readable message
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,

    /// Last time the condition transitioned
    #[serde(rename = "lastTransitionTime")]
    pub last_transition_time: DateTime<Utc>,
}

impl Condition {
    /// Create a new condition with the current timestamp
    pub fn new(
        type_: impl Into<String>,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            type_: type_.into(),
            status,
            reason: reason.into(),
            message: message.into(),
            last_transition_time: Utc::now(),
        }
    }

    /// Ready=True, reason Available
    pub fn available(message: impl Into<String>) -> Self {
        Self::new(
            CONDITION_READY,
            ConditionStatus::True,
            REASON_AVAILABLE,
            message,
        )
    }

    /// Ready=False, reason Unavailable
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(
            CONDITION_READY,
            ConditionStatus::False,
            REASON_UNAVAILABLE,
            message,
        )
    }

    /// Ready=False, reason Creating
    pub fn creating() -> Self {
        Self::new(CONDITION_READY, ConditionStatus::False, REASON_CREATING, "")
    }

    /// Ready=False, reason Deleting
    pub fn deleting() -> Self {
        Self::new(CONDITION_READY, ConditionStatus::False, REASON_DELETING, "")
    }

    /// Synced=True
    pub fn reconcile_success() -> Self {
        Self::new(
            CONDITION_SYNCED,
            ConditionStatus::True,
            REASON_RECONCILE_SUCCESS,
            "",
        )
    }

    /// Replace the message, keeping type, status and reason
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Synced=False carrying the error message
    pub fn reconcile_error(message: impl Into<String>) -> Self {
        Self::new(
            CONDITION_SYNCED,
            ConditionStatus::False,
            REASON_RECONCILE_ERROR,
            message,
        )
    }
}

/// Insert or replace the condition of the same type
///
/// The previous transition time is kept when the status does not change.
pub fn set_condition(conditions: &mut Vec<Condition>, mut condition: Condition) {
    match conditions.iter_mut().find(|c| c.type_ == condition.type_) {
        Some(existing) => {
            if existing.status == condition.status {
                condition.last_transition_time = existing.last_transition_time;
            }
            *existing = condition;
        }
        None => conditions.push(condition),
    }
}

/// What happens to the external resource when the managed resource is deleted
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum DeletionPolicy {
    /// Delete the external resource
    #[default]
    Delete,
    /// Leave the external resource in place
    Orphan,
}

/// Reference to another object by name
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct Reference {
    /// Name of the referenced object
    pub name: String,
}

impl Reference {
    /// Create a reference to the named object
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Selects an object by labels
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Selector {
    /// Labels the selected object must carry
    #[serde(default)]
    pub match_labels: BTreeMap<String, String>,
}

impl Selector {
    /// Whether the given labels satisfy this selector
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.match_labels
            .iter()
            .all(|(k, v)| labels.get(k) == Some(v))
    }
}

/// Archival state of a namespace's history or visibility records
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum ArchivalState {
    /// Archival is disabled
    #[default]
    Disabled,
    /// Archival is enabled
    Enabled,
    /// The service did not report a state
    Unspecified,
}

impl std::fmt::Display for ArchivalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disabled => write!(f, "Disabled"),
            Self::Enabled => write!(f, "Enabled"),
            Self::Unspecified => write!(f, "Unspecified"),
        }
    }
}

/// Lifecycle state of a namespace as reported by Temporal
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum NamespaceState {
    /// The namespace is active
    Registered,
    /// The namespace is deprecated
    Deprecated,
    /// The namespace is being deleted
    Deleted,
    /// The service did not report a state
    #[default]
    Unspecified,
}

impl std::fmt::Display for NamespaceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Registered => write!(f, "Registered"),
            Self::Deprecated => write!(f, "Deprecated"),
            Self::Deleted => write!(f, "Deleted"),
            Self::Unspecified => write!(f, "Unspecified"),
        }
    }
}

/// Value type of a custom search attribute
#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq, Hash)]
pub enum SearchAttributeType {
    /// Full-text searchable string
    Text,
    /// Exact-match string
    Keyword,
    /// 64-bit integer
    Int,
    /// Floating point number
    Double,
    /// Boolean
    Bool,
    /// Timestamp
    Datetime,
    /// List of exact-match strings
    KeywordList,
}

impl std::fmt::Display for SearchAttributeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "Text"),
            Self::Keyword => write!(f, "Keyword"),
            Self::Int => write!(f, "Int"),
            Self::Double => write!(f, "Double"),
            Self::Bool => write!(f, "Bool"),
            Self::Datetime => write!(f, "Datetime"),
            Self::KeywordList => write!(f, "KeywordList"),
        }
    }
}
