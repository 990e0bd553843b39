//! Canonical projections of desired and observed state
//!
//! Both sides of a comparison are reduced to the fields the provider controls,
//! with optional values normalized so that "absent" and "empty" compare equal.
//! Structural equality of two projections decides whether a resource is up to
//! date; [`diff`] renders the mismatch for status and logs only.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::crd::{
    ArchivalState, SearchAttributeObservation, SearchAttributeParameters, SearchAttributeType,
    TemporalNamespaceObservation, TemporalNamespaceParameters,
};

/// Comparable view of a namespace
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceProjection {
    /// Namespace name
    pub name: String,
    /// Description, `None` when empty
    pub description: Option<String>,
    /// Owner email, `None` when empty
    pub owner_email: Option<String>,
    /// Retention in days
    pub workflow_execution_retention_days: u32,
    /// Metadata, `None` when empty
    pub data: Option<BTreeMap<String, String>>,
    /// History archival state
    pub history_archival_state: ArchivalState,
    /// History archival URI, `None` when empty
    pub history_archival_uri: Option<String>,
    /// Visibility archival state
    pub visibility_archival_state: ArchivalState,
    /// Visibility archival URI, `None` when empty
    pub visibility_archival_uri: Option<String>,
}

impl From<&TemporalNamespaceParameters> for NamespaceProjection {
    fn from(p: &TemporalNamespaceParameters) -> Self {
        Self {
            name: p.name.clone(),
            description: non_empty(p.description.as_deref()),
            owner_email: non_empty(p.owner_email.as_deref()),
            workflow_execution_retention_days: p.workflow_execution_retention_days,
            data: non_empty_map(p.data.as_ref()),
            history_archival_state: p.history_archival_state,
            history_archival_uri: non_empty(p.history_archival_uri.as_deref()),
            visibility_archival_state: p.visibility_archival_state,
            visibility_archival_uri: non_empty(p.visibility_archival_uri.as_deref()),
        }
    }
}

impl From<&TemporalNamespaceObservation> for NamespaceProjection {
    fn from(o: &TemporalNamespaceObservation) -> Self {
        Self {
            name: o.name.clone(),
            description: non_empty(o.description.as_deref()),
            owner_email: non_empty(o.owner_email.as_deref()),
            workflow_execution_retention_days: o.workflow_execution_retention_days,
            data: non_empty_map(o.data.as_ref()),
            history_archival_state: o.history_archival_state,
            history_archival_uri: non_empty(o.history_archival_uri.as_deref()),
            visibility_archival_state: o.visibility_archival_state,
            visibility_archival_uri: non_empty(o.visibility_archival_uri.as_deref()),
        }
    }
}

/// Comparable view of a search attribute
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchAttributeProjection {
    /// Attribute name
    pub name: String,
    /// Attribute value type
    #[serde(rename = "type")]
    pub type_: SearchAttributeType,
    /// Owning namespace
    pub temporal_namespace_name: String,
}

impl From<&SearchAttributeParameters> for SearchAttributeProjection {
    fn from(p: &SearchAttributeParameters) -> Self {
        Self {
            name: p.name.clone(),
            type_: p.type_,
            temporal_namespace_name: p.namespace().unwrap_or_default().to_string(),
        }
    }
}

impl From<&SearchAttributeObservation> for SearchAttributeProjection {
    fn from(o: &SearchAttributeObservation) -> Self {
        Self {
            name: o.name.clone(),
            type_: o.type_,
            temporal_namespace_name: o.temporal_namespace_name.clone(),
        }
    }
}

/// Render the differences between two projections, `None` when equal
///
/// Each line names a field path and both values, e.g.
/// `workflowExecutionRetentionDays: desired 30, observed 7`.
pub fn diff<T: Serialize + PartialEq>(desired: &T, observed: &T) -> Option<String> {
    if desired == observed {
        return None;
    }

    let (desired, observed) = match (serde_json::to_value(desired), serde_json::to_value(observed))
    {
        (Ok(d), Ok(o)) => (d, o),
        _ => return Some("resources differ".to_string()),
    };

    let mut lines = Vec::new();
    collect_diff("", &desired, &observed, &mut lines);
    if lines.is_empty() {
        lines.push("resources differ".to_string());
    }
    Some(lines.join("\n"))
}

fn collect_diff(path: &str, desired: &Value, observed: &Value, out: &mut Vec<String>) {
    match (desired, observed) {
        (Value::Object(d), Value::Object(o)) => {
            let keys: std::collections::BTreeSet<&String> = d.keys().chain(o.keys()).collect();
            for key in keys {
                let child = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                collect_diff(
                    &child,
                    d.get(key).unwrap_or(&Value::Null),
                    o.get(key).unwrap_or(&Value::Null),
                    out,
                );
            }
        }
        (d, o) if d != o => out.push(format!(
            "{path}: desired {}, observed {}",
            render(d),
            render(o)
        )),
        _ => {}
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::Null => "<none>".to_string(),
        other => other.to_string(),
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

fn non_empty_map(value: Option<&BTreeMap<String, String>>) -> Option<BTreeMap<String, String>> {
    value.filter(|m| !m.is_empty()).cloned()
}
