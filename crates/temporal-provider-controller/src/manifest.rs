//! Multi-document YAML manifests of managed resources

use std::path::Path;

use serde::Deserialize;
use serde_yaml::Value;
use tracing::debug;

use temporal_provider_common::crd::{SearchAttribute, TemporalNamespace};
use temporal_provider_common::{Error, Result};

/// Managed resources loaded from a manifest, in document order per kind
#[derive(Clone, Debug, Default)]
pub struct Manifest {
    /// TemporalNamespace objects
    pub namespaces: Vec<TemporalNamespace>,
    /// SearchAttribute objects
    pub search_attributes: Vec<SearchAttribute>,
}

impl Manifest {
    /// Parse a multi-document YAML string
    ///
    /// Empty documents and ProviderConfig objects are skipped. Any other
    /// kind is an error, as is a namespace retention below one day.
    pub fn parse(input: &str) -> Result<Self> {
        let mut manifest = Self::default();

        for (index, document) in serde_yaml::Deserializer::from_str(input).enumerate() {
            let value = Value::deserialize(document)
                .map_err(|e| Error::serialization(format!("document {index}: {e}")))?;
            if value.is_null() {
                continue;
            }

            let kind = value
                .get("kind")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            match kind.as_str() {
                "TemporalNamespace" => {
                    let namespace: TemporalNamespace = from_value(&kind, value)?;
                    check_retention(index, &namespace)?;
                    manifest.namespaces.push(namespace);
                }
                "SearchAttribute" => manifest.search_attributes.push(from_value(&kind, value)?),
                "ProviderConfig" => debug!(document = index, "Skipping ProviderConfig"),
                "" => {
                    return Err(Error::serialization(format!(
                        "document {index} has no kind"
                    )))
                }
                other => {
                    return Err(Error::serialization_for_kind(
                        other,
                        format!("document {index} has unsupported kind"),
                    ))
                }
            }
        }

        Ok(manifest)
    }

    /// Read and parse a manifest file
    pub async fn load(path: &Path) -> Result<Self> {
        let input = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::serialization(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::parse(&input)
    }

    /// Render all objects, status included, as multi-document YAML
    pub fn to_yaml(&self) -> Result<String> {
        let mut documents = Vec::with_capacity(self.namespaces.len() + self.search_attributes.len());
        for ns in &self.namespaces {
            documents.push(to_string("TemporalNamespace", ns)?);
        }
        for attr in &self.search_attributes {
            documents.push(to_string("SearchAttribute", attr)?);
        }
        Ok(documents.join("---\n"))
    }

    /// Total number of objects
    pub fn len(&self) -> usize {
        self.namespaces.len() + self.search_attributes.len()
    }

    /// Whether the manifest holds no objects
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn from_value<T: serde::de::DeserializeOwned>(kind: &str, value: Value) -> Result<T> {
    serde_yaml::from_value(value).map_err(|e| Error::serialization_for_kind(kind, e.to_string()))
}

/// Schema bounds are not enforced without an apiserver, so check them here
fn check_retention(index: usize, namespace: &TemporalNamespace) -> Result<()> {
    let days = namespace.spec.for_provider.workflow_execution_retention_days;
    if days < 1 {
        return Err(Error::serialization_for_kind(
            "TemporalNamespace",
            format!(
                "document {index}: workflowExecutionRetentionDays must be at least 1, got {days}"
            ),
        ));
    }
    Ok(())
}

fn to_string<T: serde::Serialize>(kind: &str, object: &T) -> Result<String> {
    serde_yaml::to_string(object).map_err(|e| Error::serialization_for_kind(kind, e.to_string()))
}
