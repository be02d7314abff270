use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A declarative entry in a resource manifest: something that must exist
/// before the transfer can run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDefinition {
    pub id: String,
    pub kind: String,
    #[serde(default)]
    pub parameters: serde_json::Value,
}

impl ResourceDefinition {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            parameters: serde_json::Value::Null,
        }
    }

    pub fn with_parameters(mut self, parameters: serde_json::Value) -> Self {
        self.parameters = parameters;
        self
    }
}

/// The declarative set of resources a transfer needs provisioned. Fixed
/// once assigned to a process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceManifest {
    definitions: Vec<ResourceDefinition>,
}

impl ResourceManifest {
    pub fn new(definitions: Vec<ResourceDefinition>) -> Self {
        Self { definitions }
    }

    pub fn definitions(&self) -> &[ResourceDefinition] {
        &self.definitions
    }

    pub fn definition(&self, id: &str) -> Option<&ResourceDefinition> {
        self.definitions.iter().find(|d| d.id == id)
    }

    pub fn add_definition(&mut self, definition: ResourceDefinition) {
        self.definitions.push(definition);
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }
}

/// A concrete, externally-allocated resource attached to a process.
///
/// Destination resources are write targets on the consumer side; the
/// variant tag and the resource kind are the only capabilities the
/// scheduler needs from either shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ProvisionedResource {
    #[serde(rename_all = "camelCase")]
    Environment {
        id: String,
        resource_definition_id: String,
        resource_kind: String,
    },
    #[serde(rename_all = "camelCase")]
    DataDestination {
        id: String,
        resource_definition_id: String,
        resource_kind: String,
        destination: serde_json::Value,
    },
}

impl ProvisionedResource {
    pub fn environment(
        id: impl Into<String>,
        resource_definition_id: impl Into<String>,
        resource_kind: impl Into<String>,
    ) -> Self {
        Self::Environment {
            id: id.into(),
            resource_definition_id: resource_definition_id.into(),
            resource_kind: resource_kind.into(),
        }
    }

    pub fn data_destination(
        id: impl Into<String>,
        resource_definition_id: impl Into<String>,
        resource_kind: impl Into<String>,
        destination: serde_json::Value,
    ) -> Self {
        Self::DataDestination {
            id: id.into(),
            resource_definition_id: resource_definition_id.into(),
            resource_kind: resource_kind.into(),
            destination,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Environment { id, .. } | Self::DataDestination { id, .. } => id,
        }
    }

    /// Back-link to the manifest definition this resource satisfies
    pub fn resource_definition_id(&self) -> &str {
        match self {
            Self::Environment {
                resource_definition_id,
                ..
            }
            | Self::DataDestination {
                resource_definition_id,
                ..
            } => resource_definition_id,
        }
    }

    pub fn resource_kind(&self) -> &str {
        match self {
            Self::Environment { resource_kind, .. }
            | Self::DataDestination { resource_kind, .. } => resource_kind,
        }
    }

    pub fn is_destination(&self) -> bool {
        matches!(self, Self::DataDestination { .. })
    }
}

/// Provisioned resources keyed by resource id, in attachment order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProvisionedResourceSet {
    resources: Vec<ProvisionedResource>,
}

impl ProvisionedResourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a resource, replacing any previous resource with the same id
    pub fn add_resource(&mut self, resource: ProvisionedResource) {
        if let Some(existing) = self.resources.iter_mut().find(|r| r.id() == resource.id()) {
            *existing = resource;
        } else {
            self.resources.push(resource);
        }
    }

    pub fn resources(&self) -> &[ProvisionedResource] {
        &self.resources
    }

    pub fn has_destination(&self) -> bool {
        self.resources.iter().any(|r| r.is_destination())
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }
}

/// Credential material a provisioner may hand back alongside a resource.
/// The scheduler never interprets it; vaulting is an external concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretToken {
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl SecretToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expires_at: None,
        }
    }

    pub fn with_expiration(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}
