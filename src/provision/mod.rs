//! # Provisioning
//!
//! Resource manifest generation and the provision/deprovision seam. The
//! scheduler consumes `ProvisionManager` as an async collaborator; the
//! shipped implementation is keyed dispatch over registered provisioners,
//! selected per resource by `can_provision`/`can_deprovision`.

pub mod manifest;

pub use manifest::{
    ResourceDefinitionGenerator, ResourceManifestGenerator, ResourceManifestGeneratorImpl,
};

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use thiserror::Error;
use tracing::debug;

use crate::types::{ProvisionedResource, ResourceDefinition, SecretToken, TransferProcess};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProvisionError {
    #[error("no provisioner registered for resource kind {0}")]
    NoProvisionerFor(String),
    #[error("manifest generation failed: {0}")]
    ManifestGeneration(String),
    #[error("{0}")]
    Failure(String),
}

/// Outcome of provisioning one resource definition
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionResponse {
    pub resource: ProvisionedResource,
    pub secret_token: Option<SecretToken>,
}

impl ProvisionResponse {
    pub fn new(resource: ProvisionedResource) -> Self {
        Self {
            resource,
            secret_token: None,
        }
    }

    pub fn with_secret_token(mut self, token: SecretToken) -> Self {
        self.secret_token = Some(token);
        self
    }
}

/// Outcome of releasing one provisioned resource
#[derive(Debug, Clone, PartialEq)]
pub struct DeprovisionResponse {
    pub resource: ProvisionedResource,
}

impl DeprovisionResponse {
    pub fn new(resource: ProvisionedResource) -> Self {
        Self { resource }
    }
}

/// Allocates and releases the resources a transfer manifest declares
#[async_trait]
pub trait ProvisionManager: Send + Sync {
    async fn provision(
        &self,
        process: &TransferProcess,
    ) -> Result<Vec<ProvisionResponse>, ProvisionError>;

    async fn deprovision(
        &self,
        process: &TransferProcess,
    ) -> Result<Vec<DeprovisionResponse>, ProvisionError>;
}

/// One concrete resource backend (object-store bucket, blob container, ...)
#[async_trait]
pub trait Provisioner: Send + Sync {
    fn can_provision(&self, definition: &ResourceDefinition) -> bool;

    fn can_deprovision(&self, resource: &ProvisionedResource) -> bool;

    async fn provision(
        &self,
        process: &TransferProcess,
        definition: &ResourceDefinition,
    ) -> Result<ProvisionResponse, ProvisionError>;

    async fn deprovision(
        &self,
        process: &TransferProcess,
        resource: &ProvisionedResource,
    ) -> Result<DeprovisionResponse, ProvisionError>;
}

/// Fans the manifest out over the registered provisioners and collects the
/// responses; the first failing resource fails the whole operation.
#[derive(Default)]
pub struct ProvisionManagerImpl {
    provisioners: Vec<Arc<dyn Provisioner>>,
}

impl ProvisionManagerImpl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provisioner: Arc<dyn Provisioner>) {
        self.provisioners.push(provisioner);
    }

    fn provisioner_for(
        &self,
        definition: &ResourceDefinition,
    ) -> Result<&Arc<dyn Provisioner>, ProvisionError> {
        self.provisioners
            .iter()
            .find(|p| p.can_provision(definition))
            .ok_or_else(|| ProvisionError::NoProvisionerFor(definition.kind.clone()))
    }

    fn deprovisioner_for(
        &self,
        resource: &ProvisionedResource,
    ) -> Result<&Arc<dyn Provisioner>, ProvisionError> {
        self.provisioners
            .iter()
            .find(|p| p.can_deprovision(resource))
            .ok_or_else(|| ProvisionError::NoProvisionerFor(resource.resource_kind().to_string()))
    }
}

#[async_trait]
impl ProvisionManager for ProvisionManagerImpl {
    async fn provision(
        &self,
        process: &TransferProcess,
    ) -> Result<Vec<ProvisionResponse>, ProvisionError> {
        let mut pending = Vec::new();
        for definition in process.resource_manifest().definitions() {
            let provisioner = self.provisioner_for(definition)?;
            debug!(
                process_id = %process.id(),
                resource_definition_id = %definition.id,
                resource_kind = %definition.kind,
                "provisioning resource"
            );
            pending.push(provisioner.provision(process, definition));
        }

        join_all(pending).await.into_iter().collect()
    }

    async fn deprovision(
        &self,
        process: &TransferProcess,
    ) -> Result<Vec<DeprovisionResponse>, ProvisionError> {
        let mut pending = Vec::new();
        for resource in process.provisioned_resources().resources() {
            let provisioner = self.deprovisioner_for(resource)?;
            debug!(
                process_id = %process.id(),
                resource_id = %resource.id(),
                resource_kind = %resource.resource_kind(),
                "deprovisioning resource"
            );
            pending.push(provisioner.deprovision(process, resource));
        }

        join_all(pending).await.into_iter().collect()
    }
}
