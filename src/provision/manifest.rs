use std::sync::Arc;

use super::ProvisionError;
use crate::types::{ResourceDefinition, ResourceManifest, TransferProcess, TransferProcessType};

/// Produces the manifest of resources a transfer process needs provisioned
pub trait ResourceManifestGenerator: Send + Sync {
    fn generate_resource_manifest(
        &self,
        process: &TransferProcess,
    ) -> Result<ResourceManifest, ProvisionError>;
}

/// Contributes zero or one definition to a process manifest
pub trait ResourceDefinitionGenerator: Send + Sync {
    fn generate(&self, process: &TransferProcess) -> Option<ResourceDefinition>;
}

/// Assembles the manifest from the definition generators registered for the
/// side of the transfer the process drives.
#[derive(Default)]
pub struct ResourceManifestGeneratorImpl {
    consumer_generators: Vec<Arc<dyn ResourceDefinitionGenerator>>,
    provider_generators: Vec<Arc<dyn ResourceDefinitionGenerator>>,
}

impl ResourceManifestGeneratorImpl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_consumer_generator(&mut self, generator: Arc<dyn ResourceDefinitionGenerator>) {
        self.consumer_generators.push(generator);
    }

    pub fn register_provider_generator(&mut self, generator: Arc<dyn ResourceDefinitionGenerator>) {
        self.provider_generators.push(generator);
    }
}

impl ResourceManifestGenerator for ResourceManifestGeneratorImpl {
    fn generate_resource_manifest(
        &self,
        process: &TransferProcess,
    ) -> Result<ResourceManifest, ProvisionError> {
        let generators = match process.process_type() {
            TransferProcessType::Consumer => &self.consumer_generators,
            TransferProcessType::Provider => &self.provider_generators,
        };

        let mut manifest = ResourceManifest::default();
        for generator in generators {
            if let Some(definition) = generator.generate(process) {
                manifest.add_definition(definition);
            }
        }
        Ok(manifest)
    }
}
