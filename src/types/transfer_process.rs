use serde::{Deserialize, Serialize};
use std::fmt;

use super::data_request::DataRequest;
use super::resource::{ProvisionedResource, ProvisionedResourceSet, ResourceManifest};
use crate::error::TransferError;
use crate::state_machine::{StateTransitionError, TransferProcessState};

/// Which side of the transfer this process drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferProcessType {
    /// The connector requesting data
    Consumer,
    /// The connector serving data
    Provider,
}

impl fmt::Display for TransferProcessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Consumer => write!(f, "consumer"),
            Self::Provider => write!(f, "provider"),
        }
    }
}

/// A persisted state machine instance tracking one data-transfer job.
///
/// All fields are owned values; the manifest and provisioned resources
/// cross-link through ids rather than references. State only moves through
/// the `transition_*` methods, which enforce the legal state graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferProcess {
    id: String,
    process_type: TransferProcessType,
    state: TransferProcessState,
    data_request: DataRequest,
    #[serde(default)]
    resource_manifest: ResourceManifest,
    #[serde(default)]
    provisioned_resources: ProvisionedResourceSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_detail: Option<String>,
}

impl TransferProcess {
    pub fn builder() -> TransferProcessBuilder {
        TransferProcessBuilder::default()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn process_type(&self) -> TransferProcessType {
        self.process_type
    }

    pub fn state(&self) -> TransferProcessState {
        self.state
    }

    pub fn data_request(&self) -> &DataRequest {
        &self.data_request
    }

    pub fn resource_manifest(&self) -> &ResourceManifest {
        &self.resource_manifest
    }

    pub fn provisioned_resources(&self) -> &ProvisionedResourceSet {
        &self.provisioned_resources
    }

    pub fn error_detail(&self) -> Option<&str> {
        self.error_detail.as_deref()
    }

    /// The manifest is fixed once assigned; assigning happens exactly once
    /// when the process leaves `Initial`.
    pub fn set_resource_manifest(&mut self, manifest: ResourceManifest) {
        self.resource_manifest = manifest;
    }

    pub fn add_provisioned_resource(&mut self, resource: ProvisionedResource) {
        self.provisioned_resources.add_resource(resource);
    }

    pub fn transition_provisioning(&mut self) -> Result<(), StateTransitionError> {
        self.transition_to(TransferProcessState::Provisioning)
    }

    pub fn transition_provisioned(&mut self) -> Result<(), StateTransitionError> {
        self.transition_to(TransferProcessState::Provisioned)
    }

    pub fn transition_requesting(&mut self) -> Result<(), StateTransitionError> {
        self.transition_to(TransferProcessState::Requesting)
    }

    pub fn transition_requested(&mut self) -> Result<(), StateTransitionError> {
        self.transition_to(TransferProcessState::Requested)
    }

    pub fn transition_in_progress(&mut self) -> Result<(), StateTransitionError> {
        self.transition_to(TransferProcessState::InProgress)
    }

    pub fn transition_streaming(&mut self) -> Result<(), StateTransitionError> {
        self.transition_to(TransferProcessState::Streaming)
    }

    pub fn transition_completed(&mut self) -> Result<(), StateTransitionError> {
        self.transition_to(TransferProcessState::Completed)
    }

    pub fn transition_deprovisioning(&mut self) -> Result<(), StateTransitionError> {
        self.transition_to(TransferProcessState::Deprovisioning)
    }

    pub fn transition_deprovisioned(&mut self) -> Result<(), StateTransitionError> {
        self.transition_to(TransferProcessState::Deprovisioned)
    }

    pub fn transition_ended(&mut self) -> Result<(), StateTransitionError> {
        self.transition_to(TransferProcessState::Ended)
    }

    pub fn transition_error(
        &mut self,
        detail: impl Into<String>,
    ) -> Result<(), StateTransitionError> {
        self.transition_to(TransferProcessState::Error)?;
        self.error_detail = Some(detail.into());
        Ok(())
    }

    fn transition_to(
        &mut self,
        target: TransferProcessState,
    ) -> Result<(), StateTransitionError> {
        if !self.state.can_transition_to(target) {
            return Err(StateTransitionError {
                from: self.state,
                to: target,
            });
        }
        self.state = target;
        Ok(())
    }
}

/// Builder for `TransferProcess`; `id` and `data_request` are required.
#[derive(Debug, Default)]
pub struct TransferProcessBuilder {
    id: Option<String>,
    process_type: Option<TransferProcessType>,
    state: Option<TransferProcessState>,
    data_request: Option<DataRequest>,
    resource_manifest: ResourceManifest,
    provisioned_resources: ProvisionedResourceSet,
    error_detail: Option<String>,
}

impl TransferProcessBuilder {
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn process_type(mut self, process_type: TransferProcessType) -> Self {
        self.process_type = Some(process_type);
        self
    }

    pub fn state(mut self, state: TransferProcessState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn data_request(mut self, data_request: DataRequest) -> Self {
        self.data_request = Some(data_request);
        self
    }

    pub fn resource_manifest(mut self, manifest: ResourceManifest) -> Self {
        self.resource_manifest = manifest;
        self
    }

    pub fn provisioned_resources(mut self, resources: ProvisionedResourceSet) -> Self {
        self.provisioned_resources = resources;
        self
    }

    pub fn error_detail(mut self, detail: impl Into<String>) -> Self {
        self.error_detail = Some(detail.into());
        self
    }

    pub fn build(self) -> Result<TransferProcess, TransferError> {
        let id = self
            .id
            .ok_or_else(|| TransferError::InvalidInput("transfer process id is required".into()))?;
        let data_request = self.data_request.ok_or_else(|| {
            TransferError::InvalidInput("transfer process data request is required".into())
        })?;

        Ok(TransferProcess {
            id,
            process_type: self.process_type.unwrap_or(TransferProcessType::Consumer),
            state: self.state.unwrap_or_default(),
            data_request,
            resource_manifest: self.resource_manifest,
            provisioned_resources: self.provisioned_resources,
            error_detail: self.error_detail,
        })
    }
}
