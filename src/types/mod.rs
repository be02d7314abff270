// Domain types for the transfer core.
//
// Everything here is an owned value aggregate; cross-links between the
// manifest and provisioned resources are ids, not references.

pub mod data_request;
pub mod resource;
pub mod transfer_process;
pub mod type_manager;

pub use data_request::{DataRequest, TransferType, DEFAULT_PROTOCOL};
pub use resource::{
    ProvisionedResource, ProvisionedResourceSet, ResourceDefinition, ResourceManifest, SecretToken,
};
pub use transfer_process::{TransferProcess, TransferProcessBuilder, TransferProcessType};
pub use type_manager::TypeManager;
