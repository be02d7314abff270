use serde::{Deserialize, Serialize};

pub const DEFAULT_PROTOCOL: &str = "ids-multipart";

/// Shape of a transfer: finite transfers end on their own, non-finite ones
/// stream until torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferType {
    pub is_finite: bool,
}

impl TransferType {
    pub fn finite() -> Self {
        Self { is_finite: true }
    }

    pub fn non_finite() -> Self {
        Self { is_finite: false }
    }
}

impl Default for TransferType {
    fn default() -> Self {
        Self::finite()
    }
}

/// The immutable request that spawned a transfer process.
///
/// `id` is the transfer id used for idempotent initiation; it is distinct
/// from the id of the process backing it. Connector, protocol, and
/// destination descriptors are opaque to the scheduler and only travel to
/// provisioners and dispatchers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataRequest {
    pub id: String,
    pub destination_type: String,
    #[serde(default)]
    pub transfer_type: TransferType,
    pub managed_resources: bool,
    pub protocol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connector_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connector_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_destination: Option<serde_json::Value>,
}

impl DataRequest {
    pub fn new(id: impl Into<String>, destination_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            destination_type: destination_type.into(),
            transfer_type: TransferType::default(),
            managed_resources: true,
            protocol: DEFAULT_PROTOCOL.to_string(),
            connector_id: None,
            connector_address: None,
            data_destination: None,
        }
    }

    pub fn with_transfer_type(mut self, transfer_type: TransferType) -> Self {
        self.transfer_type = transfer_type;
        self
    }

    pub fn with_managed_resources(mut self, managed: bool) -> Self {
        self.managed_resources = managed;
        self
    }

    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    pub fn with_connector_id(mut self, connector_id: impl Into<String>) -> Self {
        self.connector_id = Some(connector_id.into());
        self
    }

    pub fn with_connector_address(mut self, address: impl Into<String>) -> Self {
        self.connector_address = Some(address.into());
        self
    }

    pub fn with_data_destination(mut self, destination: serde_json::Value) -> Self {
        self.data_destination = Some(destination);
        self
    }
}
