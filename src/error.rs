use std::fmt;

use crate::command::CommandError;
use crate::dispatch::DispatchError;
use crate::flow::DataFlowError;
use crate::provision::ProvisionError;
use crate::state_machine::StateTransitionError;
use crate::store::StoreError;

#[derive(Debug, Clone, PartialEq)]
pub enum TransferError {
    StoreError(String),
    StateTransitionError(String),
    ProvisionError(String),
    DispatchError(String),
    DataFlowError(String),
    CommandError(String),
    ValidationError(String),
    InvalidInput(String),
    ConfigurationError(String),
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferError::StoreError(msg) => write!(f, "Store error: {msg}"),
            TransferError::StateTransitionError(msg) => write!(f, "State transition error: {msg}"),
            TransferError::ProvisionError(msg) => write!(f, "Provision error: {msg}"),
            TransferError::DispatchError(msg) => write!(f, "Dispatch error: {msg}"),
            TransferError::DataFlowError(msg) => write!(f, "Data flow error: {msg}"),
            TransferError::CommandError(msg) => write!(f, "Command error: {msg}"),
            TransferError::ValidationError(msg) => write!(f, "Validation error: {msg}"),
            TransferError::InvalidInput(msg) => write!(f, "Invalid input: {msg}"),
            TransferError::ConfigurationError(msg) => write!(f, "Configuration error: {msg}"),
        }
    }
}

impl std::error::Error for TransferError {}

impl From<serde_json::Error> for TransferError {
    fn from(error: serde_json::Error) -> Self {
        TransferError::ValidationError(format!("JSON serialization error: {error}"))
    }
}

impl From<StoreError> for TransferError {
    fn from(error: StoreError) -> Self {
        TransferError::StoreError(error.to_string())
    }
}

impl From<StateTransitionError> for TransferError {
    fn from(error: StateTransitionError) -> Self {
        TransferError::StateTransitionError(error.to_string())
    }
}

impl From<ProvisionError> for TransferError {
    fn from(error: ProvisionError) -> Self {
        TransferError::ProvisionError(error.to_string())
    }
}

impl From<DispatchError> for TransferError {
    fn from(error: DispatchError) -> Self {
        TransferError::DispatchError(error.to_string())
    }
}

impl From<DataFlowError> for TransferError {
    fn from(error: DataFlowError) -> Self {
        TransferError::DataFlowError(error.to_string())
    }
}

impl From<CommandError> for TransferError {
    fn from(error: CommandError) -> Self {
        TransferError::CommandError(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TransferError>;
