// State machine module for transfer process lifecycle management
//
// Defines the state ladder a transfer process moves along and the legality
// rules every mutation of a process state has to satisfy.

pub mod states;

pub use states::{TransferProcessState, ACTIVE_STATES};

use thiserror::Error;

/// Raised when a transition would leave the legal state graph
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("illegal transfer process transition from {from} to {to}")]
pub struct StateTransitionError {
    pub from: TransferProcessState,
    pub to: TransferProcessState,
}
