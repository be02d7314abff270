//! # transfer-core
//!
//! Coordination core of a data-space connector: a persistent, restartable
//! state machine that drives data-transfer jobs between a consumer and a
//! provider through provisioning, request dispatch, in-flight monitoring,
//! and tear-down. Persistence adapters, cloud provisioners, credential
//! providers, and wire protocols plug in through the traits in the
//! component modules.

pub mod command;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod flow;
pub mod logging;
pub mod manager;
pub mod observe;
pub mod provision;
pub mod retry;
pub mod state_machine;
pub mod status;
pub mod store;
pub mod types;

pub use config::TransferCoreConfig;
pub use error::{Result, TransferError};
pub use manager::TransferProcessManager;
pub use state_machine::TransferProcessState;
pub use types::{DataRequest, TransferProcess, TransferProcessType};
