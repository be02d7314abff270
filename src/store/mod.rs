//! # Transfer Process Store
//!
//! Persistent repository of transfer processes, indexed by process id and
//! queryable by state. The scheduler is the only writer; async completion
//! callbacks re-enter exclusively through `find` + `update`.
//!
//! `next_for_state` carries no leasing contract: the scheduler tolerates a
//! returned process that a concurrent callback already advanced, because
//! every transition re-validates against the legal state graph.

pub mod in_memory;

pub use in_memory::InMemoryTransferProcessStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::state_machine::TransferProcessState;
use crate::types::TransferProcess;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("transfer process {0} already exists")]
    DuplicateId(String),
    #[error("transfer process {0} not found")]
    NotFound(String),
    #[error("store backend failure: {0}")]
    Backend(String),
}

#[async_trait]
pub trait TransferProcessStore: Send + Sync {
    /// Up to `batch_size` processes currently in `state`, in store order
    async fn next_for_state(
        &self,
        state: TransferProcessState,
        batch_size: usize,
    ) -> Result<Vec<TransferProcess>, StoreError>;

    async fn find(&self, process_id: &str) -> Result<Option<TransferProcess>, StoreError>;

    /// The id of the process backing the given transfer id, if one exists.
    /// Backs idempotent initiation: at most one process per transfer id.
    async fn process_id_for_transfer_id(
        &self,
        transfer_id: &str,
    ) -> Result<Option<String>, StoreError>;

    /// Persist a new process; duplicate process ids are rejected
    async fn create(&self, process: TransferProcess) -> Result<(), StoreError>;

    async fn update(&self, process: TransferProcess) -> Result<(), StoreError>;
}
