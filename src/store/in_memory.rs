use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{StoreError, TransferProcessStore};
use crate::state_machine::TransferProcessState;
use crate::types::TransferProcess;

/// In-memory store backed by maps under a single `RwLock`.
///
/// `next_for_state` returns processes in creation order, which keeps batch
/// ordering deterministic for tests and single-node deployments.
#[derive(Debug, Default)]
pub struct InMemoryTransferProcessStore {
    inner: RwLock<StoreInner>,
}

#[derive(Debug, Default)]
struct StoreInner {
    processes: HashMap<String, TransferProcess>,
    creation_order: Vec<String>,
    transfer_ids: HashMap<String, String>,
}

impl InMemoryTransferProcessStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransferProcessStore for InMemoryTransferProcessStore {
    async fn next_for_state(
        &self,
        state: TransferProcessState,
        batch_size: usize,
    ) -> Result<Vec<TransferProcess>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .creation_order
            .iter()
            .filter_map(|id| inner.processes.get(id))
            .filter(|p| p.state() == state)
            .take(batch_size)
            .cloned()
            .collect())
    }

    async fn find(&self, process_id: &str) -> Result<Option<TransferProcess>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.processes.get(process_id).cloned())
    }

    async fn process_id_for_transfer_id(
        &self,
        transfer_id: &str,
    ) -> Result<Option<String>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.transfer_ids.get(transfer_id).cloned())
    }

    async fn create(&self, process: TransferProcess) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.processes.contains_key(process.id()) {
            return Err(StoreError::DuplicateId(process.id().to_string()));
        }
        let process_id = process.id().to_string();
        inner
            .transfer_ids
            .insert(process.data_request().id.clone(), process_id.clone());
        inner.creation_order.push(process_id.clone());
        inner.processes.insert(process_id, process);
        Ok(())
    }

    async fn update(&self, process: TransferProcess) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if !inner.processes.contains_key(process.id()) {
            return Err(StoreError::NotFound(process.id().to_string()));
        }
        inner.processes.insert(process.id().to_string(), process);
        Ok(())
    }
}
