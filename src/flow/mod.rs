//! # Data Flow
//!
//! Provider-side entry into the actual data movement. The manager resolves
//! the first controller that can handle a request; controllers are ordered
//! by registration.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{DataRequest, TransferProcess};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataFlowError {
    #[error("no data flow controller can handle destination type {0}")]
    NoControllerFor(String),
    #[error("{0}")]
    InitiateFailed(String),
}

/// Successful initiation; `endpoint_ref` identifies the running flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFlowResponse {
    pub endpoint_ref: String,
}

#[async_trait]
pub trait DataFlowController: Send + Sync {
    fn can_handle(&self, request: &DataRequest) -> bool;

    async fn initiate(
        &self,
        process: &TransferProcess,
    ) -> Result<DataFlowResponse, DataFlowError>;
}

#[derive(Default)]
pub struct DataFlowManager {
    controllers: Vec<Arc<dyn DataFlowController>>,
}

impl DataFlowManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, controller: Arc<dyn DataFlowController>) {
        self.controllers.push(controller);
    }

    pub async fn initiate(
        &self,
        process: &TransferProcess,
    ) -> Result<DataFlowResponse, DataFlowError> {
        let request = process.data_request();
        let controller = self
            .controllers
            .iter()
            .find(|c| c.can_handle(request))
            .ok_or_else(|| DataFlowError::NoControllerFor(request.destination_type.clone()))?;

        controller.initiate(process).await
    }
}
