//! # Remote Message Dispatch
//!
//! Wire-level delivery of data requests to the other connector. Dispatchers
//! register per protocol; the registry routes an already-serialized payload
//! to the dispatcher for the requested protocol and returns its
//! acknowledgment.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    #[error("no dispatcher registered for protocol {0}")]
    NoDispatcherFor(String),
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Delivery context accompanying a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageContext {
    pub process_id: String,
}

impl MessageContext {
    pub fn new(process_id: impl Into<String>) -> Self {
        Self {
            process_id: process_id.into(),
        }
    }
}

#[async_trait]
pub trait RemoteMessageDispatcher: Send + Sync {
    /// The wire protocol this dispatcher speaks
    fn protocol(&self) -> &str;

    /// Deliver `message` and return the remote acknowledgment payload
    async fn send(
        &self,
        message: serde_json::Value,
        context: &MessageContext,
    ) -> Result<serde_json::Value, DispatchError>;
}

#[derive(Default)]
pub struct RemoteMessageDispatcherRegistry {
    dispatchers: HashMap<String, Arc<dyn RemoteMessageDispatcher>>,
}

impl RemoteMessageDispatcherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, dispatcher: Arc<dyn RemoteMessageDispatcher>) {
        self.dispatchers
            .insert(dispatcher.protocol().to_string(), dispatcher);
    }

    pub async fn send(
        &self,
        protocol: &str,
        message: serde_json::Value,
        context: &MessageContext,
    ) -> Result<serde_json::Value, DispatchError> {
        let dispatcher = self
            .dispatchers
            .get(protocol)
            .ok_or_else(|| DispatchError::NoDispatcherFor(protocol.to_string()))?;

        dispatcher.send(message, context).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoDispatcher;

    #[async_trait]
    impl RemoteMessageDispatcher for EchoDispatcher {
        fn protocol(&self) -> &str {
            "echo"
        }

        async fn send(
            &self,
            message: serde_json::Value,
            _context: &MessageContext,
        ) -> Result<serde_json::Value, DispatchError> {
            Ok(message)
        }
    }

    #[tokio::test]
    async fn test_send_routes_by_protocol() {
        let mut registry = RemoteMessageDispatcherRegistry::new();
        registry.register(Arc::new(EchoDispatcher));

        let ack = registry
            .send("echo", json!({"id": "t1"}), &MessageContext::new("p1"))
            .await
            .unwrap();
        assert_eq!(ack, json!({"id": "t1"}));
    }

    #[tokio::test]
    async fn test_send_unknown_protocol_fails() {
        let registry = RemoteMessageDispatcherRegistry::new();
        let err = registry
            .send("ids-multipart", json!({}), &MessageContext::new("p1"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            DispatchError::NoDispatcherFor("ids-multipart".to_string())
        );
    }
}
