//! # Transfer Process Observable
//!
//! Synchronous listener notification after every successful state change.
//! Listener failures are logged and never affect scheduling; delivery order
//! within a tick matches the sequence of successful updates.

use std::sync::{Arc, RwLock};

use thiserror::Error;
use tracing::warn;

use crate::types::TransferProcess;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ListenerError(pub String);

pub trait TransferProcessListener: Send + Sync {
    fn on_transition(&self, process: &TransferProcess) -> Result<(), ListenerError>;
}

#[derive(Default)]
pub struct TransferProcessObservable {
    listeners: RwLock<Vec<Arc<dyn TransferProcessListener>>>,
}

impl TransferProcessObservable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_listener(&self, listener: Arc<dyn TransferProcessListener>) {
        if let Ok(mut listeners) = self.listeners.write() {
            listeners.push(listener);
        }
    }

    /// Remove a previously registered listener, matched by identity
    pub fn unregister_listener(&self, listener: &Arc<dyn TransferProcessListener>) {
        if let Ok(mut listeners) = self.listeners.write() {
            listeners.retain(|l| !Arc::ptr_eq(l, listener));
        }
    }

    pub fn invoke_for_each(&self, process: &TransferProcess) {
        let listeners = match self.listeners.read() {
            Ok(listeners) => listeners.clone(),
            Err(_) => return,
        };
        for listener in listeners {
            if let Err(error) = listener.on_transition(process) {
                warn!(
                    process_id = %process.id(),
                    state = %process.state(),
                    error = %error,
                    "transfer process listener failed"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataRequest;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingListener {
        invocations: AtomicUsize,
        fail: bool,
    }

    impl TransferProcessListener for CountingListener {
        fn on_transition(&self, _process: &TransferProcess) -> Result<(), ListenerError> {
            self.invocations.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ListenerError("listener exploded".to_string()));
            }
            Ok(())
        }
    }

    fn process() -> TransferProcess {
        TransferProcess::builder()
            .id("p1")
            .data_request(DataRequest::new("t1", "bucket"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_listeners_are_invoked_in_order() {
        let observable = TransferProcessObservable::new();
        let listener = Arc::new(CountingListener::default());
        observable.register_listener(listener.clone());

        observable.invoke_for_each(&process());
        observable.invoke_for_each(&process());
        assert_eq!(listener.invocations.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_failing_listener_does_not_stop_others() {
        let observable = TransferProcessObservable::new();
        let failing = Arc::new(CountingListener {
            invocations: AtomicUsize::new(0),
            fail: true,
        });
        let healthy = Arc::new(CountingListener::default());
        observable.register_listener(failing.clone());
        observable.register_listener(healthy.clone());

        observable.invoke_for_each(&process());
        assert_eq!(failing.invocations.load(Ordering::SeqCst), 1);
        assert_eq!(healthy.invocations.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unregister_by_identity() {
        let observable = TransferProcessObservable::new();
        let listener: Arc<dyn TransferProcessListener> = Arc::new(CountingListener::default());
        observable.register_listener(listener.clone());
        observable.unregister_listener(&listener);

        observable.invoke_for_each(&process());
    }
}
