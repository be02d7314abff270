//! # Out-of-band Commands
//!
//! Control commands interleaved with state advancement. The scheduler
//! drains the queue at the start of every tick and applies each command
//! through the runner; command failures are logged by the caller and never
//! stop the tick.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::info;

use crate::observe::TransferProcessObservable;
use crate::state_machine::{StateTransitionError, TransferProcessState};
use crate::store::{StoreError, TransferProcessStore};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("command queue is full")]
    QueueFull,
    #[error("transfer process {0} not found")]
    ProcessNotFound(String),
    #[error("transfer process {process_id} in state {state} cannot accept the command")]
    IllegalState {
        process_id: String,
        state: TransferProcessState,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Transition(#[from] StateTransitionError),
}

/// Operator-issued control commands over a single transfer process
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferProcessCommand {
    /// Abort a live process; it moves to the error state
    Cancel { process_id: String },
    /// Start tear-down of a completed process ahead of the scheduler
    Deprovision { process_id: String },
}

impl TransferProcessCommand {
    pub fn process_id(&self) -> &str {
        match self {
            Self::Cancel { process_id } | Self::Deprovision { process_id } => process_id,
        }
    }
}

/// Bounded FIFO of pending commands
pub struct CommandQueue {
    commands: Mutex<VecDeque<TransferProcessCommand>>,
    capacity: usize,
}

impl CommandQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            commands: Mutex::new(VecDeque::new()),
            capacity,
        }
    }

    pub fn enqueue(&self, command: TransferProcessCommand) -> Result<(), CommandError> {
        let mut commands = self.commands.lock().expect("command queue lock poisoned");
        if commands.len() >= self.capacity {
            return Err(CommandError::QueueFull);
        }
        commands.push_back(command);
        Ok(())
    }

    /// Drain up to `max` commands in arrival order
    pub fn dequeue(&self, max: usize) -> Vec<TransferProcessCommand> {
        let mut commands = self.commands.lock().expect("command queue lock poisoned");
        let count = commands.len().min(max);
        commands.drain(..count).collect()
    }

    pub fn len(&self) -> usize {
        self.commands.lock().expect("command queue lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Applies commands against the store, notifying listeners on every
/// successful state change exactly like the scheduler handlers do.
pub struct CommandRunner {
    store: Arc<dyn TransferProcessStore>,
    observable: Arc<TransferProcessObservable>,
}

impl CommandRunner {
    pub fn new(
        store: Arc<dyn TransferProcessStore>,
        observable: Arc<TransferProcessObservable>,
    ) -> Self {
        Self { store, observable }
    }

    pub async fn run(&self, command: &TransferProcessCommand) -> Result<(), CommandError> {
        let process_id = command.process_id();
        let mut process = self
            .store
            .find(process_id)
            .await?
            .ok_or_else(|| CommandError::ProcessNotFound(process_id.to_string()))?;

        match command {
            TransferProcessCommand::Cancel { .. } => {
                if process.state().is_terminal() {
                    return Err(CommandError::IllegalState {
                        process_id: process_id.to_string(),
                        state: process.state(),
                    });
                }
                process.transition_error("transfer process cancelled")?;
            }
            TransferProcessCommand::Deprovision { .. } => {
                if process.state() != TransferProcessState::Completed {
                    return Err(CommandError::IllegalState {
                        process_id: process_id.to_string(),
                        state: process.state(),
                    });
                }
                process.transition_deprovisioning()?;
            }
        }

        self.store.update(process.clone()).await?;
        self.observable.invoke_for_each(&process);
        info!(
            process_id = %process_id,
            state = %process.state(),
            "applied transfer process command"
        );
        Ok(())
    }
}
