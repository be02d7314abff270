use crate::error::{Result, TransferError};
use crate::retry::ExponentialWaitStrategy;

#[derive(Debug, Clone)]
pub struct TransferCoreConfig {
    pub batch_size: usize,
    pub wait_base_ms: u64,
    pub wait_max_ms: u64,
    pub command_capacity: usize,
}

impl Default for TransferCoreConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            wait_base_ms: 1000,
            wait_max_ms: 60000,
            command_capacity: 100,
        }
    }
}

impl TransferCoreConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(batch_size) = std::env::var("TRANSFER_BATCH_SIZE") {
            config.batch_size = batch_size.parse().map_err(|e| {
                TransferError::ConfigurationError(format!("Invalid batch_size: {e}"))
            })?;
        }

        if let Ok(wait_base) = std::env::var("TRANSFER_WAIT_BASE_MS") {
            config.wait_base_ms = wait_base.parse().map_err(|e| {
                TransferError::ConfigurationError(format!("Invalid wait_base_ms: {e}"))
            })?;
        }

        if let Ok(wait_max) = std::env::var("TRANSFER_WAIT_MAX_MS") {
            config.wait_max_ms = wait_max.parse().map_err(|e| {
                TransferError::ConfigurationError(format!("Invalid wait_max_ms: {e}"))
            })?;
        }

        if let Ok(capacity) = std::env::var("TRANSFER_COMMAND_CAPACITY") {
            config.command_capacity = capacity.parse().map_err(|e| {
                TransferError::ConfigurationError(format!("Invalid command_capacity: {e}"))
            })?;
        }

        if config.batch_size == 0 {
            return Err(TransferError::ConfigurationError(
                "batch_size must be greater than zero".to_string(),
            ));
        }

        Ok(config)
    }

    /// Backoff seeded from the configured wait bounds
    pub fn wait_strategy(&self) -> ExponentialWaitStrategy {
        ExponentialWaitStrategy::new(self.wait_base_ms, self.wait_max_ms)
    }
}
