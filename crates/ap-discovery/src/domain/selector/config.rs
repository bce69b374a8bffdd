//! Selector configuration.

use crate::domain::ConfigError;

/// Backoff bounds for failed servers.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SelectorConfig {
    /// Cooldown after the first failure with no prior backoff
    pub initial_backoff_ms: u64,
    /// Upper bound for the doubled cooldown
    pub max_backoff_ms: u64,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            initial_backoff_ms: 4_000,
            max_backoff_ms: 30_000,
        }
    }
}

impl SelectorConfig {
    /// Short cooldowns for tests driving a manual clock.
    pub fn for_testing() -> Self {
        Self {
            initial_backoff_ms: 100,
            max_backoff_ms: 800,
        }
    }

    #[must_use]
    pub fn with_backoff(mut self, initial_ms: u64, max_ms: u64) -> Self {
        self.initial_backoff_ms = initial_ms;
        self.max_backoff_ms = max_ms;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_backoff_ms == 0 {
            return Err(ConfigError::Zero("initial_backoff_ms"));
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(ConfigError::BackoffRange {
                initial_ms: self.initial_backoff_ms,
                max_ms: self.max_backoff_ms,
            });
        }
        Ok(())
    }

    /// Next cooldown given the current one.
    ///
    /// Depends only on the previous backoff, whether or not the server ever
    /// succeeded: `initial` first, then doubling up to `max`.
    pub fn next_backoff(&self, current_ms: u64) -> u64 {
        if current_ms == 0 {
            self.initial_backoff_ms
        } else {
            current_ms.saturating_mul(2).min(self.max_backoff_ms)
        }
    }
}
