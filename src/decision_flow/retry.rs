use std::time::Duration;

use crate::config::DecisionFlowConfig;

/// Bounded retry with a linearly growing delay.
///
/// After the `n`-th failed attempt the next one waits `base_delay × n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay to wait after `attempt` (1-based) has failed.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }

    pub fn allows_another(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts
    }
}

impl From<&DecisionFlowConfig> for RetryPolicy {
    fn from(config: &DecisionFlowConfig) -> Self {
        Self::new(config.max_attempts, config.retry_base_delay)
    }
}
