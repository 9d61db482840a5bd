//! Expiry configuration shared by the manager and the sweeper.

use std::time::Duration;

/// Default idle lifetime for sessions (1 hour).
pub const DEFAULT_MAX_IDLE: Duration = Duration::from_secs(3600);

/// Expiry configuration for a session store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Sessions idle for at least this long are evicted by a sweep.
    pub max_idle: Duration,

    /// Time between background sweeps.
    /// `None` means sweep once per `max_idle`.
    pub gc_interval: Option<Duration>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_idle: DEFAULT_MAX_IDLE,
            gc_interval: None,
        }
    }
}

impl StoreConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the idle lifetime.
    pub fn with_max_idle(mut self, max_idle: Duration) -> Self {
        self.max_idle = max_idle;
        self
    }

    /// Set an explicit sweep interval.
    pub fn with_gc_interval(mut self, interval: Duration) -> Self {
        self.gc_interval = Some(interval);
        self
    }

    /// Effective interval between background sweeps.
    pub fn gc_interval(&self) -> Duration {
        self.gc_interval.unwrap_or(self.max_idle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gc_interval_defaults_to_max_idle() {
        let config = StoreConfig::new().with_max_idle(Duration::from_secs(60));
        assert_eq!(config.gc_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_explicit_gc_interval() {
        let config = StoreConfig::new()
            .with_max_idle(Duration::from_secs(60))
            .with_gc_interval(Duration::from_secs(5));
        assert_eq!(config.max_idle, Duration::from_secs(60));
        assert_eq!(config.gc_interval(), Duration::from_secs(5));
    }
}
