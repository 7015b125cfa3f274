//! Run configuration
//!
//! Bounds for the superstep loop: a round limit, a wall-clock limit, and the
//! number of vertex computations allowed in flight at once.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a bounded run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Maximum rounds before the run fails with a bounded error
    pub max_supersteps: u64,

    /// Wall-clock limit; checked between phases, never interrupts a program
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Maximum concurrent vertex computations per phase
    pub parallelism: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_supersteps: 1000,
            timeout: Duration::from_secs(60),
            parallelism: num_cpus::get(),
        }
    }
}

impl RunConfig {
    /// Create a config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the round limit
    pub fn with_max_supersteps(mut self, max: u64) -> Self {
        self.max_supersteps = max;
        self
    }

    /// Set the wall-clock limit
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the compute parallelism (clamped to at least 1)
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunConfig::default();
        assert_eq!(config.max_supersteps, 1000);
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert!(config.parallelism > 0);
    }

    #[test]
    fn test_builder() {
        let config = RunConfig::new()
            .with_max_supersteps(5)
            .with_timeout(Duration::from_millis(250))
            .with_parallelism(2);
        assert_eq!(config.max_supersteps, 5);
        assert_eq!(config.timeout, Duration::from_millis(250));
        assert_eq!(config.parallelism, 2);
    }

    #[test]
    fn test_parallelism_minimum() {
        let config = RunConfig::new().with_parallelism(0);
        assert_eq!(config.parallelism, 1);
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = RunConfig::new().with_timeout(Duration::from_secs(2));
        let json = serde_json::to_string(&config).unwrap();
        let back: RunConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.timeout, Duration::from_secs(2));
        assert_eq!(back.max_supersteps, config.max_supersteps);
    }
}
