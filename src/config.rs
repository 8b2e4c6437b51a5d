//! Configuration parameters for the construction heuristic and the ALNS.

use crate::alns::destroy::DestroyOperator;
use crate::alns::repair::RepairOperator;
use crate::lockers::LockerPolicy;
use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Configuration settings for the solver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of destroy/repair iterations
    pub max_iterations: usize,
    /// Optional wall-clock limit, checked between iterations
    pub time_limit: Option<Duration>,
    /// Starting temperature of the acceptance criterion
    pub initial_temperature: f64,
    /// Geometric cooling factor applied after every iteration
    pub cooling_rate: f64,
    /// Reaction factor of the operator weight update (α)
    pub learning_rate: f64,
    /// Iterations between two operator weight updates
    pub segment_length: usize,
    /// Score for a new global best
    pub sigma1: f64,
    /// Score for an improvement over the current solution
    pub sigma2: f64,
    /// Score for an accepted worse solution
    pub sigma3: f64,
    /// Range of the fraction of customer stops removed by a destroy operator
    pub removal_fraction: (f64, f64),
    /// Randomisation exponent of worst removal (higher is greedier)
    pub worst_removal_randomness: f64,
    /// Share of the depot deadline a vehicle may use before construction stops opening trips
    pub time_budget_fraction: f64,
    pub destroy_operators: Vec<DestroyOperator>,
    pub repair_operators: Vec<RepairOperator>,
    pub locker_policy: LockerPolicy,
    /// Random seed; a random one is drawn (and logged) when absent
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_iterations: 1000,
            time_limit: None,
            initial_temperature: 100.0,
            cooling_rate: 0.995,
            learning_rate: 0.1,
            segment_length: 100,
            sigma1: 33.0,
            sigma2: 9.0,
            sigma3: 13.0,
            removal_fraction: (0.1, 0.5),
            worst_removal_randomness: 3.0,
            time_budget_fraction: 0.9,
            destroy_operators: DestroyOperator::all().to_vec(),
            repair_operators: RepairOperator::all().to_vec(),
            locker_policy: LockerPolicy::HomeDelivery,
            seed: None,
        }
    }
}

impl Config {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Config::default()
    }

    /// Load a configuration from a JSON file; missing fields take their default values.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Config = serde_json::from_str(&text)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the parameters describe a runnable search.
    pub fn validate(&self) -> anyhow::Result<()> {
        let (low, high) = self.removal_fraction;
        ensure!(
            0.0 <= low && low <= high && high <= 1.0,
            "removal fraction range ({}, {}) must satisfy 0 <= low <= high <= 1",
            low,
            high
        );
        ensure!(self.segment_length > 0, "segment length must be positive");
        ensure!(
            (0.0..=1.0).contains(&self.learning_rate),
            "learning rate must lie in [0, 1]"
        );
        ensure!(
            self.cooling_rate > 0.0 && self.cooling_rate <= 1.0,
            "cooling rate must lie in (0, 1]"
        );
        ensure!(self.initial_temperature >= 0.0, "temperature must be non-negative");
        ensure!(
            !self.destroy_operators.is_empty(),
            "at least one destroy operator is required"
        );
        ensure!(
            !self.repair_operators.is_empty(),
            "at least one repair operator is required"
        );
        Ok(())
    }

    /// Set the number of iterations.
    pub fn with_max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = iterations;
        self
    }

    /// Set the time limit.
    pub fn with_time_limit(mut self, duration: Duration) -> Self {
        self.time_limit = Some(duration);
        self
    }

    /// Set the initial temperature and cooling rate.
    pub fn with_temperature(mut self, initial: f64, cooling_rate: f64) -> Self {
        self.initial_temperature = initial;
        self.cooling_rate = cooling_rate;
        self
    }

    /// Set the reaction factor of the weight update.
    pub fn with_learning_rate(mut self, rate: f64) -> Self {
        self.learning_rate = rate;
        self
    }

    /// Set the segment length.
    pub fn with_segment_length(mut self, length: usize) -> Self {
        self.segment_length = length;
        self
    }

    /// Set the operator scores.
    pub fn with_scores(mut self, sigma1: f64, sigma2: f64, sigma3: f64) -> Self {
        self.sigma1 = sigma1;
        self.sigma2 = sigma2;
        self.sigma3 = sigma3;
        self
    }

    /// Set the removal fraction range.
    pub fn with_removal_fraction(mut self, low: f64, high: f64) -> Self {
        self.removal_fraction = (low, high);
        self
    }

    /// Set the construction time budget as a share of the depot deadline.
    pub fn with_time_budget_fraction(mut self, fraction: f64) -> Self {
        self.time_budget_fraction = fraction;
        self
    }

    /// Restrict the destroy operator pool.
    pub fn with_destroy_operators(mut self, operators: Vec<DestroyOperator>) -> Self {
        self.destroy_operators = operators;
        self
    }

    /// Restrict the repair operator pool.
    pub fn with_repair_operators(mut self, operators: Vec<RepairOperator>) -> Self {
        self.repair_operators = operators;
        self
    }

    /// Set the locker assignment policy.
    pub fn with_locker_policy(mut self, policy: LockerPolicy) -> Self {
        self.locker_policy = policy;
        self
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: Config =
            serde_json::from_str(r#"{ "max_iterations": 12, "seed": 7 }"#).unwrap();
        assert_eq!(config.max_iterations, 12);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.segment_length, Config::default().segment_length);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_inverted_removal_range() {
        let config = Config::new().with_removal_fraction(0.6, 0.2);
        assert!(config.validate().is_err());
    }
}
