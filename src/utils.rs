//! Utility functions and structures for the solver.

use std::time::Duration;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::evaluation::CostBreakdown;

/// The single pseudo-random source threaded through the search.
pub type Random = ChaCha8Rng;

/// Create the search RNG; a missing seed is drawn from entropy and returned for logging.
pub fn create_seeded_rng(seed: Option<u64>) -> (u64, Random) {
    let seed = seed.unwrap_or_else(rand::random);
    (seed, ChaCha8Rng::seed_from_u64(seed))
}

/// Format a duration as hours, minutes, and seconds.
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}h {:02}m {:02}s", hours, minutes, seconds)
}

/// Summary of a finished solver run.
#[derive(Debug, Clone)]
pub struct SearchStatistics {
    pub seed: u64,
    pub iterations: usize,
    pub runtime: Duration,
    /// Infinite when construction left the solution infeasible
    pub initial_objective: f64,
    pub best_objective: f64,
    pub best_costs: CostBreakdown,
    pub best_is_feasible: bool,
    pub vehicles_used: usize,
    pub infeasible_candidates: usize,
    pub new_bests: usize,
    pub final_temperature: f64,
}

impl SearchStatistics {
    /// Format the statistics as a string.
    pub fn format(&self) -> String {
        format!(
            "Search Statistics:
- Seed: {}
- Iterations: {}
- Runtime: {}
- Initial Objective: {:.2}
- Best Objective: {:.2}
  - Customer Penalty: {:.2}
  - Depot Penalty: {:.2}
  - Locker Cost: {:.2}
  - Deployment Cost: {:.2}
  - Travel Cost: {:.2}
- Best Solution Feasible: {}
- Vehicles Used: {}
- Infeasible Candidates: {}
- New Bests Found: {}
- Final Temperature: {:.4}",
            self.seed,
            self.iterations,
            format_duration(self.runtime),
            self.initial_objective,
            self.best_objective,
            self.best_costs.customer_penalty,
            self.best_costs.depot_penalty,
            self.best_costs.locker,
            self.best_costs.deployment,
            self.best_costs.travel,
            self.best_is_feasible,
            self.vehicles_used,
            self.infeasible_candidates,
            self.new_bests,
            self.final_temperature
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn same_seed_same_stream() {
        let (_, mut a) = create_seeded_rng(Some(42));
        let (_, mut b) = create_seeded_rng(Some(42));
        let xs: Vec<u32> = (0..5).map(|_| a.gen()).collect();
        let ys: Vec<u32> = (0..5).map(|_| b.gen()).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn formats_durations() {
        assert_eq!(format_duration(Duration::from_secs(3725)), "1h 02m 05s");
    }
}
