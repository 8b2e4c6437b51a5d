//! Adaptive large neighbourhood search over complete solutions.
//!
//! Each iteration picks one destroy and one repair operator by roulette over their adaptive
//! weights, applies them to a copy of the current solution, discards infeasible candidates and
//! decides acceptance by simulated annealing.

pub mod acceptance;
pub mod destroy;
pub mod repair;

use crate::alns::acceptance::SimulatedAnnealing;
use crate::alns::destroy::DestroyOperator;
use crate::alns::repair::RepairOperator;
use crate::config::Config;
use crate::feasibility::check_solution;
use crate::problem::Instance;
use crate::simulation::EPSILON;
use crate::solution::Solution;
use crate::utils::Random;
use log::{debug, info};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::Serialize;
use std::time::{Duration, Instant};

/// Adaptive statistics of one operator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperatorStats {
    pub weight: f64,
    /// Score collected in the current segment
    pub score: f64,
    /// Selections in the current segment, starting at 1
    pub usage: f64,
}

impl Default for OperatorStats {
    fn default() -> Self {
        OperatorStats {
            weight: 1.0,
            score: 0.0,
            usage: 1.0,
        }
    }
}

impl OperatorStats {
    /// Blend the segment's average score into the weight and start a new segment.
    pub fn end_segment(&mut self, learning_rate: f64) {
        self.weight = self.weight * (1.0 - learning_rate) + learning_rate * (self.score / self.usage);
        self.score = 0.0;
        self.usage = 1.0;
    }
}

/// A set of interchangeable operators with their adaptive statistics.
#[derive(Debug, Clone)]
pub struct OperatorPool<T> {
    pub operators: Vec<T>,
    pub stats: Vec<OperatorStats>,
}

impl<T: Copy> OperatorPool<T> {
    pub fn new(operators: &[T]) -> Self {
        OperatorPool {
            operators: operators.to_vec(),
            stats: vec![OperatorStats::default(); operators.len()],
        }
    }

    /// Roulette-wheel selection proportional to the weights; uniform if all weights vanished.
    /// Counts the selection as a use.
    pub fn select(&mut self, rng: &mut Random) -> usize {
        let index = match WeightedIndex::new(self.stats.iter().map(|s| s.weight)) {
            Ok(distribution) => distribution.sample(rng),
            Err(_) => rng.gen_range(0..self.operators.len()),
        };
        self.stats[index].usage += 1.0;
        index
    }

    pub fn reward(&mut self, index: usize, score: f64) {
        self.stats[index].score += score;
    }

    pub fn end_segment(&mut self, learning_rate: f64) {
        for stats in self.stats.iter_mut() {
            stats.end_segment(learning_rate);
        }
    }

    /// Each operator with its current weight.
    pub fn weights(&self) -> Vec<(T, f64)> {
        self.operators
            .iter()
            .copied()
            .zip(self.stats.iter().map(|s| s.weight))
            .collect()
    }
}

/// Re-plan charging, prune emptied trips and refresh costs of the given vehicles, then the
/// objective.
pub(crate) fn settle_vehicles(solution: &mut Solution, touched: &[usize], instance: &Instance) {
    for &v in touched {
        let vehicle = &mut solution.vehicles[v];
        vehicle.prune_empty_trips(instance);
        vehicle.replan_charging(instance);
        vehicle.refresh(instance, &solution.locker_delivery);
    }
    solution.update_objective();
}

/// Counters collected during a search.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AlnsStatistics {
    pub iterations: usize,
    pub infeasible_candidates: usize,
    pub accepted_worse: usize,
    pub improvements: usize,
    pub new_bests: usize,
    pub final_temperature: f64,
    pub destroy_weights: Vec<(DestroyOperator, f64)>,
    pub repair_weights: Vec<(RepairOperator, f64)>,
    /// Best objective after every iteration, infinite while no feasible solution is known
    pub best_trace: Vec<f64>,
    pub runtime: Duration,
}

/// Objective as reported to callers: an infeasible solution counts as infinitely bad.
pub fn reported_objective(solution: &Solution, feasible: bool) -> f64 {
    if feasible {
        solution.objective
    } else {
        f64::INFINITY
    }
}

#[derive(Debug, Clone)]
pub struct AlnsResult {
    pub best: Solution,
    pub best_is_feasible: bool,
    pub statistics: AlnsStatistics,
}

/// The search context: operator pools, acceptance state and the owning configuration.
pub struct Alns<'a> {
    instance: &'a Instance,
    config: &'a Config,
    pub destroy: OperatorPool<DestroyOperator>,
    pub repair: OperatorPool<RepairOperator>,
    acceptance: SimulatedAnnealing,
}

impl<'a> Alns<'a> {
    pub fn new(instance: &'a Instance, config: &'a Config) -> Self {
        Alns {
            instance,
            config,
            destroy: OperatorPool::new(&config.destroy_operators),
            repair: OperatorPool::new(&config.repair_operators),
            acceptance: SimulatedAnnealing::new(config.initial_temperature, config.cooling_rate),
        }
    }

    fn time_is_up(&self, start: Instant) -> bool {
        matches!(self.config.time_limit, Some(limit) if start.elapsed() >= limit)
    }

    /// Run the search from `initial` until the iteration budget or time limit is exhausted.
    pub fn run(&mut self, initial: Solution, rng: &mut Random) -> AlnsResult {
        let start = Instant::now();
        let instance = self.instance;
        let config = self.config;

        let mut current_feasible = check_solution(&initial, instance).is_feasible();
        let mut best_feasible = current_feasible;
        let mut current = initial;
        let mut best = current.clone();
        let mut stats = AlnsStatistics::default();

        info!(
            "ALNS start: objective {:.2} (feasible: {}), temperature {:.2}",
            current.objective,
            current_feasible,
            self.acceptance.temperature()
        );

        for iteration in 0..config.max_iterations {
            if self.time_is_up(start) {
                info!("time limit reached after {} iterations", iteration);
                break;
            }
            stats.iterations += 1;

            let d = self.destroy.select(rng);
            let r = self.repair.select(rng);
            let destroy_op = self.destroy.operators[d];
            let repair_op = self.repair.operators[r];

            let mut candidate = current.clone();
            let destroyed = destroy_op.destroy(&mut candidate, instance, rng, config);
            let mut customers = destroyed.customers();
            for customer in candidate.unvisited_customers(instance) {
                if !customers.contains(&customer) {
                    customers.push(customer);
                }
            }
            let repaired = repair_op.repair(&mut candidate, &customers, instance, rng);

            if !repaired.unplaced.is_empty() || !check_solution(&candidate, instance).is_feasible() {
                stats.infeasible_candidates += 1;
                debug!(
                    "iteration {}: {:?}/{:?} produced an infeasible candidate ({} unplaced)",
                    iteration,
                    destroy_op,
                    repair_op,
                    repaired.unplaced.len()
                );
            } else {
                let score = if !best_feasible || candidate.objective < best.objective - EPSILON {
                    info!(
                        "iteration {}: new best {:.2} ({:?}/{:?})",
                        iteration, candidate.objective, destroy_op, repair_op
                    );
                    best = candidate.clone();
                    best_feasible = true;
                    stats.new_bests += 1;
                    stats.improvements += 1;
                    Some(config.sigma1)
                } else if !current_feasible || candidate.objective < current.objective - EPSILON {
                    stats.improvements += 1;
                    Some(config.sigma2)
                } else if self.acceptance.accept(current.objective, candidate.objective, rng) {
                    stats.accepted_worse += 1;
                    Some(config.sigma3)
                } else {
                    None
                };

                if let Some(score) = score {
                    debug!(
                        "iteration {}: accepted {:.2} (current was {:.2})",
                        iteration, candidate.objective, current.objective
                    );
                    self.destroy.reward(d, score);
                    self.repair.reward(r, score);
                    current = candidate;
                    current_feasible = true;
                }
            }

            if (iteration + 1) % config.segment_length == 0 {
                self.destroy.end_segment(config.learning_rate);
                self.repair.end_segment(config.learning_rate);
                info!(
                    "segment end at iteration {}: best {:.2}, current {:.2}, temperature {:.4}",
                    iteration + 1,
                    best.objective,
                    current.objective,
                    self.acceptance.temperature()
                );
                debug!(
                    "weights: destroy {:?}, repair {:?}",
                    self.destroy.weights(),
                    self.repair.weights()
                );
            }

            self.acceptance.cool();
            stats.best_trace.push(reported_objective(&best, best_feasible));
        }

        stats.final_temperature = self.acceptance.temperature();
        stats.destroy_weights = self.destroy.weights();
        stats.repair_weights = self.repair.weights();
        stats.runtime = start.elapsed();

        info!(
            "ALNS finished: {} iterations, best {:.2}, {} new bests, {} infeasible candidates",
            stats.iterations, best.objective, stats.new_bests, stats.infeasible_candidates
        );

        AlnsResult {
            best,
            best_is_feasible: best_feasible,
            statistics: stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::create_seeded_rng;

    #[test]
    fn weight_update_blends_average_score() {
        let mut stats = OperatorStats::default();
        stats.usage = 4.0;
        stats.score = 20.0;
        stats.end_segment(0.5);
        assert!((stats.weight - 3.0).abs() < 1e-12);
        assert_eq!(stats.score, 0.0);
        assert_eq!(stats.usage, 1.0);
    }

    #[test]
    fn selection_counts_usage() {
        let (_, mut rng) = create_seeded_rng(Some(1));
        let mut pool = OperatorPool::new(&DestroyOperator::all());
        for _ in 0..10 {
            pool.select(&mut rng);
        }
        let usage: f64 = pool.stats.iter().map(|s| s.usage).sum();
        assert_eq!(usage, 13.0);
    }

    #[test]
    fn zero_weights_fall_back_to_uniform() {
        let (_, mut rng) = create_seeded_rng(Some(1));
        let mut pool = OperatorPool::new(&RepairOperator::all());
        for stats in pool.stats.iter_mut() {
            stats.weight = 0.0;
        }
        let index = pool.select(&mut rng);
        assert!(index < 2);
    }
}
