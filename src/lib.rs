//! # EVRP-ALNS
//!
//! Adaptive Large Neighbourhood Search for an electric vehicle routing problem with parcel
//! lockers and deadlines.
//!
//! Vehicles with limited battery and load volume run one or more depot-to-depot trips, may
//! recharge at the depot or at chargers, and serve customers either at home or through a parcel
//! locker. The objective sums travel cost, vehicle deployment cost, locker opening cost and
//! lateness penalties at customers and at the depot.
//!
//! A nearest-neighbour construction heuristic builds the initial solution, which the ALNS then
//! improves with adaptive destroy/repair operators and simulated annealing acceptance.

pub mod alns;
pub mod config;
pub mod construction;
pub mod evaluation;
pub mod feasibility;
pub mod io;
pub mod lockers;
pub mod problem;
pub mod simulation;
pub mod solution;
pub mod utils;

use crate::alns::{reported_objective, Alns};
use crate::config::Config;
use crate::construction::Construction;
use crate::feasibility::{check_solution, FeasibilityReport};
use crate::lockers::LockerAssignment;
use crate::problem::Instance;
use crate::solution::Solution;
use crate::utils::{create_seeded_rng, SearchStatistics};

use log::{info, warn};
use std::time::Instant;

/// Result of a full solver run.
#[derive(Debug, Clone)]
pub struct SolveOutcome {
    pub solution: Solution,
    pub report: FeasibilityReport,
    pub statistics: SearchStatistics,
    /// Best objective after every ALNS iteration
    pub best_trace: Vec<f64>,
}

/// Construction followed by ALNS improvement on one instance.
pub struct EvrpSolver {
    pub instance: Instance,
    pub config: Config,
}

impl EvrpSolver {
    pub fn new(instance: Instance, config: Config) -> Self {
        EvrpSolver { instance, config }
    }

    /// Build the initial solution with the configured locker policy.
    pub fn construct(&self) -> Solution {
        let designations = self.config.locker_policy.assign(&self.instance);
        Construction::new(self.config.time_budget_fraction).construct(&self.instance, designations)
    }

    /// Run construction and the ALNS, then check the best solution.
    pub fn run(&self) -> anyhow::Result<SolveOutcome> {
        self.config.validate()?;
        let start = Instant::now();
        let (seed, mut rng) = create_seeded_rng(self.config.seed);
        info!("solving {} with seed {}", self.instance.name, seed);

        let initial = self.construct();
        let initial_objective =
            reported_objective(&initial, check_solution(&initial, &self.instance).is_feasible());
        info!(
            "initial solution: objective {:.2}, {} vehicle(s) used",
            initial.objective,
            initial.get_used_vehicle_count(&self.instance)
        );

        let mut alns = Alns::new(&self.instance, &self.config);
        let result = alns.run(initial, &mut rng);

        let report = check_solution(&result.best, &self.instance);
        if !report.is_feasible() {
            warn!(
                "best solution is infeasible with {} violation(s)",
                report.diagnostics.len()
            );
        }

        let statistics = SearchStatistics {
            seed,
            iterations: result.statistics.iterations,
            runtime: start.elapsed(),
            initial_objective,
            best_objective: reported_objective(&result.best, report.is_feasible()),
            best_costs: result.best.cost_totals(),
            best_is_feasible: report.is_feasible(),
            vehicles_used: result.best.get_used_vehicle_count(&self.instance),
            infeasible_candidates: result.statistics.infeasible_candidates,
            new_bests: result.statistics.new_bests,
            final_temperature: result.statistics.final_temperature,
        };

        Ok(SolveOutcome {
            solution: result.best,
            report,
            statistics,
            best_trace: result.statistics.best_trace,
        })
    }
}
