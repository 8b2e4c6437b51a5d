//! Destroy operators: take a share of the customer stops out of a solution.

use crate::alns::settle_vehicles;
use crate::config::Config;
use crate::problem::Instance;
use crate::solution::Solution;
use crate::utils::Random;
use itertools::Itertools;
use rand::seq::{index, SliceRandom};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Removal strategies. All of them only take customer stops out of trips; depot endpoints,
/// chargers and locker stops stay where they are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DestroyOperator {
    /// Uniformly random customer stops across the whole solution
    RandomRemoval,
    /// Repeatedly a random customer of a random non-empty trip
    TripRandomRemoval,
    /// Customers with the largest detour, randomised
    WorstRemoval,
}

/// Where a removed customer used to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Removal {
    pub customer: usize,
    /// Index into `Solution::vehicles`
    pub vehicle: usize,
    /// Trip index at removal time; emptied trips are pruned afterwards, so later indices may shift
    pub trip: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DestroyOutcome {
    pub removed: Vec<Removal>,
    /// Vehicle indices whose trips changed
    pub touched: Vec<usize>,
}

impl DestroyOutcome {
    pub fn customers(&self) -> Vec<usize> {
        self.removed.iter().map(|r| r.customer).collect()
    }
}

/// Position of a customer stop: (vehicle index, trip index, stop index).
type StopRef = (usize, usize, usize);

impl DestroyOperator {
    pub fn all() -> [DestroyOperator; 3] {
        [
            DestroyOperator::RandomRemoval,
            DestroyOperator::TripRandomRemoval,
            DestroyOperator::WorstRemoval,
        ]
    }

    /// Remove a random share (drawn from the configured range) of the customer stops.
    ///
    /// Emptied trips are pruned and the touched vehicles get a fresh charging plan, schedule and
    /// costs before returning.
    pub fn destroy(
        &self,
        solution: &mut Solution,
        instance: &Instance,
        rng: &mut Random,
        config: &Config,
    ) -> DestroyOutcome {
        let total = customer_stops(solution, instance).len();
        if total == 0 {
            return DestroyOutcome::default();
        }

        let (low, high) = config.removal_fraction;
        let fraction = if high > low {
            rng.gen_range(low..=high)
        } else {
            low
        };
        let count = ((fraction * total as f64).round() as usize).clamp(1, total);

        let removed = match self {
            DestroyOperator::RandomRemoval => random_removal(solution, instance, rng, count),
            DestroyOperator::TripRandomRemoval => trip_random_removal(solution, instance, rng, count),
            DestroyOperator::WorstRemoval => {
                worst_removal(solution, instance, rng, count, config.worst_removal_randomness)
            }
        };

        let touched: Vec<usize> = removed.iter().map(|r| r.vehicle).unique().collect();
        settle_vehicles(solution, &touched, instance);

        DestroyOutcome { removed, touched }
    }
}

fn customer_stops(solution: &Solution, instance: &Instance) -> Vec<StopRef> {
    let mut stops = Vec::new();
    for (v, vehicle) in solution.vehicles.iter().enumerate() {
        for (t, trip) in vehicle.trips.iter().enumerate() {
            for (i, &stop) in trip.stops.iter().enumerate() {
                if instance.is_customer(stop) {
                    stops.push((v, t, i));
                }
            }
        }
    }
    stops
}

fn take(solution: &mut Solution, (v, t, i): StopRef) -> Removal {
    let customer = solution.vehicles[v].trips[t].remove(i);
    Removal {
        customer,
        vehicle: v,
        trip: t,
    }
}

fn random_removal(
    solution: &mut Solution,
    instance: &Instance,
    rng: &mut Random,
    count: usize,
) -> Vec<Removal> {
    let stops = customer_stops(solution, instance);
    let mut chosen: Vec<StopRef> = index::sample(rng, stops.len(), count)
        .into_iter()
        .map(|k| stops[k])
        .collect();

    // back to front so earlier positions stay valid
    chosen.sort_unstable_by(|a, b| b.cmp(a));
    chosen.into_iter().map(|s| take(solution, s)).collect()
}

fn trip_random_removal(
    solution: &mut Solution,
    instance: &Instance,
    rng: &mut Random,
    count: usize,
) -> Vec<Removal> {
    let mut removed = Vec::with_capacity(count);

    while removed.len() < count {
        let trips: Vec<(usize, usize)> = customer_stops(solution, instance)
            .into_iter()
            .map(|(v, t, _)| (v, t))
            .unique()
            .collect();
        let (v, t) = match trips.choose(rng) {
            Some(trip) => *trip,
            None => break,
        };

        let positions: Vec<usize> = solution.vehicles[v].trips[t]
            .stops
            .iter()
            .positions(|&s| instance.is_customer(s))
            .collect();
        if let Some(&i) = positions.choose(rng) {
            removed.push(take(solution, (v, t, i)));
        }
    }

    removed
}

/// Distance saved by skipping the stop at `i`.
fn detour(solution: &Solution, instance: &Instance, (v, t, i): StopRef) -> f64 {
    let stops = &solution.vehicles[v].trips[t].stops;
    let (prev, stop, next) = (stops[i - 1], stops[i], stops[i + 1]);
    instance.distance(prev, stop) + instance.distance(stop, next) - instance.distance(prev, next)
}

fn worst_removal(
    solution: &mut Solution,
    instance: &Instance,
    rng: &mut Random,
    count: usize,
    randomness: f64,
) -> Vec<Removal> {
    let mut removed = Vec::with_capacity(count);

    while removed.len() < count {
        let mut ranked: Vec<(f64, StopRef)> = customer_stops(solution, instance)
            .into_iter()
            .map(|s| (detour(solution, instance, s), s))
            .collect();
        if ranked.is_empty() {
            break;
        }
        ranked.sort_unstable_by(|a, b| b.0.total_cmp(&a.0));

        let y: f64 = rng.gen();
        let pick = ((y.powf(randomness) * ranked.len() as f64) as usize).min(ranked.len() - 1);
        removed.push(take(solution, ranked[pick].1));
    }

    removed
}
