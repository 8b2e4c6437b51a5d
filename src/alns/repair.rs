//! Repair operators: put removed customers back at their cheapest feasible position.

use crate::problem::{Instance, DEPOT};
use crate::simulation::EPSILON;
use crate::solution::{stop_demand, Solution, Trip, VehicleState};
use crate::utils::Random;
use log::debug;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Insertion strategies used to put removed customers back into a solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RepairOperator {
    /// Cheapest position over all trips, with trip splitting and charger detours
    GreedyInsertion,
    /// Cheapest position among those that fit capacity and a direct-arc battery bound
    SimpleInsertion,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepairOutcome {
    /// Customers for which no feasible insertion was found
    pub unplaced: Vec<usize>,
    /// Vehicle indices whose trips changed
    pub touched: Vec<usize>,
}

/// A fully evaluated insertion: the vehicle's new state and its cost change.
struct Candidate {
    vehicle: usize,
    state: VehicleState,
    delta: f64,
}

impl RepairOperator {
    pub fn all() -> [RepairOperator; 2] {
        [RepairOperator::GreedyInsertion, RepairOperator::SimpleInsertion]
    }

    /// Insert `customers` one by one, in random order, at their cheapest feasible position.
    /// Customers with no feasible position anywhere go on a new single-customer trip; if even
    /// that fails they are reported as unplaced.
    pub fn repair(
        &self,
        solution: &mut Solution,
        customers: &[usize],
        instance: &Instance,
        rng: &mut Random,
    ) -> RepairOutcome {
        let mut order = customers.to_vec();
        order.shuffle(rng);

        let mut outcome = RepairOutcome::default();
        for customer in order {
            let best = self
                .best_insertion(solution, customer, instance)
                .or_else(|| new_trip_insertion(solution, customer, instance));

            match best {
                Some(candidate) => {
                    debug!(
                        "inserted customer {} into vehicle {} (delta {:.2})",
                        customer, solution.vehicles[candidate.vehicle].vehicle_id, candidate.delta
                    );
                    solution.vehicles[candidate.vehicle] = candidate.state;
                    if !outcome.touched.contains(&candidate.vehicle) {
                        outcome.touched.push(candidate.vehicle);
                    }
                }
                None => outcome.unplaced.push(customer),
            }
        }

        solution.update_objective();
        outcome
    }

    fn best_insertion(&self, solution: &Solution, customer: usize, instance: &Instance) -> Option<Candidate> {
        let mut best: Option<Candidate> = None;

        for (v, vehicle) in solution.vehicles.iter().enumerate() {
            for (t, trip) in vehicle.trips.iter().enumerate() {
                for pos in 1..trip.stops.len() {
                    let state = match self {
                        RepairOperator::GreedyInsertion => {
                            greedy_variant(vehicle, t, pos, customer, solution, instance)
                        }
                        RepairOperator::SimpleInsertion => {
                            simple_variant(vehicle, t, pos, customer, solution, instance)
                        }
                    };
                    if let Some(state) = state {
                        let delta = state.costs.total() - vehicle.costs.total();
                        if best.as_ref().map_or(true, |b| delta < b.delta) {
                            best = Some(Candidate {
                                vehicle: v,
                                state,
                                delta,
                            });
                        }
                    }
                }
            }
        }

        best
    }
}

fn trip_demand(stops: &[usize], instance: &Instance, designations: &[Option<usize>]) -> f64 {
    stops
        .iter()
        .map(|&s| stop_demand(s, instance, designations))
        .sum()
}

/// Re-plan charging and, if the battery holds, refresh schedule and costs.
fn finish(mut state: VehicleState, instance: &Instance, designations: &[Option<usize>]) -> Option<VehicleState> {
    state.prune_empty_trips(instance);
    if !state.replan_charging(instance) {
        return None;
    }
    state.refresh(instance, designations);
    Some(state)
}

fn simple_variant(
    vehicle: &VehicleState,
    t: usize,
    pos: usize,
    customer: usize,
    solution: &Solution,
    instance: &Instance,
) -> Option<VehicleState> {
    let params = &instance.parameters;
    let designations = &solution.locker_delivery;
    let trip = &vehicle.trips[t];

    let demand = stop_demand(customer, instance, designations);
    if trip_demand(&trip.stops, instance, designations) + demand > params.max_vehicle_volume + EPSILON {
        return None;
    }

    let (prev, next) = (trip.stops[pos - 1], trip.stops[pos]);
    if instance.energy(prev, customer) + instance.energy(customer, next)
        > params.max_battery_capacity + EPSILON
    {
        return None;
    }

    let mut state = vehicle.clone();
    state.trips[t].insert(pos, customer);
    finish(state, instance, designations)
}

fn greedy_variant(
    vehicle: &VehicleState,
    t: usize,
    pos: usize,
    customer: usize,
    solution: &Solution,
    instance: &Instance,
) -> Option<VehicleState> {
    let volume = instance.parameters.max_vehicle_volume;
    let designations = &solution.locker_delivery;
    let stops = &vehicle.trips[t].stops;
    let demand = stop_demand(customer, instance, designations);

    let mut base = vehicle.clone();
    // position of the customer inside `base.trips[at]`
    let at;
    let customer_pos;

    if trip_demand(stops, instance, designations) + demand <= volume + EPSILON {
        base.trips[t].insert(pos, customer);
        at = t;
        customer_pos = pos;
    } else {
        // split: prefix + [0] | [0, customer] + suffix
        let mut prefix = stops[..pos].to_vec();
        prefix.push(DEPOT);
        let mut suffix = vec![DEPOT, customer];
        suffix.extend_from_slice(&stops[pos..]);

        if trip_demand(&prefix, instance, designations) > volume + EPSILON
            || trip_demand(&suffix, instance, designations) > volume + EPSILON
        {
            return None;
        }
        base.trips[t] = Trip::from_stops(prefix);
        base.trips.insert(t + 1, Trip::from_stops(suffix));
        at = t + 1;
        customer_pos = 1;
    }

    if let Some(state) = finish(base.clone(), instance, designations) {
        return Some(state);
    }

    // charger before the customer, after it, or both
    let before = with_charger(&base, at, customer_pos, true, instance);
    if let Some(state) = before.clone().and_then(|s| finish(s, instance, designations)) {
        return Some(state);
    }
    let after = with_charger(&base, at, customer_pos, false, instance);
    if let Some(state) = after.and_then(|s| finish(s, instance, designations)) {
        return Some(state);
    }
    before
        .and_then(|s| with_charger(&s, at, customer_pos + 1, false, instance))
        .and_then(|s| finish(s, instance, designations))
}

/// Insert the charger nearest to the customer at `customer_pos` directly before or after it,
/// skipping chargers that already neighbour that slot.
fn with_charger(
    state: &VehicleState,
    at: usize,
    customer_pos: usize,
    before: bool,
    instance: &Instance,
) -> Option<VehicleState> {
    let stops = &state.trips[at].stops;
    let customer = stops[customer_pos];
    let slot = if before { customer_pos } else { customer_pos + 1 };
    let neighbours = [stops[slot - 1], stops[slot]];

    let charger = instance.nearest_charger(customer, &neighbours)?;
    let mut state = state.clone();
    state.trips[at].insert(slot, charger);
    Some(state)
}

/// Open a `[0, customer, 0]` trip on the vehicle where it is cheapest, replacing an idle
/// vehicle's empty trip.
fn new_trip_insertion(solution: &Solution, customer: usize, instance: &Instance) -> Option<Candidate> {
    let designations = &solution.locker_delivery;
    if stop_demand(customer, instance, designations) > instance.parameters.max_vehicle_volume + EPSILON {
        return None;
    }

    let mut best: Option<Candidate> = None;
    for (v, vehicle) in solution.vehicles.iter().enumerate() {
        let mut state = vehicle.clone();
        if state.is_idle(instance) {
            state.trips.clear();
        }
        state.trips.push(Trip::from_stops(vec![DEPOT, customer, DEPOT]));

        if let Some(state) = finish(state, instance, designations) {
            let delta = state.costs.total() - vehicle.costs.total();
            if best.as_ref().map_or(true, |b| delta < b.delta) {
                best = Some(Candidate {
                    vehicle: v,
                    state,
                    delta,
                });
            }
        }
    }

    best
}
