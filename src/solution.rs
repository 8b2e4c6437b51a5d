//! Solution representation for the EVRP-LD.

use crate::evaluation::{self, CostBreakdown};
use crate::lockers::locker_load;
use crate::problem::{Instance, NodeKind, Vehicle, DEPOT};
use crate::simulation::{plan_charging, simulate_vehicle};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One depot-to-depot trip of a vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    /// Stop ids, starting and ending at the depot
    pub stops: Vec<usize>,
    /// Charging quantity at every stop (aligned with `stops`)
    pub charging: Vec<f64>,
    /// Demand delivered on this trip
    pub load: f64,
    /// Travelled distance of this trip
    pub length: f64,
    /// Unloading completion time at every stop, filled by the route simulator
    pub schedule: Vec<f64>,
}

impl Trip {
    /// The empty trip `[0, 0]`.
    pub fn empty() -> Self {
        Trip::from_stops(vec![DEPOT, DEPOT])
    }

    /// Create a trip from its stops with no charging planned.
    pub fn from_stops(stops: Vec<usize>) -> Self {
        let n = stops.len();
        Trip {
            stops,
            charging: vec![0.0; n],
            load: 0.0,
            length: 0.0,
            schedule: Vec::new(),
        }
    }

    /// Whether the trip delivers nothing (only depot and charger stops).
    pub fn is_empty(&self, instance: &Instance) -> bool {
        !self.stops.iter().any(|&s| is_service_stop(s, instance))
    }

    /// Customer stops of this trip in visiting order.
    pub fn customers<'a>(&'a self, instance: &'a Instance) -> impl Iterator<Item = usize> + 'a {
        self.stops
            .iter()
            .copied()
            .filter(move |&s| instance.is_customer(s))
    }

    /// Insert a stop before position `pos` with no charging.
    pub fn insert(&mut self, pos: usize, stop: usize) {
        self.stops.insert(pos, stop);
        self.charging.insert(pos, 0.0);
    }

    /// Remove the stop at position `pos` together with its charging entry.
    pub fn remove(&mut self, pos: usize) -> usize {
        self.charging.remove(pos);
        self.stops.remove(pos)
    }

    pub fn calculate_length(&mut self, instance: &Instance) {
        self.length = self
            .stops
            .iter()
            .tuple_windows()
            .map(|(a, b)| instance.distance(*a, *b))
            .sum();
    }

    pub fn calculate_load(&mut self, instance: &Instance, designations: &[Option<usize>]) {
        self.load = self
            .stops
            .iter()
            .map(|&s| stop_demand(s, instance, designations))
            .sum();
    }
}

/// Volume a stop takes out of the vehicle: a customer's demand, or the summed demand of the
/// customers designated to a locker.
pub fn stop_demand(stop: usize, instance: &Instance, designations: &[Option<usize>]) -> f64 {
    match instance.kind(stop) {
        Some(NodeKind::Customer) => instance.customer(stop).demand,
        Some(NodeKind::Locker) => locker_load(stop, designations, instance),
        _ => 0.0,
    }
}

/// Whether a stop delivers something (customer or locker) rather than being routing infrastructure.
pub fn is_service_stop(stop: usize, instance: &Instance) -> bool {
    matches!(
        instance.kind(stop),
        Some(NodeKind::Customer) | Some(NodeKind::Locker)
    )
}

/// Routes, charging plan, schedule and costs of one vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    pub vehicle_id: usize,
    pub initial_battery: f64,
    pub trips: Vec<Trip>,
    pub costs: CostBreakdown,
    pub lockers_visited: usize,
}

impl VehicleState {
    /// An idle vehicle with the single trip `[0, 0]`.
    pub fn new(vehicle: &Vehicle) -> Self {
        VehicleState {
            vehicle_id: vehicle.id,
            initial_battery: vehicle.initial_battery,
            trips: vec![Trip::empty()],
            costs: CostBreakdown::default(),
            lockers_visited: 0,
        }
    }

    /// Whether no trip of this vehicle delivers anything.
    pub fn is_idle(&self, instance: &Instance) -> bool {
        self.trips.iter().all(|trip| trip.is_empty(instance))
    }

    /// Re-plan minimal charging for all trips. Returns `false` if the battery cannot be kept
    /// non-negative with the current stops.
    pub fn replan_charging(&mut self, instance: &Instance) -> bool {
        plan_charging(&mut self.trips, self.initial_battery, instance)
    }

    /// Recompute lengths, loads, schedules and cost components from the current stops and
    /// charging plan.
    pub fn refresh(&mut self, instance: &Instance, designations: &[Option<usize>]) {
        for trip in self.trips.iter_mut() {
            trip.calculate_length(instance);
            trip.calculate_load(instance, designations);
        }

        let traces = simulate_vehicle(&self.trips, self.initial_battery, instance);
        for (trip, trace) in self.trips.iter_mut().zip(traces) {
            trip.schedule = trace.times;
        }

        self.lockers_visited = evaluation::distinct_lockers(self, instance);
        self.costs = evaluation::evaluate_vehicle(self, instance);
    }

    /// Drop trips that deliver nothing, keeping a single `[0, 0]` trip if none remain.
    pub fn prune_empty_trips(&mut self, instance: &Instance) {
        self.trips.retain(|trip| !trip.is_empty(instance));
        if self.trips.is_empty() {
            self.trips.push(Trip::empty());
        }
    }

    /// All stops of all trips concatenated in order.
    pub fn flattened_stops(&self) -> Vec<usize> {
        self.trips.iter().flat_map(|t| t.stops.iter().copied()).collect()
    }

    pub fn flattened_charging(&self) -> Vec<f64> {
        self.trips
            .iter()
            .flat_map(|t| t.charging.iter().copied())
            .collect()
    }

    pub fn flattened_schedule(&self) -> Vec<f64> {
        self.trips
            .iter()
            .flat_map(|t| t.schedule.iter().copied())
            .collect()
    }

    pub fn customer_count(&self, instance: &Instance) -> usize {
        self.trips.iter().map(|t| t.customers(instance).count()).sum()
    }
}

/// A complete solution: one state per vehicle plus the locker designation of every customer.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub vehicles: Vec<VehicleState>,
    /// Locker id per customer ordinal, `None` for home delivery
    pub locker_delivery: Vec<Option<usize>>,
    /// Sum of all vehicle cost components
    pub objective: f64,
}

impl Solution {
    /// A solution in which every vehicle is idle and every customer is a home delivery.
    pub fn new(instance: &Instance) -> Self {
        Solution::with_locker_delivery(instance, vec![None; instance.customer_count()])
    }

    pub fn with_locker_delivery(instance: &Instance, locker_delivery: Vec<Option<usize>>) -> Self {
        Solution {
            vehicles: instance.vehicles.iter().map(VehicleState::new).collect(),
            locker_delivery,
            objective: 0.0,
        }
    }

    /// Refresh the derived data of one vehicle and the solution objective.
    pub fn refresh_vehicle(&mut self, index: usize, instance: &Instance) {
        self.vehicles[index].refresh(instance, &self.locker_delivery);
        self.update_objective();
    }

    /// Refresh every vehicle and the objective.
    pub fn refresh_all(&mut self, instance: &Instance) {
        for vehicle in self.vehicles.iter_mut() {
            vehicle.refresh(instance, &self.locker_delivery);
        }
        self.update_objective();
    }

    pub fn update_objective(&mut self) {
        self.objective = evaluation::objective(self);
    }

    /// Cost components summed over all vehicles.
    pub fn cost_totals(&self) -> CostBreakdown {
        let mut totals = CostBreakdown::default();
        for vehicle in &self.vehicles {
            totals += vehicle.costs;
        }
        totals
    }

    pub fn vehicle_index(&self, vehicle_id: usize) -> Option<usize> {
        self.vehicles.iter().position(|v| v.vehicle_id == vehicle_id)
    }

    /// Customers directly visited anywhere in the solution (with repetitions).
    pub fn visited_customers(&self, instance: &Instance) -> Vec<usize> {
        self.vehicles
            .iter()
            .flat_map(|v| v.trips.iter())
            .flat_map(|t| t.customers(instance))
            .collect()
    }

    /// Home-delivery customers that no trip visits.
    pub fn unvisited_customers(&self, instance: &Instance) -> Vec<usize> {
        let mut visited = vec![false; instance.customer_count()];
        for customer in self.visited_customers(instance) {
            if let Some(ordinal) = instance.customer_ordinal(customer) {
                visited[ordinal] = true;
            }
        }

        instance
            .customers
            .iter()
            .enumerate()
            .filter(|(i, _)| !visited[*i] && self.locker_delivery[*i].is_none())
            .map(|(_, c)| c.id)
            .collect()
    }

    /// Locker indicator per customer as written to solution files: `0` for home delivery,
    /// otherwise the locker id.
    pub fn locker_indicators(&self) -> Vec<usize> {
        self.locker_delivery
            .iter()
            .map(|designation| designation.unwrap_or(0))
            .collect()
    }

    /// Get the number of vehicles that deliver something.
    pub fn get_used_vehicle_count(&self, instance: &Instance) -> usize {
        self.vehicles.iter().filter(|v| !v.is_idle(instance)).count()
    }
}

impl fmt::Debug for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Solution:")?;
        writeln!(f, "  Objective: {:.2}", self.objective)?;

        for vehicle in &self.vehicles {
            writeln!(
                f,
                "  Vehicle {}: {} trip(s), cost {:.2}",
                vehicle.vehicle_id,
                vehicle.trips.len(),
                vehicle.costs.total()
            )?;

            for (i, trip) in vehicle.trips.iter().enumerate() {
                writeln!(
                    f,
                    "    Trip {}: {:?} (Load: {:.2}, Length: {:.2})",
                    i, trip.stops, trip.load, trip.length
                )?;
            }
        }

        Ok(())
    }
}
