//! Cost evaluation: the five objective terms of a vehicle and the solution objective.
//!
//! Every function here is a pure read of an already simulated [`VehicleState`]; callers must
//! refresh the vehicle's schedule after changing its routes.

use crate::problem::Instance;
use crate::solution::{Solution, VehicleState};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

/// Cost components of a vehicle or of a whole solution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub customer_penalty: f64,
    pub depot_penalty: f64,
    pub locker: f64,
    pub deployment: f64,
    pub travel: f64,
}

impl CostBreakdown {
    pub fn total(&self) -> f64 {
        self.customer_penalty + self.depot_penalty + self.locker + self.deployment + self.travel
    }
}

impl AddAssign for CostBreakdown {
    fn add_assign(&mut self, other: Self) {
        self.customer_penalty += other.customer_penalty;
        self.depot_penalty += other.depot_penalty;
        self.locker += other.locker;
        self.deployment += other.deployment;
        self.travel += other.travel;
    }
}

/// Lateness penalty summed over every customer stop.
pub fn customer_penalty(vehicle: &VehicleState, instance: &Instance) -> f64 {
    let lateness: f64 = vehicle
        .trips
        .iter()
        .flat_map(|trip| trip.stops.iter().zip(trip.schedule.iter()))
        .filter(|(stop, _)| instance.is_customer(**stop))
        .map(|(stop, time)| (time - instance.customer(*stop).deadline).max(0.0))
        .sum();

    instance.parameters.cost_per_time_late_customer * lateness
}

/// Penalty for returning to the depot after its deadline at the end of the last trip.
pub fn depot_penalty(vehicle: &VehicleState, instance: &Instance) -> f64 {
    let return_time = vehicle
        .trips
        .last()
        .and_then(|trip| trip.schedule.last())
        .copied()
        .unwrap_or(0.0);

    instance.parameters.cost_per_time_late_depot * (return_time - instance.depot.deadline).max(0.0)
}

/// Number of distinct lockers visited by the vehicle.
pub fn distinct_lockers(vehicle: &VehicleState, instance: &Instance) -> usize {
    vehicle
        .trips
        .iter()
        .flat_map(|trip| trip.stops.iter())
        .filter(|stop| instance.is_locker(**stop))
        .unique()
        .count()
}

pub fn locker_cost(vehicle: &VehicleState, instance: &Instance) -> f64 {
    distinct_lockers(vehicle, instance) as f64 * instance.parameters.locker_opening_cost
}

/// Deployment cost: the longest trip (in stops) times the deployment cost; idle vehicles are free.
pub fn deployment_cost(vehicle: &VehicleState, instance: &Instance) -> f64 {
    if vehicle.is_idle(instance) {
        return 0.0;
    }

    let longest = vehicle
        .trips
        .iter()
        .map(|trip| trip.stops.len())
        .max()
        .unwrap_or(0);

    longest as f64 * instance.parameters.vehicle_deployment_cost
}

pub fn travel_cost(vehicle: &VehicleState, instance: &Instance) -> f64 {
    let length: f64 = vehicle.trips.iter().map(|trip| trip.length).sum();
    instance.parameters.cost_per_distance * length
}

/// All five cost terms of a vehicle.
pub fn evaluate_vehicle(vehicle: &VehicleState, instance: &Instance) -> CostBreakdown {
    CostBreakdown {
        customer_penalty: customer_penalty(vehicle, instance),
        depot_penalty: depot_penalty(vehicle, instance),
        locker: locker_cost(vehicle, instance),
        deployment: deployment_cost(vehicle, instance),
        travel: travel_cost(vehicle, instance),
    }
}

/// Objective of a solution from the cost components stored on its vehicles.
pub fn objective(solution: &Solution) -> f64 {
    solution.vehicles.iter().map(|v| v.costs.total()).sum()
}

