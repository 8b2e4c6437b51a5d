//! Route simulation: schedules, state of charge and minimal charging plans.

use crate::problem::{Instance, NodeKind};
use crate::solution::Trip;
use itertools::Itertools;

/// Numerical tolerance for battery and capacity comparisons.
pub const EPSILON: f64 = 1e-9;

/// Result of walking one trip from its first to its last stop.
#[derive(Debug, Clone, PartialEq)]
pub struct TripTrace {
    /// Unloading / charging completion time at every stop
    pub times: Vec<f64>,
    /// State of charge after arriving at (and charging at) every stop
    pub soc: Vec<f64>,
}

impl TripTrace {
    /// Completion time of the last stop, i.e. when the vehicle is free again.
    pub fn end_time(&self, start_time: f64) -> f64 {
        self.times.last().copied().unwrap_or(start_time)
    }

    pub fn end_soc(&self, initial_battery: f64) -> f64 {
        self.soc.last().copied().unwrap_or(initial_battery)
    }

    /// Lowest state of charge reached on arrival anywhere in the trip.
    pub fn min_soc(&self) -> f64 {
        self.soc.iter().copied().fold(f64::INFINITY, f64::min)
    }
}

/// Simulate one trip starting at `start_time` with `initial_battery` on board.
///
/// Depot and charger stops dwell for the supplied charging quantity converted to time at the
/// recharge rate, customer stops for their service time, and locker stops for the locker service
/// time unless the previous stop was the same locker.
pub fn simulate_trip(
    stops: &[usize],
    charging: &[f64],
    start_time: f64,
    initial_battery: f64,
    instance: &Instance,
) -> TripTrace {
    let params = &instance.parameters;
    let mut times = Vec::with_capacity(stops.len());
    let mut soc = Vec::with_capacity(stops.len());
    let mut time = start_time;
    let mut battery = initial_battery;

    for (i, &stop) in stops.iter().enumerate() {
        if i > 0 {
            let prev = stops[i - 1];
            time += instance.travel_time(prev, stop);
            battery -= instance.energy(prev, stop);
        }

        let charge = charging.get(i).copied().unwrap_or(0.0);
        match instance.kind(stop) {
            Some(NodeKind::Depot) | Some(NodeKind::Charger) => {
                time += charge / params.recharge_rate;
                battery += charge;
            }
            Some(NodeKind::Customer) => time += instance.customer(stop).service_time,
            Some(NodeKind::Locker) => {
                if i == 0 || stops[i - 1] != stop {
                    time += instance.locker(stop).service_time;
                }
            }
            None => {}
        }

        times.push(time);
        soc.push(battery);
    }

    TripTrace { times, soc }
}

/// Simulate all trips of a vehicle back to back; time and battery carry over between trips.
pub fn simulate_vehicle(trips: &[Trip], initial_battery: f64, instance: &Instance) -> Vec<TripTrace> {
    let mut time = 0.0;
    let mut battery = initial_battery;

    trips
        .iter()
        .map(|trip| {
            let trace = simulate_trip(&trip.stops, &trip.charging, time, battery, instance);
            time = trace.end_time(time);
            battery = trace.end_soc(battery);
            trace
        })
        .collect()
}

/// Recompute the charging quantities of every trip with minimal top-ups.
///
/// At each depot or charger stop the vehicle charges exactly the shortfall needed to reach the
/// next depot or charger stop, never above the battery capacity. Returns `false` when the battery
/// still drops below zero somewhere.
pub fn plan_charging(trips: &mut [Trip], initial_battery: f64, instance: &Instance) -> bool {
    let capacity = instance.parameters.max_battery_capacity;
    let flat: Vec<(usize, usize, usize)> = trips
        .iter()
        .enumerate()
        .flat_map(|(t, trip)| trip.stops.iter().enumerate().map(move |(i, &s)| (t, i, s)))
        .collect();

    // cumulative[k] = energy needed to travel from flat[0] to flat[k]
    let mut cumulative = Vec::with_capacity(flat.len());
    cumulative.push(0.0);
    for ((_, _, a), (_, _, b)) in flat.iter().tuple_windows() {
        let last = *cumulative.last().unwrap_or(&0.0);
        cumulative.push(last + instance.energy(*a, *b));
    }

    let charge_points: Vec<usize> = flat
        .iter()
        .enumerate()
        .filter(|(_, (_, _, s))| instance.can_charge_at(*s))
        .map(|(k, _)| k)
        .collect();

    for trip in trips.iter_mut() {
        trip.charging = vec![0.0; trip.stops.len()];
    }

    let mut feasible = true;
    let mut battery = initial_battery;
    let mut next_cp = 0;

    for (k, &(t, i, stop)) in flat.iter().enumerate() {
        if k > 0 {
            battery -= cumulative[k] - cumulative[k - 1];
            if battery < -EPSILON {
                feasible = false;
            }
        }

        if !instance.can_charge_at(stop) {
            continue;
        }

        while next_cp < charge_points.len() && charge_points[next_cp] <= k {
            next_cp += 1;
        }
        let horizon = charge_points
            .get(next_cp)
            .copied()
            .unwrap_or(flat.len() - 1);
        let need = cumulative[horizon] - cumulative[k];

        if battery < need {
            let charge = (need - battery).min(capacity - battery).max(0.0);
            trips[t].charging[i] = charge;
            battery += charge;
        }
    }

    feasible
}

/// Whether the battery stays non-negative along the trips with their current charging plan.
pub fn battery_feasible(trips: &[Trip], initial_battery: f64, instance: &Instance) -> bool {
    let capacity = instance.parameters.max_battery_capacity;
    simulate_vehicle(trips, initial_battery, instance)
        .iter()
        .all(|trace| {
            trace
                .soc
                .iter()
                .all(|&soc| soc >= -EPSILON && soc <= capacity + EPSILON)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{Charger, Customer, Depot, Parameters, Vehicle};

    fn line_instance() -> Instance {
        // depot at 0, customer at 10, charger at 20, customer at 30
        let params = Parameters {
            max_battery_capacity: 25.0,
            recharge_rate: 2.0,
            ..Parameters::default()
        };
        Instance::new(
            "line".to_string(),
            params,
            Depot {
                x: 0.0,
                y: 0.0,
                deadline: 1000.0,
            },
            vec![
                Customer::new(1, 10.0, 0.0, 1.0, 100.0, 1.0),
                Customer::new(2, 30.0, 0.0, 1.0, 100.0, 1.0),
            ],
            vec![Charger {
                id: 3,
                x: 20.0,
                y: 0.0,
            }],
            Vec::new(),
            vec![Vehicle {
                id: 1,
                initial_battery: 25.0,
            }],
        )
        .unwrap()
    }

    #[test]
    fn planner_tops_up_minimum_at_charger() {
        let instance = line_instance();
        let mut trips = vec![Trip::from_stops(vec![0, 1, 3, 2, 3, 0])];
        assert!(plan_charging(&mut trips, 25.0, &instance));

        // arrives at the charger with 5, needs 20 to come back to it via customer 2
        assert!((trips[0].charging[2] - 15.0).abs() < 1e-9);
        // arrives back with 0, needs 20 to reach the depot
        assert!((trips[0].charging[4] - 20.0).abs() < 1e-9);
        assert!(battery_feasible(&trips, 25.0, &instance));
    }

    #[test]
    fn planner_reports_unreachable_leg() {
        let instance = line_instance();
        let mut trips = vec![Trip::from_stops(vec![0, 2, 0])];
        assert!(!plan_charging(&mut trips, 25.0, &instance));
    }

    #[test]
    fn charging_dwell_uses_recharge_rate() {
        let instance = line_instance();
        let trace = simulate_trip(&[0, 3, 0], &[0.0, 4.0, 0.0], 0.0, 25.0, &instance);
        assert!((trace.times[1] - 22.0).abs() < 1e-9);
        assert!((trace.times[2] - 42.0).abs() < 1e-9);
        assert!((trace.soc[1] - 9.0).abs() < 1e-9);
    }
}
