//! Construction heuristic: nearest-feasible insertion with reactive charging and
//! capacity-driven trip splitting.

use crate::lockers::{locker_load, used_lockers};
use crate::problem::{Instance, Vehicle, DEPOT};
use crate::simulation::EPSILON;
use crate::solution::{is_service_stop, Solution, Trip, VehicleState};
use log::{debug, warn};

/// A unit of work for construction: a home-delivery customer or a locker with its designated parcels.
#[derive(Debug, Clone, Copy)]
struct Job {
    stop: usize,
    demand: f64,
}

/// Builds an initial solution vehicle by vehicle.
pub struct Construction {
    /// Share of the depot deadline after which no new trip is opened
    pub time_budget_fraction: f64,
}

impl Construction {
    pub fn new(time_budget_fraction: f64) -> Self {
        Construction {
            time_budget_fraction,
        }
    }

    /// Construct a solution for the given locker designations (one entry per customer ordinal).
    ///
    /// Customers no vehicle can reach stay unvisited; the feasibility checker reports them.
    pub fn construct(&self, instance: &Instance, designations: Vec<Option<usize>>) -> Solution {
        let jobs = Self::collect_jobs(instance, &designations);
        let mut pending = vec![true; jobs.len()];
        let mut solution = Solution::with_locker_delivery(instance, designations);

        for (index, vehicle) in instance.vehicles.iter().enumerate() {
            if !pending.iter().any(|p| *p) {
                break;
            }

            let trips = self.build_vehicle(instance, vehicle, &jobs, &mut pending);
            let state = &mut solution.vehicles[index];
            state.trips = trips;
            state.prune_empty_trips(instance);

            debug!(
                "vehicle {}: {} trip(s), {} stop(s) served",
                vehicle.id,
                state.trips.len(),
                state.customer_count(instance)
            );
        }

        let unserved: Vec<usize> = jobs
            .iter()
            .zip(pending.iter())
            .filter(|(_, p)| **p)
            .map(|(job, _)| job.stop)
            .collect();
        if !unserved.is_empty() {
            warn!("construction left {} stop(s) unserved: {:?}", unserved.len(), unserved);
        }

        solution.refresh_all(instance);
        solution
    }

    /// Home-delivery customers and used lockers that fit into an empty vehicle.
    fn collect_jobs(instance: &Instance, designations: &[Option<usize>]) -> Vec<Job> {
        let volume = instance.parameters.max_vehicle_volume;

        let home = instance
            .customers
            .iter()
            .zip(designations.iter())
            .filter(|(_, designation)| designation.is_none())
            .map(|(c, _)| Job {
                stop: c.id,
                demand: c.demand,
            });
        let lockers = used_lockers(designations).into_iter().map(|l| Job {
            stop: l,
            demand: locker_load(l, designations, instance),
        });

        home.chain(lockers)
            .filter(|job| {
                let fits = job.demand <= volume + EPSILON;
                if !fits {
                    warn!(
                        "stop {} needs {:.2} but vehicles hold {:.2}",
                        job.stop, job.demand, volume
                    );
                }
                fits
            })
            .collect()
    }

    fn build_vehicle(
        &self,
        instance: &Instance,
        vehicle: &Vehicle,
        jobs: &[Job],
        pending: &mut [bool],
    ) -> Vec<Trip> {
        let volume = instance.parameters.max_vehicle_volume;
        let budget = self.time_budget_fraction * instance.depot.deadline;
        let mut builder = TripBuilder::new(instance, vehicle);

        loop {
            let here = builder.current();
            let candidate = jobs
                .iter()
                .enumerate()
                .filter(|(j, job)| pending[*j] && builder.load + job.demand <= volume + EPSILON)
                .min_by(|(_, a), (_, b)| {
                    instance
                        .distance(here, a.stop)
                        .total_cmp(&instance.distance(here, b.stop))
                });

            match candidate {
                Some((j, job)) => {
                    if !builder.secure_reach(job.stop, true) {
                        debug!(
                            "vehicle {} cannot reach stop {} safely, stopping",
                            vehicle.id, job.stop
                        );
                        break;
                    }
                    builder.serve(job);
                    pending[j] = false;
                }
                None => {
                    if !pending.iter().any(|p| *p) || !builder.has_deliveries() {
                        break;
                    }
                    if builder.time + instance.travel_time(here, DEPOT) > budget {
                        debug!("vehicle {} exhausted its time budget", vehicle.id);
                        break;
                    }
                    if !builder.close_trip() {
                        break;
                    }
                }
            }
        }

        builder.close_trip();
        builder.trips
    }
}

/// Incremental state of one vehicle during construction.
struct TripBuilder<'a> {
    instance: &'a Instance,
    trips: Vec<Trip>,
    stops: Vec<usize>,
    charging: Vec<f64>,
    load: f64,
    soc: f64,
    time: f64,
    /// Chargers visited since the last served stop, never revisited before serving again
    recent_chargers: Vec<usize>,
}

impl<'a> TripBuilder<'a> {
    fn new(instance: &'a Instance, vehicle: &Vehicle) -> Self {
        TripBuilder {
            instance,
            trips: Vec::new(),
            stops: vec![DEPOT],
            charging: vec![0.0],
            load: 0.0,
            soc: vehicle.initial_battery,
            time: 0.0,
            recent_chargers: Vec::new(),
        }
    }

    fn current(&self) -> usize {
        *self.stops.last().unwrap_or(&DEPOT)
    }

    fn has_deliveries(&self) -> bool {
        self.stops.iter().any(|&s| is_service_stop(s, self.instance))
    }

    fn travel(&mut self, to: usize) {
        let from = self.current();
        self.soc -= self.instance.energy(from, to);
        self.time += self.instance.travel_time(from, to);
        self.stops.push(to);
        self.charging.push(0.0);
    }

    fn serve(&mut self, job: &Job) {
        self.travel(job.stop);
        self.time += if self.instance.is_customer(job.stop) {
            self.instance.customer(job.stop).service_time
        } else {
            self.instance.locker(job.stop).service_time
        };
        self.load += job.demand;
        self.recent_chargers.clear();
    }

    /// Charge at the current stop, clamped to the battery capacity.
    fn charge(&mut self, amount: f64) {
        let room = self.instance.parameters.max_battery_capacity - self.soc;
        let amount = amount.min(room).max(0.0);
        if let Some(last) = self.charging.last_mut() {
            *last += amount;
        }
        self.soc += amount;
        self.time += amount / self.instance.parameters.recharge_rate;
    }

    /// Make sure the vehicle can drive to `target` (and on to the nearest charging point after
    /// it when `then_charge_point` is set), charging here or detouring over chargers as needed.
    fn secure_reach(&mut self, target: usize, then_charge_point: bool) -> bool {
        let instance = self.instance;

        loop {
            let here = self.current();
            let mut need = instance.energy(here, target);
            if then_charge_point {
                need += instance.energy(target, instance.nearest_charging_point(target));
            }
            if self.soc + EPSILON >= need {
                return true;
            }

            if instance.can_charge_at(here) {
                self.charge(need - self.soc);
                if self.soc + EPSILON >= need {
                    return true;
                }
            }

            let soc = self.soc;
            let detour = instance
                .chargers
                .iter()
                .map(|c| c.id)
                .filter(|&c| c != here && !self.recent_chargers.contains(&c))
                .filter(|&c| instance.energy(here, c) <= soc + EPSILON)
                .min_by(|a, b| {
                    instance
                        .distance(here, *a)
                        .total_cmp(&instance.distance(here, *b))
                });

            match detour {
                Some(charger) => {
                    self.travel(charger);
                    self.recent_chargers.push(charger);
                }
                None => return false,
            }
        }
    }

    /// Drive back to the depot (with charger detours if needed) and open a fresh trip.
    /// Returns whether the depot was reached without running the battery flat.
    fn close_trip(&mut self) -> bool {
        let reached = self.secure_reach(DEPOT, false);
        self.travel(DEPOT);

        let mut trip = Trip::from_stops(std::mem::replace(&mut self.stops, vec![DEPOT]));
        trip.charging = std::mem::replace(&mut self.charging, vec![0.0]);
        self.trips.push(trip);

        self.load = 0.0;
        self.recent_chargers.clear();
        reached
    }
}

/// Build a vehicle state from explicit stop lists, planning minimal charging.
///
/// Convenience for callers that already know the routes (tests, warm starts).
pub fn vehicle_from_routes(
    instance: &Instance,
    vehicle: &Vehicle,
    routes: Vec<Vec<usize>>,
    designations: &[Option<usize>],
) -> VehicleState {
    let mut state = VehicleState::new(vehicle);
    state.trips = routes.into_iter().map(Trip::from_stops).collect();
    state.replan_charging(instance);
    state.refresh(instance, designations);
    state
}
