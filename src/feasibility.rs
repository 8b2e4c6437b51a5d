//! Feasibility checking of in-memory solutions and solution files.
//!
//! Every violation is collected as a [`Diagnostic`] instead of failing fast, so one call lists
//! all defects of a candidate.

use crate::io::solution_file::SolutionRecord;
use crate::problem::{euclidean, Instance, DEPOT};
use crate::simulation::EPSILON;
use crate::solution::{stop_demand, Solution};
use std::fmt;
use std::path::Path;

/// A single violated rule.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    EmptyRoute {
        vehicle: usize,
        trip: Option<usize>,
    },
    StartsAwayFromDepot {
        vehicle: usize,
        trip: Option<usize>,
        found: usize,
    },
    EndsAwayFromDepot {
        vehicle: usize,
        trip: Option<usize>,
        found: usize,
    },
    UnknownNode {
        vehicle: usize,
        trip: Option<usize>,
        position: usize,
        node: usize,
    },
    ChargingLengthMismatch {
        vehicle: usize,
        trip: Option<usize>,
        stops: usize,
        charging: usize,
    },
    NegativeCharge {
        vehicle: usize,
        node: usize,
        amount: f64,
    },
    ChargeOutsideCharger {
        vehicle: usize,
        node: usize,
        amount: f64,
    },
    BatteryDepleted {
        vehicle: usize,
        from: usize,
        to: usize,
        battery: f64,
        consumption: f64,
    },
    BatteryOverCapacity {
        vehicle: usize,
        node: usize,
        battery: f64,
        capacity: f64,
    },
    CapacityExceeded {
        vehicle: usize,
        position: usize,
        demand: f64,
        capacity: f64,
    },
    UnknownVehicle {
        vehicle: usize,
    },
    MissingLockerIndicator {
        customer: usize,
    },
    HomeDeliveryVisits {
        customer: usize,
        count: usize,
    },
    LockerCustomerVisited {
        customer: usize,
        locker: usize,
        count: usize,
    },
    InvalidLocker {
        customer: usize,
        locker: usize,
    },
    LockerNotVisited {
        customer: usize,
        locker: usize,
    },
    OutsideLockerRadius {
        customer: usize,
        locker: usize,
        distance: f64,
        radius: f64,
    },
}

struct RouteLabel(usize, Option<usize>);

impl fmt::Display for RouteLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.1 {
            Some(trip) => write!(f, "vehicle {} trip {}", self.0, trip),
            None => write!(f, "vehicle {}", self.0),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Diagnostic::*;
        match *self {
            EmptyRoute { vehicle, trip } => write!(f, "{}: route is empty", RouteLabel(vehicle, trip)),
            StartsAwayFromDepot { vehicle, trip, found } => write!(
                f,
                "{}: route does not start at depot (found {})",
                RouteLabel(vehicle, trip),
                found
            ),
            EndsAwayFromDepot { vehicle, trip, found } => write!(
                f,
                "{}: route does not end at depot (found {})",
                RouteLabel(vehicle, trip),
                found
            ),
            UnknownNode {
                vehicle,
                trip,
                position,
                node,
            } => write!(
                f,
                "{}: node {} at position {} is invalid",
                RouteLabel(vehicle, trip),
                node,
                position
            ),
            ChargingLengthMismatch {
                vehicle,
                trip,
                stops,
                charging,
            } => write!(
                f,
                "{}: {} route nodes but {} charging entries",
                RouteLabel(vehicle, trip),
                stops,
                charging
            ),
            NegativeCharge {
                vehicle,
                node,
                amount,
            } => write!(
                f,
                "vehicle {}: negative charging amount {} at {}",
                vehicle, amount, node
            ),
            ChargeOutsideCharger {
                vehicle,
                node,
                amount,
            } => write!(
                f,
                "vehicle {}: charging {:.2} at {} which is neither depot nor charger",
                vehicle, amount, node
            ),
            BatteryDepleted {
                vehicle,
                from,
                to,
                battery,
                consumption,
            } => write!(
                f,
                "vehicle {} ({}->{}): battery {:.2} insufficient for consumption {:.2}",
                vehicle, from, to, battery, consumption
            ),
            BatteryOverCapacity {
                vehicle,
                node,
                battery,
                capacity,
            } => write!(
                f,
                "vehicle {} (charging at {}): battery {:.2} exceeds max capacity {:.2}",
                vehicle, node, battery, capacity
            ),
            CapacityExceeded {
                vehicle,
                position,
                demand,
                capacity,
            } => write!(
                f,
                "vehicle {} (segment ending at position {}): demand {:.2} exceeds max volume {:.2}",
                vehicle, position, demand, capacity
            ),
            UnknownVehicle { vehicle } => write!(f, "vehicle {} is not part of the instance", vehicle),
            MissingLockerIndicator { customer } => {
                write!(f, "customer {}: no locker indicator", customer)
            }
            HomeDeliveryVisits { customer, count } => write!(
                f,
                "customer {} (home delivery) is visited {} times (expected 1)",
                customer, count
            ),
            LockerCustomerVisited {
                customer,
                locker,
                count,
            } => write!(
                f,
                "customer {} is assigned to locker {} but appears {} times in routes",
                customer, locker, count
            ),
            InvalidLocker { customer, locker } => write!(
                f,
                "customer {}: indicated locker {} is invalid",
                customer, locker
            ),
            LockerNotVisited { customer, locker } => write!(
                f,
                "customer {}: indicated locker {} is not visited in any route",
                customer, locker
            ),
            OutsideLockerRadius {
                customer,
                locker,
                distance,
                radius,
            } => write!(
                f,
                "customer {} is {:.2} away from locker {} (radius {:.2})",
                customer, distance, locker, radius
            ),
        }
    }
}

/// Outcome of a feasibility check.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeasibilityReport {
    pub diagnostics: Vec<Diagnostic>,
}

impl FeasibilityReport {
    pub fn is_feasible(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn messages(&self) -> Vec<String> {
        self.diagnostics.iter().map(|d| d.to_string()).collect()
    }
}

/// Routes of one vehicle as seen by the checker.
struct RouteView<'a> {
    vehicle: usize,
    initial_battery: f64,
    /// Trip index (None for a flattened route) with stops and charging
    parts: Vec<(Option<usize>, &'a [usize], &'a [f64])>,
}

/// Check an in-memory solution.
pub fn check_solution(solution: &Solution, instance: &Instance) -> FeasibilityReport {
    let routes: Vec<RouteView> = solution
        .vehicles
        .iter()
        .map(|v| RouteView {
            vehicle: v.vehicle_id,
            initial_battery: v.initial_battery,
            parts: v
                .trips
                .iter()
                .enumerate()
                .map(|(t, trip)| (Some(t), trip.stops.as_slice(), trip.charging.as_slice()))
                .collect(),
        })
        .collect();

    let mut checker = Checker::new(instance);
    checker.check_routes(&routes, &solution.locker_delivery);
    checker.check_designations(&routes, &solution.locker_delivery);
    checker.report()
}

/// Check a parsed solution file. Routes are the flattened per-vehicle sequences of the file.
pub fn check_solution_record(record: &SolutionRecord, instance: &Instance) -> FeasibilityReport {
    let mut checker = Checker::new(instance);

    let routes: Vec<RouteView> = record
        .vehicles
        .iter()
        .map(|v| {
            let initial_battery = match instance.vehicle(v.vehicle_id) {
                Some(vehicle) => vehicle.initial_battery,
                None => {
                    checker.push(Diagnostic::UnknownVehicle {
                        vehicle: v.vehicle_id,
                    });
                    instance.parameters.max_battery_capacity
                }
            };
            RouteView {
                vehicle: v.vehicle_id,
                initial_battery,
                parts: vec![(None, v.route.as_slice(), v.charging.as_slice())],
            }
        })
        .collect();

    let designations: Vec<Option<usize>> = instance
        .customers
        .iter()
        .enumerate()
        .map(|(i, customer)| match record.locker_indicators.get(i) {
            Some(0) => None,
            Some(&locker) => Some(locker),
            None => {
                checker.push(Diagnostic::MissingLockerIndicator {
                    customer: customer.id,
                });
                None
            }
        })
        .collect();

    checker.check_routes(&routes, &designations);
    checker.check_designations(&routes, &designations);
    checker.report()
}

/// Read a solution file and check it.
pub fn check_solution_file<P: AsRef<Path>>(
    path: P,
    instance: &Instance,
) -> anyhow::Result<FeasibilityReport> {
    let record = SolutionRecord::from_file(path)?;
    Ok(check_solution_record(&record, instance))
}

struct Checker<'a> {
    instance: &'a Instance,
    diagnostics: Vec<Diagnostic>,
    /// Direct visits per customer ordinal, across all vehicles
    visits: Vec<usize>,
}

impl<'a> Checker<'a> {
    fn new(instance: &'a Instance) -> Self {
        Checker {
            instance,
            diagnostics: Vec::new(),
            visits: vec![0; instance.customer_count()],
        }
    }

    fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    fn report(self) -> FeasibilityReport {
        FeasibilityReport {
            diagnostics: self.diagnostics,
        }
    }

    fn check_routes(&mut self, routes: &[RouteView], designations: &[Option<usize>]) {
        for route in routes {
            for &(trip, stops, charging) in &route.parts {
                self.check_structure(route.vehicle, trip, stops, charging);
            }

            let stops: Vec<usize> = route.parts.iter().flat_map(|p| p.1.iter().copied()).collect();
            let charging: Vec<f64> = route
                .parts
                .iter()
                .flat_map(|p| {
                    // pad or cut so that a length mismatch does not shift later trips
                    (0..p.1.len()).map(move |i| p.2.get(i).copied().unwrap_or(0.0))
                })
                .collect();

            self.check_battery(route.vehicle, route.initial_battery, &stops, &charging);
            self.check_capacity(route.vehicle, &stops, designations);

            for &stop in &stops {
                if let Some(ordinal) = self.instance.customer_ordinal(stop) {
                    self.visits[ordinal] += 1;
                }
            }
        }
    }

    /// Depot anchoring, known node ids and charging alignment of one trip.
    fn check_structure(&mut self, vehicle: usize, trip: Option<usize>, stops: &[usize], charging: &[f64]) {
        let (first, last) = match (stops.first(), stops.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => {
                self.push(Diagnostic::EmptyRoute { vehicle, trip });
                return;
            }
        };

        if first != DEPOT {
            self.push(Diagnostic::StartsAwayFromDepot {
                vehicle,
                trip,
                found: first,
            });
        }
        if last != DEPOT || stops.len() < 2 {
            self.push(Diagnostic::EndsAwayFromDepot {
                vehicle,
                trip,
                found: last,
            });
        }

        for (position, &node) in stops.iter().enumerate() {
            if self.instance.kind(node).is_none() {
                self.push(Diagnostic::UnknownNode {
                    vehicle,
                    trip,
                    position,
                    node,
                });
            }
        }

        if stops.len() != charging.len() {
            self.push(Diagnostic::ChargingLengthMismatch {
                vehicle,
                trip,
                stops: stops.len(),
                charging: charging.len(),
            });
        }
    }

    /// Net discharge and supplied charge arc by arc; stops at the first depletion.
    fn check_battery(&mut self, vehicle: usize, initial_battery: f64, stops: &[usize], charging: &[f64]) {
        let instance = self.instance;
        let capacity = instance.parameters.max_battery_capacity;
        let known = |node: usize| node < instance.location_count();
        let mut battery = initial_battery;

        for (i, &node) in stops.iter().enumerate() {
            if i > 0 {
                let prev = stops[i - 1];
                let consumption = if known(prev) && known(node) {
                    instance.energy(prev, node)
                } else {
                    0.0
                };
                if battery + EPSILON < consumption {
                    self.push(Diagnostic::BatteryDepleted {
                        vehicle,
                        from: prev,
                        to: node,
                        battery,
                        consumption,
                    });
                    return;
                }
                battery -= consumption;
            }

            let charge = charging[i];
            if charge < 0.0 {
                self.push(Diagnostic::NegativeCharge {
                    vehicle,
                    node,
                    amount: charge,
                });
            } else if charge > EPSILON && known(node) && !instance.can_charge_at(node) {
                self.push(Diagnostic::ChargeOutsideCharger {
                    vehicle,
                    node,
                    amount: charge,
                });
            }

            battery += charge;
            if battery > capacity + EPSILON {
                self.push(Diagnostic::BatteryOverCapacity {
                    vehicle,
                    node,
                    battery,
                    capacity,
                });
                battery = capacity;
            }
        }
    }

    /// Demand delivered between two depot visits must fit into the vehicle.
    fn check_capacity(&mut self, vehicle: usize, stops: &[usize], designations: &[Option<usize>]) {
        let capacity = self.instance.parameters.max_vehicle_volume;
        let mut segment = 0.0;

        for (position, &node) in stops.iter().enumerate() {
            if node == DEPOT {
                if segment > capacity + EPSILON {
                    self.push(Diagnostic::CapacityExceeded {
                        vehicle,
                        position,
                        demand: segment,
                        capacity,
                    });
                }
                segment = 0.0;
            } else if self.instance.kind(node).is_some() {
                segment += stop_demand(node, self.instance, designations);
            }
        }

        if segment > capacity + EPSILON {
            self.push(Diagnostic::CapacityExceeded {
                vehicle,
                position: stops.len(),
                demand: segment,
                capacity,
            });
        }
    }

    /// Every customer is served exactly once, at home or through a visited locker within radius.
    fn check_designations(&mut self, routes: &[RouteView], designations: &[Option<usize>]) {
        let instance = self.instance;
        let radius = instance.parameters.locker_radius;

        for (ordinal, customer) in instance.customers.iter().enumerate() {
            let count = self.visits[ordinal];

            match designations.get(ordinal).copied().flatten() {
                None => {
                    if count != 1 {
                        self.push(Diagnostic::HomeDeliveryVisits {
                            customer: customer.id,
                            count,
                        });
                    }
                }
                Some(locker) => {
                    if count != 0 {
                        self.push(Diagnostic::LockerCustomerVisited {
                            customer: customer.id,
                            locker,
                            count,
                        });
                    }
                    if !instance.is_locker(locker) {
                        self.push(Diagnostic::InvalidLocker {
                            customer: customer.id,
                            locker,
                        });
                        continue;
                    }

                    let visited = routes
                        .iter()
                        .flat_map(|r| r.parts.iter())
                        .any(|p| p.1.contains(&locker));
                    if !visited {
                        self.push(Diagnostic::LockerNotVisited {
                            customer: customer.id,
                            locker,
                        });
                        continue;
                    }

                    let l = instance.locker(locker);
                    let distance = euclidean((customer.x, customer.y), (l.x, l.y));
                    if distance > radius + EPSILON {
                        self.push(Diagnostic::OutsideLockerRadius {
                            customer: customer.id,
                            locker,
                            distance,
                            radius,
                        });
                    }
                }
            }
        }
    }
}
