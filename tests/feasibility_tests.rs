//! Tests for the feasibility checker on in-memory solutions and solution files.

use evrp_alns::construction::Construction;
use evrp_alns::feasibility::{check_solution, check_solution_record, Diagnostic};
use evrp_alns::io::SolutionRecord;
use evrp_alns::problem::{Charger, Customer, Depot, Instance, Locker, Parameters, Vehicle};
use evrp_alns::solution::{Solution, Trip};

/// Depot at the origin, customers 1 (10, 0) and 2 (30, 0), charger 3 (20, 0), locker 4 (10, 5).
fn create_test_instance() -> Instance {
    let parameters = Parameters {
        max_vehicle_volume: 15.0,
        max_battery_capacity: 25.0,
        locker_radius: 6.0,
        ..Parameters::default()
    };
    Instance::new(
        "check".to_string(),
        parameters,
        Depot {
            x: 0.0,
            y: 0.0,
            deadline: 1000.0,
        },
        vec![
            Customer::new(1, 10.0, 0.0, 0.0, 1000.0, 10.0),
            Customer::new(2, 30.0, 0.0, 0.0, 1000.0, 10.0),
        ],
        vec![Charger {
            id: 3,
            x: 20.0,
            y: 0.0,
        }],
        vec![Locker {
            id: 4,
            x: 10.0,
            y: 5.0,
            service_time: 1.0,
        }],
        vec![
            Vehicle {
                id: 1,
                initial_battery: 25.0,
            },
            Vehicle {
                id: 2,
                initial_battery: 25.0,
            },
        ],
    )
    .unwrap()
}

/// A solution with the given trips on the first vehicle and the given charging plans.
fn solution_with(instance: &Instance, trips: Vec<(Vec<usize>, Vec<f64>)>) -> Solution {
    let mut solution = Solution::new(instance);
    solution.vehicles[0].trips = trips
        .into_iter()
        .map(|(stops, charging)| {
            let mut trip = Trip::from_stops(stops);
            trip.charging = charging;
            trip
        })
        .collect();
    solution
}

/// Serves both customers in two feasible trips on vehicle 1.
fn feasible_solution(instance: &Instance) -> Solution {
    solution_with(
        instance,
        vec![
            (vec![0, 1, 0], vec![0.0, 0.0, 0.0]),
            (vec![0, 3, 2, 3, 0], vec![20.0, 20.0, 0.0, 20.0, 0.0]),
        ],
    )
}

#[test]
fn test_feasible_solution_passes() {
    let instance = create_test_instance();
    let report = check_solution(&feasible_solution(&instance), &instance);
    assert!(report.is_feasible(), "{:?}", report.messages());
}

#[test]
fn test_missing_return_to_depot() {
    let instance = create_test_instance();
    let solution = solution_with(&instance, vec![(vec![0, 1], vec![0.0, 0.0])]);
    let report = check_solution(&solution, &instance);

    assert!(!report.is_feasible());
    assert!(report
        .messages()
        .iter()
        .any(|m| m.contains("does not end at depot")));
}

#[test]
fn test_structural_defects() {
    let instance = create_test_instance();
    let solution = solution_with(&instance, vec![(vec![1, 99, 0], vec![0.0, 0.0])]);
    let report = check_solution(&solution, &instance);

    assert!(report.diagnostics.contains(&Diagnostic::StartsAwayFromDepot {
        vehicle: 1,
        trip: Some(0),
        found: 1,
    }));
    assert!(report.diagnostics.contains(&Diagnostic::UnknownNode {
        vehicle: 1,
        trip: Some(0),
        position: 1,
        node: 99,
    }));
    assert!(report.diagnostics.contains(&Diagnostic::ChargingLengthMismatch {
        vehicle: 1,
        trip: Some(0),
        stops: 3,
        charging: 2,
    }));
}

#[test]
fn test_capacity_violation() {
    let instance = create_test_instance();
    let mut solution = feasible_solution(&instance);
    // Both customers on one trip carry 20 > 15
    solution.vehicles[0].trips = vec![Trip::from_stops(vec![0, 1, 3, 2, 3, 0])];
    solution.vehicles[0].trips[0].charging = vec![0.0, 0.0, 15.0, 0.0, 20.0, 0.0];

    let report = check_solution(&solution, &instance);
    assert!(report
        .diagnostics
        .iter()
        .any(|d| matches!(d, Diagnostic::CapacityExceeded { demand, .. } if (*demand - 20.0).abs() < 1e-9)));
}

#[test]
fn test_battery_depletion() {
    let instance = create_test_instance();
    let solution = solution_with(
        &instance,
        vec![
            (vec![0, 1, 0], vec![0.0, 0.0, 0.0]),
            (vec![0, 2, 0], vec![0.0, 0.0, 0.0]),
        ],
    );
    let report = check_solution(&solution, &instance);

    let depleted: Vec<&Diagnostic> = report
        .diagnostics
        .iter()
        .filter(|d| matches!(d, Diagnostic::BatteryDepleted { .. }))
        .collect();
    assert_eq!(depleted.len(), 1);
    assert!(matches!(
        depleted[0],
        Diagnostic::BatteryDepleted { from: 0, to: 2, .. }
    ));
}

#[test]
fn test_charging_rules() {
    let instance = create_test_instance();
    let solution = solution_with(&instance, vec![(vec![0, 1, 0], vec![10.0, 5.0, -1.0])]);
    let report = check_solution(&solution, &instance);

    assert!(report
        .diagnostics
        .iter()
        .any(|d| matches!(d, Diagnostic::BatteryOverCapacity { node: 0, .. })));
    assert!(report
        .diagnostics
        .iter()
        .any(|d| matches!(d, Diagnostic::ChargeOutsideCharger { node: 1, .. })));
    assert!(report
        .diagnostics
        .iter()
        .any(|d| matches!(d, Diagnostic::NegativeCharge { node: 0, .. })));
}

#[test]
fn test_visit_counts() {
    let instance = create_test_instance();
    let mut solution = feasible_solution(&instance);
    solution.vehicles[1].trips = vec![Trip::from_stops(vec![0, 1, 0])];

    let report = check_solution(&solution, &instance);
    assert_eq!(
        report.diagnostics,
        vec![Diagnostic::HomeDeliveryVisits {
            customer: 1,
            count: 2
        }]
    );
}

#[test]
fn test_locker_designations() {
    let instance = create_test_instance();

    // Designated to the locker but visited at home, locker never visited
    let mut solution = feasible_solution(&instance);
    solution.locker_delivery = vec![Some(4), None];
    let report = check_solution(&solution, &instance);
    assert!(report.diagnostics.contains(&Diagnostic::LockerCustomerVisited {
        customer: 1,
        locker: 4,
        count: 1
    }));
    assert!(report.diagnostics.contains(&Diagnostic::LockerNotVisited {
        customer: 1,
        locker: 4
    }));

    // Served through the locker, which is within the radius
    solution.vehicles[0].trips[0] = Trip::from_stops(vec![0, 4, 0]);
    let report = check_solution(&solution, &instance);
    assert!(report.is_feasible(), "{:?}", report.messages());

    // Customer 2 is 20.6 away from the locker
    solution.locker_delivery = vec![Some(4), Some(4)];
    solution.vehicles[0].trips[1] = Trip::from_stops(vec![0, 4, 0]);
    let report = check_solution(&solution, &instance);
    assert!(report
        .diagnostics
        .iter()
        .any(|d| matches!(d, Diagnostic::OutsideLockerRadius { customer: 2, .. })));

    // Designation to something that is not a locker
    solution.locker_delivery = vec![Some(3), None];
    let report = check_solution(&solution, &instance);
    assert!(report.diagnostics.contains(&Diagnostic::InvalidLocker {
        customer: 1,
        locker: 3
    }));
}

#[test]
fn test_solution_file_round_trip_is_feasible() {
    let instance = create_test_instance();
    let mut solution = Construction::new(0.9).construct(&instance, vec![None, None]);
    solution.refresh_all(&instance);
    assert!(check_solution(&solution, &instance).is_feasible());

    let record = SolutionRecord::from_solution(&solution, &instance, "test", true);
    let mut buffer = Vec::new();
    record.write_to(&mut buffer).unwrap();
    let parsed = SolutionRecord::parse(&String::from_utf8(buffer).unwrap()).unwrap();

    let report = check_solution_record(&parsed, &instance);
    assert!(report.is_feasible(), "{:?}", report.messages());
}

#[test]
fn test_solution_file_flags_unknown_vehicle_and_missing_indicator() {
    let instance = create_test_instance();
    let solution = feasible_solution(&instance);
    let mut record = SolutionRecord::from_solution(&solution, &instance, "test", true);
    record.vehicles[1].vehicle_id = 7;
    record.locker_indicators.pop();

    let report = check_solution_record(&record, &instance);
    assert!(report
        .diagnostics
        .contains(&Diagnostic::UnknownVehicle { vehicle: 7 }));
    assert!(report
        .diagnostics
        .contains(&Diagnostic::MissingLockerIndicator { customer: 2 }));
}
