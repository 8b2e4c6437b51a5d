//! Tests for the construction heuristic.

use evrp_alns::construction::{vehicle_from_routes, Construction};
use evrp_alns::feasibility::check_solution;
use evrp_alns::lockers::{LockerAssignment, LockerPolicy};
use evrp_alns::problem::{Charger, Customer, Depot, Instance, Locker, Parameters, Vehicle};

fn depot() -> Depot {
    Depot {
        x: 0.0,
        y: 0.0,
        deadline: 1000.0,
    }
}

fn vehicle(id: usize, battery: f64) -> Vehicle {
    Vehicle {
        id,
        initial_battery: battery,
    }
}

/// Two customers on a line, battery and capacity never binding.
fn create_two_customer_instance(volume: f64) -> Instance {
    let parameters = Parameters {
        max_vehicle_volume: volume,
        ..Parameters::default()
    };
    Instance::new(
        "two".to_string(),
        parameters,
        depot(),
        vec![
            Customer::new(1, 10.0, 0.0, 0.0, 1000.0, 10.0),
            Customer::new(2, 20.0, 0.0, 0.0, 1000.0, 10.0),
        ],
        Vec::new(),
        Vec::new(),
        vec![vehicle(1, 100.0)],
    )
    .unwrap()
}

/// Depot at 0, customer 1 at 10, charger 3 at 20, customer 2 at 30; battery of 25.
fn create_line_instance() -> Instance {
    let parameters = Parameters {
        max_battery_capacity: 25.0,
        recharge_rate: 2.0,
        ..Parameters::default()
    };
    Instance::new(
        "line".to_string(),
        parameters,
        depot(),
        vec![
            Customer::new(1, 10.0, 0.0, 1.0, 1000.0, 1.0),
            Customer::new(2, 30.0, 0.0, 1.0, 1000.0, 1.0),
        ],
        vec![Charger {
            id: 3,
            x: 20.0,
            y: 0.0,
        }],
        Vec::new(),
        vec![vehicle(1, 25.0)],
    )
    .unwrap()
}

#[test]
fn test_nearest_neighbour_single_trip() {
    let instance = create_two_customer_instance(100.0);
    let solution = Construction::new(0.9).construct(&instance, vec![None, None]);

    let vehicle = &solution.vehicles[0];
    assert_eq!(vehicle.trips.len(), 1);
    assert_eq!(vehicle.trips[0].stops, vec![0, 1, 2, 0]);
    assert_eq!(vehicle.trips[0].charging.len(), 4);

    // 10 + 10 + 20 at unit cost per distance, nothing else is charged
    assert!((solution.objective - 40.0).abs() < 1e-9);
    assert_eq!(solution.cost_totals().locker, 0.0);
    assert!(check_solution(&solution, &instance).is_feasible());
}

#[test]
fn test_capacity_opens_new_trip() {
    let instance = create_two_customer_instance(15.0);
    let solution = Construction::new(0.9).construct(&instance, vec![None, None]);

    let stops: Vec<Vec<usize>> = solution.vehicles[0]
        .trips
        .iter()
        .map(|t| t.stops.clone())
        .collect();
    assert_eq!(stops, vec![vec![0, 1, 0], vec![0, 2, 0]]);
    for trip in &solution.vehicles[0].trips {
        assert!(trip.load <= 15.0);
    }
    assert!(check_solution(&solution, &instance).is_feasible());
}

#[test]
fn test_charger_detours_keep_battery_feasible() {
    let instance = create_line_instance();
    let solution = Construction::new(0.9).construct(&instance, vec![None, None]);

    let trip = &solution.vehicles[0].trips[0];
    assert_eq!(trip.stops, vec![0, 1, 3, 2, 3, 0]);
    assert!((trip.charging[2] - 15.0).abs() < 1e-9);
    assert!((trip.charging[4] - 20.0).abs() < 1e-9);

    let report = check_solution(&solution, &instance);
    assert!(report.is_feasible(), "{:?}", report.messages());
}

#[test]
fn test_unreachable_customer_stays_unvisited() {
    let parameters = Parameters {
        max_battery_capacity: 25.0,
        ..Parameters::default()
    };
    let instance = Instance::new(
        "far".to_string(),
        parameters,
        depot(),
        vec![Customer::new(1, 100.0, 0.0, 0.0, 1000.0, 1.0)],
        Vec::new(),
        Vec::new(),
        vec![vehicle(1, 25.0)],
    )
    .unwrap();

    let solution = Construction::new(0.9).construct(&instance, vec![None]);
    assert_eq!(solution.vehicles[0].trips[0].stops, vec![0, 0]);
    assert_eq!(solution.unvisited_customers(&instance), vec![1]);
    assert!(!check_solution(&solution, &instance).is_feasible());
}

#[test]
fn test_locker_customers_are_served_at_the_locker() {
    let parameters = Parameters {
        locker_radius: 5.0,
        locker_opening_cost: 4.0,
        ..Parameters::default()
    };
    let instance = Instance::new(
        "locker".to_string(),
        parameters,
        depot(),
        vec![
            Customer::new(1, 10.0, 0.0, 0.0, 1000.0, 5.0),
            Customer::new(2, 12.0, 0.0, 0.0, 1000.0, 5.0),
        ],
        Vec::new(),
        vec![Locker {
            id: 3,
            x: 11.0,
            y: 0.0,
            service_time: 1.0,
        }],
        vec![vehicle(1, 100.0)],
    )
    .unwrap();

    let designations = LockerPolicy::NearestWithinRadius.assign(&instance);
    assert_eq!(designations, vec![Some(3), Some(3)]);

    let solution = Construction::new(0.9).construct(&instance, designations);
    let trip = &solution.vehicles[0].trips[0];
    assert_eq!(trip.stops, vec![0, 3, 0]);
    assert_eq!(trip.load, 10.0);
    assert_eq!(solution.cost_totals().locker, 4.0);
    assert!(check_solution(&solution, &instance).is_feasible());
}

#[test]
fn test_empty_battery_charges_at_depot() {
    let instance = Instance::new(
        "empty".to_string(),
        Parameters::default(),
        depot(),
        vec![Customer::new(1, 30.0, 0.0, 0.0, 1000.0, 1.0)],
        Vec::new(),
        Vec::new(),
        vec![vehicle(1, 0.0), vehicle(2, 100.0)],
    )
    .unwrap();

    let solution = Construction::new(0.9).construct(&instance, vec![None]);
    let trip = &solution.vehicles[0].trips[0];
    assert_eq!(trip.stops, vec![0, 1, 0]);
    // Enough to go out and come back
    assert!((trip.charging[0] - 60.0).abs() < 1e-9);
    assert_eq!(solution.get_used_vehicle_count(&instance), 1);

    let report = check_solution(&solution, &instance);
    assert!(report.is_feasible(), "{:?}", report.messages());
}

#[test]
fn test_vehicle_from_routes_plans_charging() {
    let instance = create_line_instance();
    let state = vehicle_from_routes(
        &instance,
        &instance.vehicles[0],
        vec![vec![0, 1, 3, 2, 3, 0]],
        &[None, None],
    );
    assert!((state.trips[0].charging[2] - 15.0).abs() < 1e-9);
    assert!((state.trips[0].length - 60.0).abs() < 1e-9);
    assert!((state.costs.travel - 60.0).abs() < 1e-9);
}
