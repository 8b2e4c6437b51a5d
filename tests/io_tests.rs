//! Tests for instance parsing and solution files.

use evrp_alns::construction::Construction;
use evrp_alns::feasibility::check_solution_file;
use evrp_alns::io::{parse_instance, read_instance, SolutionRecord};
use evrp_alns::problem::NodeKind;
use std::fs;

const INSTANCE: &str = "\
demo-1
generated for tests
2
1
1
1
1.0
100
50
1.0
2.0
5
10
1.5
1
2
3
vehicle 1: 50
0 0 0 500
1 10 0 2 100 5
2 10 10 2 100 5
3 0 10
4 12 0 3
";

#[test]
fn test_parse_instance() {
    let instance = parse_instance(INSTANCE).unwrap();

    assert_eq!(instance.name, "demo-1");
    assert_eq!(instance.customer_count(), 2);
    assert_eq!(instance.location_count(), 5);
    assert_eq!(instance.vehicles.len(), 1);
    assert_eq!(instance.vehicles[0].initial_battery, 50.0);

    let p = &instance.parameters;
    assert_eq!(p.max_battery_capacity, 50.0);
    assert_eq!(p.recharge_rate, 2.0);
    assert_eq!(p.locker_radius, 5.0);
    assert_eq!(p.locker_opening_cost, 10.0);
    assert_eq!(p.vehicle_deployment_cost, 1.5);
    assert_eq!(p.cost_per_time_late_depot, 3.0);

    assert_eq!(instance.depot.deadline, 500.0);
    assert_eq!(instance.kind(3), Some(NodeKind::Charger));
    assert_eq!(instance.kind(4), Some(NodeKind::Locker));
    assert_eq!(instance.customer(2).deadline, 100.0);
    assert_eq!(instance.locker(4).service_time, 3.0);
    assert!((instance.distance(1, 2) - 10.0).abs() < 1e-9);
}

#[test]
fn test_truncated_instance_names_the_line() {
    let truncated: String = INSTANCE.lines().take(20).collect::<Vec<_>>().join("\n");
    let error = parse_instance(&truncated).unwrap_err();
    assert!(format!("{:#}", error).contains("line 21"));
}

#[test]
fn test_bad_count_is_rejected() {
    let broken = INSTANCE.replacen("\n2\n1\n1\n1\n", "\n2.5\n1\n1\n1\n", 1);
    assert!(parse_instance(&broken).is_err());
}

#[test]
fn test_oversized_count_is_an_error() {
    let broken = INSTANCE.replacen("\n2\n1\n1\n1\n", "\n99999999999999999\n1\n1\n1\n", 1);
    let error = parse_instance(&broken).unwrap_err();
    assert!(format!("{:#}", error).contains("customer"));
}

#[test]
fn test_conflicting_ids_are_rejected() {
    let broken = INSTANCE.replace("3 0 10", "2 0 10");
    assert!(parse_instance(&broken).is_err());
}

#[test]
fn test_solution_record_round_trip() {
    let instance = parse_instance(INSTANCE).unwrap();
    let solution = Construction::new(0.9).construct(&instance, vec![None, Some(4)]);
    let record = SolutionRecord::from_solution(&solution, &instance, "round trip", true);

    let mut buffer = Vec::new();
    record.write_to(&mut buffer).unwrap();
    let text = String::from_utf8(buffer).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "demo-1");
    assert_eq!(lines[1], "round trip");
    assert_eq!(lines[2], "1");
    assert_eq!(lines[9], "0 4");
    assert_eq!(lines.len(), 10 + 3 * instance.vehicles.len());

    let parsed = SolutionRecord::parse(&text).unwrap();
    assert_eq!(parsed, record);
    assert!((parsed.total_cost - solution.objective).abs() < 1e-9);
}

#[test]
fn test_malformed_solution_is_an_error() {
    let text = "demo-1\ndesc\nmaybe\n0\n0\n0\n0\n0\n0\n0 0\n";
    assert!(SolutionRecord::parse(text).is_err());

    let text = "demo-1\ndesc\n1\n0\n0\n0\n0\n0\n0\n0 0\n1 0 0\n1 0 0\n";
    assert!(SolutionRecord::parse(text).is_err());
}

#[test]
fn test_route_entries_written_as_floats() {
    let text = "demo-1\ndesc\n1\n0\n0\n0\n0\n0\n0\n0 0\n1 0.0 0.0\n1 0 0\n1 0 0\n";
    let record = SolutionRecord::parse(text).unwrap();
    assert_eq!(record.vehicles[0].route, vec![0, 0]);

    let text = "demo-1\ndesc\n1\n0\n0\n0\n0\n0\n0\n0 0\n1 0 1.5 0\n1 0 0 0\n1 0 0 0\n";
    assert!(SolutionRecord::parse(text).is_err());
}

#[test]
fn test_check_solution_file_from_disk() {
    let directory = std::env::temp_dir().join(format!("evrp-alns-io-{}", std::process::id()));
    fs::create_dir_all(&directory).unwrap();
    let instance_path = directory.join("demo-1.txt");
    fs::write(&instance_path, INSTANCE).unwrap();

    let instance = read_instance(&instance_path).unwrap();
    let solution = Construction::new(0.9).construct(&instance, vec![None, None]);
    let record = SolutionRecord::from_solution(&solution, &instance, "disk", true);
    let solution_path = directory.join(record.file_name());
    record.save(&solution_path).unwrap();

    let report = check_solution_file(&solution_path, &instance).unwrap();
    assert!(report.is_feasible(), "{:?}", report.messages());

    fs::remove_dir_all(&directory).unwrap();
}
