//! Basic example of using the EVRP-ALNS library.

use evrp_alns::config::Config;
use evrp_alns::io::{read_instance, SolutionRecord};
use evrp_alns::lockers::LockerPolicy;
use evrp_alns::EvrpSolver;
use std::env;
use std::time::Duration;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    // Get instance path from command line or use default
    let args: Vec<String> = env::args().collect();
    let instance_path = if args.len() > 1 {
        &args[1]
    } else {
        "instances/evrp-ld-01.txt"
    };

    println!("Loading instance from: {}", instance_path);
    let instance = read_instance(instance_path)?;
    println!(
        "Loaded instance: {} with {} customers, {} chargers, {} lockers, {} vehicles",
        instance.name,
        instance.customer_count(),
        instance.chargers.len(),
        instance.lockers.len(),
        instance.vehicles.len()
    );

    let config = Config::new()
        .with_max_iterations(5000)
        .with_segment_length(100)
        .with_temperature(100.0, 0.999)
        .with_locker_policy(LockerPolicy::NearestWithinRadius)
        .with_time_limit(Duration::from_secs(60));

    println!("Starting search (time limit: 60s)");
    let solver = EvrpSolver::new(instance, config);
    let outcome = solver.run()?;

    println!("{}", outcome.statistics.format());
    for message in outcome.report.messages() {
        println!("violation: {}", message);
    }

    let record = SolutionRecord::from_solution(
        &outcome.solution,
        &solver.instance,
        "ALNS basic demo",
        outcome.report.is_feasible(),
    );
    let output_path = record.file_name();
    println!("Saving solution to: {}", output_path);
    record.save(&output_path)?;

    Ok(())
}
