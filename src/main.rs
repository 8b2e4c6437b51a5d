use clap::{Parser, Subcommand};
use evrp_alns::config::Config;
use evrp_alns::feasibility::check_solution_file;
use evrp_alns::io::{read_instance, SolutionRecord};
use evrp_alns::EvrpSolver;
use log::info;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(version, about = "ALNS solver for the EVRP with parcel lockers and deadlines")]
struct ProgramArguments {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Construct and improve a solution, then write it as `<instance id>.sol`
    Solve {
        #[arg(short, long, help = "instance file path")]
        instance: PathBuf,

        #[arg(short, long, help = "JSON configuration file")]
        config: Option<PathBuf>,

        #[arg(long, help = "rng seed")]
        seed: Option<u64>,

        #[arg(long, help = "number of ALNS iterations")]
        iterations: Option<usize>,

        #[arg(long, help = "time limit in seconds")]
        time_limit: Option<u64>,

        #[arg(short, long, help = "directory to store the solution", default_value = ".")]
        output_directory: PathBuf,

        #[arg(short, long, help = "description line of the solution file", default_value = "ALNS")]
        description: String,
    },
    /// Check a solution file against its instance
    Check {
        #[arg(short, long, help = "instance file path")]
        instance: PathBuf,

        #[arg(short, long, help = "solution file path")]
        solution: PathBuf,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    env_logger::init();
    let args = ProgramArguments::parse();

    match args.command {
        Command::Solve {
            instance,
            config,
            seed,
            iterations,
            time_limit,
            output_directory,
            description,
        } => {
            let instance = read_instance(&instance)?;
            let mut config = match config {
                Some(path) => Config::from_json_file(path)?,
                None => Config::new(),
            };
            if let Some(seed) = seed {
                config = config.with_seed(seed);
            }
            if let Some(iterations) = iterations {
                config = config.with_max_iterations(iterations);
            }
            if let Some(seconds) = time_limit {
                config = config.with_time_limit(Duration::from_secs(seconds));
            }

            let solver = EvrpSolver::new(instance, config);
            let outcome = solver.run()?;
            println!("{}", outcome.statistics.format());
            for message in outcome.report.messages() {
                println!("  violation: {}", message);
            }

            let record = SolutionRecord::from_solution(
                &outcome.solution,
                &solver.instance,
                &description,
                outcome.report.is_feasible(),
            );
            let path = output_directory.join(record.file_name());
            record.save(&path)?;
            info!("solution written to {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        Command::Check { instance, solution } => {
            let instance = read_instance(&instance)?;
            let report = check_solution_file(&solution, &instance)?;
            if report.is_feasible() {
                println!("{}: feasible", solution.display());
                Ok(ExitCode::SUCCESS)
            } else {
                println!("{}: infeasible", solution.display());
                for message in report.messages() {
                    println!("  {}", message);
                }
                Ok(ExitCode::FAILURE)
            }
        }
    }
}
