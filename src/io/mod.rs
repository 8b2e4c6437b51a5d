//! Reading instance files and reading/writing solution files.

pub mod instance_reader;
pub mod solution_file;

pub use instance_reader::{parse_instance, read_instance};
pub use solution_file::{SolutionRecord, VehicleRecord};
