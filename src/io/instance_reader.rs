//! Reader for the fixed-order instance text format.
//!
//! Line 0 holds the instance id, line 1 is free text, lines 2-5 the customer, charger, locker
//! and vehicle counts, lines 6-16 the scalar parameters. Then follow one line per vehicle
//! (`id battery`), the depot line (`id x y deadline`), customer lines
//! (`id x y service_time deadline demand`), charger lines (`id x y`) and locker lines
//! (`id x y service_time`). Numbers are picked out of each line, so labels and separators
//! around them are ignored.

use crate::problem::{Charger, Customer, Depot, Instance, Locker, Parameters, Vehicle};
use anyhow::{bail, ensure, Context};
use lazy_static::lazy_static;
use regex::Regex;
use std::fs;
use std::path::Path;

const FIRST_PARAMETER_LINE: usize = 6;
const FIRST_VEHICLE_LINE: usize = 17;

lazy_static! {
    static ref NUMBER: Regex = Regex::new(r"[-+]?[0-9]*\.?[0-9]+").expect("number pattern compiles");
}

/// All numeric tokens (`[-+]?[0-9]*\.?[0-9]+`) of a line, in order.
pub fn scan_numbers(line: &str) -> Vec<f64> {
    NUMBER
        .find_iter(line)
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .collect()
}

struct Lines<'a> {
    lines: Vec<&'a str>,
}

impl<'a> Lines<'a> {
    fn get(&self, index: usize, what: &str) -> anyhow::Result<&'a str> {
        self.lines
            .get(index)
            .copied()
            .with_context(|| format!("line {}: missing {}", index + 1, what))
    }

    /// At least `count` numbers from a line.
    fn numbers(&self, index: usize, what: &str, count: usize) -> anyhow::Result<Vec<f64>> {
        let values = scan_numbers(self.get(index, what)?);
        ensure!(
            values.len() >= count,
            "line {}: expected {} number(s) for {}, found {}",
            index + 1,
            count,
            what,
            values.len()
        );
        Ok(values)
    }

    fn scalar(&self, index: usize, what: &str) -> anyhow::Result<f64> {
        Ok(self.numbers(index, what, 1)?[0])
    }

    fn count(&self, index: usize, what: &str) -> anyhow::Result<usize> {
        let value = self.scalar(index, what)?;
        as_id(value).with_context(|| format!("line {}: invalid {}", index + 1, what))
    }
}

/// A non-negative integral number as an id or count.
pub(crate) fn as_id(value: f64) -> anyhow::Result<usize> {
    if value < 0.0 || value.fract() != 0.0 {
        bail!("{} is not a non-negative integer", value);
    }
    Ok(value as usize)
}

/// Parse an instance from the text of an instance file.
pub fn parse_instance(text: &str) -> anyhow::Result<Instance> {
    let lines = Lines {
        lines: text.lines().collect(),
    };

    let name = lines.get(0, "instance id")?.trim().to_string();
    let customer_count = lines.count(2, "customer count")?;
    let charger_count = lines.count(3, "charger count")?;
    let locker_count = lines.count(4, "locker count")?;
    let vehicle_count = lines.count(5, "vehicle count")?;

    let names = [
        "speed",
        "max vehicle volume",
        "max battery capacity",
        "discharge rate",
        "recharge rate",
        "locker radius",
        "locker opening cost",
        "vehicle deployment cost",
        "cost per distance",
        "cost per time late (customer)",
        "cost per time late (depot)",
    ];
    let mut p = Vec::with_capacity(names.len());
    for (offset, what) in names.iter().enumerate() {
        p.push(lines.scalar(FIRST_PARAMETER_LINE + offset, what)?);
    }
    let parameters = Parameters {
        speed: p[0],
        max_vehicle_volume: p[1],
        max_battery_capacity: p[2],
        discharge_rate: p[3],
        recharge_rate: p[4],
        locker_radius: p[5],
        locker_opening_cost: p[6],
        vehicle_deployment_cost: p[7],
        cost_per_distance: p[8],
        cost_per_time_late_customer: p[9],
        cost_per_time_late_depot: p[10],
    };

    let mut line = FIRST_VEHICLE_LINE;
    let mut vehicles = Vec::new();
    for _ in 0..vehicle_count {
        let v = lines.numbers(line, "vehicle", 2)?;
        vehicles.push(Vehicle {
            id: as_id(v[0]).with_context(|| format!("line {}: vehicle id", line + 1))?,
            initial_battery: v[1],
        });
        line += 1;
    }

    let d = lines.numbers(line, "depot", 4)?;
    ensure!(d[0] == 0.0, "line {}: depot id must be 0, found {}", line + 1, d[0]);
    let depot = Depot {
        x: d[1],
        y: d[2],
        deadline: d[3],
    };
    line += 1;

    let mut customers = Vec::new();
    for _ in 0..customer_count {
        let c = lines.numbers(line, "customer", 6)?;
        let id = as_id(c[0]).with_context(|| format!("line {}: customer id", line + 1))?;
        customers.push(Customer::new(id, c[1], c[2], c[3], c[4], c[5]));
        line += 1;
    }

    let mut chargers = Vec::new();
    for _ in 0..charger_count {
        let c = lines.numbers(line, "charger", 3)?;
        chargers.push(Charger {
            id: as_id(c[0]).with_context(|| format!("line {}: charger id", line + 1))?,
            x: c[1],
            y: c[2],
        });
        line += 1;
    }

    let mut lockers = Vec::new();
    for _ in 0..locker_count {
        let l = lines.numbers(line, "locker", 4)?;
        lockers.push(Locker {
            id: as_id(l[0]).with_context(|| format!("line {}: locker id", line + 1))?,
            x: l[1],
            y: l[2],
            service_time: l[3],
        });
        line += 1;
    }

    Instance::new(name, parameters, depot, customers, chargers, lockers, vehicles)
}

/// Read and parse an instance file.
pub fn read_instance<P: AsRef<Path>>(path: P) -> anyhow::Result<Instance> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading instance file {}", path.display()))?;
    parse_instance(&text).with_context(|| format!("parsing instance file {}", path.display()))
}
