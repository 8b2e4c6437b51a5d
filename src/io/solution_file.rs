//! Solution files: one record per solved instance, written and read line by line.

use crate::io::instance_reader::as_id;
use crate::problem::Instance;
use crate::solution::Solution;
use anyhow::{bail, ensure, Context};
use itertools::Itertools;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Flattened routes of one vehicle as stored in a solution file.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleRecord {
    pub vehicle_id: usize,
    pub route: Vec<usize>,
    pub charging: Vec<f64>,
    /// Unloading completion time at every stop
    pub unloading: Vec<f64>,
}

/// Contents of a solution file.
#[derive(Debug, Clone, PartialEq)]
pub struct SolutionRecord {
    pub instance_id: String,
    pub description: String,
    pub feasible: bool,
    pub total_cost: f64,
    pub locker_cost: f64,
    pub deployment_cost: f64,
    pub travel_cost: f64,
    pub customer_penalty: f64,
    pub depot_penalty: f64,
    /// Per customer: `0` for home delivery, otherwise the locker id
    pub locker_indicators: Vec<usize>,
    pub vehicles: Vec<VehicleRecord>,
}

const VEHICLE_SECTION_LINE: usize = 10;

impl SolutionRecord {
    pub fn from_solution(solution: &Solution, instance: &Instance, description: &str, feasible: bool) -> Self {
        let costs = solution.cost_totals();

        SolutionRecord {
            instance_id: instance.name.clone(),
            description: description.to_string(),
            feasible,
            total_cost: costs.total(),
            locker_cost: costs.locker,
            deployment_cost: costs.deployment,
            travel_cost: costs.travel,
            customer_penalty: costs.customer_penalty,
            depot_penalty: costs.depot_penalty,
            locker_indicators: solution.locker_indicators(),
            vehicles: solution
                .vehicles
                .iter()
                .map(|v| VehicleRecord {
                    vehicle_id: v.vehicle_id,
                    route: v.flattened_stops(),
                    charging: v.flattened_charging(),
                    unloading: v.flattened_schedule(),
                })
                .collect(),
        }
    }

    /// Conventional file name, `<instance id>.sol`.
    pub fn file_name(&self) -> String {
        format!("{}.sol", self.instance_id)
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(writer, "{}", self.instance_id)?;
        writeln!(writer, "{}", self.description)?;
        writeln!(writer, "{}", if self.feasible { 1 } else { 0 })?;
        writeln!(writer, "{}", self.total_cost)?;
        writeln!(writer, "{}", self.locker_cost)?;
        writeln!(writer, "{}", self.deployment_cost)?;
        writeln!(writer, "{}", self.travel_cost)?;
        writeln!(writer, "{}", self.customer_penalty)?;
        writeln!(writer, "{}", self.depot_penalty)?;
        writeln!(writer, "{}", self.locker_indicators.iter().join(" "))?;

        for vehicle in &self.vehicles {
            writeln!(writer, "{} {}", vehicle.vehicle_id, vehicle.route.iter().join(" "))?;
            writeln!(writer, "{} {}", vehicle.vehicle_id, vehicle.charging.iter().join(" "))?;
            writeln!(writer, "{} {}", vehicle.vehicle_id, vehicle.unloading.iter().join(" "))?;
        }

        Ok(())
    }

    /// Write the record to `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("creating solution file {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer)
            .and_then(|_| writer.flush())
            .with_context(|| format!("writing solution file {}", path.display()))
    }

    /// Parse the text of a solution file.
    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let lines: Vec<&str> = text.lines().collect();
        let line = |index: usize, what: &str| field(&lines, index, what);
        let number = |index: usize, what: &str| -> anyhow::Result<f64> {
            field(&lines, index, what)?
                .parse::<f64>()
                .with_context(|| format!("line {}: invalid {}", index + 1, what))
        };

        let feasible = match line(2, "feasibility flag")? {
            "1" | "true" | "True" => true,
            "0" | "false" | "False" => false,
            other => bail!("line 3: invalid feasibility flag {:?}", other),
        };

        let locker_indicators = line(9, "locker indicators")?
            .split_whitespace()
            .map(|t| t.parse::<usize>())
            .collect::<Result<Vec<_>, _>>()
            .context("line 10: invalid locker indicator")?;

        let body: Vec<&str> = lines
            .get(VEHICLE_SECTION_LINE..)
            .unwrap_or(&[])
            .iter()
            .map(|l| l.trim())
            .collect();
        let body_len = body.iter().rposition(|l| !l.is_empty()).map_or(0, |p| p + 1);
        ensure!(
            body_len % 3 == 0,
            "vehicle section has {} line(s), expected three per vehicle",
            body_len
        );

        let mut vehicles = Vec::with_capacity(body_len / 3);
        for (chunk, group) in body[..body_len].chunks(3).enumerate() {
            let first = VEHICLE_SECTION_LINE + chunk * 3 + 1;
            let (id, route) = parse_vehicle_line::<f64>(group[0], first, "route")?;
            // other writers emit stop ids like `0.0`
            let route = route
                .into_iter()
                .map(as_id)
                .collect::<anyhow::Result<Vec<usize>>>()
                .with_context(|| format!("line {}: invalid route entry", first))?;
            let (charging_id, charging) = parse_vehicle_line::<f64>(group[1], first + 1, "charging")?;
            let (unloading_id, unloading) =
                parse_vehicle_line::<f64>(group[2], first + 2, "unloading times")?;
            ensure!(
                charging_id == id && unloading_id == id,
                "lines {}-{}: vehicle ids {}, {}, {} disagree",
                first,
                first + 2,
                id,
                charging_id,
                unloading_id
            );

            vehicles.push(VehicleRecord {
                vehicle_id: id,
                route,
                charging,
                unloading,
            });
        }

        Ok(SolutionRecord {
            instance_id: line(0, "instance id")?.to_string(),
            description: line(1, "description")?.to_string(),
            feasible,
            total_cost: number(3, "total cost")?,
            locker_cost: number(4, "locker cost")?,
            deployment_cost: number(5, "deployment cost")?,
            travel_cost: number(6, "travel cost")?,
            customer_penalty: number(7, "customer penalty")?,
            depot_penalty: number(8, "depot penalty")?,
            locker_indicators,
            vehicles,
        })
    }

    /// Read and parse a solution file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading solution file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing solution file {}", path.display()))
    }
}

fn field<'a>(lines: &[&'a str], index: usize, what: &str) -> anyhow::Result<&'a str> {
    lines
        .get(index)
        .map(|l| l.trim())
        .with_context(|| format!("line {}: missing {}", index + 1, what))
}

/// `<vehicle id> <values...>`
fn parse_vehicle_line<T: std::str::FromStr>(
    line: &str,
    number: usize,
    what: &str,
) -> anyhow::Result<(usize, Vec<T>)> {
    let mut tokens = line.split_whitespace();
    let id = tokens
        .next()
        .and_then(|t| t.parse::<usize>().ok())
        .with_context(|| format!("line {}: missing vehicle id before {}", number, what))?;

    let mut values = Vec::new();
    for token in tokens {
        match token.parse::<T>() {
            Ok(value) => values.push(value),
            Err(_) => bail!("line {}: invalid {} entry {:?}", number, what, token),
        }
    }

    Ok((id, values))
}
