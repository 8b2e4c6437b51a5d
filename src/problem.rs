//! Problem definition and data structures for the EVRP with parcel lockers and deadlines.

use anyhow::{bail, ensure};
use serde::{Deserialize, Serialize};

/// Location id of the depot.
pub const DEPOT: usize = 0;

/// The kind of location a stop id refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Depot,
    Customer,
    Charger,
    Locker,
}

impl NodeKind {
    /// Depots and chargers are the only places where a vehicle may recharge.
    pub fn can_charge(self) -> bool {
        matches!(self, NodeKind::Depot | NodeKind::Charger)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Depot {
    pub x: f64,
    pub y: f64,
    pub deadline: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: usize,
    pub x: f64,
    pub y: f64,
    pub service_time: f64,
    pub deadline: f64,
    pub demand: f64,
}

impl Customer {
    pub fn new(id: usize, x: f64, y: f64, service_time: f64, deadline: f64, demand: f64) -> Self {
        Customer {
            id,
            x,
            y,
            service_time,
            deadline,
            demand,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Charger {
    pub id: usize,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Locker {
    pub id: usize,
    pub x: f64,
    pub y: f64,
    pub service_time: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: usize,
    pub initial_battery: f64,
}

/// Scalar parameters shared by every vehicle and location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameters {
    pub speed: f64,
    pub max_vehicle_volume: f64,
    pub max_battery_capacity: f64,
    pub discharge_rate: f64,
    pub recharge_rate: f64,
    pub locker_radius: f64,
    pub locker_opening_cost: f64,
    pub vehicle_deployment_cost: f64,
    pub cost_per_distance: f64,
    pub cost_per_time_late_customer: f64,
    pub cost_per_time_late_depot: f64,
}

impl Default for Parameters {
    fn default() -> Self {
        Parameters {
            speed: 1.0,
            max_vehicle_volume: 100.0,
            max_battery_capacity: 100.0,
            discharge_rate: 1.0,
            recharge_rate: 1.0,
            locker_radius: 0.0,
            locker_opening_cost: 0.0,
            vehicle_deployment_cost: 0.0,
            cost_per_distance: 1.0,
            cost_per_time_late_customer: 0.0,
            cost_per_time_late_depot: 0.0,
        }
    }
}

/// An immutable EVRP-LD instance.
///
/// Location ids are dense: `0` is the depot and every other id in `1..location_count()`
/// belongs to exactly one customer, charger or locker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    pub name: String,
    pub parameters: Parameters,
    pub depot: Depot,
    pub customers: Vec<Customer>,
    pub chargers: Vec<Charger>,
    pub lockers: Vec<Locker>,
    pub vehicles: Vec<Vehicle>,
    /// Kind of every location, indexed by id
    kinds: Vec<NodeKind>,
    /// Position of every location within its own kind's list, indexed by id
    ordinals: Vec<usize>,
    coordinates: Vec<(f64, f64)>,
    distance_matrix: Vec<Vec<f64>>,
}

impl Instance {
    /// Create a new instance, validating the id layout and deriving the distance matrix.
    pub fn new(
        name: String,
        parameters: Parameters,
        depot: Depot,
        mut customers: Vec<Customer>,
        mut chargers: Vec<Charger>,
        mut lockers: Vec<Locker>,
        vehicles: Vec<Vehicle>,
    ) -> anyhow::Result<Self> {
        ensure!(parameters.speed > 0.0, "speed must be positive");
        ensure!(
            parameters.recharge_rate > 0.0,
            "recharge rate must be positive"
        );
        ensure!(!vehicles.is_empty(), "instance has no vehicles");

        customers.sort_by_key(|c| c.id);
        chargers.sort_by_key(|c| c.id);
        lockers.sort_by_key(|l| l.id);

        let count = 1 + customers.len() + chargers.len() + lockers.len();
        let mut kinds: Vec<Option<NodeKind>> = vec![None; count];
        let mut ordinals = vec![0; count];
        let mut coordinates = vec![(0.0, 0.0); count];
        kinds[DEPOT] = Some(NodeKind::Depot);
        coordinates[DEPOT] = (depot.x, depot.y);

        let entries = customers
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id, NodeKind::Customer, i, c.x, c.y))
            .chain(
                chargers
                    .iter()
                    .enumerate()
                    .map(|(i, c)| (c.id, NodeKind::Charger, i, c.x, c.y)),
            )
            .chain(
                lockers
                    .iter()
                    .enumerate()
                    .map(|(i, l)| (l.id, NodeKind::Locker, i, l.x, l.y)),
            );

        for (id, kind, ordinal, x, y) in entries {
            if id == DEPOT || id >= count {
                bail!("{:?} id {} is outside the range 1..{}", kind, id, count);
            }
            if let Some(existing) = kinds[id] {
                bail!("id {} is used by both a {:?} and a {:?}", id, existing, kind);
            }
            kinds[id] = Some(kind);
            ordinals[id] = ordinal;
            coordinates[id] = (x, y);
        }

        // Every slot is filled: `count` ids and `count` distinct in-range entries.
        let kinds: Vec<NodeKind> = kinds.into_iter().flatten().collect();
        let distance_matrix = Self::compute_distance_matrix(&coordinates);

        Ok(Instance {
            name,
            parameters,
            depot,
            customers,
            chargers,
            lockers,
            vehicles,
            kinds,
            ordinals,
            coordinates,
            distance_matrix,
        })
    }

    /// Generate the full Euclidean distance matrix for all locations.
    fn compute_distance_matrix(coordinates: &[(f64, f64)]) -> Vec<Vec<f64>> {
        let n = coordinates.len();
        let mut matrix = vec![vec![0.0; n]; n];

        for i in 0..n {
            for j in (i + 1)..n {
                let d = euclidean(coordinates[i], coordinates[j]);
                matrix[i][j] = d;
                matrix[j][i] = d;
            }
        }

        matrix
    }

    /// Total number of locations including the depot.
    pub fn location_count(&self) -> usize {
        self.kinds.len()
    }

    pub fn distance(&self, from: usize, to: usize) -> f64 {
        self.distance_matrix[from][to]
    }

    pub fn travel_time(&self, from: usize, to: usize) -> f64 {
        self.distance(from, to) / self.parameters.speed
    }

    /// Battery energy consumed on the arc `from -> to`.
    pub fn energy(&self, from: usize, to: usize) -> f64 {
        self.distance(from, to) * self.parameters.discharge_rate
    }

    /// Kind of location `id`, or `None` for ids the instance does not know.
    pub fn kind(&self, id: usize) -> Option<NodeKind> {
        self.kinds.get(id).copied()
    }

    pub fn is_customer(&self, id: usize) -> bool {
        self.kind(id) == Some(NodeKind::Customer)
    }

    pub fn is_locker(&self, id: usize) -> bool {
        self.kind(id) == Some(NodeKind::Locker)
    }

    pub fn can_charge_at(&self, id: usize) -> bool {
        self.kind(id).map_or(false, NodeKind::can_charge)
    }

    pub fn coordinates(&self, id: usize) -> (f64, f64) {
        self.coordinates[id]
    }

    /// Position of a customer in `customers`, used to index per-customer vectors.
    pub fn customer_ordinal(&self, id: usize) -> Option<usize> {
        self.is_customer(id).then(|| self.ordinals[id])
    }

    /// Customer data for a customer id. Panics if `id` is not a customer.
    pub fn customer(&self, id: usize) -> &Customer {
        debug_assert!(self.is_customer(id));
        &self.customers[self.ordinals[id]]
    }

    /// Locker data for a locker id. Panics if `id` is not a locker.
    pub fn locker(&self, id: usize) -> &Locker {
        debug_assert!(self.is_locker(id));
        &self.lockers[self.ordinals[id]]
    }

    pub fn customer_count(&self) -> usize {
        self.customers.len()
    }

    /// Nearest charger to `from` that is not listed in `excluded`.
    pub fn nearest_charger(&self, from: usize, excluded: &[usize]) -> Option<usize> {
        self.chargers
            .iter()
            .map(|c| c.id)
            .filter(|id| *id != from && !excluded.contains(id))
            .min_by(|a, b| self.distance(from, *a).total_cmp(&self.distance(from, *b)))
    }

    /// Nearest location (charger or depot) where a vehicle standing at `from` can recharge.
    pub fn nearest_charging_point(&self, from: usize) -> usize {
        if self.can_charge_at(from) {
            return from;
        }
        match self.nearest_charger(from, &[]) {
            Some(charger) if self.distance(from, charger) < self.distance(from, DEPOT) => charger,
            _ => DEPOT,
        }
    }

    /// Vehicle data for a vehicle id.
    pub fn vehicle(&self, id: usize) -> Option<&Vehicle> {
        self.vehicles.iter().find(|v| v.id == id)
    }
}

/// Straight-line distance between two points.
pub fn euclidean(a: (f64, f64), b: (f64, f64)) -> f64 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    (dx * dx + dy * dy).sqrt()
}
