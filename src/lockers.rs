//! Parcel-locker assignment policies.
//!
//! A policy decides, before construction, which customers pick up their parcel at a locker
//! instead of receiving a home delivery.

use crate::problem::{euclidean, Instance};
use serde::{Deserialize, Serialize};

/// Decides which customers are served through a locker.
pub trait LockerAssignment {
    /// Locker id per customer ordinal, or `None` for home delivery.
    fn assign(&self, instance: &Instance) -> Vec<Option<usize>>;
}

/// Every customer gets a home delivery.
#[derive(Debug, Clone, Copy, Default)]
pub struct HomeDelivery;

impl LockerAssignment for HomeDelivery {
    fn assign(&self, instance: &Instance) -> Vec<Option<usize>> {
        vec![None; instance.customer_count()]
    }
}

/// Customers within the locker radius of some locker pick up at the nearest such locker.
#[derive(Debug, Clone, Copy, Default)]
pub struct NearestWithinRadius;

impl LockerAssignment for NearestWithinRadius {
    fn assign(&self, instance: &Instance) -> Vec<Option<usize>> {
        let radius = instance.parameters.locker_radius;

        instance
            .customers
            .iter()
            .map(|customer| {
                instance
                    .lockers
                    .iter()
                    .map(|l| (l.id, euclidean((customer.x, customer.y), (l.x, l.y))))
                    .filter(|(_, d)| *d <= radius)
                    .min_by(|a, b| a.1.total_cmp(&b.1))
                    .map(|(id, _)| id)
            })
            .collect()
    }
}

/// Selectable built-in policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LockerPolicy {
    #[default]
    HomeDelivery,
    NearestWithinRadius,
}

impl LockerAssignment for LockerPolicy {
    fn assign(&self, instance: &Instance) -> Vec<Option<usize>> {
        match self {
            LockerPolicy::HomeDelivery => HomeDelivery.assign(instance),
            LockerPolicy::NearestWithinRadius => NearestWithinRadius.assign(instance),
        }
    }
}

/// Total demand of the customers designated to pick up at `locker`.
pub fn locker_load(locker: usize, designations: &[Option<usize>], instance: &Instance) -> f64 {
    designations
        .iter()
        .zip(instance.customers.iter())
        .filter(|(designation, _)| **designation == Some(locker))
        .map(|(_, customer)| customer.demand)
        .sum()
}

/// Lockers with at least one designated customer, in ascending id order.
pub fn used_lockers(designations: &[Option<usize>]) -> Vec<usize> {
    let mut lockers: Vec<usize> = designations.iter().flatten().copied().collect();
    lockers.sort_unstable();
    lockers.dedup();
    lockers
}
