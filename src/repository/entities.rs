use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::shared::geo::{Coordinate, Distance};

/// A named place where buses stop.
#[derive(Debug, Default, Clone)]
pub struct Stop {
    /// Stable id assigned in first-seen order. Doubles as the graph vertex id.
    pub id: u32,
    /// Unique human-readable name, the external lookup key.
    pub name: Arc<str>,
    pub coordinate: Coordinate,
}

/// How a bus walks its stop sequence.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BusKind {
    /// Closed loop, traversed once in declaration order.
    #[default]
    Circular,
    /// Traversed forward, then back over the same stops.
    Linear,
}

/// A named bus line over stops already known to the repository.
#[derive(Debug, Default, Clone)]
pub struct Bus {
    pub id: u32,
    pub name: Arc<str>,
    pub kind: BusKind,
    /// Stop ids in declaration order. A stop may appear more than once.
    pub stops: Arc<[u32]>,
}

impl Bus {
    /// Every stop the bus calls at, in riding order.
    /// Linear buses turn around at the last stop without calling there twice.
    pub fn traversal(&self) -> impl Iterator<Item = u32> + '_ {
        let back = match self.kind {
            BusKind::Circular => 0,
            BusKind::Linear => self.stops.len().saturating_sub(1),
        };
        self.stops
            .iter()
            .chain(self.stops.iter().rev().skip(1).take(back))
            .copied()
    }
}

/// Route statistics reported for a single bus.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusInfo {
    pub name: Arc<str>,
    /// Calls along the full traversal, the return leg included for linear buses.
    pub stop_count: usize,
    pub unique_stop_count: usize,
    /// Sum of road distances, overrides first and great-circle otherwise.
    pub road_length: Distance,
    /// Sum of great-circle distances over the same hops.
    pub geo_length: Distance,
    /// `road_length / geo_length`, or 1.0 when the geographic length is zero.
    pub curvature: f64,
}
