use std::{
    collections::{BTreeSet, HashMap, HashSet},
    sync::Arc,
};

mod entities;
pub use entities::*;
use thiserror::Error;
use tracing::debug;

use crate::shared::geo::{Coordinate, Distance};

type NameToIndex = HashMap<Arc<str>, usize>;
type IdToIndex = HashMap<u32, usize>;
type IdToIds = HashMap<u32, Vec<u32>>;
type StopPair = (u32, u32);

#[derive(Error, Debug)]
pub enum Error {
    #[error("Stop name {0:?} does not match any entry")]
    UnknownStop(String),
    #[error("Stop id {0} does not match any entry")]
    UnknownStopId(u32),
}

/// Owns every stop and bus of the network together with the road distance overrides.
///
/// Stops and buses live in insertion-ordered arenas; everything else refers to them by id.
#[derive(Debug, Clone, Default)]
pub struct Repository {
    stops: Vec<Stop>,
    buses: Vec<Bus>,

    stop_lookup: NameToIndex,
    stop_id_lookup: IdToIndex,
    bus_lookup: NameToIndex,
    bus_id_lookup: IdToIndex,
    stop_to_buses: IdToIds,
    distances: HashMap<StopPair, u32>,

    next_stop_id: u32,
    next_bus_id: u32,
}

impl Repository {
    pub fn new() -> Self {
        Default::default()
    }

    /// Adds a stop under the next free id and returns that id.
    /// Name uniqueness is the caller's responsibility, a repeated name shadows the earlier stop.
    pub fn add_stop(&mut self, name: &str, coordinate: Coordinate) -> u32 {
        let id = self.next_stop_id.max(self.stops.len() as u32);
        self.add_stop_with_id(id, name, coordinate);
        id
    }

    /// Adds a stop under an explicit id, used when restoring a saved catalogue.
    pub fn add_stop_with_id(&mut self, id: u32, name: &str, coordinate: Coordinate) {
        let stop = Stop {
            id,
            name: name.into(),
            coordinate,
        };
        let index = self.stops.len();
        self.stop_lookup.insert(stop.name.clone(), index);
        self.stop_id_lookup.insert(id, index);
        self.stops.push(stop);
        self.next_stop_id = self.next_stop_id.max(id.saturating_add(1));
    }

    /// Adds a bus under the next free id and returns that id.
    /// Fails without touching the repository if any stop name is unknown.
    pub fn add_bus<S: AsRef<str>>(
        &mut self,
        name: &str,
        kind: BusKind,
        stop_names: &[S],
    ) -> Result<u32, self::Error> {
        let id = self.next_bus_id.max(self.buses.len() as u32);
        self.add_bus_with_id(id, name, kind, stop_names)?;
        Ok(id)
    }

    pub fn add_bus_with_id<S: AsRef<str>>(
        &mut self,
        id: u32,
        name: &str,
        kind: BusKind,
        stop_names: &[S],
    ) -> Result<(), self::Error> {
        // Resolve everything up front so a bad name leaves no trace
        let stops: Vec<u32> = stop_names
            .iter()
            .map(|name| {
                self.stop_by_name(name.as_ref())
                    .map(|stop| stop.id)
                    .ok_or_else(|| self::Error::UnknownStop(name.as_ref().to_string()))
            })
            .collect::<Result<_, _>>()?;

        self.insert_bus(id, name, kind, stops);
        Ok(())
    }

    /// Adds a bus whose stops are given by id, used when restoring a saved catalogue.
    pub fn add_bus_with_stop_ids(
        &mut self,
        id: u32,
        name: &str,
        kind: BusKind,
        stop_ids: &[u32],
    ) -> Result<(), self::Error> {
        if let Some(stop_id) = stop_ids.iter().find(|id| self.stop_by_id(**id).is_none()) {
            return Err(self::Error::UnknownStopId(*stop_id));
        }
        self.insert_bus(id, name, kind, stop_ids.to_vec());
        Ok(())
    }

    fn insert_bus(&mut self, id: u32, name: &str, kind: BusKind, stops: Vec<u32>) {
        for stop_id in stops.iter() {
            let buses = self.stop_to_buses.entry(*stop_id).or_default();
            if !buses.contains(&id) {
                buses.push(id);
            }
        }

        let bus = Bus {
            id,
            name: name.into(),
            kind,
            stops: stops.into(),
        };
        debug!(bus = %bus.name, id, stops = bus.stops.len(), "Added bus");
        let index = self.buses.len();
        self.bus_lookup.insert(bus.name.clone(), index);
        self.bus_id_lookup.insert(id, index);
        self.buses.push(bus);
        self.next_bus_id = self.next_bus_id.max(id.saturating_add(1));
    }

    /// Sets the road distance from one stop to another, replacing any earlier value
    /// for the same direction. The opposite direction is left alone.
    pub fn set_distance(&mut self, from: &str, to: &str, meters: u32) -> Result<(), self::Error> {
        let from = self
            .stop_by_name(from)
            .ok_or_else(|| self::Error::UnknownStop(from.to_string()))?
            .id;
        let to = self
            .stop_by_name(to)
            .ok_or_else(|| self::Error::UnknownStop(to.to_string()))?
            .id;
        self.distances.insert((from, to), meters);
        Ok(())
    }

    pub fn set_distance_by_id(&mut self, from: u32, to: u32, meters: u32) -> Result<(), self::Error> {
        if self.stop_by_id(from).is_none() {
            return Err(self::Error::UnknownStopId(from));
        }
        if self.stop_by_id(to).is_none() {
            return Err(self::Error::UnknownStopId(to));
        }
        self.distances.insert((from, to), meters);
        Ok(())
    }

    /// Get a stop with the given name.
    /// If no stop is found with the given name None is returned.
    pub fn stop_by_name(&self, name: &str) -> Option<&Stop> {
        let index = self.stop_lookup.get(name)?;
        Some(&self.stops[*index])
    }

    pub fn stop_by_id(&self, id: u32) -> Option<&Stop> {
        let index = self.stop_id_lookup.get(&id)?;
        Some(&self.stops[*index])
    }

    pub fn bus_by_name(&self, name: &str) -> Option<&Bus> {
        let index = self.bus_lookup.get(name)?;
        Some(&self.buses[*index])
    }

    pub fn bus_by_id(&self, id: u32) -> Option<&Bus> {
        let index = self.bus_id_lookup.get(&id)?;
        Some(&self.buses[*index])
    }

    /// All stops in insertion order.
    pub fn all_stops(&self) -> &[Stop] {
        &self.stops
    }

    /// All buses in insertion order.
    pub fn all_buses(&self) -> &[Bus] {
        &self.buses
    }

    /// Returns the override for `from -> to`, falling back to `to -> from`.
    /// Zero means neither direction is set; geometry is not consulted here.
    /// None if either stop is unknown.
    pub fn distance(&self, from: &str, to: &str) -> Option<u32> {
        let from = self.stop_by_name(from)?;
        let to = self.stop_by_name(to)?;
        Some(self.distance_by_id(from.id, to.id))
    }

    pub fn distance_by_id(&self, from: u32, to: u32) -> u32 {
        self.distances
            .get(&(from, to))
            .or_else(|| self.distances.get(&(to, from)))
            .copied()
            .unwrap_or(0)
    }

    /// Distance a bus covers between two stops: the override if one is set,
    /// otherwise the great-circle distance between their coordinates.
    pub fn road_distance(&self, from: &Stop, to: &Stop) -> Distance {
        match self.distance_by_id(from.id, to.id) {
            0 => from.coordinate.great_circle_distance(&to.coordinate),
            meters => meters.into(),
        }
    }

    /// Every override as `(from, to, meters)`, ordered by stop ids.
    pub fn distances(&self) -> Vec<(u32, u32, u32)> {
        let mut distances: Vec<_> = self
            .distances
            .iter()
            .map(|((from, to), meters)| (*from, *to, *meters))
            .collect();
        distances.sort_unstable();
        distances
    }

    /// Statistics for the bus with the given name, None if there is no such bus.
    pub fn bus_info(&self, name: &str) -> Option<BusInfo> {
        let bus = self.bus_by_name(name)?;
        let calls: Vec<&Stop> = bus
            .traversal()
            .filter_map(|stop_id| self.stop_by_id(stop_id))
            .collect();

        let (road_length, geo_length) = calls.windows(2).fold(
            (Distance::default(), Distance::default()),
            |(road, geo), hop| {
                let (from, to) = (hop[0], hop[1]);
                (
                    road + self.road_distance(from, to),
                    geo + from.coordinate.great_circle_distance(&to.coordinate),
                )
            },
        );

        let unique_stop_count = bus.stops.iter().collect::<HashSet<_>>().len();
        // A linear bus over a single repeated stop never leaves it
        let stop_count = match (bus.kind, &bus.stops[..]) {
            (BusKind::Linear, [first, last]) if first == last => 1,
            _ => calls.len(),
        };
        let curvature = if geo_length.is_zero() {
            1.0
        } else {
            road_length / geo_length
        };

        Some(BusInfo {
            name: bus.name.clone(),
            stop_count,
            unique_stop_count,
            road_length,
            geo_length,
            curvature,
        })
    }

    /// Names of the buses calling at the stop, sorted.
    /// None if the stop is unknown, empty if no bus calls there.
    pub fn buses_at_stop(&self, name: &str) -> Option<BTreeSet<&str>> {
        let stop = self.stop_by_name(name)?;
        Some(
            self.stop_to_buses
                .get(&stop.id)
                .map(|bus_ids| {
                    bus_ids
                        .iter()
                        .filter_map(|bus_id| self.bus_by_id(*bus_id))
                        .map(|bus| bus.name.as_ref())
                        .collect()
                })
                .unwrap_or_default(),
        )
    }
}
