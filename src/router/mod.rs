pub mod graph;
pub mod itinerary;
pub mod table;

pub use graph::*;
pub use itinerary::*;
pub use table::*;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    repository::Repository,
    shared::time::{Duration, Speed},
};

#[derive(Error, Debug)]
pub enum Error {
    #[error("Stop name {0:?} does not match any entry")]
    UnknownStop(String),
    #[error("Stop id {0} does not match any entry")]
    UnknownStopId(u32),
    #[error("Bus id {0} does not match any entry")]
    UnknownBus(u32),
    #[error("Stop ids must run from zero without gaps, expected {expected} but found {found}")]
    SparseStopIds { expected: u32, found: u32 },
    #[error("Invalid routing settings: {0}")]
    InvalidSettings(String),
    #[error("Routing table has no usable path from {from} to {to}")]
    BrokenTable { from: VertexId, to: VertexId },
    #[error("Routing state does not fit the network: {0}")]
    Inconsistent(String),
}

/// Bus speed and the wait paid every time a bus is boarded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoutingSettings {
    pub bus_velocity_kmh: f64,
    pub bus_wait_minutes: f64,
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self {
            bus_velocity_kmh: 40.0,
            bus_wait_minutes: 6.0,
        }
    }
}

impl RoutingSettings {
    pub fn new(bus_velocity_kmh: f64, bus_wait_minutes: f64) -> Self {
        Self {
            bus_velocity_kmh,
            bus_wait_minutes,
        }
    }

    pub fn validate(&self) -> Result<(), self::Error> {
        if !self.bus_velocity_kmh.is_finite() || self.bus_velocity_kmh <= 0.0 {
            return Err(self::Error::InvalidSettings(format!(
                "bus velocity must be positive, got {}",
                self.bus_velocity_kmh
            )));
        }
        if !self.bus_wait_minutes.is_finite() || self.bus_wait_minutes < 0.0 {
            return Err(self::Error::InvalidSettings(format!(
                "bus wait time must not be negative, got {}",
                self.bus_wait_minutes
            )));
        }
        Ok(())
    }

    pub fn speed(&self) -> Speed {
        Speed::from_kmh(self.bus_velocity_kmh)
    }

    pub fn wait_time(&self) -> Duration {
        Duration::from_minutes(self.bus_wait_minutes)
    }
}

/// Everything a ready router computed, detached from the repository it was built for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingState {
    pub settings: RoutingSettings,
    pub graph: Graph,
    pub table: RoutingTable,
}

impl RoutingState {
    /// Checks that the state was computed for a network shaped like `repository`:
    /// one vertex per stop, known buses on every edge and a full table over the graph.
    pub fn validate(&self, repository: &Repository) -> Result<(), self::Error> {
        self.settings.validate()?;
        check_dense_ids(repository)?;
        self.graph
            .validate(repository.all_stops().len())
            .map_err(self::Error::Inconsistent)?;
        if let Some(edge) = self
            .graph
            .edges()
            .iter()
            .find(|edge| repository.bus_by_id(edge.weight.bus_id).is_none())
        {
            return Err(self::Error::UnknownBus(edge.weight.bus_id));
        }
        self.table
            .validate(&self.graph)
            .map_err(self::Error::Inconsistent)
    }
}

#[derive(Debug, Default)]
enum Stage {
    #[default]
    Uninitialized,
    Built(Graph),
    Ready(Arc<RoutingState>),
}

/// Answers itinerary queries over a repository.
///
/// Moves from uninitialized to built (graph) to ready (graph and table). A ready
/// router only reads its state, so `route` can be shared between threads.
#[derive(Debug)]
pub struct Router<'a> {
    repository: &'a Repository,
    settings: RoutingSettings,
    stage: Stage,
}

impl<'a> Router<'a> {
    pub fn new(repository: &'a Repository) -> Self {
        Self {
            repository,
            settings: RoutingSettings::default(),
            stage: Stage::Uninitialized,
        }
    }

    /// Replaces the settings. Anything computed with the old ones is dropped.
    pub fn with_settings(mut self, settings: RoutingSettings) -> Self {
        self.set_settings(settings);
        self
    }

    pub fn set_settings(&mut self, settings: RoutingSettings) {
        self.settings = settings;
        self.reset();
    }

    pub fn settings(&self) -> &RoutingSettings {
        &self.settings
    }

    /// Takes a previously exported state without recomputing anything.
    /// The state is checked against the repository first and rejected whole if it does not fit.
    pub fn restore(repository: &'a Repository, state: RoutingState) -> Result<Self, self::Error> {
        state.validate(repository)?;
        Ok(Self::from_validated(repository, Arc::new(state)))
    }

    /// A ready router over a state already validated against `repository`.
    pub(crate) fn from_validated(repository: &'a Repository, state: Arc<RoutingState>) -> Self {
        info!(
            vertices = state.graph.vertex_count(),
            edges = state.graph.edge_count(),
            "Restored routing state"
        );
        Self {
            repository,
            settings: state.settings,
            stage: Stage::Ready(state),
        }
    }

    /// The catalogue this router answers for.
    pub fn repository(&self) -> &'a Repository {
        self.repository
    }

    /// Builds the route graph if there is none yet.
    pub fn build(&mut self) -> Result<(), self::Error> {
        if let Stage::Uninitialized = self.stage {
            let graph = GraphBuilder::new(self.repository, &self.settings).build()?;
            self.stage = Stage::Built(graph);
        }
        Ok(())
    }

    /// Fills the all-pairs table, building the graph first when needed.
    pub fn precompute(&mut self) -> Result<(), self::Error> {
        self.build()?;
        self.stage = match std::mem::take(&mut self.stage) {
            Stage::Built(graph) => {
                let table = RoutingTable::build(&graph);
                info!(
                    vertices = table.vertex_count(),
                    reachable = table.reachable_pairs(),
                    "Precomputed routing table"
                );
                Stage::Ready(Arc::new(RoutingState {
                    settings: self.settings,
                    graph,
                    table,
                }))
            }
            stage => stage,
        };
        Ok(())
    }

    /// Drops the graph and table.
    pub fn reset(&mut self) {
        self.stage = Stage::Uninitialized;
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.stage, Stage::Ready(..))
    }

    pub fn graph(&self) -> Option<&Graph> {
        match &self.stage {
            Stage::Uninitialized => None,
            Stage::Built(graph) => Some(graph),
            Stage::Ready(state) => Some(&state.graph),
        }
    }

    pub fn table(&self) -> Option<&RoutingTable> {
        match &self.stage {
            Stage::Ready(state) => Some(&state.table),
            _ => None,
        }
    }

    /// A copy of the computed state, None until the router is ready.
    pub fn export_state(&self) -> Option<RoutingState> {
        match &self.stage {
            Stage::Ready(state) => Some(RoutingState::clone(state)),
            _ => None,
        }
    }

    /// Fastest itinerary between two stops, precomputing first if needed.
    /// `Ok(None)` means both stops exist but no bus connects them.
    pub fn find_route(&mut self, from: &str, to: &str) -> Result<Option<Route>, self::Error> {
        self.vertex(from)?;
        self.vertex(to)?;
        if !self.is_ready() {
            self.precompute()?;
        }
        self.route(from, to)
    }

    /// Fastest itinerary on a ready router. Never touches shared state.
    pub fn route(&self, from: &str, to: &str) -> Result<Option<Route>, self::Error> {
        let from_vertex = self.vertex(from)?;
        let to_vertex = self.vertex(to)?;
        let Stage::Ready(state) = &self.stage else {
            warn!(from, to, "Route requested before the routing table exists");
            return Ok(None);
        };
        let graph = &state.graph;

        let Some((total_time, edges)) = state.table.path(graph, from_vertex, to_vertex)? else {
            debug!(from, to, "No route");
            return Ok(None);
        };

        let wait = self.settings.wait_time();
        let mut items = Vec::with_capacity(edges.len() * 2);
        for edge_id in edges {
            let edge = graph
                .edge(edge_id)
                .ok_or(self::Error::BrokenTable {
                    from: from_vertex,
                    to: to_vertex,
                })?;
            let board = self.stop_name(edge.from)?;
            let alight = self.stop_name(edge.to)?;
            let bus = self
                .repository
                .bus_by_id(edge.weight.bus_id)
                .ok_or(self::Error::UnknownBus(edge.weight.bus_id))?;
            items.push(RouteItem::Wait {
                stop: board.clone(),
                time: wait,
            });
            items.push(RouteItem::Bus {
                bus: bus.name.clone(),
                from: board,
                to: alight,
                span_count: edge.weight.span_count,
                time: edge.weight.total_time - wait,
            });
        }
        debug!(from, to, %total_time, items = items.len(), "Found route");
        Ok(Some(Route { total_time, items }))
    }

    fn vertex(&self, name: &str) -> Result<VertexId, self::Error> {
        self.repository
            .stop_by_name(name)
            .map(|stop| stop.id)
            .ok_or_else(|| self::Error::UnknownStop(name.to_string()))
    }

    fn stop_name(&self, vertex: VertexId) -> Result<Arc<str>, self::Error> {
        self.repository
            .stop_by_id(vertex)
            .map(|stop| stop.name.clone())
            .ok_or(self::Error::UnknownStopId(vertex))
    }
}

/// Vertex ids are stop ids, so stops must be numbered 0..n in insertion order.
pub(crate) fn check_dense_ids(repository: &Repository) -> Result<(), self::Error> {
    match repository
        .all_stops()
        .iter()
        .enumerate()
        .find(|(index, stop)| stop.id as usize != *index)
    {
        Some((index, stop)) => Err(self::Error::SparseStopIds {
            expected: index as u32,
            found: stop.id,
        }),
        None => Ok(()),
    }
}
