use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    repository::{Bus, Repository},
    router::{Error, RoutingSettings, check_dense_ids},
    shared::time::Duration,
};

pub type VertexId = u32;
pub type EdgeId = u32;

/// Cost of riding one edge: the wait for the bus plus the ride itself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeWeight {
    pub total_time: Duration,
    /// Number of stop-to-stop hops covered without leaving the bus.
    pub span_count: u32,
    pub bus_id: u32,
}

/// Board at `from`, ride without changing vehicle, alight at `to`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub from: VertexId,
    pub to: VertexId,
    pub weight: EdgeWeight,
}

/// Directed weighted graph with one vertex per stop.
/// Edge ids are positions in emission order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    edges: Vec<Edge>,
    incidence: Vec<Vec<EdgeId>>,
}

impl Graph {
    pub fn new(vertex_count: usize) -> Self {
        Self {
            edges: Vec::new(),
            incidence: vec![Vec::new(); vertex_count],
        }
    }

    pub fn add_edge(&mut self, edge: Edge) -> EdgeId {
        let id = self.edges.len() as EdgeId;
        self.incidence[edge.from as usize].push(id);
        self.edges.push(edge);
        id
    }

    pub fn vertex_count(&self) -> usize {
        self.incidence.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id as usize)
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Outgoing edge ids of a vertex, in emission order.
    pub fn incident_edges(&self, vertex: VertexId) -> &[EdgeId] {
        self.incidence
            .get(vertex as usize)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Checks that the graph is internally consistent and fits a network of
    /// `vertex_count` stops.
    pub(crate) fn validate(&self, vertex_count: usize) -> Result<(), String> {
        if self.vertex_count() != vertex_count {
            return Err(format!(
                "graph has {} vertices but the network has {vertex_count} stops",
                self.vertex_count()
            ));
        }
        for (id, edge) in self.edges.iter().enumerate() {
            if edge.from as usize >= vertex_count || edge.to as usize >= vertex_count {
                return Err(format!("edge {id} leaves the vertex range"));
            }
            let total_time = edge.weight.total_time.as_minutes();
            if !total_time.is_finite() || total_time < 0.0 {
                return Err(format!("edge {id} has weight {total_time}"));
            }
        }
        let mut listed = 0;
        for (vertex, edge_ids) in self.incidence.iter().enumerate() {
            for edge_id in edge_ids {
                match self.edges.get(*edge_id as usize) {
                    Some(edge) if edge.from as usize == vertex => listed += 1,
                    _ => return Err(format!("vertex {vertex} lists foreign edge {edge_id}")),
                }
            }
        }
        if listed != self.edges.len() {
            return Err("incidence lists do not cover every edge".into());
        }
        Ok(())
    }
}

/// Turns the buses of a repository into ride edges.
///
/// Every bus contributes one edge for each ordered pair of calls (i, j), i before j,
/// along its full traversal. That is O(n²) edges for a bus with n calls, but a whole
/// ride on one bus becomes a single hop, so staying aboard never pays the wait twice
/// while every change of bus does.
pub struct GraphBuilder<'a> {
    repository: &'a Repository,
    settings: &'a RoutingSettings,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(repository: &'a Repository, settings: &'a RoutingSettings) -> Self {
        Self {
            repository,
            settings,
        }
    }

    pub fn build(self) -> Result<Graph, Error> {
        self.settings.validate()?;
        check_dense_ids(self.repository)?;
        let stops = self.repository.all_stops();

        let mut graph = Graph::new(stops.len());
        let wait = self.settings.wait_time();
        for bus in self.repository.all_buses() {
            let trace = self.trace(bus)?;
            let before = graph.edge_count();
            for (i, (from, _)) in trace.iter().enumerate() {
                let mut ride = Duration::default();
                for (span, (to, hop)) in trace.iter().enumerate().skip(i + 1) {
                    ride += *hop;
                    graph.add_edge(Edge {
                        from: *from,
                        to: *to,
                        weight: EdgeWeight {
                            total_time: wait + ride,
                            span_count: (span - i) as u32,
                            bus_id: bus.id,
                        },
                    });
                }
            }
            debug!(
                bus = %bus.name,
                calls = trace.len(),
                edges = graph.edge_count() - before,
                "Traced bus"
            );
        }
        info!(
            vertices = graph.vertex_count(),
            edges = graph.edge_count(),
            "Built route graph"
        );
        Ok(graph)
    }

    /// Calls of a bus in riding order, each paired with the ride time from the previous call.
    fn trace(&self, bus: &Bus) -> Result<Vec<(VertexId, Duration)>, Error> {
        let speed = self.settings.speed();
        let mut trace: Vec<(VertexId, Duration)> = Vec::with_capacity(bus.stops.len() * 2);
        let mut previous = None;
        for stop_id in bus.traversal() {
            let stop = self
                .repository
                .stop_by_id(stop_id)
                .ok_or(Error::UnknownStopId(stop_id))?;
            let hop = previous
                .map(|previous| speed.travel_time(self.repository.road_distance(previous, stop)))
                .unwrap_or_default();
            trace.push((stop.id, hop));
            previous = Some(stop);
        }
        Ok(trace)
    }
}
