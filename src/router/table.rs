use std::{cmp::Ordering, collections::BinaryHeap};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    router::{
        Error,
        graph::{EdgeId, Graph, VertexId},
    },
    shared::time::Duration,
};

/// Best known way to reach a vertex from a given source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteEntry {
    pub weight: Duration,
    /// Last edge of the best path, None only for the source itself.
    pub prev_edge: Option<EdgeId>,
}

/// All-pairs shortest path table, one row per source vertex.
/// A None entry means the target cannot be reached from the source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutingTable {
    vertex_count: usize,
    entries: Vec<Option<RouteEntry>>,
}

#[derive(Copy, Clone)]
struct State {
    cost: Duration,
    vertex: VertexId,
}

// Min-heap by cost, reversed from the standard BinaryHeap; lower vertex first on ties
impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.vertex.cmp(&self.vertex))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for State {}

impl RoutingTable {
    /// Runs a single-source search from every vertex. Sources are independent,
    /// so they are spread across threads and gathered back in vertex order.
    pub fn build(graph: &Graph) -> Self {
        let vertex_count = graph.vertex_count();
        let rows: Vec<Vec<Option<RouteEntry>>> = (0..vertex_count as VertexId)
            .into_par_iter()
            .map(|source| shortest_paths(graph, source))
            .collect();
        Self {
            vertex_count,
            entries: rows.into_iter().flatten().collect(),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn entry(&self, from: VertexId, to: VertexId) -> Option<&RouteEntry> {
        if from as usize >= self.vertex_count || to as usize >= self.vertex_count {
            return None;
        }
        self.entries[flat_matrix(from as usize, to as usize, self.vertex_count)].as_ref()
    }

    /// Number of ordered pairs with a path, the diagonal included.
    pub fn reachable_pairs(&self) -> usize {
        self.entries.iter().filter(|entry| entry.is_some()).count()
    }

    /// Walks predecessor edges back from `to` and returns the path from `from` in riding order.
    /// None when `to` is unreachable.
    pub fn path(
        &self,
        graph: &Graph,
        from: VertexId,
        to: VertexId,
    ) -> Result<Option<(Duration, Vec<EdgeId>)>, Error> {
        let Some(target) = self.entry(from, to) else {
            return Ok(None);
        };
        let broken = || Error::BrokenTable { from, to };

        let mut edges = Vec::new();
        let mut current = to;
        while let Some(edge_id) = self.entry(from, current).ok_or_else(broken)?.prev_edge {
            // A path never repeats an edge
            if edges.len() >= graph.edge_count() {
                return Err(broken());
            }
            let edge = graph.edge(edge_id).ok_or_else(broken)?;
            edges.push(edge_id);
            current = edge.from;
        }
        if current != from {
            return Err(broken());
        }
        edges.reverse();
        Ok(Some((target.weight, edges)))
    }

    /// Checks that the table has one entry per ordered vertex pair of `graph`
    /// and that every predecessor edge exists and ends where it is recorded.
    pub(crate) fn validate(&self, graph: &Graph) -> Result<(), String> {
        let vertex_count = graph.vertex_count();
        if self.vertex_count != vertex_count {
            return Err(format!(
                "table covers {} vertices but the graph has {vertex_count}",
                self.vertex_count
            ));
        }
        if self.entries.len() != vertex_count * vertex_count {
            return Err(format!(
                "table holds {} entries, expected {}",
                self.entries.len(),
                vertex_count * vertex_count
            ));
        }
        for (index, entry) in self.entries.iter().enumerate() {
            let Some(entry) = entry else {
                continue;
            };
            let weight = entry.weight.as_minutes();
            if !weight.is_finite() || weight < 0.0 {
                return Err(format!("entry {index} has weight {weight}"));
            }
            let to = index % vertex_count;
            match entry.prev_edge.map(|edge_id| graph.edge(edge_id)) {
                None => {}
                Some(Some(edge)) if edge.to as usize == to => {}
                Some(_) => return Err(format!("entry {index} has a foreign predecessor")),
            }
        }
        Ok(())
    }
}

fn shortest_paths(graph: &Graph, source: VertexId) -> Vec<Option<RouteEntry>> {
    let mut row: Vec<Option<RouteEntry>> = vec![None; graph.vertex_count()];
    let mut settled = vec![false; graph.vertex_count()];
    let mut heap = BinaryHeap::new();

    row[source as usize] = Some(RouteEntry {
        weight: Duration::default(),
        prev_edge: None,
    });
    heap.push(State {
        cost: Duration::default(),
        vertex: source,
    });

    while let Some(State { cost, vertex }) = heap.pop() {
        if settled[vertex as usize] {
            continue;
        }
        settled[vertex as usize] = true;

        for edge_id in graph.incident_edges(vertex) {
            let Some(edge) = graph.edge(*edge_id) else {
                continue;
            };
            let next_cost = cost + edge.weight.total_time;
            // Only a strict improvement replaces, so the first edge to reach a weight keeps it
            let improves = row[edge.to as usize]
                .map(|best| next_cost < best.weight)
                .unwrap_or(true);
            if improves {
                row[edge.to as usize] = Some(RouteEntry {
                    weight: next_cost,
                    prev_edge: Some(*edge_id),
                });
                heap.push(State {
                    cost: next_cost,
                    vertex: edge.to,
                });
            }
        }
    }
    row
}

/// Converts a (row, column) coordinate into a flat index of a square matrix.
#[inline(always)]
pub(crate) fn flat_matrix(outer: usize, inner: usize, count: usize) -> usize {
    (outer * count) + inner
}
