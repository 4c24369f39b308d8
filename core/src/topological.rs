use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::error::{GraphError, Result};
use crate::graph::{Graph, Node, NodeId};

/// Number of arcs entering each node, parallel edges counted separately.
pub(crate) fn in_arc_counts<N, E>(graph: &Graph<N, E>) -> FxHashMap<NodeId, usize> {
    let mut indegree: FxHashMap<NodeId, usize> = graph.node_ids().map(|id| (id, 0)).collect();
    for id in graph.node_ids() {
        for (next, _) in graph.arcs(id) {
            *indegree.entry(next).or_default() += 1;
        }
    }
    indegree
}

/// Kahn's algorithm driven one generation at a time.
///
/// In-degrees are counted once, up front. Each release decrements the
/// in-degree of the released nodes' children as the graph stands at that
/// moment, so a visitor that mutates the graph sees its changes reflected
/// in later generations.
struct Kahn {
    indegree: FxHashMap<NodeId, usize>,
    visited: usize,
    generations: usize,
}

impl Kahn {
    fn new<N, E>(graph: &Graph<N, E>) -> (Self, Vec<NodeId>) {
        let indegree = in_arc_counts(graph);
        let mut roots: Vec<NodeId> = indegree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(&id, _)| id)
            .collect();
        roots.sort_unstable();

        let kahn = Self {
            indegree,
            visited: 0,
            generations: 0,
        };
        (kahn, roots)
    }

    /// Mark `generation` visited and return the nodes it frees.
    fn release<N, E>(&mut self, graph: &Graph<N, E>, generation: &[NodeId]) -> Vec<NodeId> {
        self.visited += generation.len();
        self.generations += 1;

        let mut next = Vec::new();
        for &id in generation {
            for (child, _) in graph.arcs(id) {
                if let Some(d) = self.indegree.get_mut(&child) {
                    if *d == 0 {
                        continue;
                    }
                    *d -= 1;
                    if *d == 0 {
                        next.push(child);
                    }
                }
            }
        }
        next.sort_unstable();
        next.dedup();
        trace!(generation = self.generations, freed = next.len(), "generation released");
        next
    }

    /// Nodes never released either sit on a cycle or were removed from
    /// the graph during the walk; the latter is reported first.
    fn finish<N, E>(self, graph: &Graph<N, E>) -> Result<()> {
        let vanished = self
            .indegree
            .iter()
            .filter(|(id, d)| **d > 0 && !graph.has_node(**id))
            .map(|(id, _)| *id)
            .min();
        if let Some(id) = vanished {
            debug!(node = id.0, "unreleased node removed during walk");
            return Err(GraphError::ConcurrentModification { node: id.0 });
        }

        let unresolved = self.indegree.len().saturating_sub(self.visited);
        if unresolved > 0 {
            debug!(unresolved, visited = self.visited, "cycle detected");
            return Err(GraphError::CycleDetected { unresolved });
        }
        debug!(
            nodes = self.visited,
            generations = self.generations,
            "topological sort complete"
        );
        Ok(())
    }
}

/// Nodes layered by generation: generation 0 has in-degree zero, each
/// later generation is freed by the ones before it. Order within a
/// generation is by id.
pub fn topological_generations<N, E>(graph: &Graph<N, E>) -> Result<Vec<Vec<NodeId>>> {
    let (mut kahn, mut current) = Kahn::new(graph);
    let mut generations = Vec::new();

    while !current.is_empty() {
        let next = kahn.release(graph, &current);
        generations.push(std::mem::replace(&mut current, next));
    }

    kahn.finish(graph)?;
    Ok(generations)
}

/// Visit every node after all of its predecessors. Returns the visitation
/// order.
///
/// Fails with [`GraphError::CycleDetected`] if some nodes never reach
/// in-degree zero. Nodes visited before the cycle was found have already
/// been passed to `visitor`.
pub fn topological_sort<N, E, F>(graph: &Graph<N, E>, mut visitor: F) -> Result<Vec<NodeId>>
where
    F: FnMut(&Node<N>),
{
    let (mut kahn, mut current) = Kahn::new(graph);
    let mut order = Vec::with_capacity(graph.node_count());

    while !current.is_empty() {
        for &id in &current {
            let node = graph
                .node(id)
                .ok_or(GraphError::ConcurrentModification { node: id.0 })?;
            visitor(node);
            order.push(id);
        }
        current = kahn.release(graph, &current);
    }

    kahn.finish(graph)?;
    Ok(order)
}

/// Like [`topological_sort`], but the visitor may mutate the graph.
///
/// Removing a node that is still waiting for its turn, or one already
/// visited in the current generation, fails the walk with
/// [`GraphError::ConcurrentModification`] rather than a cycle error.
pub fn topological_sort_mut<N, E, F>(
    graph: &mut Graph<N, E>,
    mut visitor: F,
) -> Result<Vec<NodeId>>
where
    F: FnMut(&mut Graph<N, E>, NodeId),
{
    let (mut kahn, mut current) = Kahn::new(graph);
    let mut order = Vec::with_capacity(graph.node_count());

    while !current.is_empty() {
        for &id in &current {
            if !graph.has_node(id) {
                return Err(GraphError::ConcurrentModification { node: id.0 });
            }
            visitor(graph, id);
            order.push(id);
        }
        if let Some(&gone) = current.iter().find(|id| !graph.has_node(**id)) {
            return Err(GraphError::ConcurrentModification { node: gone.0 });
        }
        current = kahn.release(graph, &current);
    }

    kahn.finish(graph)?;
    Ok(order)
}
