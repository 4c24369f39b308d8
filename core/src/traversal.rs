use std::collections::VecDeque;

use rustc_hash::FxHashSet;
use tracing::debug;

use crate::error::Result;
use crate::graph::{Graph, Node, NodeId, NodeKey, TraversalDirection};

/// Order in which the frontier is drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frontier {
    /// Queue: breadth-first.
    Fifo,
    /// Stack: depth-first.
    Lifo,
}

/// Neighbors of `node` along `direction`, sorted by id so traversal order
/// is reproducible.
fn iter_neighbors<N, E>(
    graph: &Graph<N, E>,
    node: NodeId,
    direction: TraversalDirection,
) -> impl Iterator<Item = NodeId> {
    let mut neighbors: Vec<NodeId> = graph.adjacent(node, direction).into_iter().collect();
    neighbors.sort_unstable();
    neighbors.into_iter()
}

/// Breadth-first reachability from `start` over the `Neighbors` relation.
///
/// Returns the nodes in visitation order, `start` first.
pub fn bfs<N, E>(graph: &Graph<N, E>, start: impl NodeKey) -> Result<Vec<NodeId>> {
    bfs_with(graph, start, TraversalDirection::Both, |_| {})
}

/// Breadth-first traversal calling `visitor` exactly once per reached node.
pub fn bfs_with<N, E, F>(
    graph: &Graph<N, E>,
    start: impl NodeKey,
    direction: TraversalDirection,
    visitor: F,
) -> Result<Vec<NodeId>>
where
    F: FnMut(&Node<N>),
{
    walk(graph, start, direction, Frontier::Fifo, visitor)
}

/// Depth-first reachability from `start` over the `Neighbors` relation.
pub fn dfs<N, E>(graph: &Graph<N, E>, start: impl NodeKey) -> Result<Vec<NodeId>> {
    dfs_with(graph, start, TraversalDirection::Both, |_| {})
}

/// Depth-first traversal calling `visitor` exactly once per reached node.
pub fn dfs_with<N, E, F>(
    graph: &Graph<N, E>,
    start: impl NodeKey,
    direction: TraversalDirection,
    visitor: F,
) -> Result<Vec<NodeId>>
where
    F: FnMut(&Node<N>),
{
    walk(graph, start, direction, Frontier::Lifo, visitor)
}

/// Shared driver. Nodes are marked visited when taken off the frontier, so
/// a node pushed twice through different edges is still visited once.
fn walk<N, E, F>(
    graph: &Graph<N, E>,
    start: impl NodeKey,
    direction: TraversalDirection,
    frontier: Frontier,
    mut visitor: F,
) -> Result<Vec<NodeId>>
where
    F: FnMut(&Node<N>),
{
    let start = graph.require(start)?;

    let mut visited: FxHashSet<NodeId> = FxHashSet::default();
    let mut pending: VecDeque<NodeId> = VecDeque::new();
    let mut order = Vec::new();
    pending.push_back(start);

    loop {
        let next = match frontier {
            Frontier::Fifo => pending.pop_front(),
            Frontier::Lifo => pending.pop_back(),
        };
        let Some(current) = next else { break };

        if !visited.insert(current) {
            continue;
        }
        let Some(node) = graph.node(current) else {
            continue;
        };
        visitor(node);
        order.push(current);

        let unvisited = iter_neighbors(graph, current, direction).filter(|n| !visited.contains(n));
        match frontier {
            Frontier::Fifo => pending.extend(unvisited),
            // Reverse so the lowest id is popped first.
            Frontier::Lifo => {
                let mut batch: Vec<NodeId> = unvisited.collect();
                batch.reverse();
                pending.extend(batch);
            }
        }
    }

    debug!(start = start.0, visited = order.len(), ?frontier, "traversal complete");
    Ok(order)
}
