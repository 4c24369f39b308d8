//! Informed best-first search.
//!
//! Stale frontier entries are discarded at pop time instead of decreasing
//! keys: `enqueued` keeps the best known `(cost, heuristic)` per node and
//! `explored` the edge each node was settled through.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::{GraphError, Result};
use crate::graph::{EdgeId, Graph, Node, NodeId, NodeKey};
use crate::shortest_path::Path;

/// Frontier entry ordered by `priority`, then insertion order.
#[derive(Debug, Clone, Copy)]
struct Entry {
    priority: f64,
    seq: u64,
    node: NodeId,
    cost: f64,
    via: Option<EdgeId>,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .partial_cmp(&self.priority)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A* with no heuristic, which degrades to Dijkstra.
pub fn astar_path<N, E>(
    graph: &Graph<N, E>,
    source: impl NodeKey,
    target: impl NodeKey,
) -> Result<Path> {
    astar_path_with(graph, source, target, |_: &Node<N>, _: &Node<N>| 0.0)
}

/// A* guided by `heuristic(node, target)`, which should never overestimate
/// the remaining cost for the result to be optimal.
///
/// Fails with [`GraphError::Unreachable`] when the frontier empties before
/// the target is popped.
pub fn astar_path_with<N, E, H>(
    graph: &Graph<N, E>,
    source: impl NodeKey,
    target: impl NodeKey,
    heuristic: H,
) -> Result<Path>
where
    H: Fn(&Node<N>, &Node<N>) -> f64,
{
    let source = graph.require(source)?;
    let target = graph.require(target)?;
    let goal = graph.node(target).ok_or_else(|| GraphError::not_found(target))?;

    let estimate = |id: NodeId| graph.node(id).map(|n| heuristic(n, goal)).unwrap_or(0.0);

    let mut queue = BinaryHeap::new();
    let mut seq = 0u64;
    queue.push(Entry {
        priority: 0.0,
        seq,
        node: source,
        cost: 0.0,
        via: None,
    });

    let mut enqueued: FxHashMap<NodeId, (f64, f64)> = FxHashMap::default();
    let mut explored: FxHashMap<NodeId, Option<EdgeId>> = FxHashMap::default();

    while let Some(Entry {
        node, cost, via, ..
    }) = queue.pop()
    {
        if node == target {
            explored.insert(node, via);
            let path = reconstruct(graph, &explored, target);
            debug!(
                source = source.0,
                target = target.0,
                explored = explored.len(),
                cost = path.cost,
                "astar found path"
            );
            return Ok(path);
        }

        if let Some(parent) = explored.get(&node) {
            // The source is never re-expanded.
            if parent.is_none() {
                continue;
            }
            // A cheaper route to this node was queued after this entry.
            if enqueued.get(&node).is_some_and(|&(best, _)| best < cost) {
                continue;
            }
        }

        explored.insert(node, via);

        for (next, edge) in graph.arcs(node) {
            let next_cost = cost + edge.weight();
            let h = match enqueued.get(&next) {
                Some(&(queued_cost, _)) if queued_cost <= next_cost => continue,
                Some(&(_, h)) => h,
                None => estimate(next),
            };
            enqueued.insert(next, (next_cost, h));
            seq += 1;
            queue.push(Entry {
                priority: next_cost + h,
                seq,
                node: next,
                cost: next_cost,
                via: Some(edge.id()),
            });
        }
    }

    Err(GraphError::Unreachable {
        from: graph.name_of(source),
        to: graph.name_of(target),
    })
}

fn reconstruct<N, E>(
    graph: &Graph<N, E>,
    explored: &FxHashMap<NodeId, Option<EdgeId>>,
    target: NodeId,
) -> Path {
    let mut nodes = vec![target];
    let mut edges = Vec::new();
    let mut cost = 0.0;
    let mut current = target;

    while let Some(edge) = explored
        .get(&current)
        .copied()
        .flatten()
        .and_then(|id| graph.edge(id))
    {
        let Some(parent) = edge.opposite(current) else {
            break;
        };
        cost += edge.weight();
        edges.push(edge.id());
        nodes.push(parent);
        current = parent;
        if edges.len() > graph.node_count() {
            break;
        }
    }

    nodes.reverse();
    edges.reverse();
    Path { nodes, edges, cost }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphConfig;
    use crate::shortest_path::{shortest_path, ShortestPathMethod};

    type Cell = (usize, usize);

    const GRID_OPEN: &[&[u8]] = &[&[0, 0, 0, 0], &[0, 1, 1, 0], &[0, 0, 0, 0], &[0, 1, 0, 0]];
    const GRID_WALLED: &[&[u8]] = &[&[0, 1, 0], &[1, 1, 0], &[0, 0, 0]];

    fn cell(i: usize, j: usize) -> String {
        format!("({}, {})", i, j)
    }

    /// One node per cell, unit edges from each free cell to its free
    /// up/down/left/right neighbors.
    fn make_grid(rows: &[&[u8]], config: GraphConfig) -> Graph<Cell> {
        let mut g = Graph::with_config(config);
        for (i, row) in rows.iter().enumerate() {
            for j in 0..row.len() {
                g.add_node_with(cell(i, j), (i, j));
            }
        }
        let free = |i: usize, j: usize| rows[i][j] == 0;
        for (i, row) in rows.iter().enumerate() {
            for j in 0..row.len() {
                if !free(i, j) {
                    continue;
                }
                if i > 0 && free(i - 1, j) {
                    g.add_edge(cell(i, j), cell(i - 1, j), 1.0);
                }
                if i + 1 < rows.len() && free(i + 1, j) {
                    g.add_edge(cell(i, j), cell(i + 1, j), 1.0);
                }
                if j > 0 && free(i, j - 1) {
                    g.add_edge(cell(i, j), cell(i, j - 1), 1.0);
                }
                if j + 1 < row.len() && free(i, j + 1) {
                    g.add_edge(cell(i, j), cell(i, j + 1), 1.0);
                }
            }
        }
        g
    }

    fn manhattan(a: &Node<Cell>, b: &Node<Cell>) -> f64 {
        let (ai, aj) = *a.data();
        let (bi, bj) = *b.data();
        (ai.abs_diff(bi) + aj.abs_diff(bj)) as f64
    }

    #[test]
    fn test_astar_grid_directed() {
        let g = make_grid(GRID_OPEN, GraphConfig::directed());
        let path = astar_path(&g, cell(0, 0), cell(3, 3)).unwrap();
        assert_eq!(path.nodes.len(), 7);
        let names = path.names(&g);
        assert_eq!(names.first().unwrap(), "(0, 0)");
        assert_eq!(names.last().unwrap(), "(3, 3)");
        assert_eq!(path.cost, 6.0);
    }

    #[test]
    fn test_astar_grid_undirected() {
        let g = make_grid(GRID_OPEN, GraphConfig::undirected());
        let path = astar_path_with(&g, cell(0, 0), cell(3, 3), manhattan).unwrap();
        assert_eq!(path.nodes.len(), 7);
        assert_eq!(path.source(), g.resolve(cell(0, 0)));
        assert_eq!(path.target(), g.resolve(cell(3, 3)));
    }

    #[test]
    fn test_astar_grid_unreachable() {
        for config in [GraphConfig::directed(), GraphConfig::undirected()] {
            let g = make_grid(GRID_WALLED, config);
            let err = astar_path(&g, cell(0, 0), cell(2, 2)).unwrap_err();
            assert_eq!(
                err,
                GraphError::Unreachable {
                    from: "(0, 0)".into(),
                    to: "(2, 2)".into(),
                }
            );
        }
    }

    #[test]
    fn test_astar_heuristic_same_cost() {
        let g = make_grid(GRID_OPEN, GraphConfig::directed());
        let plain = astar_path(&g, cell(3, 0), cell(0, 3)).unwrap();
        let guided = astar_path_with(&g, cell(3, 0), cell(0, 3), manhattan).unwrap();
        assert_eq!(plain.cost, guided.cost);
        assert_eq!(plain.nodes.len(), guided.nodes.len());
    }

    #[test]
    fn test_astar_matches_dijkstra() {
        let mut g: Graph = Graph::new();
        for i in 0..8 {
            g.add_node(i.to_string());
        }
        let arcs = [
            (0, 1, 4.0),
            (0, 2, 1.0),
            (2, 1, 2.0),
            (1, 3, 1.0),
            (2, 3, 5.0),
            (3, 4, 3.0),
            (4, 5, 1.0),
            (3, 5, 6.0),
            (5, 6, 2.0),
            (2, 6, 12.0),
            (6, 7, 1.0),
        ];
        for (s, t, w) in arcs {
            g.add_edge(NodeId(s), NodeId(t), w);
        }
        for target in 1..8 {
            let a = astar_path(&g, NodeId(0), NodeId(target)).unwrap();
            let d = shortest_path(&g, NodeId(0), NodeId(target), ShortestPathMethod::Dijkstra)
                .unwrap()
                .unwrap();
            assert_eq!(a.cost, d.cost, "target {target}");
        }
    }

    #[test]
    fn test_astar_source_is_target() {
        let g = make_grid(GRID_OPEN, GraphConfig::directed());
        let path = astar_path(&g, cell(2, 2), cell(2, 2)).unwrap();
        assert_eq!(path.nodes.len(), 1);
        assert!(path.edges.is_empty());
    }

    #[test]
    fn test_astar_unknown_node() {
        let g = make_grid(GRID_OPEN, GraphConfig::directed());
        let err = astar_path(&g, cell(0, 0), cell(9, 9)).unwrap_err();
        assert!(matches!(err, GraphError::NodeNotFound { .. }));
    }

    #[test]
    fn test_astar_path_edges_connect_nodes() {
        let g = make_grid(GRID_OPEN, GraphConfig::undirected());
        let path = astar_path(&g, cell(3, 0), cell(3, 3)).unwrap();
        assert_eq!(path.edges.len() + 1, path.nodes.len());
        for (pair, edge) in path.nodes.windows(2).zip(&path.edges) {
            let e = g.edge(*edge).unwrap();
            assert_eq!(e.opposite(pair[0]), Some(pair[1]));
        }
    }
}
