//! Single-source shortest paths: Dijkstra, Bellman-Ford and a randomized
//! bundle-based variant for undirected graphs, behind one dispatcher.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

use crate::error::{GraphError, Result};
use crate::graph::{EdgeId, Graph, NodeId, NodeKey};

/// Which algorithm computes the distances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShortestPathMethod {
    /// Bellman-Ford if any weight is negative, else Dijkstra when directed
    /// and the randomized method when undirected.
    #[default]
    Auto,
    Dijkstra,
    BellmanFord,
    Randomized,
}

impl ShortestPathMethod {
    pub fn name(self) -> &'static str {
        match self {
            ShortestPathMethod::Auto => "auto",
            ShortestPathMethod::Dijkstra => "dijkstra",
            ShortestPathMethod::BellmanFord => "bellman-ford",
            ShortestPathMethod::Randomized => "randomized",
        }
    }

    /// Concrete method `Auto` stands for on this graph.
    pub fn resolve<N, E>(self, graph: &Graph<N, E>) -> ShortestPathMethod {
        match self {
            ShortestPathMethod::Auto if graph.has_negative_weight() => {
                ShortestPathMethod::BellmanFord
            }
            ShortestPathMethod::Auto if graph.is_directed() => ShortestPathMethod::Dijkstra,
            ShortestPathMethod::Auto => ShortestPathMethod::Randomized,
            other => other,
        }
    }
}

/// Sampler settings for [`ShortestPathMethod::Randomized`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RandomizedConfig {
    /// Fixed seed for reproducible sampling; entropy-seeded when None.
    pub seed: Option<u64>,
}

/// A walk through the graph with its total weight.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub nodes: Vec<NodeId>,
    pub edges: Vec<EdgeId>,
    pub cost: f64,
}

impl Path {
    /// Number of edges.
    pub fn hops(&self) -> usize {
        self.edges.len()
    }

    pub fn source(&self) -> Option<NodeId> {
        self.nodes.first().copied()
    }

    pub fn target(&self) -> Option<NodeId> {
        self.nodes.last().copied()
    }

    /// Node names along the path.
    pub fn names<N, E>(&self, graph: &Graph<N, E>) -> Vec<String> {
        self.nodes.iter().map(|&id| graph.name_of(id)).collect()
    }
}

/// Rebuild a path by walking parent edges back from `target`.
///
/// `previous[v]` is the edge through which `v` was reached. Returns None if
/// the chain breaks or runs longer than the graph has nodes.
pub(crate) fn trace_back<N, E>(
    graph: &Graph<N, E>,
    previous: &FxHashMap<NodeId, EdgeId>,
    source: NodeId,
    target: NodeId,
) -> Option<Path> {
    let mut nodes = vec![target];
    let mut edges = Vec::new();
    let mut cost = 0.0;
    let mut current = target;

    while current != source {
        if edges.len() >= graph.node_count() {
            return None;
        }
        let edge = graph.edge(*previous.get(&current)?)?;
        current = edge.opposite(current)?;
        cost += edge.weight();
        edges.push(edge.id());
        nodes.push(current);
    }

    nodes.reverse();
    edges.reverse();
    Some(Path { nodes, edges, cost })
}

/// Distances and parent edges from one source.
#[derive(Debug, Clone)]
pub struct ShortestPaths {
    source: NodeId,
    target: Option<NodeId>,
    method: ShortestPathMethod,
    distance: FxHashMap<NodeId, f64>,
    previous: FxHashMap<NodeId, EdgeId>,
}

impl ShortestPaths {
    pub fn source(&self) -> NodeId {
        self.source
    }

    pub fn target(&self) -> Option<NodeId> {
        self.target
    }

    /// The concrete method that ran.
    pub fn method(&self) -> ShortestPathMethod {
        self.method
    }

    /// Best known distance, +inf if unreached. When a target was given the
    /// search may stop early, so only the target's distance is final.
    pub fn distance_to(&self, node: NodeId) -> f64 {
        self.distance.get(&node).copied().unwrap_or(f64::INFINITY)
    }

    pub fn is_reachable(&self, node: NodeId) -> bool {
        self.distance_to(node).is_finite()
    }

    pub fn previous_edge(&self, node: NodeId) -> Option<EdgeId> {
        self.previous.get(&node).copied()
    }

    /// Number of nodes with a finite distance.
    pub fn reached(&self) -> usize {
        self.distance.len()
    }

    pub fn path_to<N, E>(&self, graph: &Graph<N, E>, target: NodeId) -> Option<Path> {
        if !self.is_reachable(target) {
            return None;
        }
        trace_back(graph, &self.previous, self.source, target)
    }

    /// Path to the target the search was started with.
    pub fn path<N, E>(&self, graph: &Graph<N, E>) -> Option<Path> {
        self.target.and_then(|t| self.path_to(graph, t))
    }
}

/// Full shortest-path tree from `source`.
pub fn shortest_paths<N, E>(
    graph: &Graph<N, E>,
    source: impl NodeKey,
    method: ShortestPathMethod,
) -> Result<ShortestPaths> {
    let source = graph.require(source)?;
    solve(graph, source, None, method, &RandomizedConfig::default())
}

/// Shortest path from `source` to `target`, or None if unreachable.
pub fn shortest_path<N, E>(
    graph: &Graph<N, E>,
    source: impl NodeKey,
    target: impl NodeKey,
    method: ShortestPathMethod,
) -> Result<Option<Path>> {
    let source = graph.require(source)?;
    let target = graph.require(target)?;
    let tree = solve(graph, source, Some(target), method, &RandomizedConfig::default())?;
    Ok(tree.path(graph))
}

/// General entry point: optional target and explicit sampler settings.
pub fn shortest_paths_with<N, E>(
    graph: &Graph<N, E>,
    source: impl NodeKey,
    target: Option<NodeId>,
    method: ShortestPathMethod,
    config: &RandomizedConfig,
) -> Result<ShortestPaths> {
    let source = graph.require(source)?;
    if let Some(t) = target {
        graph.require(t)?;
    }
    solve(graph, source, target, method, config)
}

fn solve<N, E>(
    graph: &Graph<N, E>,
    source: NodeId,
    target: Option<NodeId>,
    method: ShortestPathMethod,
    config: &RandomizedConfig,
) -> Result<ShortestPaths> {
    let method = method.resolve(graph);
    debug!(
        source = source.0,
        target = target.map(|t| t.0),
        method = method.name(),
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "shortest path"
    );

    let (distance, previous) = match method {
        ShortestPathMethod::Dijkstra | ShortestPathMethod::Auto => dijkstra(graph, source, target),
        ShortestPathMethod::BellmanFord => bellman_ford(graph, source)?,
        ShortestPathMethod::Randomized => {
            if graph.is_directed() {
                return Err(GraphError::UnsupportedMethod {
                    method: method.name(),
                    reason: "requires an undirected graph",
                });
            }
            let partition = BundlePartition::build(graph, source, config);
            bundle_dijkstra(graph, source, target, &partition)
        }
    };

    Ok(ShortestPaths {
        source,
        target,
        method,
        distance,
        previous,
    })
}

/// Min-heap entry. Ties break on node id for a stable pop order.
#[derive(Copy, Clone, PartialEq)]
struct State {
    cost: f64,
    node: NodeId,
}

impl Eq for State {}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .partial_cmp(&self.cost)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Label-setting frontier with lazy deletion of stale heap entries.
struct Frontier {
    distance: FxHashMap<NodeId, f64>,
    previous: FxHashMap<NodeId, EdgeId>,
    settled: FxHashSet<NodeId>,
    heap: BinaryHeap<State>,
}

impl Frontier {
    fn new(source: NodeId) -> Self {
        let mut distance = FxHashMap::default();
        distance.insert(source, 0.0);
        let mut heap = BinaryHeap::new();
        heap.push(State {
            cost: 0.0,
            node: source,
        });
        Self {
            distance,
            previous: FxHashMap::default(),
            settled: FxHashSet::default(),
            heap,
        }
    }

    fn distance_to(&self, node: NodeId) -> f64 {
        self.distance.get(&node).copied().unwrap_or(f64::INFINITY)
    }

    /// Pop and settle the closest unsettled node.
    fn settle_next(&mut self) -> Option<(NodeId, f64)> {
        while let Some(State { cost, node }) = self.heap.pop() {
            if self.settled.contains(&node) || cost > self.distance_to(node) {
                continue;
            }
            self.settled.insert(node);
            return Some((node, cost));
        }
        None
    }

    fn relax(&mut self, from: NodeId, to: NodeId, edge: EdgeId, weight: f64) -> bool {
        if self.settled.contains(&to) {
            return false;
        }
        let Some(&base) = self.distance.get(&from) else {
            return false;
        };
        let candidate = base + weight;
        if candidate < self.distance_to(to) {
            self.distance.insert(to, candidate);
            self.previous.insert(to, edge);
            self.heap.push(State {
                cost: candidate,
                node: to,
            });
            return true;
        }
        false
    }

    fn relax_arcs<N, E>(&mut self, graph: &Graph<N, E>, node: NodeId) {
        for (next, edge) in graph.arcs(node) {
            self.relax(node, next, edge.id(), edge.weight());
        }
    }
}

type Tree = (FxHashMap<NodeId, f64>, FxHashMap<NodeId, EdgeId>);

/// Non-negative weights only; negative weights give wrong answers silently.
fn dijkstra<N, E>(graph: &Graph<N, E>, source: NodeId, target: Option<NodeId>) -> Tree {
    let mut frontier = Frontier::new(source);

    while let Some((node, _)) = frontier.settle_next() {
        if Some(node) == target {
            break;
        }
        frontier.relax_arcs(graph, node);
    }

    trace!(settled = frontier.settled.len(), "dijkstra done");
    (frontier.distance, frontier.previous)
}

/// Up to |V| passes over every arc, stopping at the first pass with no
/// change. A change in pass |V| means a negative cycle is reachable.
fn bellman_ford<N, E>(graph: &Graph<N, E>, source: NodeId) -> Result<Tree> {
    let mut distance: FxHashMap<NodeId, f64> = FxHashMap::default();
    let mut previous: FxHashMap<NodeId, EdgeId> = FxHashMap::default();
    distance.insert(source, 0.0);

    let mut order: Vec<NodeId> = graph.node_ids().collect();
    order.sort_unstable();

    for pass in 0..graph.node_count() {
        let mut changed = false;
        for &node in &order {
            let Some(&base) = distance.get(&node) else {
                continue;
            };
            for (next, edge) in graph.arcs(node) {
                let candidate = base + edge.weight();
                if candidate < distance.get(&next).copied().unwrap_or(f64::INFINITY) {
                    distance.insert(next, candidate);
                    previous.insert(next, edge.id());
                    changed = true;
                }
            }
        }
        if !changed {
            trace!(passes = pass + 1, "bellman-ford converged");
            return Ok((distance, previous));
        }
    }

    Err(GraphError::NegativeCycle)
}

/// One step of a probe path.
#[derive(Debug, Clone, Copy)]
struct Step {
    from: NodeId,
    to: NodeId,
    edge: EdgeId,
    weight: f64,
}

/// Partition of the nodes into roots and bundles.
///
/// Roots are the sampled set `R1` (always containing the source) plus the
/// promoted set `R2`: unsampled nodes whose bounded probe settled
/// `ceil(k * log2 k)` nodes, or exhausted its component, without meeting
/// `R1`. Every other node is bundled with the first `R1` node its probe
/// settled, together with the probe path.
#[derive(Debug, Clone)]
pub struct BundlePartition {
    k: f64,
    sampled: FxHashSet<NodeId>,
    promoted: FxHashSet<NodeId>,
    root_of: FxHashMap<NodeId, (NodeId, f64)>,
    bundles: FxHashMap<NodeId, Vec<Vec<Step>>>,
}

impl BundlePartition {
    pub fn build<N, E>(graph: &Graph<N, E>, source: NodeId, config: &RandomizedConfig) -> Self {
        let n = graph.node_count().max(1) as f64;
        let k = (n.log2() / n.log2().log2()).sqrt();
        let k = if k.is_finite() && k >= 1.0 { k } else { 2.0 };
        let limit = (k * k.log2()).ceil().max(1.0) as usize;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut order: Vec<NodeId> = graph.node_ids().collect();
        order.sort_unstable();

        let mut sampled = FxHashSet::default();
        let mut unsampled = Vec::new();
        for id in order {
            if id == source || rng.gen::<f64>() < 1.0 / k {
                sampled.insert(id);
            } else {
                unsampled.push(id);
            }
        }

        let mut promoted = FxHashSet::default();
        let mut root_of = FxHashMap::default();
        let mut bundles: FxHashMap<NodeId, Vec<Vec<Step>>> = FxHashMap::default();

        for origin in unsampled {
            match probe(graph, origin, &sampled, limit) {
                Some((root, dist, path)) => {
                    root_of.insert(origin, (root, dist));
                    bundles.entry(root).or_default().push(path);
                }
                None => {
                    promoted.insert(origin);
                }
            }
        }

        debug!(
            k,
            limit,
            sampled = sampled.len(),
            promoted = promoted.len(),
            bundled = root_of.len(),
            "bundle partition"
        );

        Self {
            k,
            sampled,
            promoted,
            root_of,
            bundles,
        }
    }

    pub fn k(&self) -> f64 {
        self.k
    }

    pub fn sampled(&self) -> &FxHashSet<NodeId> {
        &self.sampled
    }

    pub fn promoted(&self) -> &FxHashSet<NodeId> {
        &self.promoted
    }

    pub fn is_root(&self, node: NodeId) -> bool {
        self.sampled.contains(&node) || self.promoted.contains(&node)
    }

    /// Root a non-root node was bundled with, and its probe distance.
    pub fn root_of(&self, node: NodeId) -> Option<(NodeId, f64)> {
        self.root_of.get(&node).copied()
    }

    /// Members bundled with `root`.
    pub fn bundle(&self, root: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.bundles
            .get(&root)
            .into_iter()
            .flatten()
            .filter_map(|path| path.last().map(|step| step.to))
    }

    fn probe_paths(&self, root: NodeId) -> &[Vec<Step>] {
        self.bundles.get(&root).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Bounded Dijkstra from `origin`. Returns the first sampled node settled,
/// its distance and the path from it back to `origin`, or None if `limit`
/// nodes were settled (or the component ran out) first.
fn probe<N, E>(
    graph: &Graph<N, E>,
    origin: NodeId,
    sampled: &FxHashSet<NodeId>,
    limit: usize,
) -> Option<(NodeId, f64, Vec<Step>)> {
    let mut frontier = Frontier::new(origin);
    let mut ball = 0usize;

    while let Some((node, dist)) = frontier.settle_next() {
        if sampled.contains(&node) {
            let path = probe_path(graph, &frontier.previous, node, origin)?;
            return Some((node, dist, path));
        }
        ball += 1;
        if ball >= limit {
            return None;
        }
        frontier.relax_arcs(graph, node);
    }
    None
}

/// Steps from `root` back to the probe origin.
fn probe_path<N, E>(
    graph: &Graph<N, E>,
    previous: &FxHashMap<NodeId, EdgeId>,
    root: NodeId,
    origin: NodeId,
) -> Option<Vec<Step>> {
    let path = trace_back(graph, previous, origin, root)?;
    let steps = path
        .nodes
        .windows(2)
        .zip(&path.edges)
        .rev()
        .filter_map(|(pair, &edge)| {
            graph.edge(edge).map(|e| Step {
                from: pair[1],
                to: pair[0],
                edge,
                weight: e.weight(),
            })
        })
        .collect();
    Some(steps)
}

/// Dijkstra that, on settling a root, also relaxes the probe paths of its
/// bundle. Every tentative distance is the length of a real path, so the
/// result matches plain Dijkstra.
fn bundle_dijkstra<N, E>(
    graph: &Graph<N, E>,
    source: NodeId,
    target: Option<NodeId>,
    partition: &BundlePartition,
) -> Tree {
    let mut frontier = Frontier::new(source);

    while let Some((node, _)) = frontier.settle_next() {
        if Some(node) == target {
            break;
        }
        for path in partition.probe_paths(node) {
            for step in path {
                frontier.relax(step.from, step.to, step.edge, step.weight);
            }
        }
        frontier.relax_arcs(graph, node);
    }

    (frontier.distance, frontier.previous)
}
