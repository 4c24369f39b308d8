use std::collections::VecDeque;
use std::fmt;
use std::hash::{Hash, Hasher};

use rustc_hash::{FxHashMap, FxHashSet, FxHasher};
use tracing::{trace, warn};

use crate::error::{GraphError, Result};

/// Graph-unique node identifier. Never reused within one graph instance.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[repr(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Graph-unique edge identifier. Adjacency entries refer to edges by this id.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[repr(transparent)]
pub struct EdgeId(pub u64);

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether each edge is a one-way arc or a symmetric link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Directedness {
    #[default]
    Directed,
    Undirected,
}

/// How node ids are assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdScheme {
    /// Per-graph counter starting at 0.
    #[default]
    Sequential,
    /// Derived from the node name, probing forward on collision.
    NameHash,
}

/// Which edges to follow from a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TraversalDirection {
    /// Follow edges from source to target.
    Outgoing,
    /// Follow edges backwards from target to source.
    Incoming,
    /// Follow edges in both directions.
    #[default]
    Both,
}

/// Construction-time configuration of a [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GraphConfig {
    pub directedness: Directedness,
    pub id_scheme: IdScheme,
    pub node_capacity: usize,
    pub edge_capacity: usize,
}

impl GraphConfig {
    pub fn directed() -> Self {
        Self::default()
    }

    pub fn undirected() -> Self {
        Self {
            directedness: Directedness::Undirected,
            ..Self::default()
        }
    }

    pub fn with_id_scheme(mut self, id_scheme: IdScheme) -> Self {
        self.id_scheme = id_scheme;
        self
    }

    /// Pre-allocate for a known graph size.
    pub fn with_capacity(mut self, node_count: usize, edge_count: usize) -> Self {
        self.node_capacity = node_count;
        self.edge_capacity = edge_count;
        self
    }
}

/// A vertex owned by a [`Graph`], carrying a user payload.
///
/// Equality and hashing use the id only.
#[derive(Debug, Clone)]
pub struct Node<N = ()> {
    id: NodeId,
    name: String,
    data: N,
}

impl<N> Node<N> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &N {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut N {
        &mut self.data
    }

    pub fn into_data(self) -> N {
        self.data
    }
}

impl<N> PartialEq for Node<N> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<N> Eq for Node<N> {}

impl<N> Hash for Node<N> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// A weighted arc between two nodes of the same graph.
///
/// Endpoints are held as ids, never as references: resolving one is a map
/// lookup on the owning graph.
#[derive(Debug, Clone)]
pub struct Edge<E = ()> {
    id: EdgeId,
    source: NodeId,
    target: NodeId,
    weight: f64,
    data: E,
}

impl<E> Edge<E> {
    pub fn id(&self) -> EdgeId {
        self.id
    }

    pub fn source(&self) -> NodeId {
        self.source
    }

    pub fn target(&self) -> NodeId {
        self.target
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn data(&self) -> &E {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut E {
        &mut self.data
    }

    /// The endpoint opposite `node`, or None if `node` is not an endpoint.
    pub fn opposite(&self, node: NodeId) -> Option<NodeId> {
        if node == self.source {
            Some(self.target)
        } else if node == self.target {
            Some(self.source)
        } else {
            None
        }
    }
}

/// Anything that names a node: its id or its name.
pub trait NodeKey: fmt::Display {
    fn resolve<N, E>(&self, graph: &Graph<N, E>) -> Option<NodeId>;
}

impl NodeKey for NodeId {
    fn resolve<N, E>(&self, graph: &Graph<N, E>) -> Option<NodeId> {
        graph.nodes.contains_key(self).then_some(*self)
    }
}

impl NodeKey for &str {
    fn resolve<N, E>(&self, graph: &Graph<N, E>) -> Option<NodeId> {
        graph.name_index.get(*self).copied()
    }
}

impl NodeKey for String {
    fn resolve<N, E>(&self, graph: &Graph<N, E>) -> Option<NodeId> {
        graph.name_index.get(self.as_str()).copied()
    }
}

impl NodeKey for &String {
    fn resolve<N, E>(&self, graph: &Graph<N, E>) -> Option<NodeId> {
        graph.name_index.get(self.as_str()).copied()
    }
}

/// In-memory graph: owned nodes and edges plus two derived indices.
///
/// `adjacency[a][b]` lists the edges leaving `a` towards `b`. In the
/// undirected variant every edge `(s, t)` is also listed under
/// `adjacency[t][s]`, so out-edges, in-edges and incident edges coincide.
/// Incoming queries on a directed graph scan every adjacency row.
#[derive(Debug, Clone)]
pub struct Graph<N = (), E = ()> {
    config: GraphConfig,
    next_node_id: u64,
    next_edge_id: u64,
    nodes: FxHashMap<NodeId, Node<N>>,
    edges: FxHashMap<EdgeId, Edge<E>>,
    adjacency: FxHashMap<NodeId, FxHashMap<NodeId, Vec<EdgeId>>>,
    name_index: FxHashMap<String, NodeId>,
}

impl<N, E> Graph<N, E> {
    /// Empty directed graph with sequential ids.
    pub fn new() -> Self {
        Self::with_config(GraphConfig::directed())
    }

    /// Empty undirected graph with sequential ids.
    pub fn undirected() -> Self {
        Self::with_config(GraphConfig::undirected())
    }

    pub fn with_config(config: GraphConfig) -> Self {
        Self {
            config,
            next_node_id: 0,
            next_edge_id: 0,
            nodes: FxHashMap::with_capacity_and_hasher(config.node_capacity, Default::default()),
            edges: FxHashMap::with_capacity_and_hasher(config.edge_capacity, Default::default()),
            adjacency: FxHashMap::with_capacity_and_hasher(
                config.node_capacity,
                Default::default(),
            ),
            name_index: FxHashMap::with_capacity_and_hasher(
                config.node_capacity,
                Default::default(),
            ),
        }
    }

    pub fn config(&self) -> GraphConfig {
        self.config
    }

    pub fn directedness(&self) -> Directedness {
        self.config.directedness
    }

    pub fn is_directed(&self) -> bool {
        self.config.directedness == Directedness::Directed
    }

    // --- mutation ---

    /// Add a node with a default payload. Returns the existing node's id if
    /// the name is already taken.
    pub fn add_node(&mut self, name: impl Into<String>) -> NodeId
    where
        N: Default,
    {
        self.add_node_with(name, N::default())
    }

    /// Add a node carrying `data`. If a node with this name exists, `data`
    /// is dropped and the existing id is returned.
    pub fn add_node_with(&mut self, name: impl Into<String>, data: N) -> NodeId {
        let name = name.into();
        if let Some(&existing) = self.name_index.get(&name) {
            return existing;
        }

        let id = self.allocate_node_id(&name);
        trace!(node = id.0, name = %name, "add node");
        self.adjacency.entry(id).or_default();
        self.name_index.insert(name.clone(), id);
        self.nodes.insert(id, Node { id, name, data });
        id
    }

    /// Re-insert a node previously returned by [`Graph::remove_node`],
    /// keeping its id. No-op if a node with the same id or name is present.
    pub fn insert_node(&mut self, node: Node<N>) -> NodeId {
        if self.nodes.contains_key(&node.id) {
            return node.id;
        }
        if let Some(&existing) = self.name_index.get(&node.name) {
            return existing;
        }

        let id = node.id;
        self.adjacency.entry(id).or_default();
        self.name_index.insert(node.name.clone(), id);
        self.nodes.insert(id, node);
        id
    }

    /// Remove a node and every edge incident to it. Returns the removed
    /// node so it can be re-inserted.
    pub fn remove_node(&mut self, key: impl NodeKey) -> Option<Node<N>> {
        let id = key.resolve(self)?;

        for edge_id in self.incident_edge_ids(id) {
            self.detach_edge(edge_id);
        }
        self.adjacency.remove(&id);

        let node = self.nodes.remove(&id)?;
        self.name_index.remove(&node.name);
        trace!(node = id.0, name = %node.name, "remove node");
        Some(node)
    }

    /// Add an edge with a default payload.
    pub fn add_edge(
        &mut self,
        source: impl NodeKey,
        target: impl NodeKey,
        weight: f64,
    ) -> Option<EdgeId>
    where
        E: Default,
    {
        self.add_edge_with(source, target, weight, E::default())
    }

    /// Add an edge carrying `data`.
    ///
    /// Returns None if either endpoint is missing or the weight is NaN.
    /// If an equal edge exists (same endpoints and weight, either
    /// orientation when undirected), `data` is dropped and its id returned.
    pub fn add_edge_with(
        &mut self,
        source: impl NodeKey,
        target: impl NodeKey,
        weight: f64,
        data: E,
    ) -> Option<EdgeId> {
        let s = source.resolve(self)?;
        let t = target.resolve(self)?;
        if weight.is_nan() {
            warn!(source = s.0, target = t.0, "rejecting edge with NaN weight");
            return None;
        }

        if let Some(existing) = self.find_edge(s, t, weight) {
            return Some(existing);
        }

        let id = EdgeId(self.next_edge_id);
        self.next_edge_id += 1;

        self.edges.insert(
            id,
            Edge {
                id,
                source: s,
                target: t,
                weight,
                data,
            },
        );
        self.link(s, t, id);
        if !self.is_directed() && s != t {
            self.link(t, s, id);
        }
        trace!(edge = id.0, source = s.0, target = t.0, weight, "add edge");
        Some(id)
    }

    /// Remove the edge matching `(source, target, weight)`.
    pub fn remove_edge(
        &mut self,
        source: impl NodeKey,
        target: impl NodeKey,
        weight: f64,
    ) -> Option<Edge<E>> {
        let s = source.resolve(self)?;
        let t = target.resolve(self)?;
        let id = self.find_edge(s, t, weight)?;
        self.detach_edge(id)
    }

    pub fn remove_edge_by_id(&mut self, id: EdgeId) -> Option<Edge<E>> {
        self.detach_edge(id)
    }

    // --- node queries ---

    pub fn resolve(&self, key: impl NodeKey) -> Option<NodeId> {
        key.resolve(self)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node<N>> {
        self.nodes.get(&id)
    }

    pub fn get_node(&self, key: impl NodeKey) -> Option<&Node<N>> {
        key.resolve(self).and_then(|id| self.nodes.get(&id))
    }

    pub fn get_node_mut(&mut self, key: impl NodeKey) -> Option<&mut Node<N>> {
        let id = key.resolve(self)?;
        self.nodes.get_mut(&id)
    }

    pub fn has_node(&self, key: impl NodeKey) -> bool {
        key.resolve(self).is_some()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node<N>> {
        self.nodes.values()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    // --- edge queries ---

    pub fn edge(&self, id: EdgeId) -> Option<&Edge<E>> {
        self.edges.get(&id)
    }

    pub fn edge_mut(&mut self, id: EdgeId) -> Option<&mut Edge<E>> {
        self.edges.get_mut(&id)
    }

    pub fn get_edge(
        &self,
        source: impl NodeKey,
        target: impl NodeKey,
        weight: f64,
    ) -> Option<&Edge<E>> {
        let s = source.resolve(self)?;
        let t = target.resolve(self)?;
        self.find_edge(s, t, weight).and_then(|id| self.edges.get(&id))
    }

    pub fn has_edge(&self, source: impl NodeKey, target: impl NodeKey, weight: f64) -> bool {
        self.get_edge(source, target, weight).is_some()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge<E>> {
        self.edges.values()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// True if any edge carries a negative weight.
    pub fn has_negative_weight(&self) -> bool {
        self.edges.values().any(|e| e.weight < 0.0)
    }

    /// Edges leaving the node (all incident edges when undirected).
    pub fn out_edges(&self, key: impl NodeKey) -> Vec<&Edge<E>> {
        match key.resolve(self) {
            Some(id) => self.arcs(id).map(|(_, e)| e).collect(),
            None => Vec::new(),
        }
    }

    /// Edges entering the node (all incident edges when undirected).
    pub fn in_edges(&self, key: impl NodeKey) -> Vec<&Edge<E>> {
        match key.resolve(self) {
            Some(id) if self.is_directed() => self
                .incoming_ids(id)
                .filter_map(|e| self.edges.get(&e))
                .collect(),
            Some(id) => self.arcs(id).map(|(_, e)| e).collect(),
            None => Vec::new(),
        }
    }

    /// Union of in- and out-edges.
    pub fn incident_edges(&self, key: impl NodeKey) -> Vec<&Edge<E>> {
        match key.resolve(self) {
            Some(id) => self
                .incident_edge_ids(id)
                .into_iter()
                .filter_map(|e| self.edges.get(&e))
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn out_degree(&self, key: impl NodeKey) -> usize {
        self.out_edges(key).len()
    }

    pub fn in_degree(&self, key: impl NodeKey) -> usize {
        self.in_edges(key).len()
    }

    /// Number of distinct edges incident to the node.
    pub fn degree(&self, key: impl NodeKey) -> usize {
        self.incident_edges(key).len()
    }

    // --- relatives ---

    pub fn children(&self, key: impl NodeKey) -> FxHashSet<NodeId> {
        key.resolve(self)
            .map(|id| self.adjacent(id, TraversalDirection::Outgoing))
            .unwrap_or_default()
    }

    pub fn parents(&self, key: impl NodeKey) -> FxHashSet<NodeId> {
        key.resolve(self)
            .map(|id| self.adjacent(id, TraversalDirection::Incoming))
            .unwrap_or_default()
    }

    pub fn neighbors(&self, key: impl NodeKey) -> FxHashSet<NodeId> {
        key.resolve(self)
            .map(|id| self.adjacent(id, TraversalDirection::Both))
            .unwrap_or_default()
    }

    /// Every node that can reach this one. Contains the node itself only if
    /// it lies on a cycle (always, when undirected and it has an edge).
    pub fn predecessors(&self, key: impl NodeKey) -> FxHashSet<NodeId> {
        key.resolve(self)
            .map(|id| self.closure(id, TraversalDirection::Incoming))
            .unwrap_or_default()
    }

    /// Every node reachable from this one.
    pub fn successors(&self, key: impl NodeKey) -> FxHashSet<NodeId> {
        key.resolve(self)
            .map(|id| self.closure(id, TraversalDirection::Outgoing))
            .unwrap_or_default()
    }

    /// Predecessors and successors together.
    pub fn lineage(&self, key: impl NodeKey) -> FxHashSet<NodeId> {
        let Some(id) = key.resolve(self) else {
            return FxHashSet::default();
        };
        let mut res = self.closure(id, TraversalDirection::Incoming);
        res.extend(self.closure(id, TraversalDirection::Outgoing));
        res
    }

    /// Directly adjacent nodes along `direction`. Both directions collapse
    /// to the same set when undirected.
    pub fn adjacent(&self, id: NodeId, direction: TraversalDirection) -> FxHashSet<NodeId> {
        let outgoing = || {
            self.adjacency
                .get(&id)
                .into_iter()
                .flat_map(|row| row.keys().copied())
        };

        if !self.is_directed() {
            return outgoing().collect();
        }

        match direction {
            TraversalDirection::Outgoing => outgoing().collect(),
            TraversalDirection::Incoming => self.incoming_sources(id).collect(),
            TraversalDirection::Both => outgoing().chain(self.incoming_sources(id)).collect(),
        }
    }

    /// Out-arcs of a node as `(neighbor, edge)` pairs. For an undirected
    /// graph the neighbor is the endpoint opposite `id`.
    pub fn arcs(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &Edge<E>)> + '_ {
        self.adjacency.get(&id).into_iter().flat_map(move |row| {
            row.iter().flat_map(move |(&neighbor, ids)| {
                ids.iter()
                    .filter_map(move |e| self.edges.get(e).map(|edge| (neighbor, edge)))
            })
        })
    }

    /// Approximate memory usage in bytes.
    pub fn memory_usage(&self) -> usize {
        use std::mem::size_of;

        let names: usize = self.nodes.values().map(|n| n.name.len()).sum();
        let nodes_mem = self.nodes.len() * (size_of::<NodeId>() + size_of::<Node<N>>()) + names;
        let edges_mem = self.edges.len() * (size_of::<EdgeId>() + size_of::<Edge<E>>());
        let adjacency_entries: usize = self
            .adjacency
            .values()
            .map(|row| row.values().map(Vec::len).sum::<usize>())
            .sum();
        let index_mem = adjacency_entries * (size_of::<NodeId>() + size_of::<EdgeId>())
            + self.name_index.len() * (size_of::<String>() + size_of::<NodeId>())
            + names;

        nodes_mem + edges_mem + index_mem
    }

    /// Resolve a key or fail with [`GraphError::NodeNotFound`].
    pub(crate) fn require(&self, key: impl NodeKey) -> Result<NodeId> {
        key.resolve(self).ok_or_else(|| GraphError::not_found(&key))
    }

    pub(crate) fn name_of(&self, id: NodeId) -> String {
        self.nodes
            .get(&id)
            .map(|n| n.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    // --- internals ---

    fn allocate_node_id(&mut self, name: &str) -> NodeId {
        match self.config.id_scheme {
            IdScheme::Sequential => loop {
                let id = NodeId(self.next_node_id);
                self.next_node_id += 1;
                if !self.nodes.contains_key(&id) {
                    return id;
                }
            },
            IdScheme::NameHash => {
                let mut hasher = FxHasher::default();
                name.hash(&mut hasher);
                let mut id = NodeId(hasher.finish());
                // Occupants always carry a different name: callers check the name index first.
                while self.nodes.contains_key(&id) {
                    id = NodeId(id.0.wrapping_add(1));
                }
                id
            }
        }
    }

    fn find_edge(&self, source: NodeId, target: NodeId, weight: f64) -> Option<EdgeId> {
        self.adjacency
            .get(&source)?
            .get(&target)?
            .iter()
            .copied()
            .find(|id| self.edges.get(id).is_some_and(|e| e.weight == weight))
    }

    fn link(&mut self, from: NodeId, to: NodeId, id: EdgeId) {
        self.adjacency
            .entry(from)
            .or_default()
            .entry(to)
            .or_default()
            .push(id);
    }

    fn unlink(&mut self, from: NodeId, to: NodeId, id: EdgeId) {
        if let Some(row) = self.adjacency.get_mut(&from) {
            if let Some(ids) = row.get_mut(&to) {
                ids.retain(|&e| e != id);
                if ids.is_empty() {
                    row.remove(&to);
                }
            }
        }
    }

    fn detach_edge(&mut self, id: EdgeId) -> Option<Edge<E>> {
        let edge = self.edges.remove(&id)?;
        self.unlink(edge.source, edge.target, id);
        if !self.is_directed() && edge.source != edge.target {
            self.unlink(edge.target, edge.source, id);
        }
        trace!(edge = id.0, "remove edge");
        Some(edge)
    }

    fn incoming_ids(&self, id: NodeId) -> impl Iterator<Item = EdgeId> + '_ {
        self.adjacency
            .values()
            .filter_map(move |row| row.get(&id))
            .flat_map(|ids| ids.iter().copied())
    }

    fn incoming_sources(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.adjacency
            .iter()
            .filter(move |(_, row)| row.contains_key(&id))
            .map(|(&source, _)| source)
    }

    fn incident_edge_ids(&self, id: NodeId) -> Vec<EdgeId> {
        let mut ids: FxHashSet<EdgeId> = self
            .adjacency
            .get(&id)
            .into_iter()
            .flat_map(|row| row.values().flatten().copied())
            .collect();
        if self.is_directed() {
            ids.extend(self.incoming_ids(id));
        }
        let mut ids: Vec<EdgeId> = ids.into_iter().collect();
        ids.sort_unstable();
        ids
    }

    /// FIFO expansion along `direction`, each node visited at most once.
    fn closure(&self, start: NodeId, direction: TraversalDirection) -> FxHashSet<NodeId> {
        let mut reached = FxHashSet::default();
        let mut queue: VecDeque<NodeId> = VecDeque::new();
        queue.push_back(start);

        while let Some(current) = queue.pop_front() {
            for next in self.adjacent(current, direction) {
                if reached.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        reached
    }
}

impl<N: Clone, E: Clone> Graph<N, E> {
    /// Directed copy of this graph. Undirected edges become a pair of
    /// opposite arcs; ids, names and payloads are preserved.
    pub fn to_directed(&self) -> Graph<N, E> {
        let config = GraphConfig {
            directedness: Directedness::Directed,
            edge_capacity: self.edges.len() * 2,
            ..self.config
        };
        let mut directed = Graph::with_config(config);
        directed.next_node_id = self.next_node_id;

        for node in self.nodes.values() {
            directed.insert_node(node.clone());
        }
        for edge in self.edges.values() {
            directed.add_edge_with(edge.source, edge.target, edge.weight, edge.data.clone());
            if !self.is_directed() {
                directed.add_edge_with(edge.target, edge.source, edge.weight, edge.data.clone());
            }
        }
        directed
    }
}

impl<N, E> Default for Graph<N, E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const N: usize = 10;

    fn populate<E: Default>(graph: &mut Graph<(), E>) -> (NodeId, NodeId) {
        let s = graph.add_node("source");
        let t = graph.add_node("target");
        for i in 0..N {
            graph.add_node(i.to_string());
        }
        (s, t)
    }

    fn make_complete_digraph() -> (Graph, NodeId, NodeId) {
        let mut g = Graph::new();
        let (s, t) = populate(&mut g);
        g.add_edge("source", "target", 2.0);
        for i in 0..N {
            for j in 0..N {
                if i != j {
                    g.add_edge(i.to_string(), j.to_string(), 1.0);
                }
            }
        }
        (g, s, t)
    }

    fn make_complete_graph() -> (Graph, NodeId, NodeId) {
        let mut g = Graph::undirected();
        let (s, t) = populate(&mut g);
        g.add_edge("source", "target", 2.0);
        g.add_edge("target", "source", 2.0);
        g.add_edge("target", "source", 1.0);
        for i in 0..N {
            for j in (i + 1)..N {
                g.add_edge(i.to_string(), j.to_string(), 1.0);
            }
        }
        (g, s, t)
    }

    #[test]
    fn test_digraph_structure() {
        let (mut g, s, t) = make_complete_digraph();
        assert!(g.is_directed());
        assert_eq!(g.node_count(), N + 2);
        assert_eq!(g.edge_count(), N * (N - 1) + 1);

        let copy = g.clone();
        assert_eq!(copy.edge_count(), N * (N - 1) + 1);

        assert!(g.has_node("source"));
        assert_eq!(g.get_node("source").unwrap().id(), s);
        assert!(g.has_node((N / 2).to_string()));

        let removed = g.remove_node("source").unwrap();
        assert!(!g.has_node("source"));
        assert!(!g.has_node(s));
        assert_eq!(copy.node_count(), N + 2);

        assert_eq!(g.insert_node(removed), s);
        assert!(g.has_node("source"));
        assert!(!g.has_edge("source", "target", 2.0));

        g.add_edge("source", "target", 2.0);
        assert!(!g.has_edge("source", "target", 1.0));
        assert!(g.has_edge("source", "target", 2.0));
        assert!(!g.has_edge("target", "source", 2.0));
        assert_eq!(copy.edge_count(), N * (N - 1) + 1);

        g.remove_edge("source", "target", 2.0);
        assert!(!g.has_edge("source", "target", 2.0));
        g.add_edge("source", "target", 2.0);
        assert!(g.has_edge(s, t, 2.0));

        let five = (N / 2).to_string();
        let e = g.get_edge("0", five.as_str(), 1.0).unwrap().id();
        assert!(g.out_edges("0").iter().any(|x| x.id() == e));

        assert_eq!(g.degree("0"), 2 * (N - 1));
        assert_eq!(g.in_degree("0"), N - 1);
        assert_eq!(g.out_degree("0"), N - 1);

        assert!(g.children("source").contains(&t));
        assert!(g.predecessors("target").contains(&s));
        assert!(g.successors("0").contains(&g.resolve(five.as_str()).unwrap()));
        assert!(g.neighbors("target").contains(&s));
    }

    #[test]
    fn test_graph_structure() {
        let (mut g, s, t) = make_complete_graph();
        assert!(!g.is_directed());
        assert_eq!(g.node_count(), N + 2);
        assert_eq!(g.edge_count(), N * (N - 1) / 2 + 2);

        let copy = g.clone();
        assert_eq!(copy.edge_count(), N * (N - 1) / 2 + 2);

        let removed = g.remove_node("source").unwrap();
        assert!(!g.has_node("source"));
        assert_eq!(copy.node_count(), N + 2);
        g.insert_node(removed);

        assert!(!g.has_edge("target", "source", 2.0));
        assert!(!g.has_edge("target", "source", 1.0));

        g.add_edge("source", "target", 2.0);
        g.add_edge("target", "source", 2.0);
        g.add_edge("target", "source", 1.0);
        assert_eq!(g.edge_count(), N * (N - 1) / 2 + 2);

        assert!(g.has_edge("source", "target", 1.0));
        assert!(g.has_edge("target", "source", 2.0));

        assert_eq!(g.degree("0"), N - 1);
        assert_eq!(g.in_degree("0"), N - 1);
        assert_eq!(g.out_degree("0"), N - 1);

        assert!(g.children("source").contains(&t));
        assert_eq!(g.children("0").len(), N - 1);
        assert_eq!(g.parents("0").len(), N - 1);
        assert!(g.predecessors("target").contains(&s));
        assert!(g.neighbors("target").contains(&s));
        assert_eq!(g.neighbors("0").len(), N - 1);
    }

    #[test]
    fn test_add_node_returns_existing() {
        let mut g: Graph<u32> = Graph::new();
        let a = g.add_node_with("a", 7);
        let again = g.add_node_with("a", 99);
        assert_eq!(a, again);
        assert_eq!(g.node_count(), 1);
        assert_eq!(*g.node(a).unwrap().data(), 7);
    }

    #[test]
    fn test_add_edge_missing_endpoint() {
        let mut g: Graph = Graph::new();
        g.add_node("a");
        assert!(g.add_edge("a", "nope", 1.0).is_none());
        assert!(g.add_edge(NodeId(42), "a", 1.0).is_none());
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn test_add_edge_nan_rejected() {
        let mut g: Graph = Graph::new();
        g.add_node("a");
        g.add_node("b");
        assert!(g.add_edge("a", "b", f64::NAN).is_none());
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn test_parallel_edges_by_weight() {
        let mut g: Graph = Graph::new();
        g.add_node("a");
        g.add_node("b");
        let e1 = g.add_edge("a", "b", 1.0).unwrap();
        let e2 = g.add_edge("a", "b", 3.0).unwrap();
        assert_ne!(e1, e2);
        assert_eq!(g.add_edge("a", "b", 1.0), Some(e1));
        assert_eq!(g.out_degree("a"), 2);
        assert_eq!(g.children("a").len(), 1);

        g.remove_edge("a", "b", 1.0);
        assert!(g.has_edge("a", "b", 3.0));
        assert_eq!(g.out_degree("a"), 1);
    }

    #[test]
    fn test_remove_edge_by_id_undirected() {
        let mut g: Graph = Graph::undirected();
        g.add_node("s");
        g.add_node("t");
        let id = g.add_edge("s", "t", 2.0).unwrap();

        let removed = g.remove_edge_by_id(id).unwrap();
        assert_eq!(removed.id(), id);
        assert_eq!(g.edge_count(), 0);
        assert!(!g.has_edge("t", "s", 2.0));
        assert!(g.neighbors("s").is_empty());
        assert!(g.neighbors("t").is_empty());
        assert!(g.remove_edge_by_id(id).is_none());
    }

    #[test]
    fn test_directed_degree_identities() {
        let (g, _, _) = make_complete_digraph();
        let mut total_out = 0;
        for id in g.node_ids() {
            assert_eq!(g.out_degree(id) + g.in_degree(id), g.degree(id));
            total_out += g.out_degree(id);
        }
        assert_eq!(total_out, g.edge_count());
    }

    #[test]
    fn test_undirected_symmetry() {
        let mut g: Graph = Graph::undirected();
        g.add_node("s");
        g.add_node("t");
        g.add_edge("s", "t", 4.0);
        assert!(g.has_edge("s", "t", 4.0));
        assert!(g.has_edge("t", "s", 4.0));
        g.add_edge("t", "s", 4.0);
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn test_remove_node_removes_incident_edges() {
        let (mut g, _, _) = make_complete_digraph();
        let x = g.resolve("3").unwrap();
        g.remove_node(x);
        assert_eq!(g.in_degree(x), 0);
        assert_eq!(g.out_degree(x), 0);
        assert!(g.edges().all(|e| e.source() != x && e.target() != x));
        assert_eq!(g.edge_count(), (N - 1) * (N - 2) + 1);
        for id in g.node_ids() {
            assert!(!g.children(id).contains(&x));
            assert!(!g.parents(id).contains(&x));
        }
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let (mut g, _, _) = make_complete_digraph();
        assert!(g.remove_node("ghost").is_none());
        assert!(g.remove_edge("0", "1", 5.0).is_none());
        assert_eq!(g.edge_count(), N * (N - 1) + 1);
    }

    #[test]
    fn test_lookup_miss_is_empty() {
        let g: Graph = Graph::new();
        assert!(g.get_node("x").is_none());
        assert!(g.out_edges("x").is_empty());
        assert!(g.in_edges(NodeId(3)).is_empty());
        assert!(g.predecessors("x").is_empty());
        assert_eq!(g.degree("x"), 0);
    }

    #[test]
    fn test_predecessor_excludes_start_without_cycle() {
        let mut g: Graph = Graph::new();
        for name in ["a", "b", "c"] {
            g.add_node(name);
        }
        g.add_edge("a", "b", 1.0);
        g.add_edge("b", "c", 1.0);
        let a = g.resolve("a").unwrap();
        let c = g.resolve("c").unwrap();
        assert_eq!(g.successors("a").len(), 2);
        assert!(!g.successors("a").contains(&a));
        assert_eq!(g.predecessors("c").len(), 2);

        g.add_edge("c", "a", 1.0);
        assert!(g.successors("a").contains(&a));
        assert!(g.predecessors("c").contains(&c));
        assert_eq!(g.lineage("b").len(), 3);
    }

    #[test]
    fn test_name_hash_ids_are_deterministic() {
        let config = GraphConfig::directed().with_id_scheme(IdScheme::NameHash);
        let mut g1: Graph = Graph::with_config(config);
        let mut g2: Graph = Graph::with_config(config);
        let a1 = g1.add_node("alpha");
        g2.add_node("beta");
        let a2 = g2.add_node("alpha");
        assert_eq!(a1, a2);
        assert_eq!(g1.add_node("alpha"), a1);
    }

    #[test]
    fn test_sequential_ids_not_reused() {
        let mut g: Graph = Graph::new();
        let a = g.add_node("a");
        g.remove_node(a);
        let b = g.add_node("b");
        assert_ne!(a, b);
    }

    #[test]
    fn test_to_directed() {
        let mut g: Graph<&str, u8> = Graph::undirected();
        g.add_node_with("a", "payload");
        g.add_node_with("b", "");
        g.add_edge_with("a", "b", 2.5, 9);

        let d = g.to_directed();
        assert!(d.is_directed());
        assert_eq!(d.edge_count(), 2);
        assert!(d.has_edge("a", "b", 2.5));
        assert!(d.has_edge("b", "a", 2.5));
        assert_eq!(d.resolve("a"), g.resolve("a"));
        assert_eq!(*d.get_node("a").unwrap().data(), "payload");
        assert_eq!(*d.get_edge("b", "a", 2.5).unwrap().data(), 9);
    }

    #[test]
    fn test_undirected_self_loop() {
        let mut g: Graph = Graph::undirected();
        g.add_node("a");
        g.add_edge("a", "a", 1.0);
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.degree("a"), 1);
        g.remove_node("a");
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn test_payload_mutation() {
        let mut g: Graph<Vec<u8>, String> = Graph::new();
        g.add_node("a");
        g.add_node("b");
        let e = g.add_edge("a", "b", 1.0).unwrap();
        g.get_node_mut("a").unwrap().data_mut().push(1);
        g.edge_mut(e).unwrap().data_mut().push_str("dep");
        assert_eq!(g.get_node("a").unwrap().data(), &vec![1]);
        assert_eq!(g.edge(e).unwrap().data(), "dep");
    }

    #[test]
    fn test_memory_usage_nonzero() {
        let (g, _, _) = make_complete_digraph();
        assert!(g.memory_usage() > 0);
    }
}
