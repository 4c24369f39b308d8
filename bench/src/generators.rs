use clap::ValueEnum;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use wavegraph_core::{Graph, GraphConfig, NodeId};

/// Synthetic graph shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Shape {
    /// Branching tree (deep paths, acyclic)
    Tree,
    /// Uniform random edges
    Random,
    /// Ring lattice with random shortcuts
    SmallWorld,
    /// Square grid with right/down edges (acyclic, wide wavefronts)
    Grid,
}

impl Shape {
    pub fn label(self) -> &'static str {
        match self {
            Shape::Tree => "branching tree",
            Shape::Random => "Erdos-Renyi random",
            Shape::SmallWorld => "small-world (Watts-Strogatz)",
            Shape::Grid => "grid DAG",
        }
    }

    pub fn generate(self, node_count: u64, seed: u64, undirected: bool) -> Graph {
        let config = if undirected {
            GraphConfig::undirected()
        } else {
            GraphConfig::directed()
        };
        match self {
            Shape::Tree => gen_tree(node_count, seed, config),
            Shape::Random => gen_random(node_count, seed, config),
            Shape::SmallWorld => gen_small_world(node_count, seed, config),
            Shape::Grid => gen_grid(node_count, seed, config),
        }
    }
}

fn weight(rng: &mut StdRng) -> f64 {
    rng.gen_range(1..=10) as f64
}

fn add_nodes(graph: &mut Graph, node_count: u64) {
    for i in 0..node_count {
        graph.add_node(format!("n{i}"));
    }
}

/// Each node spawns three children, generation by generation. Ids follow
/// insertion order, so node 0 is the root.
fn gen_tree(node_count: u64, seed: u64, config: GraphConfig) -> Graph {
    let capacity = node_count as usize;
    let mut graph = Graph::with_config(config.with_capacity(capacity, capacity));
    let mut rng = StdRng::seed_from_u64(seed);
    add_nodes(&mut graph, node_count);

    let branching = 3u64;
    let mut next_id = 1u64;
    let mut frontier = vec![0u64];

    while next_id < node_count && !frontier.is_empty() {
        let mut next_frontier = Vec::with_capacity(frontier.len() * branching as usize);
        for &parent in &frontier {
            for _ in 0..branching {
                if next_id >= node_count {
                    break;
                }
                let w = weight(&mut rng);
                graph.add_edge(NodeId(parent), NodeId(next_id), w);
                next_frontier.push(next_id);
                next_id += 1;
            }
        }
        frontier = next_frontier;
    }

    graph
}

/// About ten edges per node between uniformly chosen endpoints.
fn gen_random(node_count: u64, seed: u64, config: GraphConfig) -> Graph {
    let target_edges = node_count * 10;
    let mut graph =
        Graph::with_config(config.with_capacity(node_count as usize, target_edges as usize));
    let mut rng = StdRng::seed_from_u64(seed);
    add_nodes(&mut graph, node_count);
    if node_count < 2 {
        return graph;
    }

    for _ in 0..target_edges {
        let from = rng.gen_range(0..node_count);
        let to = rng.gen_range(0..node_count);
        if from != to {
            let w = weight(&mut rng);
            graph.add_edge(NodeId(from), NodeId(to), w);
        }
    }

    graph
}

/// Ring lattice: each node linked to its `k` clockwise neighbors, each
/// link rewired to a random node with probability `p`.
fn gen_small_world(node_count: u64, seed: u64, config: GraphConfig) -> Graph {
    let k = 5u64;
    let p = 0.05f64;
    let mut graph =
        Graph::with_config(config.with_capacity(node_count as usize, (node_count * k) as usize));
    let mut rng = StdRng::seed_from_u64(seed);
    add_nodes(&mut graph, node_count);
    if node_count < 2 {
        return graph;
    }

    for i in 0..node_count {
        for j in 1..=k.min(node_count - 1) {
            let mut neighbor = (i + j) % node_count;
            if rng.gen_bool(p) {
                let rewired = rng.gen_range(0..node_count);
                if rewired != i {
                    neighbor = rewired;
                }
            }
            let w = weight(&mut rng);
            graph.add_edge(NodeId(i), NodeId(neighbor), w);
        }
    }

    graph
}

/// `side` x `side` grid, `side = floor(sqrt(node_count))`, with edges to
/// the right and downward neighbor.
fn gen_grid(node_count: u64, seed: u64, config: GraphConfig) -> Graph {
    let side = (node_count as f64).sqrt().floor().max(1.0) as u64;
    let total = side * side;
    let mut graph =
        Graph::with_config(config.with_capacity(total as usize, (total * 2) as usize));
    let mut rng = StdRng::seed_from_u64(seed);

    for x in 0..side {
        for y in 0..side {
            graph.add_node(format!("({x}, {y})"));
        }
    }
    let id = |x: u64, y: u64| NodeId(x * side + y);
    for x in 0..side {
        for y in 0..side {
            if x + 1 < side {
                let w = weight(&mut rng);
                graph.add_edge(id(x, y), id(x + 1, y), w);
            }
            if y + 1 < side {
                let w = weight(&mut rng);
                graph.add_edge(id(x, y), id(x, y + 1), w);
            }
        }
    }

    graph
}
