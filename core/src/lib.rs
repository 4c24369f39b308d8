//! wavegraph-core: In-memory graph store and algorithm suite.
//!
//! Nodes and edges live in id-keyed maps owned by a single [`Graph`];
//! edges refer to their endpoints by id, so a removed node can never be
//! reached through a stale edge. Directed and undirected graphs share the
//! same storage and differ only in how adjacency entries are written.
//!
//! On top of the store: BFS/DFS, Dijkstra, Bellman-Ford, a randomized
//! bundle SSSP for undirected graphs, A*, generation-layered topological
//! sort, and a wavefront executor that runs per-node work on a worker pool
//! in dependency order.

mod astar;
mod error;
mod executor;
mod graph;
mod pool;
mod shortest_path;
mod topological;
mod traversal;

pub use astar::{astar_path, astar_path_with};
pub use error::{GraphError, Result};
pub use executor::{
    DependencyStatus, ExecutionReport, ExecutorConfig, TaskFailure, TaskOutcome,
    WavefrontExecutor,
};
pub use graph::{
    Directedness, Edge, EdgeId, Graph, GraphConfig, IdScheme, Node, NodeId, NodeKey,
    TraversalDirection,
};
pub use pool::{TaskQueue, WorkerPool};
pub use shortest_path::{
    shortest_path, shortest_paths, shortest_paths_with, BundlePartition, Path, RandomizedConfig,
    ShortestPathMethod, ShortestPaths,
};
pub use topological::{topological_generations, topological_sort, topological_sort_mut};
pub use traversal::{bfs, bfs_with, dfs, dfs_with};
