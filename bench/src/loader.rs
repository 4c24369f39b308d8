//! Benchmark directory loader.
//!
//! A benchmark named `foo` is a directory `foo/` holding `foo.v` (one node
//! name per line) and `foo.e` (`source target` or `source target weight`
//! per line). A directory path containing "undirected" loads into an
//! undirected graph.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};
use wavegraph_core::{Graph, GraphConfig};

/// Counters and timings from one load.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadStats {
    pub name: String,
    pub directed: bool,
    pub nodes: usize,
    pub edges: usize,
    /// Edge lines that were malformed or named an unknown node.
    pub skipped_lines: usize,
    #[serde(serialize_with = "as_millis")]
    pub node_time: Duration,
    #[serde(serialize_with = "as_millis")]
    pub edge_time: Duration,
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64() * 1000.0)
}

/// Paths of the node and edge files for a benchmark directory.
pub fn benchmark_files(dir: &Path) -> Result<(String, PathBuf, PathBuf)> {
    let name = dir
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("benchmark path {} has no directory name", dir.display()))?
        .to_string();
    let nodes = dir.join(format!("{name}.v"));
    let edges = dir.join(format!("{name}.e"));
    Ok((name, nodes, edges))
}

pub fn is_undirected(dir: &Path) -> bool {
    dir.to_string_lossy().contains("undirected")
}

/// Load a benchmark directory into a graph.
pub fn load_benchmark(dir: &Path) -> Result<(Graph, LoadStats)> {
    let (name, node_path, edge_path) = benchmark_files(dir)?;
    let config = if is_undirected(dir) {
        GraphConfig::undirected()
    } else {
        GraphConfig::directed()
    };

    let node_text = fs::read_to_string(&node_path)
        .with_context(|| format!("can not open node file {}", node_path.display()))?;
    let edge_text = fs::read_to_string(&edge_path)
        .with_context(|| format!("can not open edge file {}", edge_path.display()))?;

    info!(benchmark = %name, "begin load");
    let node_lines: Vec<&str> = node_text.lines().collect();
    let mut graph = Graph::with_config(
        config.with_capacity(node_lines.len(), edge_text.lines().count()),
    );

    let t = Instant::now();
    for line in node_lines {
        let line = line.trim();
        if !line.is_empty() {
            graph.add_node(line);
        }
    }
    let node_time = t.elapsed();

    let mut skipped_lines = 0usize;
    let t = Instant::now();
    for (lineno, line) in edge_text.lines().enumerate() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let added = match fields.as_slice() {
            [] => continue,
            [s, t] => graph.add_edge(*s, *t, 1.0),
            [s, t, w] => {
                let weight: f64 = w.parse().with_context(|| {
                    format!("{}:{}: bad weight '{}'", edge_path.display(), lineno + 1, w)
                })?;
                graph.add_edge(*s, *t, weight)
            }
            _ => None,
        };
        if added.is_none() {
            skipped_lines += 1;
            debug!(line = lineno + 1, content = line, "skipping edge line");
        }
    }
    let edge_time = t.elapsed();

    if skipped_lines > 0 {
        warn!(benchmark = %name, skipped_lines, "some edge lines were not loaded");
    }

    let stats = LoadStats {
        name,
        directed: graph.is_directed(),
        nodes: graph.node_count(),
        edges: graph.edge_count(),
        skipped_lines,
        node_time,
        edge_time,
    };
    info!(
        nodes = stats.nodes,
        edges = stats.edges,
        node_ms = stats.node_time.as_secs_f64() * 1000.0,
        edge_ms = stats.edge_time.as_secs_f64() * 1000.0,
        "load done"
    );
    Ok((graph, stats))
}
