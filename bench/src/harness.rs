//! Timing harness: runs each algorithm once on a loaded or generated graph
//! and collects wall-clock timings into a serializable report.

use std::time::{Duration, Instant};

use clap::ValueEnum;
use serde::Serialize;
use tracing::{debug, warn};
use wavegraph_core::{
    astar_path, bfs, dfs, shortest_path, shortest_paths_with, topological_generations,
    ExecutorConfig, Graph, NodeId, RandomizedConfig, ShortestPathMethod, WavefrontExecutor,
};

use crate::loader::LoadStats;

/// Shortest-path method selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum MethodArg {
    #[default]
    Auto,
    Dijkstra,
    BellmanFord,
    Randomized,
}

impl From<MethodArg> for ShortestPathMethod {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::Auto => ShortestPathMethod::Auto,
            MethodArg::Dijkstra => ShortestPathMethod::Dijkstra,
            MethodArg::BellmanFord => ShortestPathMethod::BellmanFord,
            MethodArg::Randomized => ShortestPathMethod::Randomized,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HarnessOptions {
    /// Source node name; the lowest id when None.
    pub source: Option<String>,
    pub method: MethodArg,
    pub workers: usize,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Timing {
    pub operation: &'static str,
    pub millis: f64,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub graph: String,
    pub directed: bool,
    pub nodes: usize,
    pub edges: usize,
    pub memory_mb: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load: Option<LoadStats>,
    pub timings: Vec<Timing>,
}

fn timed<T>(f: impl FnOnce() -> T) -> (T, Duration) {
    let t = Instant::now();
    let value = f();
    (value, t.elapsed())
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Run every benchmark on `graph`.
pub fn run_harness(
    name: &str,
    graph: &Graph,
    load: Option<LoadStats>,
    options: &HarnessOptions,
) -> anyhow::Result<Report> {
    let mut timings = Vec::new();
    let mut record = |operation: &'static str, elapsed: Duration, detail: String| {
        debug!(operation, ms = millis(elapsed), detail = %detail, "timed");
        timings.push(Timing {
            operation,
            millis: millis(elapsed),
            detail,
        });
    };

    let source = match &options.source {
        Some(key) => graph
            .resolve(key)
            .ok_or_else(|| anyhow::anyhow!("source node '{key}' not in graph"))?,
        None => match graph.node_ids().min() {
            Some(id) => id,
            None => {
                warn!(graph = name, "graph is empty, nothing to time");
                return Ok(empty_report(name, graph, load));
            }
        },
    };
    let far: NodeId = graph.node_ids().max().unwrap_or(source);

    let (order, elapsed) = timed(|| bfs(graph, source));
    record("bfs", elapsed, format!("{} reached", order?.len()));

    let (order, elapsed) = timed(|| dfs(graph, source));
    record("dfs", elapsed, format!("{} reached", order?.len()));

    let method: ShortestPathMethod = options.method.into();
    let config = RandomizedConfig { seed: options.seed };
    let (tree, elapsed) = timed(|| shortest_paths_with(graph, source, None, method, &config));
    let detail = match tree {
        Ok(tree) => format!("{}: {} reached", tree.method().name(), tree.reached()),
        Err(e) => format!("failed: {e}"),
    };
    record("sssp", elapsed, detail);

    let (path, elapsed) = timed(|| shortest_path(graph, source, far, method));
    let detail = match path {
        Ok(Some(p)) => format!("{} -> {}: {} hops, cost {}", source, far, p.hops(), p.cost),
        Ok(None) => format!("{source} -> {far}: no path"),
        Err(e) => format!("failed: {e}"),
    };
    record("shortest path", elapsed, detail);

    let (path, elapsed) = timed(|| astar_path(graph, source, far));
    let detail = match path {
        Ok(p) => format!("{} hops, cost {}", p.hops(), p.cost),
        Err(e) => e.to_string(),
    };
    record("astar", elapsed, detail);

    let (generations, elapsed) = timed(|| topological_generations(graph));
    let acyclic = generations.is_ok();
    let detail = match generations {
        Ok(g) => format!(
            "{} generations, widest {}",
            g.len(),
            g.iter().map(Vec::len).max().unwrap_or(0)
        ),
        Err(e) => e.to_string(),
    };
    record("topological", elapsed, detail);

    if acyclic {
        let executor = WavefrontExecutor::new(ExecutorConfig::with_workers(options.workers));
        let (report, elapsed) = timed(|| executor.run(graph, |_| Ok::<(), String>(())));
        let report = report?;
        record(
            "wavefront",
            elapsed,
            format!(
                "{} tasks on {} workers, peak {}",
                report.completed(),
                options.workers,
                report.peak_concurrency()
            ),
        );
    }

    Ok(Report {
        graph: name.to_string(),
        directed: graph.is_directed(),
        nodes: graph.node_count(),
        edges: graph.edge_count(),
        memory_mb: graph.memory_usage() as f64 / 1_048_576.0,
        load,
        timings,
    })
}

fn empty_report(name: &str, graph: &Graph, load: Option<LoadStats>) -> Report {
    Report {
        graph: name.to_string(),
        directed: graph.is_directed(),
        nodes: 0,
        edges: 0,
        memory_mb: 0.0,
        load,
        timings: Vec::new(),
    }
}

/// Human-readable table on stdout.
pub fn print_report(report: &Report) {
    println!("--- {} ---", report.graph);
    println!(
        "{} nodes, {} edges, {}, ~{:.1}MB",
        report.nodes,
        report.edges,
        if report.directed { "directed" } else { "undirected" },
        report.memory_mb
    );
    if let Some(load) = &report.load {
        println!(
            "Nodes load time: {:.1}ms, edges load time: {:.1}ms ({} lines skipped)",
            millis(load.node_time),
            millis(load.edge_time),
            load.skipped_lines
        );
    }
    println!();
    println!("{:>14} {:>10}  {}", "operation", "time", "result");
    println!("{:->14} {:->10}  {:->30}", "", "", "");
    for t in &report.timings {
        println!("{:>14} {:>8.1}ms  {}", t.operation, t.millis, t.detail);
    }
    println!();
}
