mod generators;
mod harness;
mod loader;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use generators::Shape;
use harness::{print_report, run_harness, HarnessOptions, MethodArg, Report};

#[derive(Parser)]
#[command(name = "wavegraph-bench")]
#[command(about = "Load or generate graphs and time the wavegraph algorithms")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print the report as JSON instead of a table
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Clone)]
struct RunArgs {
    /// Worker threads for the wavefront executor
    #[arg(long, env = "WAVEGRAPH_WORKERS", default_value_t = 4)]
    workers: usize,

    /// Shortest-path method
    #[arg(long, value_enum, default_value_t = MethodArg::Auto)]
    method: MethodArg,

    /// Source node name (defaults to the lowest node id)
    #[arg(long)]
    source: Option<String>,

    /// Seed for the randomized shortest-path sampler
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a benchmark directory (`name/name.v` + `name/name.e`)
    Load {
        /// One or more benchmark directories
        #[arg(required = true)]
        dirs: Vec<PathBuf>,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Generate a synthetic graph
    Synth {
        #[arg(long, value_enum, default_value_t = Shape::Grid)]
        shape: Shape,

        #[arg(long, default_value_t = 10_000)]
        nodes: u64,

        /// Generator seed
        #[arg(long = "graph-seed", default_value_t = 42)]
        graph_seed: u64,

        /// Build an undirected graph
        #[arg(long)]
        undirected: bool,

        #[command(flatten)]
        run: RunArgs,
    },
}

impl RunArgs {
    fn options(&self) -> HarnessOptions {
        HarnessOptions {
            source: self.source.clone(),
            method: self.method,
            workers: self.workers,
            seed: self.seed,
        }
    }
}

/// Filter directives for the subscriber: `-v` forces debug, otherwise
/// `RUST_LOG` applies, falling back to info.
fn log_filter(verbose: bool, rust_log: Option<&str>) -> String {
    match rust_log.map(str::trim) {
        _ if verbose => "debug".to_string(),
        Some(directives) if !directives.is_empty() => directives.to_string(),
        _ => "info".to_string(),
    }
}

fn setup_logging(verbose: bool) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let directives = log_filter(verbose, rust_log.as_deref());
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

fn emit(reports: &[Report], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(reports)?);
    } else {
        for report in reports {
            print_report(report);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let reports = match &cli.command {
        Commands::Load { dirs, run } => {
            let options = run.options();
            let mut reports = Vec::with_capacity(dirs.len());
            for dir in dirs {
                let (graph, stats) = loader::load_benchmark(dir)?;
                let name = stats.name.clone();
                reports.push(run_harness(&name, &graph, Some(stats), &options)?);
            }
            reports
        }
        Commands::Synth {
            shape,
            nodes,
            graph_seed,
            undirected,
            run,
        } => {
            let t = Instant::now();
            let graph = shape.generate(*nodes, *graph_seed, *undirected);
            info!(
                shape = shape.label(),
                nodes = graph.node_count(),
                edges = graph.edge_count(),
                secs = t.elapsed().as_secs_f64(),
                "generated"
            );
            vec![run_harness(shape.label(), &graph, None, &run.options())?]
        }
    };

    emit(&reports, cli.json)
}
