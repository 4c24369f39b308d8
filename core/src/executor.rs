//! Wavefront execution of per-node work in dependency order.
//!
//! Every node gets a latch counting its in-arcs. The topological walk
//! submits one task per node to the worker pool without waiting; each task
//! blocks on its own latch, runs the work, then counts down the latches of
//! its direct successors. Submission order is topological and the queue is
//! FIFO, so a worker never waits on a task that is still queued behind it.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashMap;
use tracing::{debug, trace, warn};

use crate::error::Result;
use crate::graph::{EdgeId, Graph, Node, NodeId};
use crate::pool::WorkerPool;
use crate::topological::{in_arc_counts, topological_sort};

/// Executor settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Worker threads in the pool.
    pub workers: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        let workers = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(2);
        Self { workers }
    }
}

impl ExecutorConfig {
    pub fn with_workers(workers: usize) -> Self {
        Self { workers }
    }
}

/// State of the dependency an edge expresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyStatus {
    /// Source task has not started.
    Inactive,
    /// Source task is running.
    Active,
    /// Source task finished; the target may proceed.
    Done,
    /// Source task failed or was skipped.
    Failed,
}

/// What happened to a node's task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed,
    Failed,
    /// Not run because a predecessor failed or was skipped.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    pub node: NodeId,
    pub name: String,
    pub message: String,
}

/// Result of one executor run.
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    order: Vec<NodeId>,
    outcomes: FxHashMap<NodeId, TaskOutcome>,
    edge_status: FxHashMap<EdgeId, DependencyStatus>,
    failures: Vec<TaskFailure>,
    peak_concurrency: usize,
}

impl ExecutionReport {
    /// Submission order (topological).
    pub fn order(&self) -> &[NodeId] {
        &self.order
    }

    pub fn outcome(&self, node: NodeId) -> Option<TaskOutcome> {
        self.outcomes.get(&node).copied()
    }

    pub fn edge_status(&self, edge: EdgeId) -> Option<DependencyStatus> {
        self.edge_status.get(&edge).copied()
    }

    pub fn completed(&self) -> usize {
        self.count(TaskOutcome::Completed)
    }

    pub fn skipped(&self) -> usize {
        self.count(TaskOutcome::Skipped)
    }

    pub fn failures(&self) -> &[TaskFailure] {
        &self.failures
    }

    /// Most tasks observed running their work at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak_concurrency
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.skipped() == 0
    }

    pub fn all_edges_done(&self) -> bool {
        self.edge_status
            .values()
            .all(|s| *s == DependencyStatus::Done)
    }

    fn count(&self, outcome: TaskOutcome) -> usize {
        self.outcomes.values().filter(|o| **o == outcome).count()
    }
}

/// Counting barrier that opens once every predecessor has reported in.
struct DependencyLatch {
    state: Mutex<LatchState>,
    released: Condvar,
}

struct LatchState {
    remaining: usize,
    poisoned: bool,
}

impl DependencyLatch {
    fn new(count: usize) -> Self {
        Self {
            state: Mutex::new(LatchState {
                remaining: count,
                poisoned: false,
            }),
            released: Condvar::new(),
        }
    }

    fn count_down(&self, poisoned: bool) {
        let mut state = self.state.lock();
        state.remaining = state.remaining.saturating_sub(1);
        state.poisoned |= poisoned;
        if state.remaining == 0 {
            self.released.notify_all();
        }
    }

    /// Block until open. False if any predecessor did not complete.
    fn wait(&self) -> bool {
        let mut state = self.state.lock();
        while state.remaining > 0 {
            self.released.wait(&mut state);
        }
        !state.poisoned
    }
}

/// State shared by every task of one run.
struct Run<'g, N, E, F> {
    graph: &'g Graph<N, E>,
    work: &'g F,
    latches: FxHashMap<NodeId, DependencyLatch>,
    edge_status: FxHashMap<EdgeId, Mutex<DependencyStatus>>,
    outcomes: Mutex<FxHashMap<NodeId, TaskOutcome>>,
    failures: Mutex<Vec<TaskFailure>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl<'g, N, E, F, Err> Run<'g, N, E, F>
where
    F: Fn(&Node<N>) -> std::result::Result<(), Err>,
    Err: fmt::Display,
{
    fn new(graph: &'g Graph<N, E>, work: &'g F) -> Self {
        Self {
            graph,
            work,
            latches: in_arc_counts(graph)
                .into_iter()
                .map(|(id, count)| (id, DependencyLatch::new(count)))
                .collect(),
            edge_status: graph
                .edges()
                .map(|e| (e.id(), Mutex::new(DependencyStatus::Inactive)))
                .collect(),
            outcomes: Mutex::new(FxHashMap::default()),
            failures: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    fn set_out_status(&self, id: NodeId, status: DependencyStatus) {
        for (_, edge) in self.graph.arcs(id) {
            if let Some(slot) = self.edge_status.get(&edge.id()) {
                *slot.lock() = status;
            }
        }
    }

    fn release_successors(&self, id: NodeId, poisoned: bool) {
        for (next, _) in self.graph.arcs(id) {
            if let Some(latch) = self.latches.get(&next) {
                latch.count_down(poisoned);
            }
        }
    }

    fn record(&self, id: NodeId, outcome: TaskOutcome) {
        self.outcomes.lock().insert(id, outcome);
    }

    /// Body of the task scheduled for `id`.
    fn run_node(&self, id: NodeId) {
        let ready = self.latches.get(&id).map_or(true, DependencyLatch::wait);
        let Some(node) = self.graph.node(id).filter(|_| ready) else {
            trace!(node = id.0, "skipping task");
            self.set_out_status(id, DependencyStatus::Failed);
            self.record(id, TaskOutcome::Skipped);
            self.release_successors(id, true);
            return;
        };

        self.set_out_status(id, DependencyStatus::Active);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let result = panic::catch_unwind(AssertUnwindSafe(|| (self.work)(node)));
        self.active.fetch_sub(1, Ordering::SeqCst);

        let failure = match result {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(payload) => Some(panic_message(payload.as_ref())),
        };

        match failure {
            None => {
                trace!(node = id.0, "task completed");
                self.set_out_status(id, DependencyStatus::Done);
                self.record(id, TaskOutcome::Completed);
                self.release_successors(id, false);
            }
            Some(message) => {
                warn!(node = id.0, name = node.name(), error = %message, "task failed");
                self.set_out_status(id, DependencyStatus::Failed);
                self.record(id, TaskOutcome::Failed);
                self.failures.lock().push(TaskFailure {
                    node: id,
                    name: node.name().to_string(),
                    message,
                });
                self.release_successors(id, true);
            }
        }
    }

    fn into_report(self, order: Vec<NodeId>) -> ExecutionReport {
        let mut failures = self.failures.into_inner();
        failures.sort_by_key(|f| f.node);
        ExecutionReport {
            order,
            outcomes: self.outcomes.into_inner(),
            edge_status: self
                .edge_status
                .into_iter()
                .map(|(id, status)| (id, status.into_inner()))
                .collect(),
            failures,
            peak_concurrency: self.peak.into_inner(),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "task panicked".to_string()
    }
}

/// Runs one unit of work per node, concurrently where the dependency
/// graph allows it.
#[derive(Debug, Clone, Default)]
pub struct WavefrontExecutor {
    config: ExecutorConfig,
}

impl WavefrontExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Run `work` for every node. For each edge `u -> v`, `v`'s work starts
    /// only after `u`'s has finished.
    ///
    /// A task whose work errors or panics is recorded as failed and its
    /// descendants are skipped; independent tasks still run. Fails with
    /// [`crate::GraphError::CycleDetected`] if the graph has a cycle, after
    /// the tasks already submitted have finished.
    pub fn run<N, E, F, Err>(&self, graph: &Graph<N, E>, work: F) -> Result<ExecutionReport>
    where
        N: Sync,
        E: Sync,
        F: Fn(&Node<N>) -> std::result::Result<(), Err> + Sync,
        Err: fmt::Display,
    {
        let pool = WorkerPool::new(self.config.workers);
        debug!(
            workers = pool.workers(),
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "wavefront run starting"
        );

        let run = Run::new(graph, &work);
        let submitted = pool.scope(|queue| {
            let run = &run;
            topological_sort(graph, |node| {
                let id = node.id();
                queue.submit(move || run.run_node(id));
            })
        });

        let order = submitted?;
        let report = run.into_report(order);
        debug!(
            completed = report.completed(),
            failed = report.failures().len(),
            skipped = report.skipped(),
            peak = report.peak_concurrency(),
            "wavefront run finished"
        );
        Ok(report)
    }
}
