//! Fixed-size worker pool draining one shared FIFO task queue.
//!
//! Workers are scoped threads, so tasks may borrow from the caller's stack.
//! Submission never blocks; workers park on a condition variable while the
//! queue is empty and exit once it is closed and drained.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::thread;

use parking_lot::{Condvar, Mutex};
use tracing::{trace, warn};

type Task<'env> = Box<dyn FnOnce() + Send + 'env>;

struct QueueState<'env> {
    tasks: VecDeque<Task<'env>>,
    closed: bool,
}

/// Mutex + condition variable guarded task queue.
pub struct TaskQueue<'env> {
    state: Mutex<QueueState<'env>>,
    available: Condvar,
}

impl<'env> TaskQueue<'env> {
    fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                tasks: VecDeque::new(),
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Enqueue a task and wake one idle worker.
    pub fn submit<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'env,
    {
        self.state.lock().tasks.push_back(Box::new(task));
        self.available.notify_one();
    }

    /// Tasks waiting to be picked up.
    pub fn pending(&self) -> usize {
        self.state.lock().tasks.len()
    }

    fn close(&self) {
        self.state.lock().closed = true;
        self.available.notify_all();
    }

    /// Block until a task is available. None once closed and empty.
    fn next(&self) -> Option<Task<'env>> {
        let mut state = self.state.lock();
        loop {
            if let Some(task) = state.tasks.pop_front() {
                return Some(task);
            }
            if state.closed {
                return None;
            }
            self.available.wait(&mut state);
        }
    }
}

/// Closes the queue even when the driver unwinds, so parked workers exit
/// and the scope can join them.
struct CloseOnDrop<'a, 'env>(&'a TaskQueue<'env>);

impl Drop for CloseOnDrop<'_, '_> {
    fn drop(&mut self) {
        self.0.close();
    }
}

fn run_task(task: Task<'_>) {
    if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
        warn!("pool task panicked");
    }
}

fn worker_loop(index: usize, queue: &TaskQueue<'_>) {
    let mut executed = 0usize;
    while let Some(task) = queue.next() {
        run_task(task);
        executed += 1;
    }
    trace!(worker = index, executed, "worker exiting");
}

/// A fixed number of worker threads, spawned per [`WorkerPool::scope`] call.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    /// At least one worker is always used.
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Start the workers, hand the queue to `driver` on the calling thread,
    /// then close the queue and wait for every submitted task to finish.
    ///
    /// If no worker thread could be spawned the calling thread drains the
    /// queue itself after `driver` returns.
    pub fn scope<'env, R>(&self, driver: impl FnOnce(&TaskQueue<'env>) -> R) -> R {
        let queue = TaskQueue::new();

        thread::scope(|s| {
            let mut started = 0usize;
            for index in 0..self.workers {
                let queue = &queue;
                let spawned = thread::Builder::new()
                    .name(format!("wavegraph-worker-{index}"))
                    .spawn_scoped(s, move || worker_loop(index, queue));
                match spawned {
                    Ok(_) => started += 1,
                    Err(e) => warn!(worker = index, error = %e, "failed to spawn worker"),
                }
            }

            let result = {
                let _close = CloseOnDrop(&queue);
                driver(&queue)
            };

            if started == 0 {
                worker_loop(0, &queue);
            }
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_all_tasks_run() {
        let pool = WorkerPool::new(4);
        let counter = AtomicUsize::new(0);
        pool.scope(|queue| {
            for _ in 0..100 {
                queue.submit(|| {
                    counter.fetch_add(1, Ordering::SeqCst);
                });
            }
        });
        assert_eq!(counter.load(Ordering::SeqCst), 100);
    }

    #[test]
    fn test_zero_workers_clamped() {
        let pool = WorkerPool::new(0);
        assert_eq!(pool.workers(), 1);
        let counter = AtomicUsize::new(0);
        pool.scope(|queue| {
            queue.submit(|| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        });
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_tasks_run_concurrently() {
        let pool = WorkerPool::new(3);
        let active = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        pool.scope(|queue| {
            for _ in 0..3 {
                queue.submit(|| {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(50));
                    active.fetch_sub(1, Ordering::SeqCst);
                });
            }
        });
        assert_eq!(peak.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_panicking_task_does_not_kill_pool() {
        let pool = WorkerPool::new(1);
        let counter = AtomicUsize::new(0);
        pool.scope(|queue| {
            queue.submit(|| panic!("boom"));
            queue.submit(|| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        });
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_driver_result_returned() {
        let pool = WorkerPool::new(2);
        let submitted = pool.scope(|queue| {
            queue.submit(|| {});
            7
        });
        assert_eq!(submitted, 7);
    }

    #[test]
    fn test_pending_counts_queued_tasks() {
        let pool = WorkerPool::new(1);
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let pending = pool.scope(|queue| {
            queue.submit(move || {
                started_tx.send(()).unwrap();
                release_rx.recv().unwrap();
            });
            started_rx.recv().unwrap();
            queue.submit(|| {});
            queue.submit(|| {});
            let pending = queue.pending();
            release_tx.send(()).unwrap();
            pending
        });
        assert_eq!(pending, 2);
    }

    #[test]
    fn test_driver_panic_propagates() {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let outcome = std::panic::catch_unwind(|| {
                WorkerPool::new(2).scope(|_| panic!("driver failed"))
            });
            let _ = tx.send(outcome.is_err());
        });
        let panicked = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("scope did not return after the driver panicked");
        assert!(panicked);
    }
}
