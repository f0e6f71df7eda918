//! The worker pool: N search threads sharing one transposition table and
//! one stop flag. Workers park on a condition variable between searches;
//! the coordinator hands out a position and budget under each worker's
//! mutex and wakes it. Worker 0 owns all output and the wall clock.

use crate::board::Position;
use crate::search::tt::{DEFAULT_TT_MB, TT};
use crate::search::{MAX_PLY, Search, SearchResult};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;

/// Search recursion carries a move picker per frame; give workers room.
const SEARCH_STACK_SIZE: usize = 32 * 1024 * 1024;

struct Job {
    search: Search,
    pos: Position,
    node_search: bool,
    max_nodes: u64,
    max_depth: i32,
    time_in_ms: u64,
    is_waiting: bool,
    exit: bool,
    result: Option<SearchResult>,
}

struct Worker {
    job: Mutex<Job>,
    cv: Condvar,
}

pub struct Threads {
    workers: Vec<Arc<Worker>>,
    handles: Vec<JoinHandle<()>>,
    pub tt: Arc<TT>,
    is_stopped: Arc<AtomicBool>,
}

impl Threads {
    pub fn new(num_threads: usize) -> Self {
        let mut pool = Threads {
            workers: Vec::new(),
            handles: Vec::new(),
            tt: Arc::new(TT::new(DEFAULT_TT_MB)),
            is_stopped: Arc::new(AtomicBool::new(true)),
        };
        pool.spawn(num_threads.max(1));
        pool
    }

    fn spawn(&mut self, num_threads: usize) {
        let counters: Arc<Vec<AtomicU64>> =
            Arc::new((0..num_threads).map(|_| AtomicU64::new(0)).collect());

        for id in 0..num_threads {
            let search = Search::new(
                Arc::clone(&self.tt),
                Arc::clone(&self.is_stopped),
                Arc::clone(&counters),
                id,
            );
            let worker = Arc::new(Worker {
                job: Mutex::new(Job {
                    search,
                    pos: Position::startpos(),
                    node_search: false,
                    max_nodes: 0,
                    max_depth: MAX_PLY as i32 - 1,
                    time_in_ms: 0,
                    is_waiting: true,
                    exit: false,
                    result: None,
                }),
                cv: Condvar::new(),
            });

            let for_thread = Arc::clone(&worker);
            let handle = std::thread::Builder::new()
                .name(format!("search-{}", id))
                .stack_size(SEARCH_STACK_SIZE)
                .spawn(move || worker_loop(for_thread))
                .expect("failed to spawn search worker");

            self.workers.push(worker);
            self.handles.push(handle);
        }
    }

    pub fn num_threads(&self) -> usize {
        self.workers.len()
    }

    /// Tear down and respawn with a new thread count. Only valid between
    /// searches.
    pub fn resize(&mut self, num_threads: usize) {
        self.exit_threads();
        self.workers.clear();
        self.spawn(num_threads.max(1));
    }

    fn dispatch(&self, configure: impl Fn(&mut Job)) {
        self.tt.next_generation();
        self.is_stopped.store(false, Ordering::Relaxed);
        for worker in &self.workers {
            let mut job = worker.job.lock();
            configure(&mut job);
            job.result = None;
            job.is_waiting = false;
            worker.cv.notify_all();
        }
    }

    pub fn time_search(&self, pos: &Position, time_in_ms: u64) {
        self.dispatch(|job| {
            job.pos = pos.clone();
            job.node_search = false;
            job.max_nodes = 0;
            job.max_depth = MAX_PLY as i32 - 1;
            job.time_in_ms = time_in_ms;
        });
    }

    pub fn node_search(&self, pos: &Position, nodes: u64) {
        self.dispatch(|job| {
            job.pos = pos.clone();
            job.node_search = true;
            job.max_nodes = nodes;
            job.max_depth = MAX_PLY as i32 - 1;
        });
    }

    pub fn infinite_search(&self, pos: &Position) {
        self.time_search(pos, 999_999_999);
    }

    /// Flip the stop flag and block until every worker is parked again.
    pub fn stop(&self) {
        self.is_stopped.store(true, Ordering::Relaxed);
        self.wait_for_finish();
    }

    /// Block until the current search completes on every worker.
    pub fn wait_for_finish(&self) {
        for worker in &self.workers {
            let mut job = worker.job.lock();
            while !job.is_waiting {
                worker.cv.wait(&mut job);
            }
        }
    }

    /// Per-worker results of the last completed search.
    pub fn results(&self) -> Vec<SearchResult> {
        self.workers
            .iter()
            .filter_map(|worker| worker.job.lock().result)
            .collect()
    }

    pub fn new_game(&self) {
        self.stop();
        self.tt.clear();
        for worker in &self.workers {
            worker.job.lock().search.clear_history();
        }
    }

    fn exit_threads(&mut self) {
        self.is_stopped.store(true, Ordering::Relaxed);
        for worker in &self.workers {
            let mut job = worker.job.lock();
            job.exit = true;
            job.is_waiting = false;
            worker.cv.notify_all();
        }
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for Threads {
    fn drop(&mut self) {
        self.exit_threads();
    }
}

fn worker_loop(worker: Arc<Worker>) {
    let mut job = worker.job.lock();
    loop {
        while job.is_waiting {
            worker.cv.wait(&mut job);
        }
        job.is_waiting = true;

        if job.exit {
            break;
        }

        // the job mutex stays held for the whole search; the coordinator
        // synchronizes by waiting for is_waiting under this lock
        let Job {
            search,
            pos,
            node_search,
            max_nodes,
            max_depth,
            time_in_ms,
            result,
            ..
        } = &mut *job;

        let mut search_pos = pos.clone();
        let outcome = if *node_search {
            search.node_search(&mut search_pos, *max_depth, *max_nodes)
        } else {
            search.time_search(&mut search_pos, *max_depth, *time_in_ms)
        };
        *result = Some(outcome);

        worker.cv.notify_all();
    }
}
