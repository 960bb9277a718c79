/// Fixed-size worker pool backing every parallel pass of the renderer.
///
/// Workers block on a shared FIFO queue. `wait_finished` is the pass barrier:
/// it returns only once the queue is empty *and* every dequeued task has
/// completed, so a worker still running the last tile keeps the caller blocked.
use crate::error::{Error, Result};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

type Task = Box<dyn FnOnce() + Send + 'static>;

struct PoolState {
    tasks: VecDeque<Task>,
    /// Enqueued tasks that have not finished running (queued + in flight).
    active: usize,
    stop: bool,
}

struct Shared {
    state: Mutex<PoolState>,
    work_available: Condvar,
    finished: Condvar,
}

pub struct ThreadPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl ThreadPool {
    /// Spawn `threads` workers (at least one).
    pub fn new(threads: usize) -> Result<Self> {
        let threads = threads.max(1);
        let shared = Arc::new(Shared {
            state: Mutex::new(PoolState {
                tasks: VecDeque::new(),
                active: 0,
                stop: false,
            }),
            work_available: Condvar::new(),
            finished: Condvar::new(),
        });

        let mut workers = Vec::with_capacity(threads);
        for index in 0..threads {
            let shared = Arc::clone(&shared);
            let handle = thread::Builder::new()
                .name(format!("raster-worker-{index}"))
                .spawn(move || worker_loop(&shared))
                .map_err(Error::Spawn)?;
            workers.push(handle);
        }

        log::debug!("thread pool started with {threads} workers");
        Ok(Self { shared, workers })
    }

    /// One worker per available hardware thread.
    pub fn with_available_parallelism() -> Result<Self> {
        let threads = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self::new(threads)
    }

    #[inline]
    pub fn thread_count(&self) -> usize {
        self.workers.len()
    }

    /// Queue a task and wake one worker. Never blocks on task execution.
    pub fn enqueue<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.enqueue_boxed(Box::new(task));
    }

    fn enqueue_boxed(&self, task: Task) {
        {
            let mut state = self.shared.state.lock();
            state.tasks.push_back(task);
            state.active += 1;
        }
        self.shared.work_available.notify_one();
    }

    /// Block until every task enqueued so far has been dequeued and completed.
    pub fn wait_finished(&self) {
        let mut state = self.shared.state.lock();
        while !(state.tasks.is_empty() && state.active == 0) {
            self.shared.finished.wait(&mut state);
        }
    }

    /// Run `f` with a [`Scope`] whose tasks may borrow from the caller's stack.
    ///
    /// The pool is drained with `wait_finished` before `scope` returns, including
    /// when `f` unwinds, so no task can outlive the data it borrows.
    pub fn scope<'env, F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Scope<'_, 'env>) -> R,
    {
        struct WaitOnDrop<'p>(&'p ThreadPool);

        impl Drop for WaitOnDrop<'_> {
            fn drop(&mut self) {
                self.0.wait_finished();
            }
        }

        let _barrier = WaitOnDrop(self);
        let scope = Scope {
            pool: self,
            _env: PhantomData,
        };
        f(&scope)
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock();
            state.stop = true;
        }
        self.shared.work_available.notify_all();

        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                log::error!("raster worker exited abnormally");
            }
        }
    }
}

/// Handle for enqueueing borrowing tasks inside [`ThreadPool::scope`].
pub struct Scope<'pool, 'env> {
    pool: &'pool ThreadPool,
    // Invariant over 'env so tasks cannot borrow anything shorter-lived.
    _env: PhantomData<&'env mut &'env ()>,
}

impl<'pool, 'env> Scope<'pool, 'env> {
    pub fn enqueue<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'env,
    {
        let task: Box<dyn FnOnce() + Send + 'env> = Box::new(task);
        // SAFETY: `ThreadPool::scope` waits for the queue to drain before
        // 'env can end, so the task never runs after its borrows expire.
        let task: Task = unsafe {
            std::mem::transmute::<Box<dyn FnOnce() + Send + 'env>, Task>(task)
        };
        self.pool.enqueue_boxed(task);
    }

    #[inline]
    pub fn thread_count(&self) -> usize {
        self.pool.thread_count()
    }
}

fn worker_loop(shared: &Shared) {
    loop {
        let task = {
            let mut state = shared.state.lock();
            while state.tasks.is_empty() && !state.stop {
                shared.work_available.wait(&mut state);
            }
            match state.tasks.pop_front() {
                Some(task) => task,
                // stop requested and the queue is drained
                None => return,
            }
        };

        if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
            log::error!("render task panicked; aborting");
            std::process::abort();
        }

        let mut state = shared.state.lock();
        state.active -= 1;
        if state.active == 0 && state.tasks.is_empty() {
            shared.finished.notify_all();
        }
    }
}
