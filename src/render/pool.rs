//! Worker pool for render passes.
//!
//! A batch is submitted as a whole and joined as a whole: every item is
//! spawned into one `rayon` scope and [`ThreadPool::run_batch`] returns only
//! after all of them finished. Dropping the pool shuts the workers down.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::util::{Error, Result};

pub struct ThreadPool {
    pool: rayon::ThreadPool,
}

impl ThreadPool {
    /// Start `threads` workers; 0 picks one per logical CPU.
    pub fn new(threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("cyberay-worker-{i}"))
            .build()
            .map_err(|e| Error::ThreadPool(e.to_string()))?;
        tracing::debug!(threads = pool.current_num_threads(), "thread pool started");
        Ok(Self { pool })
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run `work` once for every item and block until the whole batch is done.
    ///
    /// A panicking item does not take the others down; the batch still
    /// drains and the failure is reported once it has.
    pub fn run_batch<T, F>(&self, items: &mut [T], work: F) -> Result<()>
    where
        T: Send,
        F: Fn(&mut T) + Sync,
    {
        let failed = AtomicUsize::new(0);
        self.pool.scope(|s| {
            for item in items.iter_mut() {
                let (work, failed) = (&work, &failed);
                s.spawn(move |_| {
                    if panic::catch_unwind(AssertUnwindSafe(|| work(item))).is_err() {
                        failed.fetch_add(1, Ordering::Relaxed);
                    }
                });
            }
        });

        match failed.into_inner() {
            0 => Ok(()),
            n => Err(Error::ThreadPool(format!("{n} of {} work items panicked", items.len()))),
        }
    }
}

impl std::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadPool")
            .field("threads", &self.num_threads())
            .finish()
    }
}
