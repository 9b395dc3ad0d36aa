//! Parallel processing strategies

use landheat_core::{Error, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Processing mode for per-cell stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
    /// Single-threaded processing
    Sequential,
    /// Parallel processing on the global rayon pool
    #[default]
    Parallel,
    /// Parallel on a dedicated pool with the given number of threads
    ParallelWith(usize),
}

/// Strategy for parallel execution
pub trait ParallelStrategy {
    /// Map a function over indices and collect results in index order
    fn par_map<T, F>(&self, range: std::ops::Range<usize>, f: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send;
}

/// Where `par_map` work runs, resolved once from a `ProcessingMode`.
///
/// A dedicated pool is built when the executor is created and shared by
/// every clone, so stages never spawn threads of their own.
#[derive(Debug, Clone)]
pub enum Executor {
    Sequential,
    /// The global rayon pool
    Global,
    Pool(Arc<rayon::ThreadPool>),
}

impl Executor {
    pub fn new(mode: ProcessingMode) -> Result<Self> {
        Ok(match mode {
            ProcessingMode::Sequential => Executor::Sequential,
            ProcessingMode::Parallel => Executor::Global,
            ProcessingMode::ParallelWith(threads) => {
                let pool = build_pool(threads)?;
                tracing::debug!(threads, "built dedicated thread pool");
                Executor::Pool(Arc::new(pool))
            }
        })
    }

    /// Worker count available to `par_map`
    pub fn threads(&self) -> usize {
        match self {
            Executor::Sequential => 1,
            Executor::Global => num_threads(),
            Executor::Pool(pool) => pool.current_num_threads(),
        }
    }
}

impl ParallelStrategy for Executor {
    fn par_map<T, F>(&self, range: std::ops::Range<usize>, f: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        match self {
            Executor::Sequential => Ok(range.map(f).collect()),
            Executor::Global => Ok(range.into_par_iter().map(f).collect()),
            Executor::Pool(pool) => Ok(pool.install(|| range.into_par_iter().map(f).collect())),
        }
    }
}

fn build_pool(threads: usize) -> Result<rayon::ThreadPool> {
    if threads == 0 {
        return Err(Error::InvalidParameter {
            name: "threads",
            value: threads.to_string(),
            reason: "must be at least 1".into(),
        });
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| Error::Other(format!("Failed to build thread pool: {}", e)))
}

/// Get the number of threads in the current pool
pub fn num_threads() -> usize {
    rayon::current_num_threads()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modes_agree() {
        let expected: Vec<usize> = (0..100).map(|i| i * i).collect();
        for mode in [
            ProcessingMode::Sequential,
            ProcessingMode::Parallel,
            ProcessingMode::ParallelWith(2),
        ] {
            let executor = Executor::new(mode).unwrap();
            assert_eq!(executor.par_map(0..100, |i| i * i).unwrap(), expected);
        }
    }

    #[test]
    fn test_zero_threads_rejected() {
        assert!(matches!(
            Executor::new(ProcessingMode::ParallelWith(0)),
            Err(Error::InvalidParameter { name: "threads", .. })
        ));
    }

    #[test]
    fn test_dedicated_pool_is_reused() {
        let executor = Executor::new(ProcessingMode::ParallelWith(2)).unwrap();
        let clone = executor.clone();
        let (Executor::Pool(a), Executor::Pool(b)) = (&executor, &clone) else {
            panic!("expected a dedicated pool");
        };
        assert!(Arc::ptr_eq(a, b));

        // Work runs on the pool's two threads, call after call
        for _ in 0..3 {
            let sizes = clone.par_map(0..16, |_| rayon::current_num_threads()).unwrap();
            assert!(sizes.iter().all(|&n| n == 2));
        }
        assert_eq!(executor.threads(), 2);
    }
}
