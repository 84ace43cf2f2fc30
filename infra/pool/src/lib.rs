//! # Pool
//!
//! Worker-pool profiles for the entity-task executor, built on
//! [rayon](https://docs.rs/rayon) thread pools.
//!
//! The worker count comes from the caller (usually the `mp_processes`
//! parameter), falling back to `MORAINE_POOL_WORKERS` and then to the number
//! of available cores.
//!
//! ## Example
//!
//! ```rust
//! use moraine_pool::{PoolConfig, build_pool};
//!
//! let pool = build_pool(&PoolConfig::default().with_workers(2)).unwrap();
//! let squares: Vec<u64> = pool.install(|| {
//!     use rayon::prelude::*;
//!     (1..=4u64).into_par_iter().map(|n| n * n).collect()
//! });
//! assert_eq!(squares, [1, 4, 9, 16]);
//! ```

pub use anyhow::Result;
pub use rayon::ThreadPool;

use anyhow::anyhow;
use std::sync::OnceLock;
use std::thread::available_parallelism;
use tracing::debug;

/// Environment variable that caps the default worker count.
pub const WORKERS_ENV: &str = "MORAINE_POOL_WORKERS";

/// The default number of workers if detection fails.
const DEFAULT_WORKERS: usize = 4;
const MAX_WORKERS: usize = 1024;
/// The default stack size for workers (8 `MiB`); tasks may recurse deeply.
const DEFAULT_STACK_SIZE: usize = 8 * 1024 * 1024;
/// Minimum allowed stack size (1 `MiB`).
const MIN_STACK_SIZE: usize = 1024 * 1024;
/// Maximum allowed stack size (64 `MiB`).
const MAX_STACK_SIZE: usize = 64 * 1024 * 1024;
const DEFAULT_THREAD_NAME: &str = "moraine-worker";

static DETECTED_WORKERS: OnceLock<usize> = OnceLock::new();

/// Detects the worker count from the environment or the hardware.
#[must_use]
pub fn detected_workers() -> usize {
    *DETECTED_WORKERS.get_or_init(|| {
        parse_workers(std::env::var(WORKERS_ENV).ok().as_deref()).unwrap_or_else(|| {
            available_parallelism().map(std::num::NonZero::get).unwrap_or(DEFAULT_WORKERS)
        })
    })
}

fn parse_workers(raw: Option<&str>) -> Option<usize> {
    raw.and_then(|s| s.trim().parse::<usize>().ok()).filter(|&n| n > 0 && n <= MAX_WORKERS)
}

/// Configuration of a worker pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pub workers: usize,
    pub stack_size: usize,
    pub thread_name: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: detected_workers(),
            stack_size: DEFAULT_STACK_SIZE,
            thread_name: DEFAULT_THREAD_NAME.to_owned(),
        }
    }
}

impl PoolConfig {
    /// A single worker; tasks still run off the calling thread.
    #[must_use]
    pub fn sequential() -> Self {
        Self { workers: 1, ..Self::default() }
    }

    #[must_use = "Customize the number of workers for the pool"]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.clamp(1, MAX_WORKERS);
        self
    }

    #[must_use = "Customize the stack size of pool threads"]
    pub fn with_stack_size(mut self, size: usize) -> Self {
        self.stack_size = size.clamp(MIN_STACK_SIZE, MAX_STACK_SIZE);
        self
    }

    #[must_use = "Customize the thread name prefix"]
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    fn normalized(&self) -> Self {
        let thread_name = if self.thread_name.trim().is_empty() {
            DEFAULT_THREAD_NAME.to_owned()
        } else {
            self.thread_name.clone()
        };
        Self {
            workers: self.workers.clamp(1, MAX_WORKERS),
            stack_size: self.stack_size.clamp(MIN_STACK_SIZE, MAX_STACK_SIZE),
            thread_name,
        }
    }
}

/// Builds a dedicated thread pool; threads are named `<thread_name>-<index>`.
///
/// # Errors
/// Returns an error if the OS refuses to spawn the worker threads.
pub fn build_pool(config: &PoolConfig) -> Result<ThreadPool> {
    let config = config.normalized();
    debug!(config = ?config, "Building worker pool");

    let name = config.thread_name.clone();
    rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers)
        .stack_size(config.stack_size)
        .thread_name(move |i| format!("{name}-{i}"))
        .build()
        .map_err(|e| anyhow!("Failed to initialize worker pool: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_count_is_clamped() {
        assert_eq!(PoolConfig::default().with_workers(0).workers, 1);
        assert_eq!(PoolConfig::default().with_workers(5000).workers, MAX_WORKERS);
        assert_eq!(PoolConfig::sequential().workers, 1);
    }

    #[test]
    fn stack_size_is_clamped() {
        assert_eq!(PoolConfig::default().with_stack_size(100).stack_size, MIN_STACK_SIZE);
        assert_eq!(PoolConfig::default().with_stack_size(usize::MAX).stack_size, MAX_STACK_SIZE);
    }

    #[test]
    fn env_worker_override_is_validated() {
        assert_eq!(parse_workers(Some("6")), Some(6));
        assert_eq!(parse_workers(Some(" 2 ")), Some(2));
        assert_eq!(parse_workers(Some("0")), None);
        assert_eq!(parse_workers(Some("many")), None);
        assert_eq!(parse_workers(None), None);
        assert!(detected_workers() >= 1);
    }

    #[test]
    fn pool_threads_carry_the_name() {
        let config = PoolConfig::default().with_workers(2).with_thread_name("");
        let pool = build_pool(&config).unwrap();
        assert_eq!(pool.current_num_threads(), 2);
        let name = pool.install(|| std::thread::current().name().map(str::to_owned));
        assert!(name.unwrap().starts_with("moraine-worker-"));
    }
}
