//! Parallel processing utilities

use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RetentionError};

/// Configuration for parallel processing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParallelConfig {
    /// Number of threads (None = use all available)
    pub n_threads: Option<usize>,
}

impl ParallelConfig {
    /// Create a new parallel configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set number of threads
    pub fn with_threads(mut self, n: usize) -> Self {
        self.n_threads = Some(n.max(1));
        self
    }

    /// Get the number of threads to use
    pub fn num_threads(&self) -> usize {
        self.n_threads.unwrap_or_else(rayon::current_num_threads)
    }

    /// Run `op` inside a dedicated pool sized by this configuration
    pub fn install<R, OP>(&self, op: OP) -> Result<R>
    where
        R: Send,
        OP: FnOnce() -> R + Send,
    {
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.num_threads())
            .build()
            .map_err(|e| RetentionError::ThreadPoolError(e.to_string()))?;

        Ok(pool.install(op))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    #[test]
    fn test_parallel_config() {
        let config = ParallelConfig::new().with_threads(4);
        assert_eq!(config.n_threads, Some(4));
        assert_eq!(config.num_threads(), 4);
    }

    #[test]
    fn test_install_runs_in_sized_pool() {
        let config = ParallelConfig::new().with_threads(2);
        let threads = config.install(rayon::current_num_threads).unwrap();
        assert_eq!(threads, 2);

        let doubled: Vec<i32> = config
            .install(|| (0..1000).into_par_iter().map(|x| x * 2).collect())
            .unwrap();
        assert_eq!(doubled[500], 1000);
    }
}
