// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Worker configuration loaded from environment variables.

use std::sync::Arc;

use crate::error::Result;

/// Sizing of the grid-building worker pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Number of worker threads for parallel row sampling.
    pub worker_threads: usize,
    /// Number of grid rows handed to a worker as one task.
    pub rows_per_task: usize,
}

impl WorkerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            worker_threads: std::env::var("TINVIEW_WORKER_THREADS")
                .unwrap_or_else(|_| num_cpus::get().to_string())
                .parse::<usize>()
                .unwrap_or_else(|_| num_cpus::get())
                .max(1),
            rows_per_task: std::env::var("TINVIEW_ROWS_PER_TASK")
                .unwrap_or_else(|_| "16".into())
                .parse::<usize>()
                .unwrap_or(16)
                .max(1),
        }
    }

    /// Build the fixed-size pool that runs row tasks.
    pub fn build_pool(&self) -> Result<Arc<rayon::ThreadPool>> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.worker_threads)
            .thread_name(|i| format!("tinview-grid-{}", i))
            .build()?;
        tracing::debug!(worker_threads = self.worker_threads, "Created grid worker pool");
        Ok(Arc::new(pool))
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_positive() {
        let config = WorkerConfig::default();
        assert!(config.worker_threads >= 1);
        assert!(config.rows_per_task >= 1);
    }

    #[test]
    fn pool_has_requested_size() {
        let config = WorkerConfig {
            worker_threads: 3,
            rows_per_task: 4,
        };
        let pool = config.build_pool().unwrap();
        assert_eq!(pool.current_num_threads(), 3);
    }
}
