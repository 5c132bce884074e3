use crate::error::{SceneError, SceneResult};
use rayon::ThreadPoolBuilder;
use std::future::Future;
use tokio::runtime::{Handle, Runtime};
use tokio::task::JoinHandle;

const DEFAULT_STACK: usize = 2 * 1024 * 1024;

/// Sizes of the two worker pools
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadPoolConfig {
    /// rayon workers for terrain builds
    pub job_threads: usize,
    /// tokio workers for file reads and timers
    pub async_threads: usize,
    pub stack_size: Option<usize>,
}

impl Default for ThreadPoolConfig {
    fn default() -> Self {
        let cpus = num_cpus::get();
        Self {
            job_threads: cpus,
            // Only a handful of files and one timer ever run here
            async_threads: (cpus / 4).clamp(1, 2),
            stack_size: Some(DEFAULT_STACK),
        }
    }
}

impl ThreadPoolConfig {
    fn sanitized(mut self) -> Self {
        self.job_threads = self.job_threads.max(1);
        self.async_threads = self.async_threads.max(1);
        self
    }
}

/// Worker pools owned by the scene app.
///
/// Terrain displacement runs on the rayon pool; asset reads and the
/// lightning timer run on the tokio runtime. Neither touches the scene
/// graph, results are handed back to the frame thread over channels.
pub struct ConcurrencyManager {
    jobs: rayon::ThreadPool,
    runtime: Runtime,
    config: ThreadPoolConfig,
}

impl ConcurrencyManager {
    pub fn new(config: ThreadPoolConfig) -> SceneResult<Self> {
        let config = config.sanitized();

        let mut builder = ThreadPoolBuilder::new()
            .num_threads(config.job_threads)
            .thread_name(|i| format!("stormvale-job-{i}"));
        if let Some(bytes) = config.stack_size {
            builder = builder.stack_size(bytes);
        }
        let jobs = builder.build().map_err(|e| SceneError::Config {
            reason: format!("job pool: {e}"),
        })?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(config.async_threads)
            .thread_name("stormvale-io")
            .enable_time()
            .build()?;

        tracing::info!(
            jobs = config.job_threads,
            io = config.async_threads,
            "worker pools ready"
        );
        Ok(Self { jobs, runtime, config })
    }

    /// Run `job` inside the rayon pool and wait for its result.
    ///
    /// Parallel iterators used by `job` fan out over this pool instead of
    /// the global one.
    pub fn execute_job<F, R>(&self, job: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        self.jobs.install(job)
    }

    pub fn spawn_async<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.runtime.spawn(future)
    }

    /// Handle for components that schedule their own tasks
    pub fn handle(&self) -> Handle {
        self.runtime.handle().clone()
    }

    pub fn config(&self) -> &ThreadPoolConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;
    use std::time::Duration;

    fn two_by_one() -> ConcurrencyManager {
        ConcurrencyManager::new(ThreadPoolConfig {
            job_threads: 2,
            async_threads: 1,
            stack_size: None,
        })
        .unwrap()
    }

    #[test]
    fn test_jobs_run_on_the_scene_pool() {
        let pools = two_by_one();
        let (threads, sum) = pools.execute_job(|| {
            let sum: u64 = (0..1_000u64).into_par_iter().sum();
            (rayon::current_num_threads(), sum)
        });
        assert_eq!(threads, 2);
        assert_eq!(sum, 499_500);
    }

    #[test]
    fn test_async_task_reports_over_channel() {
        let pools = two_by_one();
        let (tx, rx) = crossbeam_channel::bounded(1);
        pools.spawn_async(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let _ = tx.send("tick");
        });
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), "tick");
    }

    #[test]
    fn test_zero_threads_is_clamped() {
        let pools = ConcurrencyManager::new(ThreadPoolConfig {
            job_threads: 0,
            async_threads: 0,
            stack_size: None,
        })
        .unwrap();
        assert_eq!(pools.config().job_threads, 1);
        assert_eq!(pools.config().async_threads, 1);
    }
}
