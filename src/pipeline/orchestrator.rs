// 全ジョブ実行

use std::collections::HashMap;
use std::path::PathBuf;

use crate::cache::store::EstimateCache;
use crate::config::settings::Settings;
use crate::engine::Engine;
use crate::pipeline::job_runner::{JobConfig, JobResult, run_job};

/// Run multiple jobs in order, collecting results.
/// One job failure does NOT prevent other jobs from running.
pub fn run_all_jobs(jobs: &[JobConfig]) -> Vec<crate::error::Result<JobResult>> {
    run_all_jobs_with(jobs, |settings| Engine::new(settings.clone()))
}

/// [`run_all_jobs`] with a custom engine factory (e.g. a different renderer).
///
/// Jobs sharing a cache directory share one estimate cache, so identical units
/// across jobs are estimated once.
pub fn run_all_jobs_with(
    jobs: &[JobConfig],
    make_engine: impl Fn(&Settings) -> Engine,
) -> Vec<crate::error::Result<JobResult>> {
    let mut caches: HashMap<Option<PathBuf>, EstimateCache> = HashMap::new();

    jobs.iter()
        .map(|job| {
            let engine = make_engine(&job.settings);
            let cache_dir = job.settings.cache_dir.clone();
            let cache = caches.entry(cache_dir.clone()).or_insert_with(|| match cache_dir {
                Some(dir) => EstimateCache::with_dir(dir),
                None => EstimateCache::in_memory(),
            });
            run_job(&engine, cache, job)
        })
        .collect()
}
