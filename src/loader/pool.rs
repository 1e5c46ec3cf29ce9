//! Worker pool for background loads and extractions

use tracing::{debug, warn};

use crate::extract::ExtractJob;
use crate::progress::{ArchiveId, ProgressSink, WorkerEvent};

use super::incremental::IncrementalLoader;

/// A small rayon pool; one job per archive operation.
pub struct LoaderPool {
    pool: Option<rayon::ThreadPool>,
}

impl LoaderPool {
    /// `parallel_workers` of 0 uses rayon's global pool.
    pub fn new(parallel_workers: usize) -> Self {
        if parallel_workers == 0 {
            return Self { pool: None };
        }
        match rayon::ThreadPoolBuilder::new()
            .num_threads(parallel_workers)
            .thread_name(|i| format!("arbor-worker-{}", i))
            .build()
        {
            Ok(pool) => Self { pool: Some(pool) },
            Err(err) => {
                // Fall back to rayon's global pool if custom pool creation fails
                warn!("cannot build worker pool, using the global pool: {}", err);
                Self { pool: None }
            }
        }
    }

    pub fn threads(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }

    pub fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        match &self.pool {
            Some(pool) => pool.spawn(job),
            None => rayon::spawn(job),
        }
    }

    /// Run `loader` in the background; the outcome arrives on `sink` after
    /// the load's own status events.
    pub fn spawn_load(&self, archive: ArchiveId, loader: IncrementalLoader, sink: ProgressSink) {
        self.spawn(move || {
            let kind = loader.kind();
            debug!(%archive, label = loader.label(), "load started");
            let event = match loader.run(&sink) {
                Ok(outcome) => WorkerEvent::LoadCompleted {
                    archive,
                    kind,
                    outcome,
                },
                Err(err) => WorkerEvent::LoadFailed {
                    archive,
                    message: err.to_string(),
                },
            };
            sink.send(event);
        });
    }

    /// Run an extraction batch in the background.
    pub fn spawn_extract(&self, job: ExtractJob, sink: ProgressSink) {
        self.spawn(move || {
            let report = job.run(&sink);
            sink.send(WorkerEvent::ExtractionFinished {
                archive: job.archive,
                report,
            });
        });
    }
}
