//! Crawl supervisor: seeds the frontier and manages the worker pool.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::store::{SearchStore, StoreError};
use crate::worker::{CrawlWorker, CrawlWorkerConfig, WorkerReport, WorkerState};

#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub user_agent: String,
    pub timeout_secs: u64,
    pub max_inflight_links: usize,
}

/// Outcome of a whole crawl session, aggregated over all workers.
#[derive(Debug, Default)]
pub struct CrawlSummary {
    pub pages_processed: u64,
    /// True after a bootstrap run; the operator must restart the process
    /// to crawl against the newly seeded index.
    pub restart_required: bool,
}

struct WorkerHandle {
    worker: Arc<CrawlWorker>,
    handle: JoinHandle<WorkerReport>,
}

pub struct CrawlSupervisor {
    store: Arc<SearchStore>,
    config: SupervisorConfig,
    workers: Vec<WorkerHandle>,
    next_worker_id: usize,
    first_run: bool,
}

impl CrawlSupervisor {
    pub fn new(store: Arc<SearchStore>, config: SupervisorConfig) -> Self {
        Self {
            store,
            config,
            workers: Vec::new(),
            next_worker_id: 0,
            first_run: false,
        }
    }

    /// Seeds the frontier when nothing is pending. Returns true on a
    /// bootstrap run, which caps the pool at a single worker.
    pub fn seed(&mut self) -> Result<bool, StoreError> {
        self.first_run = self.store.seed_if_empty()?;
        if self.first_run {
            info!("Frontier empty, seeded bootstrap URL; running single bootstrap crawler");
        }
        Ok(self.first_run)
    }

    /// Spawns `count` crawl workers (one on a first run, regardless).
    pub fn start_crawlers(&mut self, count: usize) {
        let count = if self.first_run {
            if count > 1 {
                warn!(requested = count, "Bootstrap run, starting one crawler");
            }
            1usize.saturating_sub(self.workers.len())
        } else {
            count
        };

        for _ in 0..count {
            let config = CrawlWorkerConfig {
                id: self.next_worker_id,
                user_agent: self.config.user_agent.clone(),
                timeout_secs: self.config.timeout_secs,
                max_inflight_links: self.config.max_inflight_links,
                first_run: self.first_run,
            };
            self.next_worker_id += 1;

            let worker = Arc::new(CrawlWorker::new(config, Arc::clone(&self.store)));
            let handle = tokio::spawn(Arc::clone(&worker).run());
            self.workers.push(WorkerHandle { worker, handle });
        }
        info!(running = self.running_count(), "Crawlers started");
    }

    /// Asks up to `count` running workers to drain.
    pub fn stop_crawlers(&mut self, count: usize) {
        let mut remaining = count;
        for entry in self.workers.iter().rev() {
            if remaining == 0 {
                break;
            }
            if matches!(
                entry.worker.state(),
                WorkerState::Idle | WorkerState::Running
            ) {
                entry.worker.stop();
                remaining -= 1;
            }
        }
        info!(
            requested = count,
            stopped = count - remaining,
            "Stop signal sent"
        );
    }

    pub fn stop_all(&mut self) {
        for entry in &self.workers {
            entry.worker.stop();
        }
        info!("Stop signal sent to all crawlers");
    }

    pub fn running_count(&self) -> usize {
        self.workers
            .iter()
            .filter(|entry| {
                !matches!(
                    entry.worker.state(),
                    WorkerState::Draining | WorkerState::Stopped
                )
            })
            .count()
    }

    /// Waits for every worker to finish and aggregates their reports.
    pub async fn wait(self) -> CrawlSummary {
        let mut summary = CrawlSummary::default();
        for entry in self.workers {
            match entry.handle.await {
                Ok(report) => {
                    summary.pages_processed += report.pages_processed;
                    summary.restart_required |= report.restart_required;
                }
                Err(e) => warn!(error = %e, "Worker task failed"),
            }
        }
        summary
    }
}
