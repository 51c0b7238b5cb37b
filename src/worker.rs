//! Crawl worker: pops frontier URLs, fetches and parses them, creates
//! webpages and hands linking off to background tasks.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::linker::{KeywordLinker, LinkJob};
use crate::network::HttpClient;
use crate::parser::parse_document;
use crate::store::{SearchStore, StoreError};
use crate::url_utils::{is_html_content_type, normalize_url, resolve_links};

/// How long a worker sleeps when the frontier has nothing for it.
const IDLE_POLL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Running,
    Draining,
    Stopped,
}

#[derive(Debug, Clone)]
pub struct CrawlWorkerConfig {
    pub id: usize,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub max_inflight_links: usize,
    /// On a fresh store the worker stops itself after one page so the
    /// operator can restart against the bootstrapped index.
    pub first_run: bool,
}

#[derive(Debug)]
pub struct WorkerReport {
    pub worker_id: usize,
    pub pages_processed: u64,
    pub restart_required: bool,
}

pub struct CrawlWorker {
    config: CrawlWorkerConfig,
    store: Arc<SearchStore>,
    state: Mutex<WorkerState>,
}

impl CrawlWorker {
    pub fn new(config: CrawlWorkerConfig, store: Arc<SearchStore>) -> Self {
        Self {
            config,
            store,
            state: Mutex::new(WorkerState::Idle),
        }
    }

    pub fn state(&self) -> WorkerState {
        *self.state.lock()
    }

    /// Asks the worker to drain: no more pops, in-flight linking finishes.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        if matches!(*state, WorkerState::Idle | WorkerState::Running) {
            *state = WorkerState::Draining;
        }
    }

    pub async fn run(self: Arc<Self>) -> WorkerReport {
        {
            let mut state = self.state.lock();
            if matches!(*state, WorkerState::Idle) {
                *state = WorkerState::Running;
            }
        }
        info!(worker_id = self.config.id, "Crawl worker started");

        let client = HttpClient::new(&self.config.user_agent, self.config.timeout_secs);
        let mut inflight: JoinSet<()> = JoinSet::new();
        let mut pages_processed = 0u64;
        let mut restart_required = false;

        loop {
            if self.state() == WorkerState::Draining {
                break;
            }

            while inflight.len() >= self.config.max_inflight_links {
                if let Some(Err(e)) = inflight.join_next().await {
                    warn!(worker_id = self.config.id, error = %e, "Linking task failed");
                }
            }

            let Some(record) = self.store.pop_next() else {
                tokio::time::sleep(IDLE_POLL).await;
                continue;
            };

            if self
                .process_url(&client, &record.url, record.domain_id, &mut inflight)
                .await
            {
                pages_processed += 1;
                if self.config.first_run {
                    info!(
                        worker_id = self.config.id,
                        "Bootstrap page indexed, draining for restart"
                    );
                    restart_required = true;
                    self.stop();
                }
            }
        }

        while let Some(result) = inflight.join_next().await {
            if let Err(e) = result {
                warn!(worker_id = self.config.id, error = %e, "Linking task failed");
            }
        }
        *self.state.lock() = WorkerState::Stopped;
        info!(
            worker_id = self.config.id,
            pages_processed, "Crawl worker stopped"
        );

        WorkerReport {
            worker_id: self.config.id,
            pages_processed,
            restart_required,
        }
    }

    /// One fetch-parse-index round. Returns true only when a webpage was
    /// created; every failure drops the URL and moves on.
    async fn process_url(
        &self,
        client: &HttpClient,
        url: &str,
        domain_id: u64,
        inflight: &mut JoinSet<()>,
    ) -> bool {
        let worker_id = self.config.id;

        let fetched = match client.fetch(url).await {
            Ok(f) => f,
            Err(e) => {
                warn!(worker_id, url, error = %e, "Fetch failed, dropping URL");
                return false;
            }
        };
        if !fetched.is_success() {
            warn!(
                worker_id,
                url,
                status = fetched.status,
                "Non-success status, dropping URL"
            );
            return false;
        }
        if let Some(content_type) = &fetched.content_type {
            if !is_html_content_type(content_type) {
                debug!(worker_id, url, content_type = %content_type, "Skipping non-HTML document");
                return false;
            }
        }

        let Some(final_url) = normalize_url(&fetched.final_url) else {
            debug!(worker_id, url, "Final URL has no host, dropping");
            return false;
        };
        if self.store.exists_in_index(&final_url) {
            debug!(worker_id, url = %final_url, "Already indexed, dropping");
            return false;
        }

        let doc = match parse_document(&fetched.body) {
            Ok(d) => d,
            Err(e) => {
                warn!(worker_id, url, error = %e, "Parse failed, dropping URL");
                return false;
            }
        };

        let page = match self
            .store
            .create_webpage(&final_url, Some(doc.metadata.clone()), domain_id)
        {
            Ok(p) => p,
            Err(StoreError::DuplicateUrl(_)) => {
                debug!(worker_id, url = %final_url, "Lost indexing race, dropping");
                return false;
            }
            Err(e) => {
                warn!(worker_id, url = %final_url, error = %e, "Webpage creation failed");
                return false;
            }
        };

        let links = resolve_links(&doc.links, &fetched.final_url);
        let enqueued = self.store.enqueue_discovered(&links);
        debug!(
            worker_id,
            url = %final_url,
            discovered = links.len(),
            enqueued,
            "Page indexed"
        );

        let job = LinkJob::new(&page, &fetched.final_url, doc);
        let store = Arc::clone(&self.store);
        inflight.spawn(async move {
            KeywordLinker::new(store).link(job).await;
        });
        true
    }
}
