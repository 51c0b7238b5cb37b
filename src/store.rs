//! In-process shared store for the frontier and the keyword index.
//!
//! The frontier lives behind a single mutex so pop (read plus delete) is
//! atomic. Entity tables are DashMaps keyed by id with secondary maps for
//! the unique natural keys. Lock order is always frontier first, then any
//! DashMap shard, never the reverse.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;
use tracing::debug;

use crate::models::{
    DomainName, Keyword, KeywordWebpageRecord, Metadata, UrlRecord, Webpage, DOMAIN_MAX_LEN,
    KEYWORD_MAX_LEN, URL_MAX_LEN,
};
use crate::url_utils::NormalizedUrl;

/// Where every fresh crawl starts.
pub const BOOTSTRAP_URL: &str = "https://moz.com/top500/";
const BOOTSTRAP_HOST: &str = "moz.com";
const BOOTSTRAP_PRIORITY: u8 = 1;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Domain name exceeds {DOMAIN_MAX_LEN} characters: {0}")]
    DomainTooLong(String),

    #[error("URL exceeds {URL_MAX_LEN} characters")]
    UrlTooLong(String),

    #[error("Keyword exceeds {KEYWORD_MAX_LEN} characters: {0}")]
    KeywordTooLong(String),

    #[error("URL already indexed: {0}")]
    DuplicateUrl(String),

    #[error("Unknown webpage id: {0}")]
    UnknownWebpage(u64),
}

#[derive(Default)]
struct FrontierInner {
    records: HashMap<u64, UrlRecord>,
    by_url: HashSet<String>,
    by_domain: HashMap<u64, Vec<u64>>,
}

/// Shared by every worker and the query engine. Cheap to clone behind an
/// `Arc`; all methods take `&self`.
pub struct SearchStore {
    frontier: Mutex<FrontierInner>,

    domains: DashMap<u64, DomainName>,
    domain_by_name: DashMap<String, u64>,

    webpages: DashMap<u64, Webpage>,
    webpage_by_url: DashMap<String, u64>,

    keywords: DashMap<u64, Keyword>,
    keyword_by_form: DashMap<String, u64>,

    // outer entry lock serializes all upserts for one keyword
    associations: DashMap<u64, HashMap<u64, KeywordWebpageRecord>>,

    next_domain_id: AtomicU64,
    next_url_id: AtomicU64,
    next_webpage_id: AtomicU64,
    next_keyword_id: AtomicU64,
    next_association_id: AtomicU64,
}

impl Default for SearchStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchStore {
    pub fn new() -> Self {
        Self {
            frontier: Mutex::new(FrontierInner::default()),
            domains: DashMap::new(),
            domain_by_name: DashMap::new(),
            webpages: DashMap::new(),
            webpage_by_url: DashMap::new(),
            keywords: DashMap::new(),
            keyword_by_form: DashMap::new(),
            associations: DashMap::new(),
            next_domain_id: AtomicU64::new(1),
            next_url_id: AtomicU64::new(1),
            next_webpage_id: AtomicU64::new(1),
            next_keyword_id: AtomicU64::new(1),
            next_association_id: AtomicU64::new(1),
        }
    }

    /// Plants the bootstrap URL whenever nothing is pending, regardless
    /// of how much is already indexed. Returns true when it seeded. The
    /// one exception is a bootstrap URL that is itself already indexed;
    /// requeueing it would put it in frontier and index at once.
    pub fn seed_if_empty(&self) -> Result<bool, StoreError> {
        {
            let frontier = self.frontier.lock();
            if !frontier.records.is_empty() {
                return Ok(false);
            }
        }

        let domain_id = self.get_or_create_domain(BOOTSTRAP_HOST)?;
        self.set_domain_priority(domain_id, BOOTSTRAP_PRIORITY);

        let mut frontier = self.frontier.lock();
        if !frontier.records.is_empty() {
            return Ok(false);
        }
        if self.webpage_by_url.contains_key(BOOTSTRAP_URL) {
            return Ok(false);
        }
        let id = self.next_url_id.fetch_add(1, Ordering::Relaxed);
        let record = UrlRecord::new(id, BOOTSTRAP_URL.to_string(), domain_id);
        frontier.by_url.insert(record.url.clone());
        frontier.by_domain.entry(domain_id).or_default().push(id);
        frontier.records.insert(id, record);
        Ok(true)
    }

    /// Pops one pending URL, removing it from the frontier atomically.
    ///
    /// Domain choice is weighted: a coin flip picks between the
    /// zero-priority and prioritized domain buckets (falling back to
    /// whichever is non-empty), then a uniform domain, then any record of
    /// that domain.
    pub fn pop_next(&self) -> Option<UrlRecord> {
        let mut frontier = self.frontier.lock();
        if frontier.records.is_empty() {
            return None;
        }

        let (mut zero, mut prioritized): (Vec<u64>, Vec<u64>) = (Vec::new(), Vec::new());
        for (&domain_id, ids) in &frontier.by_domain {
            if ids.is_empty() {
                continue;
            }
            let priority = self
                .domains
                .get(&domain_id)
                .map(|d| d.priority)
                .unwrap_or(0);
            if priority == 0 {
                zero.push(domain_id);
            } else {
                prioritized.push(domain_id);
            }
        }

        let mut rng = rand::thread_rng();
        let bucket = if zero.is_empty() {
            &prioritized
        } else if prioritized.is_empty() || rng.gen_bool(0.5) {
            &zero
        } else {
            &prioritized
        };
        let domain_id = *bucket.choose(&mut rng)?;

        let (record_id, drained) = {
            let ids = frontier.by_domain.get_mut(&domain_id)?;
            let record_id = ids.pop()?;
            (record_id, ids.is_empty())
        };
        if drained {
            frontier.by_domain.remove(&domain_id);
        }
        let record = frontier.records.remove(&record_id)?;
        frontier.by_url.remove(&record.url);
        Some(record)
    }

    /// Adds discovered links to the frontier, skipping anything already
    /// pending or already indexed. Returns how many were added.
    pub fn enqueue_discovered(&self, links: &[NormalizedUrl]) -> usize {
        let mut added = 0;
        for link in links {
            if link.url.len() > URL_MAX_LEN {
                debug!(url_len = link.url.len(), "Skipping overlong URL");
                continue;
            }
            if self.webpage_by_url.contains_key(&link.url) {
                continue;
            }
            let domain_id = match self.get_or_create_domain(&link.host) {
                Ok(id) => id,
                Err(e) => {
                    debug!(host = %link.host, error = %e, "Skipping link");
                    continue;
                }
            };

            let mut frontier = self.frontier.lock();
            if frontier.by_url.contains(&link.url) {
                continue;
            }
            // re-check under the frontier lock so a racing create_webpage
            // cannot resurrect an indexed URL
            if self.webpage_by_url.contains_key(&link.url) {
                continue;
            }
            let id = self.next_url_id.fetch_add(1, Ordering::Relaxed);
            let record = UrlRecord::new(id, link.url.clone(), domain_id);
            frontier.by_url.insert(record.url.clone());
            frontier.by_domain.entry(domain_id).or_default().push(id);
            frontier.records.insert(id, record);
            added += 1;
        }
        added
    }

    pub fn exists_in_index(&self, url: &str) -> bool {
        self.webpage_by_url.contains_key(url)
    }

    /// Creates the webpage for a fetched URL. The frontier lock is held
    /// from the purge through the index insertion, so a concurrent
    /// enqueue can never observe the URL in neither structure and requeue
    /// it; the URL moves from frontier to index in one step.
    pub fn create_webpage(
        &self,
        url: &str,
        metadata: Option<Metadata>,
        domain_id: u64,
    ) -> Result<Webpage, StoreError> {
        if url.len() > URL_MAX_LEN {
            return Err(StoreError::UrlTooLong(url.to_string()));
        }

        let mut frontier = self.frontier.lock();
        if frontier.by_url.remove(url) {
            let stale: Vec<u64> = frontier
                .records
                .iter()
                .filter(|(_, r)| r.url == url)
                .map(|(&id, _)| id)
                .collect();
            for id in stale {
                if let Some(record) = frontier.records.remove(&id) {
                    if let Some(ids) = frontier.by_domain.get_mut(&record.domain_id) {
                        ids.retain(|&i| i != id);
                        if ids.is_empty() {
                            frontier.by_domain.remove(&record.domain_id);
                        }
                    }
                }
            }
        }

        match self.webpage_by_url.entry(url.to_string()) {
            Entry::Occupied(_) => Err(StoreError::DuplicateUrl(url.to_string())),
            Entry::Vacant(slot) => {
                let id = self.next_webpage_id.fetch_add(1, Ordering::Relaxed);
                let metadata = metadata.filter(|m| !m.is_empty());
                let page = Webpage::new(id, url.to_string(), metadata, domain_id);
                self.webpages.insert(id, page.clone());
                slot.insert(id);
                Ok(page)
            }
        }
    }

    /// Returns the domain id for a host, registering it with priority 0 on
    /// first sight. Atomic under the name entry lock.
    pub fn get_or_create_domain(&self, host: &str) -> Result<u64, StoreError> {
        if host.len() > DOMAIN_MAX_LEN {
            return Err(StoreError::DomainTooLong(host.to_string()));
        }
        match self.domain_by_name.entry(host.to_string()) {
            Entry::Occupied(existing) => Ok(*existing.get()),
            Entry::Vacant(slot) => {
                let id = self.next_domain_id.fetch_add(1, Ordering::Relaxed);
                self.domains
                    .insert(id, DomainName::new(id, host.to_string(), 0));
                slot.insert(id);
                Ok(id)
            }
        }
    }

    pub fn set_domain_priority(&self, domain_id: u64, priority: u8) {
        if let Some(mut domain) = self.domains.get_mut(&domain_id) {
            domain.priority = priority;
        }
    }

    /// Returns the keyword id for a root form, creating it on first sight.
    /// Root forms are case-sensitive and immutable once created.
    pub fn get_or_create_keyword(&self, root_form: &str) -> Result<u64, StoreError> {
        if root_form.len() > KEYWORD_MAX_LEN {
            return Err(StoreError::KeywordTooLong(root_form.to_string()));
        }
        match self.keyword_by_form.entry(root_form.to_string()) {
            Entry::Occupied(existing) => Ok(*existing.get()),
            Entry::Vacant(slot) => {
                let id = self.next_keyword_id.fetch_add(1, Ordering::Relaxed);
                self.keywords.insert(
                    id,
                    Keyword {
                        id,
                        root_form: root_form.to_string(),
                    },
                );
                slot.insert(id);
                Ok(id)
            }
        }
    }

    /// Adds `delta` to the association between a keyword and a webpage,
    /// creating the record at `delta` if none exists. Serialized per
    /// keyword so concurrent zones cannot drop an increment.
    pub fn upsert_association(
        &self,
        keyword_id: u64,
        webpage_id: u64,
        delta: i64,
    ) -> Result<(), StoreError> {
        if !self.webpages.contains_key(&webpage_id) {
            return Err(StoreError::UnknownWebpage(webpage_id));
        }
        let mut by_webpage = self.associations.entry(keyword_id).or_default();
        by_webpage
            .entry(webpage_id)
            .and_modify(|record| record.score += delta)
            .or_insert_with(|| KeywordWebpageRecord {
                id: self.next_association_id.fetch_add(1, Ordering::Relaxed),
                keyword_id,
                webpage_id,
                score: delta,
            });
        Ok(())
    }

    /// Exact (case-sensitive) keyword lookup.
    pub fn keyword_id(&self, root_form: &str) -> Option<u64> {
        self.keyword_by_form.get(root_form).map(|id| *id)
    }

    /// All (webpage id, score) pairs for one keyword.
    pub fn associations_for(&self, keyword_id: u64) -> Vec<(u64, i64)> {
        self.associations
            .get(&keyword_id)
            .map(|by_webpage| {
                by_webpage
                    .values()
                    .map(|r| (r.webpage_id, r.score))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn webpage(&self, id: u64) -> Option<Webpage> {
        self.webpages.get(&id).map(|p| p.value().clone())
    }

    pub fn frontier_len(&self) -> usize {
        self.frontier.lock().records.len()
    }

    pub fn webpage_count(&self) -> usize {
        self.webpages.len()
    }

    pub fn keyword_count(&self) -> usize {
        self.keywords.len()
    }
}
