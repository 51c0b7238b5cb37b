//! Keyword linking: turns the text zones of an indexed page into weighted
//! keyword/webpage associations.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, warn};
use url::Url;

use crate::models::Webpage;
use crate::normalizer::TermNormalizer;
use crate::parser::ParsedDocument;
use crate::store::{SearchStore, StoreError};
use crate::url_utils;

/// Weight of the registrable-domain label zone.
pub const DOMAIN_WEIGHT: i64 = 48;
/// Weight of the last-path-segment zone.
pub const URL_WEIGHT: i64 = 20;
/// Weight of the page title zone.
pub const TITLE_WEIGHT: i64 = 24;
/// Weight of the page description zone.
pub const DESCRIPTION_WEIGHT: i64 = 8;
/// Weight of the whole-body text zone.
pub const PLAIN_TEXT_WEIGHT: i64 = 1;

/// Body tag zones and their weights.
pub const BODY_ZONES: [(&str, i64); 14] = [
    ("h1", 14),
    ("h2", 12),
    ("h3", 10),
    ("h4", 6),
    ("h5", 4),
    ("h6", 4),
    ("p", 3),
    ("blockquote", 3),
    ("cite", 2),
    ("strong", 4),
    ("mark", 4),
    ("u", 3),
    ("b", 3),
    ("span", 2),
];

/// One weighted region of text from a page.
#[derive(Debug, Clone)]
pub struct Zone {
    pub name: &'static str,
    pub weight: i64,
    pub text: String,
}

impl Zone {
    pub fn new(name: &'static str, weight: i64, text: String) -> Self {
        Self { name, weight, text }
    }
}

/// Everything needed to link one indexed page, detached from the DOM so it
/// can cross task boundaries.
#[derive(Debug)]
pub struct LinkJob {
    pub webpage_id: u64,
    pub zones: Vec<Zone>,
}

impl LinkJob {
    /// Assembles the full zone list for a page: the synthetic domain and
    /// url zones, the metadata zones, and the body zones the parser
    /// extracted.
    pub fn new(page: &Webpage, final_url: &Url, doc: ParsedDocument) -> Self {
        let mut zones = Vec::with_capacity(doc.zones.len() + 4);

        if let Some(host) = final_url.host_str() {
            let label = url_utils::registrable_label(host);
            if !label.is_empty() {
                zones.push(Zone::new("domain", DOMAIN_WEIGHT, label));
            }
        }
        let stem = url_utils::path_stem(final_url);
        if !stem.is_empty() {
            zones.push(Zone::new("url", URL_WEIGHT, stem));
        }
        if let Some(title) = page.title() {
            zones.push(Zone::new("title", TITLE_WEIGHT, title.to_string()));
        }
        if let Some(description) = page.description() {
            zones.push(Zone::new(
                "description",
                DESCRIPTION_WEIGHT,
                description.to_string(),
            ));
        }
        zones.extend(doc.zones);

        Self {
            webpage_id: page.id,
            zones,
        }
    }
}

/// Runs link jobs against the store, one concurrent task per zone.
pub struct KeywordLinker {
    store: Arc<SearchStore>,
}

impl KeywordLinker {
    pub fn new(store: Arc<SearchStore>) -> Self {
        Self { store }
    }

    /// Links every zone of one page. Returns once all zone tasks finished;
    /// per-term failures are logged and skipped, they never fail the job.
    pub async fn link(&self, job: LinkJob) {
        let webpage_id = job.webpage_id;
        let mut tasks = JoinSet::new();

        for zone in job.zones {
            let store = Arc::clone(&self.store);
            tasks.spawn(async move {
                link_zone(&store, webpage_id, &zone);
            });
        }

        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                warn!(webpage_id, error = %e, "Zone linking task failed");
            }
        }
    }
}

/// Counts raw tokens in one zone, normalizes them, and upserts one
/// weighted association per resulting term. A term produced by a token
/// seen `count` times contributes `weight * count`.
fn link_zone(store: &SearchStore, webpage_id: u64, zone: &Zone) {
    let normalizer = TermNormalizer::new();

    let mut raw_counts: HashMap<String, i64> = HashMap::new();
    for token in TermNormalizer::tokenize(&zone.text) {
        *raw_counts.entry(token).or_insert(0) += 1;
    }

    let mut term_counts: HashMap<String, i64> = HashMap::new();
    for (token, count) in raw_counts {
        for term in normalizer.normalize_token(&token) {
            *term_counts.entry(term).or_insert(0) += count;
        }
    }

    for (term, count) in term_counts {
        let keyword_id = match store.get_or_create_keyword(&term) {
            Ok(id) => id,
            Err(StoreError::KeywordTooLong(_)) => {
                debug!(zone = zone.name, "Skipping overlong term");
                continue;
            }
            Err(e) => {
                warn!(webpage_id, zone = zone.name, error = %e, "Keyword lookup failed");
                continue;
            }
        };
        if let Err(e) = store.upsert_association(keyword_id, webpage_id, zone.weight * count) {
            warn!(webpage_id, zone = zone.name, error = %e, "Association upsert failed");
        }
    }
}
