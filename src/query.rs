//! Query engine: normalizes a phrase with the same pipeline the linker
//! uses, then ranks indexed pages by their accumulated keyword scores.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;

use crate::normalizer::{TermNormalizer, TermSet};
use crate::store::SearchStore;

/// Page size of the result list.
pub const RESULTS_PER_PAGE: usize = 15;
/// Multiplier applied to exact (case-sensitive) keyword matches over
/// lowercased fallback matches.
pub const EXACT_MATCH_RATIO: f32 = 2.0;

#[derive(Debug, Error, PartialEq)]
pub enum QueryError {
    #[error("Query contains no searchable terms")]
    EmptyQuery,

    #[error("Page numbers start at 1")]
    InvalidPage,
}

#[derive(Debug, Clone)]
pub struct SearchHit {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub score: f32,
}

#[derive(Debug)]
pub struct SearchResults {
    pub total_results: usize,
    pub page_number: usize,
    pub elapsed: Duration,
    pub hits: Vec<SearchHit>,
}

pub struct QueryEngine {
    store: Arc<SearchStore>,
}

impl QueryEngine {
    pub fn new(store: Arc<SearchStore>) -> Self {
        Self { store }
    }

    /// Ranks every page matching at least one term of `phrase` and returns
    /// the requested 1-based result page. Exact keyword matches count
    /// double; ties order by webpage id so paging is deterministic.
    pub fn search(&self, phrase: &str, page_number: usize) -> Result<SearchResults, QueryError> {
        if page_number == 0 {
            return Err(QueryError::InvalidPage);
        }
        let started = Instant::now();

        let normalizer = TermNormalizer::new();
        let mut terms = TermSet::new();
        for word in phrase.split_whitespace() {
            for term in normalizer.normalize_token(word) {
                terms.insert(term);
            }
        }
        if terms.is_empty() {
            return Err(QueryError::EmptyQuery);
        }

        let mut lowered = TermSet::new();
        for term in terms.iter() {
            let lower = term.to_lowercase();
            if lower != term {
                lowered.insert(lower);
            }
        }

        let mut scores: HashMap<u64, f32> = HashMap::new();
        for term in terms.iter() {
            self.accumulate(term, EXACT_MATCH_RATIO, &mut scores);
        }
        for term in lowered.iter() {
            self.accumulate(term, 1.0, &mut scores);
        }

        let mut ranked: Vec<(u64, f32)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });

        let total_results = ranked.len();
        let start = (page_number - 1) * RESULTS_PER_PAGE;
        let hits = ranked
            .iter()
            .skip(start)
            .take(RESULTS_PER_PAGE)
            .filter_map(|&(webpage_id, score)| {
                self.store.webpage(webpage_id).map(|page| SearchHit {
                    url: page.url.clone(),
                    title: page.title().map(str::to_string),
                    description: page.description().map(str::to_string),
                    score,
                })
            })
            .collect();

        let elapsed = started.elapsed();
        debug!(
            terms = terms.len(),
            total_results,
            elapsed_ms = elapsed.as_millis() as u64,
            "Query executed"
        );

        Ok(SearchResults {
            total_results,
            page_number,
            elapsed,
            hits,
        })
    }

    fn accumulate(&self, term: &str, ratio: f32, scores: &mut HashMap<u64, f32>) {
        let Some(keyword_id) = self.store.keyword_id(term) else {
            return;
        };
        for (webpage_id, score) in self.store.associations_for(keyword_id) {
            *scores.entry(webpage_id).or_insert(0.0) += score as f32 * ratio;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Metadata;

    fn engine_with_pages(pages: &[(&str, &[(&str, i64)])]) -> (Arc<SearchStore>, QueryEngine) {
        let store = Arc::new(SearchStore::new());
        let domain_id = store.get_or_create_domain("a.test").unwrap();
        for (url, keywords) in pages {
            let page = store
                .create_webpage(
                    url,
                    Some(Metadata::new(Some("Title"), Some("Description"))),
                    domain_id,
                )
                .unwrap();
            for (term, score) in *keywords {
                let kw = store.get_or_create_keyword(term).unwrap();
                store.upsert_association(kw, page.id, *score).unwrap();
            }
        }
        (Arc::clone(&store), QueryEngine::new(store))
    }

    #[test]
    fn test_empty_query_rejected() {
        let (_, engine) = engine_with_pages(&[]);
        assert_eq!(engine.search("", 1).unwrap_err(), QueryError::EmptyQuery);
        assert_eq!(engine.search("   ", 1).unwrap_err(), QueryError::EmptyQuery);
    }

    #[test]
    fn test_page_zero_rejected() {
        let (_, engine) = engine_with_pages(&[]);
        assert_eq!(
            engine.search("rust", 0).unwrap_err(),
            QueryError::InvalidPage
        );
    }

    #[test]
    fn test_exact_match_counts_double() {
        let (_, engine) = engine_with_pages(&[("https://a.test/1", &[("rust", 10)])]);
        let results = engine.search("rust", 1).unwrap();
        assert_eq!(results.total_results, 1);
        assert_eq!(results.hits[0].score, 20.0);
        assert_eq!(results.hits[0].url, "https://a.test/1");
        assert_eq!(results.hits[0].title.as_deref(), Some("Title"));
    }

    #[test]
    fn test_phrase_sums_across_terms() {
        let (_, engine) = engine_with_pages(&[
            ("https://a.test/1", &[("rust", 10), ("crawler", 5)]),
            ("https://a.test/2", &[("crawler", 8)]),
        ]);
        let results = engine.search("rust crawler", 1).unwrap();
        assert_eq!(results.total_results, 2);
        assert_eq!(results.hits[0].url, "https://a.test/1");
        assert_eq!(results.hits[0].score, 30.0);
        assert_eq!(results.hits[1].score, 16.0);
    }

    #[test]
    fn test_query_is_normalized_like_the_index() {
        // stored keyword is the stem; the query carries an inflected form
        let (_, engine) = engine_with_pages(&[("https://a.test/1", &[("crawl", 4)])]);
        let results = engine.search("Crawling", 1).unwrap();
        assert_eq!(results.total_results, 1);
        assert_eq!(results.hits[0].score, 8.0);
    }

    #[test]
    fn test_ties_break_by_webpage_id() {
        let (_, engine) = engine_with_pages(&[
            ("https://a.test/2", &[("rust", 5)]),
            ("https://a.test/1", &[("rust", 5)]),
        ]);
        let results = engine.search("rust", 1).unwrap();
        // both score equal; the earlier-created page (lower id) comes first
        assert_eq!(results.hits[0].url, "https://a.test/2");
        assert_eq!(results.hits[1].url, "https://a.test/1");
    }

    #[test]
    fn test_pagination() {
        let pages: Vec<(String, i64)> = (0..20)
            .map(|i| (format!("https://a.test/{i}"), 20 - i as i64))
            .collect();
        let store = Arc::new(SearchStore::new());
        let domain_id = store.get_or_create_domain("a.test").unwrap();
        let kw = store.get_or_create_keyword("rust").unwrap();
        for (url, score) in &pages {
            let page = store.create_webpage(url, None, domain_id).unwrap();
            store.upsert_association(kw, page.id, *score).unwrap();
        }
        let engine = QueryEngine::new(store);

        let first = engine.search("rust", 1).unwrap();
        assert_eq!(first.total_results, 20);
        assert_eq!(first.hits.len(), RESULTS_PER_PAGE);
        assert_eq!(first.hits[0].url, "https://a.test/0");

        let second = engine.search("rust", 2).unwrap();
        assert_eq!(second.total_results, 20);
        assert_eq!(second.hits.len(), 5);

        let beyond = engine.search("rust", 3).unwrap();
        assert!(beyond.hits.is_empty());
        assert_eq!(beyond.total_results, 20);
    }

    #[test]
    fn test_unknown_terms_match_nothing() {
        let (_, engine) = engine_with_pages(&[("https://a.test/1", &[("rust", 10)])]);
        let results = engine.search("quantum", 1).unwrap();
        assert_eq!(results.total_results, 0);
        assert!(results.hits.is_empty());
    }
}
