//! End-to-end pipeline tests: parse fetched documents, index them, link
//! their keywords and query the result. No network involved.

use std::sync::Arc;

use url::Url;

use webindex::linker::{KeywordLinker, LinkJob};
use webindex::parser::parse_document;
use webindex::query::{QueryEngine, QueryError, RESULTS_PER_PAGE};
use webindex::store::{SearchStore, BOOTSTRAP_URL};
use webindex::url_utils::{normalize_url, resolve_links};

const ROSES_PAGE: &str = r#"
    <html>
      <head>
        <title>Rose Care Guide</title>
        <meta name="description" content="Everything about growing roses.">
      </head>
      <body>
        <h1>Growing Roses</h1>
        <p>Roses need sun, water and patience. Prune roses every spring.</p>
        <a href="/plants/tulips.html">Tulips</a>
        <a href="https://tools.test/shears">Shears</a>
      </body>
    </html>"#;

const TULIPS_PAGE: &str = r#"
    <html>
      <head><title>Tulip Bulbs</title></head>
      <body>
        <h1>Tulips</h1>
        <p>Plant tulip bulbs in autumn. Tulips flower before roses do.</p>
      </body>
    </html>"#;

/// Fetch-free version of the worker's indexing round: parse, create the
/// webpage, enqueue discovered links, run the linker.
async fn index_page(store: &Arc<SearchStore>, url: &str, body: &str) -> u64 {
    let final_url = Url::parse(url).unwrap();
    let normalized = normalize_url(&final_url).unwrap();
    let host = final_url.host_str().unwrap().to_string();

    let doc = parse_document(body).unwrap();
    let domain_id = store.get_or_create_domain(&host).unwrap();
    let page = store
        .create_webpage(&normalized, Some(doc.metadata.clone()), domain_id)
        .unwrap();

    let links = resolve_links(&doc.links, &final_url);
    store.enqueue_discovered(&links);

    let job = LinkJob::new(&page, &final_url, doc);
    KeywordLinker::new(Arc::clone(store)).link(job).await;
    page.id
}

#[tokio::test]
async fn test_crawl_pipeline_end_to_end() {
    let store = Arc::new(SearchStore::new());

    let roses_id = index_page(&store, "https://www.garden.test/plants/roses.html", ROSES_PAGE).await;
    index_page(&store, "https://www.garden.test/plants/tulips.html", TULIPS_PAGE).await;

    // discovered links landed in the frontier, minus the already-indexed one
    assert!(store.exists_in_index("https://www.garden.test/plants/roses.html"));
    assert_eq!(store.frontier_len(), 1);
    let pending = store.pop_next().unwrap();
    assert_eq!(pending.url, "https://tools.test/shears");

    let engine = QueryEngine::new(Arc::clone(&store));

    // "roses" appears on both pages but dominates the rose guide
    let results = engine.search("roses", 1).unwrap();
    assert_eq!(results.total_results, 2);
    assert_eq!(
        results.hits[0].url,
        "https://www.garden.test/plants/roses.html"
    );
    assert_eq!(results.hits[0].title.as_deref(), Some("Rose Care Guide"));
    assert_eq!(
        results.hits[0].description.as_deref(),
        Some("Everything about growing roses.")
    );
    assert!(results.hits[0].score > results.hits[1].score);

    // the tulip page wins its own topic
    let results = engine.search("tulip bulbs", 1).unwrap();
    assert_eq!(
        results.hits[0].url,
        "https://www.garden.test/plants/tulips.html"
    );

    // the domain zone makes both pages findable by site name
    let results = engine.search("garden", 1).unwrap();
    assert_eq!(results.total_results, 2);
}

#[tokio::test]
async fn test_query_normalization_matches_indexing() {
    let store = Arc::new(SearchStore::new());
    let page_id = index_page(&store, "https://a.test/notes", "<html><body><p>it isn't finished</p></body></html>").await;

    let engine = QueryEngine::new(Arc::clone(&store));
    // the contraction in the query expands exactly like the indexed one
    let results = engine.search("isn't", 1).unwrap();
    assert_eq!(results.total_results, 1);
    assert_eq!(results.hits[0].url, "https://a.test/notes");

    let by_inflection = engine.search("finishing", 1).unwrap();
    assert_eq!(by_inflection.total_results, 1);
    assert_eq!(by_inflection.hits[0].url, "https://a.test/notes");

    let _ = page_id;
}

#[tokio::test]
async fn test_seed_and_requeue_lifecycle() {
    let store = Arc::new(SearchStore::new());
    assert!(store.seed_if_empty().unwrap());
    assert_eq!(store.frontier_len(), 1);
    assert!(!store.seed_if_empty().unwrap());

    let record = store.pop_next().unwrap();
    assert_eq!(record.url, BOOTSTRAP_URL);
    assert_eq!(store.frontier_len(), 0);

    // indexed pages do not block reseeding once the queue drains again
    index_page(&store, "https://moz.test/start", "<html><body><p>a starting point for the crawl</p></body></html>").await;
    assert!(store.seed_if_empty().unwrap());
    assert_eq!(store.frontier_len(), 1);
}

#[tokio::test]
async fn test_result_paging_across_many_pages() {
    let store = Arc::new(SearchStore::new());
    for i in 0..(RESULTS_PER_PAGE + 3) {
        let body = format!(
            "<html><head><title>Gadget {i}</title></head><body><p>All about the gadget, model {i}.</p></body></html>"
        );
        index_page(&store, &format!("https://shop.test/gadget-{i}"), &body).await;
    }

    let engine = QueryEngine::new(Arc::clone(&store));
    let first = engine.search("gadget", 1).unwrap();
    assert_eq!(first.total_results, RESULTS_PER_PAGE + 3);
    assert_eq!(first.hits.len(), RESULTS_PER_PAGE);

    let second = engine.search("gadget", 2).unwrap();
    assert_eq!(second.hits.len(), 3);

    assert_eq!(
        engine.search("gadget", 0).unwrap_err(),
        QueryError::InvalidPage
    );
}
