use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

use webindex::cli::Cli;
use webindex::logging;
use webindex::query::QueryEngine;
use webindex::store::SearchStore;
use webindex::supervisor::{CrawlSupervisor, SupervisorConfig};

#[tokio::main]
async fn main() {
    logging::init_logging();

    let cli = Cli::parse();
    let config = match cli.resolve_config() {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    let store = Arc::new(SearchStore::new());
    let query_engine = QueryEngine::new(Arc::clone(&store));

    let mut supervisor = CrawlSupervisor::new(
        Arc::clone(&store),
        SupervisorConfig {
            user_agent: config.user_agent.clone(),
            timeout_secs: config.timeout_secs,
            max_inflight_links: config.max_inflight_links,
        },
    );
    if let Err(e) = supervisor.seed() {
        error!(error = %e, "Failed to seed the frontier");
        std::process::exit(1);
    }
    supervisor.start_crawlers(config.crawlers);

    println!("Commands: search <phrase>, status, stop <n>, stop all, exit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) | Err(_) => break,
        };
        let line = line.trim();

        if line.is_empty() {
            continue;
        } else if line == "exit" {
            break;
        } else if line == "stop all" {
            supervisor.stop_all();
        } else if let Some(rest) = line.strip_prefix("stop ") {
            match rest.trim().parse::<usize>() {
                Ok(count) => supervisor.stop_crawlers(count),
                Err(_) => println!("Usage: stop <n> | stop all"),
            }
        } else if line == "status" {
            println!(
                "crawlers running: {}, frontier: {}, webpages: {}, keywords: {}",
                supervisor.running_count(),
                store.frontier_len(),
                store.webpage_count(),
                store.keyword_count(),
            );
        } else if let Some(phrase) = line.strip_prefix("search ") {
            run_search(&query_engine, phrase);
        } else {
            println!("Unknown command: {line}");
        }
    }

    supervisor.stop_all();
    let summary = supervisor.wait().await;
    info!(
        pages_processed = summary.pages_processed,
        "Crawl session finished"
    );
    if summary.restart_required {
        warn!("Bootstrap crawl complete; restart the process to begin the full crawl");
    }
}

fn run_search(engine: &QueryEngine, phrase: &str) {
    match engine.search(phrase, 1) {
        Ok(results) => {
            println!(
                "{} results ({} ms)",
                results.total_results,
                results.elapsed.as_millis()
            );
            for (rank, hit) in results.hits.iter().enumerate() {
                println!(
                    "{:2}. [{:.1}] {}",
                    rank + 1,
                    hit.score,
                    hit.title.as_deref().unwrap_or("(untitled)")
                );
                println!("      {}", hit.url);
                if let Some(description) = &hit.description {
                    println!("      {description}");
                }
            }
        }
        Err(e) => println!("{e}"),
    }
}
