pub mod cli;
pub mod config;
pub mod linker;
pub mod logging;
pub mod models;
pub mod network;
pub mod normalizer;
pub mod parser;
pub mod query;
pub mod store;
pub mod supervisor;
pub mod url_utils;
pub mod worker;

// Re-export main types for library usage
pub use config::{ConfigError, ProgramConfig};
pub use linker::{KeywordLinker, LinkJob, Zone};
pub use models::{DomainName, Keyword, KeywordWebpageRecord, Metadata, UrlRecord, Webpage};
pub use network::{FetchError, FetchResult, HttpClient};
pub use normalizer::{TermNormalizer, TermSet};
pub use parser::{parse_document, ParseError, ParsedDocument};
pub use query::{QueryEngine, QueryError, SearchHit, SearchResults};
pub use store::{SearchStore, StoreError};
pub use supervisor::{CrawlSupervisor, CrawlSummary, SupervisorConfig};
pub use worker::{CrawlWorker, CrawlWorkerConfig, WorkerReport, WorkerState};
