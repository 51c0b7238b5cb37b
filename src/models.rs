use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Maximum length of a stored domain name.
pub const DOMAIN_MAX_LEN: usize = 253;
/// Maximum length of a stored URL (normalized form).
pub const URL_MAX_LEN: usize = 2048;
/// Maximum length of a keyword root form.
pub const KEYWORD_MAX_LEN: usize = 64;
/// Maximum length of a webpage title.
pub const TITLE_MAX_LEN: usize = 96;
/// Maximum length of a webpage description.
pub const DESCRIPTION_MAX_LEN: usize = 160;

/// A registered domain, created the first time a host is discovered.
/// Priority is operator-editable and biases frontier scheduling.
#[derive(Debug, Clone)]
pub struct DomainName {
    pub id: u64,
    pub domain: String,
    pub priority: u8,
}

impl DomainName {
    pub fn new(id: u64, domain: String, priority: u8) -> Self {
        Self {
            id,
            domain,
            priority,
        }
    }
}

/// A pending-to-crawl entry in the frontier. Removed the instant a worker
/// pops it, regardless of fetch outcome.
#[derive(Debug, Clone)]
pub struct UrlRecord {
    pub id: u64,
    pub added_at: DateTime<Utc>,
    pub url: String,
    pub domain_id: u64,
}

impl UrlRecord {
    pub fn new(id: u64, url: String, domain_id: u64) -> Self {
        Self {
            id,
            added_at: Utc::now(),
            url,
            domain_id,
        }
    }
}

/// An indexed page. Created once after a successful fetch and parse,
/// never updated or removed.
#[derive(Debug, Clone)]
pub struct Webpage {
    pub id: u64,
    pub guid: Uuid,
    pub added_at: DateTime<Utc>,
    pub url: String,
    pub domain_id: u64,
    pub metadata: Option<Metadata>,
}

impl Webpage {
    pub fn new(id: u64, url: String, metadata: Option<Metadata>, domain_id: u64) -> Self {
        Self {
            id,
            guid: Uuid::new_v4(),
            added_at: Utc::now(),
            url,
            domain_id,
            metadata,
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.metadata.as_ref().and_then(|m| m.title.as_deref())
    }

    pub fn description(&self) -> Option<&str> {
        self.metadata.as_ref().and_then(|m| m.description.as_deref())
    }
}

/// Title and description of a webpage, sanitized on construction:
/// HTML-decoded, whitespace-collapsed, trimmed and hard-truncated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl Metadata {
    pub fn new(title: Option<&str>, description: Option<&str>) -> Self {
        Self {
            title: title.and_then(|t| sanitize(t, TITLE_MAX_LEN)),
            description: description.and_then(|d| sanitize(d, DESCRIPTION_MAX_LEN)),
        }
    }

    /// True when neither field carries any text.
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none()
    }
}

fn sanitize(raw: &str, max_len: usize) -> Option<String> {
    let decoded = html_escape::decode_html_entities(raw);
    let collapsed = decoded.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }
    Some(collapsed.chars().take(max_len).collect())
}

/// A stemmed root form, globally unique and case-sensitive. Created lazily
/// the first time a term is seen anywhere in the system.
#[derive(Debug, Clone)]
pub struct Keyword {
    pub id: u64,
    pub root_form: String,
}

/// Links a keyword to a webpage with an accumulating relevance score.
/// Unique per (keyword, webpage) pair; the score only ever grows.
#[derive(Debug, Clone)]
pub struct KeywordWebpageRecord {
    pub id: u64,
    pub keyword_id: u64,
    pub webpage_id: u64,
    pub score: i64,
}
