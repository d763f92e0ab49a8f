use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lightweight reference to a candidate article, produced by the listing API
/// before any detail page is fetched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Headline {
    pub title: String,
    pub url: String,
}

/// A fully extracted article. Construction fails if any field cannot be
/// located in the page markup; a partially populated article never exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub url: String,
    /// Publication time as displayed by the source (`YYYY-MM-DD HH:MM`).
    /// The fixed format orders correctly as a plain string.
    pub published_at: String,
    pub content: String,
}

/// Structured summary decoded from a provider response. Both keys are
/// required; a reply that does not decode to exactly this shape is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Summary {
    pub impact: String,
    pub reason: String,
}

/// The unit of persistence: an article plus its summary, constructed only
/// once both have been produced for the same url.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizedArticle {
    pub article: Article,
    pub summary: Summary,
}

/// A stored row as returned by the retrieval surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredArticle {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub published_at: String,
    pub content: String,
    pub impact: String,
    pub reason: String,
}

/// Relevance of a headline to the configured topic. Only `High` admits a
/// headline to detail fetching and summarization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelevanceLabel {
    High,
    Medium,
    Low,
}

impl RelevanceLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelevanceLabel::High => "high",
            RelevanceLabel::Medium => "medium",
            RelevanceLabel::Low => "low",
        }
    }
}

/// Which slice of the listing a run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestMode {
    /// Wide page range, used once when the store is empty at process start.
    Bootstrap,
    /// First page only, used on every scheduled tick thereafter.
    Incremental,
}

/// Pages to request from the listing API, always in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSelection {
    Single(u32),
    /// Inclusive range.
    Range(u32, u32),
}

impl PageSelection {
    pub fn pages(&self) -> Vec<u32> {
        match *self {
            PageSelection::Single(page) => vec![page],
            PageSelection::Range(start, end) => (start..=end).collect(),
        }
    }
}

/// Outcome of processing one headline. The run loop records these instead of
/// threading errors through control flow.
#[derive(Debug)]
pub enum ItemOutcome {
    /// Classified high, fetched, summarized, and newly inserted.
    Persisted,
    /// Everything succeeded but the url was already in the store.
    Duplicate,
    /// Classified below the admission bar; no side effect.
    SkippedLowRelevance(RelevanceLabel),
    /// Transport, extraction, or evaluation failed for this item.
    Failed(IngestError),
}

/// A search hit: a freshly parsed article with a synthetic, process-local id.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub id: i64,
    #[serde(flatten)]
    pub article: Article,
}

/// HTTP transport settings shared by the listing, detail, and provider
/// clients.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "news-ingestion/0.1".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("extraction failed for {url}: {reason}")]
    Extraction { url: String, reason: String },

    #[error("model response failed its output contract: {0}")]
    Evaluation(String),

    #[error("unknown model identifier: {0}")]
    InvalidModel(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("payload decode error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl IngestError {
    pub fn extraction(url: impl Into<String>, reason: impl Into<String>) -> Self {
        IngestError::Extraction {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
