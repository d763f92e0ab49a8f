use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::llm_adapter::LlmAdapter;
use crate::sources::NewsSource;
use crate::store::ArticleStore;
use crate::types::{
    Headline, IngestMode, ItemOutcome, PageSelection, RelevanceLabel, Result, SearchResult,
    SummarizedArticle,
};

/// Page range a bootstrap run covers. Incremental runs only look at the
/// first page; the store-level dedup absorbs the overlap between runs.
const BOOTSTRAP_PAGES: PageSelection = PageSelection::Range(1, 9);
const INCREMENTAL_PAGES: PageSelection = PageSelection::Single(1);

/// How many detail pages the search path fetches concurrently. These are
/// rate-limited third parties, so the fan-out stays small.
const SEARCH_CONCURRENCY: usize = 4;

/// First synthetic id handed out to search results. The counter is process
/// local and resets on restart; search ids are ephemeral by design.
const SEARCH_ID_SEED: i64 = 1_000_000;

/// Tallies for one ingestion run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub headlines: usize,
    pub persisted: usize,
    pub duplicates: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Drives the pipeline: source -> relevance filter -> detail fetch ->
/// summarize -> persist. All collaborators are injected at construction and
/// owned for the life of the process.
pub struct IngestionPipeline {
    source: Arc<dyn NewsSource>,
    adapter: Arc<dyn LlmAdapter>,
    store: Arc<dyn ArticleStore>,
    topic: String,
    next_search_id: AtomicI64,
}

impl IngestionPipeline {
    pub fn new(
        source: Arc<dyn NewsSource>,
        adapter: Arc<dyn LlmAdapter>,
        store: Arc<dyn ArticleStore>,
        topic: String,
    ) -> Self {
        Self {
            source,
            adapter,
            store,
            topic,
            next_search_id: AtomicI64::new(SEARCH_ID_SEED),
        }
    }

    /// One ingestion run over the configured topic. Headline listing failure
    /// fails the run; everything after that is contained per item, so one
    /// bad article never aborts the batch. Re-runs are idempotent through
    /// the store's url dedup.
    pub async fn run_ingestion(&self, mode: IngestMode) -> Result<RunSummary> {
        let pages = match mode {
            IngestMode::Bootstrap => BOOTSTRAP_PAGES,
            IngestMode::Incremental => INCREMENTAL_PAGES,
        };
        info!(?mode, topic = %self.topic, "starting ingestion run");

        let headlines = self.source.fetch_headlines(&self.topic, pages).await?;
        let mut summary = RunSummary {
            headlines: headlines.len(),
            ..RunSummary::default()
        };

        for headline in &headlines {
            match self.process_headline(headline).await {
                ItemOutcome::Persisted => summary.persisted += 1,
                ItemOutcome::Duplicate => summary.duplicates += 1,
                ItemOutcome::SkippedLowRelevance(_) => summary.skipped += 1,
                ItemOutcome::Failed(_) => summary.failed += 1,
            }
        }

        info!(
            headlines = summary.headlines,
            persisted = summary.persisted,
            duplicates = summary.duplicates,
            skipped = summary.skipped,
            failed = summary.failed,
            "ingestion run finished"
        );
        Ok(summary)
    }

    /// Process a single headline to a terminal outcome. Errors anywhere in
    /// the item's chain are absorbed here — logged, turned into
    /// [`ItemOutcome::Failed`], and never retried within the run.
    pub async fn process_headline(&self, headline: &Headline) -> ItemOutcome {
        match self.process_inner(headline).await {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(url = %headline.url, %error, "dropping headline");
                ItemOutcome::Failed(error)
            }
        }
    }

    async fn process_inner(&self, headline: &Headline) -> Result<ItemOutcome> {
        let label = self
            .adapter
            .classify_relevance(&headline.title, &self.topic)
            .await?;
        if label != RelevanceLabel::High {
            return Ok(ItemOutcome::SkippedLowRelevance(label));
        }

        let article = self.source.fetch_article(&headline.url).await?;
        let summary = self.adapter.summarize(&article.content).await?;
        let record = SummarizedArticle { article, summary };

        if self.store.insert_if_absent(&record).await? {
            info!(url = %record.article.url, "persisted article");
            Ok(ItemOutcome::Persisted)
        } else {
            Ok(ItemOutcome::Duplicate)
        }
    }

    /// Interactive search: extract keywords from the prompt, pull one page
    /// of headlines for them, and parse every detail page. No relevance
    /// filter and no summarization on this path. Individual article
    /// failures are dropped; the call only fails if the keyword extraction
    /// or the listing itself does.
    pub async fn search_by_prompt(&self, prompt: &str) -> Result<Vec<SearchResult>> {
        let keywords = self.adapter.extract_keywords(prompt).await?;
        info!(%keywords, "searching by extracted keywords");

        let headlines = self
            .source
            .fetch_headlines(&keywords, PageSelection::Single(1))
            .await?;

        let source = Arc::clone(&self.source);
        let articles: Vec<_> = stream::iter(headlines)
            .map(|headline| {
                let source = Arc::clone(&source);
                async move {
                    match source.fetch_article(&headline.url).await {
                        Ok(article) => Some(article),
                        Err(error) => {
                            warn!(url = %headline.url, %error, "excluding search hit");
                            None
                        }
                    }
                }
            })
            .buffer_unordered(SEARCH_CONCURRENCY)
            .collect()
            .await;

        let mut results: Vec<SearchResult> = articles
            .into_iter()
            .flatten()
            .map(|article| SearchResult {
                id: self.next_search_id.fetch_add(1, Ordering::Relaxed),
                article,
            })
            .collect();

        results.sort_by(|a, b| b.article.published_at.cmp(&a.article.published_at));
        info!(count = results.len(), "search finished");
        Ok(results)
    }
}
