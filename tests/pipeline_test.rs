use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;

use news_ingestion::{
    Article, ArticleStore, Headline, IngestError, IngestMode, IngestionPipeline, LlmAdapter,
    NewsSource, PageSelection, ProviderRegistry, Result, SqliteStore,
};

const TOPIC: &str = "price changes of daily necessities";

/// Source backed by fixed data. Detail fetches for urls without a registered
/// article fail the way a missing page element would.
struct StaticSource {
    headlines: Vec<Headline>,
    articles: HashMap<String, Article>,
    article_fetches: AtomicUsize,
}

impl StaticSource {
    fn new(headlines: Vec<Headline>, articles: Vec<Article>) -> Self {
        let articles = articles
            .into_iter()
            .map(|a| (a.url.clone(), a))
            .collect();
        Self {
            headlines,
            articles,
            article_fetches: AtomicUsize::new(0),
        }
    }

    fn article_fetches(&self) -> usize {
        self.article_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NewsSource for StaticSource {
    fn source_name(&self) -> &str {
        "static"
    }

    async fn fetch_headlines(&self, _term: &str, _pages: PageSelection) -> Result<Vec<Headline>> {
        Ok(self.headlines.clone())
    }

    async fn fetch_article(&self, url: &str) -> Result<Article> {
        self.article_fetches.fetch_add(1, Ordering::SeqCst);
        self.articles
            .get(url)
            .cloned()
            .ok_or_else(|| IngestError::extraction(url, "required fields missing"))
    }
}

/// Adapter whose raw model replies are scripted per user prompt. Only
/// `generate` is implemented, so every reply passes through the real
/// classification and summary-decoding contracts.
#[derive(Debug)]
struct ScriptedAdapter {
    name: &'static str,
    replies: HashMap<String, String>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedAdapter {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            replies: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn reply(mut self, user_prompt: &str, raw: &str) -> Self {
        self.replies.insert(user_prompt.to_string(), raw.to_string());
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmAdapter for ScriptedAdapter {
    fn adapter_name(&self) -> &str {
        self.name
    }

    async fn generate(&self, _system_prompt: &str, user_prompt: &str) -> Result<String> {
        self.calls.lock().unwrap().push(user_prompt.to_string());
        self.replies.get(user_prompt).cloned().ok_or_else(|| {
            IngestError::Evaluation(format!("no scripted reply for {user_prompt:?}"))
        })
    }
}

fn headline(n: u32) -> Headline {
    Headline {
        title: format!("headline {n}"),
        url: format!("https://news.example/story/{n}"),
    }
}

fn article(n: u32, published_at: &str) -> Article {
    Article {
        title: format!("headline {n}"),
        url: format!("https://news.example/story/{n}"),
        published_at: published_at.to_string(),
        content: format!("body of story {n}"),
    }
}

async fn memory_store() -> Arc<SqliteStore> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    Arc::new(SqliteStore::with_pool(pool).await.unwrap())
}

fn summary_json(n: u32) -> String {
    format!(r#"{{"impact": "impact {n}", "reason": "reason {n}"}}"#)
}

#[tokio::test]
async fn relevance_gate_blocks_fetch_and_summarize() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let source = Arc::new(StaticSource::new(
        vec![headline(1), headline(2), headline(3)],
        vec![article(1, "2024-05-01 10:00")],
    ));
    let adapter = Arc::new(
        ScriptedAdapter::new("scripted")
            .reply("headline 1", "high")
            .reply("headline 2", "medium")
            .reply("headline 3", "low")
            .reply("body of story 1", &summary_json(1)),
    );
    let store = memory_store().await;

    let pipeline = IngestionPipeline::new(
        source.clone(),
        adapter.clone(),
        store.clone(),
        TOPIC.to_string(),
    );
    let summary = pipeline.run_ingestion(IngestMode::Incremental).await.unwrap();

    assert_eq!(summary.persisted, 1);
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.failed, 0);

    // The medium/low headlines never reach the detail fetch or the
    // summarizer: one article fetch, one summarize call in total.
    assert_eq!(source.article_fetches(), 1);
    let calls = adapter.calls();
    assert_eq!(
        calls.iter().filter(|c| c.starts_with("body of")).count(),
        1
    );
    assert_eq!(store.count_all().await.unwrap(), 1);
    assert!(store
        .exists_by_url("https://news.example/story/1")
        .await
        .unwrap());
}

#[tokio::test]
async fn malformed_summary_reply_fails_closed() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let source = Arc::new(StaticSource::new(
        vec![headline(1)],
        vec![article(1, "2024-05-01 10:00")],
    ));
    let adapter = Arc::new(
        ScriptedAdapter::new("scripted")
            .reply("headline 1", "high")
            .reply("body of story 1", "Impact: prices are up. Reason: drought."),
    );
    let store = memory_store().await;

    let pipeline =
        IngestionPipeline::new(source, adapter, store.clone(), TOPIC.to_string());
    let summary = pipeline.run_ingestion(IngestMode::Incremental).await.unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.persisted, 0);
    assert_eq!(store.count_all().await.unwrap(), 0);
}

#[tokio::test]
async fn one_failing_article_never_aborts_the_run() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    // Headline 2 has no fetchable article; 1 and 3 are fine.
    let source = Arc::new(StaticSource::new(
        vec![headline(1), headline(2), headline(3)],
        vec![article(1, "2024-05-01 10:00"), article(3, "2024-05-02 09:00")],
    ));
    let adapter = Arc::new(
        ScriptedAdapter::new("scripted")
            .reply("headline 1", "high")
            .reply("headline 2", "high")
            .reply("headline 3", "high")
            .reply("body of story 1", &summary_json(1))
            .reply("body of story 3", &summary_json(3)),
    );
    let store = memory_store().await;

    let pipeline =
        IngestionPipeline::new(source, adapter, store.clone(), TOPIC.to_string());
    let summary = pipeline.run_ingestion(IngestMode::Incremental).await.unwrap();

    assert_eq!(summary.persisted, 2);
    assert_eq!(summary.failed, 1);
    assert!(store
        .exists_by_url("https://news.example/story/1")
        .await
        .unwrap());
    assert!(!store
        .exists_by_url("https://news.example/story/2")
        .await
        .unwrap());
    assert!(store
        .exists_by_url("https://news.example/story/3")
        .await
        .unwrap());
}

#[tokio::test]
async fn reruns_are_idempotent() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let source = Arc::new(StaticSource::new(
        vec![headline(1), headline(2)],
        vec![article(1, "2024-05-01 10:00"), article(2, "2024-05-01 11:00")],
    ));
    let adapter = Arc::new(
        ScriptedAdapter::new("scripted")
            .reply("headline 1", "high")
            .reply("headline 2", "high")
            .reply("body of story 1", &summary_json(1))
            .reply("body of story 2", &summary_json(2)),
    );
    let store = memory_store().await;

    let pipeline =
        IngestionPipeline::new(source, adapter, store.clone(), TOPIC.to_string());

    let first = pipeline.run_ingestion(IngestMode::Incremental).await.unwrap();
    assert_eq!(first.persisted, 2);
    assert_eq!(store.count_all().await.unwrap(), 2);

    // Identical upstream data on the second run: everything deduplicates on
    // url, nothing is written twice.
    let second = pipeline.run_ingestion(IngestMode::Incremental).await.unwrap();
    assert_eq!(second.persisted, 0);
    assert_eq!(second.duplicates, 2);
    assert_eq!(store.count_all().await.unwrap(), 2);
}

#[tokio::test]
async fn search_excludes_failures_and_sorts_by_time_desc() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    // Headline 2's detail page is broken; the other two parse.
    let source = Arc::new(StaticSource::new(
        vec![headline(1), headline(2), headline(3)],
        vec![article(1, "2024-05-01 10:00"), article(3, "2024-05-02 09:00")],
    ));
    let adapter = Arc::new(ScriptedAdapter::new("scripted").reply("egg prices", "eggs price"));
    let store = memory_store().await;

    let pipeline = IngestionPipeline::new(source, adapter, store, TOPIC.to_string());
    let results = pipeline.search_by_prompt("egg prices").await.unwrap();

    assert_eq!(results.len(), 2);
    // Newest publication first; the failed article is simply absent.
    assert_eq!(results[0].article.url, "https://news.example/story/3");
    assert_eq!(results[1].article.url, "https://news.example/story/1");
    // Synthetic ids come from the process-local counter.
    for result in &results {
        assert!(result.id >= 1_000_000);
    }
    assert_ne!(results[0].id, results[1].id);
}

#[tokio::test]
async fn search_fails_wholesale_only_on_keyword_extraction() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let source = Arc::new(StaticSource::new(vec![headline(1)], vec![]));
    // No scripted reply for the prompt: keyword extraction itself fails.
    let adapter = Arc::new(ScriptedAdapter::new("scripted"));
    let store = memory_store().await;

    let pipeline = IngestionPipeline::new(source, adapter, store, TOPIC.to_string());
    let err = pipeline.search_by_prompt("anything").await.unwrap_err();
    assert!(matches!(err, IngestError::Evaluation(_)));
}

#[tokio::test]
async fn providers_are_substitutable_behind_the_registry() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let content = "factory output fell sharply";
    let mut registry = ProviderRegistry::new();
    registry.register(
        "default-openai",
        Arc::new(
            ScriptedAdapter::new("openai")
                .reply(content, r#"{"impact": "output down", "reason": "strike"}"#),
        ),
    );
    registry.register(
        "default-anthropic",
        Arc::new(
            ScriptedAdapter::new("anthropic")
                .reply(content, r#"{"impact": "supply squeeze", "reason": "walkout"}"#),
        ),
    );

    // Same input, either identifier: the values may differ but the shape is
    // identical and fully populated.
    let a = registry.summarize_text("default-openai", content).await.unwrap();
    let b = registry
        .summarize_text("default-anthropic", content)
        .await
        .unwrap();
    assert!(!a.impact.is_empty() && !a.reason.is_empty());
    assert!(!b.impact.is_empty() && !b.reason.is_empty());
}

#[tokio::test]
async fn unknown_model_is_rejected_without_any_provider_call() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let spy = Arc::new(ScriptedAdapter::new("openai"));
    let mut registry = ProviderRegistry::new();
    registry.register("default-openai", spy.clone());

    let err = registry
        .summarize_text("not-a-real-model", "anything")
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::InvalidModel(id) if id == "not-a-real-model"));
    assert!(spy.calls().is_empty());
}
