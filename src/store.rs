use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use tracing::info;

use crate::types::{Result, StoredArticle, SummarizedArticle};

/// Append-only persistence port for summarized articles. The url column's
/// uniqueness is the dedup key and the only concurrency-safety mechanism two
/// overlapping runs rely on.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    async fn count_all(&self) -> Result<i64>;

    /// Insert unless a row with the same url already exists. Returns whether
    /// a row was actually written.
    async fn insert_if_absent(&self, article: &SummarizedArticle) -> Result<bool>;

    async fn exists_by_url(&self, url: &str) -> Result<bool>;

    /// Every stored row, newest publication time first.
    async fn list_all_by_time_desc(&self) -> Result<Vec<StoredArticle>>;
}

/// SQLite-backed store.
pub struct SqliteStore {
    pool: SqlitePool,
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS news_articles (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    url          TEXT NOT NULL UNIQUE,
    title        TEXT NOT NULL,
    published_at TEXT NOT NULL,
    content      TEXT NOT NULL,
    impact       TEXT NOT NULL,
    reason       TEXT NOT NULL,
    created_at   TEXT NOT NULL
)
"#;

impl SqliteStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url).await?;
        Self::with_pool(pool).await
    }

    /// Wrap an existing pool, creating the schema if absent. In-memory
    /// databases must come through here on a single-connection pool, since
    /// every new `:memory:` connection is a fresh empty database.
    pub async fn with_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::query(SCHEMA).execute(&pool).await?;
        info!("article store ready");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl ArticleStore for SqliteStore {
    async fn count_all(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM news_articles")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn insert_if_absent(&self, article: &SummarizedArticle) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO news_articles
                (url, title, published_at, content, impact, reason, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&article.article.url)
        .bind(&article.article.title)
        .bind(&article.article.published_at)
        .bind(&article.article.content)
        .bind(&article.summary.impact)
        .bind(&article.summary.reason)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn exists_by_url(&self, url: &str) -> Result<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM news_articles WHERE url = ?")
                .bind(url)
                .fetch_one(&self.pool)
                .await?;
        Ok(count > 0)
    }

    async fn list_all_by_time_desc(&self) -> Result<Vec<StoredArticle>> {
        let rows = sqlx::query(
            r#"
            SELECT id, url, title, published_at, content, impact, reason
            FROM news_articles
            ORDER BY published_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut articles = Vec::with_capacity(rows.len());
        for row in rows {
            articles.push(StoredArticle {
                id: row.try_get("id")?,
                url: row.try_get("url")?,
                title: row.try_get("title")?,
                published_at: row.try_get("published_at")?,
                content: row.try_get("content")?,
                impact: row.try_get("impact")?,
                reason: row.try_get("reason")?,
            });
        }
        Ok(articles)
    }
}
