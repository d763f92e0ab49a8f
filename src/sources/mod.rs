pub mod udn;

pub use udn::UdnSource;

use async_trait::async_trait;

use crate::types::{Article, Headline, PageSelection, Result};

/// A crawlable news backend: paginated headline search plus per-article
/// detail extraction. The orchestrator depends only on this contract.
#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Identifier used in logs.
    fn source_name(&self) -> &str;

    /// Fetch headlines for a search term across the given pages, in
    /// ascending page order, concatenated preserving source order. A failed
    /// page fails the whole call; retry policy belongs to the caller.
    async fn fetch_headlines(&self, term: &str, pages: PageSelection) -> Result<Vec<Headline>>;

    /// Fetch and parse one article's detail page.
    async fn fetch_article(&self, url: &str) -> Result<Article>;
}
