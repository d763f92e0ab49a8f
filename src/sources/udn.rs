use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use crate::fetcher::Fetcher;
use crate::parser::parse_article;
use crate::sources::NewsSource;
use crate::types::{Article, Headline, PageSelection, Result};

/// Crawler for the UDN listing API and its article pages.
pub struct UdnSource {
    fetcher: Fetcher,
    api_url: String,
    channel_id: u32,
}

/// Shape of one listing response. Only the fields the pipeline consumes are
/// decoded; everything else in the payload is ignored.
#[derive(Debug, Deserialize)]
struct ListingResponse {
    lists: Vec<ListingEntry>,
}

#[derive(Debug, Deserialize)]
struct ListingEntry {
    title: String,
    #[serde(rename = "titleLink")]
    title_link: String,
}

impl UdnSource {
    pub fn new(fetcher: Fetcher, api_url: String, channel_id: u32) -> Self {
        Self {
            fetcher,
            api_url,
            channel_id,
        }
    }

    async fn fetch_page(&self, term: &str, page: u32) -> Result<Vec<Headline>> {
        // The search term rides inside the `id` value, so it has to be
        // percent-encoded before the query string itself is encoded.
        let query = [
            ("page", page.to_string()),
            ("id", format!("search:{}", urlencoding::encode(term))),
            ("channelId", self.channel_id.to_string()),
            ("type", "searchword".to_string()),
        ];
        let response: ListingResponse = self.fetcher.get_json(&self.api_url, &query).await?;
        Ok(response
            .lists
            .into_iter()
            .map(|entry| Headline {
                title: entry.title,
                url: entry.title_link,
            })
            .collect())
    }
}

#[async_trait]
impl NewsSource for UdnSource {
    fn source_name(&self) -> &str {
        "udn"
    }

    async fn fetch_headlines(&self, term: &str, pages: PageSelection) -> Result<Vec<Headline>> {
        let mut headlines = Vec::new();
        for page in pages.pages() {
            let mut batch = self.fetch_page(term, page).await?;
            headlines.append(&mut batch);
        }
        info!(term, count = headlines.len(), "fetched headlines");
        Ok(headlines)
    }

    async fn fetch_article(&self, url: &str) -> Result<Article> {
        let html = self.fetcher.get_text(url).await?;
        parse_article(&html, url)
    }
}
