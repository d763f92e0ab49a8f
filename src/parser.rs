use scraper::{Html, Selector};
use tracing::debug;

use crate::types::{Article, IngestError, Result};

/// Marker character the source site uses on boilerplate paragraphs
/// (photo credits, promo lines). Any paragraph containing it is dropped.
const BULLET_MARKER: char = '▪';

const TITLE_SELECTOR: &str = "h1.article-content__title";
const TIME_SELECTOR: &str = "time.article-content__time";
const BODY_SELECTOR: &str = "section.article-content__editor p";

/// Extract a structured [`Article`] from a detail page. Fails closed: a page
/// missing the title, the timestamp, or the body container yields an
/// extraction error rather than a partial record.
pub fn parse_article(html: &str, url: &str) -> Result<Article> {
    let document = Html::parse_document(html);

    let title = select_text(&document, TITLE_SELECTOR)
        .ok_or_else(|| IngestError::extraction(url, "title not found"))?;
    let published_at = select_text(&document, TIME_SELECTOR)
        .ok_or_else(|| IngestError::extraction(url, "publication time not found"))?;

    let body_selector = Selector::parse(BODY_SELECTOR).expect("static selector");
    let mut paragraphs = document.select(&body_selector).peekable();
    if paragraphs.peek().is_none() {
        return Err(IngestError::extraction(url, "content section not found"));
    }

    let content = clean_paragraphs(paragraphs.map(|p| p.text().collect::<String>()));

    debug!(%url, bytes = content.len(), "extracted article");
    Ok(Article {
        title,
        url: url.to_string(),
        published_at,
        content,
    })
}

/// The sole content-cleaning step. A paragraph survives only if it is
/// non-empty after trimming and does not contain the bullet marker anywhere;
/// the trim happens before the emptiness check so a marker-only paragraph is
/// dropped by the marker test, not admitted as whitespace. Survivors are
/// joined with a single space.
fn clean_paragraphs(paragraphs: impl Iterator<Item = String>) -> String {
    paragraphs
        .filter(|text| !text.trim().is_empty() && !text.contains(BULLET_MARKER))
        .map(|text| text.trim().to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn select_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).expect("static selector");
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(paragraphs: &[&str]) -> String {
        let body = paragraphs
            .iter()
            .map(|p| format!("<p>{p}</p>"))
            .collect::<String>();
        format!(
            "<html><body>\
             <h1 class=\"article-content__title\">Egg prices climb again</h1>\
             <time class=\"article-content__time\">2024-05-01 10:30</time>\
             <section class=\"article-content__editor\">{body}</section>\
             </body></html>"
        )
    }

    #[test]
    fn content_filter_drops_empty_and_marker_paragraphs() {
        let html = page(&["  ", "▪ noise", "Real text", "More ▪ text▪"]);
        let article = parse_article(&html, "https://example.com/a").unwrap();
        assert_eq!(article.content, "Real text");
    }

    #[test]
    fn surviving_paragraphs_join_with_a_single_space_in_order() {
        let html = page(&["First.", " Second. ", "Third."]);
        let article = parse_article(&html, "https://example.com/a").unwrap();
        assert_eq!(article.content, "First. Second. Third.");
    }

    #[test]
    fn title_and_time_are_extracted() {
        let html = page(&["Body."]);
        let article = parse_article(&html, "https://example.com/a").unwrap();
        assert_eq!(article.title, "Egg prices climb again");
        assert_eq!(article.published_at, "2024-05-01 10:30");
        assert_eq!(article.url, "https://example.com/a");
    }

    #[test]
    fn missing_title_fails_closed() {
        let html = "<html><body>\
                    <time class=\"article-content__time\">2024-05-01 10:30</time>\
                    <section class=\"article-content__editor\"><p>Body.</p></section>\
                    </body></html>";
        let err = parse_article(html, "https://example.com/a").unwrap_err();
        assert!(matches!(err, IngestError::Extraction { .. }));
    }

    #[test]
    fn missing_content_section_fails_closed() {
        let html = "<html><body>\
                    <h1 class=\"article-content__title\">T</h1>\
                    <time class=\"article-content__time\">2024-05-01 10:30</time>\
                    </body></html>";
        let err = parse_article(html, "https://example.com/a").unwrap_err();
        assert!(matches!(err, IngestError::Extraction { .. }));
    }
}
