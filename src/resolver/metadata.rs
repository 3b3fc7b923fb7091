//! Page metadata extraction for link cards.

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

/// Preview shown in place of a page that refuses to be framed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkCardData {
    pub url: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
}

fn meta_property(document: &Html, property: &str) -> Option<String> {
    let selector = Selector::parse(&format!("meta[property=\"{}\"]", property)).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
}

fn document_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|title| !title.is_empty())
}

/// Extract link card data from `html`.
///
/// `og:title` wins over `<title>`. Returns `None` when neither yields a
/// non-empty title, since a card without one is not worth showing.
pub fn parse_link_card(url: &str, html: &str) -> Option<LinkCardData> {
    let document = Html::parse_document(html);
    let title = meta_property(&document, "og:title").or_else(|| document_title(&document))?;

    Some(LinkCardData {
        url: url.to_string(),
        title,
        description: meta_property(&document, "og:description"),
        image_url: meta_property(&document, "og:image"),
        site_name: meta_property(&document, "og:site_name"),
    })
}
