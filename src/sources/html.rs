use async_trait::async_trait;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::{ResolvedItem, Resolver};
use crate::error::ResolveError;

/// Resolves a page from its OpenGraph / JSON-LD metadata.
pub struct HtmlMetadataResolver {
    name: String,
    client: reqwest::Client,
    rating_scale: f64,
    default_rating: f64,
}

impl HtmlMetadataResolver {
    pub fn new(name: &str, client: reqwest::Client, rating_scale: f64, default_rating: f64) -> Self {
        Self { name: name.to_string(), client, rating_scale, default_rating }
    }

    async fn fetch_html(&self, url: &Url) -> Result<String, ResolveError> {
        let resp = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| ResolveError::failed(&self.name, url.as_str(), e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ResolveError::failed(&self.name, url.as_str(), format!("HTTP {}", status)));
        }
        resp.text().await.map_err(|e| ResolveError::failed(&self.name, url.as_str(), e))
    }
}

#[async_trait]
impl Resolver for HtmlMetadataResolver {
    fn name(&self) -> &str { &self.name }

    async fn resolve(&self, url: &Url) -> Result<ResolvedItem, ResolveError> {
        let body = self.fetch_html(url).await?;
        let meta = parse_page(&body)
            .ok_or_else(|| ResolveError::failed(&self.name, url.as_str(), "page has no usable title"))?;
        debug!(source = %self.name, url = %url, title = %meta.title, rating = ?meta.rating, "resolved page");
        let rating = meta
            .rating
            .map(|r| normalize_rating(r, self.rating_scale))
            .unwrap_or(self.default_rating);
        Ok(ResolvedItem {
            name: meta.title,
            description: meta.description.unwrap_or_else(|| "N/A".to_string()),
            rating,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageMetadata {
    pub title: String,
    pub description: Option<String>,
    /// Raw value as published by the site, before normalising.
    pub rating: Option<f64>,
}

/// Extract title, description and rating from an HTML document.
/// Returns `None` when no title can be found.
pub fn parse_page(html: &str) -> Option<PageMetadata> {
    let doc = Html::parse_document(html);
    let ld: Vec<Value> = select_all(&doc, r#"script[type="application/ld+json"]"#)
        .into_iter()
        .filter_map(|raw| serde_json::from_str(&raw).ok())
        .collect();

    let title = meta_content(&doc, r#"meta[property="og:title"]"#)
        .or_else(|| meta_content(&doc, r#"meta[name="twitter:title"]"#))
        .or_else(|| ld.iter().find_map(ld_name))
        .or_else(|| select_all(&doc, "title").into_iter().map(|t| collapse_ws(&t)).find(|t| !t.is_empty()))?;

    let description = meta_content(&doc, r#"meta[property="og:description"]"#)
        .or_else(|| meta_content(&doc, r#"meta[name="description"]"#));

    let rating = ld
        .iter()
        .find_map(find_aggregate_rating)
        .or_else(|| itemprop_rating(&doc));

    Some(PageMetadata { title, description, rating })
}

/// Scale a site rating to 0..10, rounded to two decimals.
pub fn normalize_rating(raw: f64, scale: f64) -> f64 {
    let scaled = if scale > 0.0 { raw / scale * 10.0 } else { raw };
    (scaled.clamp(0.0, 10.0) * 100.0).round() / 100.0
}

fn meta_content(doc: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    doc.select(&sel)
        .filter_map(|e| e.value().attr("content"))
        .map(collapse_ws)
        .find(|s| !s.is_empty())
}

fn select_all(doc: &Html, selector: &str) -> Vec<String> {
    let Ok(sel) = Selector::parse(selector) else { return Vec::new(); };
    doc.select(&sel).map(|e| e.text().collect::<String>()).collect()
}

fn itemprop_rating(doc: &Html) -> Option<f64> {
    let sel = Selector::parse(r#"[itemprop="ratingValue"]"#).ok()?;
    doc.select(&sel).find_map(|e| {
        let raw = e.value().attr("content").map(str::to_string).unwrap_or_else(|| e.text().collect());
        raw.trim().parse::<f64>().ok().filter(|r| r.is_finite())
    })
}

fn ld_name(v: &Value) -> Option<String> {
    match v {
        Value::Array(items) => items.iter().find_map(ld_name),
        Value::Object(map) => {
            if let Some(Value::String(name)) = map.get("name") {
                let name = collapse_ws(name);
                if !name.is_empty() { return Some(name); }
            }
            map.get("@graph").and_then(ld_name)
        }
        _ => None,
    }
}

fn find_aggregate_rating(v: &Value) -> Option<f64> {
    match v {
        Value::Array(items) => items.iter().find_map(find_aggregate_rating),
        Value::Object(map) => {
            if let Some(value) = map.get("aggregateRating").and_then(|r| r.get("ratingValue")).and_then(as_number) {
                return Some(value);
            }
            map.values().find_map(find_aggregate_rating)
        }
        _ => None,
    }
}

fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|r: &f64| r.is_finite())
}

fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
