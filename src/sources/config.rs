use serde::Deserialize;

/// One `[[sources]]` entry of the config file.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SourceConfig {
    pub name: String,
    pub domain: String,
    /// Maximum rating the site uses, for normalising to 0..10.
    #[serde(default = "default_scale")]
    pub rating_scale: f64,
    /// Used when a page carries no rating.
    #[serde(default = "default_rating")]
    pub default_rating: f64,
}

fn default_scale() -> f64 { 10.0 }
fn default_rating() -> f64 { 5.0 }

impl SourceConfig {
    pub fn new(name: &str, domain: &str, rating_scale: f64) -> Self {
        Self { name: name.to_string(), domain: domain.to_string(), rating_scale, default_rating: default_rating() }
    }
}

pub fn default_sources() -> Vec<SourceConfig> {
    vec![
        SourceConfig::new("imdb", "imdb.com", 10.0),
        SourceConfig::new("letterboxd", "letterboxd.com", 5.0),
        SourceConfig::new("tmdb", "themoviedb.org", 100.0),
        SourceConfig::new("goodreads", "goodreads.com", 5.0),
        SourceConfig::new("openlibrary", "openlibrary.org", 5.0),
    ]
}
