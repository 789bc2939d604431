use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use url::Url;

use crate::config::HttpConfig;
use crate::error::ResolveError;

pub mod config;
pub mod html;

pub use config::SourceConfig;
pub use html::HtmlMetadataResolver;

/// Metadata a resolver extracted for one URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedItem {
    pub name: String,
    pub description: String,
    /// Normalised to the 0..10 scale.
    pub rating: f64,
}

/// Turns a URL into metadata. Implementations hold no mutable state and are
/// called from many tasks at once.
#[async_trait]
pub trait Resolver: Send + Sync {
    fn name(&self) -> &str;
    async fn resolve(&self, url: &Url) -> Result<ResolvedItem, ResolveError>;
}

/// Host pattern a source is registered under. `example.com` and `*.example.com`
/// both match the bare domain and every subdomain of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainPattern {
    domain: String,
}

impl DomainPattern {
    pub fn new(pattern: &str) -> Self {
        let p = pattern.trim().to_ascii_lowercase();
        let domain = p.strip_prefix("*.").unwrap_or(&p).trim_end_matches('.').to_string();
        Self { domain }
    }

    pub fn matches_host(&self, host: &str) -> bool {
        if self.domain.is_empty() { return false; }
        let host = host.to_ascii_lowercase();
        host == self.domain || host.ends_with(&format!(".{}", self.domain))
    }

    pub fn as_str(&self) -> &str { &self.domain }
}

struct RegisteredSource {
    pattern: DomainPattern,
    resolver: Arc<dyn Resolver>,
}

/// Ordered table of sources. Built once at startup and only read afterwards.
#[derive(Default)]
pub struct SourceRegistry {
    sources: Vec<RegisteredSource>,
}

impl SourceRegistry {
    pub fn empty() -> Self { Self::default() }

    /// Build the registry from configuration, sharing one HTTP client across sources.
    pub fn from_config(sources: &[SourceConfig], http: &HttpConfig) -> Result<Self> {
        let client = build_client(http)?;
        let mut registry = Self::empty();
        for cfg in sources {
            let resolver = HtmlMetadataResolver::new(&cfg.name, client.clone(), cfg.rating_scale, cfg.default_rating);
            registry.register(&cfg.domain, Arc::new(resolver));
        }
        Ok(registry)
    }

    /// Append a source. Earlier registrations take priority.
    pub fn register(&mut self, pattern: &str, resolver: Arc<dyn Resolver>) {
        self.sources.push(RegisteredSource { pattern: DomainPattern::new(pattern), resolver });
    }

    pub fn len(&self) -> usize { self.sources.len() }

    pub fn is_empty(&self) -> bool { self.sources.is_empty() }

    /// (source name, domain) pairs in priority order.
    pub fn list_sources(&self) -> Vec<(String, String)> {
        self.sources
            .iter()
            .map(|s| (s.resolver.name().to_string(), s.pattern.as_str().to_string()))
            .collect()
    }

    /// First source whose pattern matches the URL's host, if any.
    pub fn resolver_for(&self, url: &str) -> Option<Arc<dyn Resolver>> {
        let parsed = parse_web_url(url)?;
        let host = parsed.host_str()?;
        self.sources
            .iter()
            .find(|s| s.pattern.matches_host(host))
            .map(|s| s.resolver.clone())
    }

    pub async fn resolve(&self, url: &str) -> Result<ResolvedItem, ResolveError> {
        let resolver = self.resolver_for(url).ok_or_else(|| ResolveError::NoSource(url.to_string()))?;
        let parsed = parse_web_url(url).ok_or_else(|| ResolveError::NoSource(url.to_string()))?;
        resolver.resolve(&parsed).await
    }
}

/// Absolute http(s) URL with a host, or `None`.
pub fn parse_web_url(s: &str) -> Option<Url> {
    let parsed = Url::parse(s.trim()).ok()?;
    match parsed.scheme() {
        "http" | "https" => {}
        _ => return None,
    }
    parsed.host_str()?;
    Some(parsed)
}

pub fn build_client(http: &HttpConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(http.user_agent.as_str())
        .timeout(Duration::from_secs(http.timeout_secs.max(1)))
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .context("building HTTP client")
}
