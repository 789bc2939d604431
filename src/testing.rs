//! Test doubles shared by the unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use url::Url;

use crate::error::ResolveError;
use crate::prompt::Prompt;
use crate::sources::{ResolvedItem, Resolver};

/// Resolver with canned ratings, failures and delays, counting calls per URL.
pub(crate) struct FakeResolver {
    name: String,
    ratings: HashMap<String, f64>,
    failing: HashSet<String>,
    delays: HashMap<String, Duration>,
    calls: Mutex<HashMap<String, usize>>,
}

impl FakeResolver {
    pub(crate) fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ratings: HashMap::new(),
            failing: HashSet::new(),
            delays: HashMap::new(),
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn with_rating(mut self, url: &str, rating: f64) -> Self {
        self.ratings.insert(url.to_string(), rating);
        self
    }

    pub(crate) fn failing(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    pub(crate) fn with_delay(mut self, url: &str, ms: u64) -> Self {
        self.delays.insert(url.to_string(), Duration::from_millis(ms));
        self
    }

    pub(crate) fn calls_for(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl Resolver for FakeResolver {
    fn name(&self) -> &str { &self.name }

    async fn resolve(&self, url: &Url) -> Result<ResolvedItem, ResolveError> {
        let key = url.as_str().to_string();
        *self.calls.lock().unwrap().entry(key.clone()).or_insert(0) += 1;
        if let Some(d) = self.delays.get(&key) {
            tokio::time::sleep(*d).await;
        }
        if self.failing.contains(&key) {
            return Err(ResolveError::failed(&self.name, &key, "simulated network error"));
        }
        Ok(ResolvedItem {
            name: format!("Title of {}", url.path()),
            description: "fake".to_string(),
            rating: self.ratings.get(&key).copied().unwrap_or(5.0),
        })
    }
}

/// Answers prompts from a fixed script, then with empty strings.
pub(crate) struct ScriptedPrompt {
    answers: Mutex<VecDeque<String>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompt {
    pub(crate) fn new(answers: &[&str]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().map(|s| s.to_string()).collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn asked(&self) -> Vec<String> { self.asked.lock().unwrap().clone() }
}

impl Prompt for ScriptedPrompt {
    fn request(&self, text: &str) -> Result<String> {
        self.asked.lock().unwrap().push(text.to_string());
        Ok(self.answers.lock().unwrap().pop_front().unwrap_or_default())
    }
}
