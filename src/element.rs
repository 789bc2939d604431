use std::ops::Deref;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::error::ResolveError;
use crate::sources::{ResolvedItem, SourceRegistry};
use crate::storage::Store;
use crate::types::{ElementKind, Field};

/// One item of a list. Every variant shares these fields; `kind` is the tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListElement {
    /// Assigned by the store on first save, unique within `list_name`.
    pub id: Option<i64>,
    pub list_name: String,
    pub kind: ElementKind,
    pub name: String,
    pub url: String,
    pub description: String,
    pub rating: f64,
    pub was_viewed: bool,
    pub was_removed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RerateOutcome {
    Updated { previous: f64, current: f64 },
    Unchanged,
}

impl ListElement {
    pub fn new(list_name: &str, kind: ElementKind, url: &str, name: &str, description: &str, rating: f64) -> Self {
        let description = if description.trim().is_empty() { "N/A" } else { description.trim() };
        Self {
            id: None,
            list_name: list_name.to_string(),
            kind,
            name: name.trim().to_string(),
            url: url.trim().to_string(),
            description: description.to_string(),
            rating,
            was_viewed: false,
            was_removed: false,
        }
    }

    pub fn from_resolved(list_name: &str, kind: ElementKind, url: &str, item: ResolvedItem) -> Self {
        Self::new(list_name, kind, url, &item.name, &item.description, item.rating)
    }

    pub fn is_active(&self) -> bool { !self.was_viewed && !self.was_removed }

    /// Mirror a persisted field change in memory.
    pub fn apply(&mut self, field: Field) {
        match field {
            Field::WasViewed(v) => self.was_viewed = v,
            Field::WasRemoved(v) => self.was_removed = v,
            Field::Rating(r) => self.rating = r,
        }
    }

    /// Save through the store; the returned copy carries the assigned id.
    pub async fn persist(&self, store: &dyn Store) -> Result<ListElement> {
        store.save(self).await
    }

    pub fn render_summary(&self) -> String {
        let id = match self.id {
            Some(id) => format!("{:>4}", id),
            None => "----".to_string(),
        };
        let status = if self.was_removed {
            " [removed]"
        } else if self.was_viewed {
            " [finished]"
        } else {
            ""
        };
        format!("[{}] {} ({:.2}){}", id, self.name, self.rating, status)
    }

    pub fn render_detail(&self) -> String {
        let id = self.id.map(|i| i.to_string()).unwrap_or_else(|| "unsaved".to_string());
        let status = match (self.was_viewed, self.was_removed) {
            (_, true) => "removed",
            (true, false) => "finished",
            (false, false) => "active",
        };
        let mut out = String::new();
        out.push_str(&format!("{} #{} in {}\n", capitalize(self.kind.as_str()), id, self.list_name));
        out.push_str(&format!("  Name:        {}\n", self.name));
        out.push_str(&format!("  Rating:      {:.2}\n", self.rating));
        out.push_str(&format!("  URL:         {}\n", if self.url.is_empty() { "N/A" } else { &self.url }));
        out.push_str(&format!("  Description: {}\n", self.description));
        out.push_str(&format!("  Status:      {}", status));
        out
    }

    /// Recompute the rating in memory. Persisting the result is the caller's job.
    ///
    /// Generic elements, and elements whose URL no source claims, keep the rating
    /// they were given.
    pub async fn rerate(&mut self, sources: &SourceRegistry) -> Result<RerateOutcome, ResolveError> {
        if !self.kind.rerates_from_source() {
            return Ok(RerateOutcome::Unchanged);
        }
        let fresh = match sources.resolve(&self.url).await {
            Ok(item) => item,
            Err(e) if e.is_no_source() => return Ok(RerateOutcome::Unchanged),
            Err(e) => return Err(e),
        };
        let previous = self.rating;
        if (fresh.rating - previous).abs() < f64::EPSILON {
            return Ok(RerateOutcome::Unchanged);
        }
        self.rating = fresh.rating;
        Ok(RerateOutcome::Updated { previous, current: fresh.rating })
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Elements sorted by rating, highest first. Equal ratings keep their incoming order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderedList {
    elements: Vec<ListElement>,
}

impl OrderedList {
    pub fn from_unsorted(mut elements: Vec<ListElement>) -> Self {
        // sort_by is stable, which gives the tie-break
        elements.sort_by(|a, b| b.rating.total_cmp(&a.rating));
        Self { elements }
    }

    pub fn into_vec(self) -> Vec<ListElement> { self.elements }
}

impl Deref for OrderedList {
    type Target = [ListElement];
    fn deref(&self) -> &Self::Target { &self.elements }
}

impl IntoIterator for OrderedList {
    type Item = ListElement;
    type IntoIter = std::vec::IntoIter<ListElement>;
    fn into_iter(self) -> Self::IntoIter { self.elements.into_iter() }
}
