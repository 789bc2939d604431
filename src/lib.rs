pub mod aggregator;
pub mod config;
pub mod dao;
pub mod db;
pub mod element;
pub mod error;
pub mod lists;
pub mod mapping;
pub mod pending;
pub mod prompt;
pub mod reconsider;
pub mod sources;
pub mod storage;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

// --- Library API for embedding ---

/// Convenience re-exports for embedders.
pub mod prelude {
    pub use crate::aggregator::{ScanOutcome, ScanReport};
    pub use crate::config::Config;
    pub use crate::element::{ListElement, OrderedList};
    pub use crate::error::{InputError, ResolveError};
    pub use crate::prompt::{AssumeYes, Prompt, StdinPrompt};
    pub use crate::reconsider::RerateReport;
    pub use crate::sources::{ResolvedItem, Resolver, SourceRegistry};
    pub use crate::types::{ElementKind, Field, StatusFilter};
    pub use crate::{FieldChange, Laterlist, PushOutcome, Review};
}

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::aggregator::{Aggregator, ScanReport};
use crate::config::Config;
use crate::db::Database;
use crate::element::{ListElement, OrderedList};
use crate::error::{InputError, ResolveError};
use crate::lists::{ListRegistry, ListTypeDescriptor};
use crate::pending::PendingFiles;
use crate::prompt::{confirm, Prompt};
use crate::reconsider::RerateReport;
use crate::sources::SourceRegistry;
use crate::storage::Store;
use crate::types::{Field, StatusFilter};

pub const CONFIRM_PROMPT: &str = "Are you sure you want to proceed? (Y/n): ";

/// Result of a lookup-then-mutate command.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldChange {
    Changed(ListElement),
    NotFound,
    /// The user answered no; nothing was written.
    Declined,
}

#[derive(Debug)]
pub enum PushOutcome {
    Added(ListElement),
    Declined,
    /// A source matched but could not resolve the URL.
    Failed(ResolveError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Review {
    /// No recognised filter: the active list.
    Active(OrderedList),
    Filtered {
        finished: Option<Vec<ListElement>>,
        removed: Option<Vec<ListElement>>,
    },
}

/// Library entry point. Owns the store, the registries and the ingestion pipeline.
pub struct Laterlist {
    store: Arc<dyn Store>,
    sources: Arc<SourceRegistry>,
    lists: Arc<ListRegistry>,
    aggregator: Aggregator,
}

impl Laterlist {
    /// Open the configured database (running migrations) and build the registries.
    pub async fn connect(config: &Config) -> Result<Self> {
        let db = Database::connect(config.database_url.as_deref()).await?;
        db.run_migrations().await?;
        let sources = SourceRegistry::from_config(&config.sources, &config.http)?;
        let lists = ListRegistry::from_config(&config.lists);
        let pending = PendingFiles::new(config.pending_dir()?);
        info!(lists = lists.list_names().len(), sources = sources.len(), pending = %pending.dir().display(), "laterlist ready");
        Ok(Self::from_parts(Arc::new(db), sources, lists, pending, config.failed_cap))
    }

    pub fn from_parts(
        store: Arc<dyn Store>,
        sources: SourceRegistry,
        lists: ListRegistry,
        pending: PendingFiles,
        failed_cap: usize,
    ) -> Self {
        let sources = Arc::new(sources);
        let lists = Arc::new(lists);
        let aggregator = Aggregator::new(store.clone(), sources.clone(), lists.clone(), pending, failed_cap);
        Self { store, sources, lists, aggregator }
    }

    pub fn list_names(&self) -> Vec<String> { self.lists.list_names() }

    pub fn sources(&self) -> &SourceRegistry { &self.sources }

    pub fn pending(&self) -> &PendingFiles { self.aggregator.pending() }

    fn descriptor(&self, list_name: &str) -> Result<&ListTypeDescriptor, InputError> {
        self.lists.validate(list_name)
    }

    // --- Ingestion ---

    pub async fn scan(&self, list_name: &str) -> Result<ScanReport> {
        self.aggregator.scan(list_name).await
    }

    pub async fn scan_all(&self) -> Vec<(String, Result<ScanReport>)> {
        self.aggregator.scan_all().await
    }

    /// Add one URL right away. Without a matching source the user is asked
    /// whether to add it by hand.
    pub async fn push(&self, list_name: &str, url: &str, prompt: &dyn Prompt) -> Result<PushOutcome> {
        let descriptor = self.descriptor(list_name)?;
        let url = url.trim();

        let element = if self.sources.resolver_for(url).is_some() {
            info!(list = %descriptor.name, url = %url, "Processing info online");
            match self.sources.resolve(url).await {
                Ok(item) => descriptor.element_from(url, item),
                Err(e) => {
                    warn!(list = %descriptor.name, url = %url, error = %e, "could not resolve URL");
                    return Ok(PushOutcome::Failed(e));
                }
            }
        } else {
            let proceed = prompt.request("Cannot determine appropriate source. Add anyway? (Y/n): ")?;
            if proceed.to_lowercase().contains('n') {
                return Ok(PushOutcome::Declined);
            }
            let title = prompt.request("Enter list item title: ")?;
            if title.trim().is_empty() {
                return Err(InputError::EmptyTitle.into());
            }
            let description = prompt.request("Entry description (optional) [N/A]: ")?;
            let raw_rating = prompt.request("Enter desired rating for item: ")?;
            let rating = parse_rating(&raw_rating)?;
            descriptor.manual_element(url, &title, &description, rating)
        };

        let saved = element.persist(self.store.as_ref()).await?;
        info!(list = %descriptor.name, id = ?saved.id, "Added element");
        Ok(PushOutcome::Added(saved))
    }

    // --- Queries ---

    /// Active elements, highest rating first.
    pub async fn active(&self, list_name: &str) -> Result<OrderedList> {
        let descriptor = self.descriptor(list_name)?;
        let all = self.store.load_all(&descriptor.name, StatusFilter::ACTIVE).await?;
        Ok(OrderedList::from_unsorted(all))
    }

    pub async fn next(&self, list_name: &str) -> Result<Option<ListElement>> {
        Ok(self.active(list_name).await?.into_iter().next())
    }

    pub async fn list(&self, list_name: &str, limit: Option<usize>) -> Result<Vec<ListElement>> {
        let mut all = self.active(list_name).await?.into_vec();
        if let Some(limit) = limit {
            all.truncate(limit);
        }
        Ok(all)
    }

    pub async fn detail(&self, list_name: &str, id: i64) -> Result<Option<ListElement>> {
        let descriptor = self.descriptor(list_name)?;
        self.store.load(&descriptor.name, id).await
    }

    /// Case-insensitive name match over every element, whatever its status.
    pub async fn search(&self, list_name: &str, keyword: &str) -> Result<Vec<ListElement>> {
        let descriptor = self.descriptor(list_name)?;
        let keyword = keyword.trim().to_lowercase();
        let all = self.store.load_all(&descriptor.name, StatusFilter::ALL).await?;
        Ok(all.into_iter().filter(|e| e.name.to_lowercase().contains(&keyword)).collect())
    }

    /// `filters` may mention "viewed"/"finished" and/or "removed"; anything else
    /// falls back to the active list.
    pub async fn review(&self, list_name: &str, filters: &[String]) -> Result<Review> {
        let descriptor = self.descriptor(list_name)?;
        let joined = filters.join(" ").to_lowercase();
        let want_finished = joined.contains("viewed") || joined.contains("finished");
        let want_removed = joined.contains("removed");
        if !want_finished && !want_removed {
            return Ok(Review::Active(self.active(list_name).await?));
        }
        let finished = if want_finished {
            Some(self.store.load_all(&descriptor.name, StatusFilter::VIEWED).await?)
        } else {
            None
        };
        let removed = if want_removed {
            Some(self.store.load_all(&descriptor.name, StatusFilter::REMOVED).await?)
        } else {
            None
        };
        Ok(Review::Filtered { finished, removed })
    }

    // --- Field mutations ---

    /// Mark the highest-rated active element as viewed, after confirmation.
    pub async fn pop(&self, list_name: &str, prompt: &dyn Prompt) -> Result<FieldChange> {
        let Some(top) = self.next(list_name).await? else { return Ok(FieldChange::NotFound); };
        let Some(id) = top.id else { return Ok(FieldChange::NotFound); };
        self.change_fields(list_name, id, Some(prompt), &[Field::WasViewed(true)]).await
    }

    pub async fn finish(&self, list_name: &str, id: i64, prompt: &dyn Prompt) -> Result<FieldChange> {
        self.change_fields(list_name, id, Some(prompt), &[Field::WasViewed(true)]).await
    }

    pub async fn remove(&self, list_name: &str, id: i64, prompt: &dyn Prompt) -> Result<FieldChange> {
        self.change_fields(list_name, id, Some(prompt), &[Field::WasRemoved(true)]).await
    }

    pub async fn reactivate(&self, list_name: &str, id: i64) -> Result<FieldChange> {
        self.change_fields(list_name, id, None, &[Field::WasViewed(false), Field::WasRemoved(false)]).await
    }

    /// Load, optionally confirm, then write each field.
    pub async fn change_fields(
        &self,
        list_name: &str,
        id: i64,
        prompt: Option<&dyn Prompt>,
        fields: &[Field],
    ) -> Result<FieldChange> {
        let descriptor = self.descriptor(list_name)?;
        let Some(mut element) = self.store.load(&descriptor.name, id).await? else {
            warn!(list = %descriptor.name, id, "Entry not found");
            return Ok(FieldChange::NotFound);
        };
        if let Some(prompt) = prompt {
            if !confirm(prompt, CONFIRM_PROMPT)? {
                return Ok(FieldChange::Declined);
            }
        }
        for field in fields {
            self.store.update_field(&element, *field).await?;
            element.apply(*field);
        }
        info!(list = %descriptor.name, id, "List item changed");
        Ok(FieldChange::Changed(element))
    }

    // --- Re-rating ---

    /// Re-rate `ids`, or every active element when `ids` is empty.
    pub async fn reconsider(&self, list_name: &str, ids: &[i64]) -> Result<RerateReport> {
        let descriptor = self.descriptor(list_name)?;
        if ids.is_empty() {
            reconsider::reconsider_all(self.store.as_ref(), self.sources.clone(), &descriptor.name).await
        } else {
            reconsider::reconsider_ids(self.store.as_ref(), &self.sources, &descriptor.name, ids).await
        }
    }
}

fn parse_rating(raw: &str) -> Result<f64, InputError> {
    let trimmed = raw.trim();
    match trimmed.parse::<f64>() {
        Ok(r) if r.is_finite() && r >= 0.0 => Ok(r),
        _ => Err(InputError::InvalidRating(trimmed.to_string())),
    }
}
