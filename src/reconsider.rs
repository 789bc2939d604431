use std::sync::Arc;

use anyhow::Result;
use futures::future::join_all;
use tracing::{info, warn};

use crate::element::{ListElement, OrderedList, RerateOutcome};
use crate::sources::SourceRegistry;
use crate::storage::Store;
use crate::types::{Field, StatusFilter};

#[derive(Debug, Clone, PartialEq)]
pub struct RatingChange {
    pub id: i64,
    pub name: String,
    pub previous: f64,
    pub current: f64,
}

#[derive(Debug, Clone, Default)]
pub struct RerateReport {
    pub updated: Vec<RatingChange>,
    pub unchanged: usize,
    /// (id, reason) for elements whose source could not be reached.
    pub failed: Vec<(i64, String)>,
    pub not_found: Vec<i64>,
    /// Active elements after a full-list pass, highest rating first.
    pub list: Option<OrderedList>,
}

/// Re-rate the given ids one at a time. Missing ids are reported and skipped.
pub async fn reconsider_ids(
    store: &dyn Store,
    sources: &SourceRegistry,
    list_name: &str,
    ids: &[i64],
) -> Result<RerateReport> {
    let mut report = RerateReport::default();
    for &id in ids {
        let Some(mut element) = store.load(list_name, id).await? else {
            warn!(list = %list_name, id, "Entry not found");
            report.not_found.push(id);
            continue;
        };
        let outcome = element.rerate(sources).await;
        record(store, &mut report, element, outcome).await?;
    }
    Ok(report)
}

/// Re-rate every active element of a list concurrently, wait for all of them,
/// then persist the changes and return the re-sorted active list.
pub async fn reconsider_all(
    store: &dyn Store,
    sources: Arc<SourceRegistry>,
    list_name: &str,
) -> Result<RerateReport> {
    let active = store.load_all(list_name, StatusFilter::ACTIVE).await?;
    info!(list = %list_name, count = active.len(), "Reconsidering all active entries");

    let handles: Vec<_> = active
        .into_iter()
        .map(|mut element| {
            let sources = sources.clone();
            tokio::spawn(async move {
                let outcome = element.rerate(&sources).await;
                (element, outcome)
            })
        })
        .collect();

    // Barrier: nothing below runs until every task has finished.
    let finished = join_all(handles).await;

    let mut report = RerateReport::default();
    for joined in finished {
        match joined {
            Ok((element, outcome)) => record(store, &mut report, element, outcome).await?,
            Err(e) => warn!(list = %list_name, error = %e, "re-rate task panicked"),
        }
    }
    info!(list = %list_name, updated = report.updated.len(), "All active entries were re-rated");

    let reloaded = store.load_all(list_name, StatusFilter::ACTIVE).await?;
    report.list = Some(OrderedList::from_unsorted(reloaded));
    Ok(report)
}

async fn record(
    store: &dyn Store,
    report: &mut RerateReport,
    element: ListElement,
    outcome: Result<RerateOutcome, crate::error::ResolveError>,
) -> Result<()> {
    let id = element.id.unwrap_or_default();
    match outcome {
        Ok(RerateOutcome::Updated { previous, current }) => {
            store.update_field(&element, Field::Rating(current)).await?;
            report.updated.push(RatingChange { id, name: element.name, previous, current });
        }
        Ok(RerateOutcome::Unchanged) => report.unchanged += 1,
        Err(e) => {
            warn!(list = %element.list_name, id, error = %e, "could not re-rate");
            report.failed.push((id, e.to_string()));
        }
    }
    Ok(())
}
