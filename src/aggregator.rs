use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::element::{ListElement, OrderedList};
use crate::error::ResolveError;
use crate::lists::ListRegistry;
use crate::pending::PendingFiles;
use crate::sources::{parse_web_url, ResolvedItem, Resolver, SourceRegistry};
use crate::storage::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanOutcome {
    /// The pending file was empty or missing.
    #[default]
    NoPending,
    /// URLs were read but none resolved; the pending file was left alone.
    NothingCollected,
    /// Elements were stored and the pending file was rewritten.
    Stored,
}

/// What one scan of one list did.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub list_name: String,
    pub outcome: ScanOutcome,
    pub invalid: Vec<String>,
    pub duplicates: Vec<String>,
    pub unsupported: Vec<String>,
    pub failed: Vec<String>,
    /// Resolution tasks spawned.
    pub dispatched: usize,
    /// Persisted elements, highest rating first.
    pub stored: Vec<ListElement>,
    /// Lines left in the pending file after the rewrite.
    pub retained: usize,
}

/// Pending lines after the no-network pre-pass.
#[derive(Debug, Default, PartialEq)]
pub struct Prefiltered {
    pub urls: Vec<String>,
    pub invalid: Vec<String>,
    pub duplicates: Vec<String>,
}

/// Drop lines that are not http(s) URLs and exact repeats, keeping first-seen order.
pub fn prefilter(lines: &[String]) -> Prefiltered {
    let mut out = Prefiltered::default();
    let mut seen = HashSet::new();
    for line in lines {
        let url = line.trim();
        if url.is_empty() { continue; }
        if parse_web_url(url).is_none() {
            out.invalid.push(url.to_string());
            continue;
        }
        if !seen.insert(url.to_string()) {
            out.duplicates.push(url.to_string());
            continue;
        }
        out.urls.push(url.to_string());
    }
    out
}

/// Ingestion pipeline: resolves pending URLs of a list concurrently and stores
/// the results ranked by rating.
#[derive(Clone)]
pub struct Aggregator {
    store: Arc<dyn Store>,
    sources: Arc<SourceRegistry>,
    lists: Arc<ListRegistry>,
    pending: PendingFiles,
    failed_cap: usize,
}

impl Aggregator {
    pub fn new(
        store: Arc<dyn Store>,
        sources: Arc<SourceRegistry>,
        lists: Arc<ListRegistry>,
        pending: PendingFiles,
        failed_cap: usize,
    ) -> Self {
        Self { store, sources, lists, pending, failed_cap }
    }

    pub fn pending(&self) -> &PendingFiles { &self.pending }

    pub async fn scan(&self, list_name: &str) -> Result<ScanReport> {
        let descriptor = self.lists.validate(list_name)?.clone();
        let list = descriptor.name.clone();
        let mut report = ScanReport { list_name: list.clone(), ..Default::default() };

        let lines = self.pending.read(&list).await?;
        if lines.is_empty() {
            info!(list = %list, "No new records were detected");
            return Ok(report);
        }

        let batch = prefilter(&lines);
        for url in &batch.invalid {
            debug!(list = %list, line = %url, "skipping line that is not a URL");
        }
        for url in &batch.duplicates {
            info!(list = %list, url = %url, "Duplicate");
        }
        report.invalid = batch.invalid;
        report.duplicates = batch.duplicates;

        let dispatched = batch.urls.len();
        report.dispatched = dispatched;
        let (tx, mut rx) = mpsc::channel::<(String, Result<ResolvedItem, ResolveError>)>(dispatched.max(1));
        for url in batch.urls {
            let resolver = self.sources.resolver_for(&url);
            let tx = tx.clone();
            tokio::spawn(async move {
                let result = resolve_one(resolver, &url).await;
                // The collector only stops receiving once every task has reported.
                let _ = tx.send((url, result)).await;
            });
        }
        drop(tx);

        let mut collected = Vec::with_capacity(dispatched);
        for _ in 0..dispatched {
            // None means every sender is gone, i.e. a task died without reporting.
            let Some((url, result)) = rx.recv().await else {
                warn!(list = %list, "a resolution task ended without reporting");
                break;
            };
            match result {
                Ok(item) => collected.push(descriptor.element_from(&url, item)),
                Err(ResolveError::NoSource(_)) => {
                    info!(list = %list, url = %url, "no source for URL");
                    report.unsupported.push(url);
                }
                Err(e) => {
                    warn!(list = %list, url = %url, error = %e, "gathering info failed");
                    report.failed.push(url);
                }
            }
        }

        if collected.is_empty() {
            info!(list = %list, "No new records were detected after filtering");
            report.outcome = ScanOutcome::NothingCollected;
            return Ok(report);
        }

        let ranked = OrderedList::from_unsorted(collected);
        info!(list = %list, count = ranked.len(), "Storing new records in database");
        for element in ranked {
            match element.persist(self.store.as_ref()).await {
                Ok(saved) => report.stored.push(saved),
                Err(e) => {
                    // Dequeue what is already stored so a rescan cannot store it twice.
                    let stored: HashSet<&str> = report.stored.iter().map(|s| s.url.as_str()).collect();
                    let consumed: Vec<String> = lines.iter().filter(|l| stored.contains(l.as_str())).cloned().collect();
                    warn!(list = %list, stored = report.stored.len(), error = %e, "storing records failed");
                    self.pending.retain_unconsumed(&list, &consumed).await?;
                    return Err(e.context(format!("storing records for {list}")));
                }
            }
        }

        info!(list = %list, "Cleaning up pending file");
        report.retained = self.pending.retain_unconsumed(&list, &lines).await?;

        let mut leftovers = report.failed.clone();
        leftovers.extend(report.unsupported.iter().cloned());
        self.pending.append_failed(&list, &leftovers, self.failed_cap).await?;

        report.outcome = ScanOutcome::Stored;
        Ok(report)
    }

    /// Scan every registered list concurrently. A failing list is logged and
    /// does not affect the others.
    pub async fn scan_all(&self) -> Vec<(String, Result<ScanReport>)> {
        let mut set = JoinSet::new();
        for name in self.lists.list_names() {
            let agg = self.clone();
            set.spawn(async move {
                info!(list = %name, "Scanning");
                let res = agg.scan(&name).await;
                (name, res)
            });
        }

        let mut out = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((name, res)) => {
                    if let Err(e) = &res {
                        warn!(list = %name, error = %e, "scan failed");
                    }
                    out.push((name, res));
                }
                Err(e) => warn!(error = %e, "scan task panicked"),
            }
        }
        info!("All registered lists were scanned");
        out
    }
}

async fn resolve_one(resolver: Option<Arc<dyn Resolver>>, url: &str) -> Result<ResolvedItem, ResolveError> {
    let resolver = resolver.ok_or_else(|| ResolveError::NoSource(url.to_string()))?;
    let parsed = parse_web_url(url).ok_or_else(|| ResolveError::NoSource(url.to_string()))?;
    resolver.resolve(&parsed).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ListConfig;
    use crate::db::Database;
    use crate::testing::FakeResolver;
    use crate::types::{ElementKind, StatusFilter};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Harness {
        _dir: tempfile::TempDir,
        db: Arc<Database>,
        agg: Aggregator,
    }

    async fn harness(resolvers: Vec<(&str, Arc<FakeResolver>)>) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_file(&dir.path().join("scan.db")).await.unwrap();
        db.run_migrations().await.unwrap();
        let db = Arc::new(db);
        let mut sources = SourceRegistry::empty();
        for (domain, r) in resolvers {
            sources.register(domain, r);
        }
        let lists = ListRegistry::from_config(&[
            ListConfig::new("movies", ElementKind::Movie),
            ListConfig::new("books", ElementKind::Book),
        ]);
        let pending = PendingFiles::new(dir.path().join("pending"));
        let agg = Aggregator::new(db.clone(), Arc::new(sources), Arc::new(lists), pending, 50);
        Harness { _dir: dir, db, agg }
    }

    fn write_pending(h: &Harness, list: &str, lines: &[&str]) {
        let path = h.agg.pending().path_for(list);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, lines.join("\n")).unwrap();
    }

    fn read_pending(h: &Harness, list: &str) -> String {
        std::fs::read_to_string(h.agg.pending().path_for(list)).unwrap()
    }

    #[test]
    fn prefilter_drops_invalid_and_duplicates() {
        let lines: Vec<String> = ["http://a.example/1", "http://a.example/1", "not-a-url", " ", "https://b.example/2"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let p = prefilter(&lines);
        assert_eq!(p.urls, vec!["http://a.example/1", "https://b.example/2"]);
        assert_eq!(p.invalid, vec!["not-a-url"]);
        assert_eq!(p.duplicates, vec!["http://a.example/1"]);
    }

    #[tokio::test]
    async fn scan_dedupes_ranks_and_consumes_batch() {
        let a = Arc::new(FakeResolver::named("a").with_rating("http://a.example/1", 6.0));
        let b = Arc::new(FakeResolver::named("b").with_rating("http://b.example/2", 9.0));
        let h = harness(vec![("a.example", a.clone()), ("b.example", b.clone())]).await;
        write_pending(&h, "movies", &["http://a.example/1", "http://a.example/1", "not-a-url", "http://b.example/2"]);

        let report = h.agg.scan("movies").await.unwrap();
        assert_eq!(report.outcome, ScanOutcome::Stored);
        assert_eq!(report.dispatched, 2);
        assert_eq!(a.calls_for("http://a.example/1"), 1);
        assert_eq!(b.calls_for("http://b.example/2"), 1);
        assert_eq!(report.duplicates, vec!["http://a.example/1"]);
        assert_eq!(report.invalid, vec!["not-a-url"]);

        let ratings: Vec<f64> = report.stored.iter().map(|e| e.rating).collect();
        assert_eq!(ratings, vec![9.0, 6.0]);
        assert_eq!(report.stored[0].id, Some(1));
        assert_eq!(report.stored[0].kind, ElementKind::Movie);
        assert_eq!(report.stored[1].id, Some(2));

        assert_eq!(read_pending(&h, "movies"), "");
        assert_eq!(report.retained, 0);
        assert_eq!(h.db.load_all("movies", StatusFilter::ALL).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn order_follows_rating_not_completion() {
        // Highest rating finishes last.
        let r = FakeResolver::named("a")
            .with_rating("http://a.example/1", 9.0)
            .with_delay("http://a.example/1", 80)
            .with_rating("http://a.example/2", 7.0)
            .with_delay("http://a.example/2", 40)
            .with_rating("http://a.example/3", 3.0);
        let h = harness(vec![("a.example", Arc::new(r))]).await;
        write_pending(&h, "books", &["http://a.example/3", "http://a.example/1", "http://a.example/2"]);

        let report = h.agg.scan("books").await.unwrap();
        let urls: Vec<&str> = report.stored.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(urls, vec!["http://a.example/1", "http://a.example/2", "http://a.example/3"]);
        let ids: Vec<Option<i64>> = report.stored.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![Some(1), Some(2), Some(3)]);
    }

    #[tokio::test]
    async fn empty_pending_is_a_no_op() {
        let h = harness(vec![]).await;
        let report = h.agg.scan("movies").await.unwrap();
        assert_eq!(report.outcome, ScanOutcome::NoPending);
        assert!(!h.agg.pending().path_for("movies").exists());

        write_pending(&h, "movies", &["", "   "]);
        let report = h.agg.scan("movies").await.unwrap();
        assert_eq!(report.outcome, ScanOutcome::NoPending);
        assert_eq!(read_pending(&h, "movies"), "\n   ");
        assert!(h.db.load_all("movies", StatusFilter::ALL).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_resolution_leaves_pending_untouched() {
        let r = Arc::new(FakeResolver::named("a").failing("http://a.example/down"));
        let h = harness(vec![("a.example", r.clone())]).await;
        write_pending(&h, "movies", &["http://a.example/down"]);

        let report = h.agg.scan("movies").await.unwrap();
        assert_eq!(report.outcome, ScanOutcome::NothingCollected);
        assert_eq!(report.failed, vec!["http://a.example/down"]);
        assert_eq!(r.total_calls(), 1);
        assert_eq!(read_pending(&h, "movies"), "http://a.example/down");
        assert!(h.db.load_all("movies", StatusFilter::ALL).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn zero_dispatch_does_not_block() {
        let h = harness(vec![]).await;
        write_pending(&h, "movies", &["not-a-url", "also bad"]);
        let report = h.agg.scan("movies").await.unwrap();
        assert_eq!(report.dispatched, 0);
        assert_eq!(report.outcome, ScanOutcome::NothingCollected);
    }

    #[tokio::test]
    async fn partial_failures_go_to_failed_bucket() {
        let r = FakeResolver::named("a").with_rating("http://a.example/ok", 8.0).failing("http://a.example/down");
        let h = harness(vec![("a.example", Arc::new(r))]).await;
        write_pending(&h, "movies", &["http://a.example/ok", "http://a.example/down", "https://nosource.example/x"]);

        let report = h.agg.scan("movies").await.unwrap();
        assert_eq!(report.outcome, ScanOutcome::Stored);
        assert_eq!(report.dispatched, 3);
        assert_eq!(report.stored.len(), 1);
        assert_eq!(report.unsupported, vec!["https://nosource.example/x"]);
        assert_eq!(report.failed, vec!["http://a.example/down"]);
        assert_eq!(read_pending(&h, "movies"), "");
        let failed = h.agg.pending().read_failed("movies").await.unwrap();
        assert_eq!(failed, vec!["http://a.example/down", "https://nosource.example/x"]);
    }

    /// Store that fails its `fail_on`-th save and delegates everything else.
    struct FailingSaves {
        inner: Arc<Database>,
        fail_on: usize,
        saves: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Store for FailingSaves {
        async fn save(&self, element: &ListElement) -> Result<ListElement> {
            if self.saves.fetch_add(1, Ordering::SeqCst) + 1 == self.fail_on {
                anyhow::bail!("disk full");
            }
            self.inner.save(element).await
        }
        async fn load(&self, list_name: &str, id: i64) -> Result<Option<ListElement>> {
            self.inner.load(list_name, id).await
        }
        async fn load_all(&self, list_name: &str, filter: StatusFilter) -> Result<Vec<ListElement>> {
            self.inner.load_all(list_name, filter).await
        }
        async fn update_field(&self, element: &ListElement, field: crate::types::Field) -> Result<bool> {
            self.inner.update_field(element, field).await
        }
    }

    #[tokio::test]
    async fn failed_save_dequeues_only_what_was_stored() {
        let r = FakeResolver::named("a")
            .with_rating("http://a.example/1", 3.0)
            .with_rating("http://a.example/2", 6.0)
            .with_rating("http://a.example/3", 9.0);
        let h = harness(vec![("a.example", Arc::new(r))]).await;
        write_pending(&h, "movies", &["http://a.example/1", "http://a.example/2", "http://a.example/3"]);

        let flaky = Aggregator {
            store: Arc::new(FailingSaves { inner: h.db.clone(), fail_on: 2, saves: AtomicUsize::new(0) }),
            ..h.agg.clone()
        };
        let err = flaky.scan("movies").await.unwrap_err();
        assert!(format!("{err:#}").contains("disk full"));
        // /3 ranked first and was stored; /2 failed, /1 never attempted
        assert_eq!(
            h.agg.pending().read("movies").await.unwrap(),
            vec!["http://a.example/1", "http://a.example/2"]
        );

        let report = h.agg.scan("movies").await.unwrap();
        assert_eq!(report.stored.len(), 2);
        let mut urls: Vec<String> = h
            .db
            .load_all("movies", StatusFilter::ALL)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.url)
            .collect();
        urls.sort();
        assert_eq!(urls, vec!["http://a.example/1", "http://a.example/2", "http://a.example/3"]);
        assert!(h.agg.pending().read("movies").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_list_is_an_input_error() {
        let h = harness(vec![]).await;
        let err = h.agg.scan("games").await.unwrap_err();
        assert!(err.to_string().contains("unknown list"));
    }

    #[tokio::test]
    async fn scan_all_runs_every_list() {
        let r = FakeResolver::named("a").with_rating("http://a.example/m", 7.0).with_rating("http://a.example/b", 4.0);
        let h = harness(vec![("a.example", Arc::new(r))]).await;
        write_pending(&h, "movies", &["http://a.example/m"]);
        write_pending(&h, "books", &["http://a.example/b"]);

        let mut results = h.agg.scan_all().await;
        results.sort_by(|x, y| x.0.cmp(&y.0));
        let names: Vec<&str> = results.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["books", "movies"]);
        for (_, res) in &results {
            assert_eq!(res.as_ref().unwrap().stored.len(), 1);
        }
        assert_eq!(h.db.load("books", 1).await.unwrap().unwrap().kind, ElementKind::Book);
    }
}
