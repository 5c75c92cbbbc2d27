// src/pipeline/cycle.rs

//! One polling cycle over every configured target.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{Config, Target};
use crate::pipeline::diff::detect_added;
use crate::pipeline::merge::merge;
use crate::services::{ListingParser, Notifier, TableListingParser, format_message};
use crate::storage::SnapshotStore;
use crate::utils::http::PageFetcher;

/// Result of processing a single target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetOutcome {
    /// Target display name
    pub name: String,
    /// Newly observed items
    pub added: usize,
    /// Records in the saved snapshot
    pub total: usize,
    /// Whether the target failed before its snapshot was saved
    pub failed: bool,
}

impl TargetOutcome {
    fn failed(target: &Target) -> Self {
        Self {
            name: target.name.clone(),
            added: 0,
            total: 0,
            failed: true,
        }
    }
}

/// Summary of one cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<TargetOutcome>,
}

impl CycleReport {
    /// Total newly observed items across targets.
    pub fn added(&self) -> usize {
        self.outcomes.iter().map(|o| o.added).sum()
    }

    /// Number of targets that failed.
    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| o.failed).count()
    }
}

/// Runs targets sequentially against shared collaborators.
pub struct CycleRunner<'a> {
    history_size: usize,
    fetcher: &'a dyn PageFetcher,
    store: &'a dyn SnapshotStore,
    notifier: &'a dyn Notifier,
}

impl<'a> CycleRunner<'a> {
    pub fn new(
        config: &Config,
        fetcher: &'a dyn PageFetcher,
        store: &'a dyn SnapshotStore,
        notifier: &'a dyn Notifier,
    ) -> Self {
        Self {
            history_size: config.history.history_size,
            fetcher,
            store,
            notifier,
        }
    }

    /// Process every target once. Failures are contained per target.
    pub async fn run_cycle(&self, targets: &[Target]) -> CycleReport {
        let started_at = Utc::now();
        let mut outcomes = Vec::with_capacity(targets.len());

        for target in targets {
            let outcome = match self.run_target(target).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    log::error!("[{}] Cycle failed: {}", target.name, e);
                    TargetOutcome::failed(target)
                }
            };
            outcomes.push(outcome);
        }

        let report = CycleReport {
            started_at,
            finished_at: Utc::now(),
            outcomes,
        };
        log::info!(
            "Cycle finished in {}ms: {} new item(s), {}/{} target(s) failed",
            (report.finished_at - report.started_at).num_milliseconds(),
            report.added(),
            report.failures(),
            report.outcomes.len()
        );
        report
    }

    /// Load, fetch, detect, notify, merge and save one target.
    pub async fn run_target(&self, target: &Target) -> Result<TargetOutcome> {
        let parser = TableListingParser::new(target)?;
        let previous = self.store.load(&target.output).await;

        log::debug!("[{}] Fetching {}", target.name, target.url);
        let raw = self.fetcher.fetch(&target.url).await?;
        let items = parser.parse(&raw);
        log::debug!("[{}] Parsed {} item(s)", target.name, items.len());

        let added = detect_added(&items, &previous);
        if added.is_empty() {
            log::info!("[{}] No new items", target.name);
        } else {
            log::info!("[{}] {} new item(s)", target.name, added.len());
        }

        for item in &added {
            let message = format_message(target, item);
            if let Err(e) = self.notifier.notify(&message).await {
                log::warn!(
                    "[{}] Notification for {} failed: {}",
                    target.name,
                    item.key().unwrap_or_default(),
                    e
                );
            }
        }

        let snapshot = merge(&previous, &items, Utc::now(), self.history_size);
        let meta = self.store.save(&target.output, &snapshot).await?;
        log::debug!(
            "[{}] Saved {} record(s) to {}",
            target.name,
            meta.count,
            meta.location
        );

        Ok(TargetOutcome {
            name: target.name.clone(),
            added: added.len(),
            total: snapshot.len(),
            failed: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use tempfile::TempDir;

    use super::*;
    use crate::error::{AppError, NetworkFailure};
    use crate::models::{Item, Record, Snapshot};
    use crate::storage::{LocalStorage, WriteMetadata};

    struct StubFetcher {
        pages: HashMap<String, String>,
    }

    impl StubFetcher {
        fn new(pages: &[(&str, String)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(url, body)| (url.to_string(), body.clone()))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl PageFetcher for StubFetcher {
        async fn fetch(&self, url: &str) -> Result<String> {
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| AppError::Network {
                    url: url.to_string(),
                    attempts: 3,
                    source: NetworkFailure::Timeout(Duration::from_millis(10)),
                })
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, message: &str) -> Result<()> {
            self.sent.lock().unwrap().push(message.to_string());
            if self.fail {
                Err(AppError::notify("channel down"))
            } else {
                Ok(())
            }
        }
    }

    /// Local storage that refuses to save one output.
    struct FailingSave {
        inner: LocalStorage,
        reject: String,
    }

    #[async_trait]
    impl SnapshotStore for FailingSave {
        async fn load(&self, key: &str) -> Snapshot {
            self.inner.load(key).await
        }

        async fn save(&self, key: &str, records: &[Record]) -> Result<WriteMetadata> {
            if key == self.reject {
                return Err(AppError::storage(
                    self.inner.path(key),
                    std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
                ));
            }
            self.inner.save(key, records).await
        }
    }

    fn page(ids: &[u32]) -> String {
        let rows: String = ids
            .iter()
            .map(|id| {
                format!(
                    r#"<table class="result"><tbody><tr>
                        <td class="desc"><p><a href="/work/vacancy_show/{id}">Listing {id}</a></p></td>
                        <td class="price">{id}00 руб.</td>
                    </tr></tbody></table>"#
                )
            })
            .collect();
        format!("<html><body>{rows}</body></html>")
    }

    fn config(history_size: usize) -> Config {
        let mut config = Config::default();
        config.history.history_size = history_size;
        config
    }

    #[tokio::test]
    async fn first_cycle_notifies_and_saves() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStorage::new(tmp.path());
        let target = Target::vacancies();
        let fetcher = StubFetcher::new(&[(target.url.as_str(), page(&[1, 2]))]);
        let notifier = RecordingNotifier::default();
        let runner = CycleRunner::new(&config(10), &fetcher, &store, &notifier);

        let outcome = runner.run_target(&target).await.unwrap();

        assert_eq!(outcome.added, 2);
        assert_eq!(outcome.total, 2);
        let sent = notifier.sent.lock().unwrap();
        assert!(sent[0].contains("Listing 1"));
        assert!(sent[1].contains("https://3ddd.ru/work/vacancy_show/2"));

        let saved = store.load(&target.output).await;
        assert_eq!(saved[0].key, "https://3ddd.ru/work/vacancy_show/1");
    }

    #[tokio::test]
    async fn second_cycle_only_reports_new_items() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStorage::new(tmp.path());
        let target = Target::vacancies();
        let notifier = RecordingNotifier::default();

        let first = StubFetcher::new(&[(target.url.as_str(), page(&[1, 2]))]);
        CycleRunner::new(&config(3), &first, &store, &notifier)
            .run_target(&target)
            .await
            .unwrap();
        let first_seen = store.load(&target.output).await[1].first_seen_at;

        let second = StubFetcher::new(&[(target.url.as_str(), page(&[2, 3, 4]))]);
        let outcome = CycleRunner::new(&config(3), &second, &store, &notifier)
            .run_target(&target)
            .await
            .unwrap();

        assert_eq!(outcome.added, 2);
        assert_eq!(notifier.sent.lock().unwrap().len(), 4);

        let saved = store.load(&target.output).await;
        let keys: Vec<&str> = saved.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "https://3ddd.ru/work/vacancy_show/2",
                "https://3ddd.ru/work/vacancy_show/3",
                "https://3ddd.ru/work/vacancy_show/4",
            ]
        );
        assert_eq!(saved[0].first_seen_at, first_seen);
    }

    #[tokio::test]
    async fn failed_fetch_leaves_snapshot_untouched() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStorage::new(tmp.path());
        let vacancies = Target::vacancies();
        let tasks = Target::tasks();

        let existing = vec![
            Item::new("https://3ddd.ru/work/vacancy_show/1", "Old")
                .into_record(Utc::now())
                .unwrap(),
        ];
        store.save(&vacancies.output, &existing).await.unwrap();
        let before = std::fs::read(store.path(&vacancies.output)).unwrap();

        // Only the tasks page is reachable.
        let fetcher = StubFetcher::new(&[(tasks.url.as_str(), page(&[7]))]);
        let notifier = RecordingNotifier::default();
        let runner = CycleRunner::new(&config(10), &fetcher, &store, &notifier);

        let report = runner.run_cycle(&[vacancies.clone(), tasks.clone()]).await;

        assert_eq!(report.failures(), 1);
        assert!(report.outcomes[0].failed);
        assert_eq!(report.outcomes[0].added, 0);
        assert_eq!(report.outcomes[1].added, 1);
        assert_eq!(report.added(), 1);

        let after = std::fs::read(store.path(&vacancies.output)).unwrap();
        assert_eq!(before, after);
        assert_eq!(store.load(&tasks.output).await.len(), 1);
    }

    #[tokio::test]
    async fn failed_save_is_contained_per_target() {
        let tmp = TempDir::new().unwrap();
        let vacancies = Target::vacancies();
        let tasks = Target::tasks();
        let store = FailingSave {
            inner: LocalStorage::new(tmp.path()),
            reject: vacancies.output.clone(),
        };
        let fetcher = StubFetcher::new(&[
            (vacancies.url.as_str(), page(&[1, 2])),
            (tasks.url.as_str(), page(&[3])),
        ]);
        let notifier = RecordingNotifier::default();
        let runner = CycleRunner::new(&config(10), &fetcher, &store, &notifier);

        let report = runner.run_cycle(&[vacancies.clone(), tasks.clone()]).await;

        assert!(report.outcomes[0].failed);
        assert_eq!(report.outcomes[0].added, 0);
        assert_eq!(report.outcomes[0].total, 0);
        assert!(!report.outcomes[1].failed);
        assert_eq!(report.added(), 1);
        assert_eq!(report.failures(), 1);

        assert!(!store.inner.path(&vacancies.output).exists());
        assert_eq!(store.load(&tasks.output).await.len(), 1);
    }

    #[tokio::test]
    async fn notification_errors_do_not_block_save() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStorage::new(tmp.path());
        let target = Target::tasks();
        let fetcher = StubFetcher::new(&[(target.url.as_str(), page(&[1, 2, 3]))]);
        let notifier = RecordingNotifier {
            fail: true,
            ..RecordingNotifier::default()
        };
        let runner = CycleRunner::new(&config(10), &fetcher, &store, &notifier);

        let outcome = runner.run_target(&target).await.unwrap();

        assert_eq!(outcome.added, 3);
        assert_eq!(notifier.sent.lock().unwrap().len(), 3);
        assert_eq!(store.load(&target.output).await.len(), 3);
    }

    #[tokio::test]
    async fn empty_page_keeps_history() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStorage::new(tmp.path());
        let target = Target::vacancies();
        let notifier = RecordingNotifier::default();

        let full = StubFetcher::new(&[(target.url.as_str(), page(&[1, 2]))]);
        CycleRunner::new(&config(10), &full, &store, &notifier)
            .run_target(&target)
            .await
            .unwrap();

        let empty = StubFetcher::new(&[(target.url.as_str(), page(&[]))]);
        let outcome = CycleRunner::new(&config(10), &empty, &store, &notifier)
            .run_target(&target)
            .await
            .unwrap();

        assert_eq!(outcome.added, 0);
        assert_eq!(outcome.total, 2);
    }

    #[tokio::test]
    async fn invalid_selector_fails_only_that_target() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStorage::new(tmp.path());
        let mut broken = Target::vacancies();
        broken.selectors.row_selector = "[[".to_string();
        let tasks = Target::tasks();
        let fetcher = StubFetcher::new(&[
            (broken.url.as_str(), page(&[1])),
            (tasks.url.as_str(), page(&[2])),
        ]);
        let notifier = RecordingNotifier::default();
        let runner = CycleRunner::new(&config(10), &fetcher, &store, &notifier);

        let report = runner.run_cycle(&[broken.clone(), tasks]).await;

        assert!(report.outcomes[0].failed);
        assert!(!report.outcomes[1].failed);
        assert!(!store.path(&broken.output).exists());
    }
}
