use std::fmt;
use std::sync::Arc;

use bananaprompts_client::PromptPage;
use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::config::SyncConfig;
use crate::error::{SyncError, EXIT_COMPLETED, EXIT_PAGE_CEILING};
use crate::normalize::build_batch;
use crate::traits::{PageSource, RowSink};

/// Why the loop stopped.
#[derive(Debug)]
pub enum StopReason {
    /// The feed said there were no more pages.
    Exhausted,
    /// The feed returned a page with no records.
    EmptyPage,
    /// `max_pages` pages were synced and the feed still reported more.
    PageCeiling,
    /// A page-level failure ended the run early.
    Failed(SyncError),
}

impl StopReason {
    pub fn exit_code(&self) -> u8 {
        match self {
            StopReason::Exhausted | StopReason::EmptyPage => EXIT_COMPLETED,
            StopReason::PageCeiling => EXIT_PAGE_CEILING,
            StopReason::Failed(err) => err.exit_code(),
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Exhausted => write!(f, "feed exhausted"),
            StopReason::EmptyPage => write!(f, "empty page"),
            StopReason::PageCeiling => write!(f, "page ceiling reached"),
            StopReason::Failed(err) => write!(f, "aborted: {err}"),
        }
    }
}

/// Outcome of one run.
#[derive(Debug)]
pub struct SyncReport {
    pub rows_synced: usize,
    pub pages_fetched: u32,
    pub stop: StopReason,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SyncReport {
    pub fn exit_code(&self) -> u8 {
        self.stop.exit_code()
    }

    pub fn is_complete(&self) -> bool {
        self.exit_code() == EXIT_COMPLETED
    }

    pub fn error(&self) -> Option<&SyncError> {
        match &self.stop {
            StopReason::Failed(err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let elapsed = self.finished_at - self.started_at;
        write!(
            f,
            "Rows synced: {}, pages fetched: {}, stopped: {}, took {:.1}s",
            self.rows_synced,
            self.pages_fetched,
            self.stop,
            elapsed.num_milliseconds() as f64 / 1000.0
        )
    }
}

/// Paginated fetch → normalize → upsert loop.
pub struct PromptSync {
    source: Arc<dyn PageSource>,
    sink: Arc<dyn RowSink>,
    config: SyncConfig,
}

impl PromptSync {
    pub fn new(source: Arc<dyn PageSource>, sink: Arc<dyn RowSink>, config: SyncConfig) -> Self {
        Self {
            source,
            sink,
            config,
        }
    }

    /// Sync pages in order until the feed runs dry, the page ceiling is hit,
    /// or a page fails. Rows from pages written before a failure stay written.
    pub async fn run(&self) -> SyncReport {
        let started_at = Utc::now();
        let mut rows_synced = 0usize;
        let mut pages_fetched = 0u32;
        let mut page = 1u32;

        info!(
            source = %self.config.source_url,
            table = %self.config.table,
            max_pages = self.config.max_pages,
            dry_run = self.config.dry_run,
            "Starting prompt sync"
        );

        let stop = loop {
            if page > self.config.max_pages {
                warn!(
                    max_pages = self.config.max_pages,
                    "Page ceiling reached with more pages reported"
                );
                break StopReason::PageCeiling;
            }

            let fetched = match self.fetch_with_retry(page).await {
                Ok(fetched) => fetched,
                Err(err) => break StopReason::Failed(err),
            };
            pages_fetched += 1;

            let has_more = fetched.has_more();
            if fetched.is_empty() {
                info!(page, "Empty page, nothing left to sync");
                break StopReason::EmptyPage;
            }

            let received = fetched.received();
            let malformed = fetched.malformed;
            let batch = build_batch(fetched.data);
            if !batch.is_empty() {
                if let Err(err) = self.sink.upsert_batch(batch.rows()).await {
                    break StopReason::Failed(SyncError::Write {
                        page,
                        rows: batch.len(),
                        message: err.to_string(),
                    });
                }
            }
            rows_synced += batch.len();

            info!(
                page,
                received,
                malformed,
                rows = batch.len(),
                blank_titles = batch.blank_titles,
                duplicates = batch.duplicates,
                total = rows_synced,
                has_more,
                "Page synced"
            );

            if !has_more {
                break StopReason::Exhausted;
            }
            page += 1;

            if page <= self.config.max_pages && !self.config.page_delay.is_zero() {
                tokio::time::sleep(self.config.page_delay).await;
            }
        };

        if let StopReason::Failed(err) = &stop {
            error!(error = %err, rows_synced, "Sync aborted");
        }

        SyncReport {
            rows_synced,
            pages_fetched,
            stop,
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Fetch `page`, re-requesting it after a timeout up to `fetch_retries` times.
    async fn fetch_with_retry(&self, page: u32) -> Result<PromptPage, SyncError> {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            info!(page, attempt = attempts, "Fetching page");

            match self.source.fetch_page(page, self.config.page_size).await {
                Ok(fetched) => return Ok(fetched),
                Err(err) if err.is_timeout() && attempts <= self.config.fetch_retries => {
                    warn!(
                        page,
                        attempt = attempts,
                        backoff_ms = self.config.retry_backoff.as_millis() as u64,
                        error = %err,
                        "Source timed out, retrying page"
                    );
                    if !self.config.retry_backoff.is_zero() {
                        tokio::time::sleep(self.config.retry_backoff).await;
                    }
                }
                Err(err) => return Err(SyncError::from_fetch(page, attempts, err)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    #[test]
    fn stop_reasons_map_to_exit_codes() {
        assert_eq!(StopReason::Exhausted.exit_code(), 0);
        assert_eq!(StopReason::EmptyPage.exit_code(), 0);
        assert_eq!(StopReason::PageCeiling.exit_code(), 3);
        let failed = StopReason::Failed(SyncError::Fetch {
            page: 1,
            message: "reset".into(),
        });
        assert_eq!(failed.exit_code(), 1);
    }

    #[tokio::test]
    async fn ceiling_is_checked_before_fetching() {
        let source = Arc::new(MockSource::endless());
        let sink = Arc::new(RecordingSink::new());
        let config = SyncConfig {
            max_pages: 1,
            ..test_config()
        };

        let report = PromptSync::new(source.clone(), sink.clone(), config)
            .run()
            .await;

        assert!(matches!(report.stop, StopReason::PageCeiling));
        assert_eq!(source.requests(), vec![1]);
        assert_eq!(report.pages_fetched, 1);
    }

    #[tokio::test]
    async fn report_display_mentions_totals() {
        let source = Arc::new(
            MockSource::new().page(1, vec![prompt("A", None)], false),
        );
        let sink = Arc::new(RecordingSink::new());

        let report = PromptSync::new(source, sink, test_config()).run().await;

        let line = report.to_string();
        assert!(line.contains("Rows synced: 1"));
        assert!(line.contains("feed exhausted"));
        assert!(report.is_complete());
        assert!(report.error().is_none());
    }
}
