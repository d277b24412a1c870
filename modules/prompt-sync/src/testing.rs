//! In-memory source and sink for driving the sync loop in tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use bananaprompts_client::{BananaPromptsError, Pagination, PromptPage, RawTags, SourcePrompt};
use supabase_client::SupabaseError;

use crate::config::SyncConfig;
use crate::normalize::PromptRow;
use crate::traits::{PageSource, RowSink};

/// Config with no pauses, suitable for tests.
pub fn test_config() -> SyncConfig {
    SyncConfig {
        page_delay: Duration::ZERO,
        retry_backoff: Duration::ZERO,
        ..SyncConfig::new("https://test.supabase.co", "test-service-key")
    }
}

/// A feed record with a title and optional tags.
pub fn prompt(title: &str, tags: Option<RawTags>) -> SourcePrompt {
    SourcePrompt {
        title: Some(title.to_string()),
        content: Some(format!("prompt text for {title}")),
        tags,
        thumbnail_url: None,
        source_url: None,
    }
}

/// `tags` sent as a JSON-encoded string.
pub fn encoded_tags(raw: &str) -> Option<RawTags> {
    Some(RawTags::Encoded(raw.to_string()))
}

pub fn envelope(records: Vec<SourcePrompt>, has_more: bool) -> PromptPage {
    PromptPage {
        data: records,
        pagination: Some(Pagination {
            has_more: Some(has_more),
        }),
        malformed: 0,
    }
}

// ---------------------------------------------------------------------------
// MockSource
// ---------------------------------------------------------------------------

type Response = Result<PromptPage, BananaPromptsError>;

/// Scripted feed. Responses queued for a page are served in order; a page
/// with nothing queued is empty, or a one-record page with `hasMore: true`
/// when built with `endless()`.
pub struct MockSource {
    inner: Mutex<MockSourceInner>,
}

struct MockSourceInner {
    responses: HashMap<u32, VecDeque<Response>>,
    requests: Vec<u32>,
    endless: bool,
}

impl MockSource {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MockSourceInner {
                responses: HashMap::new(),
                requests: Vec::new(),
                endless: false,
            }),
        }
    }

    /// A feed that always reports another page.
    pub fn endless() -> Self {
        let source = Self::new();
        source.inner.lock().unwrap().endless = true;
        source
    }

    pub fn page(self, page: u32, records: Vec<SourcePrompt>, has_more: bool) -> Self {
        self.push(page, Ok(envelope(records, has_more)));
        self
    }

    /// Serve a page decoded from raw feed JSON, exactly as the client would.
    pub fn raw_page(self, page: u32, body: serde_json::Value) -> Self {
        let response = serde_json::from_value::<PromptPage>(body)
            .map_err(|e| BananaPromptsError::Parse(e.to_string()));
        self.push(page, response);
        self
    }

    pub fn fail(self, page: u32, err: BananaPromptsError) -> Self {
        self.push(page, Err(err));
        self
    }

    fn push(&self, page: u32, response: Response) {
        self.inner
            .lock()
            .unwrap()
            .responses
            .entry(page)
            .or_default()
            .push_back(response);
    }

    /// Page numbers requested so far, in order.
    pub fn requests(&self) -> Vec<u32> {
        self.inner.lock().unwrap().requests.clone()
    }
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageSource for MockSource {
    async fn fetch_page(&self, page: u32, _limit: u32) -> Result<PromptPage, BananaPromptsError> {
        let mut inner = self.inner.lock().unwrap();
        inner.requests.push(page);

        if let Some(response) = inner.responses.get_mut(&page).and_then(|q| q.pop_front()) {
            return response;
        }
        if inner.endless {
            return Ok(envelope(vec![prompt(&format!("prompt {page}"), None)], true));
        }
        Ok(envelope(Vec::new(), false))
    }
}

// ---------------------------------------------------------------------------
// RecordingSink
// ---------------------------------------------------------------------------

/// Records every batch it receives. Optionally rejects one call.
pub struct RecordingSink {
    inner: Mutex<RecordingSinkInner>,
}

struct RecordingSinkInner {
    batches: Vec<Vec<PromptRow>>,
    calls: usize,
    fail_on_call: Option<usize>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RecordingSinkInner {
                batches: Vec::new(),
                calls: 0,
                fail_on_call: None,
            }),
        }
    }

    /// Reject the `call`-th upsert (1-based) with a PostgREST error.
    pub fn failing_on(self, call: usize) -> Self {
        self.inner.lock().unwrap().fail_on_call = Some(call);
        self
    }

    /// Batches that were accepted, in write order.
    pub fn batches(&self) -> Vec<Vec<PromptRow>> {
        self.inner.lock().unwrap().batches.clone()
    }

    /// Upsert attempts, including a rejected one.
    pub fn calls(&self) -> usize {
        self.inner.lock().unwrap().calls
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RowSink for RecordingSink {
    async fn upsert_batch(&self, rows: &[PromptRow]) -> Result<(), SupabaseError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls += 1;
        if inner.fail_on_call == Some(inner.calls) {
            return Err(SupabaseError::Api {
                status: 409,
                message: "duplicate key value violates unique constraint".into(),
            });
        }
        inner.batches.push(rows.to_vec());
        Ok(())
    }
}
