// Seams between the sync loop and the outside world.
//
// PageSource: one page of the prompt feed.
// RowSink: one batch upsert into the destination table.
//
// The loop only talks to these, so tests drive it with MockSource and
// RecordingSink from `testing`: no network, no Supabase project.

use async_trait::async_trait;
use tracing::info;

use bananaprompts_client::{BananaPromptsClient, BananaPromptsError, PromptPage};
use supabase_client::{SupabaseClient, SupabaseError};

use crate::normalize::{PromptRow, CONFLICT_COLUMN};

// ---------------------------------------------------------------------------
// PageSource
// ---------------------------------------------------------------------------

#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch 1-based `page` holding at most `limit` records.
    async fn fetch_page(&self, page: u32, limit: u32) -> Result<PromptPage, BananaPromptsError>;
}

#[async_trait]
impl PageSource for BananaPromptsClient {
    async fn fetch_page(&self, page: u32, limit: u32) -> Result<PromptPage, BananaPromptsError> {
        BananaPromptsClient::fetch_page(self, page, limit).await
    }
}

// ---------------------------------------------------------------------------
// RowSink
// ---------------------------------------------------------------------------

#[async_trait]
pub trait RowSink: Send + Sync {
    /// Write one page's rows as a single upsert keyed on `title`.
    async fn upsert_batch(&self, rows: &[PromptRow]) -> Result<(), SupabaseError>;
}

/// Upserts into a Supabase table through PostgREST.
pub struct SupabaseSink {
    client: SupabaseClient,
    table: String,
}

impl SupabaseSink {
    pub fn new(client: SupabaseClient, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }
}

#[async_trait]
impl RowSink for SupabaseSink {
    async fn upsert_batch(&self, rows: &[PromptRow]) -> Result<(), SupabaseError> {
        self.client.upsert(&self.table, rows, CONFLICT_COLUMN).await
    }
}

/// Logs what would have been written and drops it.
pub struct DryRunSink;

#[async_trait]
impl RowSink for DryRunSink {
    async fn upsert_batch(&self, rows: &[PromptRow]) -> Result<(), SupabaseError> {
        let first = rows.first().map(|r| r.title.as_str()).unwrap_or_default();
        info!(rows = rows.len(), first_title = first, "Dry run, skipping upsert");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize_record;
    use crate::testing::prompt;

    #[test]
    fn dry_run_sink_accepts_everything() {
        let rows: Vec<PromptRow> = ["A", "B"]
            .into_iter()
            .filter_map(|t| normalize_record(prompt(t, None)))
            .collect();

        assert!(tokio_test::block_on(DryRunSink.upsert_batch(&rows)).is_ok());
        assert!(tokio_test::block_on(DryRunSink.upsert_batch(&[])).is_ok());
    }
}
