//! Feed record → `prompts` row.
//!
//! All the looseness of the feed (missing fields, `tags` as array or encoded
//! string, padded titles, repeated titles within a page) is resolved here,
//! so the loop and the sink only ever see well-formed rows.

use std::collections::HashMap;

use bananaprompts_client::{RawTags, SourcePrompt};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// Value of the `source` column for every row this job writes.
pub const SOURCE_LABEL: &str = "bananaprompts";

/// Conflict key of the destination table.
pub const CONFLICT_COLUMN: &str = "title";

/// One row of the destination table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptRow {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub original_image_url: Option<String>,
    pub source_x_account: Option<String>,
    pub source: String,
}

/// Rows of one page, ready for a single upsert.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageBatch {
    rows: Vec<PromptRow>,
    /// Records dropped because their title was blank.
    pub blank_titles: usize,
    /// Records folded into an earlier row with the same title.
    pub duplicates: usize,
}

impl PageBatch {
    pub fn rows(&self) -> &[PromptRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Resolve whatever the feed sent as `tags` into a plain list.
pub fn normalize_tags(tags: Option<RawTags>) -> Vec<String> {
    match tags {
        None => Vec::new(),
        Some(RawTags::List(values)) => tags_from_values(values),
        Some(RawTags::Encoded(raw)) => match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(values)) => tags_from_values(values),
            _ => {
                debug!(raw = %raw, "tags string is not a JSON array, keeping it as one tag");
                vec![raw]
            }
        },
        Some(RawTags::Other(value)) => vec![value.to_string()],
    }
}

fn tags_from_values(values: Vec<Value>) -> Vec<String> {
    values
        .into_iter()
        .filter_map(|value| match value {
            Value::Null => None,
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        })
        .collect()
}

/// Build the destination row, or `None` when the title is blank.
pub fn normalize_record(record: SourcePrompt) -> Option<PromptRow> {
    let title = record.title.as_deref().unwrap_or_default().trim();
    if title.is_empty() {
        return None;
    }

    Some(PromptRow {
        title: title.to_string(),
        content: record.content.unwrap_or_default(),
        tags: normalize_tags(record.tags),
        original_image_url: record.thumbnail_url,
        source_x_account: record.source_url,
        source: SOURCE_LABEL.to_string(),
    })
}

/// Normalize a page and collapse repeated titles. The last record for a
/// title wins; the row keeps the slot where that title first appeared.
pub fn build_batch(records: Vec<SourcePrompt>) -> PageBatch {
    let mut batch = PageBatch::default();
    let mut slots: HashMap<String, usize> = HashMap::new();

    for record in records {
        let Some(row) = normalize_record(record) else {
            batch.blank_titles += 1;
            continue;
        };

        match slots.get(&row.title) {
            Some(&slot) => {
                batch.rows[slot] = row;
                batch.duplicates += 1;
            }
            None => {
                slots.insert(row.title.clone(), batch.rows.len());
                batch.rows.push(row);
            }
        }
    }

    batch
}
