use serde::{Deserialize, Deserializer};
use serde_json::Value;

// --- Page envelope ---

/// One page of the prompt feed: `{ data: [...], pagination: { hasMore } }`.
///
/// Records are decoded one at a time; an entry that is not a record at all
/// is counted in `malformed` instead of failing the page.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "RawPage")]
pub struct PromptPage {
    pub data: Vec<SourcePrompt>,
    pub pagination: Option<Pagination>,
    pub malformed: usize,
}

impl PromptPage {
    /// Whether the feed reports another page. Absent or null flag means no.
    pub fn has_more(&self) -> bool {
        self.pagination
            .as_ref()
            .and_then(|p| p.has_more)
            .unwrap_or(false)
    }

    /// Entries the feed sent, decodable or not.
    pub fn received(&self) -> usize {
        self.data.len() + self.malformed
    }

    /// The feed sent no entries at all.
    pub fn is_empty(&self) -> bool {
        self.received() == 0
    }
}

#[derive(Deserialize)]
struct RawPage {
    data: Vec<Value>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

impl From<RawPage> for PromptPage {
    fn from(raw: RawPage) -> Self {
        let mut data = Vec::with_capacity(raw.data.len());
        let mut malformed = 0;
        for entry in raw.data {
            match serde_json::from_value::<SourcePrompt>(entry) {
                Ok(record) => data.push(record),
                Err(e) => {
                    tracing::debug!(error = %e, "Skipping malformed feed entry");
                    malformed += 1;
                }
            }
        }
        Self {
            data,
            pagination: raw.pagination,
            malformed,
        }
    }
}

/// Continuation block of the envelope.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Pagination {
    #[serde(rename = "hasMore", default)]
    pub has_more: Option<bool>,
}

// --- Records ---

/// A single prompt as published by the feed. Text fields tolerate null and
/// scalar values; arrays or objects where text belongs read as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourcePrompt {
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub content: Option<String>,
    #[serde(default)]
    pub tags: Option<RawTags>,
    #[serde(rename = "thumbnailUrl", default, deserialize_with = "lenient_text")]
    pub thumbnail_url: Option<String>,
    #[serde(rename = "sourceUrl", default, deserialize_with = "lenient_text")]
    pub source_url: Option<String>,
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    })
}

/// The feed is inconsistent about `tags`: sometimes a real array, sometimes
/// the array JSON-encoded into a string. Anything else lands in `Other`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawTags {
    List(Vec<serde_json::Value>),
    Encoded(String),
    Other(serde_json::Value),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page(value: Value) -> PromptPage {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn has_more_defaults_to_false_without_pagination() {
        let p = page(json!({ "data": [] }));
        assert!(!p.has_more());

        let p = page(json!({ "data": [], "pagination": {} }));
        assert!(!p.has_more());

        let p = page(json!({ "data": [], "pagination": { "hasMore": true } }));
        assert!(p.has_more());
    }

    #[test]
    fn null_has_more_means_no_more_pages() {
        let p: PromptPage = serde_json::from_str(
            r#"{"data":[{"title":"A","tags":null}],"pagination":{"hasMore":null}}"#,
        )
        .unwrap();
        assert!(!p.has_more());
        assert_eq!(p.data[0].title.as_deref(), Some("A"));

        let p = page(json!({ "data": [], "pagination": null }));
        assert!(!p.has_more());
        assert!(p.is_empty());
    }

    #[test]
    fn wrong_typed_fields_do_not_sink_the_page() {
        let p: PromptPage = serde_json::from_str(
            r#"{"data":[{"title":"Good"},{"title":42},{"title":"Pic","thumbnailUrl":{"w":1},"sourceUrl":false}],"pagination":{"hasMore":true}}"#,
        )
        .unwrap();

        assert_eq!(p.data.len(), 3);
        assert_eq!(p.data[0].title.as_deref(), Some("Good"));
        assert_eq!(p.data[1].title.as_deref(), Some("42"));
        assert_eq!(p.data[2].thumbnail_url, None);
        assert_eq!(p.data[2].source_url.as_deref(), Some("false"));
        assert_eq!(p.malformed, 0);
        assert!(p.has_more());
    }

    #[test]
    fn non_record_entries_are_counted_not_fatal() {
        let p = page(json!({
            "data": [{ "title": "Kept" }, 7, "stray", null],
            "pagination": { "hasMore": false }
        }));
        assert_eq!(p.data.len(), 1);
        assert_eq!(p.malformed, 3);
        assert_eq!(p.received(), 4);
        assert!(!p.is_empty());
    }

    #[test]
    fn missing_data_is_a_parse_error() {
        let result: Result<PromptPage, _> =
            serde_json::from_value(json!({ "pagination": { "hasMore": true } }));
        assert!(result.is_err());
    }

    #[test]
    fn tags_variants_deserialize() {
        let p = page(json!({
            "data": [
                { "title": "a", "tags": ["x", "y"] },
                { "title": "b", "tags": "[\"x\"]" },
                { "title": "c", "tags": null },
                { "title": "d" },
                { "title": "e", "tags": 7 }
            ]
        }));

        assert_eq!(
            p.data[0].tags,
            Some(RawTags::List(vec![json!("x"), json!("y")]))
        );
        assert_eq!(p.data[1].tags, Some(RawTags::Encoded("[\"x\"]".into())));
        assert_eq!(p.data[2].tags, None);
        assert_eq!(p.data[3].tags, None);
        assert_eq!(p.data[4].tags, Some(RawTags::Other(json!(7))));
    }

    #[test]
    fn camel_case_urls_map_to_fields() {
        let p = page(json!({
            "data": [{
                "title": "Neon alley",
                "content": "a rainy street",
                "thumbnailUrl": "https://cdn.example/t.png",
                "sourceUrl": null
            }]
        }));
        let record = &p.data[0];
        assert_eq!(record.thumbnail_url.as_deref(), Some("https://cdn.example/t.png"));
        assert_eq!(record.source_url, None);
        assert_eq!(record.content.as_deref(), Some("a rainy street"));
    }
}
