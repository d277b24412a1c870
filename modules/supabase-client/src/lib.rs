pub mod error;
pub mod types;

pub use error::{Result, SupabaseError};
pub use types::PostgrestError;

use serde::Serialize;
use url::Url;

/// Insert, or overwrite the row that already holds the conflict key.
const UPSERT_PREFER: &str = "resolution=merge-duplicates,return=minimal";

pub struct SupabaseClient {
    client: reqwest::Client,
    rest_url: Url,
    service_key: String,
}

impl SupabaseClient {
    /// Validate the project URL and build a client authenticated with the
    /// service role key. No network call is made here.
    pub fn new(project_url: &str, service_key: impl Into<String>) -> Result<Self> {
        let rest_url = rest_endpoint(project_url)?;
        Ok(Self {
            client: reqwest::Client::new(),
            rest_url,
            service_key: service_key.into(),
        })
    }

    pub fn rest_url(&self) -> &Url {
        &self.rest_url
    }

    /// Upsert `rows` into `table` in a single request, resolving conflicts on
    /// `on_conflict` by overwriting the existing row.
    pub async fn upsert<T: Serialize>(
        &self,
        table: &str,
        rows: &[T],
        on_conflict: &str,
    ) -> Result<()> {
        let url = upsert_url(&self.rest_url, table, on_conflict)?;
        let body = serde_json::to_vec(rows)?;

        tracing::debug!(table, rows = rows.len(), on_conflict, "Upserting batch");

        let resp = self
            .client
            .post(url)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .header("Prefer", UPSERT_PREFER)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SupabaseError::Api {
                status: status.as_u16(),
                message: PostgrestError::describe(&body),
            });
        }

        Ok(())
    }
}

/// `{project}/rest/v1/`, tolerating a project URL with or without a trailing slash.
fn rest_endpoint(project_url: &str) -> Result<Url> {
    let invalid = |reason: String| SupabaseError::InvalidUrl {
        url: project_url.to_string(),
        reason,
    };

    let mut base = Url::parse(project_url.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", base.scheme())));
    }
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join("rest/v1/").map_err(|e| invalid(e.to_string()))
}

fn upsert_url(rest_url: &Url, table: &str, on_conflict: &str) -> Result<Url> {
    let mut url = rest_url
        .join(table)
        .map_err(|e| SupabaseError::InvalidUrl {
            url: format!("{rest_url}{table}"),
            reason: e.to_string(),
        })?;
    url.query_pairs_mut().append_pair("on_conflict", on_conflict);
    Ok(url)
}
