use bananaprompts_client::BananaPromptsError;
use thiserror::Error;

/// Exit code for a run that drained the feed.
pub const EXIT_COMPLETED: u8 = 0;
/// Exit code for a run aborted by a fetch, parse or write failure.
pub const EXIT_ABORTED: u8 = 1;
/// Exit code for a run that never started because of bad configuration.
pub const EXIT_CONFIG: u8 = 2;
/// Exit code for a run that stopped at the page ceiling with pages left.
pub const EXIT_PAGE_CEILING: u8 = 3;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Page {page}: source timed out after {attempts} attempt(s)")]
    FetchTimeout { page: u32, attempts: u32 },

    #[error("Page {page}: source returned status {status}: {message}")]
    FetchHttp {
        page: u32,
        status: u16,
        message: String,
    },

    #[error("Page {page}: fetch failed: {message}")]
    Fetch { page: u32, message: String },

    #[error("Page {page}: could not parse response: {message}")]
    Parse { page: u32, message: String },

    #[error("Page {page}: upsert of {rows} row(s) failed: {message}")]
    Write {
        page: u32,
        rows: usize,
        message: String,
    },
}

impl SyncError {
    /// Classify a source failure for `page` after `attempts` requests.
    pub fn from_fetch(page: u32, attempts: u32, err: BananaPromptsError) -> Self {
        match err {
            BananaPromptsError::Timeout(_) => SyncError::FetchTimeout { page, attempts },
            BananaPromptsError::Api { status, message } => SyncError::FetchHttp {
                page,
                status,
                message,
            },
            BananaPromptsError::Parse(message) => SyncError::Parse { page, message },
            BananaPromptsError::Network(message) => SyncError::Fetch { page, message },
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            SyncError::Config(_) => EXIT_CONFIG,
            _ => EXIT_ABORTED,
        }
    }
}

impl From<supabase_client::SupabaseError> for SyncError {
    /// Only reachable while building the destination client.
    fn from(err: supabase_client::SupabaseError) -> Self {
        SyncError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_errors_map_to_their_kind() {
        let err = SyncError::from_fetch(3, 4, BananaPromptsError::Timeout("slow".into()));
        assert!(matches!(err, SyncError::FetchTimeout { page: 3, attempts: 4 }));

        let err = SyncError::from_fetch(
            1,
            1,
            BananaPromptsError::Api {
                status: 500,
                message: "boom".into(),
            },
        );
        assert!(matches!(err, SyncError::FetchHttp { status: 500, .. }));

        let err = SyncError::from_fetch(2, 1, BananaPromptsError::Parse("eof".into()));
        assert!(matches!(err, SyncError::Parse { page: 2, .. }));

        let err = SyncError::from_fetch(2, 1, BananaPromptsError::Network("reset".into()));
        assert!(matches!(err, SyncError::Fetch { page: 2, .. }));
    }

    #[test]
    fn config_errors_get_their_own_exit_code() {
        assert_eq!(SyncError::Config("x".into()).exit_code(), EXIT_CONFIG);
        assert_eq!(
            SyncError::Fetch {
                page: 1,
                message: "x".into()
            }
            .exit_code(),
            EXIT_ABORTED
        );
    }
}
