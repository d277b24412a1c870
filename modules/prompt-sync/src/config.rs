use std::time::Duration;

use bananaprompts_client::DEFAULT_FEED_URL;
use clap::Args;

use crate::error::SyncError;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const DEFAULT_MAX_PAGES: u32 = 500;
pub const DEFAULT_PAGE_DELAY_MS: u64 = 1_000;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_FETCH_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 5_000;
pub const DEFAULT_TABLE: &str = "prompts";

/// Command-line surface of the sync job. Every flag can also come from the
/// environment (or a `.env` file loaded before parsing).
#[derive(Debug, Clone, Args)]
pub struct SyncArgs {
    /// Supabase project URL
    #[arg(long, env = "NEXT_PUBLIC_SUPABASE_URL", hide_env_values = true)]
    pub supabase_url: Option<String>,

    /// Supabase service role key
    #[arg(long, env = "SUPABASE_SERVICE_ROLE_KEY", hide_env_values = true)]
    pub supabase_key: Option<String>,

    /// Prompt feed endpoint
    #[arg(long, env = "PROMPT_SYNC_SOURCE_URL", default_value = DEFAULT_FEED_URL)]
    pub source_url: String,

    /// Records requested per page
    #[arg(long, env = "PROMPT_SYNC_PAGE_SIZE", default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: u32,

    /// Hard cap on pages fetched in one run
    #[arg(long, env = "PROMPT_SYNC_MAX_PAGES", default_value_t = DEFAULT_MAX_PAGES)]
    pub max_pages: u32,

    /// Pause between pages, in milliseconds
    #[arg(long, env = "PROMPT_SYNC_PAGE_DELAY_MS", default_value_t = DEFAULT_PAGE_DELAY_MS)]
    pub page_delay_ms: u64,

    /// Source request timeout, in seconds
    #[arg(long, env = "PROMPT_SYNC_FETCH_TIMEOUT_SECS", default_value_t = DEFAULT_FETCH_TIMEOUT_SECS)]
    pub fetch_timeout_secs: u64,

    /// Retries of the same page after a source timeout
    #[arg(long, env = "PROMPT_SYNC_FETCH_RETRIES", default_value_t = DEFAULT_FETCH_RETRIES)]
    pub fetch_retries: u32,

    /// Pause before retrying a timed-out page, in milliseconds
    #[arg(long, env = "PROMPT_SYNC_RETRY_BACKOFF_MS", default_value_t = DEFAULT_RETRY_BACKOFF_MS)]
    pub retry_backoff_ms: u64,

    /// Destination table
    #[arg(long, env = "PROMPT_SYNC_TABLE", default_value = DEFAULT_TABLE)]
    pub table: String,

    /// Fetch and normalize, but never write to Supabase
    #[arg(long, env = "PROMPT_SYNC_DRY_RUN")]
    pub dry_run: bool,
}

impl Default for SyncArgs {
    fn default() -> Self {
        Self {
            supabase_url: None,
            supabase_key: None,
            source_url: DEFAULT_FEED_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
            page_delay_ms: DEFAULT_PAGE_DELAY_MS,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            fetch_retries: DEFAULT_FETCH_RETRIES,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
            table: DEFAULT_TABLE.to_string(),
            dry_run: false,
        }
    }
}

/// Validated configuration, built once at startup and handed to the loop.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    // Destination
    pub supabase_url: String,
    pub supabase_key: String,
    pub table: String,

    // Source
    pub source_url: String,
    pub page_size: u32,
    pub max_pages: u32,
    pub fetch_timeout: Duration,
    pub fetch_retries: u32,
    pub retry_backoff: Duration,

    // Pacing
    pub page_delay: Duration,

    pub dry_run: bool,
}

impl SyncConfig {
    /// Defaults for everything but the two credentials.
    pub fn new(supabase_url: impl Into<String>, supabase_key: impl Into<String>) -> Self {
        Self {
            supabase_url: supabase_url.into(),
            supabase_key: supabase_key.into(),
            table: DEFAULT_TABLE.to_string(),
            source_url: DEFAULT_FEED_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            fetch_retries: DEFAULT_FETCH_RETRIES,
            retry_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
            page_delay: Duration::from_millis(DEFAULT_PAGE_DELAY_MS),
            dry_run: false,
        }
    }

    /// Validate parsed arguments. Blank credentials count as missing.
    pub fn from_args(args: SyncArgs) -> Result<Self, SyncError> {
        let mut missing = Vec::new();
        let supabase_url = non_blank(args.supabase_url);
        let supabase_key = non_blank(args.supabase_key);
        if supabase_url.is_none() {
            missing.push("NEXT_PUBLIC_SUPABASE_URL");
        }
        if supabase_key.is_none() {
            missing.push("SUPABASE_SERVICE_ROLE_KEY");
        }
        let (Some(supabase_url), Some(supabase_key)) = (supabase_url, supabase_key) else {
            return Err(SyncError::Config(format!(
                "missing required environment variable(s): {}",
                missing.join(", ")
            )));
        };

        for (name, value) in [
            ("page size", u64::from(args.page_size)),
            ("max pages", u64::from(args.max_pages)),
            ("fetch timeout", args.fetch_timeout_secs),
        ] {
            if value == 0 {
                return Err(SyncError::Config(format!("{name} must be at least 1")));
            }
        }

        if args.table.trim().is_empty() {
            return Err(SyncError::Config("table name must not be empty".into()));
        }

        Ok(Self {
            supabase_url,
            supabase_key,
            table: args.table.trim().to_string(),
            source_url: args.source_url,
            page_size: args.page_size,
            max_pages: args.max_pages,
            fetch_timeout: Duration::from_secs(args.fetch_timeout_secs),
            fetch_retries: args.fetch_retries,
            retry_backoff: Duration::from_millis(args.retry_backoff_ms),
            page_delay: Duration::from_millis(args.page_delay_ms),
            dry_run: args.dry_run,
        })
    }

    /// Log the effective config with the service key reduced to a preview.
    pub fn log_redacted(&self) {
        fn preview(val: &str) -> String {
            let head: String = val.chars().take(5).collect();
            format!("{head}...({} chars)", val.chars().count())
        }

        tracing::info!("Config loaded:");
        tracing::info!("  NEXT_PUBLIC_SUPABASE_URL: {}", self.supabase_url);
        tracing::info!("  SUPABASE_SERVICE_ROLE_KEY: {}", preview(&self.supabase_key));
        tracing::info!("  table: {}", self.table);
        tracing::info!("  source: {}", self.source_url);
        tracing::info!(
            page_size = self.page_size,
            max_pages = self.max_pages,
            page_delay_ms = self.page_delay.as_millis() as u64,
            fetch_timeout_secs = self.fetch_timeout.as_secs(),
            fetch_retries = self.fetch_retries,
            dry_run = self.dry_run,
            "  tunables"
        );
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn with_credentials() -> SyncArgs {
        SyncArgs {
            supabase_url: Some("https://abc.supabase.co".into()),
            supabase_key: Some("service-role-key".into()),
            ..SyncArgs::default()
        }
    }

    #[test]
    fn missing_credentials_are_a_config_error() {
        let err = SyncConfig::from_args(SyncArgs::default()).unwrap_err();
        match err {
            SyncError::Config(msg) => {
                assert!(msg.contains("NEXT_PUBLIC_SUPABASE_URL"));
                assert!(msg.contains("SUPABASE_SERVICE_ROLE_KEY"));
            }
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn one_missing_credential_is_enough_to_abort() {
        let args = SyncArgs {
            supabase_key: None,
            ..with_credentials()
        };
        let err = SyncConfig::from_args(args).unwrap_err();
        match err {
            SyncError::Config(msg) => {
                assert!(msg.contains("SUPABASE_SERVICE_ROLE_KEY"));
                assert!(!msg.contains("NEXT_PUBLIC_SUPABASE_URL"));
            }
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn blank_credential_counts_as_missing() {
        let args = SyncArgs {
            supabase_url: Some("   ".into()),
            ..with_credentials()
        };
        assert!(matches!(
            SyncConfig::from_args(args),
            Err(SyncError::Config(_))
        ));
    }

    #[test]
    fn zero_tunables_are_rejected() {
        let args = SyncArgs {
            max_pages: 0,
            ..with_credentials()
        };
        assert!(matches!(
            SyncConfig::from_args(args),
            Err(SyncError::Config(_))
        ));

        let args = SyncArgs {
            page_size: 0,
            ..with_credentials()
        };
        assert!(matches!(
            SyncConfig::from_args(args),
            Err(SyncError::Config(_))
        ));
    }

    #[test]
    fn defaults_carry_through() {
        let config = SyncConfig::from_args(with_credentials()).unwrap();
        assert_eq!(config.page_size, 20);
        assert_eq!(config.max_pages, DEFAULT_MAX_PAGES);
        assert_eq!(config.fetch_timeout, Duration::from_secs(15));
        assert_eq!(config.page_delay, Duration::from_secs(1));
        assert_eq!(config.table, "prompts");
        assert_eq!(config.source_url, DEFAULT_FEED_URL);
        assert!(!config.dry_run);
    }

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        sync: SyncArgs,
    }

    #[test]
    fn flags_parse() {
        let cli = TestCli::parse_from([
            "prompt-sync",
            "--supabase-url",
            "https://abc.supabase.co",
            "--supabase-key",
            "key",
            "--page-size",
            "5",
            "--max-pages",
            "2",
            "--page-delay-ms",
            "1500",
            "--dry-run",
        ]);
        let config = SyncConfig::from_args(cli.sync).unwrap();
        assert_eq!(config.page_size, 5);
        assert_eq!(config.max_pages, 2);
        assert_eq!(config.page_delay, Duration::from_millis(1500));
        assert!(config.dry_run);
    }
}
