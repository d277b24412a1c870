use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use bananaprompts_client::BananaPromptsClient;
use prompt_sync::{
    DryRunSink, PageSource, PromptSync, RowSink, SupabaseSink, SyncArgs, SyncConfig, SyncError,
};
use supabase_client::SupabaseClient;

#[derive(Parser)]
#[command(
    name = "prompt-sync",
    about = "Sync the BananaPrompts feed into the Supabase prompts table"
)]
struct Cli {
    #[command(flatten)]
    sync: SyncArgs,

    /// Emit JSON log lines
    #[arg(long, env = "PROMPT_SYNC_JSON_LOGS")]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // .env first so env-backed flags can see it
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let filter = log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref());
    if cli.json_logs {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!("Prompt sync starting...");

    let config = match SyncConfig::from_args(cli.sync) {
        Ok(config) => config,
        Err(err) => return Ok(abort_before_start(err)),
    };
    config.log_redacted();

    let (source, sink) = match build_clients(&config) {
        Ok(clients) => clients,
        Err(err) => return Ok(abort_before_start(err)),
    };

    let report = PromptSync::new(source, sink, config).run().await;

    info!("Sync finished. {report}");
    println!("Sync finished: {} rows processed ({})", report.rows_synced, report.stop);

    Ok(ExitCode::from(report.exit_code()))
}

const DEFAULT_LOG_FILTER: &str = "info,prompt_sync=info";

/// A valid `RUST_LOG` is taken as-is; otherwise fall back to info level.
fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

fn build_clients(config: &SyncConfig) -> Result<(Arc<dyn PageSource>, Arc<dyn RowSink>), SyncError> {
    let source = BananaPromptsClient::new(config.source_url.clone(), config.fetch_timeout)
        .map_err(|e| SyncError::Config(format!("could not build source client: {e}")))?;

    let sink: Arc<dyn RowSink> = if config.dry_run {
        info!("Dry run enabled, nothing will be written");
        Arc::new(DryRunSink)
    } else {
        let client = SupabaseClient::new(&config.supabase_url, config.supabase_key.clone())?;
        Arc::new(SupabaseSink::new(client, config.table.clone()))
    };

    Ok((Arc::new(source), sink))
}

fn abort_before_start(err: SyncError) -> ExitCode {
    error!(error = %err, "Sync not started");
    println!("Sync finished: 0 rows processed (aborted: {err})");
    ExitCode::from(err.exit_code())
}
