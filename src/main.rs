mod cli;
mod config;
mod github;
mod model;
mod sync;

use anyhow::Result;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use github::GitHubClient;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let args = cli::parse_args(&args)?;
    if args.help {
        cli::print_help();
        return Ok(());
    }

    init_logging();

    // The token is read exactly once here and handed to the client.
    let settings = config::load_config()?.resolve(&args, std::env::var(config::TOKEN_ENV).ok())?;
    let client = GitHubClient::new(settings.token, &settings.api_url);
    let today = chrono::Utc::now().date_naive();

    let report = match sync::sync_inbox(&client, &settings.sync, today).await {
        Ok(report) => report,
        Err(e) => {
            error!(project = %settings.sync.project_id, error = %e, "Sync aborted");
            return Err(e.into());
        }
    };

    for item in &report.added {
        println!("+ {} — {}", item.title, item.url);
    }
    println!("Added {} new items to todo list", report.added.len());

    info!(
        added = report.added.len(),
        already_on_board = report.skipped_existing,
        unresolved = report.unresolved,
        failed = report.failed,
        status_failures = report.status_failures(),
        "Sync finished"
    );

    // Per-item problems never fail the run; they only show up here and in the log.
    if report.incomplete() {
        warn!(
            unresolved = report.unresolved,
            failed = report.failed,
            status_failures = report.status_failures(),
            "Some items were not fully synced"
        );
    }

    Ok(())
}
