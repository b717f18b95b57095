//! Headless entry point: prepares the database and logs today's rollup.
//! Interactive surfaces (screens, exports, SMS) live outside this crate and
//! call into the library.

use chrono::Utc;
use dailybook::{config, core::report, errors::Result};
use dotenvy::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing as early as possible
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Non-fatal: env vars can be set externally
    dotenv().ok();

    let db = config::database::create_connection().await?;
    config::database::create_tables(&db).await?;
    info!(url = %config::database::get_database_url(), "database ready");

    let today = Utc::now().date_naive();
    let summary = report::dashboard_summary(&db, today).await?;
    info!(
        %today,
        collected_total = summary.collected_total,
        collected_count = summary.collected_count,
        pending_count = summary.pending_count,
        pending_estimate = summary.pending_estimate,
        month_total = summary.month_total,
        "today's collection summary"
    );

    Ok(())
}
