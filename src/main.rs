mod config;
mod error;
mod execution;
mod ledger;
mod settlement;

#[cfg(test)]
mod testing;

use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::DisburserConfig;
use crate::execution::{BalanceResolver, PaymentSubmitter};
use crate::ledger::HorizonClient;
use crate::settlement::{DisbursementJob, DisbursementScheduler, FileJournal};

// Initialize logging and tracing
fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,disburser=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("🚀 Starting XLM disburser");

    // Load configuration
    dotenv::dotenv().ok();
    let settings = match DisburserConfig::load().and_then(DisburserConfig::validate) {
        Ok(settings) => settings,
        Err(e) => {
            error!("❌ {}", e);
            std::process::exit(1);
        }
    };

    let client = Arc::new(HorizonClient::new(settings.stellar.clone())?);
    let keypair = Arc::new(settings.keypair);
    let journal = Arc::new(FileJournal::open(&settings.log_dir).await?);

    info!(
        "Funding account {} -> receiver {} via {}",
        keypair.account_id(),
        settings.receiver,
        settings.stellar.horizon_url
    );

    let job = DisbursementJob::new(
        BalanceResolver::new(client.clone(), keypair.account_id().to_string()),
        PaymentSubmitter::new(client, keypair, settings.retry),
        journal,
        settings.receiver,
    );
    let scheduler = DisbursementScheduler::new(settings.schedule, Arc::new(job));

    let stats = scheduler
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Ctrl-C received, shutting down");
        })
        .await;

    info!(
        "👋 Disburser stopped: {} run(s), {} failed",
        stats.runs, stats.failed_runs
    );

    Ok(())
}
