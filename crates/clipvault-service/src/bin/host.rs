//! Native messaging host for clipvault capture clients.
//!
//! Speaks line-delimited JSON over stdin/stdout: one request object per
//! line in, one response envelope per line out. Startup runs the legacy
//! entry migration and the pending-write reconciliation before serving.

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use clipvault_service::{dispatch, ClipvaultConfig, KnowledgeService, Request, Response};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = ClipvaultConfig::load().context("failed to load configuration")?;
    let service = KnowledgeService::from_config(config);

    // Both startup passes are best-effort: an unconfigured or offline
    // service must still answer listing requests from the local mirror.
    match service.store().migrate_legacy_entries().await {
        Ok(0) => {}
        Ok(updated) => info!(updated, "migrated legacy entries"),
        Err(e) => warn!(error = %e, "legacy entry migration failed"),
    }
    match service.reconcile().await {
        Ok(report) if report.is_clean() => {}
        Ok(report) => info!(?report, "reconciled pending writes"),
        Err(e) => warn!(error = %e, "reconciliation failed"),
    }

    info!("clipvault host ready");
    serve(&service).await
}

async fn serve(service: &KnowledgeService) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await.context("failed to read request")? {
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => dispatch(service, request).await,
            Err(e) => {
                warn!(error = %e, "unparsable request");
                Response::unrecognized()
            }
        };
        let mut payload = serde_json::to_vec(&response).context("failed to encode response")?;
        payload.push(b'\n');
        stdout
            .write_all(&payload)
            .await
            .context("failed to write response")?;
        stdout.flush().await.context("failed to flush response")?;
    }

    info!("input closed, shutting down");
    Ok(())
}
