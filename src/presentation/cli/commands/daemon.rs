use std::future::Future;
use std::time::Duration;

use crate::application::services::scheduler::CollectionScheduler;

/// Run the collection loop until Ctrl+C, then shut down gracefully.
///
/// Cycle failures are logged and published by the engine; they never stop
/// the daemon.
///
/// # Errors
///
/// Currently infallible; the `Result` keeps the command signatures uniform.
pub async fn run_daemon(
    scheduler: &CollectionScheduler,
    interval: Duration,
    shutdown_timeout: Duration,
) -> anyhow::Result<()> {
    let aborted = run_until(scheduler, interval, shutdown_timeout, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Cannot listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    })
    .await;
    if aborted > 0 {
        tracing::warn!("{aborted} pending write(s) or notification(s) abandoned at shutdown");
    }
    println!("\nhostpulse stopped.");
    Ok(())
}

/// Collects until `shutdown` resolves, then stops and drains. Returns how
/// many side effects had to be aborted.
pub async fn run_until(
    scheduler: &CollectionScheduler,
    interval: Duration,
    shutdown_timeout: Duration,
    shutdown: impl Future<Output = ()>,
) -> usize {
    scheduler.start(interval).await;
    shutdown.await;
    tracing::info!("Shutdown requested, stopping collection...");
    scheduler.shutdown(shutdown_timeout).await
}
