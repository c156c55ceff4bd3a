use std::sync::Arc;

use tokio::time::interval;
use tracing::{debug, info};

use crate::middleware::rate_limit::RateLimiter;

/// Background worker that drops expired rate-limit windows
///
/// Ticks once per window so the map only holds clients seen recently.
pub async fn rate_limit_sweep_worker(
    limiter: Arc<RateLimiter>,
    mut shutdown_rx: tokio::sync::broadcast::Receiver<()>,
) {
    let mut sweep_interval = interval(limiter.window());
    info!(window_seconds = limiter.window().as_secs(), "Rate limit sweep worker started");

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("Rate limit sweep worker shutting down");
                break;
            }
            _ = sweep_interval.tick() => {
                let removed = limiter.sweep().await;
                if removed > 0 {
                    debug!(removed, remaining = limiter.tracked_clients(), "Expired rate limit windows removed");
                }
            }
        }
    }

    info!("Rate limit sweep worker stopped");
}
