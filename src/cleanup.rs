//! Scheduled cleanup of expired refresh token records.

use std::time::Duration;

use tracing::{error, info};

use crate::refresh::RefreshTokenService;

/// Interval between cleanup runs.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Run all cleanup tasks once.
///
/// Expired records are dead weight only: rotation and validation both
/// reject them regardless, so a failed run degrades nothing but disk.
pub async fn run_cleanup(refresh: &RefreshTokenService) {
    match refresh.prune_expired().await {
        Ok(count) if count > 0 => info!("Cleaned up {} expired refresh tokens", count),
        Ok(_) => {}
        Err(e) => error!("Failed to clean up expired refresh tokens: {}", e),
    }
}

/// Spawn a background task that runs cleanup periodically.
/// Returns a handle that can be used to abort the task.
pub fn spawn_cleanup_scheduler(refresh: RefreshTokenService) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);

        loop {
            interval.tick().await;
            run_cleanup(&refresh).await;
        }
    })
}
