//! Background scheduled tasks for the application.
//!
//! Call `spawn_all` once during startup to launch them.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::store::OtpStore;

/// Spawn all background tasks. Detached via `tokio::spawn`; does not block.
pub fn spawn_all(store: Arc<OtpStore>, sweep_interval: Duration) {
    spawn_otp_sweeper(store, sweep_interval);
}

/// Reclaims memory held by codes that were issued and never verified.
/// `verify` checks expiry on its own, so this only bounds growth.
pub fn spawn_otp_sweeper(store: Arc<OtpStore>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            let removed = store.sweep().await;
            if removed > 0 {
                log::info!("Expired verification codes purged: {removed}");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Channel;
    use crate::store::otp_store::test_clock::ManualClock;

    #[tokio::test]
    async fn test_sweeper_purges_expired_codes() {
        let clock = Arc::new(ManualClock::new());
        let store = Arc::new(OtpStore::with_clock(
            chrono::Duration::seconds(120),
            clock.clone(),
        ));
        store.issue(Channel::Email, "gone@x.com").await;
        store.issue(Channel::Phone, "+15551234567").await;
        clock.advance(chrono::Duration::seconds(121));
        let live = store.issue(Channel::Email, "live@x.com").await;

        let handle = spawn_otp_sweeper(store.clone(), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        assert_eq!(store.len(Channel::Email).await, 1);
        assert_eq!(store.len(Channel::Phone).await, 0);
        assert!(store.verify(Channel::Email, "live@x.com", &live.code).await);
    }
}
