//! Background snapshots of every store.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{self, MissedTickBehavior};

use crate::http::server::AppState;

/// Save all stores every `interval` until shutdown fires.
///
/// Failures are logged and retried on the next tick. The final save after
/// shutdown belongs to the caller.
pub async fn run_flusher(state: AppState, interval: Duration, mut shutdown: broadcast::Receiver<()>) {
    if interval.is_zero() || state.config.storage.data_dir.is_none() {
        tracing::info!("Periodic store flush disabled");
        return;
    }
    tracing::info!(interval_secs = interval.as_secs(), "Store flusher starting");

    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick fires immediately; nothing has changed yet.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let state = state.clone();
                match tokio::task::spawn_blocking(move || state.persist()).await {
                    Ok(Ok(())) => tracing::debug!("Stores flushed"),
                    Ok(Err(e)) => tracing::error!(error = %e, "Periodic store flush failed"),
                    Err(e) => tracing::error!(error = %e, "Store flush task panicked"),
                }
            }
            _ = shutdown.recv() => {
                tracing::info!("Store flusher received shutdown signal, exiting loop");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::DexmailConfig;
    use crate::lifecycle::startup::{assemble, Backends};
    use crate::lifecycle::Shutdown;
    use crate::relay::SendGridRelay;
    use crate::storage::JsonStore;
    use crate::test_support::{FakeContentStore, FakeMailer};

    fn state(data_dir: Option<&str>) -> AppState {
        let mut config = DexmailConfig::default();
        config.storage.data_dir = data_dir.map(str::to_string);
        let relay = SendGridRelay::new(&config.sendgrid, None, Duration::from_secs(1)).unwrap();
        assemble(
            config,
            Backends {
                mailer: Arc::new(FakeMailer::default()),
                content: Arc::new(FakeContentStore::default()),
                relay: Arc::new(relay),
                chain: None,
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_flusher_saves_users_before_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().to_str().unwrap();
        let state = state(Some(data_dir));
        state
            .auth
            .register(crate::auth::RegisterData {
                email: "dana@dexmail.app".into(),
                password: Some("password1".into()),
                auth_type: Some(crate::auth::AuthType::Traditional),
                ..Default::default()
            })
            .await
            .unwrap();

        let shutdown = Shutdown::new();
        let task = tokio::spawn(run_flusher(
            state.clone(),
            Duration::from_millis(20),
            shutdown.subscribe(),
        ));
        tokio::time::sleep(Duration::from_millis(120)).await;

        let users: JsonStore<String, serde_json::Value> = JsonStore::open("users", Some(data_dir)).unwrap();
        assert!(users.contains(&"dana@dexmail.app".to_string()));

        shutdown.trigger();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_flusher_exits_without_data_dir() {
        let shutdown = Shutdown::new();
        // Returns immediately; no shutdown needed.
        run_flusher(state(None), Duration::from_millis(5), shutdown.subscribe()).await;
    }
}
