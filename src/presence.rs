use crate::app_config::Api;
use reqwest_middleware::ClientWithMiddleware;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch::Receiver;
use tokio_retry::Retry;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Serialize)]
struct PresencePing<'a> {
    label: &'a str,
}

pub fn retry_strategy(api: &Api) -> impl Iterator<Item = Duration> + Clone + Send + 'static {
    ExponentialBackoff::from_millis(api.retry_ms())
        .factor(2)
        .max_delay(api.retry_max_delay_ms())
        .map(jitter as fn(Duration) -> Duration)
        .take(api.retry_attempts())
}

/// Announces every newly published label. The label present when listening starts is not announced.
#[instrument(skip_all, fields(url = %url))]
pub async fn presence_listener<S>(mut rx: Receiver<Option<String>>, client: ClientWithMiddleware, url: String, strategy: S)
where
    S: Iterator<Item = Duration> + Clone,
{
    while rx.changed().await.is_ok() {
        let Some(label) = rx.borrow_and_update().clone() else {
            continue;
        };

        let result = Retry::spawn(strategy.clone(), || async {
            ping(&client, &url, &label).await.inspect_err(|e| {
                warn!("⚠️ Presence ping failed: {}. Retrying...", e);
            })
        })
        .await;

        if let Err(e) = result {
            error!("❌ Unable to announce presence at '{}': {}", label, e);
        }
    }
    debug!("👋 Label channel closed, stopped announcing presence");
}

#[instrument(skip(client))]
pub async fn ping(client: &ClientWithMiddleware, url: &str, label: &str) -> Result<(), PresenceError> {
    client.post(url).json(&PresencePing { label }).send().await?.error_for_status()?;
    info!("📣 Announced presence at '{}'", label);
    Ok(())
}

#[derive(Error, Debug)]
pub enum PresenceError {
    #[error("request error: {0}")]
    Request(#[from] reqwest_middleware::Error),
    #[error("presence rejected: {0}")]
    Rejected(#[from] reqwest::Error),
}
