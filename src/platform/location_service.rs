use crate::domain::{Fix, Priority, ProviderId};
use async_trait::async_trait;
use std::fmt::Debug;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// The platform's location sources.
///
/// `fresh_fix` must stop working on the request as soon as `cancel` fires; callers cancel it when their wait
/// times out or when they are themselves dropped.
#[async_trait]
pub trait LocationService: Debug + Send + Sync {
    async fn fresh_fix(&self, priority: Priority, cancel: CancellationToken) -> Result<Option<Fix>, LocationError>;

    async fn last_known_fix(&self) -> Result<Option<Fix>, LocationError>;

    fn enabled_providers(&self) -> Result<Vec<ProviderId>, LocationError>;

    async fn last_known_fix_for(&self, provider: &ProviderId) -> Result<Option<Fix>, LocationError>;
}

#[derive(Error, Debug)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("location provider unavailable: {0}")]
    ProviderUnavailable(String),
}
