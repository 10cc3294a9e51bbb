use crate::domain::{AddressRecord, Coordinate};
use async_trait::async_trait;
use std::fmt::Debug;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[async_trait]
pub trait Geocoder: Debug + Send + Sync {
    /// Looks up the address at `coordinate`, `Ok(None)` when the geocoder knows nothing about it.
    async fn reverse_geocode(&self, coordinate: Coordinate, cancel: CancellationToken) -> Result<Option<AddressRecord>, GeocodeError>;
}

#[derive(Error, Debug)]
pub enum GeocodeError {
    #[error("geocoder unavailable: {0}")]
    Unavailable(String),
    #[error("geocode request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("geocode request cancelled")]
    Cancelled,
}
