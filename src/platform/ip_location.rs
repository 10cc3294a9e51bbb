use crate::domain::{Fix, Priority, ProviderId};
use crate::platform::{LocationError, LocationService};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

pub const NETWORK_PROVIDER: &str = "network";

/// IP geolocation is city level at best.
const IP_ACCURACY_M: f32 = 5_000.0;

/// A [`LocationService`] backed by an ip-api.com style lookup endpoint, exposing a single `network` provider.
///
/// The last successful lookup doubles as the last-known fix.
#[derive(Debug)]
pub struct IpLocationService {
    client: Client,
    url: String,
    last_fix: Mutex<Option<Fix>>,
}

#[derive(Debug, Deserialize)]
struct IpLookupResponse {
    status: String,
    message: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
}

impl IpLocationService {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        IpLocationService {
            client,
            url: url.into(),
            last_fix: Mutex::new(None),
        }
    }

    async fn lookup(&self) -> Result<Option<Fix>, LocationError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| LocationError::ProviderUnavailable(e.to_string()))?;

        if response.status() == StatusCode::FORBIDDEN {
            return Err(LocationError::PermissionDenied);
        }

        let response = response
            .error_for_status()
            .map_err(|e| LocationError::ProviderUnavailable(e.to_string()))?;

        let lookup = response
            .json::<IpLookupResponse>()
            .await
            .map_err(|e| LocationError::ProviderUnavailable(e.to_string()))?;

        if lookup.status != "success" {
            let message = lookup.message.unwrap_or_else(|| lookup.status.clone());
            return Err(LocationError::ProviderUnavailable(message));
        }

        Ok(match (lookup.lat, lookup.lon) {
            (Some(latitude), Some(longitude)) => Some(Fix::new(latitude, longitude, Some(IP_ACCURACY_M))),
            _ => None,
        })
    }

    fn remembered_fix(&self) -> Result<Option<Fix>, LocationError> {
        self.last_fix
            .lock()
            .map(|guard| *guard)
            .map_err(|_| LocationError::ProviderUnavailable("last fix lock poisoned".to_string()))
    }
}

#[async_trait]
impl LocationService for IpLocationService {
    /// IP lookup has a single accuracy tier, every priority gets the same city-level fix.
    #[instrument(skip(self, cancel))]
    async fn fresh_fix(&self, priority: Priority, cancel: CancellationToken) -> Result<Option<Fix>, LocationError> {
        debug!(?priority, "🌐 Looking up IP location...");
        let fix = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("🌐 Looking up IP location... cancelled");
                return Ok(None);
            }
            result = self.lookup() => result?,
        };

        if let Some(fix) = fix {
            info!(latitude = fix.latitude, longitude = fix.longitude, "🌐 Looking up IP location... OK");
            match self.last_fix.lock() {
                Ok(mut guard) => *guard = Some(fix),
                Err(_) => warn!("⚠️ Unable to remember the IP location fix"),
            }
        }

        Ok(fix)
    }

    async fn last_known_fix(&self) -> Result<Option<Fix>, LocationError> {
        self.remembered_fix()
    }

    fn enabled_providers(&self) -> Result<Vec<ProviderId>, LocationError> {
        Ok(vec![ProviderId(NETWORK_PROVIDER.to_string())])
    }

    async fn last_known_fix_for(&self, provider: &ProviderId) -> Result<Option<Fix>, LocationError> {
        if provider.0 != NETWORK_PROVIDER {
            return Err(LocationError::ProviderUnavailable(format!("unknown provider '{}'", provider)));
        }

        self.remembered_fix()
    }
}
