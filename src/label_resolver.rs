use crate::distance::distance_km;
use crate::domain::Coordinate;
use crate::platform::Geocoder;
use crate::position_cache::PositionCache;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_STALENESS_THRESHOLD_KM: f64 = 50.0;
pub const DEFAULT_GEOCODE_TIMEOUT: Duration = Duration::from_secs(10);

/// Turns coordinates into short place names and decides when a cached name can be reused.
#[derive(Clone, Debug)]
pub struct PlaceLabelResolver {
    geocoder: Arc<dyn Geocoder>,
    cache: PositionCache,
    staleness_threshold_km: f64,
    geocode_timeout: Duration,
}

impl PlaceLabelResolver {
    pub fn new(geocoder: Arc<dyn Geocoder>, cache: PositionCache) -> Self {
        PlaceLabelResolver {
            geocoder,
            cache,
            staleness_threshold_km: DEFAULT_STALENESS_THRESHOLD_KM,
            geocode_timeout: DEFAULT_GEOCODE_TIMEOUT,
        }
    }

    pub fn with_staleness_threshold_km(mut self, staleness_threshold_km: f64) -> Self {
        self.staleness_threshold_km = staleness_threshold_km;
        self
    }

    pub fn with_geocode_timeout(mut self, geocode_timeout: Duration) -> Self {
        self.geocode_timeout = geocode_timeout;
        self
    }

    /// Reverse geocodes `coordinate` into a label, `None` on any failure or when nothing usable comes back.
    #[instrument(skip(self), fields(coordinate = %coordinate))]
    pub async fn resolve_label(&self, coordinate: Coordinate) -> Option<String> {
        debug!("🏷️ Resolving label...");
        let cancel = CancellationToken::new();
        let _guard = cancel.clone().drop_guard();

        let record = match timeout(self.geocode_timeout, self.geocoder.reverse_geocode(coordinate, cancel.clone())).await {
            Ok(Ok(record)) => record,
            Ok(Err(e)) => {
                warn!("🏷️ Resolving label... failed, {}", e);
                return None;
            }
            Err(_) => {
                warn!("🏷️ Resolving label... failed, no answer within {} ms", self.geocode_timeout.as_millis());
                cancel.cancel();
                return None;
            }
        };

        match record.and_then(|record| record.label()) {
            Some(label) => {
                info!("🏷️ Resolving label... OK, '{}'", label);
                Some(label)
            }
            None => {
                debug!("🏷️ Resolving label... nothing usable");
                None
            }
        }
    }

    /// Whether the cached label may be stale for `coordinate`. Anything that prevents a confident "still valid"
    /// answer means resolve.
    pub fn should_resolve(&self, coordinate: &Coordinate) -> bool {
        let label = match self.cache.try_label() {
            Ok(Some(label)) => label,
            Ok(None) => {
                debug!("🏷️ No cached label");
                return true;
            }
            Err(e) => {
                warn!("⚠️ Unable to read the cached label, resolving: {}", e);
                return true;
            }
        };

        let baseline = match self.cache.try_label_baseline() {
            Ok(Some(baseline)) => baseline,
            Ok(None) => {
                debug!("🏷️ Cached label '{}' has no usable baseline coordinate", label);
                return true;
            }
            Err(e) => {
                warn!("⚠️ Unable to read the cached coordinate, resolving: {}", e);
                return true;
            }
        };

        let distance = distance_km(coordinate, &baseline);
        // NaN counts as stale
        let stale = !(distance <= self.staleness_threshold_km);
        debug!(distance_km = distance, stale, "🏷️ Cached label '{}' is {:.3} km away", label, distance);
        stale
    }

    /// Stores `label` as the baseline for later staleness checks.
    pub fn remember(&self, label: &str, coordinate: Coordinate) {
        self.cache.save_label(label, coordinate);
    }
}
