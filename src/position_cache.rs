use crate::domain::{CachedPosition, Coordinate, PositionSource};
use crate::platform::{CacheError, Clock, KvStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

pub const KEY_LAST_LAT: &str = "last_lat";
pub const KEY_LAST_LNG: &str = "last_lng";
pub const KEY_LAST_LABEL: &str = "last_location_label";
pub const KEY_LAST_SOURCE: &str = "last_source";
pub const KEY_LAST_SAVED_AT: &str = "last_saved_at";
pub const KEY_LABEL_LAT: &str = "last_label_lat";
pub const KEY_LABEL_LNG: &str = "last_label_lng";

/// The last known good coordinate and label, kept across restarts.
///
/// The coordinate a label was resolved for is kept apart from the last known coordinate; write-throughs of new
/// readings would otherwise move the label's baseline before anyone checked it for staleness. A store written without
/// `last_label_lat` and `last_label_lng` has a label but no baseline, so the first coordinate after startup resolves
/// its label again once; that resolution writes the baseline.
///
/// Every entry is written on its own, so a reader may observe a new latitude next to an old longitude after an
/// interrupted write. Writes never fail the caller; errors are logged and dropped.
#[derive(Clone, Debug)]
pub struct PositionCache {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
}

impl PositionCache {
    pub fn new(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>) -> Self {
        PositionCache { store, clock }
    }

    /// The stored coordinate, `Ok(None)` when either half is missing or does not parse.
    pub fn try_coordinate(&self) -> Result<Option<Coordinate>, CacheError> {
        let latitude = self.store.get(KEY_LAST_LAT)?;
        let longitude = self.store.get(KEY_LAST_LNG)?;
        Ok(Coordinate::parse(latitude.as_deref(), longitude.as_deref()))
    }

    /// The coordinate the stored label was resolved for.
    pub fn try_label_baseline(&self) -> Result<Option<Coordinate>, CacheError> {
        let latitude = self.store.get(KEY_LABEL_LAT)?;
        let longitude = self.store.get(KEY_LABEL_LNG)?;
        Ok(Coordinate::parse(latitude.as_deref(), longitude.as_deref()))
    }

    /// The stored label, blank labels count as absent.
    pub fn try_label(&self) -> Result<Option<String>, CacheError> {
        Ok(self.store.get(KEY_LAST_LABEL)?.filter(|label| !label.trim().is_empty()))
    }

    pub fn coordinate(&self) -> Option<Coordinate> {
        self.try_coordinate().unwrap_or_else(|e| {
            warn!("⚠️ Unable to read the cached coordinate: {}", e);
            None
        })
    }

    pub fn label(&self) -> Option<String> {
        self.try_label().unwrap_or_else(|e| {
            warn!("⚠️ Unable to read the cached label: {}", e);
            None
        })
    }

    pub fn cached_position(&self) -> CachedPosition {
        CachedPosition {
            coordinate: self.coordinate(),
            label: self.label(),
            source: self.read(KEY_LAST_SOURCE).and_then(|source| source.parse::<PositionSource>().ok()),
            saved_at: self
                .read(KEY_LAST_SAVED_AT)
                .and_then(|saved_at| DateTime::parse_from_rfc3339(&saved_at).ok())
                .map(|saved_at| saved_at.with_timezone(&Utc)),
        }
    }

    /// Writes a genuine reading through. Cache hits and the static default are never written back, so the cache
    /// only ever holds coordinates that came from the device or the user.
    pub fn save_coordinate(&self, coordinate: Coordinate, source: PositionSource) {
        if !source.is_genuine() {
            debug!(%source, "💾 Not caching a {} coordinate", source);
            return;
        }

        self.write(KEY_LAST_LAT, &coordinate.latitude_string());
        self.write(KEY_LAST_LNG, &coordinate.longitude_string());
        self.write(KEY_LAST_SOURCE, source.as_str());
        self.write(KEY_LAST_SAVED_AT, &self.clock.now().to_rfc3339());
        debug!(%source, "💾 Cached coordinate {}", coordinate);
    }

    /// Stores `label` together with the coordinate it was resolved for, the baseline for later staleness checks.
    pub fn save_label(&self, label: &str, coordinate: Coordinate) {
        self.write(KEY_LAST_LABEL, label);
        self.write(KEY_LABEL_LAT, &coordinate.latitude_string());
        self.write(KEY_LABEL_LNG, &coordinate.longitude_string());
        debug!("💾 Cached label '{}' for {}", label, coordinate);
    }

    fn read(&self, key: &str) -> Option<String> {
        self.store.get(key).unwrap_or_else(|e| {
            warn!(key, "⚠️ Unable to read cache entry: {}", e);
            None
        })
    }

    fn write(&self, key: &str, value: &str) {
        if let Err(e) = self.store.put(key, value) {
            warn!(key, "⚠️ Unable to write cache entry: {}", e);
        }
    }
}
