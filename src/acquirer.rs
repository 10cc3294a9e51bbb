use crate::domain::{Coordinate, Fix, Position, PositionSource, Priority};
use crate::platform::{LocationService, PermissionChecker};
use crate::position_cache::PositionCache;
use futures::future::join_all;
use ordered_float::OrderedFloat;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_FRESH_FIX_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Resolves the device position through a fallback chain that always ends in a usable coordinate.
///
/// Platform errors, including permission errors raised after the permission check passed, only ever mean "no
/// result from this step".
#[derive(Clone, Debug)]
pub struct LocationAcquirer {
    permissions: Arc<dyn PermissionChecker>,
    location_service: Arc<dyn LocationService>,
    cache: PositionCache,
    default_coordinate: Coordinate,
    priority: Priority,
}

impl LocationAcquirer {
    pub fn new(
        permissions: Arc<dyn PermissionChecker>,
        location_service: Arc<dyn LocationService>,
        cache: PositionCache,
        default_coordinate: Coordinate,
    ) -> Self {
        LocationAcquirer {
            permissions,
            location_service,
            cache,
            default_coordinate,
            priority: Priority::HighAccuracy,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn default_coordinate(&self) -> Coordinate {
        self.default_coordinate
    }

    /// Fresh fix, then the platform's last known fix, then the best provider fix, then the cache, then the
    /// static default. Device readings are written through to the cache.
    #[instrument(skip(self))]
    pub async fn current_position(&self, fresh_fix_timeout: Duration) -> Position {
        info!("📍 Acquiring position...");

        if self.permissions.has_location_permission() {
            if let Some(position) = self.fresh_fix(fresh_fix_timeout).await {
                return self.accept_device_reading(position, "fresh fix");
            }

            if let Some(position) = self.platform_last_known_fix().await {
                return self.accept_device_reading(position, "last known fix");
            }

            if let Some(position) = self.best_provider_fix().await {
                return self.accept_device_reading(position, "provider fix");
            }
        } else {
            debug!("📍 No location permission, skipping device sources");
        }

        self.stored_or_default()
    }

    /// The chain without the fresh fix and the platform last known fix, for callers that cannot wait for a fix.
    #[instrument(skip(self))]
    pub async fn last_known_position(&self) -> Position {
        if self.permissions.has_location_permission() {
            if let Some(position) = self.best_provider_fix().await {
                return self.accept_device_reading(position, "provider fix");
            }
        }

        self.stored_or_default()
    }

    fn accept_device_reading(&self, coordinate: Coordinate, step: &str) -> Position {
        info!(step, "📍 Acquiring position... OK, {}", coordinate);
        self.cache.save_coordinate(coordinate, PositionSource::Device);
        Position::new(coordinate, PositionSource::Device)
    }

    fn stored_or_default(&self) -> Position {
        if let Some(coordinate) = self.cache.coordinate() {
            info!("📍 Acquiring position... OK, using cached {}", coordinate);
            return Position::new(coordinate, PositionSource::Cache);
        }

        info!("📍 Acquiring position... OK, using default {}", self.default_coordinate);
        Position::new(self.default_coordinate, PositionSource::Default)
    }

    /// Bounded by `limit`. The platform request is cancelled when the wait times out and when this future is
    /// dropped before it completes.
    async fn fresh_fix(&self, limit: Duration) -> Option<Coordinate> {
        let cancel = CancellationToken::new();
        let _guard = cancel.clone().drop_guard();

        match timeout(limit, self.location_service.fresh_fix(self.priority, cancel.clone())).await {
            Ok(Ok(fix)) => usable(fix, "fresh fix"),
            Ok(Err(e)) => {
                warn!("⚠️ Fresh fix failed: {}", e);
                None
            }
            Err(_) => {
                warn!("⏳ No fresh fix within {} ms", limit.as_millis());
                cancel.cancel();
                None
            }
        }
    }

    async fn platform_last_known_fix(&self) -> Option<Coordinate> {
        match self.location_service.last_known_fix().await {
            Ok(fix) => usable(fix, "last known fix"),
            Err(e) => {
                warn!("⚠️ Last known fix failed: {}", e);
                None
            }
        }
    }

    /// The most accurate non-sentinel last known fix over all enabled providers.
    async fn best_provider_fix(&self) -> Option<Coordinate> {
        let providers = match self.location_service.enabled_providers() {
            Ok(providers) => providers,
            Err(e) => {
                warn!("⚠️ Unable to list location providers: {}", e);
                return None;
            }
        };

        let reads = providers.iter().map(|provider| async move {
            match self.location_service.last_known_fix_for(provider).await {
                Ok(fix) => fix,
                Err(e) => {
                    warn!(%provider, "⚠️ Skipping location provider: {}", e);
                    None
                }
            }
        });

        join_all(reads)
            .await
            .into_iter()
            .flatten()
            .filter_map(|fix| fix.coordinate().map(|coordinate| (fix, coordinate)))
            .min_by_key(|(fix, _)| OrderedFloat(fix.ranking_accuracy()))
            .map(|(_, coordinate)| coordinate)
    }
}

fn usable(fix: Option<Fix>, step: &str) -> Option<Coordinate> {
    let fix = fix?;
    let coordinate = fix.coordinate();
    if coordinate.is_none() {
        debug!(step, "📍 Discarding unusable reading ({}, {})", fix.latitude, fix.longitude);
    }
    coordinate
}
