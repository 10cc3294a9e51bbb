use crate::acquirer::LocationAcquirer;
use crate::domain::{Coordinate, CoordinateError, PositionSource};
use crate::label_resolver::PlaceLabelResolver;
use crate::position_cache::PositionCache;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch::{self, Receiver, Sender};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// The observable `(coordinate, label)` pair the rest of the application renders.
///
/// Seeded synchronously from the cache (or the static default) so there is always something to show. Coordinates
/// are last-write-wins. Labels are tagged with a generation taken when their resolution was requested, and only
/// the latest generation may publish, so a slow lookup for an old position never overwrites a newer label.
#[derive(Clone, Debug)]
pub struct PositionState {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    acquirer: LocationAcquirer,
    resolver: PlaceLabelResolver,
    cache: PositionCache,
    fresh_fix_timeout: Duration,
    coordinate_tx: Sender<Coordinate>,
    label_tx: Sender<Option<String>>,
    resolving_tx: Sender<bool>,
    latest_generation: Mutex<u64>,
}

impl PositionState {
    pub fn new(acquirer: LocationAcquirer, resolver: PlaceLabelResolver, cache: PositionCache, fresh_fix_timeout: Duration) -> Self {
        let seed = cache.cached_position();
        let coordinate = seed.coordinate.unwrap_or_else(|| acquirer.default_coordinate());
        info!(source = ?seed.source, saved_at = ?seed.saved_at, "📍 Seeded position {} with label {:?}", coordinate, seed.label);

        let (coordinate_tx, _) = watch::channel(coordinate);
        let (label_tx, _) = watch::channel(seed.label);
        let (resolving_tx, _) = watch::channel(false);

        PositionState {
            inner: Arc::new(Inner {
                acquirer,
                resolver,
                cache,
                fresh_fix_timeout,
                coordinate_tx,
                label_tx,
                resolving_tx,
                latest_generation: Mutex::new(0),
            }),
        }
    }

    pub fn coordinate(&self) -> Receiver<Coordinate> {
        self.inner.coordinate_tx.subscribe()
    }

    pub fn label(&self) -> Receiver<Option<String>> {
        self.inner.label_tx.subscribe()
    }

    /// Raised while the latest label resolution is in flight.
    pub fn resolving(&self) -> Receiver<bool> {
        self.inner.resolving_tx.subscribe()
    }

    pub fn current_coordinate(&self) -> Coordinate {
        *self.inner.coordinate_tx.borrow()
    }

    pub fn current_label(&self) -> Option<String> {
        self.inner.label_tx.borrow().clone()
    }

    /// Acquires the current position in the background, publishes it and refreshes the label if needed.
    pub fn start(&self) -> JoinHandle<()> {
        let state = self.clone();
        tokio::spawn(async move {
            let position = state.inner.acquirer.current_position(state.inner.fresh_fix_timeout).await;
            state.publish(position.coordinate);

            let generation = state.next_generation();
            state.refresh_label(position.coordinate, generation).await;
        })
    }

    /// Starts tracking. A manual location, when given, takes the place of device acquisition.
    pub fn begin(&self, manual_location: Option<Coordinate>) -> JoinHandle<()> {
        match manual_location {
            Some(coordinate) => {
                info!("📌 Using manual location {}", coordinate);
                self.apply_manual(coordinate)
            }
            None => self.start(),
        }
    }

    /// Treats an externally supplied coordinate like an acquired one: published and cached right away, then run
    /// through the label pipeline in the background.
    #[instrument(skip(self))]
    pub fn update_location(&self, latitude: f64, longitude: f64) -> Result<JoinHandle<()>, CoordinateError> {
        let coordinate = Coordinate::new(latitude, longitude)?;
        Ok(self.apply_manual(coordinate))
    }

    fn apply_manual(&self, coordinate: Coordinate) -> JoinHandle<()> {
        self.publish(coordinate);
        self.inner.cache.save_coordinate(coordinate, PositionSource::Manual);

        let generation = self.next_generation();
        let state = self.clone();
        tokio::spawn(async move {
            state.refresh_label(coordinate, generation).await;
        })
    }

    fn publish(&self, coordinate: Coordinate) {
        let changed = self.inner.coordinate_tx.send_if_modified(|current| {
            if current.is_near(&coordinate) {
                false
            } else {
                *current = coordinate;
                true
            }
        });

        if changed {
            info!("📍 Position is now {}", coordinate);
        }
    }

    fn next_generation(&self) -> u64 {
        match self.inner.latest_generation.lock() {
            Ok(mut latest) => {
                *latest += 1;
                *latest
            }
            Err(poisoned) => {
                let mut latest = poisoned.into_inner();
                *latest += 1;
                *latest
            }
        }
    }

    #[instrument(skip(self), fields(coordinate = %coordinate))]
    async fn refresh_label(&self, coordinate: Coordinate, generation: u64) {
        if !self.inner.resolver.should_resolve(&coordinate) {
            debug!("🏷️ Cached label is still valid");
            self.complete(generation, coordinate, None);
            return;
        }

        self.mark_resolving(generation);
        let label = self.inner.resolver.resolve_label(coordinate).await;
        self.complete(generation, coordinate, label);
    }

    fn mark_resolving(&self, generation: u64) {
        let Ok(latest) = self.inner.latest_generation.lock() else {
            return;
        };

        if *latest == generation {
            self.inner.resolving_tx.send_replace(true);
        }
    }

    /// Publishes and persists `label` if `generation` is still the latest request. The check and the publication
    /// happen under one lock.
    fn complete(&self, generation: u64, coordinate: Coordinate, label: Option<String>) {
        let latest = match self.inner.latest_generation.lock() {
            Ok(latest) => latest,
            Err(_) => {
                warn!("⚠️ Label generation lock poisoned, dropping label {:?}", label);
                return;
            }
        };

        if *latest != generation {
            debug!(generation, latest = *latest, "🏷️ Discarding superseded label {:?}", label);
            return;
        }

        if let Some(label) = label {
            self.inner.resolver.remember(&label, coordinate);
            self.inner.label_tx.send_replace(Some(label));
        }
        self.inner.resolving_tx.send_replace(false);
    }
}
