//! In-memory stand-ins for the platform capabilities.

use crate::domain::{AddressRecord, Coordinate, Fix, Priority, ProviderId};
use crate::platform::{CacheError, Clock, GeocodeError, Geocoder, KvStore, LocationError, LocationService};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
pub struct FakeLocationService {
    fresh_fix: Option<Fix>,
    fresh_fix_delay: Option<Duration>,
    fresh_fix_fails: bool,
    last_known: Option<Fix>,
    last_known_fails: bool,
    providers: Vec<(ProviderId, Option<Fix>)>,
    failing_providers: Vec<ProviderId>,
    providers_fail: bool,
    fresh_fix_calls: AtomicUsize,
    tokens: Mutex<Vec<CancellationToken>>,
}

impl FakeLocationService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fresh_fix(mut self, fix: Fix) -> Self {
        self.fresh_fix = Some(fix);
        self
    }

    pub fn with_fresh_fix_delay(mut self, delay: Duration) -> Self {
        self.fresh_fix_delay = Some(delay);
        self
    }

    /// Fails the fresh fix the way a permission revoked mid-request does.
    pub fn with_failing_fresh_fix(mut self) -> Self {
        self.fresh_fix_fails = true;
        self
    }

    pub fn with_last_known(mut self, fix: Fix) -> Self {
        self.last_known = Some(fix);
        self
    }

    pub fn with_failing_last_known(mut self) -> Self {
        self.last_known_fails = true;
        self
    }

    pub fn with_provider(mut self, name: &str, fix: Option<Fix>) -> Self {
        self.providers.push((ProviderId(name.to_string()), fix));
        self
    }

    pub fn with_failing_provider(mut self, name: &str) -> Self {
        let id = ProviderId(name.to_string());
        self.providers.push((id.clone(), None));
        self.failing_providers.push(id);
        self
    }

    pub fn with_failing_provider_list(mut self) -> Self {
        self.providers_fail = true;
        self
    }

    pub fn fresh_fix_calls(&self) -> usize {
        self.fresh_fix_calls.load(Ordering::SeqCst)
    }

    pub fn tokens(&self) -> Vec<CancellationToken> {
        self.tokens.lock().unwrap().clone()
    }
}

#[async_trait]
impl LocationService for FakeLocationService {
    async fn fresh_fix(&self, _priority: Priority, cancel: CancellationToken) -> Result<Option<Fix>, LocationError> {
        self.fresh_fix_calls.fetch_add(1, Ordering::SeqCst);
        self.tokens.lock().unwrap().push(cancel.clone());

        if let Some(delay) = self.fresh_fix_delay {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(None),
                _ = sleep(delay) => {}
            }
        }

        if self.fresh_fix_fails {
            return Err(LocationError::PermissionDenied);
        }
        Ok(self.fresh_fix)
    }

    async fn last_known_fix(&self) -> Result<Option<Fix>, LocationError> {
        if self.last_known_fails {
            return Err(LocationError::ProviderUnavailable("fused".to_string()));
        }
        Ok(self.last_known)
    }

    fn enabled_providers(&self) -> Result<Vec<ProviderId>, LocationError> {
        if self.providers_fail {
            return Err(LocationError::PermissionDenied);
        }
        Ok(self.providers.iter().map(|(id, _)| id.clone()).collect())
    }

    async fn last_known_fix_for(&self, provider: &ProviderId) -> Result<Option<Fix>, LocationError> {
        if self.failing_providers.contains(provider) {
            return Err(LocationError::ProviderUnavailable(provider.to_string()));
        }
        Ok(self.providers.iter().find(|(id, _)| id == provider).and_then(|(_, fix)| *fix))
    }
}

#[derive(Debug)]
enum Answer {
    Label(&'static str),
    Nothing,
    Failure,
}

/// A geocoder answering from a script, one answer per call, then nothing.
#[derive(Debug, Default)]
pub struct FakeGeocoder {
    script: Mutex<VecDeque<(Duration, Answer)>>,
    calls: AtomicUsize,
    coordinates: Mutex<Vec<Coordinate>>,
    tokens: Mutex<Vec<CancellationToken>>,
}

impl FakeGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answering(self, label: &'static str) -> Self {
        self.answering_after(Duration::ZERO, label)
    }

    pub fn answering_after(self, delay: Duration, label: &'static str) -> Self {
        self.script.lock().unwrap().push_back((delay, Answer::Label(label)));
        self
    }

    pub fn knowing_nothing(self) -> Self {
        self.script.lock().unwrap().push_back((Duration::ZERO, Answer::Nothing));
        self
    }

    pub fn failing(self) -> Self {
        self.script.lock().unwrap().push_back((Duration::ZERO, Answer::Failure));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn coordinates(&self) -> Vec<Coordinate> {
        self.coordinates.lock().unwrap().clone()
    }

    pub fn tokens(&self) -> Vec<CancellationToken> {
        self.tokens.lock().unwrap().clone()
    }
}

#[async_trait]
impl Geocoder for FakeGeocoder {
    async fn reverse_geocode(&self, coordinate: Coordinate, cancel: CancellationToken) -> Result<Option<AddressRecord>, GeocodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.coordinates.lock().unwrap().push(coordinate);
        self.tokens.lock().unwrap().push(cancel.clone());

        let next = self.script.lock().unwrap().pop_front();
        let Some((delay, answer)) = next else {
            return Ok(None);
        };

        if !delay.is_zero() {
            tokio::select! {
                _ = cancel.cancelled() => return Err(GeocodeError::Cancelled),
                _ = sleep(delay) => {}
            }
        }

        match answer {
            Answer::Label(label) => Ok(Some(AddressRecord {
                locality: Some(label.to_string()),
                ..Default::default()
            })),
            Answer::Nothing => Ok(None),
            Answer::Failure => Err(GeocodeError::Unavailable("offline".to_string())),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: Mutex<HashMap<String, String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, key: &str, value: &str) -> Self {
        self.entries.lock().unwrap().insert(key.to_string(), value.to_string());
        self
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(CacheError::Io(io::Error::other("disk unreadable")));
        }
        Ok(self.value(key))
    }

    fn put(&self, key: &str, value: &str) -> Result<(), CacheError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CacheError::Io(io::Error::other("disk full")));
        }
        self.entries.lock().unwrap().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[derive(Debug)]
pub struct FixedClock(pub DateTime<Utc>);

impl Default for FixedClock {
    fn default() -> Self {
        FixedClock(Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
