mod clock;
mod file_kv_store;
mod geocoder;
mod ip_location;
mod kv_store;
mod location_service;
mod nominatim;
mod permission;

#[cfg(test)]
pub mod fakes;

pub use clock::{Clock, SystemClock};
pub use file_kv_store::FileKvStore;
pub use geocoder::{GeocodeError, Geocoder};
pub use ip_location::IpLocationService;
pub use kv_store::{CacheError, KvStore};
pub use location_service::{LocationError, LocationService};
pub use nominatim::NominatimGeocoder;
pub use permission::{PermissionChecker, StaticPermissionChecker};
