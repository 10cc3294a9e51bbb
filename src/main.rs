use crate::acquirer::LocationAcquirer;
use crate::app_config::AppConfig;
use crate::label_resolver::PlaceLabelResolver;
use crate::platform::{FileKvStore, IpLocationService, NominatimGeocoder, StaticPermissionChecker, SystemClock};
use crate::position_cache::PositionCache;
use crate::position_state::PositionState;
use crate::presence::{presence_listener, retry_strategy};
use reqwest::Client;
use std::sync::Arc;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tokio::{signal, task};
use tracing::{info, warn};

mod acquirer;
mod api_client;
mod app_config;
mod coordinate_deserializer;
mod distance;
mod domain;
mod injector;
mod label_resolver;
mod platform;
mod position_cache;
mod position_state;
mod presence;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

    info!("🪵 Starting {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load()?;
    info!("✅  Loaded configuration");

    let store = Arc::new(FileKvStore::open(config.cache().path()));
    let cache = PositionCache::new(store.clone(), Arc::new(SystemClock));
    let http = Client::builder().build()?;

    let acquirer = LocationAcquirer::new(
        Arc::new(StaticPermissionChecker::new(config.location().permission_granted())),
        Arc::new(IpLocationService::new(http.clone(), config.location().ip_lookup_url())),
        cache.clone(),
        config.location().default_coordinate(),
    )
    .with_priority(config.location().fresh_fix_priority());

    let resolver = PlaceLabelResolver::new(
        Arc::new(NominatimGeocoder::new(http, config.geocoder().url(), config.geocoder().user_agent())),
        cache.clone(),
    )
    .with_staleness_threshold_km(config.location().staleness_threshold_km())
    .with_geocode_timeout(config.geocoder().timeout());

    let state = PositionState::new(acquirer.clone(), resolver, cache, config.location().fresh_fix_timeout());
    info!("✅  Seeded position {} ({:?})", state.current_coordinate(), state.current_label());

    let api_client = api_client::new_client(&config, acquirer)?;
    info!("✅  Initialized API client for {}", config.api().url());
    task::spawn(presence_listener(
        state.label(),
        api_client,
        config.api().presence_url(),
        retry_strategy(config.api()),
    ));
    info!("✅  Initialized presence listener");

    state.begin(config.location().manual_override());
    info!("🔥 {} is up and running", env!("CARGO_PKG_NAME"));

    let mut coordinates = state.coordinate();
    let mut resolving = state.resolving();
    let mut commands = BufReader::new(io::stdin()).lines();
    loop {
        tokio::select! {
            result = signal::ctrl_c() => {
                result?;
                break;
            }
            Ok(Some(line)) = commands.next_line() => {
                let Some((latitude, longitude)) = parse_location_command(&line) else {
                    warn!("⚠️ Expected 'latitude,longitude', got '{}'", line.trim());
                    continue;
                };
                if let Err(e) = state.update_location(latitude, longitude) {
                    warn!("⚠️ Ignoring manual location: {}", e);
                }
            }
            Ok(()) = coordinates.changed() => {
                let coordinate = *coordinates.borrow_and_update();
                info!("🗺️ Now at {} ({})", coordinate, state.current_label().unwrap_or_else(|| "unknown place".to_string()));
            }
            Ok(()) = resolving.changed() => {
                if *resolving.borrow_and_update() {
                    info!("🏷️ Looking up the place name...");
                }
            }
        }
    }
    info!("👋 Shutting down");

    if let Err(e) = store.flush().await {
        warn!("⚠️ Position cache not fully written: {}", e);
    }

    Ok(())
}

/// Parses a `latitude,longitude` line typed on stdin.
fn parse_location_command(line: &str) -> Option<(f64, f64)> {
    let (latitude, longitude) = line.trim().split_once(',')?;
    Some((latitude.trim().parse().ok()?, longitude.trim().parse().ok()?))
}
