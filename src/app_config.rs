use crate::acquirer::DEFAULT_FRESH_FIX_TIMEOUT;
use crate::domain::{Coordinate, Priority};
use config::{Config, ConfigError};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    location: Location,
    geocoder: Geocoder,
    cache: Cache,
    api: Api,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(config::File::with_name("config").required(true))
            .add_source(config::File::with_name("config_local").required(false))
            .add_source(config::Environment::with_prefix("LOCUS").prefix_separator("_").separator("__"))
            .build()?
            .try_deserialize()
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn geocoder(&self) -> &Geocoder {
        &self.geocoder
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub fn api(&self) -> &Api {
        &self.api
    }
}

#[derive(Debug, Deserialize)]
pub struct Location {
    default: Coordinate,
    #[serde(default)]
    manual_override: Option<Coordinate>,
    permission_granted: bool,
    #[serde(with = "humantime_serde", default = "default_fresh_fix_timeout")]
    fresh_fix_timeout: Duration,
    fresh_fix_priority: Priority,
    staleness_threshold_km: f64,
    ip_lookup_url: String,
}

impl Location {
    pub fn default_coordinate(&self) -> Coordinate {
        self.default
    }

    /// A fixed location that replaces device acquisition at startup.
    pub fn manual_override(&self) -> Option<Coordinate> {
        self.manual_override
    }

    pub fn permission_granted(&self) -> bool {
        self.permission_granted
    }

    pub fn fresh_fix_timeout(&self) -> Duration {
        self.fresh_fix_timeout
    }

    pub fn fresh_fix_priority(&self) -> Priority {
        self.fresh_fix_priority
    }

    pub fn staleness_threshold_km(&self) -> f64 {
        self.staleness_threshold_km
    }

    pub fn ip_lookup_url(&self) -> &str {
        &self.ip_lookup_url
    }
}

fn default_fresh_fix_timeout() -> Duration {
    DEFAULT_FRESH_FIX_TIMEOUT
}

#[derive(Debug, Deserialize)]
pub struct Geocoder {
    url: String,
    user_agent: String,
    #[serde(with = "humantime_serde")]
    timeout: Duration,
}

impl Geocoder {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[derive(Debug, Deserialize)]
pub struct Cache {
    path: String,
}

impl Cache {
    pub fn path(&self) -> &str {
        &self.path
    }
}

#[derive(Debug, Deserialize)]
pub struct Api {
    url: String,
    key: String,
    presence_path: String,
    retry_ms: u64,
    retry_max_delay_ms: u64,
    retry_attempts: usize,
}

impl Api {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn presence_url(&self) -> String {
        format!("{}/{}", self.url.trim_end_matches('/'), self.presence_path.trim_start_matches('/'))
    }

    pub fn retry_ms(&self) -> u64 {
        self.retry_ms
    }

    pub fn retry_max_delay_ms(&self) -> Duration {
        Duration::from_millis(self.retry_max_delay_ms)
    }

    pub fn retry_attempts(&self) -> usize {
        self.retry_attempts
    }
}

#[cfg(test)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

#[cfg(test)]
impl AppConfigBuilder {
    pub fn new() -> Self {
        AppConfigBuilder {
            config: AppConfig {
                location: Location {
                    default: Coordinate::new(51.8615899, 4.3580323).unwrap(),
                    manual_override: None,
                    permission_granted: true,
                    fresh_fix_timeout: Duration::from_secs(5),
                    fresh_fix_priority: Priority::HighAccuracy,
                    staleness_threshold_km: 50.0,
                    ip_lookup_url: "http://ip.url/json".to_string(),
                },
                geocoder: Geocoder {
                    url: "https://geocoder.url".to_string(),
                    user_agent: "locus-test".to_string(),
                    timeout: Duration::from_secs(10),
                },
                cache: Cache {
                    path: "position.json".to_string(),
                },
                api: Api {
                    url: "https://api.url/".to_string(),
                    key: "key".to_string(),
                    presence_path: "/presence".to_string(),
                    retry_ms: 10,
                    retry_max_delay_ms: 20,
                    retry_attempts: 2,
                },
            },
        }
    }

    pub fn api_url(mut self, url: String) -> Self {
        self.config.api.url = url;
        self
    }

    pub fn api_key(mut self, key: String) -> Self {
        self.config.api.key = key;
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}
