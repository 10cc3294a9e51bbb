use crate::domain::Coordinate;
use chrono::{DateTime, Utc};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Where a coordinate came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PositionSource {
    Device,
    Manual,
    Cache,
    Default,
}

impl PositionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionSource::Device => "device",
            PositionSource::Manual => "manual",
            PositionSource::Cache => "cache",
            PositionSource::Default => "default",
        }
    }

    /// Only genuine readings are worth persisting as "last known".
    pub fn is_genuine(&self) -> bool {
        matches!(self, PositionSource::Device | PositionSource::Manual)
    }
}

impl Display for PositionSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PositionSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "device" => Ok(PositionSource::Device),
            "manual" => Ok(PositionSource::Manual),
            "cache" => Ok(PositionSource::Cache),
            "default" => Ok(PositionSource::Default),
            other => Err(format!("unknown position source '{}'", other)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Position {
    pub coordinate: Coordinate,
    pub source: PositionSource,
}

impl Position {
    pub fn new(coordinate: Coordinate, source: PositionSource) -> Self {
        Position { coordinate, source }
    }
}

/// Everything the cache holds, read leniently. Entries are independent and may disagree.
#[derive(Clone, Default, Debug, PartialEq)]
pub struct CachedPosition {
    pub coordinate: Option<Coordinate>,
    pub label: Option<String>,
    pub source: Option<PositionSource>,
    pub saved_at: Option<DateTime<Utc>>,
}
