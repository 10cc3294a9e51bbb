use std::fmt::{Display, Formatter};
use thiserror::Error;

/// Two coordinates closer than this (in degrees, per axis) are the same reading.
const MATERIAL_EPSILON_DEG: f64 = 1e-6;

/// A validated latitude/longitude pair.
///
/// Never NaN, always within range and never the `(0, 0)` sentinel that location sources use for
/// "no reading".
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if latitude.is_nan() || longitude.is_nan() {
            return Err(CoordinateError::NotANumber);
        }

        if !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::LatitudeOutOfRange(latitude));
        }

        if !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::LongitudeOutOfRange(longitude));
        }

        if latitude == 0.0 && longitude == 0.0 {
            return Err(CoordinateError::Sentinel);
        }

        Ok(Coordinate { latitude, longitude })
    }

    /// Parses the decimal strings the cache stores; `None` if either half is missing or invalid.
    pub fn parse(latitude: Option<&str>, longitude: Option<&str>) -> Option<Self> {
        let latitude = latitude?.trim().parse::<f64>().ok()?;
        let longitude = longitude?.trim().parse::<f64>().ok()?;
        Coordinate::new(latitude, longitude).ok()
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn is_near(&self, other: &Coordinate) -> bool {
        (self.latitude - other.latitude).abs() < MATERIAL_EPSILON_DEG && (self.longitude - other.longitude).abs() < MATERIAL_EPSILON_DEG
    }

    pub fn latitude_string(&self) -> String {
        decimal_string(self.latitude)
    }

    pub fn longitude_string(&self) -> String {
        decimal_string(self.longitude)
    }
}

impl Display for Coordinate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

/// Formats a float as a plain decimal that always has a fractional part, `10` becomes `10.0`.
fn decimal_string(value: f64) -> String {
    let text = value.to_string();
    if text.contains('.') { text } else { format!("{}.0", text) }
}

#[derive(Error, Debug, PartialEq)]
pub enum CoordinateError {
    #[error("coordinate is not a number")]
    NotANumber,
    #[error("invalid latitude: {0}, must be between -90 and 90")]
    LatitudeOutOfRange(f64),
    #[error("invalid longitude: {0}, must be between -180 and 180")]
    LongitudeOutOfRange(f64),
    #[error("(0, 0) is not a location reading")]
    Sentinel,
}
