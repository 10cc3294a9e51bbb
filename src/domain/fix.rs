use crate::domain::Coordinate;
use serde::Deserialize;
use std::fmt::{Display, Formatter};

/// A raw reading as reported by a location source. May carry the `(0, 0)` sentinel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fix {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_m: Option<f32>, // Reported error radius
}

impl Fix {
    pub fn new(latitude: f64, longitude: f64, accuracy_m: Option<f32>) -> Self {
        Fix {
            latitude,
            longitude,
            accuracy_m,
        }
    }

    /// The reading as a coordinate, `None` for sentinel or otherwise unusable readings.
    pub fn coordinate(&self) -> Option<Coordinate> {
        Coordinate::new(self.latitude, self.longitude).ok()
    }

    /// Error radius used for ranking, unreported accuracy ranks last.
    pub fn ranking_accuracy(&self) -> f32 {
        match self.accuracy_m {
            Some(accuracy) if !accuracy.is_nan() => accuracy,
            _ => f32::INFINITY,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ProviderId(pub String);

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// How hard a fresh fix request should try, traded against power.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    #[default]
    HighAccuracy,
    Balanced,
}
