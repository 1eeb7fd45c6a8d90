//! Coordinate - latitude/longitude pair
//!
//! A Coordinate is only ever persisted or handed back as a resolved value
//! when both components are finite and within range:
//! - latitude in `[-90, 90]`
//! - longitude in `[-180, 180]`

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Map center used when neither storage nor the device can supply one.
pub const DEFAULT_CENTER: Coordinate = Coordinate::new(51.5074, -0.1278);

/// A point on Earth in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Create a coordinate without checking it. Use [`Coordinate::validate`]
    /// before persisting.
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Create a coordinate, rejecting out-of-range or non-finite values.
    pub fn validated(latitude: f64, longitude: f64) -> Result<Self> {
        let coordinate = Self::new(latitude, longitude);
        coordinate.validate()?;
        Ok(coordinate)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.latitude.is_finite() || !self.longitude.is_finite() {
            return Err(Error::InvalidCoordinate(format!(
                "components must be finite numbers, got ({}, {})",
                self.latitude, self.longitude
            )));
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(Error::InvalidCoordinate(format!(
                "latitude {} is outside [-90, 90]",
                self.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(Error::InvalidCoordinate(format!(
                "longitude {} is outside [-180, 180]",
                self.longitude
            )));
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.latitude, self.longitude)
    }
}

impl FromStr for Coordinate {
    type Err = Error;

    /// Parse `"lat,lon"` (whitespace around either part is ignored).
    fn from_str(s: &str) -> Result<Self> {
        let (lat, lon) = s
            .split_once(',')
            .ok_or_else(|| Error::InvalidCoordinate(format!("expected \"lat,lon\", got {:?}", s)))?;

        let latitude: f64 = lat
            .trim()
            .parse()
            .map_err(|_| Error::InvalidCoordinate(format!("invalid latitude: {}", lat.trim())))?;
        let longitude: f64 = lon
            .trim()
            .parse()
            .map_err(|_| Error::InvalidCoordinate(format!("invalid longitude: {}", lon.trim())))?;

        Self::validated(latitude, longitude)
    }
}
