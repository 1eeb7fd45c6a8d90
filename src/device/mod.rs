//! Device Position Source - the live-fix capability
//!
//! The resolver only sees this trait. A source must be probed with
//! [`PositionSource::is_supported`] before it is asked for a fix, and an
//! unsupported source is reported exactly like an `Unsupported` failure.

pub mod command;

use crate::coordinate::Coordinate;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

pub use command::CommandPositionSource;

/// Parameters for a single live-fix request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionRequest {
    pub high_accuracy: bool,
    pub timeout: Duration,
    /// How old a fix cached by the device itself may be and still be accepted.
    pub maximum_age: Duration,
}

/// A fix reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub coordinate: Coordinate,
    /// Accuracy radius in meters
    pub accuracy: f64,
    pub timestamp: SystemTime,
}

impl Position {
    pub fn new(coordinate: Coordinate, accuracy: f64) -> Self {
        Self {
            coordinate,
            accuracy,
            timestamp: SystemTime::now(),
        }
    }
}

/// Failure codes a device source can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionErrorCode {
    PermissionDenied,
    PositionUnavailable,
    Timeout,
}

#[async_trait]
pub trait PositionSource: Send + Sync {
    /// Capability probe. Must be cheap and side-effect free.
    fn is_supported(&self) -> bool;

    /// Request one fix. Completes exactly once, with either a position or a code.
    async fn current_position(
        &self,
        request: PositionRequest,
    ) -> std::result::Result<Position, PositionErrorCode>;
}

/// Source for hosts without any geolocation capability.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedSource;

#[async_trait]
impl PositionSource for UnsupportedSource {
    fn is_supported(&self) -> bool {
        false
    }

    async fn current_position(
        &self,
        _request: PositionRequest,
    ) -> std::result::Result<Position, PositionErrorCode> {
        Err(PositionErrorCode::PositionUnavailable)
    }
}

/// Kind of a failed live fix, as seen by resolver callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationErrorKind {
    PermissionDenied,
    PositionUnavailable,
    Timeout,
    Unsupported,
    Unknown,
}

impl LocationErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "permission_denied",
            Self::PositionUnavailable => "position_unavailable",
            Self::Timeout => "timeout",
            Self::Unsupported => "unsupported",
            Self::Unknown => "unknown",
        }
    }

    /// Message suitable for showing to the user as-is.
    pub fn message(&self) -> &'static str {
        match self {
            Self::PermissionDenied => {
                "Location permission denied. Enable location access and try again."
            }
            Self::PositionUnavailable => "Location information is unavailable.",
            Self::Timeout => "The request to get your location timed out.",
            Self::Unsupported => "Geolocation is not supported on this device.",
            Self::Unknown => "An unknown error occurred while getting your location.",
        }
    }
}

impl From<PositionErrorCode> for LocationErrorKind {
    fn from(code: PositionErrorCode) -> Self {
        match code {
            PositionErrorCode::PermissionDenied => Self::PermissionDenied,
            PositionErrorCode::PositionUnavailable => Self::PositionUnavailable,
            PositionErrorCode::Timeout => Self::Timeout,
        }
    }
}

impl std::fmt::Display for LocationErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A live fix that could not be obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{}", kind.message())]
pub struct LocationError {
    pub kind: LocationErrorKind,
}

impl LocationError {
    pub fn new(kind: LocationErrorKind) -> Self {
        Self { kind }
    }
}

impl From<PositionErrorCode> for LocationError {
    fn from(code: PositionErrorCode) -> Self {
        Self::new(code.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_map_to_matching_kinds() {
        assert_eq!(
            LocationError::from(PositionErrorCode::PermissionDenied).kind,
            LocationErrorKind::PermissionDenied
        );
        assert_eq!(
            LocationError::from(PositionErrorCode::PositionUnavailable).kind,
            LocationErrorKind::PositionUnavailable
        );
        assert_eq!(
            LocationError::from(PositionErrorCode::Timeout).kind,
            LocationErrorKind::Timeout
        );
    }

    #[test]
    fn test_error_displays_user_message() {
        let err = LocationError::new(LocationErrorKind::Unsupported);
        assert_eq!(err.to_string(), "Geolocation is not supported on this device.");
    }

    #[test]
    fn test_unsupported_source_probe() {
        assert!(!UnsupportedSource.is_supported());
    }
}
