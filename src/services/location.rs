use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use super::{Coordinates, Position};
use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PositionError {
    #[error("geolocation is not supported")]
    Unsupported,
    #[error("permission to read the location was denied")]
    PermissionDenied,
    #[error("timed out waiting for a location fix")]
    Timeout,
    #[error("location is unavailable")]
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
    /// Oldest cached fix that may be reused; zero always asks for a fresh one.
    pub maximum_age: Duration,
}

impl PositionOptions {
    pub fn from_config(config: &Config) -> Self {
        PositionOptions {
            high_accuracy: true,
            timeout: config.location_timeout,
            maximum_age: Duration::ZERO,
        }
    }
}

#[async_trait]
pub trait LocationService: Send + Sync {
    async fn current_position(&self, options: &PositionOptions)
        -> Result<Position, PositionError>;
}

/// A fix reported by the user's device through a chat command.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportedFix {
    /// Nothing was reported: the capability is absent.
    Missing,
    Fix(Position),
    /// Something was reported but it was not a usable position.
    Invalid,
}

impl ReportedFix {
    /// Parses `<lat> <lng> [accuracy]`, accepting commas as separators too.
    pub fn parse(args: &str) -> Self {
        let parts: Vec<&str> = args
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .collect();
        if parts.is_empty() {
            return ReportedFix::Missing;
        }
        if parts.len() < 2 || parts.len() > 3 {
            return ReportedFix::Invalid;
        }
        let numbers: Result<Vec<f64>, _> = parts.iter().map(|p| p.parse::<f64>()).collect();
        let Ok(numbers) = numbers else {
            return ReportedFix::Invalid;
        };
        let coords = Coordinates {
            lat: numbers[0],
            lng: numbers[1],
        };
        let accuracy = numbers.get(2).copied();
        if !coords.is_valid() || accuracy.map_or(false, |a| !a.is_finite() || a < 0.0) {
            return ReportedFix::Invalid;
        }
        ReportedFix::Fix(Position { coords, accuracy })
    }
}

#[async_trait]
impl LocationService for ReportedFix {
    async fn current_position(
        &self,
        _options: &PositionOptions,
    ) -> Result<Position, PositionError> {
        match self {
            ReportedFix::Missing => Err(PositionError::Unsupported),
            ReportedFix::Fix(position) => Ok(*position),
            ReportedFix::Invalid => Err(PositionError::Unavailable),
        }
    }
}
