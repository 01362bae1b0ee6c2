use derive_more::Display;
use log::*;

use crate::config::Config;
use crate::error::ScoutError;

pub mod geocoding;
pub mod location;
pub mod places;
pub mod routing;

#[derive(Debug, Clone, Copy, PartialEq, Display)]
#[display(fmt = "{:.5}, {:.5}", lat, lng)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// A fix from the device location service.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub coords: Coordinates,
    /// Accuracy radius in meters.
    pub accuracy: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Display)]
#[display(fmt = "{},{},{},{}", south, west, north, east)]
pub struct BoundingBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl BoundingBox {
    /// Smallest box enclosing every point, `None` for an empty sequence.
    pub fn enclosing<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Coordinates>,
    {
        points.into_iter().fold(None, |acc, p| {
            Some(match acc {
                None => BoundingBox {
                    south: p.lat,
                    west: p.lng,
                    north: p.lat,
                    east: p.lng,
                },
                Some(b) => BoundingBox {
                    south: b.south.min(p.lat),
                    west: b.west.min(p.lng),
                    north: b.north.max(p.lat),
                    east: b.east.max(p.lng),
                },
            })
        })
    }

    pub fn center(&self) -> Coordinates {
        Coordinates {
            lat: (self.south + self.north) / 2.0,
            lng: (self.west + self.east) / 2.0,
        }
    }

    /// Great-circle distance from the center to a corner, in meters.
    pub fn half_diagonal_meters(&self) -> f64 {
        haversine_meters(
            &self.center(),
            &Coordinates {
                lat: self.north,
                lng: self.east,
            },
        )
    }
}

/// A geocoded destination.
#[derive(Debug, Clone, PartialEq)]
pub struct Destination {
    pub display_name: String,
    pub coords: Coordinates,
}

/// A place as returned by a place-search backend, before it is placed on the map.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlaceCandidate {
    pub name: Option<String>,
    /// Address, or a category description when no address is known.
    pub label: Option<String>,
    /// Category tag, used as a name fallback.
    pub category: Option<String>,
    pub location: Option<Coordinates>,
    /// Center of the element's extent, used when `location` is missing.
    pub center: Option<Coordinates>,
}

impl PlaceCandidate {
    pub fn coordinates(&self) -> Option<Coordinates> {
        self.location.or(self.center)
    }
}

const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

pub fn haversine_meters(a: &Coordinates, b: &Coordinates) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = lat2 - lat1;
    let dlng = (b.lng - a.lng).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().asin()
}

pub fn http_client(config: &Config) -> Result<reqwest::Client, ScoutError> {
    reqwest::Client::builder()
        .timeout(config.http_timeout)
        .user_agent(config.user_agent.clone())
        .gzip(true)
        .build()
        .map_err(|e| ScoutError::transport("http client", e))
}

/// Sends a request and returns the body of a successful response.
pub(crate) async fn fetch_text(
    service: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<String, ScoutError> {
    let response = request
        .send()
        .await
        .map_err(|e| ScoutError::transport(service, e))?;
    let status = response.status();
    if !status.is_success() {
        warn!("{service} returned status {status}");
        return Err(ScoutError::Status {
            service,
            status: status.as_u16(),
        });
    }
    response
        .text()
        .await
        .map_err(|e| ScoutError::transport(service, e))
}
