use async_trait::async_trait;
use log::*;
use serde::Deserialize;

use super::{BoundingBox, Coordinates};
use crate::config::Config;
use crate::error::ScoutError;

#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub coordinates: Vec<Coordinates>,
    /// Meters.
    pub distance: f64,
    /// Seconds.
    pub duration: f64,
}

impl Route {
    pub fn bounds(&self) -> Option<BoundingBox> {
        BoundingBox::enclosing(&self.coordinates)
    }
}

/// Terminal outcome of one routing request. Exactly one is produced per request.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    Found(Route),
    Error(String),
}

#[async_trait]
pub trait RoutingService: Send + Sync {
    fn new(config: &Config, http: reqwest::Client) -> Result<Self, ScoutError>
    where
        Self: Sized;
    async fn route(&self, from: Coordinates, to: Coordinates) -> RouteOutcome;
}

pub struct OsrmService {
    http: reqwest::Client,
    endpoint: String,
}

const OSRM: &str = "osrm";

impl OsrmService {
    fn url(&self, from: &Coordinates, to: &Coordinates) -> String {
        format!(
            "{}/route/v1/driving/{},{};{},{}",
            self.endpoint, from.lng, from.lat, to.lng, to.lat
        )
    }
}

#[async_trait]
impl RoutingService for OsrmService {
    fn new(config: &Config, http: reqwest::Client) -> Result<Self, ScoutError> {
        Ok(OsrmService {
            http,
            endpoint: config.osrm_endpoint.trim_end_matches('/').to_string(),
        })
    }

    async fn route(&self, from: Coordinates, to: Coordinates) -> RouteOutcome {
        let request = self.http.get(self.url(&from, &to)).query(&[
            ("overview", "full"),
            ("geometries", "geojson"),
            ("alternatives", "false"),
            ("steps", "false"),
        ]);
        // OSRM answers NoRoute with a 400 and a JSON body.
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return RouteOutcome::Error(ScoutError::transport(OSRM, e).to_string()),
        };
        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return RouteOutcome::Error(ScoutError::transport(OSRM, e).to_string()),
        };
        debug!("OSRM answered {status} with {} bytes.", body.len());
        match parse_osrm(&body) {
            Ok(outcome) => outcome,
            Err(_) if !status.is_success() => RouteOutcome::Error(
                ScoutError::Status {
                    service: OSRM,
                    status: status.as_u16(),
                }
                .to_string(),
            ),
            Err(e) => RouteOutcome::Error(e.to_string()),
        }
    }
}

#[derive(Deserialize)]
struct OsrmResponse {
    code: String,
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Deserialize)]
struct OsrmRoute {
    geometry: OsrmGeometry,
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    duration: f64,
}

#[derive(Deserialize)]
struct OsrmGeometry {
    /// GeoJSON order: longitude first.
    coordinates: Vec<[f64; 2]>,
}

fn parse_osrm(body: &str) -> Result<RouteOutcome, ScoutError> {
    let response: OsrmResponse =
        serde_json::from_str(body).map_err(|e| ScoutError::malformed(OSRM, e))?;
    if response.code != "Ok" {
        return Ok(RouteOutcome::Error(
            response.message.unwrap_or(response.code),
        ));
    }
    let Some(route) = response.routes.into_iter().next() else {
        return Ok(RouteOutcome::Error(
            "Sorry, we could not find a route to that destination.".to_string(),
        ));
    };
    let coordinates: Vec<Coordinates> = route
        .geometry
        .coordinates
        .into_iter()
        .map(|[lng, lat]| Coordinates { lat, lng })
        .collect();
    if coordinates.is_empty() {
        return Ok(RouteOutcome::Error(
            "Sorry, we could not find a route to that destination.".to_string(),
        ));
    }
    Ok(RouteOutcome::Found(Route {
        coordinates,
        distance: route.distance,
        duration: route.duration,
    }))
}
