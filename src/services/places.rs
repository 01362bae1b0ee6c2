use std::collections::HashMap;

use async_trait::async_trait;
use log::*;
use serde::Deserialize;

use super::{fetch_text, BoundingBox, Coordinates, PlaceCandidate};
use crate::config::Config;
use crate::error::ScoutError;

#[async_trait]
pub trait PlaceSearchService: Send + Sync {
    fn new(config: &Config, http: reqwest::Client) -> Result<Self, ScoutError>
    where
        Self: Sized;
    async fn search(
        &self,
        query: &str,
        bounds: &BoundingBox,
    ) -> Result<Vec<PlaceCandidate>, ScoutError>;
}

pub struct OverpassService {
    http: reqwest::Client,
    endpoint: String,
    limit: usize,
    /// Server-side budget in seconds, kept below the HTTP client timeout.
    timeout: u64,
}

const OVERPASS: &str = "overpass";
const MATCHED_TAGS: [&str; 4] = ["name", "amenity", "shop", "cuisine"];

#[async_trait]
impl PlaceSearchService for OverpassService {
    fn new(config: &Config, http: reqwest::Client) -> Result<Self, ScoutError> {
        Ok(OverpassService {
            http,
            endpoint: config.overpass_endpoint.clone(),
            limit: config.places_limit,
            timeout: config.http_timeout.as_secs().saturating_sub(1).max(1),
        })
    }

    async fn search(
        &self,
        query: &str,
        bounds: &BoundingBox,
    ) -> Result<Vec<PlaceCandidate>, ScoutError> {
        let ql = overpass_query(query, bounds, self.limit, self.timeout);
        trace!("Overpass query: {ql}");
        let request = self.http.post(&self.endpoint).form(&[("data", ql)]);
        let body = fetch_text(OVERPASS, request).await?;
        parse_overpass(&body)
    }
}

/// Escapes text for use inside a quoted, case-insensitive Overpass regex.
fn overpass_pattern(query: &str) -> String {
    let mut out = String::with_capacity(query.len());
    for c in query.trim().chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\\\\\"),
            '.' | '*' | '+' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '|' | '^' | '$' => {
                out.push('\\');
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

fn overpass_query(query: &str, bounds: &BoundingBox, limit: usize, timeout: u64) -> String {
    let pattern = overpass_pattern(query);
    let mut ql = format!("[out:json][timeout:{timeout}];\n(\n");
    for tag in MATCHED_TAGS {
        ql.push_str(&format!("  nwr[\"{tag}\"~\"{pattern}\",i]({bounds});\n"));
    }
    ql.push_str(&format!(");\nout center {limit};\n"));
    ql
}

#[derive(Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Deserialize)]
struct OverpassElement {
    lat: Option<f64>,
    lon: Option<f64>,
    center: Option<OverpassCenter>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

#[derive(Deserialize)]
struct OverpassCenter {
    lat: f64,
    lon: f64,
}

fn parse_overpass(body: &str) -> Result<Vec<PlaceCandidate>, ScoutError> {
    let response: OverpassResponse =
        serde_json::from_str(body).map_err(|e| ScoutError::malformed(OVERPASS, e))?;
    Ok(response
        .elements
        .into_iter()
        .map(|element| {
            let category = ["amenity", "shop", "cuisine", "tourism"]
                .iter()
                .find_map(|key| element.tags.get(*key))
                .map(|value| value.replace('_', " "));
            PlaceCandidate {
                name: element.tags.get("name").cloned(),
                label: overpass_address(&element.tags).or_else(|| category.clone()),
                category,
                location: match (element.lat, element.lon) {
                    (Some(lat), Some(lng)) => Some(Coordinates { lat, lng }),
                    _ => None,
                },
                center: element
                    .center
                    .map(|c| Coordinates { lat: c.lat, lng: c.lon }),
            }
        })
        .collect())
}

fn overpass_address(tags: &HashMap<String, String>) -> Option<String> {
    let street = match (tags.get("addr:housenumber"), tags.get("addr:street")) {
        (Some(number), Some(street)) => Some(format!("{number} {street}")),
        (None, Some(street)) => Some(street.clone()),
        _ => None,
    };
    let parts: Vec<String> = street
        .into_iter()
        .chain(tags.get("addr:city").cloned())
        .collect();
    (!parts.is_empty()).then(|| parts.join(", "))
}

pub struct GooglePlacesService {
    http: reqwest::Client,
    endpoint: String,
    key: String,
}

const GOOGLE_PLACES: &str = "google places";
const MIN_RADIUS_METERS: f64 = 1_000.0;
const MAX_RADIUS_METERS: f64 = 50_000.0;

#[async_trait]
impl PlaceSearchService for GooglePlacesService {
    fn new(config: &Config, http: reqwest::Client) -> Result<Self, ScoutError> {
        let key = config
            .google_maps_token
            .clone()
            .ok_or(ScoutError::MissingConfig("GOOGLE_MAPS_TOKEN"))?;
        Ok(GooglePlacesService {
            http,
            endpoint: config.google_places_endpoint.clone(),
            key,
        })
    }

    async fn search(
        &self,
        query: &str,
        bounds: &BoundingBox,
    ) -> Result<Vec<PlaceCandidate>, ScoutError> {
        let center = bounds.center();
        let radius = bounds
            .half_diagonal_meters()
            .clamp(MIN_RADIUS_METERS, MAX_RADIUS_METERS)
            .round();
        let request = self.http.get(&self.endpoint).query(&[
            ("query", query.to_string()),
            ("location", format!("{},{}", center.lat, center.lng)),
            ("radius", radius.to_string()),
            ("key", self.key.clone()),
        ]);
        let body = fetch_text(GOOGLE_PLACES, request).await?;
        parse_google_places(&body)
    }
}

#[derive(Deserialize)]
struct GooglePlacesResponse {
    status: String,
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<GooglePlace>,
}

#[derive(Deserialize)]
struct GooglePlace {
    name: Option<String>,
    formatted_address: Option<String>,
    #[serde(default)]
    types: Vec<String>,
    geometry: Option<GoogleGeometry>,
}

#[derive(Deserialize)]
struct GoogleGeometry {
    location: Option<GoogleLatLng>,
    viewport: Option<GoogleViewport>,
}

#[derive(Deserialize)]
struct GoogleViewport {
    northeast: GoogleLatLng,
    southwest: GoogleLatLng,
}

#[derive(Deserialize, Clone, Copy)]
struct GoogleLatLng {
    lat: f64,
    lng: f64,
}

impl From<GoogleLatLng> for Coordinates {
    fn from(value: GoogleLatLng) -> Self {
        Coordinates {
            lat: value.lat,
            lng: value.lng,
        }
    }
}

fn parse_google_places(body: &str) -> Result<Vec<PlaceCandidate>, ScoutError> {
    let response: GooglePlacesResponse =
        serde_json::from_str(body).map_err(|e| ScoutError::malformed(GOOGLE_PLACES, e))?;
    match response.status.as_str() {
        "OK" | "ZERO_RESULTS" => {}
        status => {
            return Err(ScoutError::transport(
                GOOGLE_PLACES,
                response
                    .error_message
                    .map_or_else(|| status.to_string(), |m| format!("{status}: {m}")),
            ))
        }
    }
    Ok(response
        .results
        .into_iter()
        .map(|place| {
            let category = place.types.first().map(|t| t.replace('_', " "));
            let (location, center) = match place.geometry {
                Some(geometry) => (
                    geometry.location.map(Coordinates::from),
                    geometry.viewport.map(|v| {
                        BoundingBox {
                            south: v.southwest.lat,
                            west: v.southwest.lng,
                            north: v.northeast.lat,
                            east: v.northeast.lng,
                        }
                        .center()
                    }),
                ),
                None => (None, None),
            };
            PlaceCandidate {
                name: place.name,
                label: place.formatted_address,
                category,
                location,
                center,
            }
        })
        .collect())
}
